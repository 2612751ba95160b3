use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::MathspaceGroup;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return ok(&req.id, json!({ "students": [] }));
    };
    let data = &store.data;
    let class_filter = req.params.get("classId").and_then(|v| v.as_str());

    let rows: Vec<serde_json::Value> = data
        .students
        .iter()
        .filter(|s| class_filter.map_or(true, |c| s.class_id == c))
        .map(|student| {
            let activity = data.activity(&student.id);
            json!({
                "id": student.id,
                "name": student.name,
                "firstName": student.first_name,
                "lastName": student.last_name,
                "classId": student.class_id,
                "className": data.class(&student.class_id).map(|c| c.name.clone()),
                "mathspaceGroup": student.effective_group(),
                "avatarUrl": student.avatar_url,
                "accuracyPercentage": activity.map(|a| a.accuracy.percentage),
                "lastActive": activity.map(|a| a.last_active),
            })
        })
        .collect();

    ok(&req.id, json!({ "students": rows }))
}

fn handle_students_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let data = &store.data;

    let student_id = match req.params.get("studentId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing studentId", None),
    };

    let Some(student) = data.student(&student_id) else {
        return err(&req.id, "not_found", "student not found", None);
    };

    let groups: Vec<&crate::model::PersistentGroup> = data
        .persistent_groups
        .iter()
        .filter(|g| g.student_ids.iter().any(|id| id == &student_id))
        .collect();

    ok(
        &req.id,
        json!({
            "student": student,
            "className": data.class(&student.class_id).map(|c| c.name.clone()),
            "activity": data.activity(&student_id),
            "groups": groups,
        }),
    )
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let student_id = match req.params.get("studentId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing studentId", None),
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing patch", None);
    };

    let first_name = match patch.get("firstName") {
        Some(v) => match v.as_str().map(str::trim) {
            Some(s) if !s.is_empty() => Some(s.to_string()),
            _ => return err(&req.id, "bad_params", "firstName must be a non-empty string", None),
        },
        None => None,
    };
    let last_name = match patch.get("lastName") {
        Some(v) => match v.as_str().map(str::trim) {
            Some(s) if !s.is_empty() => Some(s.to_string()),
            _ => return err(&req.id, "bad_params", "lastName must be a non-empty string", None),
        },
        None => None,
    };
    let mathspace_group = match patch.get("mathspaceGroup") {
        Some(v) => match v.as_str().and_then(MathspaceGroup::parse) {
            Some(g) => Some(g),
            None => return err(&req.id, "bad_params", "unknown mathspaceGroup", None),
        },
        None => None,
    };
    // Absent key leaves the override alone; an explicit null clears it.
    let override_change = match patch.get("mathspaceGroupOverride") {
        Some(serde_json::Value::Null) => Some(None),
        Some(v) => match v.as_str().and_then(MathspaceGroup::parse) {
            Some(g) => Some(Some(g)),
            None => return err(&req.id, "bad_params", "unknown mathspaceGroupOverride", None),
        },
        None => None,
    };

    let updated = store.update_student(&student_id, |s| {
        if let Some(v) = first_name {
            s.first_name = v;
        }
        if let Some(v) = last_name {
            s.last_name = v;
        }
        if let Some(g) = mathspace_group {
            s.mathspace_group = g;
        }
        if let Some(ov) = override_change {
            s.mathspace_group_override = ov;
        }
        s.name = format!("{} {}", s.first_name, s.last_name);
    });
    match updated {
        Ok(true) => {}
        Ok(false) => return err(&req.id, "not_found", "student not found", None),
        Err(e) => return err(&req.id, "store_write_failed", format!("{e:?}"), None),
    }

    match store.data.student(&student_id) {
        Some(s) => ok(&req.id, json!({ "student": s })),
        None => err(&req.id, "not_found", "student not found", None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.open" => Some(handle_students_open(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        _ => None,
    }
}

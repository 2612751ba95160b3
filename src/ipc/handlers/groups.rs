use serde_json::json;
use uuid::Uuid;

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{GroupKind, PersistentGroup};
use crate::store::now_iso;

const DEFAULT_GROUP_COLOR: &str = "#3b82f6";

fn parse_string_array(value: &serde_json::Value) -> Option<Vec<String>> {
    let arr = value.as_array()?;
    let mut out = Vec::with_capacity(arr.len());
    for v in arr {
        out.push(v.as_str()?.to_string());
    }
    Some(out)
}

fn handle_groups_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let name = match req.params.get("name").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "name must be a non-empty string", None),
    };
    let class_id = req
        .params
        .get("classId")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    if let Some(cid) = class_id.as_deref() {
        if store.data.class(cid).is_none() {
            return err(&req.id, "not_found", "class not found", None);
        }
    }
    let description = req
        .params
        .get("description")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let color = match req.params.get("color") {
        Some(v) => match v.as_str() {
            Some(s) => s.to_string(),
            None => return err(&req.id, "bad_params", "color must be a string", None),
        },
        None => DEFAULT_GROUP_COLOR.to_string(),
    };
    let tags = match req.params.get("tags") {
        Some(v) => match parse_string_array(v) {
            Some(t) => t,
            None => {
                return err(&req.id, "bad_params", "tags must be an array of strings", None)
            }
        },
        None => Vec::new(),
    };
    let student_ids = match req.params.get("studentIds") {
        Some(v) => match parse_string_array(v) {
            Some(ids) => ids,
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "studentIds must be an array of strings",
                    None,
                )
            }
        },
        None => Vec::new(),
    };
    for sid in &student_ids {
        if store.data.student(sid).is_none() {
            return err(
                &req.id,
                "not_found",
                "student not found",
                Some(json!({ "studentId": sid })),
            );
        }
    }

    let now = now_iso();
    let group = PersistentGroup {
        id: Uuid::new_v4().to_string(),
        name,
        description,
        color,
        tags,
        kind: GroupKind::Persistent,
        class_id,
        student_ids,
        created_at: now.clone(),
        updated_at: now,
    };
    let snapshot = json!(group);
    if let Err(e) = store.create_group(group) {
        return err(&req.id, "store_write_failed", format!("{e:?}"), None);
    }

    ok(&req.id, json!({ "group": snapshot }))
}

fn handle_groups_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let group_id = match req.params.get("groupId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing groupId", None),
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing patch", None);
    };

    let name = match patch.get("name") {
        Some(v) => match v.as_str().map(str::trim) {
            Some(s) if !s.is_empty() => Some(s.to_string()),
            _ => return err(&req.id, "bad_params", "name must be a non-empty string", None),
        },
        None => None,
    };
    // Absent key leaves the description alone; an explicit null clears it.
    let description = match patch.get("description") {
        Some(serde_json::Value::Null) => Some(None),
        Some(v) => match v.as_str() {
            Some(s) => Some(Some(s.to_string())),
            None => return err(&req.id, "bad_params", "description must be a string", None),
        },
        None => None,
    };
    let color = match patch.get("color") {
        Some(v) => match v.as_str() {
            Some(s) => Some(s.to_string()),
            None => return err(&req.id, "bad_params", "color must be a string", None),
        },
        None => None,
    };
    let tags = match patch.get("tags") {
        Some(v) => match parse_string_array(v) {
            Some(t) => Some(t),
            None => {
                return err(&req.id, "bad_params", "tags must be an array of strings", None)
            }
        },
        None => None,
    };
    let student_ids = match patch.get("studentIds") {
        Some(v) => match parse_string_array(v) {
            Some(ids) => Some(ids),
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "studentIds must be an array of strings",
                    None,
                )
            }
        },
        None => None,
    };
    if let Some(ids) = student_ids.as_deref() {
        for sid in ids {
            if store.data.student(sid).is_none() {
                return err(
                    &req.id,
                    "not_found",
                    "student not found",
                    Some(json!({ "studentId": sid })),
                );
            }
        }
    }

    let updated = store.update_group(&group_id, |g| {
        if let Some(v) = name {
            g.name = v;
        }
        if let Some(v) = description {
            g.description = v;
        }
        if let Some(v) = color {
            g.color = v;
        }
        if let Some(v) = tags {
            g.tags = v;
        }
        if let Some(v) = student_ids {
            g.student_ids = v;
        }
    });
    match updated {
        Ok(true) => {}
        Ok(false) => return err(&req.id, "not_found", "group not found", None),
        Err(e) => return err(&req.id, "store_write_failed", format!("{e:?}"), None),
    }

    match store.data.group(&group_id) {
        Some(g) => ok(&req.id, json!({ "group": g })),
        None => err(&req.id, "not_found", "group not found", None),
    }
}

fn handle_groups_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let group_id = match req.params.get("groupId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing groupId", None),
    };

    match store.delete_group(&group_id) {
        Ok(true) => ok(&req.id, json!({ "ok": true })),
        Ok(false) => err(&req.id, "not_found", "group not found", None),
        Err(e) => err(&req.id, "store_write_failed", format!("{e:?}"), None),
    }
}

fn handle_groups_add_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let group_id = match req.params.get("groupId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing groupId", None),
    };
    let student_id = match req.params.get("studentId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing studentId", None),
    };
    if store.data.student(&student_id).is_none() {
        return err(&req.id, "not_found", "student not found", None);
    }

    let added = match store.add_student_to_group(&group_id, &student_id) {
        Ok(Some(v)) => v,
        Ok(None) => return err(&req.id, "not_found", "group not found", None),
        Err(e) => return err(&req.id, "store_write_failed", format!("{e:?}"), None),
    };

    match store.data.group(&group_id) {
        Some(g) => ok(&req.id, json!({ "group": g, "added": added })),
        None => err(&req.id, "not_found", "group not found", None),
    }
}

fn handle_groups_remove_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let group_id = match req.params.get("groupId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing groupId", None),
    };
    let student_id = match req.params.get("studentId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing studentId", None),
    };

    let removed = match store.remove_student_from_group(&group_id, &student_id) {
        Ok(Some(v)) => v,
        Ok(None) => return err(&req.id, "not_found", "group not found", None),
        Err(e) => return err(&req.id, "store_write_failed", format!("{e:?}"), None),
    };

    match store.data.group(&group_id) {
        Some(g) => ok(&req.id, json!({ "group": g, "removed": removed })),
        None => err(&req.id, "not_found", "group not found", None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "groups.create" => Some(handle_groups_create(state, req)),
        "groups.update" => Some(handle_groups_update(state, req)),
        "groups.delete" => Some(handle_groups_delete(state, req)),
        "groups.addStudent" => Some(handle_groups_add_student(state, req)),
        "groups.removeStudent" => Some(handle_groups_remove_student(state, req)),
        _ => None,
    }
}

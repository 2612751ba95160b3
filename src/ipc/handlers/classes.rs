use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return ok(&req.id, json!({ "classes": [] }));
    };
    let data = &store.data;

    let mut rows: Vec<serde_json::Value> = data
        .classes
        .iter()
        .map(|class| {
            let student_count = data.roster(&class.id).len();
            let group_count = data
                .persistent_groups
                .iter()
                .filter(|g| g.class_id.as_deref() == Some(class.id.as_str()))
                .count();
            let task_count = data.tasks.iter().filter(|t| t.class_id == class.id).count();
            json!({
                "id": class.id,
                "name": class.name,
                "schoolId": class.school_id,
                "teacherId": class.teacher_id,
                "studentCount": student_count,
                "groupCount": group_count,
                "taskCount": task_count,
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        let an = a.get("name").and_then(|v| v.as_str()).unwrap_or("");
        let bn = b.get("name").and_then(|v| v.as_str()).unwrap_or("");
        an.cmp(bn)
    });

    ok(&req.id, json!({ "classes": rows }))
}

fn handle_classes_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let data = &store.data;

    let class_id = match req.params.get("classId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing classId", None),
    };

    let Some(class) = data.class(&class_id) else {
        return err(&req.id, "not_found", "class not found", None);
    };

    let roster: Vec<serde_json::Value> = data
        .roster(&class_id)
        .iter()
        .map(|student| {
            let mut row = json!(student);
            row["activity"] = match data.activity(&student.id) {
                Some(a) => json!(a),
                None => serde_json::Value::Null,
            };
            row
        })
        .collect();

    let groups: Vec<serde_json::Value> = data
        .persistent_groups
        .iter()
        .filter(|g| g.class_id.as_deref() == Some(class_id.as_str()))
        .map(|group| {
            let mut row = json!(group);
            row["memberCount"] = json!(group.student_ids.len());
            row
        })
        .collect();

    let (current_tasks, past_tasks) = super::tasks::class_task_rows(data, &class_id);

    ok(
        &req.id,
        json!({
            "class": class,
            "roster": roster,
            "groups": groups,
            "currentTasks": current_tasks,
            "pastTasks": past_tasks,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "classes.open" => Some(handle_classes_open(state, req)),
        _ => None,
    }
}

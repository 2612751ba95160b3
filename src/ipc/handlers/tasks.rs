use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::mastery::SeededRng;
use crate::model::{
    AppData, GroupKind, MathspaceGroup, ResultStatus, Student, Task, TaskAssignment, TaskDueDate,
    TaskStatus, TaskType, TemporaryGroup, DEFAULT_QUESTIONS_COUNT, DEFAULT_SKILLS_COUNT,
};
use crate::seed;
use crate::store::now_iso;
use crate::taskdetail::{build_task_detail, parse_task_date, SkillWorkProfile};

// A task plus completed / in-progress / not-started tallies from its result
// rows. Shared with `classes.open`.
pub(super) fn task_row(data: &AppData, task: &Task) -> Value {
    let result = data.result_for(&task.id);
    let tally = |status: ResultStatus| -> usize {
        result.map_or(0, |r| {
            r.per_student.iter().filter(|p| p.status == status).count()
        })
    };
    let mut row = json!(task);
    row["tallies"] = json!({
        "completed": tally(ResultStatus::Completed),
        "inProgress": tally(ResultStatus::InProgress),
        "notStarted": tally(ResultStatus::NotStarted),
    });
    row
}

pub(super) fn class_task_rows(data: &AppData, class_id: &str) -> (Vec<Value>, Vec<Value>) {
    let mut current = Vec::new();
    let mut past = Vec::new();
    for task in data.tasks.iter().filter(|t| t.class_id == class_id) {
        let row = task_row(data, task);
        match task.status {
            TaskStatus::Active => current.push(row),
            TaskStatus::Expired => past.push(row),
        }
    }
    (current, past)
}

fn handle_tasks_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return ok(&req.id, json!({ "currentTasks": [], "pastTasks": [] }));
    };
    let data = &store.data;

    let class_id = match req.params.get("classId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing classId", None),
    };
    if data.class(&class_id).is_none() {
        return err(&req.id, "not_found", "class not found", None);
    }

    let (current, past) = class_task_rows(data, &class_id);
    ok(
        &req.id,
        json!({ "currentTasks": current, "pastTasks": past }),
    )
}

fn parse_string_array(value: &Value) -> Option<Vec<String>> {
    let arr = value.as_array()?;
    let mut out = Vec::with_capacity(arr.len());
    for v in arr {
        out.push(v.as_str()?.to_string());
    }
    Some(out)
}

fn parse_due_dates(value: &Value) -> Result<Vec<TaskDueDate>, String> {
    let entries: Vec<TaskDueDate> = serde_json::from_value(value.clone())
        .map_err(|e| format!("dueDates malformed: {e}"))?;
    for entry in &entries {
        if parse_task_date(&entry.date).is_none() {
            return Err(format!("dueDates entry is not a valid date: {}", entry.date));
        }
    }
    Ok(entries)
}

fn parse_assignments(value: &Value) -> Result<Vec<TaskAssignment>, String> {
    serde_json::from_value(value.clone()).map_err(|e| format!("assignments malformed: {e}"))
}

// Temporary groups arrive without a `type` tag and often without ids; fill
// both in rather than bouncing the request.
fn parse_temporary_groups(value: &Value) -> Result<Vec<TemporaryGroup>, String> {
    let arr = value
        .as_array()
        .ok_or_else(|| "temporaryGroups must be an array".to_string())?;
    let mut out = Vec::with_capacity(arr.len());
    for v in arr {
        let name = v
            .get("name")
            .and_then(|n| n.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "temporary group name must be a non-empty string".to_string())?;
        let id = match v.get("id").and_then(|i| i.as_str()) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        let student_ids = match v.get("studentIds") {
            Some(ids) => parse_string_array(ids)
                .ok_or_else(|| "temporary group studentIds must be an array of strings".to_string())?,
            None => Vec::new(),
        };
        out.push(TemporaryGroup {
            id,
            name: name.to_string(),
            description: v
                .get("description")
                .and_then(|d| d.as_str())
                .map(str::to_string),
            color: v.get("color").and_then(|c| c.as_str()).map(str::to_string),
            kind: GroupKind::Temporary,
            student_ids,
        });
    }
    Ok(out)
}

fn parse_count(params: &Value, key: &str, default: i64) -> Result<i64, String> {
    let Some(v) = params.get(key) else {
        return Ok(default);
    };
    let Some(n) = v.as_i64() else {
        return Err(format!("{key} must be an integer"));
    };
    if !(1..=200).contains(&n) {
        return Err(format!("{key} must be between 1 and 200"));
    }
    Ok(n)
}

fn default_assignments() -> Vec<TaskAssignment> {
    vec![
        seed::mathspace_assignment(MathspaceGroup::Explorer, "qs-a"),
        seed::mathspace_assignment(MathspaceGroup::Adventurer, "qs-b"),
        seed::mathspace_assignment(MathspaceGroup::Trailblazer, "qs-c"),
    ]
}

fn handle_tasks_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let class_id = match req.params.get("classId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing classId", None),
    };
    if store.data.class(&class_id).is_none() {
        return err(&req.id, "not_found", "class not found", None);
    }
    let title = match req.params.get("title").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "title must be a non-empty string", None),
    };
    let due_date = match req.params.get("dueDate").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing dueDate", None),
    };
    let Some(due_dt) = parse_task_date(&due_date) else {
        return err(&req.id, "bad_params", "dueDate is not a valid date", None);
    };
    let task_type = match req.params.get("taskType").and_then(|v| v.as_str()) {
        Some(s) => match TaskType::parse(s) {
            Some(t) => t,
            None => return err(&req.id, "bad_params", "unknown taskType", None),
        },
        None => TaskType::default(),
    };
    let area_of_study = req
        .params
        .get("areaOfStudy")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let due_dates = match req.params.get("dueDates") {
        Some(v) => match parse_due_dates(v) {
            Ok(entries) if entries.is_empty() => None,
            Ok(entries) => Some(entries),
            Err(m) => return err(&req.id, "bad_params", m, None),
        },
        None => None,
    };
    let expiry_date = req
        .params
        .get("expiryDate")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    if let Some(raw) = expiry_date.as_deref() {
        let Some(expiry_dt) = parse_task_date(raw) else {
            return err(&req.id, "bad_params", "expiryDate is not a valid date", None);
        };
        let mut latest = due_dt;
        for entry in due_dates.iter().flatten() {
            if let Some(d) = parse_task_date(&entry.date) {
                latest = latest.max(d);
            }
        }
        if expiry_dt < latest {
            return err(
                &req.id,
                "bad_params",
                "expiryDate is earlier than a due date",
                None,
            );
        }
    }
    let assignments = match req.params.get("assignments") {
        Some(v) => match parse_assignments(v) {
            Ok(list) => list,
            Err(m) => return err(&req.id, "bad_params", m, None),
        },
        None => default_assignments(),
    };
    for assignment in &assignments {
        let known = store
            .data
            .question_sets
            .iter()
            .any(|qs| qs.id == assignment.question_set_id);
        if !known {
            return err(
                &req.id,
                "not_found",
                "question set not found",
                Some(json!({ "questionSetId": assignment.question_set_id })),
            );
        }
    }
    let temporary_groups = match req.params.get("temporaryGroups") {
        Some(v) => match parse_temporary_groups(v) {
            Ok(groups) if groups.is_empty() => None,
            Ok(groups) => Some(groups),
            Err(m) => return err(&req.id, "bad_params", m, None),
        },
        None => None,
    };
    let questions_count = match parse_count(&req.params, "questionsCount", DEFAULT_QUESTIONS_COUNT)
    {
        Ok(n) => n,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };
    let skills_count = match parse_count(&req.params, "skillsCount", DEFAULT_SKILLS_COUNT) {
        Ok(n) => n,
        Err(m) => return err(&req.id, "bad_params", m, None),
    };

    let task = Task {
        id: Uuid::new_v4().to_string(),
        title,
        class_id: class_id.clone(),
        task_type,
        area_of_study,
        start_date: None,
        due_date,
        due_dates,
        expiry_date,
        assignments,
        temporary_groups,
        created_at: now_iso(),
        questions_count,
        skills_count,
        status: TaskStatus::Active,
    };
    let snapshot = json!(task);
    let result_rows = store.data.roster(&class_id).len();
    if let Err(e) = store.create_task(task) {
        return err(&req.id, "store_write_failed", format!("{e:?}"), None);
    }

    ok(&req.id, json!({ "task": snapshot, "resultRows": result_rows }))
}

fn handle_tasks_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let data = &store.data;

    let task_id = match req.params.get("taskId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing taskId", None),
    };
    let Some(task) = data.task(&task_id) else {
        return err(&req.id, "not_found", "task not found", None);
    };

    let roster: Vec<Student> = data.roster(&task.class_id).into_iter().cloned().collect();
    let result = data.result_for(&task_id);
    let class_name = data
        .class(&task.class_id)
        .map(|c| c.name.clone())
        .unwrap_or_default();
    let profile = if task.class_id == seed::ADVANCED_CLASS_ID {
        SkillWorkProfile::advanced()
    } else {
        SkillWorkProfile::baseline()
    };
    // Seeding with the task id keeps the sheet stable across opens.
    let mut rng = SeededRng::new(&task.id);
    let detail = build_task_detail(
        task,
        &roster,
        result,
        &data.teacher.name,
        &class_name,
        &profile,
        Utc::now(),
        &mut rng,
    );

    ok(&req.id, json!(detail))
}

fn handle_tasks_report(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let data = &store.data;

    let task_id = match req.params.get("taskId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing taskId", None),
    };
    let Some(task) = data.task(&task_id) else {
        return err(&req.id, "not_found", "task not found", None);
    };

    let result = data.result_for(&task_id);
    // Rows follow the roster; students without a stored row count as
    // Not Started with score 0.
    let rows: Vec<(&Student, ResultStatus, i64)> = data
        .roster(&task.class_id)
        .into_iter()
        .map(|student| {
            let row = result.and_then(|r| r.per_student.iter().find(|p| p.student_id == student.id));
            (
                student,
                row.map_or(ResultStatus::NotStarted, |p| p.status),
                row.map_or(0, |p| p.score),
            )
        })
        .collect();

    let group_type = req.params.get("groupType").and_then(|v| v.as_str());
    let group_id = req.params.get("groupId").and_then(|v| v.as_str());
    let selected: Vec<&(&Student, ResultStatus, i64)> = match group_type {
        None => rows.iter().collect(),
        Some("mathspace") => {
            let Some(gid) = group_id else {
                return err(&req.id, "bad_params", "missing groupId", None);
            };
            let Some(cohort) = MathspaceGroup::parse(gid) else {
                return err(&req.id, "bad_params", "unknown mathspace group", None);
            };
            rows.iter()
                .filter(|(s, _, _)| s.effective_group() == cohort)
                .collect()
        }
        Some("persistent") => {
            let Some(gid) = group_id else {
                return err(&req.id, "bad_params", "missing groupId", None);
            };
            let Some(group) = data.group(gid) else {
                return err(&req.id, "not_found", "group not found", None);
            };
            rows.iter()
                .filter(|(s, _, _)| group.student_ids.contains(&s.id))
                .collect()
        }
        Some("temporary") => {
            let Some(gid) = group_id else {
                return err(&req.id, "bad_params", "missing groupId", None);
            };
            let group = task
                .temporary_groups
                .as_deref()
                .and_then(|groups| groups.iter().find(|g| g.id == gid));
            let Some(group) = group else {
                return err(&req.id, "not_found", "temporary group not found", None);
            };
            rows.iter()
                .filter(|(s, _, _)| group.student_ids.contains(&s.id))
                .collect()
        }
        Some(_) => return err(&req.id, "bad_params", "unknown groupType", None),
    };

    let rounded_mean = |rows: &[&(&Student, ResultStatus, i64)]| -> i64 {
        if rows.is_empty() {
            return 0;
        }
        let sum: f64 = rows.iter().map(|(_, _, score)| *score as f64).sum();
        (sum / rows.len() as f64).round() as i64
    };
    let completed_count = selected
        .iter()
        .filter(|(_, status, _)| *status == ResultStatus::Completed)
        .count();

    // The cohort comparison always covers the whole class, whatever the
    // narrowing filter.
    let breakdown: Vec<Value> = MathspaceGroup::ALL
        .iter()
        .map(|cohort| {
            let members: Vec<&(&Student, ResultStatus, i64)> = rows
                .iter()
                .filter(|(s, _, _)| s.effective_group() == *cohort)
                .collect();
            let completed = members
                .iter()
                .filter(|(_, status, _)| *status == ResultStatus::Completed)
                .count();
            json!({
                "group": cohort,
                "count": members.len(),
                "completed": completed,
                "avgScore": rounded_mean(&members),
            })
        })
        .collect();

    let per_student: Vec<Value> = selected
        .iter()
        .map(|(student, status, score)| {
            json!({
                "studentId": student.id,
                "studentName": student.name,
                "mathspaceGroup": student.effective_group(),
                "status": status,
                "score": score,
            })
        })
        .collect();

    ok(
        &req.id,
        json!({
            "taskId": task.id,
            "title": task.title,
            "summary": {
                "completedCount": completed_count,
                "averageScore": rounded_mean(&selected),
                "studentCount": selected.len(),
            },
            "mathspaceBreakdown": breakdown,
            "perStudent": per_student,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "tasks.list" => Some(handle_tasks_list(state, req)),
        "tasks.create" => Some(handle_tasks_create(state, req)),
        "tasks.open" => Some(handle_tasks_open(state, req)),
        "tasks.report" => Some(handle_tasks_report(state, req)),
        _ => None,
    }
}

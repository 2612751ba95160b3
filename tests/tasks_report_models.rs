use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_mathdeskd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn mathdeskd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn raw_request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = raw_request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
    expected_code: &str,
) {
    let value = raw_request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded",
        method
    );
    assert_eq!(
        value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some(expected_code),
        "wrong error code for {}: {}",
        method,
        value
    );
}

#[test]
fn whole_class_report_is_consistent_with_its_listing() {
    let workspace = temp_dir("mathdesk-report-whole");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let report = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "tasks.report",
        json!({ "taskId": "task-class-a-1" }),
    );

    let summary = report.get("summary").expect("summary");
    assert_eq!(
        summary.get("studentCount").and_then(|v| v.as_u64()),
        Some(30)
    );

    let listing = report
        .get("perStudent")
        .and_then(|v| v.as_array())
        .expect("perStudent listing");
    assert_eq!(listing.len(), 30);

    // The summary mean counts every row, zeros included.
    let scores: Vec<f64> = listing
        .iter()
        .map(|row| row.get("score").and_then(|v| v.as_f64()).expect("score"))
        .collect();
    let expected_avg = (scores.iter().sum::<f64>() / scores.len() as f64).round() as i64;
    assert_eq!(
        summary.get("averageScore").and_then(|v| v.as_i64()),
        Some(expected_avg)
    );

    let completed_rows = listing
        .iter()
        .filter(|row| row.get("status").and_then(|v| v.as_str()) == Some("Completed"))
        .count() as u64;
    assert_eq!(
        summary.get("completedCount").and_then(|v| v.as_u64()),
        Some(completed_rows)
    );

    let breakdown = report
        .get("mathspaceBreakdown")
        .and_then(|v| v.as_array())
        .expect("breakdown");
    assert_eq!(breakdown.len(), 3);
    let cohort_total: u64 = breakdown
        .iter()
        .map(|row| row.get("count").and_then(|v| v.as_u64()).unwrap_or(0))
        .sum();
    assert_eq!(cohort_total, 30);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn narrowing_filters_the_summary_but_not_the_breakdown() {
    let workspace = temp_dir("mathdesk-report-narrow");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let whole = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "tasks.report",
        json!({ "taskId": "task-class-a-1" }),
    );
    let explorer_count_in_breakdown = whole
        .get("mathspaceBreakdown")
        .and_then(|v| v.as_array())
        .and_then(|rows| {
            rows.iter()
                .find(|r| r.get("group").and_then(|v| v.as_str()) == Some("Explorer"))
        })
        .and_then(|r| r.get("count"))
        .and_then(|v| v.as_u64())
        .expect("Explorer breakdown row");

    let narrowed = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "tasks.report",
        json!({
            "taskId": "task-class-a-1",
            "groupType": "mathspace",
            "groupId": "Explorer"
        }),
    );
    assert_eq!(
        narrowed
            .get("summary")
            .and_then(|s| s.get("studentCount"))
            .and_then(|v| v.as_u64()),
        Some(explorer_count_in_breakdown)
    );
    let listing = narrowed
        .get("perStudent")
        .and_then(|v| v.as_array())
        .expect("narrowed listing");
    assert!(listing
        .iter()
        .all(|row| row.get("mathspaceGroup").and_then(|v| v.as_str()) == Some("Explorer")));

    // The cohort comparison still spans the whole class.
    let narrowed_breakdown_total: u64 = narrowed
        .get("mathspaceBreakdown")
        .and_then(|v| v.as_array())
        .expect("breakdown")
        .iter()
        .map(|row| row.get("count").and_then(|v| v.as_u64()).unwrap_or(0))
        .sum();
    assert_eq!(narrowed_breakdown_total, 30);

    let by_group = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "tasks.report",
        json!({
            "taskId": "task-class-a-1",
            "groupType": "persistent",
            "groupId": "group-1"
        }),
    );
    assert_eq!(
        by_group
            .get("summary")
            .and_then(|s| s.get("studentCount"))
            .and_then(|v| v.as_u64()),
        Some(4)
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn temporary_group_narrowing_uses_the_tasks_own_groups() {
    let workspace = temp_dir("mathdesk-report-temporary");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "tasks.create",
        json!({
            "classId": "class-a",
            "title": "Paired Investigation",
            "dueDate": "2025-03-14T23:59:59.000Z",
            "temporaryGroups": [
                { "name": "Pair One", "studentIds": ["student-2", "student-4"] }
            ]
        }),
    );
    let task_id = created
        .get("task")
        .and_then(|t| t.get("id"))
        .and_then(|v| v.as_str())
        .expect("task id")
        .to_string();
    let temp_group_id = created
        .get("task")
        .and_then(|t| t.get("temporaryGroups"))
        .and_then(|v| v.as_array())
        .and_then(|a| a.first())
        .and_then(|g| g.get("id"))
        .and_then(|v| v.as_str())
        .expect("temporary group id")
        .to_string();

    let narrowed = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "tasks.report",
        json!({
            "taskId": task_id,
            "groupType": "temporary",
            "groupId": temp_group_id
        }),
    );
    assert_eq!(
        narrowed
            .get("summary")
            .and_then(|s| s.get("studentCount"))
            .and_then(|v| v.as_u64()),
        Some(2)
    );

    request_err(
        &mut stdin,
        &mut reader,
        "4",
        "tasks.report",
        json!({ "taskId": task_id, "groupType": "temporary", "groupId": "tg-404" }),
        "not_found",
    );
    request_err(
        &mut stdin,
        &mut reader,
        "5",
        "tasks.report",
        json!({ "taskId": task_id, "groupType": "house", "groupId": "red" }),
        "bad_params",
    );
    request_err(
        &mut stdin,
        &mut reader,
        "6",
        "tasks.report",
        json!({ "taskId": task_id, "groupType": "mathspace", "groupId": "Pathfinder" }),
        "bad_params",
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

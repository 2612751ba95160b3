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

fn request_ok(
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

fn open_curriculum(workspace: &PathBuf, class_id: &str) -> serde_json::Value {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "curriculum.open",
        json!({ "classId": class_id }),
    );
    drop(stdin);
    let _ = child.wait();
    result
}

#[test]
fn curriculum_view_is_stable_across_opens_and_restarts() {
    let workspace = temp_dir("mathdesk-curriculum-stable");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let first = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "curriculum.open",
        json!({ "classId": "class-a" }),
    );
    let second = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "curriculum.open",
        json!({ "classId": "class-a" }),
    );
    drop(stdin);
    let _ = child.wait();

    assert_eq!(first, second, "same daemon, same view");

    let after_restart = open_curriculum(&workspace, "class-a");
    assert_eq!(first, after_restart, "restart must not change the view");

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn mastery_levels_are_integral_and_bounded() {
    let workspace = temp_dir("mathdesk-curriculum-bounds");
    let result = open_curriculum(&workspace, "class-a");

    let students = result
        .get("students")
        .and_then(|v| v.as_array())
        .expect("students array");
    assert_eq!(students.len(), 30);
    for student in students {
        let skills = student
            .get("skillMasteries")
            .and_then(|v| v.as_object())
            .expect("skillMasteries map");
        assert!(!skills.is_empty());
        for (skill_id, level) in skills {
            let level = level.as_u64().expect("integral mastery level");
            assert!(
                level <= 5,
                "skill {} level {} out of range",
                skill_id,
                level
            );
        }
    }

    let topics = result
        .get("topics")
        .and_then(|v| v.as_array())
        .expect("topics array");
    for topic in topics {
        let avg = topic
            .get("classAverageMastery")
            .and_then(|v| v.as_f64())
            .expect("topic average");
        assert!((0.0..=5.0).contains(&avg));

        let breakdown = topic
            .get("studentBreakdown")
            .and_then(|v| v.as_object())
            .expect("breakdown");
        let total: u64 = ["strong", "developing", "needsSupport"]
            .iter()
            .map(|k| breakdown.get(*k).and_then(|v| v.as_u64()).unwrap_or(0))
            .sum();
        assert_eq!(total, 30, "breakdown must cover the roster");
    }

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn advanced_class_outpaces_baseline_class() {
    let workspace = temp_dir("mathdesk-curriculum-cohorts");
    let baseline = open_curriculum(&workspace, "class-a");
    let advanced = open_curriculum(&workspace, "class-b");

    let overall = |v: &serde_json::Value| {
        v.get("overallClassMastery")
            .and_then(|m| m.as_f64())
            .expect("overall mastery")
    };
    assert!(
        overall(&advanced) > overall(&baseline),
        "class-b targets sit well above class-a's"
    );

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn caller_targets_override_the_built_in_table() {
    let workspace = temp_dir("mathdesk-curriculum-targets");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let maxed = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "curriculum.open",
        json!({
            "classId": "class-a",
            "targets": {
                "topic-linear-relationships": 5.0,
                "topic-indices": 5.0,
                "topic-computation": 5.0,
                "topic-measurement": 5.0
            }
        }),
    );
    drop(stdin);
    let _ = child.wait();

    let overall = maxed
        .get("overallClassMastery")
        .and_then(|v| v.as_f64())
        .expect("overall mastery");
    assert!(
        overall >= 3.0,
        "maxed targets must lift the class average, got {}",
        overall
    );

    let _ = std::fs::remove_dir_all(workspace);
}

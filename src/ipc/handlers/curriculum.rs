use std::collections::BTreeMap;

use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::mastery::{self, SeededRng, SimulatorConfig};
use crate::model::Student;
use crate::seed;

fn built_in_targets(class_id: &str) -> BTreeMap<String, f64> {
    if class_id == seed::ADVANCED_CLASS_ID {
        mastery::advanced_targets()
    } else {
        mastery::baseline_targets()
    }
}

fn handle_curriculum_open(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    // Caller-supplied targets override the built-in table entry by entry.
    let mut targets = built_in_targets(&class_id);
    if let Some(value) = req.params.get("targets") {
        let Some(map) = value.as_object() else {
            return err(
                &req.id,
                "bad_params",
                "targets must map topic ids to numbers",
                None,
            );
        };
        for (topic_id, v) in map {
            let Some(n) = v.as_f64() else {
                return err(
                    &req.id,
                    "bad_params",
                    "targets must map topic ids to numbers",
                    None,
                );
            };
            targets.insert(topic_id.clone(), n);
        }
    }

    let roster: Vec<Student> = data.roster(&class_id).into_iter().cloned().collect();
    let config = SimulatorConfig::with_targets(targets);
    // One fixed seed per class keeps the mastery view stable across opens
    // and daemon restarts.
    let mut rng = SeededRng::new(&format!("{class_id}-curriculum"));
    let curriculum = mastery::generate_curriculum_data(&roster, &config, &mut rng);

    let mut result = json!(curriculum);
    result["classId"] = json!(class.id);
    result["className"] = json!(class.name);
    ok(&req.id, result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "curriculum.open" => Some(handle_curriculum_open(state, req)),
        _ => None,
    }
}

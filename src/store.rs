use crate::model::{AppData, PersistentGroup, ResultStatus, Student, StudentTaskResult, Task, TaskResult};
use crate::seed;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub const STORE_FILE: &str = "mathdesk.json";

// The whole dataset plus the file it came from. Mutation helpers follow a
// read-modify-write-whole-blob discipline: change the in-memory document,
// then rewrite the file.
pub struct Store {
    path: PathBuf,
    pub data: AppData,
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// Binds the store to `<workspace>/mathdesk.json`, creating the directory if
// needed. A missing file is seeded; a file that fails to parse or has no
// students is discarded and reseeded. Returns whether seeding happened.
pub fn open_store(workspace: &Path) -> anyhow::Result<(Store, bool)> {
    fs::create_dir_all(workspace)?;
    let path = workspace.join(STORE_FILE);

    if !path.exists() {
        let store = Store {
            path,
            data: seed::initial_data(Utc::now()),
        };
        store.save()?;
        return Ok((store, true));
    }

    let raw = fs::read_to_string(&path)?;
    if let Ok(value) = serde_json::from_str::<Value>(&raw) {
        if let Ok(mut data) = serde_json::from_value::<AppData>(value.clone()) {
            if !data.students.is_empty() {
                let refilled = refill_absent_collections(&mut data, &value);
                let store = Store { path, data };
                if refilled {
                    store.save()?;
                }
                return Ok((store, false));
            }
        }
    }

    // Corrupt or shape-invalid document: replace it with a fresh seed.
    let store = Store {
        path,
        data: seed::initial_data(Utc::now()),
    };
    store.save()?;
    Ok((store, true))
}

// Documents written before a collection existed parse with that collection
// empty; backfill from a fresh seed so older workspaces keep working. Only
// keys absent from the stored JSON count: a collection that is present but
// empty was emptied on purpose and stays that way.
fn refill_absent_collections(data: &mut AppData, raw: &Value) -> bool {
    let absent = |key: &str| raw.get(key).map_or(true, Value::is_null);

    let missing_any = absent("classes")
        || absent("persistentGroups")
        || absent("tasks")
        || absent("taskResults")
        || absent("questionSets")
        || absent("studentActivities");
    if !missing_any {
        return false;
    }

    let fresh = seed::initial_data(Utc::now());
    if absent("classes") {
        data.classes = fresh.classes;
    }
    if absent("persistentGroups") {
        data.persistent_groups = fresh.persistent_groups;
    }
    if absent("tasks") {
        data.tasks = fresh.tasks;
    }
    if absent("taskResults") {
        data.task_results = fresh.task_results;
    }
    if absent("questionSets") {
        data.question_sets = fresh.question_sets;
    }
    if absent("studentActivities") {
        data.student_activities = fresh.student_activities;
    }
    true
}

impl Store {
    // Serializes the whole document and replaces the file atomically: write
    // a sibling temp file, then rename over the target.
    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.data)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    // Discards the document and writes a fresh seed in its place.
    pub fn reset(&mut self) -> anyhow::Result<()> {
        self.data = seed::initial_data(Utc::now());
        self.save()
    }

    // Applies `patch` to the student if present and saves. Returns whether
    // the student existed.
    pub fn update_student<F>(&mut self, student_id: &str, patch: F) -> anyhow::Result<bool>
    where
        F: FnOnce(&mut Student),
    {
        let Some(student) = self
            .data
            .students
            .iter_mut()
            .find(|s| s.id == student_id)
        else {
            return Ok(false);
        };
        patch(student);
        self.save()?;
        Ok(true)
    }

    pub fn create_group(&mut self, group: PersistentGroup) -> anyhow::Result<()> {
        self.data.persistent_groups.push(group);
        self.save()
    }

    // Applies `patch` to the group if present, bumps `updatedAt`, saves.
    pub fn update_group<F>(&mut self, group_id: &str, patch: F) -> anyhow::Result<bool>
    where
        F: FnOnce(&mut PersistentGroup),
    {
        let Some(group) = self
            .data
            .persistent_groups
            .iter_mut()
            .find(|g| g.id == group_id)
        else {
            return Ok(false);
        };
        patch(group);
        group.updated_at = now_iso();
        self.save()?;
        Ok(true)
    }

    pub fn delete_group(&mut self, group_id: &str) -> anyhow::Result<bool> {
        let before = self.data.persistent_groups.len();
        self.data.persistent_groups.retain(|g| g.id != group_id);
        if self.data.persistent_groups.len() == before {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    // Adds the student to the group. `None` if the group is missing;
    // `Some(false)` if the student was already a member (no write).
    pub fn add_student_to_group(
        &mut self,
        group_id: &str,
        student_id: &str,
    ) -> anyhow::Result<Option<bool>> {
        let Some(group) = self
            .data
            .persistent_groups
            .iter_mut()
            .find(|g| g.id == group_id)
        else {
            return Ok(None);
        };
        if group.student_ids.iter().any(|id| id == student_id) {
            return Ok(Some(false));
        }
        group.student_ids.push(student_id.to_string());
        group.updated_at = now_iso();
        self.save()?;
        Ok(Some(true))
    }

    // Removes the student from the group. Bumps `updatedAt` and saves even
    // when the student was not a member. `None` if the group is missing.
    pub fn remove_student_from_group(
        &mut self,
        group_id: &str,
        student_id: &str,
    ) -> anyhow::Result<Option<bool>> {
        let Some(group) = self
            .data
            .persistent_groups
            .iter_mut()
            .find(|g| g.id == group_id)
        else {
            return Ok(None);
        };
        let before = group.student_ids.len();
        group.student_ids.retain(|id| id != student_id);
        let removed = group.student_ids.len() != before;
        group.updated_at = now_iso();
        self.save()?;
        Ok(Some(removed))
    }

    // Stores the task and one `Not Started` result row (score 0) for every
    // student rostered in the task's class.
    pub fn create_task(&mut self, task: Task) -> anyhow::Result<()> {
        let per_student: Vec<StudentTaskResult> = self
            .data
            .students
            .iter()
            .filter(|s| s.class_id == task.class_id)
            .map(|s| StudentTaskResult {
                student_id: s.id.clone(),
                status: ResultStatus::NotStarted,
                score: 0,
            })
            .collect();
        self.data.task_results.push(TaskResult {
            task_id: task.id.clone(),
            per_student,
        });
        self.data.tasks.push(task);
        self.save()
    }
}

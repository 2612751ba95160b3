use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Platform cohort a student practices in. Cohorts get differentiated due
// dates and question-set defaults when tasks are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MathspaceGroup {
    Explorer,
    Adventurer,
    Trailblazer,
}

impl MathspaceGroup {
    pub const ALL: [MathspaceGroup; 3] = [
        MathspaceGroup::Explorer,
        MathspaceGroup::Adventurer,
        MathspaceGroup::Trailblazer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MathspaceGroup::Explorer => "Explorer",
            MathspaceGroup::Adventurer => "Adventurer",
            MathspaceGroup::Trailblazer => "Trailblazer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Explorer" => Some(MathspaceGroup::Explorer),
            "Adventurer" => Some(MathspaceGroup::Adventurer),
            "Trailblazer" => Some(MathspaceGroup::Trailblazer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Expired,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    TopicReadinessCheckin,
    Adaptive,
    Custom,
    Test,
    Revision,
}

impl Default for TaskType {
    fn default() -> Self {
        TaskType::Custom
    }
}

impl TaskType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "topic-readiness-checkin" => Some(TaskType::TopicReadinessCheckin),
            "adaptive" => Some(TaskType::Adaptive),
            "custom" => Some(TaskType::Custom),
            "test" => Some(TaskType::Test),
            "revision" => Some(TaskType::Revision),
            _ => None,
        }
    }
}

// What kind of group a task assignment points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Mathspace,
    Persistent,
    Temporary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct School {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: String,
    pub name: String,
    pub email: String,
    pub school_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: String,
    pub name: String,
    pub school_id: String,
    pub teacher_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub class_id: String,
    pub mathspace_group: MathspaceGroup,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mathspace_group_override: Option<MathspaceGroup>,
    pub avatar_url: String,
}

impl Student {
    // Cohort used for display and task grouping; an override beats the
    // platform assignment.
    pub fn effective_group(&self) -> MathspaceGroup {
        self.mathspace_group_override.unwrap_or(self.mathspace_group)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentLedTasks {
    pub discovery_checkins: i64,
    pub topic_readiness_checkins: i64,
    pub adaptive_tasks: i64,
    pub revisions: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherAssignedTasks {
    pub topic_readiness_checkins: i64,
    pub adaptive_tasks: i64,
    pub custom_tasks: i64,
    pub revisions: i64,
    pub tests: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillTally {
    pub count: i64,
    /// Net change over the reporting window; may be negative.
    pub change: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionTally {
    pub total: i64,
    pub new: i64,
    pub revision_cleared: i64,
    pub revision_remaining: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracyTally {
    pub percentage: i64,
    pub correct: i64,
    pub partial: i64,
    pub incorrect: i64,
    pub skipped: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeSpent {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentActivity {
    pub student_id: String,
    pub student_led_tasks: StudentLedTasks,
    pub teacher_assigned_tasks: TeacherAssignedTasks,
    pub skills: SkillTally,
    pub questions: QuestionTally,
    pub accuracy: AccuracyTally,
    pub points: i64,
    pub time_spent: TimeSpent,
    pub last_active: DateTime<Utc>,
    pub stickers_received: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentGroup {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub kind: GroupKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    #[serde(default)]
    pub student_ids: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporaryGroup {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "type")]
    pub kind: GroupKind,
    #[serde(default)]
    pub student_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSet {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAssignment {
    pub group_id: String,
    pub group_type: GroupKind,
    pub group_name: String,
    pub question_set_id: String,
}

// One due-date entry; a single entry may cover several cohorts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDueDate {
    pub date: String,
    #[serde(default)]
    pub group_ids: Vec<String>,
    #[serde(default)]
    pub group_names: Vec<String>,
}

pub const DEFAULT_QUESTIONS_COUNT: i64 = 10;
pub const DEFAULT_SKILLS_COUNT: i64 = 8;

fn default_questions_count() -> i64 {
    DEFAULT_QUESTIONS_COUNT
}

fn default_skills_count() -> i64 {
    DEFAULT_SKILLS_COUNT
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub class_id: String,
    #[serde(default)]
    pub task_type: TaskType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_of_study: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Overall (latest) due date; `due_dates` may refine it per cohort.
    pub due_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_dates: Option<Vec<TaskDueDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub assignments: Vec<TaskAssignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporary_groups: Option<Vec<TemporaryGroup>>,
    pub created_at: String,
    #[serde(default = "default_questions_count")]
    pub questions_count: i64,
    #[serde(default = "default_skills_count")]
    pub skills_count: i64,
    #[serde(default)]
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentTaskResult {
    pub student_id: String,
    pub status: ResultStatus,
    pub score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub task_id: String,
    pub per_student: Vec<StudentTaskResult>,
}

// The whole persisted document. Collections default to empty so documents
// written by older builds still parse; the store refills missing ones from
// seed data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    pub school: School,
    pub teacher: Teacher,
    #[serde(default)]
    pub classes: Vec<Class>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub persistent_groups: Vec<PersistentGroup>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub task_results: Vec<TaskResult>,
    #[serde(default)]
    pub question_sets: Vec<QuestionSet>,
    #[serde(default)]
    pub student_activities: Vec<StudentActivity>,
}

impl AppData {
    pub fn class(&self, class_id: &str) -> Option<&Class> {
        self.classes.iter().find(|c| c.id == class_id)
    }

    pub fn student(&self, student_id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == student_id)
    }

    pub fn roster(&self, class_id: &str) -> Vec<&Student> {
        self.students
            .iter()
            .filter(|s| s.class_id == class_id)
            .collect()
    }

    pub fn group(&self, group_id: &str) -> Option<&PersistentGroup> {
        self.persistent_groups.iter().find(|g| g.id == group_id)
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn result_for(&self, task_id: &str) -> Option<&TaskResult> {
        self.task_results.iter().find(|r| r.task_id == task_id)
    }

    pub fn activity(&self, student_id: &str) -> Option<&StudentActivity> {
        self.student_activities
            .iter()
            .find(|a| a.student_id == student_id)
    }
}

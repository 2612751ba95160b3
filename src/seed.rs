use crate::model::{
    AccuracyTally, AppData, Class, GroupKind, MathspaceGroup, PersistentGroup, QuestionSet,
    QuestionTally, ResultStatus, School, SkillTally, Student, StudentActivity, StudentLedTasks,
    StudentTaskResult, Task, TaskAssignment, TaskDueDate, TaskResult, TaskStatus, TaskType,
    Teacher, TeacherAssignedTasks, TimeSpent,
};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::Rng;

const FIRST_NAMES: [&str; 30] = [
    "Emma", "Liam", "Olivia", "Noah", "Ava", "Ethan", "Sophia", "Mason", "Isabella", "William",
    "Mia", "James", "Charlotte", "Benjamin", "Amelia", "Lucas", "Harper", "Henry", "Evelyn",
    "Alexander", "Abigail", "Michael", "Emily", "Daniel", "Elizabeth", "Jacob", "Sofia", "Logan",
    "Avery", "Jackson",
];

const LAST_NAMES: [&str; 30] = [
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin", "Lee", "Perez", "Thompson", "White", "Harris", "Sanchez",
    "Clark", "Ramirez", "Lewis", "Robinson",
];

const AVATARS: [&str; 30] = [
    "Avatar-Animal-Bear-Doctor.png",
    "Avatar-Animal-Bear-Inspector.png",
    "Avatar-Animal-Bull-Clap.png",
    "Avatar-Animal-Bunny-Magic.png",
    "Avatar-Animal-Bunny.png",
    "Avatar-Animal-Cake.png",
    "Avatar-Animal-Capybara-Floaty.png",
    "Avatar-Animal-Deer-Formal.png",
    "Avatar-Animal-Deer-Winter.png",
    "Avatar-Animal-Giraffe.png",
    "Avatar-Animal-Lion-Soccer.png",
    "Avatar-Animal-Penguin-Astronaut.png",
    "Avatar-Animal-Penguin-Royal.png",
    "Avatar-Animal-Penguin-Top-hat.png",
    "Avatar-Animal-Penguin-Winter.png",
    "Avatar-Animal-Racoon-Pilot.png",
    "Avatar-Animal-RedPanda-Woods.png",
    "Avatar-Animal-Roo-Boxing.png",
    "Avatar-Animal-Seal.png",
    "Avatar-Animal-Sloth.png",
    "Avatar-Animal-Snake.png",
    "Avatar-Animal-Tiger.png",
    "Avatar-Animal-Wolf-Formal.png",
    "Avatar-Dino-Grad.png",
    "Avatar-Dino-Music.png",
    "Animal-Cat@2x.png",
    "Animal-Duck@2x.png",
    "Animal-Panda@2x.png",
    "Animal-Shark@2x.png",
    "Avatar-Generic.png",
];

// Fixed dates for the readiness check-in so the seeded workspace always has
// one task sitting in its extension window during early February 2025.
const JAN_28: &str = "2025-01-28T00:00:00.000Z";
const FEB_1: &str = "2025-02-01T23:59:59.000Z";
const FEB_4: &str = "2025-02-04T23:59:59.000Z";
const FEB_10: &str = "2025-02-10T23:59:59.000Z";

const ROSTER_SIZE: usize = 30;

// Class whose seed results and simulator targets run hot; the rest use the
// baseline tables.
pub const ADVANCED_CLASS_ID: &str = "class-b";

fn iso(stamp: DateTime<Utc>) -> String {
    stamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// Builds the mock dataset a fresh workspace starts from: one school, one
// teacher, two 30-student classes with activity records, four tasks per
// class with result rows, two persistent groups, and three question sets.
// Intentionally not reproducible across workspaces; fixture randomness uses
// the thread generator.
pub fn initial_data(now: DateTime<Utc>) -> AppData {
    let mut rng = rand::rng();

    let mut students = generate_students("class-a", 1, &mut rng);
    students.extend(generate_students("class-b", 31, &mut rng));

    let mut tasks = generate_tasks("class-a", now);
    tasks.extend(generate_tasks("class-b", now));

    let task_results = generate_task_results(&tasks, &students, &mut rng);
    let student_activities = generate_student_activities(&students, now, &mut rng);

    let week_ago = iso(now - Duration::days(7));
    let fortnight_ago = iso(now - Duration::days(14));

    AppData {
        school: School {
            id: "school-1".to_string(),
            name: "Oakwood High School".to_string(),
        },
        teacher: Teacher {
            id: "teacher-1".to_string(),
            name: "Sarah Mitchell".to_string(),
            email: "sarah.mitchell@oakwood.edu".to_string(),
            school_id: "school-1".to_string(),
        },
        classes: vec![
            Class {
                id: "class-a".to_string(),
                name: "Class A - Year 9 Math".to_string(),
                school_id: "school-1".to_string(),
                teacher_id: "teacher-1".to_string(),
            },
            Class {
                id: "class-b".to_string(),
                name: "Class B - Year 9 Math".to_string(),
                school_id: "school-1".to_string(),
                teacher_id: "teacher-1".to_string(),
            },
        ],
        students,
        persistent_groups: vec![
            PersistentGroup {
                id: "group-1".to_string(),
                name: "Struggling with Algebra".to_string(),
                description: Some(
                    "Students who need extra support with algebraic concepts".to_string(),
                ),
                color: "#ef4444".to_string(),
                tags: vec!["algebra".to_string(), "support".to_string()],
                kind: GroupKind::Persistent,
                class_id: Some("class-a".to_string()),
                student_ids: vec![
                    "student-1".to_string(),
                    "student-5".to_string(),
                    "student-8".to_string(),
                    "student-12".to_string(),
                ],
                created_at: week_ago.clone(),
                updated_at: week_ago,
            },
            PersistentGroup {
                id: "group-2".to_string(),
                name: "Advanced Problem Solvers".to_string(),
                description: Some(
                    "High-performing students ready for challenge tasks".to_string(),
                ),
                color: "#3b82f6".to_string(),
                tags: vec!["advanced".to_string(), "enrichment".to_string()],
                kind: GroupKind::Persistent,
                class_id: Some("class-a".to_string()),
                student_ids: vec![
                    "student-2".to_string(),
                    "student-4".to_string(),
                    "student-9".to_string(),
                    "student-15".to_string(),
                    "student-20".to_string(),
                ],
                created_at: fortnight_ago.clone(),
                updated_at: fortnight_ago,
            },
        ],
        tasks,
        task_results,
        question_sets: vec![
            QuestionSet {
                id: "qs-a".to_string(),
                name: "Question Set A - Foundation".to_string(),
            },
            QuestionSet {
                id: "qs-b".to_string(),
                name: "Question Set B - Standard".to_string(),
            },
            QuestionSet {
                id: "qs-c".to_string(),
                name: "Question Set C - Advanced".to_string(),
            },
        ],
        student_activities,
    }
}

fn generate_students(class_id: &str, start_index: usize, rng: &mut impl Rng) -> Vec<Student> {
    (0..ROSTER_SIZE)
        .map(|i| {
            let student_index = start_index + i;
            let first_name = FIRST_NAMES[i % FIRST_NAMES.len()];
            let last_name = LAST_NAMES[i % LAST_NAMES.len()];
            Student {
                id: format!("student-{student_index}"),
                name: format!("{first_name} {last_name}"),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                class_id: class_id.to_string(),
                mathspace_group: MathspaceGroup::ALL[rng.random_range(0..3)],
                mathspace_group_override: None,
                avatar_url: AVATARS[student_index % AVATARS.len()].to_string(),
            }
        })
        .collect()
}

fn generate_student_activities(
    students: &[Student],
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Vec<StudentActivity> {
    // Hour offsets: recent logins mixed with a few stale ones up to a month.
    let hours_ago: [i64; 7] = [2, 5, 14, 48, 456, 336, 720];

    students
        .iter()
        .map(|student| {
            let total: i64 = rng.random_range(50..=500);
            let correct = rng.random_range((total / 2)..=(total * 9 / 10));
            let partial = rng.random_range(0..=(total / 10));
            let incorrect = rng.random_range(0..=(total - correct - partial));
            let skipped = total - correct - partial - incorrect;

            StudentActivity {
                student_id: student.id.clone(),
                student_led_tasks: StudentLedTasks {
                    discovery_checkins: rng.random_range(0..=5),
                    topic_readiness_checkins: rng.random_range(0..=8),
                    adaptive_tasks: rng.random_range(0..=6),
                    revisions: rng.random_range(0..=4),
                },
                teacher_assigned_tasks: TeacherAssignedTasks {
                    topic_readiness_checkins: rng.random_range(0..=10),
                    adaptive_tasks: rng.random_range(0..=10),
                    custom_tasks: rng.random_range(0..=8),
                    revisions: rng.random_range(0..=5),
                    tests: rng.random_range(0..=3),
                },
                skills: SkillTally {
                    count: rng.random_range(5..=50),
                    change: rng.random_range(-5..=15),
                },
                questions: QuestionTally {
                    total,
                    new: rng.random_range(10..=100),
                    revision_cleared: rng.random_range(0..=50),
                    revision_remaining: rng.random_range(0..=30),
                },
                accuracy: AccuracyTally {
                    percentage: ((correct as f64 / total as f64) * 100.0).round() as i64,
                    correct,
                    partial,
                    incorrect,
                    skipped,
                },
                points: rng.random_range(200..=5000),
                time_spent: TimeSpent {
                    days: rng.random_range(0..=2),
                    hours: rng.random_range(0..=23),
                    minutes: rng.random_range(0..=59),
                },
                last_active: now - Duration::hours(hours_ago[rng.random_range(0..hours_ago.len())]),
                stickers_received: rng.random_range(2..=20),
            }
        })
        .collect()
}

pub(crate) fn mathspace_assignment(group: MathspaceGroup, question_set_id: &str) -> TaskAssignment {
    TaskAssignment {
        group_id: format!("mathspace-{}", group.as_str()),
        group_type: GroupKind::Mathspace,
        group_name: group.as_str().to_string(),
        question_set_id: question_set_id.to_string(),
    }
}

fn generate_tasks(class_id: &str, now: DateTime<Utc>) -> Vec<Task> {
    let two_weeks_out = iso(now + Duration::days(14));
    let week_ago = iso(now - Duration::days(7));
    let fortnight_ago = iso(now - Duration::days(14));

    vec![
        Task {
            id: format!("task-{class_id}-1"),
            title: "Linear Equations Readiness Check-in".to_string(),
            class_id: class_id.to_string(),
            task_type: TaskType::TopicReadinessCheckin,
            area_of_study: Some("Algebra".to_string()),
            start_date: Some(JAN_28.to_string()),
            due_date: FEB_4.to_string(),
            due_dates: Some(vec![
                TaskDueDate {
                    date: FEB_1.to_string(),
                    group_ids: vec!["mathspace-Explorer".to_string()],
                    group_names: vec!["Explorer".to_string()],
                },
                TaskDueDate {
                    date: FEB_4.to_string(),
                    group_ids: vec![
                        "mathspace-Adventurer".to_string(),
                        "mathspace-Trailblazer".to_string(),
                    ],
                    group_names: vec!["Adventurer".to_string(), "Trailblazer".to_string()],
                },
            ]),
            expiry_date: Some(FEB_10.to_string()),
            assignments: vec![
                mathspace_assignment(MathspaceGroup::Explorer, "qs-a"),
                mathspace_assignment(MathspaceGroup::Adventurer, "qs-b"),
                mathspace_assignment(MathspaceGroup::Trailblazer, "qs-c"),
            ],
            temporary_groups: None,
            created_at: JAN_28.to_string(),
            questions_count: 10,
            skills_count: 10,
            status: TaskStatus::Active,
        },
        Task {
            id: format!("task-{class_id}-2"),
            title: "Quadratic Functions Practice".to_string(),
            class_id: class_id.to_string(),
            task_type: TaskType::Adaptive,
            area_of_study: Some("Algebra".to_string()),
            start_date: Some(iso(now)),
            due_date: two_weeks_out,
            due_dates: None,
            expiry_date: None,
            assignments: vec![
                mathspace_assignment(MathspaceGroup::Adventurer, "qs-b"),
                mathspace_assignment(MathspaceGroup::Trailblazer, "qs-c"),
            ],
            temporary_groups: None,
            created_at: iso(now),
            questions_count: 15,
            skills_count: 5,
            status: TaskStatus::Active,
        },
        Task {
            id: format!("task-{class_id}-3"),
            title: "Geometry Foundations Test".to_string(),
            class_id: class_id.to_string(),
            task_type: TaskType::Test,
            area_of_study: Some("Geometry".to_string()),
            start_date: Some(week_ago.clone()),
            due_date: week_ago.clone(),
            due_dates: None,
            expiry_date: None,
            assignments: vec![
                mathspace_assignment(MathspaceGroup::Explorer, "qs-a"),
                mathspace_assignment(MathspaceGroup::Adventurer, "qs-a"),
                mathspace_assignment(MathspaceGroup::Trailblazer, "qs-a"),
            ],
            temporary_groups: None,
            created_at: fortnight_ago.clone(),
            questions_count: 20,
            skills_count: 12,
            status: TaskStatus::Expired,
        },
        Task {
            id: format!("task-{class_id}-4"),
            title: "Fractions Review".to_string(),
            class_id: class_id.to_string(),
            task_type: TaskType::Revision,
            area_of_study: Some("Number".to_string()),
            start_date: Some(fortnight_ago.clone()),
            due_date: week_ago,
            due_dates: None,
            expiry_date: None,
            assignments: vec![TaskAssignment {
                group_id: "group-1".to_string(),
                group_type: GroupKind::Persistent,
                group_name: "Struggling with Algebra".to_string(),
                question_set_id: "qs-a".to_string(),
            }],
            temporary_groups: None,
            created_at: fortnight_ago,
            questions_count: 12,
            skills_count: 6,
            status: TaskStatus::Expired,
        },
    ]
}

fn generate_task_results(
    tasks: &[Task],
    students: &[Student],
    rng: &mut impl Rng,
) -> Vec<TaskResult> {
    tasks
        .iter()
        .map(|task| {
            let roster: Vec<&Student> = students
                .iter()
                .filter(|s| s.class_id == task.class_id)
                .collect();
            let forced_distribution = task.class_id == ADVANCED_CLASS_ID
                && task.task_type == TaskType::TopicReadinessCheckin;

            let per_student = roster
                .iter()
                .enumerate()
                .map(|(index, student)| {
                    let (status, score) = if forced_distribution {
                        // Nearly everyone finished the class-b check-in, with
                        // a skewed score spread so the readiness view shows
                        // all three buckets.
                        if index < 28 {
                            let score = if index < 5 {
                                rng.random_range(75..=95)
                            } else if index < 27 {
                                rng.random_range(45..=68)
                            } else {
                                rng.random_range(25..=38)
                            };
                            (ResultStatus::Completed, score)
                        } else if rng.random::<f64>() < 0.5 {
                            (ResultStatus::InProgress, rng.random_range(20..=35))
                        } else {
                            (ResultStatus::NotStarted, 0)
                        }
                    } else {
                        let draw: f64 = rng.random();
                        let status = if task.status == TaskStatus::Expired {
                            if draw < 0.85 {
                                ResultStatus::Completed
                            } else if draw < 0.95 {
                                ResultStatus::InProgress
                            } else {
                                ResultStatus::NotStarted
                            }
                        } else if draw < 0.4 {
                            ResultStatus::Completed
                        } else if draw < 0.7 {
                            ResultStatus::InProgress
                        } else {
                            ResultStatus::NotStarted
                        };
                        let score = match status {
                            ResultStatus::Completed => rng.random_range(45..=100),
                            ResultStatus::InProgress => rng.random_range(20..=70),
                            ResultStatus::NotStarted => 0,
                        };
                        (status, score)
                    };

                    StudentTaskResult {
                        student_id: student.id.clone(),
                        status,
                        score,
                    }
                })
                .collect();

            TaskResult {
                task_id: task.id.clone(),
                per_student,
            }
        })
        .collect()
}

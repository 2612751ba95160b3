use crate::mastery::{clamp_level, Readiness, ReadinessCuts, SeededRng, SkillDef};
use crate::model::{
    MathspaceGroup, ResultStatus, Student, Task, TaskDueDate, TaskResult, TaskStatus, TaskType,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

// The ten skills a task's detail sheet reports work against, in panel order.
pub const TASK_SKILLS: &[SkillDef] = &[
    SkillDef {
        id: "skill-1",
        code: "MA4-IND-C-01.3",
        name: "Indices and standard form",
    },
    SkillDef {
        id: "skill-2",
        code: "MA4-ALG-C-01.3",
        name: "Algebraic expressions",
    },
    SkillDef {
        id: "skill-3",
        code: "MA4-ALG-C-01.2",
        name: "Solving linear equations",
    },
    SkillDef {
        id: "skill-4",
        code: "MA4-ALG-C-01.1",
        name: "Expanding brackets",
    },
    SkillDef {
        id: "skill-5",
        code: "MA4-INT-C-01.4",
        name: "Integer operations",
    },
    SkillDef {
        id: "skill-6",
        code: "MA4-INT-C-01.3",
        name: "Order of operations",
    },
    SkillDef {
        id: "skill-7",
        code: "MA4-INT-C-01.2",
        name: "Fraction operations",
    },
    SkillDef {
        id: "skill-8",
        code: "MA4-INT-C-01.1",
        name: "Decimal operations",
    },
    SkillDef {
        id: "skill-9",
        code: "MA3-MR-02.B.5",
        name: "Measurement and ratio",
    },
    SkillDef {
        id: "skill-10",
        code: "MA3-MR-02.B.3",
        name: "Basic multiplication",
    },
];

const GRADES: [&str; 3] = ["Year 8", "Year 9", "Year 10"];

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SubtopicTag {
    id: &'static str,
    name: &'static str,
}

const SUBTOPIC_TAGS: [SubtopicTag; 4] = [
    SubtopicTag {
        id: "sub-1",
        name: "Equations",
    },
    SubtopicTag {
        id: "sub-2",
        name: "Expressions",
    },
    SubtopicTag {
        id: "sub-3",
        name: "Functions",
    },
    SubtopicTag {
        id: "sub-4",
        name: "Graphing",
    },
];

// Completed work at or above this percentage reads as ready.
const SCORE_READY: i64 = 70;
// Completed work at or above this percentage reads as partially ready.
const SCORE_PARTIALLY_READY: i64 = 40;

// Per-skill class targets and post-due growth figures for the skill-work
// panel, indexed in `TASK_SKILLS` order.
#[derive(Debug, Clone)]
pub struct SkillWorkProfile {
    pub targets: [f64; 10],
    pub growth: [f64; 10],
}

impl SkillWorkProfile {
    // Low-mastery cohort: plenty of headroom, so growth figures are larger.
    pub fn baseline() -> Self {
        SkillWorkProfile {
            targets: [0.2, 1.0, 1.1, 1.2, 2.0, 2.1, 3.0, 3.1, 4.0, 5.0],
            growth: [0.3, 0.8, 0.5, 0.4, 0.6, 0.3, 0.2, 0.1, 0.0, 0.0],
        }
    }

    // High-mastery cohort already near ready; little room left to grow.
    pub fn advanced() -> Self {
        SkillWorkProfile {
            targets: [2.5, 3.0, 3.2, 3.5, 3.8, 4.0, 4.2, 4.5, 4.8, 5.0],
            growth: [0.4, 0.3, 0.2, 0.2, 0.1, 0.1, 0.0, 0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetailHeader {
    pub task_id: String,
    pub title: String,
    pub area_of_study: String,
    pub task_type: TaskType,
    pub start_date: String,
    pub due_dates: Vec<TaskDueDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    pub questions_count: i64,
    pub skills_count: i64,
    pub teacher_name: String,
    pub status: TaskStatus,
    pub class_id: String,
    pub class_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentTaskDetail {
    pub student_id: String,
    pub student_name: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: String,
    pub mathspace_group: MathspaceGroup,
    pub completion_progress: i64,
    pub questions_answered: i64,
    pub total_questions: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub is_extension_period: bool,
    pub readiness: Readiness,
    pub confidence: &'static str,
    pub result_percentage: i64,
    pub mark_correct: i64,
    pub mark_total: i64,
    pub time_spent_minutes: i64,
    pub status: &'static str,
    pub stickers_received: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDetail {
    pub question_id: String,
    pub question_number: i64,
    pub question_preview: String,
    pub grade: &'static str,
    pub subtopics: Vec<SubtopicTag>,
    pub skills: Vec<&'static SkillDef>,
    pub correct_count: i64,
    pub partial_count: i64,
    pub incorrect_count: i64,
    pub skipped_count: i64,
    pub total_attempts: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillMasteryStat {
    pub skill_id: &'static str,
    pub skill_name: &'static str,
    pub skill_code: &'static str,
    pub class_average_mastery: f64,
    pub proficient_count: usize,
    pub total_students: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSkillMastery {
    pub student_id: String,
    pub student_name: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: String,
    pub readiness: Readiness,
    pub average_mastery: f64,
    pub proficient_skills_count: usize,
    pub total_skills_count: usize,
    pub skill_masteries: BTreeMap<String, u8>,
    pub skill_masteries_at_due_date: BTreeMap<String, u8>,
    pub average_mastery_at_due_date: f64,
    pub proficient_skills_count_at_due_date: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAverageBlock {
    pub readiness: Readiness,
    pub average_mastery: f64,
    pub proficient_skills_count: i64,
    pub total_skills_count: usize,
    pub skill_masteries: BTreeMap<String, f64>,
    pub skill_masteries_at_due_date: BTreeMap<String, f64>,
    pub average_mastery_at_due_date: f64,
    pub proficient_skills_count_at_due_date: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillsTabData {
    pub skills: Vec<SkillMasteryStat>,
    pub students: Vec<StudentSkillMastery>,
    pub class_average: ClassAverageBlock,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessBreakdown {
    pub ready: usize,
    pub partially_ready: usize,
    pub not_ready: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillsSummary {
    pub critical_gap: Vec<&'static SkillDef>,
    pub needs_more_practice: Vec<&'static SkillDef>,
    pub proficient: Vec<&'static SkillDef>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInsights {
    pub readiness_breakdown: ReadinessBreakdown,
    pub skills_summary: SkillsSummary,
    pub at_risk_students: Vec<String>,
    pub quick_win_skills: Vec<&'static SkillDef>,
    pub common_struggles: Vec<String>,
    pub time_outliers: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetailData {
    pub header: TaskDetailHeader,
    pub students: Vec<StudentTaskDetail>,
    pub questions: Vec<QuestionDetail>,
    pub skills_data: SkillsTabData,
    pub insights: TaskInsights,
}

// Stored task dates come in three shapes: RFC 3339, a naive local stamp
// like `2025-02-04T23:59:59`, or a bare date (read as end of day).
pub fn parse_task_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(23, 59, 59) {
            return Some(naive.and_utc());
        }
    }
    None
}

fn effective_due_dates(task: &Task) -> Vec<TaskDueDate> {
    match &task.due_dates {
        Some(entries) if !entries.is_empty() => entries.clone(),
        _ => vec![TaskDueDate {
            date: task.due_date.clone(),
            group_ids: Vec::new(),
            group_names: vec!["All Students".to_string()],
        }],
    }
}

fn latest_due_date(entries: &[TaskDueDate], fallback: DateTime<Utc>) -> DateTime<Utc> {
    entries
        .iter()
        .filter_map(|entry| parse_task_date(&entry.date))
        .max()
        .unwrap_or(fallback)
}

fn score_readiness(status: Option<ResultStatus>, score: i64) -> Readiness {
    if status == Some(ResultStatus::Completed) {
        if score >= SCORE_READY {
            Readiness::Ready
        } else if score >= SCORE_PARTIALLY_READY {
            Readiness::PartiallyReady
        } else {
            Readiness::NotReady
        }
    } else {
        Readiness::NotReady
    }
}

fn confidence_for(readiness: Readiness) -> &'static str {
    match readiness {
        Readiness::Ready => "high",
        Readiness::PartiallyReady => "medium",
        Readiness::NotReady => "low",
    }
}

fn row_status(status: Option<ResultStatus>) -> &'static str {
    match status {
        Some(ResultStatus::Completed) => "completed",
        Some(ResultStatus::InProgress) => "in-progress",
        _ => "not-started",
    }
}

fn percent_of(part: i64, whole: i64) -> i64 {
    if whole > 0 {
        ((part as f64 / whole as f64) * 100.0).round() as i64
    } else {
        0
    }
}

fn mean_or_zero(sum: f64, count: usize) -> f64 {
    if count > 0 {
        sum / count as f64
    } else {
        0.0
    }
}

// Assembles the full drill-down for one task: header, per-student rows,
// per-question stats, the skill-work panel, and derived insights. All
// randomness comes from `rng`, which callers seed with the task id so the
// sheet is stable across opens.
pub fn build_task_detail(
    task: &Task,
    roster: &[Student],
    result: Option<&TaskResult>,
    teacher_name: &str,
    class_name: &str,
    profile: &SkillWorkProfile,
    now: DateTime<Utc>,
    rng: &mut SeededRng,
) -> TaskDetailData {
    let due_dates = effective_due_dates(task);
    let latest_due = latest_due_date(&due_dates, now);
    let expiry = task.expiry_date.as_deref().and_then(parse_task_date);

    let questions = build_questions(task.questions_count, roster.len(), rng);
    let students = build_student_rows(
        roster,
        result,
        task.questions_count,
        latest_due,
        expiry,
        now,
        rng,
    );
    let skills_data = build_skills_tab(&students, profile, rng);
    let insights = calculate_task_insights(&students, &skills_data);

    TaskDetailData {
        header: TaskDetailHeader {
            task_id: task.id.clone(),
            title: task.title.clone(),
            area_of_study: task
                .area_of_study
                .clone()
                .unwrap_or_else(|| "General".to_string()),
            task_type: task.task_type,
            start_date: task
                .start_date
                .clone()
                .unwrap_or_else(|| task.created_at.clone()),
            due_dates,
            expiry_date: task.expiry_date.clone(),
            questions_count: task.questions_count,
            skills_count: task.skills_count,
            teacher_name: teacher_name.to_string(),
            status: task.status,
            class_id: task.class_id.clone(),
            class_name: class_name.to_string(),
        },
        students,
        questions,
        skills_data,
        insights,
    }
}

fn build_questions(count: i64, roster_size: usize, rng: &mut SeededRng) -> Vec<QuestionDetail> {
    let attempts = roster_size as f64;
    (0..count.max(0))
        .map(|i| {
            let correct =
                (rng.next_f64() * (attempts * 0.7)).floor() as i64 + (attempts * 0.1).floor() as i64;
            let partial = (rng.next_f64() * (attempts * 0.2)).floor() as i64;
            let incorrect = (rng.next_f64() * (attempts * 0.2)).floor() as i64;
            let skipped = roster_size as i64 - correct - partial - incorrect;
            let grade = GRADES[rng.next_below(GRADES.len() as i64) as usize];

            QuestionDetail {
                question_id: format!("q-{}", i + 1),
                question_number: i + 1,
                question_preview: format!("Question {}: Solve for x...", i + 1),
                grade,
                subtopics: vec![SUBTOPIC_TAGS[i as usize % SUBTOPIC_TAGS.len()]],
                skills: vec![&TASK_SKILLS[i as usize % TASK_SKILLS.len()]],
                correct_count: correct.max(0),
                partial_count: partial.max(0),
                incorrect_count: incorrect.max(0),
                skipped_count: skipped.max(0),
                total_attempts: roster_size as i64,
            }
        })
        .collect()
}

fn build_student_rows(
    roster: &[Student],
    result: Option<&TaskResult>,
    total_questions: i64,
    latest_due: DateTime<Utc>,
    expiry: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    rng: &mut SeededRng,
) -> Vec<StudentTaskDetail> {
    roster
        .iter()
        .map(|student| {
            let row = result.and_then(|r| {
                r.per_student
                    .iter()
                    .find(|entry| entry.student_id == student.id)
            });
            let status = row.map(|r| r.status);
            let score = row.map(|r| r.score).unwrap_or(0);
            let completed = status == Some(ResultStatus::Completed);
            let in_progress = status == Some(ResultStatus::InProgress);

            let questions_answered = if completed {
                total_questions
            } else if in_progress {
                rng.next_between(1, total_questions - 1)
            } else {
                0
            };

            let readiness = score_readiness(status, score);

            let mut completed_at = None;
            let mut is_extension_period = false;
            if completed {
                // An expiry window that is open right now puts a fifth of
                // completions after the due date.
                let window_open =
                    now > latest_due && expiry.map(|e| now <= e).unwrap_or(false);
                if window_open && rng.next_f64() > 0.8 {
                    let window_ms = (now - latest_due).num_milliseconds();
                    let offset = (rng.next_f64() * window_ms as f64) as i64;
                    completed_at = Some(
                        (latest_due + Duration::milliseconds(offset))
                            .to_rfc3339_opts(SecondsFormat::Millis, true),
                    );
                    is_extension_period = true;
                } else {
                    let days_before = rng.next_between(1, 7);
                    completed_at = Some(
                        (latest_due - Duration::days(days_before))
                            .to_rfc3339_opts(SecondsFormat::Millis, true),
                    );
                }
            }

            let time_spent_minutes = if completed {
                rng.next_between(15, 59)
            } else if in_progress {
                rng.next_between(5, 24)
            } else {
                0
            };

            StudentTaskDetail {
                student_id: student.id.clone(),
                student_name: student.name.clone(),
                first_name: student.first_name.clone(),
                last_name: student.last_name.clone(),
                avatar_url: student.avatar_url.clone(),
                mathspace_group: student.effective_group(),
                completion_progress: percent_of(questions_answered, total_questions),
                questions_answered,
                total_questions,
                completed_at,
                is_extension_period,
                readiness,
                confidence: confidence_for(readiness),
                result_percentage: score,
                mark_correct: ((score as f64 / 100.0) * total_questions as f64).floor() as i64,
                mark_total: total_questions,
                time_spent_minutes,
                status: row_status(status),
                stickers_received: rng.next_below(5),
            }
        })
        .collect()
}

fn build_skills_tab(
    students: &[StudentTaskDetail],
    profile: &SkillWorkProfile,
    rng: &mut SeededRng,
) -> SkillsTabData {
    let student_rows: Vec<StudentSkillMastery> = students
        .iter()
        .map(|student| {
            let mut masteries = BTreeMap::new();
            let mut masteries_at_due = BTreeMap::new();
            let mut total = 0i64;
            let mut total_at_due = 0i64;
            let mut proficient = 0usize;
            let mut proficient_at_due = 0usize;

            for (index, skill) in TASK_SKILLS.iter().enumerate() {
                let (at_due, current) = if student.status == "not-started" {
                    (0u8, 0u8)
                } else {
                    let target = profile.targets[index % profile.targets.len()];
                    let growth = profile.growth[index % profile.growth.len()];

                    // Mastery at the due date trends toward the class target,
                    // shifted by the student's readiness.
                    let base = match student.readiness {
                        Readiness::Ready => (target + (rng.next_f64() * 1.5 - 0.5)).min(5.0),
                        Readiness::PartiallyReady => {
                            (target + (rng.next_f64() * 2.0 - 1.0)).clamp(0.0, 5.0)
                        }
                        Readiness::NotReady => (target - (rng.next_f64() * 1.5 + 0.5)).max(0.0),
                    };
                    let at_due = clamp_level(base);

                    // Growth since the due date scales with engagement; a
                    // not-ready student only has even odds of any growth.
                    let multiplier = match student.readiness {
                        Readiness::Ready => 0.5 + rng.next_f64() * 0.5,
                        Readiness::PartiallyReady => 0.8 + rng.next_f64() * 0.7,
                        Readiness::NotReady => {
                            if rng.next_f64() > 0.5 {
                                0.5 + rng.next_f64()
                            } else {
                                0.0
                            }
                        }
                    };
                    let current = clamp_level(base + growth * multiplier);
                    (at_due, current)
                };

                masteries_at_due.insert(skill.id.to_string(), at_due);
                masteries.insert(skill.id.to_string(), current);
                total_at_due += at_due as i64;
                total += current as i64;
                if at_due >= 4 {
                    proficient_at_due += 1;
                }
                if current >= 4 {
                    proficient += 1;
                }
            }

            StudentSkillMastery {
                student_id: student.student_id.clone(),
                student_name: student.student_name.clone(),
                first_name: student.first_name.clone(),
                last_name: student.last_name.clone(),
                avatar_url: student.avatar_url.clone(),
                readiness: student.readiness,
                average_mastery: mean_or_zero(total as f64, TASK_SKILLS.len()),
                proficient_skills_count: proficient,
                total_skills_count: TASK_SKILLS.len(),
                skill_masteries: masteries,
                skill_masteries_at_due_date: masteries_at_due,
                average_mastery_at_due_date: mean_or_zero(total_at_due as f64, TASK_SKILLS.len()),
                proficient_skills_count_at_due_date: proficient_at_due,
            }
        })
        .collect();

    let mut class_masteries = BTreeMap::new();
    let mut class_masteries_at_due = BTreeMap::new();
    for skill in TASK_SKILLS {
        let current: f64 = student_rows
            .iter()
            .map(|row| row.skill_masteries.get(skill.id).copied().unwrap_or(0) as f64)
            .sum();
        let at_due: f64 = student_rows
            .iter()
            .map(|row| {
                row.skill_masteries_at_due_date
                    .get(skill.id)
                    .copied()
                    .unwrap_or(0) as f64
            })
            .sum();
        class_masteries.insert(skill.id.to_string(), mean_or_zero(current, students.len()));
        class_masteries_at_due.insert(skill.id.to_string(), mean_or_zero(at_due, students.len()));
    }

    let denominator = students.len().max(1) as f64;
    let total_proficient: usize = student_rows.iter().map(|r| r.proficient_skills_count).sum();
    let total_proficient_at_due: usize = student_rows
        .iter()
        .map(|r| r.proficient_skills_count_at_due_date)
        .sum();
    let avg_mastery =
        student_rows.iter().map(|r| r.average_mastery).sum::<f64>() / denominator;
    let avg_mastery_at_due = student_rows
        .iter()
        .map(|r| r.average_mastery_at_due_date)
        .sum::<f64>()
        / denominator;

    let skill_stats: Vec<SkillMasteryStat> = TASK_SKILLS
        .iter()
        .map(|skill| {
            let proficient = student_rows
                .iter()
                .filter(|row| row.skill_masteries.get(skill.id).copied().unwrap_or(0) >= 4)
                .count();
            SkillMasteryStat {
                skill_id: skill.id,
                skill_name: skill.name,
                skill_code: skill.code,
                class_average_mastery: class_masteries.get(skill.id).copied().unwrap_or(0.0),
                proficient_count: proficient,
                total_students: students.len(),
            }
        })
        .collect();

    SkillsTabData {
        skills: skill_stats,
        students: student_rows,
        class_average: ClassAverageBlock {
            readiness: ReadinessCuts::default().classify(avg_mastery),
            average_mastery: avg_mastery,
            proficient_skills_count: (total_proficient as f64 / denominator).round() as i64,
            total_skills_count: TASK_SKILLS.len(),
            skill_masteries: class_masteries,
            skill_masteries_at_due_date: class_masteries_at_due,
            average_mastery_at_due_date: avg_mastery_at_due,
            proficient_skills_count_at_due_date: (total_proficient_at_due as f64 / denominator)
                .round() as i64,
        },
    }
}

// Buckets skills and students off the snapshot with fixed cuts: class
// averages below 1.5 are critical gaps, [1.5, 3.5) needs more practice
// (with [2.8, 3.5) also counting as quick wins), 3.5 and up proficient.
pub fn calculate_task_insights(
    students: &[StudentTaskDetail],
    skills_data: &SkillsTabData,
) -> TaskInsights {
    let ready = students
        .iter()
        .filter(|s| s.readiness == Readiness::Ready)
        .count();
    let partially_ready = students
        .iter()
        .filter(|s| s.readiness == Readiness::PartiallyReady)
        .count();
    let not_ready = students
        .iter()
        .filter(|s| s.readiness == Readiness::NotReady)
        .count();

    let averages = &skills_data.class_average.skill_masteries;
    let avg_of = |skill: &SkillDef| averages.get(skill.id).copied().unwrap_or(0.0);

    let critical_gap: Vec<&'static SkillDef> = TASK_SKILLS
        .iter()
        .filter(|s| avg_of(s) < 1.5)
        .collect();
    let needs_more_practice: Vec<&'static SkillDef> = TASK_SKILLS
        .iter()
        .filter(|s| {
            let avg = avg_of(s);
            (1.5..3.5).contains(&avg)
        })
        .collect();
    let proficient: Vec<&'static SkillDef> =
        TASK_SKILLS.iter().filter(|s| avg_of(s) >= 3.5).collect();
    let quick_win_skills: Vec<&'static SkillDef> = TASK_SKILLS
        .iter()
        .filter(|s| {
            let avg = avg_of(s);
            (2.8..3.5).contains(&avg)
        })
        .collect();

    let at_risk_students: Vec<String> = students
        .iter()
        .filter(|s| s.readiness == Readiness::NotReady && s.result_percentage < 50)
        .map(|s| s.student_id.clone())
        .collect();

    let avg_time = students
        .iter()
        .map(|s| s.time_spent_minutes as f64)
        .sum::<f64>()
        / students.len().max(1) as f64;
    let time_outliers: Vec<String> = students
        .iter()
        .filter(|s| s.time_spent_minutes as f64 > avg_time * 2.0)
        .map(|s| s.student_id.clone())
        .collect();

    TaskInsights {
        readiness_breakdown: ReadinessBreakdown {
            ready,
            partially_ready,
            not_ready,
            total: students.len(),
        },
        skills_summary: SkillsSummary {
            critical_gap,
            needs_more_practice,
            proficient,
        },
        at_risk_students,
        quick_win_skills,
        common_struggles: Vec::new(),
        time_outliers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{StudentTaskResult, TaskResult};
    use chrono::TimeZone;

    fn fixture_roster(count: usize) -> Vec<Student> {
        (1..=count)
            .map(|i| Student {
                id: format!("student-{i}"),
                name: format!("Student {i}"),
                first_name: "Student".to_string(),
                last_name: format!("{i}"),
                class_id: "class-a".to_string(),
                mathspace_group: MathspaceGroup::Explorer,
                mathspace_group_override: None,
                avatar_url: "Avatar-Generic.png".to_string(),
            })
            .collect()
    }

    fn fixture_task(due_date: &str, expiry: Option<&str>) -> Task {
        Task {
            id: "task-class-a-1".to_string(),
            title: "Linear Equations Readiness Check-in".to_string(),
            class_id: "class-a".to_string(),
            task_type: TaskType::TopicReadinessCheckin,
            area_of_study: Some("Algebra".to_string()),
            start_date: Some("2025-01-28T00:00:00".to_string()),
            due_date: due_date.to_string(),
            due_dates: None,
            expiry_date: expiry.map(|e| e.to_string()),
            assignments: Vec::new(),
            temporary_groups: None,
            created_at: "2025-01-28T00:00:00".to_string(),
            questions_count: 10,
            skills_count: 10,
            status: TaskStatus::Active,
        }
    }

    fn fixture_result(roster: &[Student], status: ResultStatus, score: i64) -> TaskResult {
        TaskResult {
            task_id: "task-class-a-1".to_string(),
            per_student: roster
                .iter()
                .map(|s| StudentTaskResult {
                    student_id: s.id.clone(),
                    status,
                    score,
                })
                .collect(),
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 6, 12, 0, 0).single().unwrap()
    }

    #[test]
    fn score_cuts_map_to_readiness_exactly() {
        let completed = Some(ResultStatus::Completed);
        assert_eq!(score_readiness(completed, 70), Readiness::Ready);
        assert_eq!(score_readiness(completed, 69), Readiness::PartiallyReady);
        assert_eq!(score_readiness(completed, 40), Readiness::PartiallyReady);
        assert_eq!(score_readiness(completed, 39), Readiness::NotReady);
        assert_eq!(
            score_readiness(Some(ResultStatus::InProgress), 95),
            Readiness::NotReady
        );
        assert_eq!(score_readiness(None, 100), Readiness::NotReady);
    }

    #[test]
    fn snapshot_is_stable_for_one_task_id() {
        let roster = fixture_roster(30);
        let task = fixture_task("2025-02-04T23:59:59", Some("2025-02-10T23:59:59"));
        let result = fixture_result(&roster, ResultStatus::Completed, 80);
        let profile = SkillWorkProfile::baseline();
        let now = fixed_now();

        let mut rng = SeededRng::new(&task.id);
        let first = build_task_detail(
            &task, &roster, Some(&result), "Sarah Mitchell", "Class A", &profile, now, &mut rng,
        );
        let mut rng = SeededRng::new(&task.id);
        let second = build_task_detail(
            &task, &roster, Some(&result), "Sarah Mitchell", "Class A", &profile, now, &mut rng,
        );

        assert_eq!(
            serde_json::to_value(&first).expect("serialize first"),
            serde_json::to_value(&second).expect("serialize second"),
        );
    }

    #[test]
    fn not_started_students_sit_at_zero() {
        let roster = fixture_roster(10);
        let task = fixture_task("2025-02-04T23:59:59", None);
        let result = fixture_result(&roster, ResultStatus::NotStarted, 0);
        let mut rng = SeededRng::new(&task.id);
        let data = build_task_detail(
            &task,
            &roster,
            Some(&result),
            "Sarah Mitchell",
            "Class A",
            &SkillWorkProfile::baseline(),
            fixed_now(),
            &mut rng,
        );

        for row in &data.students {
            assert_eq!(row.questions_answered, 0);
            assert_eq!(row.completion_progress, 0);
            assert_eq!(row.time_spent_minutes, 0);
            assert_eq!(row.readiness, Readiness::NotReady);
            assert_eq!(row.status, "not-started");
            assert!(row.completed_at.is_none());
        }
        for row in &data.skills_data.students {
            assert_eq!(row.average_mastery, 0.0);
            assert!(row.skill_masteries.values().all(|&m| m == 0));
        }
        assert_eq!(data.insights.readiness_breakdown.not_ready, 10);
        assert_eq!(data.insights.readiness_breakdown.total, 10);
        assert!(data.insights.time_outliers.is_empty());
    }

    #[test]
    fn on_time_completions_land_before_the_due_date() {
        let roster = fixture_roster(20);
        // Due date in the future relative to the pinned clock, so the
        // extension window is closed.
        let task = fixture_task("2025-02-14T23:59:59", Some("2025-02-20T23:59:59"));
        let result = fixture_result(&roster, ResultStatus::Completed, 85);
        let mut rng = SeededRng::new(&task.id);
        let data = build_task_detail(
            &task,
            &roster,
            Some(&result),
            "Sarah Mitchell",
            "Class A",
            &SkillWorkProfile::baseline(),
            fixed_now(),
            &mut rng,
        );

        let due = parse_task_date("2025-02-14T23:59:59").expect("parse due");
        for row in &data.students {
            assert!(!row.is_extension_period);
            let completed_at = row.completed_at.as_deref().expect("completed date");
            let stamp = parse_task_date(completed_at).expect("parse completion");
            assert!(stamp < due);
        }
    }

    #[test]
    fn extension_completions_stay_inside_the_window() {
        let roster = fixture_roster(30);
        // Past due, expiry still open at the pinned clock.
        let task = fixture_task("2025-02-04T23:59:59", Some("2025-02-10T23:59:59"));
        let result = fixture_result(&roster, ResultStatus::Completed, 75);
        let now = fixed_now();
        let mut rng = SeededRng::new(&task.id);
        let data = build_task_detail(
            &task,
            &roster,
            Some(&result),
            "Sarah Mitchell",
            "Class A",
            &SkillWorkProfile::baseline(),
            now,
            &mut rng,
        );

        let due = parse_task_date("2025-02-04T23:59:59").expect("parse due");
        for row in &data.students {
            let completed_at = row.completed_at.as_deref().expect("completed date");
            let stamp = parse_task_date(completed_at).expect("parse completion");
            if row.is_extension_period {
                assert!(stamp >= due && stamp <= now);
            } else {
                assert!(stamp < due);
            }
        }
    }

    #[test]
    fn question_tallies_stay_in_range() {
        let roster = fixture_roster(30);
        let task = fixture_task("2025-02-04T23:59:59", None);
        let mut rng = SeededRng::new(&task.id);
        let data = build_task_detail(
            &task,
            &roster,
            None,
            "Sarah Mitchell",
            "Class A",
            &SkillWorkProfile::baseline(),
            fixed_now(),
            &mut rng,
        );

        assert_eq!(data.questions.len(), 10);
        for (i, q) in data.questions.iter().enumerate() {
            assert_eq!(q.question_id, format!("q-{}", i + 1));
            assert_eq!(q.total_attempts, 30);
            assert!(q.correct_count >= 0 && q.correct_count <= 30);
            assert!(q.partial_count >= 0 && q.partial_count <= 30);
            assert!(q.incorrect_count >= 0 && q.incorrect_count <= 30);
            assert!(q.skipped_count >= 0);
            assert!(GRADES.contains(&q.grade));
            assert_eq!(q.subtopics[0].id, SUBTOPIC_TAGS[i % 4].id);
            assert_eq!(q.skills[0].id, TASK_SKILLS[i % 10].id);
        }
    }

    #[test]
    fn insight_buckets_partition_the_skill_list() {
        let roster = fixture_roster(30);
        let task = fixture_task("2025-02-04T23:59:59", Some("2025-02-10T23:59:59"));
        let result = fixture_result(&roster, ResultStatus::Completed, 55);
        let mut rng = SeededRng::new(&task.id);
        let data = build_task_detail(
            &task,
            &roster,
            Some(&result),
            "Sarah Mitchell",
            "Class A",
            &SkillWorkProfile::baseline(),
            fixed_now(),
            &mut rng,
        );

        let summary = &data.insights.skills_summary;
        assert_eq!(
            summary.critical_gap.len() + summary.needs_more_practice.len()
                + summary.proficient.len(),
            TASK_SKILLS.len()
        );
        let needs_ids: Vec<&str> = summary.needs_more_practice.iter().map(|s| s.id).collect();
        for skill in &data.insights.quick_win_skills {
            assert!(needs_ids.contains(&skill.id));
            let avg = data
                .skills_data
                .class_average
                .skill_masteries
                .get(skill.id)
                .copied()
                .unwrap_or(0.0);
            assert!(avg >= 2.8);
        }

        let breakdown = &data.insights.readiness_breakdown;
        assert_eq!(
            breakdown.ready + breakdown.partially_ready + breakdown.not_ready,
            30
        );
    }

    #[test]
    fn bucket_boundaries_are_exact() {
        let mut averages = BTreeMap::new();
        averages.insert("skill-1".to_string(), 1.5);
        averages.insert("skill-2".to_string(), 1.4999);
        averages.insert("skill-3".to_string(), 3.5);
        averages.insert("skill-4".to_string(), 3.4999);
        averages.insert("skill-5".to_string(), 2.8);
        averages.insert("skill-6".to_string(), 2.7999);
        averages.insert("skill-7".to_string(), 0.0);
        averages.insert("skill-8".to_string(), 5.0);
        averages.insert("skill-9".to_string(), 2.0);
        averages.insert("skill-10".to_string(), 4.0);

        let skills_data = SkillsTabData {
            skills: Vec::new(),
            students: Vec::new(),
            class_average: ClassAverageBlock {
                readiness: Readiness::NotReady,
                average_mastery: 0.0,
                proficient_skills_count: 0,
                total_skills_count: TASK_SKILLS.len(),
                skill_masteries: averages,
                skill_masteries_at_due_date: BTreeMap::new(),
                average_mastery_at_due_date: 0.0,
                proficient_skills_count_at_due_date: 0,
            },
        };
        let insights = calculate_task_insights(&[], &skills_data);

        let ids = |skills: &[&'static SkillDef]| -> Vec<&str> {
            skills.iter().map(|s| s.id).collect()
        };
        let critical = ids(&insights.skills_summary.critical_gap);
        let needs = ids(&insights.skills_summary.needs_more_practice);
        let proficient = ids(&insights.skills_summary.proficient);
        let quick = ids(&insights.quick_win_skills);

        // Exactly 1.5 needs practice; exactly 3.5 is proficient.
        assert!(needs.contains(&"skill-1"));
        assert!(critical.contains(&"skill-2"));
        assert!(proficient.contains(&"skill-3"));
        assert!(needs.contains(&"skill-4"));
        assert!(quick.contains(&"skill-5"));
        assert!(!quick.contains(&"skill-6"));
        assert!(needs.contains(&"skill-6"));
        assert!(critical.contains(&"skill-7"));
        assert!(proficient.contains(&"skill-8"));
        assert!(needs.contains(&"skill-9"));
        assert!(proficient.contains(&"skill-10"));
        assert_eq!(critical.len() + needs.len() + proficient.len(), 10);
    }

    #[test]
    fn at_risk_requires_not_ready_and_low_score() {
        let roster = fixture_roster(3);
        let result = TaskResult {
            task_id: "task-class-a-1".to_string(),
            per_student: vec![
                StudentTaskResult {
                    student_id: "student-1".to_string(),
                    status: ResultStatus::Completed,
                    score: 30,
                },
                StudentTaskResult {
                    student_id: "student-2".to_string(),
                    status: ResultStatus::Completed,
                    score: 85,
                },
                StudentTaskResult {
                    student_id: "student-3".to_string(),
                    status: ResultStatus::InProgress,
                    score: 60,
                },
            ],
        };
        let task = fixture_task("2025-02-04T23:59:59", None);
        let mut rng = SeededRng::new(&task.id);
        let data = build_task_detail(
            &task,
            &roster,
            Some(&result),
            "Sarah Mitchell",
            "Class A",
            &SkillWorkProfile::baseline(),
            fixed_now(),
            &mut rng,
        );

        // Completed at 30 is not-ready with a sub-50 score; in-progress at 60
        // is not-ready but scores too high to flag.
        assert_eq!(data.insights.at_risk_students, vec!["student-1".to_string()]);
    }

    #[test]
    fn skill_panel_averages_follow_their_rows() {
        let roster = fixture_roster(12);
        let task = fixture_task("2025-02-04T23:59:59", None);
        let result = fixture_result(&roster, ResultStatus::Completed, 75);
        let mut rng = SeededRng::new(&task.id);
        let data = build_task_detail(
            &task,
            &roster,
            Some(&result),
            "Sarah Mitchell",
            "Class A",
            &SkillWorkProfile::advanced(),
            fixed_now(),
            &mut rng,
        );

        for row in &data.skills_data.students {
            let sum: i64 = row.skill_masteries.values().map(|&m| m as i64).sum();
            let expected = sum as f64 / TASK_SKILLS.len() as f64;
            assert!((row.average_mastery - expected).abs() < 1e-9);
            assert_eq!(
                row.proficient_skills_count,
                row.skill_masteries.values().filter(|&&m| m >= 4).count()
            );
        }

        let block = &data.skills_data.class_average;
        assert!((0.0..=5.0).contains(&block.average_mastery));
        assert_eq!(
            block.readiness,
            ReadinessCuts::default().classify(block.average_mastery)
        );
        for stat in &data.skills_data.skills {
            assert_eq!(stat.total_students, 12);
            assert!((0.0..=5.0).contains(&stat.class_average_mastery));
        }
    }
}

use crate::model::Student;
use serde::Serialize;
use std::collections::BTreeMap;

const LCG_MULTIPLIER: i64 = 16807;
const LCG_MODULUS: i64 = 2_147_483_647;

/// Legacy-compatible seeded generator: `h = h*31 + byte` over the seed
/// string, then a Lehmer step `state * 16807 % 2147483647` per draw.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: i64,
}

impl SeededRng {
    pub fn new(seed: &str) -> Self {
        let mut hash: i32 = 0;
        for &b in seed.as_bytes() {
            hash = hash
                .wrapping_shl(5)
                .wrapping_sub(hash)
                .wrapping_add(b as i32);
        }
        SeededRng { state: hash as i64 }
    }

    pub fn next_f64(&mut self) -> f64 {
        self.state = (self.state * LCG_MULTIPLIER) % LCG_MODULUS;
        ((self.state & 0x7FFF_FFFF) as f64) / (LCG_MODULUS as f64)
    }

    // Integer in `[0, n)`; `n` must be positive.
    pub fn next_below(&mut self, n: i64) -> i64 {
        ((self.next_f64() * n as f64) as i64).min(n - 1)
    }

    // Integer in `[lo, hi]`. A hollow range yields `lo`.
    pub fn next_between(&mut self, lo: i64, hi: i64) -> i64 {
        if hi <= lo {
            return lo;
        }
        lo + self.next_below(hi - lo + 1)
    }
}

// Mastery level a student can hold on one skill: 0 None, 1 Exploring,
// 2 Emerging, 3 Familiar, 4 Proficient, 5 Mastered.
pub const MASTERY_MAX: f64 = 5.0;

// Levels at or above this count as proficient in aggregate counts.
pub const PROFICIENT_LEVEL: u8 = 4;

// Fallback when an injected target table has no entry for a topic.
pub const DEFAULT_TOPIC_TARGET: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Proficiency {
    Strong,
    Developing,
    NeedsSupport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Readiness {
    Ready,
    PartiallyReady,
    NotReady,
}

// Cut points for proficiency labels. Kept separate from `ReadinessCuts`
// even though the defaults coincide; the two labels feed different views.
#[derive(Debug, Clone, Copy)]
pub struct ProficiencyCuts {
    pub strong: f64,
    pub developing: f64,
}

impl Default for ProficiencyCuts {
    fn default() -> Self {
        ProficiencyCuts {
            strong: 3.5,
            developing: 2.0,
        }
    }
}

impl ProficiencyCuts {
    pub fn classify(&self, avg: f64) -> Proficiency {
        if avg >= self.strong {
            Proficiency::Strong
        } else if avg >= self.developing {
            Proficiency::Developing
        } else {
            Proficiency::NeedsSupport
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReadinessCuts {
    pub ready: f64,
    pub partially_ready: f64,
}

impl Default for ReadinessCuts {
    fn default() -> Self {
        ReadinessCuts {
            ready: 3.5,
            partially_ready: 2.0,
        }
    }
}

impl ReadinessCuts {
    pub fn classify(&self, avg: f64) -> Readiness {
        if avg >= self.ready {
            Readiness::Ready
        } else if avg >= self.partially_ready {
            Readiness::PartiallyReady
        } else {
            Readiness::NotReady
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SkillDef {
    pub id: &'static str,
    pub code: &'static str,
    pub name: &'static str,
}

pub struct SubtopicDef {
    pub id: &'static str,
    pub name: &'static str,
    pub skills: &'static [SkillDef],
}

pub struct TopicDef {
    pub id: &'static str,
    pub name: &'static str,
    pub code: &'static str,
    pub grade_level: &'static str,
    pub is_prerequisite: bool,
    pub subtopics: &'static [SubtopicDef],
}

// Year 9 mathematics curriculum (NSW syllabus codes), with one Year 8
// prerequisite topic.
pub const CURRICULUM: &[TopicDef] = &[
    TopicDef {
        id: "topic-linear-relationships",
        name: "Linear Relationships",
        code: "MA4-ALG",
        grade_level: "Year 9",
        is_prerequisite: false,
        subtopics: &[
            SubtopicDef {
                id: "sub-algebraic-expressions",
                name: "Algebraic Expressions",
                skills: &[
                    SkillDef {
                        id: "skill-2",
                        code: "MA4-ALG-C-01.3",
                        name: "Algebraic expressions",
                    },
                    SkillDef {
                        id: "skill-alg-simplify",
                        code: "MA4-ALG-C-01.4",
                        name: "Simplifying expressions",
                    },
                ],
            },
            SubtopicDef {
                id: "sub-solving-equations",
                name: "Solving Equations",
                skills: &[
                    SkillDef {
                        id: "skill-3",
                        code: "MA4-ALG-C-01.2",
                        name: "Solving linear equations",
                    },
                    SkillDef {
                        id: "skill-alg-simultaneous",
                        code: "MA4-ALG-C-01.5",
                        name: "Simultaneous equations",
                    },
                ],
            },
            SubtopicDef {
                id: "sub-expanding-factorising",
                name: "Expanding & Factorising",
                skills: &[
                    SkillDef {
                        id: "skill-4",
                        code: "MA4-ALG-C-01.1",
                        name: "Expanding brackets",
                    },
                    SkillDef {
                        id: "skill-alg-factorise",
                        code: "MA4-ALG-C-02.1",
                        name: "Factorising expressions",
                    },
                ],
            },
        ],
    },
    TopicDef {
        id: "topic-indices",
        name: "Indices & Standard Form",
        code: "MA4-IND",
        grade_level: "Year 9",
        is_prerequisite: false,
        subtopics: &[
            SubtopicDef {
                id: "sub-index-laws",
                name: "Index Laws",
                skills: &[
                    SkillDef {
                        id: "skill-1",
                        code: "MA4-IND-C-01.3",
                        name: "Indices and standard form",
                    },
                    SkillDef {
                        id: "skill-ind-negative",
                        code: "MA4-IND-C-01.2",
                        name: "Negative & zero indices",
                    },
                ],
            },
            SubtopicDef {
                id: "sub-scientific-notation",
                name: "Scientific Notation",
                skills: &[
                    SkillDef {
                        id: "skill-ind-sci",
                        code: "MA4-IND-C-02.1",
                        name: "Converting to scientific notation",
                    },
                    SkillDef {
                        id: "skill-ind-sci-ops",
                        code: "MA4-IND-C-02.2",
                        name: "Operations with scientific notation",
                    },
                ],
            },
        ],
    },
    TopicDef {
        id: "topic-computation",
        name: "Computation with Integers",
        code: "MA4-INT",
        grade_level: "Year 9",
        is_prerequisite: false,
        subtopics: &[
            SubtopicDef {
                id: "sub-integer-ops",
                name: "Integer Operations",
                skills: &[
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
                ],
            },
            SubtopicDef {
                id: "sub-fractions-decimals",
                name: "Fractions & Decimals",
                skills: &[
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
                ],
            },
        ],
    },
    TopicDef {
        id: "topic-measurement",
        name: "Measurement & Ratio",
        code: "MA3-MR",
        grade_level: "Year 8 (Prerequisite)",
        is_prerequisite: true,
        subtopics: &[
            SubtopicDef {
                id: "sub-ratio-rates",
                name: "Ratio & Rates",
                skills: &[
                    SkillDef {
                        id: "skill-9",
                        code: "MA3-MR-02.B.5",
                        name: "Measurement and ratio",
                    },
                    SkillDef {
                        id: "skill-mr-rates",
                        code: "MA3-MR-02.B.4",
                        name: "Rates and unit conversion",
                    },
                ],
            },
            SubtopicDef {
                id: "sub-multiplication",
                name: "Multiplication Foundations",
                skills: &[
                    SkillDef {
                        id: "skill-10",
                        code: "MA3-MR-02.B.3",
                        name: "Basic multiplication",
                    },
                    SkillDef {
                        id: "skill-mr-division",
                        code: "MA3-MR-02.B.2",
                        name: "Division strategies",
                    },
                ],
            },
        ],
    },
];

// Built-in target table for a cohort that is still building foundations.
pub fn baseline_targets() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("topic-linear-relationships".to_string(), 1.6),
        ("topic-indices".to_string(), 1.2),
        ("topic-computation".to_string(), 2.4),
        ("topic-measurement".to_string(), 1.8),
    ])
}

// Built-in target table for a cohort approaching readiness.
pub fn advanced_targets() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("topic-linear-relationships".to_string(), 3.4),
        ("topic-indices".to_string(), 3.0),
        ("topic-computation".to_string(), 4.0),
        ("topic-measurement".to_string(), 3.8),
    ])
}

// Everything the simulator needs besides the roster and the generator.
// Targets map topic ids to target averages; thresholds stay independently
// tunable per label family.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub targets: BTreeMap<String, f64>,
    pub proficiency: ProficiencyCuts,
    pub readiness: ReadinessCuts,
}

impl SimulatorConfig {
    pub fn with_targets(targets: BTreeMap<String, f64>) -> Self {
        SimulatorConfig {
            targets,
            proficiency: ProficiencyCuts::default(),
            readiness: ReadinessCuts::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumSkill {
    pub id: String,
    pub code: String,
    pub name: String,
    pub class_average_mastery: f64,
    pub proficient_student_count: usize,
    pub total_students: usize,
    pub is_prerequisite: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumSubtopic {
    pub id: String,
    pub name: String,
    pub skills: Vec<CurriculumSkill>,
    pub class_average_mastery: f64,
    pub proficiency: Proficiency,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentBreakdown {
    pub strong: usize,
    pub developing: usize,
    pub needs_support: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumTopic {
    pub id: String,
    pub name: String,
    pub code: String,
    pub grade_level: String,
    pub is_prerequisite: bool,
    pub subtopics: Vec<CurriculumSubtopic>,
    pub class_average_mastery: f64,
    pub proficiency: Proficiency,
    pub readiness_level: Readiness,
    pub student_breakdown: StudentBreakdown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentTopicMastery {
    pub student_id: String,
    pub student_name: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: String,
    pub topic_masteries: BTreeMap<String, f64>,
    pub subtopic_masteries: BTreeMap<String, f64>,
    pub skill_masteries: BTreeMap<String, u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumData {
    pub topics: Vec<CurriculumTopic>,
    pub students: Vec<StudentTopicMastery>,
    pub overall_class_mastery: f64,
    pub overall_proficiency: Proficiency,
}

fn mean_or_zero(sum: f64, count: usize) -> f64 {
    if count > 0 {
        sum / count as f64
    } else {
        0.0
    }
}

pub(crate) fn clamp_level(value: f64) -> u8 {
    value.round().clamp(0.0, MASTERY_MAX) as u8
}

// Derives the whole curriculum-mastery view for one class: per-student
// levels for every skill, then class aggregates with proficiency and
// readiness labels. Draw order is per student, topic by topic, skill by
// skill, so a given seed always produces the same distribution.
pub fn generate_curriculum_data(
    students: &[Student],
    config: &SimulatorConfig,
    rng: &mut SeededRng,
) -> CurriculumData {
    let student_masteries: Vec<StudentTopicMastery> = students
        .iter()
        .map(|student| {
            let mut topic_masteries = BTreeMap::new();
            let mut subtopic_masteries = BTreeMap::new();
            let mut skill_masteries = BTreeMap::new();

            for topic in CURRICULUM {
                let target = config
                    .targets
                    .get(topic.id)
                    .copied()
                    .unwrap_or(DEFAULT_TOPIC_TARGET);
                let variation = (rng.next_f64() - 0.5) * 2.0;
                let topic_base = (target + variation).clamp(0.0, MASTERY_MAX);

                let mut topic_skill_total = 0.0;
                let mut topic_skill_count = 0usize;

                for subtopic in topic.subtopics {
                    let mut subtopic_total = 0.0;
                    let mut subtopic_count = 0usize;

                    for skill in subtopic.skills {
                        let skill_variation = (rng.next_f64() - 0.5) * 1.5;
                        let level = clamp_level(topic_base + skill_variation);
                        skill_masteries.insert(skill.id.to_string(), level);
                        subtopic_total += level as f64;
                        subtopic_count += 1;
                    }

                    subtopic_masteries.insert(
                        subtopic.id.to_string(),
                        mean_or_zero(subtopic_total, subtopic_count),
                    );
                    topic_skill_total += subtopic_total;
                    topic_skill_count += subtopic_count;
                }

                // Topic average is the flattened mean over every skill, not
                // a mean of subtopic means.
                topic_masteries.insert(
                    topic.id.to_string(),
                    mean_or_zero(topic_skill_total, topic_skill_count),
                );
            }

            StudentTopicMastery {
                student_id: student.id.clone(),
                student_name: student.name.clone(),
                first_name: student.first_name.clone(),
                last_name: student.last_name.clone(),
                avatar_url: student.avatar_url.clone(),
                topic_masteries,
                subtopic_masteries,
                skill_masteries,
            }
        })
        .collect();

    let topics: Vec<CurriculumTopic> = CURRICULUM
        .iter()
        .map(|topic| {
            let subtopics: Vec<CurriculumSubtopic> = topic
                .subtopics
                .iter()
                .map(|subtopic| {
                    let skills: Vec<CurriculumSkill> = subtopic
                        .skills
                        .iter()
                        .map(|skill| {
                            let mut sum = 0.0;
                            let mut proficient = 0usize;
                            for sm in &student_masteries {
                                let level =
                                    sm.skill_masteries.get(skill.id).copied().unwrap_or(0);
                                sum += level as f64;
                                if level >= PROFICIENT_LEVEL {
                                    proficient += 1;
                                }
                            }
                            CurriculumSkill {
                                id: skill.id.to_string(),
                                code: skill.code.to_string(),
                                name: skill.name.to_string(),
                                class_average_mastery: mean_or_zero(sum, students.len()),
                                proficient_student_count: proficient,
                                total_students: students.len(),
                                is_prerequisite: topic.is_prerequisite,
                            }
                        })
                        .collect();

                    let subtopic_avg = mean_or_zero(
                        skills.iter().map(|s| s.class_average_mastery).sum(),
                        skills.len(),
                    );
                    CurriculumSubtopic {
                        id: subtopic.id.to_string(),
                        name: subtopic.name.to_string(),
                        skills,
                        class_average_mastery: subtopic_avg,
                        proficiency: config.proficiency.classify(subtopic_avg),
                    }
                })
                .collect();

            let topic_avg = mean_or_zero(
                subtopics.iter().map(|s| s.class_average_mastery).sum(),
                subtopics.len(),
            );

            let mut breakdown = StudentBreakdown {
                strong: 0,
                developing: 0,
                needs_support: 0,
            };
            for sm in &student_masteries {
                let avg = sm.topic_masteries.get(topic.id).copied().unwrap_or(0.0);
                match config.proficiency.classify(avg) {
                    Proficiency::Strong => breakdown.strong += 1,
                    Proficiency::Developing => breakdown.developing += 1,
                    Proficiency::NeedsSupport => breakdown.needs_support += 1,
                }
            }

            CurriculumTopic {
                id: topic.id.to_string(),
                name: topic.name.to_string(),
                code: topic.code.to_string(),
                grade_level: topic.grade_level.to_string(),
                is_prerequisite: topic.is_prerequisite,
                subtopics,
                class_average_mastery: topic_avg,
                proficiency: config.proficiency.classify(topic_avg),
                readiness_level: config.readiness.classify(topic_avg),
                student_breakdown: breakdown,
            }
        })
        .collect();

    let overall = mean_or_zero(
        topics.iter().map(|t| t.class_average_mastery).sum(),
        topics.len(),
    );

    CurriculumData {
        topics,
        students: student_masteries,
        overall_class_mastery: overall,
        overall_proficiency: config.proficiency.classify(overall),
    }
}

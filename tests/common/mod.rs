use std::sync::Arc;

use serde_json::json;

use mastery_engine::catalog::SkillCatalog;
use mastery_engine::config::EngineConfig;
use mastery_engine::store::MemoryProfileStore;
use mastery_engine::types::{Question, Skill};
use mastery_engine::MasteryEngine;

pub fn skill(
    id: &str,
    grade_level: u8,
    order: i32,
    difficulty: f64,
    prerequisites: &[&str],
) -> Skill {
    Skill {
        id: id.to_string(),
        name: id.replace('_', " "),
        grade_level,
        prerequisites: prerequisites.iter().map(|s| s.to_string()).collect(),
        forgetting_rate: 0.08,
        difficulty,
        order,
    }
}

pub fn question(id: &str, skill_ids: &[&str], difficulty: f64, expected: f64) -> Question {
    Question {
        id: id.to_string(),
        skill_ids: skill_ids.iter().map(|s| s.to_string()).collect(),
        difficulty,
        expected_time_seconds: Some(expected),
        content: json!({ "prompt": id }),
    }
}

/// Small arithmetic curriculum: counting -> addition/subtraction ->
/// multiplication -> fractions.
pub fn math_catalog() -> SkillCatalog {
    let skills = vec![
        skill("counting", 0, 1, 0.0, &[]),
        skill("addition", 1, 1, 0.4, &["counting"]),
        skill("subtraction", 1, 2, 0.45, &["counting"]),
        skill("multiplication", 2, 1, 0.6, &["addition"]),
        skill("fractions", 3, 1, 0.7, &["multiplication"]),
    ];
    let questions = vec![
        question("q_count_1", &["counting"], 0.1, 30.0),
        question("q_count_2", &["counting"], 0.2, 30.0),
        question("q_add_1", &["addition"], 0.35, 60.0),
        question("q_add_2", &["addition"], 0.55, 60.0),
        question("q_add_3", &["addition"], 0.9, 90.0),
        question("q_sub_1", &["subtraction"], 0.45, 60.0),
        question("q_mul_1", &["multiplication"], 0.6, 90.0),
        question("q_mul_2", &["multiplication"], 0.75, 90.0),
        question("q_frac_1", &["fractions"], 0.7, 120.0),
    ];
    SkillCatalog::new(skills, questions).expect("fixture catalog is valid")
}

pub fn engine() -> (MasteryEngine, Arc<MemoryProfileStore>) {
    let profiles = Arc::new(MemoryProfileStore::new());
    let engine = MasteryEngine::new(
        EngineConfig::default(),
        Arc::new(math_catalog()),
        profiles.clone(),
    )
    .expect("default config is valid");
    (engine, profiles)
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable catalog record owned by the curriculum collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: String,
    pub name: String,
    /// Ordinal grade: 0 = kindergarten .. 12.
    pub grade_level: u8,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// Decay exponent; must be positive.
    pub forgetting_rate: f64,
    pub difficulty: f64,
    /// Position within the grade's learning journey.
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub skill_ids: Vec<String>,
    pub difficulty: f64,
    #[serde(default)]
    pub expected_time_seconds: Option<f64>,
    /// Opaque to the engine; rendered by the application layer.
    #[serde(default)]
    pub content: serde_json::Value,
}

/// Per-(student, skill) mastery state. Mutated only by the update path;
/// `memory_strength` stays inside the configured [-2.0, 5.0] band.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSkillState {
    pub memory_strength: f64,
    pub last_practice_time: Option<DateTime<Utc>>,
    /// Direct attempts only; cascade updates never touch this.
    pub practice_count: u32,
    pub correct_count: u32,
}

impl Default for StudentSkillState {
    fn default() -> Self {
        Self {
            memory_strength: 0.0,
            last_practice_time: None,
            practice_count: 0,
            correct_count: 0,
        }
    }
}

impl StudentSkillState {
    pub fn accuracy(&self) -> f64 {
        if self.practice_count == 0 {
            0.0
        } else {
            self.correct_count as f64 / self.practice_count as f64
        }
    }
}

/// Append-only history entry. `expected_time_seconds` is resolved from the
/// catalog when the attempt is recorded so performance analysis can run from
/// history alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAttempt {
    pub question_id: String,
    pub skill_ids: Vec<String>,
    pub is_correct: bool,
    pub timestamp: DateTime<Utc>,
    pub response_time_seconds: f64,
    #[serde(default)]
    pub expected_time_seconds: Option<f64>,
}

/// Persisted per-student document. Attempt history lives in the profile
/// store, not inline here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub student_id: String,
    /// Declared grade; `None` until the caller registers the student, in
    /// which case lazily created skill states start zero-valued instead of
    /// going through the cold-start policy.
    #[serde(default)]
    pub grade_level: Option<u8>,
    pub total_attempts: u64,
    #[serde(default)]
    pub skill_states: HashMap<String, StudentSkillState>,
    pub created_at: DateTime<Utc>,
}

impl StudentProfile {
    pub fn new(student_id: &str, grade_level: u8, now: DateTime<Utc>) -> Self {
        Self {
            student_id: student_id.to_string(),
            grade_level: Some(grade_level),
            total_attempts: 0,
            skill_states: HashMap::new(),
            created_at: now,
        }
    }

    /// Transient stand-in for a student the caller never registered.
    pub fn detached(student_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            student_id: student_id.to_string(),
            grade_level: None,
            total_attempts: 0,
            skill_states: HashMap::new(),
            created_at: now,
        }
    }
}

/// Rolling-window analysis of recent attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceAnalysis {
    pub performance_score: f64,
    pub difficulty_adjustment: f64,
    pub correctness_rate: f64,
    pub avg_time_ratio: f64,
}

impl Default for PerformanceAnalysis {
    fn default() -> Self {
        Self {
            performance_score: 0.0,
            difficulty_adjustment: 0.0,
            correctness_rate: 0.5,
            avg_time_ratio: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    DecayedStrength,
    PredictCorrectness,
    RecordAttempt,
    RecommendSkills,
    SelectQuestion,
    AnalyzePerformance,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DecayedStrength => "decayed_strength",
            Self::PredictCorrectness => "predict_correctness",
            Self::RecordAttempt => "record_attempt",
            Self::RecommendSkills => "recommend_skills",
            Self::SelectQuestion => "select_question",
            Self::AnalyzePerformance => "analyze_performance",
        }
    }
}

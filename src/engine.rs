//! Engine orchestration: snapshot reads, serialized per-student writes, and
//! the recommend -> difficulty -> select pipeline.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::catalog::{self, CatalogStore};
use crate::config::EngineConfig;
use crate::decision::{difficulty, recommend, selector};
use crate::error::EngineError;
use crate::metrics::MetricsRegistry;
use crate::model::{coldstart, decay, update};
use crate::store::ProfileStore;
use crate::types::{
    Operation, PerformanceAnalysis, Question, QuestionAttempt, Skill, StudentProfile,
};

/// Adaptive mastery engine. Holds read-only catalog access and the profile
/// store contract; all per-student mutable state flows through the latter.
/// One explicitly constructed instance replaces any global caches.
pub struct MasteryEngine {
    config: RwLock<EngineConfig>,
    catalog: Arc<dyn CatalogStore>,
    profiles: Arc<dyn ProfileStore>,
    student_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    metrics: Arc<MetricsRegistry>,
}

impl MasteryEngine {
    pub fn new(
        config: EngineConfig,
        catalog: Arc<dyn CatalogStore>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::InvalidConfig)?;
        Ok(Self {
            config: RwLock::new(config),
            catalog,
            profiles,
            student_locks: Mutex::new(HashMap::new()),
            metrics: Arc::new(MetricsRegistry::new()),
        })
    }

    pub fn reload_config(&self, new_config: EngineConfig) -> Result<(), EngineError> {
        new_config.validate().map_err(EngineError::InvalidConfig)?;
        let mut config = self
            .config
            .write()
            .map_err(|_| EngineError::store("config lock poisoned"))?;
        *config = new_config;
        tracing::info!("engine config reloaded");
        Ok(())
    }

    pub fn get_config(&self) -> Result<EngineConfig, EngineError> {
        Ok(self
            .config
            .read()
            .map_err(|_| EngineError::store("config lock poisoned"))?
            .clone())
    }

    pub fn metrics_registry(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Creates and persists a profile for a student at their declared grade.
    /// Idempotent: an existing profile is returned untouched.
    pub fn register_student(
        &self,
        student_id: &str,
        grade_level: u8,
        now: DateTime<Utc>,
    ) -> Result<StudentProfile, EngineError> {
        let lock = self.acquire_student_lock(student_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| EngineError::store("student lock poisoned"))?;

        if let Some(existing) = self.profiles.load(student_id)? {
            tracing::debug!(student_id, "register_student found existing profile");
            return Ok(existing);
        }
        let profile = StudentProfile::new(student_id, grade_level, now);
        self.profiles.save(&profile)?;
        Ok(profile)
    }

    /// Pure read-time projection of a skill's memory strength at `now`.
    pub fn compute_decayed_strength(
        &self,
        student_id: &str,
        skill_id: &str,
        now: DateTime<Utc>,
    ) -> Result<f64, EngineError> {
        let start = Instant::now();
        let result = self.compute_decayed_strength_inner(student_id, skill_id, now);
        self.observe(Operation::DecayedStrength, start, result.is_err());
        result
    }

    fn compute_decayed_strength_inner(
        &self,
        student_id: &str,
        skill_id: &str,
        now: DateTime<Utc>,
    ) -> Result<f64, EngineError> {
        let config = self.get_config()?;
        let skill = self
            .catalog
            .skill(skill_id)?
            .ok_or_else(|| EngineError::UnknownSkill(skill_id.to_string()))?;
        let profile = self.load_or_detached(student_id, now)?;
        let state = coldstart::state_for(&profile, &skill, &config.cold_start);
        Ok(decay::decayed_strength(
            &state,
            skill.forgetting_rate,
            now,
            &config.mastery,
        ))
    }

    /// Probability in [0, 1] that the student answers this skill correctly.
    pub fn predict_correctness(
        &self,
        student_id: &str,
        skill_id: &str,
        now: DateTime<Utc>,
    ) -> Result<f64, EngineError> {
        let start = Instant::now();
        let result = self.predict_correctness_inner(student_id, skill_id, now);
        self.observe(Operation::PredictCorrectness, start, result.is_err());
        result
    }

    fn predict_correctness_inner(
        &self,
        student_id: &str,
        skill_id: &str,
        now: DateTime<Utc>,
    ) -> Result<f64, EngineError> {
        let config = self.get_config()?;
        let skill = self
            .catalog
            .skill(skill_id)?
            .ok_or_else(|| EngineError::UnknownSkill(skill_id.to_string()))?;
        let profile = self.load_or_detached(student_id, now)?;
        let state = coldstart::state_for(&profile, &skill, &config.cold_start);
        Ok(decay::predict_correctness(&state, &skill, now, &config.mastery))
    }

    /// Records one attempt: direct updates for the tested skills, a cascade
    /// into transitive prerequisites on a miss, history append, profile save.
    /// Returns the affected skill ids, de-duplicated in first-seen order.
    pub fn record_attempt(
        &self,
        student_id: &str,
        question_id: &str,
        skill_ids: &[String],
        is_correct: bool,
        response_time_seconds: f64,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, EngineError> {
        let start = Instant::now();
        let result = self.record_attempt_inner(
            student_id,
            question_id,
            skill_ids,
            is_correct,
            response_time_seconds,
            now,
        );
        self.observe(Operation::RecordAttempt, start, result.is_err());
        result
    }

    fn record_attempt_inner(
        &self,
        student_id: &str,
        question_id: &str,
        skill_ids: &[String],
        is_correct: bool,
        response_time_seconds: f64,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, EngineError> {
        // The read-decay-compute-write sequence is not atomic; duplicate
        // submissions for the same student must queue here.
        let lock = self.acquire_student_lock(student_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| EngineError::store("student lock poisoned"))?;

        let config = self.get_config()?;
        let mut profile = self.load_or_detached(student_id, now)?;

        let mut seen = HashSet::new();
        let mut direct = Vec::with_capacity(skill_ids.len());
        for skill_id in skill_ids {
            if !seen.insert(skill_id.clone()) {
                continue;
            }
            match self.catalog.skill(skill_id)? {
                Some(skill) => direct.push(skill),
                None => {
                    tracing::warn!(student_id, skill_id = %skill_id, "attempt references unknown skill, skipping");
                }
            }
        }

        let prerequisites = if is_correct {
            Vec::new()
        } else {
            let direct_ids: Vec<String> = direct.iter().map(|s| s.id.clone()).collect();
            catalog::transitive_prerequisites(self.catalog.as_ref(), &direct_ids)?
        };

        let affected = update::apply_attempt(
            &mut profile,
            &direct,
            &prerequisites,
            is_correct,
            response_time_seconds,
            now,
            &config,
        );

        let expected_time_seconds = self
            .catalog
            .question(question_id)?
            .and_then(|question| question.expected_time_seconds);

        let attempt = QuestionAttempt {
            question_id: question_id.to_string(),
            skill_ids: direct.iter().map(|s| s.id.clone()).collect(),
            is_correct,
            timestamp: now,
            response_time_seconds,
            expected_time_seconds,
        };

        profile.total_attempts += 1;
        self.profiles.append_attempt(student_id, &attempt)?;
        self.profiles.save(&profile)?;

        tracing::debug!(
            student_id,
            question_id,
            is_correct,
            affected = affected.len(),
            "attempt recorded"
        );
        Ok(affected)
    }

    /// Ordered list of skill ids needing practice. `threshold` defaults from
    /// config; the grade filter defaults to the student's declared grade
    /// while they are inside the cold-start window.
    pub fn recommend_skills(
        &self,
        student_id: &str,
        now: DateTime<Utc>,
        threshold: Option<f64>,
        grade_filter: Option<u8>,
    ) -> Result<Vec<String>, EngineError> {
        let start = Instant::now();
        let result = self.recommend_skills_inner(student_id, now, threshold, grade_filter);
        self.observe(Operation::RecommendSkills, start, result.is_err());
        result
    }

    fn recommend_skills_inner(
        &self,
        student_id: &str,
        now: DateTime<Utc>,
        threshold: Option<f64>,
        grade_filter: Option<u8>,
    ) -> Result<Vec<String>, EngineError> {
        let config = self.get_config()?;
        let profile = self.load_or_detached(student_id, now)?;
        let skills = self.catalog.all_skills()?;
        let probabilities = self.probability_map(&profile, &skills, now, &config);

        let ranked = recommend::rank_skills(
            &skills,
            &probabilities,
            threshold.unwrap_or(config.recommendation.default_threshold),
            self.effective_grade_filter(&profile, grade_filter, &config),
            config.recommendation.grade_span,
        );

        Ok(ranked.into_iter().map(|r| r.skill_id).collect())
    }

    /// Rolling-window analysis over an attempt history slice.
    pub fn analyze_recent_performance(
        &self,
        history: &[QuestionAttempt],
        lookback: Option<usize>,
    ) -> Result<PerformanceAnalysis, EngineError> {
        let start = Instant::now();
        let config = self.get_config()?;
        let analysis = difficulty::analyze_recent_performance(
            history,
            lookback.unwrap_or(config.difficulty.default_lookback),
            &config.difficulty,
        );
        self.observe(Operation::AnalyzePerformance, start, false);
        Ok(analysis)
    }

    /// Picks the next unanswered question for the top-ranked skill within an
    /// adaptive difficulty window. `flexible` expands to an ungated ±1-grade
    /// candidate set when the recommended list is exhausted. `None` means
    /// every candidate pool is exhausted, which is a valid terminal state.
    pub fn select_next_question(
        &self,
        student_id: &str,
        now: DateTime<Utc>,
        exclude_question_ids: &HashSet<String>,
        flexible: bool,
    ) -> Result<Option<Question>, EngineError> {
        let start = Instant::now();
        let result =
            self.select_next_question_inner(student_id, now, exclude_question_ids, flexible);
        self.observe(Operation::SelectQuestion, start, result.is_err());
        result
    }

    fn select_next_question_inner(
        &self,
        student_id: &str,
        now: DateTime<Utc>,
        exclude_question_ids: &HashSet<String>,
        flexible: bool,
    ) -> Result<Option<Question>, EngineError> {
        let config = self.get_config()?;
        let Some(profile) = self.profiles.load(student_id)? else {
            tracing::debug!(student_id, "no profile, nothing to select");
            return Ok(None);
        };

        let mut excluded = self.profiles.answered_question_ids(student_id)?;
        excluded.extend(exclude_question_ids.iter().cloned());

        let history = self
            .profiles
            .recent_attempts(student_id, config.difficulty.default_lookback)?;
        let analysis = difficulty::analyze_recent_performance(
            &history,
            config.difficulty.default_lookback,
            &config.difficulty,
        );

        let skills = self.catalog.all_skills()?;
        let skills_by_id: HashMap<&str, &Skill> =
            skills.iter().map(|s| (s.id.as_str(), s)).collect();
        let probabilities = self.probability_map(&profile, &skills, now, &config);

        let ranked = recommend::rank_skills(
            &skills,
            &probabilities,
            config.recommendation.default_threshold,
            self.effective_grade_filter(&profile, None, &config),
            config.recommendation.grade_span,
        );

        if let Some(question) = self.pick_from_ranked(
            &ranked,
            &skills_by_id,
            &excluded,
            analysis.difficulty_adjustment,
            &config,
        )? {
            return Ok(Some(question));
        }

        if flexible {
            let ranked = recommend::rank_flexible(
                &skills,
                &probabilities,
                profile.grade_level,
                config.selector.flexible_grade_span,
            );
            if let Some(question) = self.pick_from_ranked(
                &ranked,
                &skills_by_id,
                &excluded,
                analysis.difficulty_adjustment,
                &config,
            )? {
                tracing::debug!(student_id, "flexible mode selection");
                return Ok(Some(question));
            }
        }

        Ok(None)
    }

    fn pick_from_ranked(
        &self,
        ranked: &[recommend::RankedSkill],
        skills_by_id: &HashMap<&str, &Skill>,
        excluded: &HashSet<String>,
        difficulty_adjustment: f64,
        config: &EngineConfig,
    ) -> Result<Option<Question>, EngineError> {
        for entry in ranked {
            let Some(skill) = skills_by_id.get(entry.skill_id.as_str()) else {
                continue;
            };
            let candidates: Vec<Question> = self
                .catalog
                .questions_for_skill(&entry.skill_id)?
                .into_iter()
                .filter(|question| !excluded.contains(&question.id))
                .collect();
            if candidates.is_empty() {
                continue;
            }

            let target = skill.difficulty + difficulty_adjustment;
            if let Some(question) =
                selector::pick_for_skill(&candidates, target, config.selector.difficulty_window)
            {
                return Ok(Some(question.clone()));
            }
        }
        Ok(None)
    }

    fn probability_map(
        &self,
        profile: &StudentProfile,
        skills: &[Skill],
        now: DateTime<Utc>,
        config: &EngineConfig,
    ) -> HashMap<String, f64> {
        skills
            .iter()
            .map(|skill| {
                let state = coldstart::state_for(profile, skill, &config.cold_start);
                (
                    skill.id.clone(),
                    decay::predict_correctness(&state, skill, now, &config.mastery),
                )
            })
            .collect()
    }

    fn effective_grade_filter(
        &self,
        profile: &StudentProfile,
        grade_filter: Option<u8>,
        config: &EngineConfig,
    ) -> Option<u8> {
        grade_filter.or_else(|| {
            if coldstart::in_cold_start_window(profile, &config.cold_start) {
                profile.grade_level
            } else {
                None
            }
        })
    }

    fn load_or_detached(
        &self,
        student_id: &str,
        now: DateTime<Utc>,
    ) -> Result<StudentProfile, EngineError> {
        Ok(self
            .profiles
            .load(student_id)?
            .unwrap_or_else(|| StudentProfile::detached(student_id, now)))
    }

    fn acquire_student_lock(&self, student_id: &str) -> Result<Arc<Mutex<()>>, EngineError> {
        let mut locks = self
            .student_locks
            .lock()
            .map_err(|_| EngineError::store("student lock table poisoned"))?;

        // Prune entries nobody holds: strong_count == 1 means only the map
        // still references the lock.
        if locks.len() > 1000 {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }

        Ok(locks
            .entry(student_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    fn observe(&self, op: Operation, start: Instant, is_error: bool) {
        self.metrics
            .record_call(op, start.elapsed().as_micros() as u64, is_error);
    }
}

//! Profile-store contract and an in-memory implementation used by tests
//! and embedders.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::error::EngineError;
use crate::types::{QuestionAttempt, StudentProfile};

/// Read/write access to per-student state. The engine performs no storage
/// I/O itself; implementations own serialization and indexing.
pub trait ProfileStore: Send + Sync {
    fn load(&self, student_id: &str) -> Result<Option<StudentProfile>, EngineError>;
    /// Upsert; creating a missing profile on save is allowed.
    fn save(&self, profile: &StudentProfile) -> Result<(), EngineError>;
    fn append_attempt(
        &self,
        student_id: &str,
        attempt: &QuestionAttempt,
    ) -> Result<(), EngineError>;
    /// Last `limit` attempts in chronological order.
    fn recent_attempts(
        &self,
        student_id: &str,
        limit: usize,
    ) -> Result<Vec<QuestionAttempt>, EngineError>;
    fn answered_question_ids(&self, student_id: &str) -> Result<HashSet<String>, EngineError>;
}

#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<String, StudentProfile>>,
    history: RwLock<HashMap<String, Vec<QuestionAttempt>>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(what: &str) -> EngineError {
    EngineError::store(format!("{what} lock poisoned"))
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self, student_id: &str) -> Result<Option<StudentProfile>, EngineError> {
        let profiles = self.profiles.read().map_err(|_| poisoned("profiles"))?;
        Ok(profiles.get(student_id).cloned())
    }

    fn save(&self, profile: &StudentProfile) -> Result<(), EngineError> {
        let mut profiles = self.profiles.write().map_err(|_| poisoned("profiles"))?;
        profiles.insert(profile.student_id.clone(), profile.clone());
        Ok(())
    }

    fn append_attempt(
        &self,
        student_id: &str,
        attempt: &QuestionAttempt,
    ) -> Result<(), EngineError> {
        let mut history = self.history.write().map_err(|_| poisoned("history"))?;
        history
            .entry(student_id.to_string())
            .or_default()
            .push(attempt.clone());
        Ok(())
    }

    fn recent_attempts(
        &self,
        student_id: &str,
        limit: usize,
    ) -> Result<Vec<QuestionAttempt>, EngineError> {
        let history = self.history.read().map_err(|_| poisoned("history"))?;
        Ok(history
            .get(student_id)
            .map(|attempts| {
                let start = attempts.len().saturating_sub(limit);
                attempts[start..].to_vec()
            })
            .unwrap_or_default())
    }

    fn answered_question_ids(&self, student_id: &str) -> Result<HashSet<String>, EngineError> {
        let history = self.history.read().map_err(|_| poisoned("history"))?;
        Ok(history
            .get(student_id)
            .map(|attempts| {
                attempts
                    .iter()
                    .map(|attempt| attempt.question_id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

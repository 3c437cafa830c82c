use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("unknown skill: {0}")]
    UnknownSkill(String),
    #[error("prerequisite cycle detected at skill {0}")]
    PrerequisiteCycle(String),
    #[error("duplicate catalog id: {0}")]
    DuplicateId(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }
}

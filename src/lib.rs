//! Adaptive mastery-tracking and question-selection engine.
//!
//! Tracks per-(student, skill) memory strength with exponential decay,
//! predicts correctness with a logistic model, ranks skills for practice
//! under prerequisite gating, and picks the next question inside an
//! adaptive difficulty window.
//!
//! The engine is a synchronous library: it owns no I/O and works through
//! two injected collaborators, a read-only [`catalog::CatalogStore`] and a
//! read/write [`store::ProfileStore`]. Mutations for one student are
//! serialized internally; everything else is freely parallel.

pub mod catalog;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod model;
pub mod store;
pub mod types;

pub use catalog::{CatalogStore, SkillCatalog};
pub use config::EngineConfig;
pub use engine::MasteryEngine;
pub use error::EngineError;
pub use store::{MemoryProfileStore, ProfileStore};

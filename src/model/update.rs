//! Attempt application: direct strength updates plus the prerequisite
//! penalty cascade. The caller resolves skills and the transitive
//! prerequisite closure; this module only mutates the profile.

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::model::{coldstart, decay};
use crate::types::{Skill, StudentProfile};

/// Applies one attempt to the profile. `direct` are the skills the question
/// tested (deduplicated, order preserved); `prerequisites` is the transitive
/// closure of their prerequisites excluding the direct skills themselves,
/// in first-seen order. Returns all affected skill ids in first-seen order.
///
/// Every write re-derives from the decayed value first so elapsed time is
/// never double-counted, and clamps into the configured strength band.
pub fn apply_attempt(
    profile: &mut StudentProfile,
    direct: &[Skill],
    prerequisites: &[Skill],
    is_correct: bool,
    response_time_seconds: f64,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Vec<String> {
    let mut affected = Vec::with_capacity(direct.len() + prerequisites.len());

    for skill in direct {
        let state = coldstart::state_mut(profile, skill, &config.cold_start);
        state.practice_count += 1;

        let current = decay::decayed_strength(state, skill.forgetting_rate, now, &config.mastery);

        if is_correct {
            let increment = 1.0
                / (1.0 + config.update.correct_increment_damping * state.correct_count as f64);
            let penalty = if response_time_seconds > config.update.slow_response_threshold_secs {
                config.update.slow_response_penalty
            } else {
                1.0
            };
            state.memory_strength =
                (current + increment * penalty).min(config.mastery.max_strength);
            state.correct_count += 1;
        } else {
            state.memory_strength =
                (current - config.update.incorrect_penalty).max(config.mastery.min_strength);
        }

        state.last_practice_time = Some(now);
        affected.push(skill.id.clone());
    }

    if !is_correct {
        for skill in prerequisites {
            let state = coldstart::state_mut(profile, skill, &config.cold_start);
            let current =
                decay::decayed_strength(state, skill.forgetting_rate, now, &config.mastery);
            // Implicated, not directly tested: no counter changes.
            state.memory_strength =
                (current - config.update.cascade_penalty).max(config.mastery.min_strength);
            state.last_practice_time = Some(now);
            affected.push(skill.id.clone());
        }
    }

    affected
}

//! Time-decayed memory strength and logistic correctness prediction.
//! Pure read-time projections: nothing here writes back to state.

use chrono::{DateTime, Utc};

use crate::config::MasteryConfig;
use crate::types::{Skill, StudentSkillState};

/// Projects stored strength forward to `now` via exponential decay.
/// Never-practiced states are returned unchanged.
pub fn decayed_strength(
    state: &StudentSkillState,
    forgetting_rate: f64,
    now: DateTime<Utc>,
    config: &MasteryConfig,
) -> f64 {
    let Some(last) = state.last_practice_time else {
        return state.memory_strength;
    };

    let elapsed_secs = (now - last).num_milliseconds() as f64 / 1000.0;
    if elapsed_secs <= 0.0 {
        return state.memory_strength;
    }

    let elapsed_units = elapsed_secs / config.elapsed_time_unit_secs;
    state.memory_strength * (-forgetting_rate * elapsed_units).exp()
}

/// Probability the student answers a question on this skill correctly,
/// as a logistic over (decayed strength - skill difficulty).
pub fn predict_correctness(
    state: &StudentSkillState,
    skill: &Skill,
    now: DateTime<Utc>,
    config: &MasteryConfig,
) -> f64 {
    let strength = decayed_strength(state, skill.forgetting_rate, now, config);
    logistic(strength - skill.difficulty)
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn skill(difficulty: f64, forgetting_rate: f64) -> Skill {
        Skill {
            id: "s".to_string(),
            name: "s".to_string(),
            grade_level: 1,
            prerequisites: vec![],
            forgetting_rate,
            difficulty,
            order: 0,
        }
    }

    fn practiced(strength: f64, at: DateTime<Utc>) -> StudentSkillState {
        StudentSkillState {
            memory_strength: strength,
            last_practice_time: Some(at),
            ..StudentSkillState::default()
        }
    }

    #[test]
    fn never_practiced_state_does_not_decay() {
        let config = MasteryConfig::default();
        let state = StudentSkillState {
            memory_strength: 2.0,
            ..StudentSkillState::default()
        };
        let now = Utc::now();
        assert_eq!(decayed_strength(&state, 0.08, now, &config), 2.0);
        assert_eq!(
            decayed_strength(&state, 0.08, now + Duration::days(30), &config),
            2.0
        );
    }

    #[test]
    fn decay_is_non_increasing_in_elapsed() {
        let config = MasteryConfig::default();
        let now = Utc::now();
        let state = practiced(3.0, now);
        let d0 = decayed_strength(&state, 0.08, now, &config);
        let d1 = decayed_strength(&state, 0.08, now + Duration::days(1), &config);
        let d7 = decayed_strength(&state, 0.08, now + Duration::days(7), &config);
        assert_eq!(d0, 3.0);
        assert!(d1 < d0);
        assert!(d7 < d1);
        assert!(d7 > 0.0);
    }

    #[test]
    fn elapsed_unit_scales_decay() {
        let now = Utc::now();
        let state = practiced(3.0, now);
        let days = MasteryConfig::default();
        let hours = MasteryConfig {
            elapsed_time_unit_secs: 3_600.0,
            ..MasteryConfig::default()
        };
        let later = now + Duration::hours(12);
        let slow = decayed_strength(&state, 0.08, later, &days);
        let fast = decayed_strength(&state, 0.08, later, &hours);
        assert!(fast < slow);
    }

    #[test]
    fn equal_strength_and_difficulty_predicts_half() {
        let config = MasteryConfig::default();
        let now = Utc::now();
        let state = practiced(0.5, now);
        let p = predict_correctness(&state, &skill(0.5, 0.08), now, &config);
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn prediction_monotonic_in_strength_and_difficulty() {
        let config = MasteryConfig::default();
        let now = Utc::now();
        let weak = practiced(0.0, now);
        let strong = practiced(2.0, now);
        let easy = skill(0.2, 0.08);
        let hard = skill(1.5, 0.08);

        assert!(
            predict_correctness(&strong, &easy, now, &config)
                > predict_correctness(&weak, &easy, now, &config)
        );
        assert!(
            predict_correctness(&weak, &easy, now, &config)
                > predict_correctness(&weak, &hard, now, &config)
        );
    }
}

//! Grade-based initial skill states for learners with no attempt history.

use crate::config::ColdStartConfig;
use crate::types::{Skill, StudentProfile, StudentSkillState};

/// Canonical three-state initialization: below the declared grade is assumed
/// mastered, at grade is ready to learn, above grade starts low enough that
/// prerequisite-probability gating keeps it out of recommendations.
pub fn initial_state(
    skill_grade: u8,
    declared_grade: u8,
    config: &ColdStartConfig,
) -> StudentSkillState {
    let memory_strength = if skill_grade < declared_grade {
        config.assumed_mastered_strength
    } else if skill_grade == declared_grade {
        config.ready_strength
    } else {
        config.locked_strength
    };

    StudentSkillState {
        memory_strength,
        ..StudentSkillState::default()
    }
}

/// Snapshot of the student's state for a skill: the persisted state if one
/// exists, a cold-start state if the student declared a grade, and a
/// zero-valued state otherwise.
pub fn state_for(
    profile: &StudentProfile,
    skill: &Skill,
    config: &ColdStartConfig,
) -> StudentSkillState {
    match profile.skill_states.get(&skill.id) {
        Some(state) => state.clone(),
        None => match profile.grade_level {
            Some(grade) => initial_state(skill.grade_level, grade, config),
            None => StudentSkillState::default(),
        },
    }
}

/// Mutable access for the update path, lazily materializing the state.
pub fn state_mut<'a>(
    profile: &'a mut StudentProfile,
    skill: &Skill,
    config: &ColdStartConfig,
) -> &'a mut StudentSkillState {
    let declared_grade = profile.grade_level;
    profile
        .skill_states
        .entry(skill.id.clone())
        .or_insert_with(|| match declared_grade {
            Some(grade) => initial_state(skill.grade_level, grade, config),
            None => StudentSkillState::default(),
        })
}

/// Recommendations stay age-restricted while the student is inside the
/// first-N-attempts window.
pub fn in_cold_start_window(profile: &StudentProfile, config: &ColdStartConfig) -> bool {
    profile.total_attempts < config.window_attempts
}

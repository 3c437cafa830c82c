//! Probability-gated, curriculum-ordered skill ranking.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::types::Skill;

#[derive(Debug, Clone)]
pub struct RankedSkill {
    pub skill_id: String,
    pub grade_level: u8,
    pub order: i32,
    pub probability: f64,
}

/// Ranks skills that need practice. A skill qualifies when its predicted
/// correctness is below `threshold` while every direct prerequisite sits at
/// or above it; shaky prerequisites withhold the skill entirely instead of
/// offering it locked. Output is sorted by (grade, order, probability).
pub fn rank_skills(
    skills: &[Skill],
    probabilities: &HashMap<String, f64>,
    threshold: f64,
    grade_filter: Option<u8>,
    grade_span: u8,
) -> Vec<RankedSkill> {
    let mut ranked = Vec::new();

    for skill in skills {
        if let Some(filter) = grade_filter {
            if grade_distance(skill.grade_level, filter) > grade_span as i16 {
                continue;
            }
        }

        let Some(&probability) = probabilities.get(&skill.id) else {
            continue;
        };
        if probability >= threshold {
            continue;
        }

        if !prerequisites_solid(skill, probabilities, threshold) {
            continue;
        }

        ranked.push(RankedSkill {
            skill_id: skill.id.clone(),
            grade_level: skill.grade_level,
            order: skill.order,
            probability,
        });
    }

    ranked.sort_by(compare);
    ranked
}

/// Ungated flexible-mode ordering: every skill within the grade band (all
/// skills when no grade is known), sorted the same way.
pub fn rank_flexible(
    skills: &[Skill],
    probabilities: &HashMap<String, f64>,
    grade_filter: Option<u8>,
    grade_span: u8,
) -> Vec<RankedSkill> {
    let mut ranked: Vec<RankedSkill> = skills
        .iter()
        .filter(|skill| match grade_filter {
            Some(filter) => grade_distance(skill.grade_level, filter) <= grade_span as i16,
            None => true,
        })
        .map(|skill| RankedSkill {
            skill_id: skill.id.clone(),
            grade_level: skill.grade_level,
            order: skill.order,
            probability: probabilities.get(&skill.id).copied().unwrap_or(0.5),
        })
        .collect();

    ranked.sort_by(compare);
    ranked
}

fn compare(a: &RankedSkill, b: &RankedSkill) -> Ordering {
    a.grade_level
        .cmp(&b.grade_level)
        .then(a.order.cmp(&b.order))
        .then(
            a.probability
                .partial_cmp(&b.probability)
                .unwrap_or(Ordering::Equal),
        )
}

fn grade_distance(a: u8, b: u8) -> i16 {
    (a as i16 - b as i16).abs()
}

fn prerequisites_solid(
    skill: &Skill,
    probabilities: &HashMap<String, f64>,
    threshold: f64,
) -> bool {
    for prereq_id in &skill.prerequisites {
        match probabilities.get(prereq_id) {
            Some(&p) if p < threshold => return false,
            Some(_) => {}
            None => {
                tracing::warn!(
                    skill_id = %skill.id,
                    prerequisite = %prereq_id,
                    "unknown prerequisite ignored during gating"
                );
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(id: &str, grade: u8, order: i32, prerequisites: &[&str]) -> Skill {
        Skill {
            id: id.to_string(),
            name: id.to_string(),
            grade_level: grade,
            prerequisites: prerequisites.iter().map(|s| s.to_string()).collect(),
            forgetting_rate: 0.08,
            difficulty: 0.5,
            order,
        }
    }

    fn probs(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries
            .iter()
            .map(|(id, p)| (id.to_string(), *p))
            .collect()
    }

    #[test]
    fn confident_skills_are_excluded() {
        let skills = vec![skill("a", 1, 0, &[]), skill("b", 1, 1, &[])];
        let probabilities = probs(&[("a", 0.9), ("b", 0.3)]);
        let ranked = rank_skills(&skills, &probabilities, 0.7, None, 1);
        let ids: Vec<&str> = ranked.iter().map(|r| r.skill_id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn shaky_prerequisite_withholds_skill() {
        let skills = vec![skill("a", 1, 0, &[]), skill("b", 1, 1, &["a"])];
        let probabilities = probs(&[("a", 0.4), ("b", 0.3)]);
        let ranked = rank_skills(&skills, &probabilities, 0.7, None, 1);
        let ids: Vec<&str> = ranked.iter().map(|r| r.skill_id.as_str()).collect();
        // Only the prerequisite itself is offered.
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn solid_prerequisite_releases_skill() {
        let skills = vec![skill("a", 1, 0, &[]), skill("b", 1, 1, &["a"])];
        let probabilities = probs(&[("a", 0.85), ("b", 0.3)]);
        let ranked = rank_skills(&skills, &probabilities, 0.7, None, 1);
        let ids: Vec<&str> = ranked.iter().map(|r| r.skill_id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn sorted_by_grade_then_order_then_probability() {
        let skills = vec![
            skill("late", 2, 0, &[]),
            skill("second", 1, 5, &[]),
            skill("first", 1, 1, &[]),
            skill("weaker_twin", 1, 1, &[]),
        ];
        let probabilities = probs(&[
            ("late", 0.1),
            ("second", 0.2),
            ("first", 0.5),
            ("weaker_twin", 0.2),
        ]);
        let ranked = rank_skills(&skills, &probabilities, 0.7, None, 1);
        let ids: Vec<&str> = ranked.iter().map(|r| r.skill_id.as_str()).collect();
        assert_eq!(ids, vec!["weaker_twin", "first", "second", "late"]);
    }

    #[test]
    fn grade_filter_limits_to_band() {
        let skills = vec![
            skill("k", 0, 0, &[]),
            skill("g3", 3, 0, &[]),
            skill("g5", 5, 0, &[]),
        ];
        let probabilities = probs(&[("k", 0.1), ("g3", 0.1), ("g5", 0.1)]);
        let ranked = rank_skills(&skills, &probabilities, 0.7, Some(4), 1);
        let ids: Vec<&str> = ranked.iter().map(|r| r.skill_id.as_str()).collect();
        assert_eq!(ids, vec!["g3", "g5"]);
    }

    #[test]
    fn unknown_prerequisite_does_not_gate() {
        let skills = vec![skill("a", 1, 0, &["ghost"])];
        let probabilities = probs(&[("a", 0.3)]);
        let ranked = rank_skills(&skills, &probabilities, 0.7, None, 1);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn empty_result_is_valid() {
        let skills = vec![skill("a", 1, 0, &[])];
        let probabilities = probs(&[("a", 0.95)]);
        assert!(rank_skills(&skills, &probabilities, 0.7, None, 1).is_empty());
    }

    #[test]
    fn flexible_ranking_ignores_gating() {
        let skills = vec![skill("a", 1, 0, &[]), skill("b", 1, 1, &["a"])];
        let probabilities = probs(&[("a", 0.2), ("b", 0.95)]);
        let ranked = rank_flexible(&skills, &probabilities, Some(1), 1);
        assert_eq!(ranked.len(), 2);
    }
}

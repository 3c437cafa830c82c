//! Read-only catalog contract plus an in-memory implementation with
//! load-time prerequisite-graph validation.

use std::collections::{HashMap, HashSet};

use crate::error::EngineError;
use crate::types::{Question, Skill};

/// Read-only skill/question lookups. Persisted layout is the collaborator's
/// concern; the engine only needs these projections.
pub trait CatalogStore: Send + Sync {
    fn skill(&self, skill_id: &str) -> Result<Option<Skill>, EngineError>;
    fn all_skills(&self) -> Result<Vec<Skill>, EngineError>;
    fn question(&self, question_id: &str) -> Result<Option<Question>, EngineError>;
    fn questions_for_skill(&self, skill_id: &str) -> Result<Vec<Question>, EngineError>;
}

/// In-memory catalog loaded once per session. Construction rejects cyclic
/// prerequisite graphs and indexes questions by skill membership.
#[derive(Debug)]
pub struct SkillCatalog {
    skills: HashMap<String, Skill>,
    skill_order: Vec<String>,
    questions: HashMap<String, Question>,
    questions_by_skill: HashMap<String, Vec<String>>,
}

impl SkillCatalog {
    pub fn new(skills: Vec<Skill>, questions: Vec<Question>) -> Result<Self, EngineError> {
        let mut skill_map = HashMap::with_capacity(skills.len());
        let mut skill_order = Vec::with_capacity(skills.len());
        for skill in skills {
            if skill_map.contains_key(&skill.id) {
                return Err(EngineError::DuplicateId(skill.id));
            }
            skill_order.push(skill.id.clone());
            skill_map.insert(skill.id.clone(), skill);
        }

        validate_acyclic(&skill_map)?;

        let mut question_map = HashMap::with_capacity(questions.len());
        let mut questions_by_skill: HashMap<String, Vec<String>> = HashMap::new();
        for question in questions {
            if question_map.contains_key(&question.id) {
                return Err(EngineError::DuplicateId(question.id));
            }
            for skill_id in &question.skill_ids {
                if !skill_map.contains_key(skill_id) {
                    tracing::warn!(
                        question_id = %question.id,
                        skill_id = %skill_id,
                        "question references unknown skill, ignoring the tag"
                    );
                    continue;
                }
                questions_by_skill
                    .entry(skill_id.clone())
                    .or_default()
                    .push(question.id.clone());
            }
            question_map.insert(question.id.clone(), question);
        }

        Ok(Self {
            skills: skill_map,
            skill_order,
            questions: question_map,
            questions_by_skill,
        })
    }
}

impl CatalogStore for SkillCatalog {
    fn skill(&self, skill_id: &str) -> Result<Option<Skill>, EngineError> {
        Ok(self.skills.get(skill_id).cloned())
    }

    fn all_skills(&self) -> Result<Vec<Skill>, EngineError> {
        Ok(self
            .skill_order
            .iter()
            .filter_map(|id| self.skills.get(id).cloned())
            .collect())
    }

    fn question(&self, question_id: &str) -> Result<Option<Question>, EngineError> {
        Ok(self.questions.get(question_id).cloned())
    }

    fn questions_for_skill(&self, skill_id: &str) -> Result<Vec<Question>, EngineError> {
        Ok(self
            .questions_by_skill
            .get(skill_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.questions.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// DFS three-color check. Unknown prerequisite ids are skipped (they are
/// tolerated at runtime too), so only edges between known skills count.
fn validate_acyclic(skills: &HashMap<String, Skill>) -> Result<(), EngineError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        InProgress,
        Done,
    }

    let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(skills.len());

    for start in skills.keys() {
        if marks.contains_key(start.as_str()) {
            continue;
        }
        // Iterative DFS: (skill id, next prerequisite index).
        let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
        marks.insert(start.as_str(), Mark::InProgress);

        while let Some((id, next)) = stack.pop() {
            let skill = &skills[id];
            let mut advanced = false;
            for (offset, prereq_id) in skill.prerequisites.iter().enumerate().skip(next) {
                let Some(prereq) = skills.get_key_value(prereq_id.as_str()) else {
                    tracing::warn!(
                        skill_id = %id,
                        prerequisite = %prereq_id,
                        "unknown prerequisite, ignoring during cycle check"
                    );
                    continue;
                };
                match marks.get(prereq.0.as_str()) {
                    Some(Mark::InProgress) => {
                        return Err(EngineError::PrerequisiteCycle(prereq_id.clone()));
                    }
                    Some(Mark::Done) => continue,
                    None => {
                        stack.push((id, offset + 1));
                        stack.push((prereq.0.as_str(), 0));
                        marks.insert(prereq.0.as_str(), Mark::InProgress);
                        advanced = true;
                        break;
                    }
                }
            }
            if !advanced {
                marks.insert(id, Mark::Done);
            }
        }
    }

    Ok(())
}

/// Transitive prerequisite closure of `skill_ids`, excluding the roots
/// themselves, de-duplicated and in first-seen (preorder) order. The visited
/// set doubles as a guard against cyclic catalogs coming from store
/// implementations that skip validation.
pub fn transitive_prerequisites(
    catalog: &dyn CatalogStore,
    skill_ids: &[String],
) -> Result<Vec<Skill>, EngineError> {
    let mut visited: HashSet<String> = skill_ids.iter().cloned().collect();
    let mut ordered = Vec::new();

    for skill_id in skill_ids {
        if let Some(skill) = catalog.skill(skill_id)? {
            collect_prerequisites(catalog, &skill, &mut visited, &mut ordered)?;
        }
    }

    Ok(ordered)
}

fn collect_prerequisites(
    catalog: &dyn CatalogStore,
    skill: &Skill,
    visited: &mut HashSet<String>,
    ordered: &mut Vec<Skill>,
) -> Result<(), EngineError> {
    for prereq_id in &skill.prerequisites {
        if !visited.insert(prereq_id.clone()) {
            continue;
        }
        match catalog.skill(prereq_id)? {
            Some(prereq) => {
                ordered.push(prereq.clone());
                collect_prerequisites(catalog, &prereq, visited, ordered)?;
            }
            None => {
                tracing::warn!(
                    skill_id = %skill.id,
                    prerequisite = %prereq_id,
                    "unknown prerequisite skipped during cascade traversal"
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(id: &str, prerequisites: &[&str]) -> Skill {
        Skill {
            id: id.to_string(),
            name: id.to_string(),
            grade_level: 1,
            prerequisites: prerequisites.iter().map(|s| s.to_string()).collect(),
            forgetting_rate: 0.08,
            difficulty: 0.5,
            order: 0,
        }
    }

    fn question(id: &str, skill_ids: &[&str]) -> Question {
        Question {
            id: id.to_string(),
            skill_ids: skill_ids.iter().map(|s| s.to_string()).collect(),
            difficulty: 0.5,
            expected_time_seconds: Some(60.0),
            content: serde_json::Value::Null,
        }
    }

    #[test]
    fn rejects_cycles_at_load() {
        let skills = vec![skill("a", &["b"]), skill("b", &["c"]), skill("c", &["a"])];
        let err = SkillCatalog::new(skills, vec![]).unwrap_err();
        assert!(matches!(err, EngineError::PrerequisiteCycle(_)));
    }

    #[test]
    fn accepts_diamond_dag() {
        let skills = vec![
            skill("a", &[]),
            skill("b", &["a"]),
            skill("c", &["a"]),
            skill("d", &["b", "c"]),
        ];
        assert!(SkillCatalog::new(skills, vec![]).is_ok());
    }

    #[test]
    fn tolerates_unknown_prerequisites() {
        let skills = vec![skill("a", &["ghost"])];
        let catalog = SkillCatalog::new(skills, vec![]).unwrap();
        let closure = transitive_prerequisites(&catalog, &["a".to_string()]).unwrap();
        assert!(closure.is_empty());
    }

    #[test]
    fn closure_is_preorder_and_deduplicated() {
        let skills = vec![
            skill("a", &[]),
            skill("b", &["a"]),
            skill("c", &["a"]),
            skill("d", &["b", "c"]),
        ];
        let catalog = SkillCatalog::new(skills, vec![]).unwrap();
        let closure = transitive_prerequisites(&catalog, &["d".to_string()]).unwrap();
        let ids: Vec<&str> = closure.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn closure_excludes_roots() {
        let skills = vec![skill("a", &[]), skill("b", &["a"])];
        let catalog = SkillCatalog::new(skills, vec![]).unwrap();
        let closure =
            transitive_prerequisites(&catalog, &["b".to_string(), "a".to_string()]).unwrap();
        assert!(closure.is_empty());
    }

    #[test]
    fn questions_indexed_by_skill_membership() {
        let skills = vec![skill("a", &[]), skill("b", &[])];
        let questions = vec![
            question("q1", &["a"]),
            question("q2", &["a", "b"]),
            question("q3", &["ghost"]),
        ];
        let catalog = SkillCatalog::new(skills, questions).unwrap();
        let for_a = catalog.questions_for_skill("a").unwrap();
        assert_eq!(for_a.len(), 2);
        assert!(catalog.questions_for_skill("ghost").unwrap().is_empty());
        assert!(catalog.question("q3").unwrap().is_some());
    }

    #[test]
    fn duplicate_skill_id_is_rejected() {
        let skills = vec![skill("a", &[]), skill("a", &[])];
        assert!(matches!(
            SkillCatalog::new(skills, vec![]).unwrap_err(),
            EngineError::DuplicateId(_)
        ));
    }
}

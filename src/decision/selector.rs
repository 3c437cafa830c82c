//! Windowed question picking for one skill.

use std::cmp::Ordering;

use crate::types::Question;

/// Picks the unanswered question closest to the target difficulty,
/// preferring candidates inside `[max(0, target - window), target + window]`
/// and falling back to the closest match overall. `None` only when there are
/// no candidates at all.
pub fn pick_for_skill(
    candidates: &[Question],
    target_difficulty: f64,
    window: f64,
) -> Option<&Question> {
    let lower = (target_difficulty - window).max(0.0);
    let upper = target_difficulty + window;

    let by_distance = |a: &&Question, b: &&Question| {
        let da = (a.difficulty - target_difficulty).abs();
        let db = (b.difficulty - target_difficulty).abs();
        da.partial_cmp(&db).unwrap_or(Ordering::Equal)
    };

    let in_window = candidates
        .iter()
        .filter(|q| q.difficulty >= lower && q.difficulty <= upper)
        .min_by(by_distance);

    in_window.or_else(|| candidates.iter().min_by(by_distance))
}

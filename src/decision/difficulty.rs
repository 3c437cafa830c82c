//! Rolling-window performance analysis driving target-difficulty bias.

use crate::config::DifficultyConfig;
use crate::types::{PerformanceAnalysis, QuestionAttempt};

/// Scores the last `lookback` attempts into [-1, 1] and maps the score to a
/// discrete difficulty adjustment band. The correctness rate is divided by
/// the full lookback, so a short history reads as weak evidence rather than
/// perfect accuracy. Attempts without a known expected time are excluded
/// from the time ratio; if none carry one, the ratio is neutral.
pub fn analyze_recent_performance(
    history: &[QuestionAttempt],
    lookback: usize,
    config: &DifficultyConfig,
) -> PerformanceAnalysis {
    if history.is_empty() || lookback == 0 {
        return PerformanceAnalysis::default();
    }

    let window = &history[history.len().saturating_sub(lookback)..];

    let correct = window.iter().filter(|attempt| attempt.is_correct).count();
    let correctness_rate = correct as f64 / lookback as f64;

    let ratios: Vec<f64> = window
        .iter()
        .filter_map(|attempt| match attempt.expected_time_seconds {
            Some(expected) if expected > 0.0 => {
                Some(attempt.response_time_seconds / expected)
            }
            _ => None,
        })
        .collect();
    let avg_time_ratio = if ratios.is_empty() {
        1.0
    } else {
        ratios.iter().sum::<f64>() / ratios.len() as f64
    };

    let accuracy_component = (correctness_rate - 0.5) * 2.0;
    let capped_ratio = avg_time_ratio.min(config.max_time_ratio);
    let speed_component = (1.0 - capped_ratio / config.max_time_ratio) * 2.0 - 1.0;
    let performance_score =
        config.accuracy_weight * accuracy_component + config.speed_weight * speed_component;

    PerformanceAnalysis {
        performance_score,
        difficulty_adjustment: adjustment_for(performance_score, config),
        correctness_rate,
        avg_time_ratio,
    }
}

fn adjustment_for(score: f64, config: &DifficultyConfig) -> f64 {
    if score < config.struggling_threshold {
        -config.large_step
    } else if score < config.weak_threshold {
        -config.small_step
    } else if score > config.excelling_threshold {
        config.large_step
    } else if score > config.strong_threshold {
        config.small_step
    } else {
        0.0
    }
}

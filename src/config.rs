use serde::{Deserialize, Serialize};

/// Seconds in one elapsed-time unit for decay. The forgetting rates in
/// typical catalogs (~0.08) are tuned for day-scale forgetting; applying
/// them to raw seconds would flatten memory within a minute.
const DEFAULT_ELAPSED_TIME_UNIT_SECS: f64 = 86_400.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MasteryConfig {
    pub elapsed_time_unit_secs: f64,
    pub min_strength: f64,
    pub max_strength: f64,
}

impl Default for MasteryConfig {
    fn default() -> Self {
        Self {
            elapsed_time_unit_secs: DEFAULT_ELAPSED_TIME_UNIT_SECS,
            min_strength: -2.0,
            max_strength: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateConfig {
    /// Diminishing-returns factor: correct increment is 1/(1 + damping * correct_count).
    pub correct_increment_damping: f64,
    pub slow_response_threshold_secs: f64,
    /// Multiplier applied to the increment when the response was slow.
    pub slow_response_penalty: f64,
    pub incorrect_penalty: f64,
    /// Smaller penalty pushed into transitive prerequisites on a miss.
    pub cascade_penalty: f64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            correct_increment_damping: 0.1,
            slow_response_threshold_secs: 180.0,
            slow_response_penalty: 0.5,
            incorrect_penalty: 0.2,
            cascade_penalty: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColdStartConfig {
    /// Skills below the declared grade are assumed mastered.
    pub assumed_mastered_strength: f64,
    /// Skills at the declared grade are ready to learn.
    pub ready_strength: f64,
    /// Skills above the declared grade start below the natural floor of
    /// practiced strength so their predicted probability stays low.
    pub locked_strength: f64,
    /// Total attempts during which recommendations auto-apply the
    /// student's grade as a filter.
    pub window_attempts: u64,
}

impl Default for ColdStartConfig {
    fn default() -> Self {
        Self {
            assumed_mastered_strength: 0.9,
            ready_strength: 0.0,
            locked_strength: -1.0,
            window_attempts: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecommendationConfig {
    pub default_threshold: f64,
    /// Half-width of the grade band when a grade filter applies.
    pub grade_span: u8,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            default_threshold: 0.7,
            grade_span: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DifficultyConfig {
    pub default_lookback: usize,
    pub accuracy_weight: f64,
    pub speed_weight: f64,
    /// Time ratios are capped here before normalization.
    pub max_time_ratio: f64,
    pub struggling_threshold: f64,
    pub weak_threshold: f64,
    pub strong_threshold: f64,
    pub excelling_threshold: f64,
    pub small_step: f64,
    pub large_step: f64,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            default_lookback: 5,
            accuracy_weight: 0.6,
            speed_weight: 0.4,
            max_time_ratio: 2.0,
            struggling_threshold: -0.3,
            weak_threshold: -0.1,
            strong_threshold: 0.1,
            excelling_threshold: 0.3,
            small_step: 0.15,
            large_step: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectorConfig {
    /// Half-width of the difficulty window around the target.
    pub difficulty_window: f64,
    /// Grade band used by flexible mode around the student's grade.
    pub flexible_grade_span: u8,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            difficulty_window: 0.2,
            flexible_grade_span: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub mastery: MasteryConfig,
    pub update: UpdateConfig,
    pub cold_start: ColdStartConfig,
    pub recommendation: RecommendationConfig,
    pub difficulty: DifficultyConfig,
    pub selector: SelectorConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.mastery.elapsed_time_unit_secs <= 0.0 {
            return Err("mastery.elapsedTimeUnitSecs must be positive".to_string());
        }
        if self.mastery.min_strength >= self.mastery.max_strength {
            return Err("mastery.minStrength must be below maxStrength".to_string());
        }
        if self.update.correct_increment_damping < 0.0 {
            return Err("update.correctIncrementDamping must be non-negative".to_string());
        }
        if !(0.0..=1.0).contains(&self.update.slow_response_penalty) {
            return Err("update.slowResponsePenalty must be in [0, 1]".to_string());
        }
        if self.update.incorrect_penalty < 0.0 || self.update.cascade_penalty < 0.0 {
            return Err("update penalties must be non-negative".to_string());
        }
        if !(0.0..=1.0).contains(&self.recommendation.default_threshold) {
            return Err("recommendation.defaultThreshold must be in [0, 1]".to_string());
        }
        if self.difficulty.max_time_ratio <= 0.0 {
            return Err("difficulty.maxTimeRatio must be positive".to_string());
        }
        if self.difficulty.struggling_threshold > self.difficulty.weak_threshold
            || self.difficulty.weak_threshold > self.difficulty.strong_threshold
            || self.difficulty.strong_threshold > self.difficulty.excelling_threshold
        {
            return Err("difficulty thresholds must be ordered".to_string());
        }
        if self.difficulty.small_step < 0.0 || self.difficulty.large_step < self.difficulty.small_step {
            return Err("difficulty steps must satisfy 0 <= smallStep <= largeStep".to_string());
        }
        if self.selector.difficulty_window <= 0.0 {
            return Err("selector.difficultyWindow must be positive".to_string());
        }
        Ok(())
    }
}

// src/config.rs
// Tunable parameters for the scheduler and the grading heuristic.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What happens to a card once its lapse count reaches the leech threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeechAction {
    /// Move the card to the terminal `Suspended` state.
    Suspend,
    /// Only record the leech in the audit trail.
    Tag,
}

/// Response-time thresholds, in seconds, used by [`crate::grading::suggest_grade_from_time`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GradingThresholds {
    pub fast_threshold: f64,
    pub normal_threshold: f64,
    pub slow_threshold: f64,
    /// Upper bound of a meaningful answer; the session timeout used by the quiz front end.
    pub very_slow_threshold: f64,
}

impl Default for GradingThresholds {
    fn default() -> Self {
        Self {
            fast_threshold: 10.0,
            normal_threshold: 20.0,
            slow_threshold: 40.0,
            very_slow_threshold: 120.0,
        }
    }
}

/// The raw, unvalidated parameter set. Deserialized from JSON with camelCase keys;
/// any key left out keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerParams {
    /// Learning steps for new cards, in minutes.
    pub learning_steps: Vec<f64>,
    /// Relearning steps for lapsed review cards, in minutes.
    pub relearning_steps: Vec<f64>,

    /// Days, when graduating from the last learning step.
    pub graduating_interval: f64,
    /// Days, when graduating early with Easy.
    pub easy_interval: f64,
    /// Upper bound on any review interval, in days.
    pub max_interval: f64,

    pub hard_interval_multiplier: f64,
    pub easy_bonus: f64,
    pub interval_modifier: f64,

    pub starting_ease_factor: f64,
    pub min_ease_factor: f64,
    pub max_ease_factor: f64,

    // Ease adjustments are additive; penalties are negative.
    pub again_penalty: f64,
    pub hard_penalty: f64,
    pub easy_bonus_ease: f64,

    pub daily_new_cards: usize,
    pub daily_review_cards: usize,

    pub leech_threshold: u32,
    pub leech_action: LeechAction,

    pub grading: GradingThresholds,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            learning_steps: vec![1.0, 10.0],
            relearning_steps: vec![10.0],
            graduating_interval: 1.0,
            easy_interval: 4.0,
            max_interval: 36500.0,
            hard_interval_multiplier: 1.2,
            easy_bonus: 1.3,
            interval_modifier: 1.0,
            starting_ease_factor: 2.5,
            min_ease_factor: 1.3,
            max_ease_factor: 2.5,
            again_penalty: -0.20,
            hard_penalty: -0.15,
            easy_bonus_ease: 0.15,
            daily_new_cards: 20,
            daily_review_cards: 200,
            leech_threshold: 8,
            leech_action: LeechAction::Suspend,
            grading: GradingThresholds::default(),
        }
    }
}

/// A validated, immutable scheduler configuration.
///
/// The only way to obtain one is through [`SchedulerConfig::new`] (or the helpers built on it),
/// so a scheduler can never run with inconsistent parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    params: SchedulerParams,
}

impl SchedulerConfig {
    pub fn new(params: SchedulerParams) -> Result<Self, ConfigError> {
        validate(&params)?;
        Ok(Self { params })
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let params: SchedulerParams = serde_json::from_str(json)?;
        Self::new(params)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        log::info!("Loaded scheduler configuration from {:?}", path);
        Ok(config)
    }

    pub fn params(&self) -> &SchedulerParams {
        &self.params
    }

    pub fn grading(&self) -> &GradingThresholds {
        &self.params.grading
    }

    /// Clamps an ease factor into the configured bounds.
    pub fn clamp_ease(&self, ease: f64) -> f64 {
        ease.clamp(self.params.min_ease_factor, self.params.max_ease_factor)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            params: SchedulerParams::default(),
        }
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

fn check_positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{} must be a positive number, got {}", name, value)))
    }
}

fn check_steps(name: &str, steps: &[f64]) -> Result<(), ConfigError> {
    if steps.is_empty() {
        return Err(invalid(format!("{} must not be empty", name)));
    }
    for (i, &step) in steps.iter().enumerate() {
        check_positive(&format!("{}[{}]", name, i), step)?;
    }
    Ok(())
}

fn validate(p: &SchedulerParams) -> Result<(), ConfigError> {
    check_steps("learningSteps", &p.learning_steps)?;
    check_steps("relearningSteps", &p.relearning_steps)?;

    check_positive("graduatingInterval", p.graduating_interval)?;
    check_positive("easyInterval", p.easy_interval)?;
    check_positive("maxInterval", p.max_interval)?;
    if p.max_interval < 1.0 {
        return Err(invalid(format!("maxInterval must be at least 1 day, got {}", p.max_interval)));
    }
    for (name, value) in [
        ("graduatingInterval", p.graduating_interval),
        ("easyInterval", p.easy_interval),
    ] {
        if value > p.max_interval {
            return Err(invalid(format!(
                "{} ({}) exceeds maxInterval ({})",
                name, value, p.max_interval
            )));
        }
    }
    check_positive("hardIntervalMultiplier", p.hard_interval_multiplier)?;
    check_positive("easyBonus", p.easy_bonus)?;
    check_positive("intervalModifier", p.interval_modifier)?;

    check_positive("minEaseFactor", p.min_ease_factor)?;
    check_positive("maxEaseFactor", p.max_ease_factor)?;
    if p.min_ease_factor > p.max_ease_factor {
        return Err(invalid(format!(
            "minEaseFactor ({}) is greater than maxEaseFactor ({})",
            p.min_ease_factor, p.max_ease_factor
        )));
    }
    if !(p.min_ease_factor..=p.max_ease_factor).contains(&p.starting_ease_factor) {
        return Err(invalid(format!(
            "startingEaseFactor ({}) lies outside [{}, {}]",
            p.starting_ease_factor, p.min_ease_factor, p.max_ease_factor
        )));
    }

    if !p.again_penalty.is_finite() || p.again_penalty > 0.0 {
        return Err(invalid("againPenalty must be zero or negative"));
    }
    if !p.hard_penalty.is_finite() || p.hard_penalty > 0.0 {
        return Err(invalid("hardPenalty must be zero or negative"));
    }
    if !p.easy_bonus_ease.is_finite() || p.easy_bonus_ease < 0.0 {
        return Err(invalid("easyBonusEase must be zero or positive"));
    }

    if p.leech_threshold == 0 {
        return Err(invalid("leechThreshold must be at least 1"));
    }

    let g = &p.grading;
    check_positive("grading.fastThreshold", g.fast_threshold)?;
    let ordered = g.fast_threshold < g.normal_threshold
        && g.normal_threshold < g.slow_threshold
        && g.slow_threshold < g.very_slow_threshold;
    if !ordered {
        return Err(invalid(format!(
            "grading thresholds must be strictly increasing, got {} / {} / {} / {}",
            g.fast_threshold, g.normal_threshold, g.slow_threshold, g.very_slow_threshold
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SchedulerConfig::new(SchedulerParams::default()).unwrap();
        assert_eq!(config, SchedulerConfig::default());
        assert_eq!(config.params().learning_steps, vec![1.0, 10.0]);
        assert_eq!(config.params().leech_threshold, 8);
        assert_eq!(config.params().leech_action, LeechAction::Suspend);
    }

    #[test]
    fn test_min_ease_above_max_is_rejected() {
        let params = SchedulerParams {
            min_ease_factor: 3.0,
            max_ease_factor: 2.0,
            starting_ease_factor: 2.5,
            ..SchedulerParams::default()
        };
        assert!(matches!(SchedulerConfig::new(params), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_empty_or_non_positive_steps_are_rejected() {
        let empty = SchedulerParams {
            learning_steps: vec![],
            ..SchedulerParams::default()
        };
        assert!(matches!(SchedulerConfig::new(empty), Err(ConfigError::Invalid(_))));

        let zero = SchedulerParams {
            relearning_steps: vec![10.0, 0.0],
            ..SchedulerParams::default()
        };
        assert!(matches!(SchedulerConfig::new(zero), Err(ConfigError::Invalid(_))));

        let negative = SchedulerParams {
            learning_steps: vec![-1.0],
            ..SchedulerParams::default()
        };
        assert!(matches!(SchedulerConfig::new(negative), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_non_monotonic_grading_thresholds_are_rejected() {
        let params = SchedulerParams {
            grading: GradingThresholds {
                fast_threshold: 20.0,
                normal_threshold: 10.0,
                ..GradingThresholds::default()
            },
            ..SchedulerParams::default()
        };
        assert!(matches!(SchedulerConfig::new(params), Err(ConfigError::Invalid(_))));

        let equal = SchedulerParams {
            grading: GradingThresholds {
                slow_threshold: 20.0,
                ..GradingThresholds::default()
            },
            ..SchedulerParams::default()
        };
        assert!(matches!(SchedulerConfig::new(equal), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_intervals_beyond_max_interval_are_rejected() {
        let huge_easy = SchedulerParams {
            easy_interval: 1e9,
            ..SchedulerParams::default()
        };
        assert!(matches!(SchedulerConfig::new(huge_easy), Err(ConfigError::Invalid(_))));

        let huge_graduating = SchedulerParams {
            graduating_interval: 40_000.0,
            ..SchedulerParams::default()
        };
        assert!(matches!(SchedulerConfig::new(huge_graduating), Err(ConfigError::Invalid(_))));

        let tiny_cap = SchedulerParams {
            max_interval: 0.5,
            graduating_interval: 0.5,
            easy_interval: 0.5,
            ..SchedulerParams::default()
        };
        assert!(matches!(SchedulerConfig::new(tiny_cap), Err(ConfigError::Invalid(_))));

        let raised_cap = SchedulerParams {
            easy_interval: 50_000.0,
            max_interval: 100_000.0,
            ..SchedulerParams::default()
        };
        assert!(SchedulerConfig::new(raised_cap).is_ok());
    }

    #[test]
    fn test_positive_penalty_is_rejected() {
        let params = SchedulerParams {
            again_penalty: 0.2,
            ..SchedulerParams::default()
        };
        assert!(SchedulerConfig::new(params).is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SchedulerConfig::from_json_str(
            r#"{ "learningSteps": [1, 5, 15], "leechAction": "tag", "grading": { "fastThreshold": 5 } }"#,
        )
        .unwrap();
        let p = config.params();
        assert_eq!(p.learning_steps, vec![1.0, 5.0, 15.0]);
        assert_eq!(p.leech_action, LeechAction::Tag);
        assert_eq!(p.grading.fast_threshold, 5.0);
        assert_eq!(p.grading.normal_threshold, 20.0);
        assert_eq!(p.easy_interval, 4.0);
    }

    #[test]
    fn test_invalid_json_values_fail_validation() {
        let err = SchedulerConfig::from_json_str(r#"{ "relearningSteps": [] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SchedulerConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sched.json");
        fs::write(&path, r#"{ "easyInterval": 3, "maxEaseFactor": 3.0 }"#).unwrap();
        let config = SchedulerConfig::from_json_file(&path).unwrap();
        assert_eq!(config.params().easy_interval, 3.0);
        assert_eq!(config.clamp_ease(3.5), 3.0);
        assert_eq!(config.clamp_ease(1.0), 1.3);

        let missing = SchedulerConfig::from_json_file(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}

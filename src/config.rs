//! Engine configuration.
//!
//! The backtracking budget, quality weights, grade bands and validation
//! thresholds are tunable rather than fixed. Every field has a default so
//! a partial JSON document is a valid configuration.
//!
//! ```
//! use u_timetable::config::EngineConfig;
//!
//! let config: EngineConfig = serde_json::from_str(r#"{"backtrackFactor": 10}"#).unwrap();
//! assert_eq!(config.backtrack_factor, 10);
//! assert_eq!(config.quality.weights, Default::default());
//! ```

use serde::{Deserialize, Serialize};

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Undo steps allowed per demand unit.
    pub backtrack_factor: usize,
    /// Lower bound on the undo budget for tiny inputs.
    pub min_backtrack_budget: usize,
    /// Validation thresholds.
    pub validation: ValidationThresholds,
    /// Quality scoring parameters.
    pub quality: QualityConfig,
}

/// Thresholds for non-fatal validation warnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationThresholds {
    /// Warn when predicted max/min teacher load exceeds this ratio.
    pub uneven_load_ratio: f64,
    /// Warn when a subject's demand uses at least this share of its
    /// teacher pool's capacity.
    pub high_demand_share: f64,
}

/// Quality scoring parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QualityConfig {
    /// Metric weights for the overall score.
    pub weights: QualityWeights,
    /// Grade thresholds.
    pub bands: GradeBands,
}

/// Relative weights of the four metrics in the overall score.
///
/// Weights are normalised by their sum, so they need not add up to 100.
/// The free-period metric enters as utilisation (`100 - freePeriods`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QualityWeights {
    /// Weight of teacher workload balance.
    pub teacher_workload_balance: f64,
    /// Weight of subject distribution.
    pub subject_distribution: f64,
    /// Weight of constraint satisfaction.
    pub constraint_satisfaction: f64,
    /// Weight of grid utilisation.
    pub utilisation: f64,
}

/// Minimum overall score for each grade; anything lower is "D".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeBands {
    /// Grade "A" threshold.
    pub a: f64,
    /// Grade "B" threshold.
    pub b: f64,
    /// Grade "C" threshold.
    pub c: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backtrack_factor: 64,
            min_backtrack_budget: 1_000,
            validation: ValidationThresholds::default(),
            quality: QualityConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Undo budget for a run with `units` demand units.
    pub fn backtrack_budget(&self, units: usize) -> usize {
        self.backtrack_factor
            .saturating_mul(units)
            .max(self.min_backtrack_budget)
    }
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            uneven_load_ratio: 2.0,
            high_demand_share: 0.9,
        }
    }
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            teacher_workload_balance: 30.0,
            subject_distribution: 25.0,
            constraint_satisfaction: 30.0,
            utilisation: 15.0,
        }
    }
}

impl QualityWeights {
    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        self.teacher_workload_balance
            + self.subject_distribution
            + self.constraint_satisfaction
            + self.utilisation
    }
}

impl Default for GradeBands {
    fn default() -> Self {
        Self {
            a: 90.0,
            b: 75.0,
            c: 60.0,
        }
    }
}

impl GradeBands {
    /// Maps an overall score to a letter grade.
    pub fn grade(&self, score: f64) -> &'static str {
        if score >= self.a {
            "A"
        } else if score >= self.b {
            "B"
        } else if score >= self.c {
            "C"
        } else {
            "D"
        }
    }
}

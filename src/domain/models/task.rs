//! Task domain model.
//!
//! A task describes the ML problem being solved: evaluation metric,
//! optimization direction, and where the dataset lives. It is created once
//! at pipeline start and read-only thereafter.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Direction in which the evaluation metric improves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricDirection {
    /// Lower scores are better (RMSE, MAE, log loss).
    #[default]
    Minimize,
    /// Higher scores are better (accuracy, AUC, F1).
    Maximize,
}

impl MetricDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimize => "minimize",
            Self::Maximize => "maximize",
        }
    }

    /// Whether `candidate` strictly improves on `incumbent`.
    pub fn improves(&self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::Minimize => candidate < incumbent,
            Self::Maximize => candidate > incumbent,
        }
    }

    /// Ordering of `a` relative to `b`, best-first.
    ///
    /// NaN scores sort last so a malformed score can never win selection.
    pub fn compare(&self, a: f64, b: f64) -> std::cmp::Ordering {
        // NaN is classified before the direction swap; swapping first
        // would invert "last" into "first" for one direction.
        match (a.is_nan(), b.is_nan()) {
            (true, true) => return std::cmp::Ordering::Equal,
            (true, false) => return std::cmp::Ordering::Greater,
            (false, true) => return std::cmp::Ordering::Less,
            (false, false) => {}
        }
        let (a, b) = match self {
            Self::Minimize => (a, b),
            Self::Maximize => (b, a),
        };
        a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
    }
}

/// Immutable description of the problem being solved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Task name, matches the dataset folder name.
    pub name: String,
    /// Free-text description handed to the synthesis oracle.
    pub description: String,
    /// Evaluation metric name (e.g. "rmse", "accuracy").
    pub metric: String,
    /// Whether the metric is minimized or maximized.
    pub direction: MetricDirection,
    /// Directory containing the task's input data (read-only, shared).
    pub dataset_dir: PathBuf,
}

impl TaskSpec {
    /// Create a task spec. Description defaults to the name until loaded.
    pub fn new(name: impl Into<String>, metric: impl Into<String>, direction: MetricDirection) -> Self {
        let name = name.into();
        Self {
            description: name.clone(),
            name,
            metric: metric.into(),
            direction,
            dataset_dir: PathBuf::new(),
        }
    }

    /// Set the task description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the dataset directory.
    pub fn with_dataset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dataset_dir = dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn test_improves_respects_direction() {
        assert!(MetricDirection::Minimize.improves(0.18, 0.25));
        assert!(!MetricDirection::Minimize.improves(0.25, 0.18));
        assert!(MetricDirection::Maximize.improves(0.92, 0.88));
        assert!(!MetricDirection::Maximize.improves(0.88, 0.92));
    }

    #[test]
    fn test_equal_scores_do_not_improve() {
        assert!(!MetricDirection::Minimize.improves(0.2, 0.2));
        assert!(!MetricDirection::Maximize.improves(0.2, 0.2));
    }

    #[test]
    fn test_compare_orders_best_first() {
        assert_eq!(MetricDirection::Minimize.compare(0.1, 0.2), Ordering::Less);
        assert_eq!(MetricDirection::Maximize.compare(0.1, 0.2), Ordering::Greater);
    }

    #[test]
    fn test_compare_sorts_nan_last() {
        for direction in [MetricDirection::Minimize, MetricDirection::Maximize] {
            assert_eq!(direction.compare(f64::NAN, 0.5), Ordering::Greater);
            assert_eq!(direction.compare(0.5, f64::NAN), Ordering::Less);
            assert_eq!(direction.compare(f64::NAN, f64::NAN), Ordering::Equal);
        }
    }
}

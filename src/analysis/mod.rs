pub mod action_classifier;
pub mod comparison_point;
pub mod delta_analyzer;
pub mod dynamics_classifier;
pub mod metrics;
pub mod sector_analyzer;

use serde::{Deserialize, Serialize};

pub use action_classifier::{
    ActionClassifier, ActionSequenceAnalysis, ActionThresholds, ActionTransition, DriverAction,
    classify_action,
};
pub use comparison_point::{ComparisonPoint, DriverPoint, build_comparison_points};
pub use delta_analyzer::{DeltaAnalyzer, LapDelta, ZeroCrossing};
pub use dynamics_classifier::{
    DynamicsClassifier, DynamicsThresholds, HandlingAnalysis, HandlingBalance, VehicleDynamics,
    classify_dynamics,
};
pub use metrics::{ComparisonMetrics, CorneringThresholds};
pub use sector_analyzer::{SectorAnalyzer, SectorRecord};

/// Which side of a comparison a metric refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverSlot {
    Driver1,
    Driver2,
}

impl DriverSlot {
    /// `Driver1` when `driver1_wins` holds, `Driver2` otherwise.
    pub fn pick(driver1_wins: bool) -> Self {
        if driver1_wins {
            DriverSlot::Driver1
        } else {
            DriverSlot::Driver2
        }
    }
}

/// `count` out of `total` in percent, 0 for an empty population.
pub(crate) fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.
    } else {
        count as f64 / total as f64 * 100.
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population variance.
pub(crate) fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.;
    }
    let avg = mean(values);
    values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Largest value, 0 for an empty slice.
pub(crate) fn max_or_zero(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().reduce(f64::max).unwrap_or(0.)
}

/// Smallest value, 0 for an empty slice.
pub(crate) fn min_or_zero(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().reduce(f64::min).unwrap_or(0.)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_helpers() {
        let values = [2., 4., 4., 4., 5., 5., 7., 9.];
        assert_eq!(mean(&values), 5.);
        assert_eq!(variance(&values), 4.);
        assert_eq!(std_dev(&values), 2.);
        assert_eq!(max_or_zero(values), 9.);
        assert_eq!(min_or_zero(values), 2.);
        assert_eq!(mean(&[]), 0.);
        assert_eq!(max_or_zero(Vec::new()), 0.);
        assert_eq!(percentage(1, 4), 25.);
        assert_eq!(percentage(0, 0), 0.);
    }
}

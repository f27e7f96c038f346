use serde::{Deserialize, Serialize};

use crate::alignment::{AlignedDataset, AlignedDriver, Channel};

use super::{DriverSlot, LapDelta, max_or_zero, mean, min_or_zero, percentage};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorneringThresholds {
    /// A point is in a corner below this fraction of the driver's mean speed
    pub corner_speed_factor: f64,
    /// Brake pressure above which braking counts as heavy, in percent
    pub heavy_brake_pct: f64,
    /// Fraction of the joint mean speed under which an exit can start
    pub exit_speed_factor: f64,
}

impl Default for CorneringThresholds {
    fn default() -> Self {
        Self {
            corner_speed_factor: 0.8,
            heavy_brake_pct: 50.,
            exit_speed_factor: 0.7,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdvantageZones {
    pub driver1_advantage_percentage: f64,
    pub driver2_advantage_percentage: f64,
    pub biggest_driver1_advantage: f64,
    pub biggest_driver2_advantage: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeedComparison {
    pub max_speed_advantage_driver1: f64,
    pub max_speed_advantage_driver2: f64,
    pub avg_speed_difference: f64,
    pub speed_advantage_distance: AdvantageZones,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThrottleComparison {
    pub avg_throttle_difference: f64,
    pub more_aggressive_driver: DriverSlot,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrakeComparison {
    pub avg_brake_difference: f64,
    /// Driver with the lower mean brake pressure
    pub later_braker: DriverSlot,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeedSummary {
    pub faster_max_speed: DriverSlot,
    pub faster_avg_speed: DriverSlot,
    pub max_speed_gap: f64,
    pub avg_speed_gap: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrivingStyle {
    pub more_aggressive_throttle: DriverSlot,
    pub throttle_aggression_gap: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub speed_analysis: SpeedSummary,
    pub driving_style: DrivingStyle,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorneringZones {
    pub driver1_corner_percentage: f64,
    pub driver2_corner_percentage: f64,
    pub avg_corner_speed_driver1: f64,
    pub avg_corner_speed_driver2: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrakingAnalysis {
    pub heavy_braking_percentage_driver1: f64,
    pub heavy_braking_percentage_driver2: f64,
    pub avg_braking_speed_driver1: f64,
    pub avg_braking_speed_driver2: f64,
    /// Driver carrying more speed into heavy braking
    pub later_braker: DriverSlot,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CornerExitAnalysis {
    pub avg_exit_throttle_driver1: f64,
    pub avg_exit_throttle_driver2: f64,
    pub more_aggressive_exit: DriverSlot,
    pub exit_zones_driver1: usize,
    pub exit_zones_driver2: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorneringAnalysis {
    pub cornering_zones: CorneringZones,
    pub braking_analysis: BrakingAnalysis,
    pub acceleration_analysis: CornerExitAnalysis,
}

/// Whole-lap comparison of the aligned channels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMetrics {
    pub speed_comparison: SpeedComparison,
    pub time_comparison: LapDelta,
    pub throttle_comparison: ThrottleComparison,
    pub brake_comparison: BrakeComparison,
    pub performance_summary: PerformanceSummary,
    pub cornering_analysis: CorneringAnalysis,
}

impl ComparisonMetrics {
    pub fn compute(
        dataset: &AlignedDataset,
        time_comparison: LapDelta,
        cornering: &CorneringThresholds,
    ) -> Self {
        let speed1 = channel(&dataset.driver1, Channel::Speed);
        let speed2 = channel(&dataset.driver2, Channel::Speed);
        let throttle1 = channel(&dataset.driver1, Channel::Throttle);
        let throttle2 = channel(&dataset.driver2, Channel::Throttle);
        let brake1 = channel(&dataset.driver1, Channel::Brake);
        let brake2 = channel(&dataset.driver2, Channel::Brake);

        let throttle_mean1 = mean(throttle1);
        let throttle_mean2 = mean(throttle2);
        let brake_mean1 = mean(brake1);
        let brake_mean2 = mean(brake2);

        Self {
            speed_comparison: speed_comparison(speed1, speed2),
            time_comparison,
            throttle_comparison: ThrottleComparison {
                avg_throttle_difference: mean(&differences(throttle1, throttle2)),
                more_aggressive_driver: DriverSlot::pick(throttle_mean1 > throttle_mean2),
            },
            brake_comparison: BrakeComparison {
                avg_brake_difference: mean(&differences(brake1, brake2)),
                later_braker: DriverSlot::pick(brake_mean1 < brake_mean2),
            },
            performance_summary: performance_summary(speed1, speed2, throttle1, throttle2),
            cornering_analysis: CorneringAnalysis {
                cornering_zones: cornering_zones(speed1, speed2, cornering),
                braking_analysis: braking_analysis(brake1, brake2, speed1, speed2, cornering),
                acceleration_analysis: corner_exit(throttle1, throttle2, speed1, speed2, cornering),
            },
        }
    }
}

fn channel(driver: &AlignedDriver, channel: Channel) -> &[f64] {
    driver.channel(channel).unwrap_or_default()
}

fn differences(values1: &[f64], values2: &[f64]) -> Vec<f64> {
    values1.iter().zip(values2).map(|(a, b)| a - b).collect()
}

fn speed_comparison(speed1: &[f64], speed2: &[f64]) -> SpeedComparison {
    let diff = differences(speed1, speed2);
    let max_diff = max_or_zero(diff.iter().copied());
    let min_diff = min_or_zero(diff.iter().copied());
    SpeedComparison {
        max_speed_advantage_driver1: max_diff,
        max_speed_advantage_driver2: min_diff,
        avg_speed_difference: mean(&diff),
        speed_advantage_distance: AdvantageZones {
            driver1_advantage_percentage: percentage(
                diff.iter().filter(|d| **d > 0.).count(),
                diff.len(),
            ),
            driver2_advantage_percentage: percentage(
                diff.iter().filter(|d| **d < 0.).count(),
                diff.len(),
            ),
            biggest_driver1_advantage: max_diff,
            biggest_driver2_advantage: min_diff.abs(),
        },
    }
}

fn performance_summary(
    speed1: &[f64],
    speed2: &[f64],
    throttle1: &[f64],
    throttle2: &[f64],
) -> PerformanceSummary {
    let max1 = max_or_zero(speed1.iter().copied());
    let max2 = max_or_zero(speed2.iter().copied());
    let avg1 = mean(speed1);
    let avg2 = mean(speed2);

    let aggression = |throttle: &[f64]| {
        mean(&throttle.iter().map(|t| t.max(0.)).collect::<Vec<_>>())
    };
    let aggression1 = aggression(throttle1);
    let aggression2 = aggression(throttle2);

    PerformanceSummary {
        speed_analysis: SpeedSummary {
            faster_max_speed: DriverSlot::pick(max1 > max2),
            faster_avg_speed: DriverSlot::pick(avg1 > avg2),
            max_speed_gap: (max1 - max2).abs(),
            avg_speed_gap: (avg1 - avg2).abs(),
        },
        driving_style: DrivingStyle {
            more_aggressive_throttle: DriverSlot::pick(aggression1 > aggression2),
            throttle_aggression_gap: (aggression1 - aggression2).abs(),
        },
    }
}

fn cornering_zones(speed1: &[f64], speed2: &[f64], thresholds: &CorneringThresholds) -> CorneringZones {
    let corner_speeds = |speed: &[f64]| {
        let threshold = mean(speed) * thresholds.corner_speed_factor;
        speed.iter().copied().filter(|s| *s < threshold).collect::<Vec<_>>()
    };
    let corners1 = corner_speeds(speed1);
    let corners2 = corner_speeds(speed2);

    CorneringZones {
        driver1_corner_percentage: percentage(corners1.len(), speed1.len()),
        driver2_corner_percentage: percentage(corners2.len(), speed2.len()),
        avg_corner_speed_driver1: mean(&corners1),
        avg_corner_speed_driver2: mean(&corners2),
    }
}

fn braking_analysis(
    brake1: &[f64],
    brake2: &[f64],
    speed1: &[f64],
    speed2: &[f64],
    thresholds: &CorneringThresholds,
) -> BrakingAnalysis {
    let braking_speeds = |brake: &[f64], speed: &[f64]| {
        brake
            .iter()
            .zip(speed)
            .filter(|(b, _)| **b > thresholds.heavy_brake_pct)
            .map(|(_, s)| *s)
            .collect::<Vec<_>>()
    };
    let heavy1 = braking_speeds(brake1, speed1);
    let heavy2 = braking_speeds(brake2, speed2);
    let avg1 = mean(&heavy1);
    let avg2 = mean(&heavy2);

    BrakingAnalysis {
        heavy_braking_percentage_driver1: percentage(
            brake1.iter().filter(|b| **b > thresholds.heavy_brake_pct).count(),
            brake1.len(),
        ),
        heavy_braking_percentage_driver2: percentage(
            brake2.iter().filter(|b| **b > thresholds.heavy_brake_pct).count(),
            brake2.len(),
        ),
        avg_braking_speed_driver1: avg1,
        avg_braking_speed_driver2: avg2,
        later_braker: DriverSlot::pick(avg1 > avg2),
    }
}

/// Indices where speed climbs out of a slow zone.
fn exit_indices(speed: &[f64], threshold: f64) -> Vec<usize> {
    speed
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[0] < threshold && pair[1] > pair[0])
        .map(|(idx, _)| idx + 1)
        .collect()
}

fn corner_exit(
    throttle1: &[f64],
    throttle2: &[f64],
    speed1: &[f64],
    speed2: &[f64],
    thresholds: &CorneringThresholds,
) -> CornerExitAnalysis {
    let threshold = (mean(speed1) + mean(speed2)) / 2. * thresholds.exit_speed_factor;
    let exits1 = exit_indices(speed1, threshold);
    let exits2 = exit_indices(speed2, threshold);
    let exit_throttle = |exits: &[usize], throttle: &[f64]| {
        mean(&exits.iter().filter_map(|idx| throttle.get(*idx).copied()).collect::<Vec<_>>())
    };
    let avg1 = exit_throttle(&exits1, throttle1);
    let avg2 = exit_throttle(&exits2, throttle2);

    CornerExitAnalysis {
        avg_exit_throttle_driver1: avg1,
        avg_exit_throttle_driver2: avg2,
        more_aggressive_exit: DriverSlot::pick(avg1 > avg2),
        exit_zones_driver1: exits1.len(),
        exit_zones_driver2: exits2.len(),
    }
}

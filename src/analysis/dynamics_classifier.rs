use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::alignment::{AlignedDriver, Channel};

use super::percentage;

/// Coarse handling state. This is a threshold heuristic, not a vehicle model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleDynamics {
    Neutral,
    Oversteer,
    Understeer,
    Correction,
}

impl VehicleDynamics {
    pub const ALL: [VehicleDynamics; 4] = [
        VehicleDynamics::Neutral,
        VehicleDynamics::Oversteer,
        VehicleDynamics::Understeer,
        VehicleDynamics::Correction,
    ];
}

impl std::fmt::Display for VehicleDynamics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VehicleDynamics::Neutral => write!(f, "Neutral"),
            VehicleDynamics::Oversteer => write!(f, "Oversteer"),
            VehicleDynamics::Understeer => write!(f, "Understeer"),
            VehicleDynamics::Correction => write!(f, "Correction"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicsThresholds {
    /// Band around the expected lateral acceleration considered neutral, in g
    pub neutral_g: f64,
    /// Lateral error above which an event is flagged as severe, in g
    pub severe_g: f64,
    /// Steering rate that marks a correction, in deg/s
    pub correction_deg_per_s: f64,
    /// Below this speed every point is neutral, in km/h
    pub min_speed_kmh: f64,
}

impl Default for DynamicsThresholds {
    fn default() -> Self {
        Self {
            neutral_g: 0.1,
            severe_g: 0.3,
            correction_deg_per_s: 10.,
            min_speed_kmh: 50.,
        }
    }
}

/// Overall tendency of a car over a lap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlingBalance {
    Neutral,
    OversteerTendency,
    UndersteerTendency,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandlingEvent {
    pub index: usize,
    pub distance: f64,
    pub speed: f64,
    pub lateral_accel: f64,
    pub severe: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandlingAnalysis {
    pub dynamics_distribution: BTreeMap<VehicleDynamics, f64>,
    pub oversteer_events: Vec<HandlingEvent>,
    pub understeer_events: Vec<HandlingEvent>,
    pub total_oversteer_events: usize,
    pub total_understeer_events: usize,
    pub handling_balance: HandlingBalance,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DynamicsClassifier {
    thresholds: DynamicsThresholds,
}

impl DynamicsClassifier {
    pub fn new(thresholds: DynamicsThresholds) -> Self {
        Self { thresholds }
    }

    /// Actual minus expected lateral acceleration, `None` where the heuristic
    /// has nothing to say (low speed, straight steering).
    fn lateral_error(&self, lateral_accel_g: f64, steering_angle_deg: f64, speed_kmh: f64) -> Option<f64> {
        if speed_kmh < self.thresholds.min_speed_kmh || steering_angle_deg == 0. {
            return None;
        }
        // unitless proxy, not calibrated against any wheelbase or steering ratio
        let expected_lateral = speed_kmh.powi(2) * steering_angle_deg.abs() / 1000.;
        Some(lateral_accel_g.abs() - expected_lateral)
    }

    pub fn classify(
        &self,
        lateral_accel_g: f64,
        steering_angle_deg: f64,
        speed_kmh: f64,
        steering_rate_deg_per_s: Option<f64>,
    ) -> VehicleDynamics {
        if steering_rate_deg_per_s
            .is_some_and(|rate| rate.abs() > self.thresholds.correction_deg_per_s)
        {
            return VehicleDynamics::Correction;
        }
        match self.lateral_error(lateral_accel_g, steering_angle_deg, speed_kmh) {
            Some(error) if error > self.thresholds.neutral_g => VehicleDynamics::Understeer,
            Some(error) if error < -self.thresholds.neutral_g => VehicleDynamics::Oversteer,
            _ => VehicleDynamics::Neutral,
        }
    }

    /// Classify every grid point of an aligned driver. Without lateral
    /// acceleration and steering channels every point is neutral.
    pub fn classify_aligned(&self, driver: &AlignedDriver, points: usize) -> Vec<VehicleDynamics> {
        let (Some(lateral), Some(steering)) = (
            driver.channel(Channel::LateralAccel),
            driver.channel(Channel::SteeringAngle),
        ) else {
            return vec![VehicleDynamics::Neutral; points];
        };
        let time = driver.channel(Channel::Time).unwrap_or_default();
        let speed = driver.channel(Channel::Speed).unwrap_or_default();

        (0..points)
            .map(|idx| {
                let steering_rate = (idx > 0)
                    .then(|| {
                        let dt = time.get(idx)? - time.get(idx - 1)?;
                        (dt > 0.).then(|| (steering[idx] - steering[idx - 1]) / dt)
                    })
                    .flatten();
                self.classify(
                    lateral[idx],
                    steering[idx],
                    speed.get(idx).copied().unwrap_or(0.),
                    steering_rate,
                )
            })
            .collect()
    }

    pub fn analyze_handling(
        &self,
        dynamics: &[VehicleDynamics],
        driver: &AlignedDriver,
        distance: &[f64],
        balance_margin_pct: f64,
    ) -> HandlingAnalysis {
        let dynamics_distribution = dynamics_distribution(dynamics);

        let mut oversteer_events = Vec::new();
        let mut understeer_events = Vec::new();
        for (idx, state) in dynamics.iter().enumerate() {
            if !matches!(state, VehicleDynamics::Oversteer | VehicleDynamics::Understeer) {
                continue;
            }
            let speed = driver.value(Channel::Speed, idx);
            let lateral_accel = driver.value(Channel::LateralAccel, idx);
            let steering = driver.value(Channel::SteeringAngle, idx);
            let severe = self
                .lateral_error(lateral_accel, steering, speed)
                .is_some_and(|error| error.abs() > self.thresholds.severe_g);
            let event = HandlingEvent {
                index: idx,
                distance: distance.get(idx).copied().unwrap_or(0.),
                speed,
                lateral_accel,
                severe,
            };
            if *state == VehicleDynamics::Oversteer {
                oversteer_events.push(event);
            } else {
                understeer_events.push(event);
            }
        }

        let balance = dynamics_distribution[&VehicleDynamics::Oversteer]
            - dynamics_distribution[&VehicleDynamics::Understeer];
        let handling_balance = if balance >= balance_margin_pct {
            HandlingBalance::OversteerTendency
        } else if balance <= -balance_margin_pct {
            HandlingBalance::UndersteerTendency
        } else {
            HandlingBalance::Neutral
        };

        HandlingAnalysis {
            dynamics_distribution,
            total_oversteer_events: oversteer_events.len(),
            total_understeer_events: understeer_events.len(),
            oversteer_events,
            understeer_events,
            handling_balance,
        }
    }
}

/// Classify with the default thresholds.
pub fn classify_dynamics(
    lateral_accel_g: f64,
    steering_angle_deg: f64,
    speed_kmh: f64,
    steering_rate_deg_per_s: Option<f64>,
) -> VehicleDynamics {
    DynamicsClassifier::default().classify(
        lateral_accel_g,
        steering_angle_deg,
        speed_kmh,
        steering_rate_deg_per_s,
    )
}

pub fn dynamics_distribution(dynamics: &[VehicleDynamics]) -> BTreeMap<VehicleDynamics, f64> {
    VehicleDynamics::ALL
        .iter()
        .map(|state| {
            let count = dynamics.iter().filter(|d| *d == state).count();
            (*state, percentage(count, dynamics.len()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correction_overrides_everything() {
        assert_eq!(
            classify_dynamics(0., 0., 10., Some(-25.)),
            VehicleDynamics::Correction
        );
        assert_eq!(
            classify_dynamics(2., 0.01, 120., Some(10.5)),
            VehicleDynamics::Correction
        );
        assert_ne!(
            classify_dynamics(0., 0., 120., Some(10.)),
            VehicleDynamics::Correction
        );
    }

    #[test]
    fn test_low_speed_is_neutral() {
        assert_eq!(classify_dynamics(1.5, 30., 49.9, None), VehicleDynamics::Neutral);
    }

    #[test]
    fn test_lateral_error_bands() {
        // expected = 100^2 * 0.01 / 1000 = 0.1g
        assert_eq!(classify_dynamics(0.15, 0.01, 100., None), VehicleDynamics::Neutral);
        assert_eq!(classify_dynamics(0.5, 0.01, 100., None), VehicleDynamics::Understeer);
        // expected = 100^2 * 0.05 / 1000 = 0.5g
        assert_eq!(classify_dynamics(0.2, -0.05, 100., None), VehicleDynamics::Oversteer);
        assert_eq!(classify_dynamics(-0.45, -0.05, 100., None), VehicleDynamics::Neutral);
    }

    #[test]
    fn test_no_steering_is_neutral() {
        assert_eq!(classify_dynamics(1.2, 0., 150., None), VehicleDynamics::Neutral);
    }

    fn driver_with(lateral: Vec<f64>, steering: Vec<f64>, speed: Vec<f64>, time: Vec<f64>) -> AlignedDriver {
        let mut driver = AlignedDriver::default();
        driver.channels.insert(Channel::LateralAccel, lateral);
        driver.channels.insert(Channel::SteeringAngle, steering);
        driver.channels.insert(Channel::Speed, speed);
        driver.channels.insert(Channel::Time, time);
        driver
    }

    #[test]
    fn test_classify_aligned_without_channels_is_neutral() {
        let dynamics = DynamicsClassifier::default().classify_aligned(&AlignedDriver::default(), 4);
        assert_eq!(dynamics, vec![VehicleDynamics::Neutral; 4]);
    }

    #[test]
    fn test_classify_aligned_uses_steering_rate() {
        let driver = driver_with(
            vec![0.5, 0.5, 0.5],
            vec![0.01, 0.01, 6.],
            vec![100., 100., 100.],
            vec![0., 0.5, 1.],
        );
        let dynamics = DynamicsClassifier::default().classify_aligned(&driver, 3);
        assert_eq!(
            dynamics,
            vec![
                VehicleDynamics::Understeer,
                VehicleDynamics::Understeer,
                VehicleDynamics::Correction,
            ]
        );
    }

    #[test]
    fn test_handling_analysis_balance_and_events() {
        let driver = driver_with(
            vec![0.9, 0.2, 0.2, 0.1],
            vec![0.01, 0.05, 0.05, 0.],
            vec![100., 100., 100., 100.],
            vec![0., 1., 2., 3.],
        );
        let classifier = DynamicsClassifier::default();
        let dynamics = classifier.classify_aligned(&driver, 4);
        let analysis = classifier.analyze_handling(&dynamics, &driver, &[0., 10., 20., 30.], 5.);

        assert_eq!(analysis.total_understeer_events, 1);
        assert_eq!(analysis.total_oversteer_events, 2);
        assert!(analysis.understeer_events[0].severe);
        assert_eq!(analysis.oversteer_events[1].distance, 20.);
        assert_eq!(analysis.dynamics_distribution[&VehicleDynamics::Oversteer], 50.);
        assert_eq!(analysis.handling_balance, HandlingBalance::OversteerTendency);
    }
}

pub mod interpolation;

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::DeltaLapError;
use crate::telemetry::DistanceTaggedSample;

pub use interpolation::LinearCurve;

/// Default spacing of the shared distance grid, in meters
pub const DEFAULT_GRID_SPACING_M: f64 = 10.;

/// Named telemetry series carried through alignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Time,
    Speed,
    Throttle,
    Brake,
    Gear,
    Rpm,
    WaterTemp,
    OilTemp,
    LateralAccel,
    SteeringAngle,
}

impl Channel {
    /// Channels always present after alignment, zero-filled when a lap lacks data.
    pub const CORE: [Channel; 8] = [
        Channel::Time,
        Channel::Speed,
        Channel::Throttle,
        Channel::Brake,
        Channel::Gear,
        Channel::Rpm,
        Channel::WaterTemp,
        Channel::OilTemp,
    ];

    /// Channels only emitted when a lap actually recorded them.
    pub const OPTIONAL: [Channel; 2] = [Channel::LateralAccel, Channel::SteeringAngle];

    /// Value of this channel for a sample. Time is relative to `lap_start`.
    fn value(&self, tagged: &DistanceTaggedSample<'_>, lap_start: f64) -> Option<f64> {
        let sample = tagged.sample;
        match self {
            Channel::Time => Some(sample.time - lap_start),
            Channel::Speed => sample.speed,
            Channel::Throttle => sample.throttle,
            Channel::Brake => sample.brake,
            Channel::Gear => sample.gear.map(f64::from),
            Channel::Rpm => sample.rpm,
            Channel::WaterTemp => sample.water_temp,
            Channel::OilTemp => sample.oil_temp,
            Channel::LateralAccel => sample.lateral_accel,
            Channel::SteeringAngle => sample.steering_angle,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Time => write!(f, "time"),
            Channel::Speed => write!(f, "speed"),
            Channel::Throttle => write!(f, "throttle"),
            Channel::Brake => write!(f, "brake"),
            Channel::Gear => write!(f, "gear"),
            Channel::Rpm => write!(f, "rpm"),
            Channel::WaterTemp => write!(f, "water_temp"),
            Channel::OilTemp => write!(f, "oil_temp"),
            Channel::LateralAccel => write!(f, "lateral_accel"),
            Channel::SteeringAngle => write!(f, "steering_angle"),
        }
    }
}

/// One driver's channels resampled onto the shared grid.
///
/// Serializes as a plain `channel -> values` map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlignedDriver {
    pub channels: BTreeMap<Channel, Vec<f64>>,
    /// Core channels that had fewer than two valid points and were zero-filled
    #[serde(skip)]
    pub degraded_channels: Vec<Channel>,
}

impl AlignedDriver {
    pub fn channel(&self, channel: Channel) -> Option<&[f64]> {
        self.channels.get(&channel).map(Vec::as_slice)
    }

    pub fn has_channel(&self, channel: Channel) -> bool {
        self.channels.contains_key(&channel)
    }

    /// Value at a grid index, 0 when the channel is absent.
    pub fn value(&self, channel: Channel, idx: usize) -> f64 {
        self.channels
            .get(&channel)
            .and_then(|values| values.get(idx))
            .copied()
            .unwrap_or(0.)
    }
}

/// Two laps resampled onto one ascending, evenly spaced distance grid.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignedDataset {
    pub distance: Vec<f64>,
    pub driver1: AlignedDriver,
    pub driver2: AlignedDriver,
}

impl AlignedDataset {
    pub fn len(&self) -> usize {
        self.distance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distance.is_empty()
    }

    /// Distance of the last grid point.
    pub fn total_distance(&self) -> f64 {
        self.distance.last().copied().unwrap_or(0.)
    }
}

/// Resamples two distance-tagged laps onto a common distance grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackAligner {
    spacing_m: f64,
}

impl Default for TrackAligner {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_SPACING_M)
    }
}

impl TrackAligner {
    pub fn new(spacing_m: f64) -> Self {
        Self { spacing_m }
    }

    pub fn spacing_m(&self) -> f64 {
        self.spacing_m
    }

    /// Grid `[0, spacing, 2 * spacing, ...]` with `floor(common / spacing)` points.
    pub fn grid(&self, common_distance: f64) -> Vec<f64> {
        let points = (common_distance / self.spacing_m).floor() as usize;
        (0..points).map(|k| k as f64 * self.spacing_m).collect()
    }

    pub fn align(
        &self,
        lap1: &[DistanceTaggedSample<'_>],
        lap2: &[DistanceTaggedSample<'_>],
    ) -> Result<AlignedDataset, DeltaLapError> {
        if !(self.spacing_m.is_finite() && self.spacing_m > 0.) {
            return Err(DeltaLapError::AlignmentFailure {
                reason: format!("grid spacing {} must be positive", self.spacing_m),
            });
        }
        let (Some(last1), Some(last2)) = (lap1.last(), lap2.last()) else {
            return Err(DeltaLapError::AlignmentFailure {
                reason: "empty sample sequence".to_string(),
            });
        };

        let common_distance = last1.distance.min(last2.distance);
        if common_distance.is_nan() || common_distance <= 0. {
            return Err(DeltaLapError::NonPositiveDistance {
                distance: common_distance,
            });
        }

        let distance = self.grid(common_distance);
        if distance.is_empty() {
            return Err(DeltaLapError::AlignmentFailure {
                reason: format!(
                    "common distance {:.2}m is shorter than the {}m grid spacing",
                    common_distance, self.spacing_m
                ),
            });
        }
        debug!(
            "Aligning laps over {:.1}m ({} grid points)",
            common_distance,
            distance.len()
        );

        let driver1 = resample_driver(lap1, &distance, "driver1");
        let driver2 = resample_driver(lap2, &distance, "driver2");
        Ok(AlignedDataset {
            distance,
            driver1,
            driver2,
        })
    }
}

fn channel_curve(lap: &[DistanceTaggedSample<'_>], channel: Channel) -> Option<LinearCurve> {
    let lap_start = lap.first().map(|t| t.sample.time).unwrap_or(0.);
    LinearCurve::from_points(
        lap.iter()
            .filter_map(|tagged| channel.value(tagged, lap_start).map(|v| (tagged.distance, v))),
    )
}

fn resample_driver(lap: &[DistanceTaggedSample<'_>], grid: &[f64], label: &str) -> AlignedDriver {
    let mut aligned = AlignedDriver::default();

    for channel in Channel::CORE {
        let values = match channel_curve(lap, channel) {
            Some(curve) => {
                let mut values = curve.resample(grid);
                if channel == Channel::Gear {
                    values
                        .iter_mut()
                        .for_each(|gear| *gear = gear.floor().max(1.));
                }
                values
            }
            None => {
                warn!(
                    "{}: channel '{}' has fewer than 2 valid points, filling with zeros",
                    label, channel
                );
                aligned.degraded_channels.push(channel);
                vec![0.; grid.len()]
            }
        };
        aligned.channels.insert(channel, values);
    }

    for channel in Channel::OPTIONAL {
        if let Some(curve) = channel_curve(lap, channel) {
            aligned.channels.insert(channel, curve.resample(grid));
        }
    }

    aligned
}

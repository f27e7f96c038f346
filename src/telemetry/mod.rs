pub mod distance_estimator;

use serde::{Deserialize, Serialize};

pub use distance_estimator::{DistanceTaggedSample, estimate_distance, haversine_distance_m};

/// A single telemetry measurement as handed over by the lap detection stage.
///
/// Every channel except `time` is optional: a missing value never counts as
/// zero when statistics are computed.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetrySample {
    /// Seconds, monotonic within a lap
    pub time: f64,
    /// Vehicle speed in km/h
    pub speed: Option<f64>,
    /// Throttle position, 0-100%
    pub throttle: Option<f64>,
    /// Brake position, 0-100%
    pub brake: Option<f64>,
    /// Engaged gear, 1 and above
    pub gear: Option<u32>,
    /// Engine RPM
    pub rpm: Option<f64>,
    /// Latitude in decimal degrees
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees
    pub longitude: Option<f64>,
    /// Lateral acceleration in g
    pub lateral_accel: Option<f64>,
    /// Steering wheel angle in degrees
    pub steering_angle: Option<f64>,
    /// Coolant temperature
    pub water_temp: Option<f64>,
    /// Oil temperature
    pub oil_temp: Option<f64>,
}

impl TelemetrySample {
    /// GPS position, only when both coordinates are present and finite.
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }

    /// Speed in km/h, ignoring NaN and infinite readings.
    pub fn valid_speed(&self) -> Option<f64> {
        self.speed.filter(|speed| speed.is_finite())
    }
}

/// A completed lap. Samples are kept in insertion order, which is time order.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Lap {
    pub lap_number: u32,
    pub start_time: f64,
    pub end_time: f64,
    /// Lap duration in seconds
    pub lap_time: f64,
    pub samples: Vec<TelemetrySample>,
    #[serde(default)]
    pub is_fastest: bool,
}

impl Lap {
    /// Build a lap whose boundaries are taken from its first and last sample.
    pub fn from_samples(lap_number: u32, samples: Vec<TelemetrySample>) -> Self {
        let start_time = samples.first().map(|s| s.time).unwrap_or(0.);
        let end_time = samples.last().map(|s| s.time).unwrap_or(start_time);
        Self {
            lap_number,
            start_time,
            end_time,
            lap_time: end_time - start_time,
            samples,
            is_fastest: false,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionInfo {
    pub driver_name: Option<String>,
    pub session_name: Option<String>,
    pub track_name: Option<String>,
}

/// All laps a driver completed in one session.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub info: SessionInfo,
    pub laps: Vec<Lap>,
}

impl Session {
    pub fn new(info: SessionInfo, laps: Vec<Lap>) -> Self {
        Self { info, laps }
    }

    /// Driver name, or `fallback` when the session does not carry one.
    pub fn driver_name_or(&self, fallback: &str) -> String {
        self.info
            .driver_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }

    pub fn fastest_lap(&self) -> Option<&Lap> {
        self.laps.iter().find(|lap| lap.is_fastest)
    }

    pub fn lap(&self, lap_number: u32) -> Option<&Lap> {
        self.laps.iter().find(|lap| lap.lap_number == lap_number)
    }

    /// Flag the shortest lap with at least two samples as the fastest one,
    /// clearing any previous marker.
    pub fn mark_fastest_lap(&mut self) {
        let fastest = self
            .laps
            .iter()
            .enumerate()
            .filter(|(_, lap)| lap.samples.len() >= 2 && lap.lap_time > 0.)
            .min_by(|(_, a), (_, b)| a.lap_time.total_cmp(&b.lap_time))
            .map(|(idx, _)| idx);
        for (idx, lap) in self.laps.iter_mut().enumerate() {
            lap.is_fastest = Some(idx) == fastest;
        }
    }
}

/// A sample tagged with the lap it belongs to, as stored in session files.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LapSample {
    pub lap_number: u32,
    #[serde(flatten)]
    pub sample: TelemetrySample,
}

/// One line of a session file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum SessionRecord {
    SessionChange(SessionInfo),
    DataPoint(Box<LapSample>),
}

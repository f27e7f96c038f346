pub mod report;

use std::{
    collections::BTreeMap,
    time::{Instant, SystemTime},
};

use log::{debug, error, info};

use crate::{
    DeltaLapError,
    alignment::{AlignedDataset, Channel, TrackAligner},
    analysis::{
        ActionClassifier, ComparisonMetrics, ComparisonPoint, DeltaAnalyzer, DriverSlot,
        DynamicsClassifier, SectorAnalyzer, VehicleDynamics, build_comparison_points, mean,
        std_dev,
    },
    config::EngineConfig,
    telemetry::{Lap, Session, estimate_distance},
};

pub use report::{
    ActionComparison, ComparisonOutcome, ComparisonReport, DriverLapSummary, DynamicsComparison,
    OverallSummary, SpeedAnalysis, TopSpeedZone,
};

const DRIVER1_FALLBACK_NAME: &str = "Driver 1";
const DRIVER2_FALLBACK_NAME: &str = "Driver 2";

/// How to pick the lap of a session that takes part in a comparison.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LapSelector {
    /// Exact lap number
    Number(u32),
    /// Marked fastest lap, falling back to the first lap
    #[default]
    Fastest,
    /// First lap, whatever its time
    First,
}

impl LapSelector {
    /// Explicit lap number if given, otherwise fastest or first lap.
    pub fn from_options(lap_number: Option<u32>, use_fastest: bool) -> Self {
        match lap_number {
            Some(lap_number) => LapSelector::Number(lap_number),
            None if use_fastest => LapSelector::Fastest,
            None => LapSelector::First,
        }
    }
}

pub fn select_lap<'s>(
    session: &'s Session,
    driver: &str,
    selector: LapSelector,
) -> Result<&'s Lap, DeltaLapError> {
    if session.laps.is_empty() {
        return Err(DeltaLapError::NoLaps {
            driver: driver.to_string(),
        });
    }
    let lap = match selector {
        LapSelector::Number(lap_number) => session.lap(lap_number),
        LapSelector::Fastest => session.fastest_lap().or(session.laps.first()),
        LapSelector::First => session.laps.first(),
    };
    lap.ok_or_else(|| DeltaLapError::LapNotFound {
        driver: driver.to_string(),
        lap_number: match selector {
            LapSelector::Number(lap_number) => Some(lap_number),
            _ => None,
        },
    })
}

/// Runs the whole pipeline for two laps. Holds configuration only, so one
/// engine can serve any number of comparisons.
#[derive(Clone, Debug)]
pub struct ComparisonEngine {
    config: EngineConfig,
    aligner: TrackAligner,
    actions: ActionClassifier,
    dynamics: DynamicsClassifier,
    sectors: SectorAnalyzer,
    delta: DeltaAnalyzer,
}

impl Default for ComparisonEngine {
    fn default() -> Self {
        Self::from_valid_config(EngineConfig::default())
    }
}

impl ComparisonEngine {
    pub fn new(config: EngineConfig) -> Result<Self, DeltaLapError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: EngineConfig) -> Self {
        Self {
            aligner: TrackAligner::new(config.grid_spacing_m),
            actions: ActionClassifier::new(config.action),
            dynamics: DynamicsClassifier::new(config.dynamics),
            sectors: SectorAnalyzer::new(config.sector_count, config.grid_spacing_m),
            delta: DeltaAnalyzer::new(config.delta_sector_count, config.even_gap_threshold_s),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compare the selected laps of two sessions.
    pub fn compare(
        &self,
        session1: &Session,
        session2: &Session,
        lap1: LapSelector,
        lap2: LapSelector,
    ) -> Result<ComparisonReport, DeltaLapError> {
        let name1 = session1.driver_name_or(DRIVER1_FALLBACK_NAME);
        let name2 = session2.driver_name_or(DRIVER2_FALLBACK_NAME);
        let selected1 = select_lap(session1, &name1, lap1)?;
        let selected2 = select_lap(session2, &name2, lap2)?;
        info!(
            "Comparing {} lap {} ({:.3}s) against {} lap {} ({:.3}s)",
            name1,
            selected1.lap_number,
            selected1.lap_time,
            name2,
            selected2.lap_number,
            selected2.lap_time
        );
        self.compare_laps(&name1, selected1, &name2, selected2)
    }

    /// Same as [`ComparisonEngine::compare`], with failures turned into a
    /// `success: false` value.
    pub fn compare_outcome(
        &self,
        session1: &Session,
        session2: &Session,
        lap1: LapSelector,
        lap2: LapSelector,
    ) -> ComparisonOutcome {
        let result = self.compare(session1, session2, lap1, lap2);
        if let Err(e) = &result {
            error!("Comparison failed: {}", e);
        }
        result.into()
    }

    pub fn compare_laps(
        &self,
        name1: &str,
        lap1: &Lap,
        name2: &str,
        lap2: &Lap,
    ) -> Result<ComparisonReport, DeltaLapError> {
        let started = Instant::now();

        let tagged1 = estimate_distance(lap1)?;
        let tagged2 = estimate_distance(lap2)?;
        let aligned = self.aligner.align(&tagged1, &tagged2)?;

        let points = build_comparison_points(&aligned, &self.actions, &self.dynamics);
        let total_distance = aligned.total_distance();
        let sector_analysis = self.sectors.analyze(&points, total_distance);

        let time1 = aligned.driver1.channel(Channel::Time).unwrap_or_default();
        let time2 = aligned.driver2.channel(Channel::Time).unwrap_or_default();
        let lap_delta = self.delta.analyze(time1, time2, &aligned.distance)?;
        let comparison_metrics =
            ComparisonMetrics::compute(&aligned, lap_delta, &self.config.cornering);

        let speed_analysis = self.speed_analysis(&points);
        let action_analysis = self.action_analysis(&points);
        let dynamics_analysis = self.dynamics_analysis(&points, &aligned);

        let total_time_delta = points.last().map(|p| p.time_delta).unwrap_or(0.);
        let faster_driver = DriverSlot::pick(total_time_delta < 0.);
        let processing_time_s = started.elapsed().as_secs_f64();
        debug!(
            "Compared {} points over {:.1}m in {:.4}s",
            points.len(),
            total_distance,
            processing_time_s
        );

        Ok(ComparisonReport {
            success: true,
            driver1: lap_summary(name1, lap1),
            driver2: lap_summary(name2, lap2),
            overall: OverallSummary {
                total_time_delta,
                faster_driver,
                faster_driver_name: match faster_driver {
                    DriverSlot::Driver1 => name1.to_string(),
                    DriverSlot::Driver2 => name2.to_string(),
                },
                total_distance,
                data_points: points.len(),
                interpolation_spacing_m: self.aligner.spacing_m(),
                processing_time_s,
                analysis_timestamp: SystemTime::now()
                    .duration_since(SystemTime::UNIX_EPOCH)
                    .map(|elapsed| elapsed.as_secs_f64())
                    .unwrap_or(0.),
            },
            aligned_data: aligned,
            comparison_metrics,
            sector_analysis,
            speed_analysis,
            action_analysis,
            dynamics_analysis,
            comparison_points: Some(points),
        })
    }

    fn speed_analysis(&self, points: &[ComparisonPoint]) -> SpeedAnalysis {
        let speed_deltas = points.iter().map(|p| p.speed_delta).collect::<Vec<_>>();
        SpeedAnalysis {
            max_speed_advantage: speed_deltas.iter().copied().reduce(f64::max).unwrap_or(0.),
            max_speed_deficit: speed_deltas.iter().copied().reduce(f64::min).unwrap_or(0.),
            avg_speed_delta: mean(&speed_deltas),
            speed_advantage_percentage: crate::analysis::percentage(
                speed_deltas.iter().filter(|d| **d > 0.).count(),
                speed_deltas.len(),
            ),
            top_speed_zones: top_speed_zones(points, self.config.top_speed_threshold_kmh),
            speed_consistency: std_dev(&speed_deltas),
        }
    }

    fn action_analysis(&self, points: &[ComparisonPoint]) -> ActionComparison {
        let (throttle1, brake1): (Vec<f64>, Vec<f64>) = points
            .iter()
            .map(|p| (p.driver1.throttle, p.driver1.brake))
            .unzip();
        let (throttle2, brake2): (Vec<f64>, Vec<f64>) = points
            .iter()
            .map(|p| (p.driver2.throttle, p.driver2.brake))
            .unzip();
        let driver1 = self.actions.analyze_sequence(&throttle1, &brake1);
        let driver2 = self.actions.analyze_sequence(&throttle2, &brake2);
        let action_differences =
            distribution_differences(&driver1.action_distribution, &driver2.action_distribution);
        ActionComparison {
            driver1,
            driver2,
            action_differences,
        }
    }

    fn dynamics_analysis(
        &self,
        points: &[ComparisonPoint],
        aligned: &AlignedDataset,
    ) -> DynamicsComparison {
        let (dynamics1, dynamics2): (Vec<VehicleDynamics>, Vec<VehicleDynamics>) = points
            .iter()
            .map(|p| (p.driver1.dynamics, p.driver2.dynamics))
            .unzip();
        let margin = self.config.handling_balance_margin_pct;
        let driver1 =
            self.dynamics
                .analyze_handling(&dynamics1, &aligned.driver1, &aligned.distance, margin);
        let driver2 =
            self.dynamics
                .analyze_handling(&dynamics2, &aligned.driver2, &aligned.distance, margin);
        let has_dynamics_channels = |driver: &crate::alignment::AlignedDriver| {
            Channel::OPTIONAL.iter().all(|channel| driver.has_channel(*channel))
        };
        DynamicsComparison {
            dynamics_differences: distribution_differences(
                &driver1.dynamics_distribution,
                &driver2.dynamics_distribution,
            ),
            channels_available: has_dynamics_channels(&aligned.driver1)
                && has_dynamics_channels(&aligned.driver2),
            driver1,
            driver2,
        }
    }
}

fn lap_summary(name: &str, lap: &Lap) -> DriverLapSummary {
    DriverLapSummary {
        name: name.to_string(),
        lap_number: lap.lap_number,
        lap_time: lap.lap_time,
        is_fastest: lap.is_fastest,
    }
}

/// `first - second` for every key present in either distribution.
fn distribution_differences<K: Ord + Copy>(
    first: &BTreeMap<K, f64>,
    second: &BTreeMap<K, f64>,
) -> BTreeMap<K, f64> {
    first
        .keys()
        .chain(second.keys())
        .map(|key| {
            let pct1 = first.get(key).copied().unwrap_or(0.);
            let pct2 = second.get(key).copied().unwrap_or(0.);
            (*key, pct1 - pct2)
        })
        .collect()
}

/// Contiguous runs of points where either driver is above `threshold_kmh`.
pub fn top_speed_zones(points: &[ComparisonPoint], threshold_kmh: f64) -> Vec<TopSpeedZone> {
    let mut zones = Vec::new();
    let mut current: Option<TopSpeedZone> = None;

    for (idx, point) in points.iter().enumerate() {
        let fast = point.driver1.speed > threshold_kmh || point.driver2.speed > threshold_kmh;
        if !fast {
            zones.extend(current.take());
            continue;
        }
        if let Some(zone) = current.as_mut() {
            zone.end_distance = point.distance;
            zone.end_index = idx;
            zone.max_speed_driver1 = zone.max_speed_driver1.max(point.driver1.speed);
            zone.max_speed_driver2 = zone.max_speed_driver2.max(point.driver2.speed);
        } else {
            current = Some(TopSpeedZone {
                start_distance: point.distance,
                end_distance: point.distance,
                start_index: idx,
                end_index: idx,
                max_speed_driver1: point.driver1.speed,
                max_speed_driver2: point.driver2.speed,
            });
        }
    }
    zones.extend(current);
    zones
}

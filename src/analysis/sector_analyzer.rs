use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uom::si::{
    f64::Velocity,
    velocity::{kilometer_per_hour, meter_per_second},
};

use super::{
    ComparisonPoint, DriverAction, DriverSlot, action_classifier::action_distribution, max_or_zero,
    mean, min_or_zero,
};

pub const DEFAULT_SECTOR_COUNT: usize = 3;

/// One driver's figures inside a sector.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorDriverStats {
    /// Estimated from grid spacing and speed, not a timestamp difference
    pub sector_time: f64,
    pub avg_speed: f64,
    /// Slowest moving speed in the sector
    pub min_speed: f64,
    pub max_speed: f64,
    /// Distances where the driver is braking
    pub braking_points: Vec<f64>,
    /// Distances where the driver is flat out
    pub throttle_application_points: Vec<f64>,
    pub action_distribution: BTreeMap<DriverAction, f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectorRecord {
    /// 1-based
    pub sector_number: usize,
    pub start_distance: f64,
    pub end_distance: f64,
    pub point_count: usize,
    pub driver1: SectorDriverStats,
    pub driver2: SectorDriverStats,
    /// driver1 minus driver2 sector time
    pub time_difference: f64,
    /// `None` for a sector without grid points
    pub dominant_driver: Option<DriverSlot>,
    pub max_speed_delta: f64,
    pub avg_speed_delta: f64,
    /// Share of the sector length where driver1 is quicker on speed, in metres
    pub speed_advantage_distance: f64,
}

impl SectorRecord {
    fn empty(sector_number: usize, start_distance: f64, end_distance: f64) -> Self {
        Self {
            sector_number,
            start_distance,
            end_distance,
            point_count: 0,
            driver1: SectorDriverStats::default(),
            driver2: SectorDriverStats::default(),
            time_difference: 0.,
            dominant_driver: None,
            max_speed_delta: 0.,
            avg_speed_delta: 0.,
            speed_advantage_distance: 0.,
        }
    }
}

/// `sector_count` equal sectors over `[0, total_distance]`.
pub fn create_sectors(total_distance: f64, sector_count: usize) -> Vec<(f64, f64)> {
    if sector_count == 0 {
        return Vec::new();
    }
    let length = total_distance / sector_count as f64;
    (0..sector_count)
        .map(|sector| (sector as f64 * length, (sector + 1) as f64 * length))
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SectorAnalyzer {
    sector_count: usize,
    spacing_m: f64,
}

impl Default for SectorAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_SECTOR_COUNT, crate::alignment::DEFAULT_GRID_SPACING_M)
    }
}

impl SectorAnalyzer {
    /// `spacing_m` is the distance each grid point stands for when estimating
    /// sector times.
    pub fn new(sector_count: usize, spacing_m: f64) -> Self {
        Self {
            sector_count,
            spacing_m,
        }
    }

    pub fn sector_count(&self) -> usize {
        self.sector_count
    }

    pub fn analyze(&self, points: &[ComparisonPoint], total_distance: f64) -> Vec<SectorRecord> {
        let sectors = create_sectors(total_distance, self.sector_count);
        let last = sectors.len().saturating_sub(1);
        sectors
            .into_iter()
            .enumerate()
            .map(|(idx, (start, end))| {
                // the final sector also owns the point sitting on total_distance
                let members = points
                    .iter()
                    .filter(|p| p.distance >= start && (p.distance < end || (idx == last && p.distance <= end)))
                    .collect::<Vec<_>>();
                self.analyze_sector(idx + 1, start, end, &members)
            })
            .collect()
    }

    pub fn analyze_sector(
        &self,
        sector_number: usize,
        start_distance: f64,
        end_distance: f64,
        points: &[&ComparisonPoint],
    ) -> SectorRecord {
        if points.is_empty() {
            return SectorRecord::empty(sector_number, start_distance, end_distance);
        }

        let driver1 = self.driver_stats(points, DriverSlot::Driver1);
        let driver2 = self.driver_stats(points, DriverSlot::Driver2);
        let time_difference = driver1.sector_time - driver2.sector_time;

        let speed_deltas = points.iter().map(|p| p.speed_delta).collect::<Vec<_>>();
        let driver1_quicker = speed_deltas.iter().filter(|d| **d > 0.).count();

        SectorRecord {
            sector_number,
            start_distance,
            end_distance,
            point_count: points.len(),
            time_difference,
            dominant_driver: Some(DriverSlot::pick(time_difference < 0.)),
            max_speed_delta: max_or_zero(speed_deltas.iter().copied()),
            avg_speed_delta: mean(&speed_deltas),
            speed_advantage_distance: driver1_quicker as f64 / points.len() as f64
                * (end_distance - start_distance),
            driver1,
            driver2,
        }
    }

    fn driver_stats(&self, points: &[&ComparisonPoint], slot: DriverSlot) -> SectorDriverStats {
        let values = points.iter().map(|p| (p.distance, p.driver(slot))).collect::<Vec<_>>();
        let moving = values
            .iter()
            .map(|(_, v)| v.speed)
            .filter(|speed| *speed > 0.)
            .collect::<Vec<_>>();
        let speeds = values.iter().map(|(_, v)| v.speed).collect::<Vec<_>>();
        let actions = values.iter().map(|(_, v)| v.action).collect::<Vec<_>>();

        SectorDriverStats {
            sector_time: moving
                .iter()
                .map(|speed| {
                    self.spacing_m
                        / Velocity::new::<kilometer_per_hour>(*speed).get::<meter_per_second>()
                })
                .sum(),
            avg_speed: mean(&speeds),
            min_speed: min_or_zero(moving.iter().copied()),
            max_speed: max_or_zero(moving.iter().copied()),
            braking_points: values
                .iter()
                .filter(|(_, v)| v.action == DriverAction::Braking)
                .map(|(distance, _)| *distance)
                .collect(),
            throttle_application_points: values
                .iter()
                .filter(|(_, v)| v.action == DriverAction::FullThrottle)
                .map(|(distance, _)| *distance)
                .collect(),
            action_distribution: action_distribution(&actions),
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::errors::DeltaLapError;

use super::{DriverSlot, mean, percentage, std_dev, variance};

/// Default number of equal-length sectors used for the time-gap split
pub const DEFAULT_DELTA_SECTORS: usize = 3;
/// Gap below which both drivers are considered even, in seconds
pub const DEFAULT_EVEN_GAP_S: f64 = 0.1;

/// Point where the cumulative gap changes sign.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZeroCrossing {
    /// Interpolated distance of the crossing
    pub distance: f64,
    /// Grid index right before the crossing
    pub index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GapExtreme {
    /// Magnitude of the cumulative gap
    pub time_gap: f64,
    /// Raw `time1 - time2` at the same point
    pub raw_time_delta: f64,
    pub distance: f64,
    pub index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaxAdvantages {
    /// Largest positive cumulative gap
    pub driver1_max_advantage: GapExtreme,
    /// Largest negative cumulative gap
    pub driver2_max_advantage: GapExtreme,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectorDelta {
    /// 1-based sector number
    pub sector: usize,
    pub start_distance: f64,
    pub end_distance: f64,
    pub time_gained_driver1: f64,
    pub time_gained_driver2: f64,
    pub advantage: DriverSlot,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeltaStatistics {
    pub driver1_ahead_percentage: f64,
    pub driver2_ahead_percentage: f64,
    pub even_percentage: f64,
    pub delta_variance: f64,
    pub delta_std: f64,
}

/// Progressive time gap between two drivers along the distance grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LapDelta {
    pub time_delta_array: Vec<f64>,
    pub cumulative_delta_array: Vec<f64>,
    pub time_delta_start: f64,
    pub time_delta_end: f64,
    pub cumulative_delta_final: f64,
    pub max_time_gap: f64,
    pub avg_time_delta: f64,
    pub zero_crossings: Vec<ZeroCrossing>,
    pub max_advantages: MaxAdvantages,
    pub sector_analysis: Vec<SectorDelta>,
    pub statistics: DeltaStatistics,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeltaAnalyzer {
    sector_count: usize,
    even_gap_s: f64,
}

impl Default for DeltaAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_DELTA_SECTORS, DEFAULT_EVEN_GAP_S)
    }
}

impl DeltaAnalyzer {
    pub fn new(sector_count: usize, even_gap_s: f64) -> Self {
        Self {
            sector_count,
            even_gap_s,
        }
    }

    pub fn analyze(
        &self,
        time1: &[f64],
        time2: &[f64],
        distance: &[f64],
    ) -> Result<LapDelta, DeltaLapError> {
        if distance.is_empty() {
            return Err(DeltaLapError::AlignmentFailure {
                reason: "cannot compute lap delta on an empty distance grid".to_string(),
            });
        }
        if time1.len() != distance.len() || time2.len() != distance.len() {
            return Err(DeltaLapError::AlignmentFailure {
                reason: format!(
                    "time channels ({} and {} points) do not match the {} point grid",
                    time1.len(),
                    time2.len(),
                    distance.len()
                ),
            });
        }

        let time_delta = time1
            .iter()
            .zip(time2)
            .map(|(t1, t2)| t1 - t2)
            .collect::<Vec<_>>();
        let cumulative_delta = time_delta
            .iter()
            .map(|delta| delta - time_delta[0])
            .collect::<Vec<_>>();

        let last = distance.len() - 1;
        let (max_idx, min_idx) = extreme_indices(&cumulative_delta);
        let gap_at = |idx: usize| GapExtreme {
            time_gap: cumulative_delta[idx].abs(),
            raw_time_delta: time_delta[idx],
            distance: distance[idx],
            index: idx,
        };

        let total = cumulative_delta.len();
        let statistics = DeltaStatistics {
            driver1_ahead_percentage: percentage(
                cumulative_delta.iter().filter(|d| **d > 0.).count(),
                total,
            ),
            driver2_ahead_percentage: percentage(
                cumulative_delta.iter().filter(|d| **d < 0.).count(),
                total,
            ),
            even_percentage: percentage(
                cumulative_delta
                    .iter()
                    .filter(|d| d.abs() < self.even_gap_s)
                    .count(),
                total,
            ),
            delta_variance: variance(&cumulative_delta),
            delta_std: std_dev(&cumulative_delta),
        };

        Ok(LapDelta {
            time_delta_start: time_delta[0],
            time_delta_end: time_delta[last],
            cumulative_delta_final: cumulative_delta[last],
            max_time_gap: cumulative_delta
                .iter()
                .map(|d| d.abs())
                .fold(0., f64::max),
            avg_time_delta: mean(&time_delta),
            zero_crossings: zero_crossings(&cumulative_delta, distance),
            max_advantages: MaxAdvantages {
                driver1_max_advantage: gap_at(max_idx),
                driver2_max_advantage: gap_at(min_idx),
            },
            sector_analysis: self.sector_deltas(&cumulative_delta, distance),
            statistics,
            time_delta_array: time_delta,
            cumulative_delta_array: cumulative_delta,
        })
    }

    fn sector_deltas(&self, cumulative_delta: &[f64], distance: &[f64]) -> Vec<SectorDelta> {
        if self.sector_count == 0 {
            return Vec::new();
        }
        let total_distance = distance[distance.len() - 1];
        let sector_length = total_distance / self.sector_count as f64;

        (0..self.sector_count)
            .filter_map(|sector| {
                let start = sector as f64 * sector_length;
                let end = (sector + 1) as f64 * sector_length;
                // boundaries are inclusive on both ends, neighbours share a point
                let first = distance.iter().position(|d| *d >= start && *d <= end)?;
                let last = distance.iter().rposition(|d| *d >= start && *d <= end)?;
                let gained = cumulative_delta[last] - cumulative_delta[first];
                Some(SectorDelta {
                    sector: sector + 1,
                    start_distance: start,
                    end_distance: end,
                    time_gained_driver1: gained,
                    time_gained_driver2: -gained,
                    advantage: DriverSlot::pick(gained > 0.),
                })
            })
            .collect()
    }
}

/// Indices of the first maximum and first minimum.
fn extreme_indices(values: &[f64]) -> (usize, usize) {
    values
        .iter()
        .enumerate()
        .fold((0, 0), |(max_idx, min_idx), (idx, value)| {
            (
                if *value > values[max_idx] { idx } else { max_idx },
                if *value < values[min_idx] { idx } else { min_idx },
            )
        })
}

/// Sign changes of `delta` between adjacent grid points, located by linear
/// interpolation on the two magnitudes. Landing exactly on zero counts as a
/// crossing.
pub fn zero_crossings(delta: &[f64], distance: &[f64]) -> Vec<ZeroCrossing> {
    delta
        .windows(2)
        .zip(distance.windows(2))
        .enumerate()
        .filter(|(_, (d, _))| (d[0] > 0. && d[1] <= 0.) || (d[0] < 0. && d[1] >= 0.))
        .map(|(idx, (d, x))| {
            let magnitude = d[0].abs() + d[1].abs();
            let fraction = if magnitude > f64::EPSILON {
                d[0].abs() / magnitude
            } else {
                0.
            };
            ZeroCrossing {
                distance: x[0] + (x[1] - x[0]) * fraction,
                index: idx,
            }
        })
        .collect()
}

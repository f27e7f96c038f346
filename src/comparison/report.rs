use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::{
    DeltaLapError,
    alignment::AlignedDataset,
    analysis::{
        ActionSequenceAnalysis, ComparisonMetrics, ComparisonPoint, DriverAction, DriverSlot,
        HandlingAnalysis, SectorRecord, VehicleDynamics,
    },
};

/// Which lap of which driver went into the comparison.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DriverLapSummary {
    pub name: String,
    pub lap_number: u32,
    pub lap_time: f64,
    pub is_fastest: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OverallSummary {
    /// `time_delta` of the last comparison point
    pub total_time_delta: f64,
    pub faster_driver: DriverSlot,
    pub faster_driver_name: String,
    pub total_distance: f64,
    pub data_points: usize,
    pub interpolation_spacing_m: f64,
    pub processing_time_s: f64,
    /// Seconds since the Unix epoch
    pub analysis_timestamp: f64,
}

/// Stretch of consecutive points where either driver is above the top speed
/// threshold.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TopSpeedZone {
    pub start_distance: f64,
    pub end_distance: f64,
    pub start_index: usize,
    pub end_index: usize,
    pub max_speed_driver1: f64,
    pub max_speed_driver2: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpeedAnalysis {
    pub max_speed_advantage: f64,
    pub max_speed_deficit: f64,
    pub avg_speed_delta: f64,
    /// Share of points where driver1 is quicker
    pub speed_advantage_percentage: f64,
    pub top_speed_zones: Vec<TopSpeedZone>,
    /// Standard deviation of the speed delta
    pub speed_consistency: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActionComparison {
    pub driver1: ActionSequenceAnalysis,
    pub driver2: ActionSequenceAnalysis,
    /// driver1 minus driver2 share per action, in percentage points
    pub action_differences: BTreeMap<DriverAction, f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DynamicsComparison {
    pub driver1: HandlingAnalysis,
    pub driver2: HandlingAnalysis,
    pub dynamics_differences: BTreeMap<VehicleDynamics, f64>,
    /// Both laps carried lateral acceleration and steering channels
    pub channels_available: bool,
}

/// Successful comparison of two laps.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub success: bool,
    pub driver1: DriverLapSummary,
    pub driver2: DriverLapSummary,
    pub aligned_data: AlignedDataset,
    pub comparison_metrics: ComparisonMetrics,
    #[serde(serialize_with = "serialize_sectors")]
    pub sector_analysis: Vec<SectorRecord>,
    pub overall: OverallSummary,
    pub speed_analysis: SpeedAnalysis,
    pub action_analysis: ActionComparison,
    pub dynamics_analysis: DynamicsComparison,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison_points: Option<Vec<ComparisonPoint>>,
}

impl ComparisonReport {
    /// Drop the per-point sequence from the report.
    pub fn without_points(mut self) -> Self {
        self.comparison_points = None;
        self
    }

    pub fn sector(&self, sector_number: usize) -> Option<&SectorRecord> {
        self.sector_analysis
            .iter()
            .find(|sector| sector.sector_number == sector_number)
    }
}

/// Sectors as a `sector_1 .. sector_N` object, in sector order.
fn serialize_sectors<S: Serializer>(sectors: &[SectorRecord], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(
        sectors
            .iter()
            .map(|sector| (format!("sector_{}", sector.sector_number), sector)),
    )
}

/// What the comparison boundary hands back: a report or an error message,
/// never both.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ComparisonOutcome {
    Success(Box<ComparisonReport>),
    Failure { success: bool, error: String },
}

impl ComparisonOutcome {
    pub fn failure(error: &DeltaLapError) -> Self {
        ComparisonOutcome::Failure {
            success: false,
            error: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ComparisonOutcome::Success(_))
    }

    pub fn report(&self) -> Option<&ComparisonReport> {
        match self {
            ComparisonOutcome::Success(report) => Some(report),
            ComparisonOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ComparisonOutcome::Success(_) => None,
            ComparisonOutcome::Failure { error, .. } => Some(error),
        }
    }
}

impl From<Result<ComparisonReport, DeltaLapError>> for ComparisonOutcome {
    fn from(result: Result<ComparisonReport, DeltaLapError>) -> Self {
        match result {
            Ok(report) => ComparisonOutcome::Success(Box::new(report)),
            Err(e) => ComparisonOutcome::failure(&e),
        }
    }
}

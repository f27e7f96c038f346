// Error types for deltalap

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum DeltaLapError {
    // Lap selection errors
    #[snafu(display("Lap {} not found for {driver}", lap_label(*lap_number)))]
    LapNotFound {
        driver: String,
        lap_number: Option<u32>,
    },
    #[snafu(display("No laps available for {driver}"))]
    NoLaps { driver: String },

    // Alignment errors
    #[snafu(display("Lap {lap_number} has no telemetry samples"))]
    EmptyLap { lap_number: u32 },
    #[snafu(display("Data alignment failed: {reason}"))]
    AlignmentFailure { reason: String },
    #[snafu(display("Data alignment failed: common distance {distance:.2}m is not positive"))]
    NonPositiveDistance { distance: f64 },

    // Session file errors
    #[snafu(display("Invalid session file: {path}"))]
    InvalidSessionFile { path: String },
    #[snafu(display("Session file {path} contains no telemetry samples"))]
    EmptySession { path: String },
    #[snafu(display("Error loading session file"))]
    SessionLoaderError { source: io::Error },

    // Errors for the report writer
    #[snafu(display("Error writing comparison report"))]
    WriterError { source: io::Error },
    #[snafu(display("Error serializing comparison report"))]
    ReportSerializeError { source: serde_json::Error },

    // Config management errors
    #[snafu(display("Could not find application config directory"))]
    NoConfigDir,
    #[snafu(display("Error reading or writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },
    #[snafu(display("Invalid configuration: {field} - {reason}"))]
    InvalidConfig { field: String, reason: String },
}

fn lap_label(lap_number: Option<u32>) -> String {
    match lap_number {
        Some(lap_number) => lap_number.to_string(),
        None => "(fastest)".to_string(),
    }
}

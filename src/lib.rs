// Library interface for deltalap
// This allows integration tests and benchmarks to access internal modules

pub mod alignment;
pub mod analysis;
pub mod comparison;
pub mod config;
pub mod errors;
pub mod loader;
pub mod telemetry;
pub mod writer;

// Re-export commonly used types
pub use alignment::{AlignedDataset, Channel, TrackAligner};
pub use analysis::{DriverAction, DriverSlot, VehicleDynamics, classify_action, classify_dynamics};
pub use comparison::{ComparisonEngine, ComparisonOutcome, ComparisonReport, LapSelector};
pub use config::EngineConfig;
pub use errors::DeltaLapError;
pub use telemetry::{Lap, Session, SessionInfo, SessionRecord, TelemetrySample};

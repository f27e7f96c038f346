use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    DeltaLapError,
    alignment::DEFAULT_GRID_SPACING_M,
    analysis::{
        ActionThresholds, CorneringThresholds, DynamicsThresholds,
        delta_analyzer::{DEFAULT_DELTA_SECTORS, DEFAULT_EVEN_GAP_S},
        sector_analyzer::DEFAULT_SECTOR_COUNT,
    },
};

const CONFIG_DIR_NAME: &str = "deltalap";
const CONFIG_FILE_NAME: &str = "config.json";

/// Every tunable constant of a comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Spacing of the shared distance grid, in meters
    pub grid_spacing_m: f64,
    /// Sectors in the per-sector report
    pub sector_count: usize,
    /// Sectors used to split the time-gap curve
    pub delta_sector_count: usize,
    pub even_gap_threshold_s: f64,
    pub top_speed_threshold_kmh: f64,
    pub action: ActionThresholds,
    pub dynamics: DynamicsThresholds,
    pub cornering: CorneringThresholds,
    /// Oversteer minus understeer share that tips the handling balance, in
    /// percentage points
    pub handling_balance_margin_pct: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_spacing_m: DEFAULT_GRID_SPACING_M,
            sector_count: DEFAULT_SECTOR_COUNT,
            delta_sector_count: DEFAULT_DELTA_SECTORS,
            even_gap_threshold_s: DEFAULT_EVEN_GAP_S,
            top_speed_threshold_kmh: 150.,
            action: ActionThresholds::default(),
            dynamics: DynamicsThresholds::default(),
            cornering: CorneringThresholds::default(),
            handling_balance_margin_pct: 5.,
        }
    }
}

fn invalid(field: &str, reason: &str) -> DeltaLapError {
    DeltaLapError::InvalidConfig {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), DeltaLapError> {
        if !self.grid_spacing_m.is_finite() || self.grid_spacing_m <= 0. {
            return Err(invalid("grid_spacing_m", "must be a positive number"));
        }
        if self.sector_count == 0 {
            return Err(invalid("sector_count", "must be at least 1"));
        }
        if self.delta_sector_count == 0 {
            return Err(invalid("delta_sector_count", "must be at least 1"));
        }

        let thresholds = [
            ("even_gap_threshold_s", self.even_gap_threshold_s),
            ("top_speed_threshold_kmh", self.top_speed_threshold_kmh),
            ("action.full_throttle", self.action.full_throttle),
            ("action.partial_throttle", self.action.partial_throttle),
            ("action.braking", self.action.braking),
            ("action.trail_braking_throttle", self.action.trail_braking_throttle),
            ("action.coasting", self.action.coasting),
            ("dynamics.neutral_g", self.dynamics.neutral_g),
            ("dynamics.severe_g", self.dynamics.severe_g),
            ("dynamics.correction_deg_per_s", self.dynamics.correction_deg_per_s),
            ("dynamics.min_speed_kmh", self.dynamics.min_speed_kmh),
            ("cornering.corner_speed_factor", self.cornering.corner_speed_factor),
            ("cornering.heavy_brake_pct", self.cornering.heavy_brake_pct),
            ("cornering.exit_speed_factor", self.cornering.exit_speed_factor),
            ("handling_balance_margin_pct", self.handling_balance_margin_pct),
        ];
        if let Some((field, _)) = thresholds
            .iter()
            .find(|(_, value)| !value.is_finite() || *value < 0.)
        {
            return Err(invalid(field, "must be a finite, non-negative number"));
        }
        Ok(())
    }

    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self, DeltaLapError> {
        let file = File::open(path).map_err(|e| DeltaLapError::ConfigIOError { source: e })?;
        let config: EngineConfig = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| DeltaLapError::ConfigSerializeError { source: e })?;
        config.validate()?;
        debug!("Loaded engine config from {:?}", path);
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        Some(
            dirs::config_dir()?
                .join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        )
    }

    /// Config from the user's config directory, `None` when no file exists
    /// there.
    pub fn from_local_file() -> Result<Option<Self>, DeltaLapError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path).map(Some),
            _ => Ok(None),
        }
    }

    /// Explicit path if given, else the local config file, else defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self, DeltaLapError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::from_local_file()?.unwrap_or_default()),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), DeltaLapError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| DeltaLapError::ConfigIOError { source: e })?;
        }
        let file = File::create(path).map_err(|e| DeltaLapError::ConfigIOError { source: e })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| DeltaLapError::ConfigSerializeError { source: e })?;
        writer
            .flush()
            .map_err(|e| DeltaLapError::ConfigIOError { source: e })?;
        info!("Saved engine config to {:?}", path);
        Ok(())
    }

    /// Write to the user's config directory.
    pub fn save(&self) -> Result<(), DeltaLapError> {
        let path = Self::default_path().ok_or(DeltaLapError::NoConfigDir)?;
        self.save_to(&path)
    }
}

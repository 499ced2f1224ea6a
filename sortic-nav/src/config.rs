//! Configuration loading for SorticNav

use crate::drive::DriveStep;
use crate::error::{NavError, Result};
use crate::topology::Sector;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub vehicle: VehicleConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Vehicle identity and start position
#[derive(Clone, Debug, Deserialize)]
pub struct VehicleConfig {
    /// Identifier used with the gateway arbiter (default: "agv-1")
    #[serde(default = "default_vehicle_id")]
    pub id: String,

    /// Sector label the vehicle starts in (default: SorticHandover)
    #[serde(default = "default_start_sector")]
    pub start_sector: String,

    /// Line the vehicle starts on (default: 1)
    #[serde(default = "default_line")]
    pub start_line: u32,
}

/// Navigator timing and recovery
#[derive(Clone, Debug, Deserialize)]
pub struct NavigationConfig {
    /// Scheduler tick in milliseconds (default: 100)
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Motions of the reset state, in order (default: ["reverse"])
    #[serde(default = "default_recovery_maneuver")]
    pub recovery_maneuver: Vec<DriveStep>,
}

/// Settings for the simulation binary
#[derive(Clone, Debug, Deserialize)]
pub struct SimulationConfig {
    /// Target sector label (default: TransferHandover)
    #[serde(default = "default_target_sector")]
    pub target_sector: String,

    /// Target line (default: 1)
    #[serde(default = "default_line")]
    pub target_line: u32,

    /// Give up after this many ticks (default: 200)
    #[serde(default = "default_max_ticks")]
    pub max_ticks: usize,

    /// Tick at which the next drive command is rejected, if any
    #[serde(default)]
    pub fault_at_tick: Option<usize>,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            id: default_vehicle_id(),
            start_sector: default_start_sector(),
            start_line: default_line(),
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            recovery_maneuver: default_recovery_maneuver(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            target_sector: default_target_sector(),
            target_line: default_line(),
            max_ticks: default_max_ticks(),
            fault_at_tick: None,
        }
    }
}

// Default value functions
fn default_vehicle_id() -> String {
    "agv-1".to_string()
}
fn default_start_sector() -> String {
    Sector::SorticHandover.label().to_string()
}
fn default_line() -> u32 {
    1
}
fn default_tick_interval() -> u64 {
    100
}
fn default_recovery_maneuver() -> Vec<DriveStep> {
    vec![DriveStep::Reverse]
}
fn default_target_sector() -> String {
    Sector::TransferHandover.label().to_string()
}
fn default_max_ticks() -> usize {
    200
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NavError::Config(format!("Failed to read config file: {}", e)))?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Start sector and line, with the label resolved.
    pub fn start_position(&self) -> Result<(Sector, u32)> {
        let sector = parse_label("vehicle.start_sector", &self.vehicle.start_sector)?;
        Ok((sector, self.vehicle.start_line))
    }

    /// Simulated target sector and line, with the label resolved.
    pub fn target_position(&self) -> Result<(Sector, u32)> {
        let sector = parse_label("simulation.target_sector", &self.simulation.target_sector)?;
        Ok((sector, self.simulation.target_line))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.navigation.tick_interval_ms)
    }
}

fn parse_label(key: &str, label: &str) -> Result<Sector> {
    let sector = Sector::from_label(label);
    if sector.is_known() {
        Ok(sector)
    } else {
        Err(NavError::Config(format!("{}: unknown sector '{}'", key, label)))
    }
}

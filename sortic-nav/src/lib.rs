//! SorticNav - Navigation controller for sorter transfer AGVs
//!
//! An AGV shuttles between the sortic and transfer handovers, crossing
//! one gateway on each side and the transit lane in between. Gateways
//! are shared, so access is granted one vehicle at a time.
//!
//! ## Modules
//!
//! - `topology`: sector map and sides
//! - `navigation`: the tick-driven state machine
//! - `drive`: motion primitives and a mock drive
//! - `arbiter`: gateway mutual exclusion over channels
//! - `payload`: JSON position and status payloads

pub mod arbiter;
pub mod config;
pub mod drive;
pub mod error;
pub mod navigation;
pub mod payload;
pub mod position;
pub mod topology;

// Re-export commonly used types
pub use config::Config;
pub use error::{NavError, Result};
pub use navigation::{Event, Navigator, NavigatorConfig, Phase, State};
pub use topology::{Sector, Side};

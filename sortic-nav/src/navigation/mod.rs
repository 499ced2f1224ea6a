//! Navigation state machine for a single AGV.
//!
//! This module provides:
//! - The top-level states and the event alphabet
//! - Named sub-phases for each state's do-action
//! - The navigator driving both from a tick scheduler

mod actions;
mod navigator;
mod phase;
mod state;

pub use navigator::{ErrorSnapshot, Navigator, NavigatorConfig};
pub use phase::{GatewayPhase, Phase, ToGatewayPhase, GATEWAY_EXIT_SLOTS, TRANSIT_SLOTS};
pub use state::{Event, State};

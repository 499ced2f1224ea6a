//! Drive primitive collaborator.
//!
//! The navigator never talks to motors. It commands discrete slot-sized
//! motions through [`DrivePrimitive`] and only cares whether each one was
//! confirmed:
//!
//! - [`DrivePrimitive::advance`]: forward one slot
//! - [`DrivePrimitive::reverse`]: backward one slot
//! - [`DrivePrimitive::turn`]: rotate in place toward a heading

mod mock;

pub use mock::MockDrive;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Turn direction relative to the current heading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Turn {
    Left,
    Right,
    Around,
}

impl Turn {
    /// The turn that undoes this one.
    pub fn mirror(self) -> Turn {
        match self {
            Turn::Left => Turn::Right,
            Turn::Right => Turn::Left,
            Turn::Around => Turn::Around,
        }
    }
}

/// Fault reported by the drive layer for a commanded motion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriveFault {
    #[error("motion not confirmed: {0}")]
    NotConfirmed(String),
}

/// Discrete motion layer driven by the navigator.
pub trait DrivePrimitive {
    /// Drive forward one slot.
    fn advance(&mut self) -> Result<(), DriveFault>;

    /// Drive backward one slot.
    fn reverse(&mut self) -> Result<(), DriveFault>;

    /// Rotate in place.
    fn turn(&mut self, direction: Turn) -> Result<(), DriveFault>;
}

/// A single drive command, as written in configuration files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveStep {
    Advance,
    Reverse,
    TurnLeft,
    TurnRight,
    TurnAround,
}

impl DriveStep {
    /// Issue this step on `drive`.
    pub fn execute<D: DrivePrimitive + ?Sized>(self, drive: &mut D) -> Result<(), DriveFault> {
        match self {
            DriveStep::Advance => drive.advance(),
            DriveStep::Reverse => drive.reverse(),
            DriveStep::TurnLeft => drive.turn(Turn::Left),
            DriveStep::TurnRight => drive.turn(Turn::Right),
            DriveStep::TurnAround => drive.turn(Turn::Around),
        }
    }
}

impl From<Turn> for DriveStep {
    fn from(turn: Turn) -> Self {
        match turn {
            Turn::Left => DriveStep::TurnLeft,
            Turn::Right => DriveStep::TurnRight,
            Turn::Around => DriveStep::TurnAround,
        }
    }
}

impl fmt::Display for DriveStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriveStep::Advance => "advance",
            DriveStep::Reverse => "reverse",
            DriveStep::TurnLeft => "turn_left",
            DriveStep::TurnRight => "turn_right",
            DriveStep::TurnAround => "turn_around",
        };
        f.write_str(name)
    }
}

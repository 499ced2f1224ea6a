//! Vehicle position records.

use crate::error::{NavError, Result};
use crate::topology::Sector;

/// Where the vehicle physically is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActualPosition {
    /// Handover the current journey started from
    pub start_sector: Sector,
    /// Sector occupied before the current one
    pub last_sector: Sector,
    /// Sector currently occupied
    pub sector: Sector,
    /// Line (slot) index, starts at 1
    pub line: u32,
    /// Gateway access granted
    pub token: bool,
}

impl ActualPosition {
    pub fn new(sector: Sector, line: u32) -> Self {
        Self {
            start_sector: sector,
            last_sector: sector,
            sector,
            line,
            token: false,
        }
    }

    /// Record that the vehicle has moved into `sector`.
    pub fn occupy(&mut self, sector: Sector) {
        if sector != self.sector {
            self.last_sector = self.sector;
            self.sector = sector;
        }
    }
}

impl Default for ActualPosition {
    fn default() -> Self {
        Self::new(Sector::SorticHandover, 1)
    }
}

/// Where the vehicle has been told to go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetPosition {
    pub sector: Sector,
    pub line: u32,
}

impl TargetPosition {
    /// Build a target, rejecting unknown sectors, non-handover sectors and line 0.
    pub fn new(sector: Sector, line: u32) -> Result<Self> {
        validate_line(line)?;
        if !sector.is_end_point() {
            return Err(NavError::InvalidPosition(format!(
                "target sector {} is not a handover",
                sector
            )));
        }
        Ok(Self { sector, line })
    }
}

/// Check a sector/line pair for use as an actual position.
pub fn validate_actual(sector: Sector, line: u32) -> Result<()> {
    validate_line(line)?;
    if !sector.is_known() {
        return Err(NavError::InvalidPosition("unknown sector".to_string()));
    }
    Ok(())
}

fn validate_line(line: u32) -> Result<()> {
    if line < 1 {
        return Err(NavError::InvalidPosition(format!(
            "line must be >= 1, got {}",
            line
        )));
    }
    Ok(())
}

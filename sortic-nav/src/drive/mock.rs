//! Mock drive for testing and simulation

use super::{DriveFault, DrivePrimitive, DriveStep, Turn};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Mock drive that confirms every motion unless told to fail.
///
/// Clones share state, so a test can keep one handle while the
/// navigator owns another.
#[derive(Clone)]
pub struct MockDrive {
    state: Arc<Mutex<MockDriveState>>,
}

#[derive(Debug, Default)]
struct MockDriveState {
    /// Confirmed commands, in order
    history: Vec<DriveStep>,
    /// Number of commands issued so far, confirmed or not
    issued: usize,
    /// Command indices (0-based, over all issued commands) that fail
    fail_at: HashSet<usize>,
    /// Fail every command until cleared
    fail_always: bool,
}

impl MockDrive {
    /// Create new mock drive
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockDriveState::default())),
        }
    }

    /// Make the next issued command fail.
    pub fn fail_next(&self) {
        let mut state = self.lock();
        let next = state.issued;
        state.fail_at.insert(next);
    }

    /// Make the command with the given issue index fail.
    pub fn fail_at(&self, index: usize) {
        self.lock().fail_at.insert(index);
    }

    /// Fail every command while `enabled`.
    pub fn set_fail_always(&self, enabled: bool) {
        self.lock().fail_always = enabled;
    }

    /// Confirmed commands so far
    pub fn history(&self) -> Vec<DriveStep> {
        self.lock().history.clone()
    }

    /// Number of commands issued, including failed ones
    pub fn issued(&self) -> usize {
        self.lock().issued
    }

    /// Forget recorded history (fault plan is kept)
    pub fn clear_history(&self) {
        self.lock().history.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockDriveState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn command(&self, step: DriveStep) -> Result<(), DriveFault> {
        let mut state = self.lock();
        let index = state.issued;
        state.issued += 1;
        if state.fail_always || state.fail_at.remove(&index) {
            tracing::debug!("MockDrive: {} #{} rejected", step, index);
            return Err(DriveFault::NotConfirmed(step.to_string()));
        }
        state.history.push(step);
        Ok(())
    }
}

impl Default for MockDrive {
    fn default() -> Self {
        Self::new()
    }
}

impl DrivePrimitive for MockDrive {
    fn advance(&mut self) -> Result<(), DriveFault> {
        self.command(DriveStep::Advance)
    }

    fn reverse(&mut self) -> Result<(), DriveFault> {
        self.command(DriveStep::Reverse)
    }

    fn turn(&mut self, direction: Turn) -> Result<(), DriveFault> {
        self.command(direction.into())
    }
}

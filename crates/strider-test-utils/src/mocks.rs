//! Stub implementations of core capability traits.

use nalgebra::DVector;
use strider_core::modes::{ContactFlags, ModeNumber, mode_number_to_contact_flags};
use strider_core::traits::{ContactFlagProvider, DesiredTrajectory};

// ---------------------------------------------------------------------------
// FixedContactFlags
// ---------------------------------------------------------------------------

/// Reports the same stance at every time.
#[derive(Clone, Copy, Debug)]
pub struct FixedContactFlags(pub ContactFlags);

impl FixedContactFlags {
    pub const fn from_mode(mode: ModeNumber) -> Self {
        Self(mode_number_to_contact_flags(mode))
    }
}

impl ContactFlagProvider for FixedContactFlags {
    fn contact_flags(&self, _time: f64) -> ContactFlags {
        self.0
    }
}

// ---------------------------------------------------------------------------
// SwitchingContactFlags
// ---------------------------------------------------------------------------

/// One stance before `switch_time`, another from it on.
#[derive(Clone, Copy, Debug)]
pub struct SwitchingContactFlags {
    pub switch_time: f64,
    pub before: ContactFlags,
    pub after: ContactFlags,
}

impl ContactFlagProvider for SwitchingContactFlags {
    fn contact_flags(&self, time: f64) -> ContactFlags {
        if time < self.switch_time {
            self.before
        } else {
            self.after
        }
    }
}

// ---------------------------------------------------------------------------
// ConstantTrajectory
// ---------------------------------------------------------------------------

/// Desired state and input that never change.
#[derive(Clone, Debug)]
pub struct ConstantTrajectory {
    pub state: DVector<f64>,
    pub input: DVector<f64>,
}

impl DesiredTrajectory for ConstantTrajectory {
    fn desired_state(&self, _time: f64) -> DVector<f64> {
        self.state.clone()
    }

    fn desired_input(&self, _time: f64) -> DVector<f64> {
        self.input.clone()
    }
}

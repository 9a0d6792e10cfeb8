// strider-core: errors, config, state layout, contact modes and capability traits.

pub mod config;
pub mod error;
pub mod modes;
pub mod precomputation;
pub mod traits;
pub mod types;

pub mod prelude {
    pub use crate::config::{AdSettings, TrackingWeights};
    pub use crate::error::{ConfigError, CostError, ErrorKind, ScheduleError, StriderError};
    pub use crate::modes::{
        ContactFlags, DEFAULT_MODE, ModeNumber, contact_flags_to_mode_number,
        mode_number_to_contact_flags, stance_leg_count,
    };
    pub use crate::precomputation::{ContactPreComputation, PreComputation, Request};
    pub use crate::traits::{ComModel, ContactFlagProvider, DesiredTrajectory, KinematicsModel};
    pub use crate::types::{
        ComKinoInput, ComKinoState, FeetArray, INPUT_DIM, JointCoordinates, NUM_CONTACT_POINTS,
        STATE_DIM,
    };
}

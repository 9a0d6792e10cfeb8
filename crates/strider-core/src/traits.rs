//! Capability interfaces consumed by the schedule and cost modules.
//!
//! Model internals (kinematics, rigid-body dynamics) live outside this
//! workspace. Owners hold an exclusive clone of every model obtained through
//! `clone_box`, so optimizer threads never share model state.

use nalgebra::{DVector, Vector3};

use crate::modes::ContactFlags;
use crate::types::JointCoordinates;

// ---------------------------------------------------------------------------
// KinematicsModel
// ---------------------------------------------------------------------------

/// Leg kinematics expressed in the base frame.
pub trait KinematicsModel: Send + Sync {
    /// Position of the foot of `leg` relative to the base, base frame.
    fn position_base_to_foot_in_base_frame(
        &self,
        leg: usize,
        joint_positions: &JointCoordinates,
    ) -> Vector3<f64>;

    /// Velocity of the foot of `leg` relative to the base, base frame.
    fn foot_velocity_relative_to_base_in_base_frame(
        &self,
        leg: usize,
        joint_positions: &JointCoordinates,
        joint_velocities: &JointCoordinates,
    ) -> Vector3<f64>;

    /// Exclusive deep copy.
    fn clone_box(&self) -> Box<dyn KinematicsModel>;
}

impl Clone for Box<dyn KinematicsModel> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

// ---------------------------------------------------------------------------
// ComModel
// ---------------------------------------------------------------------------

/// Lumped center-of-mass model.
pub trait ComModel: Send + Sync {
    /// Total robot mass in kg.
    fn total_mass(&self) -> f64;

    /// Exclusive deep copy.
    fn clone_box(&self) -> Box<dyn ComModel>;
}

impl Clone for Box<dyn ComModel> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

// ---------------------------------------------------------------------------
// DesiredTrajectory
// ---------------------------------------------------------------------------

/// Time-interpolated state and input references.
pub trait DesiredTrajectory: Send + Sync {
    fn desired_state(&self, time: f64) -> DVector<f64>;

    fn desired_input(&self, time: f64) -> DVector<f64>;
}

// ---------------------------------------------------------------------------
// ContactFlagProvider
// ---------------------------------------------------------------------------

/// Source of the scheduled stance at a given time.
pub trait ContactFlagProvider: Send + Sync {
    fn contact_flags(&self, time: f64) -> ContactFlags;
}

//! Reference quadruped models.
//!
//! Each leg is a HAA-HFE-KFE chain hanging from a hip mounted at a fixed
//! offset on the base:
//!
//! ```text
//!   hip ──HAA(x)──HFE(y)── thigh ──KFE(y)── shank ── foot
//! ```
//!
//! At zero joint angles the leg points straight down.

use nalgebra::{Matrix3, Rotation3, Vector3};

use strider_core::traits::{ComModel, KinematicsModel};
use strider_core::types::{FeetArray, JOINTS_PER_LEG, JointCoordinates};

/// Linear Jacobian of a revolute chain: column `i` is `axis_i × (foot - origin_i)`.
pub fn compute_leg_jacobian(
    origins: &[Vector3<f64>; JOINTS_PER_LEG],
    axes: &[Vector3<f64>; JOINTS_PER_LEG],
    foot: &Vector3<f64>,
) -> Matrix3<f64> {
    let mut j = Matrix3::zeros();
    for (i, (origin, axis)) in origins.iter().zip(axes).enumerate() {
        j.set_column(i, &axis.cross(&(foot - origin)));
    }
    j
}

/// Three-joint legs with point feet.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadrupedKinematics {
    /// Hip position in the base frame, per leg.
    pub hip_offsets: FeetArray<Vector3<f64>>,
    pub thigh_length: f64,
    pub shank_length: f64,
}

impl Default for QuadrupedKinematics {
    fn default() -> Self {
        Self {
            hip_offsets: [
                Vector3::new(0.3, 0.2, 0.0),
                Vector3::new(0.3, -0.2, 0.0),
                Vector3::new(-0.3, 0.2, 0.0),
                Vector3::new(-0.3, -0.2, 0.0),
            ],
            thigh_length: 0.25,
            shank_length: 0.25,
        }
    }
}

/// Joint origins, joint axes and foot position of one leg, base frame.
struct LegFrames {
    origins: [Vector3<f64>; JOINTS_PER_LEG],
    axes: [Vector3<f64>; JOINTS_PER_LEG],
    foot: Vector3<f64>,
}

impl QuadrupedKinematics {
    fn leg_frames(&self, leg: usize, q: &JointCoordinates) -> LegFrames {
        let q = q.fixed_rows::<JOINTS_PER_LEG>(JOINTS_PER_LEG * leg);
        let hip = self.hip_offsets[leg];

        let r_haa = Rotation3::from_axis_angle(&Vector3::x_axis(), q[0]);
        let r_hfe = r_haa * Rotation3::from_axis_angle(&Vector3::y_axis(), q[1]);
        let r_kfe = r_hfe * Rotation3::from_axis_angle(&Vector3::y_axis(), q[2]);

        let knee = hip + r_hfe * Vector3::new(0.0, 0.0, -self.thigh_length);
        let foot = knee + r_kfe * Vector3::new(0.0, 0.0, -self.shank_length);
        let lateral = r_haa * Vector3::y();

        LegFrames {
            origins: [hip, hip, knee],
            axes: [Vector3::x(), lateral, lateral],
            foot,
        }
    }

    /// Foot Jacobian of `leg` with respect to its own three joints.
    pub fn leg_jacobian(&self, leg: usize, joint_positions: &JointCoordinates) -> Matrix3<f64> {
        let frames = self.leg_frames(leg, joint_positions);
        compute_leg_jacobian(&frames.origins, &frames.axes, &frames.foot)
    }
}

impl KinematicsModel for QuadrupedKinematics {
    fn position_base_to_foot_in_base_frame(
        &self,
        leg: usize,
        joint_positions: &JointCoordinates,
    ) -> Vector3<f64> {
        self.leg_frames(leg, joint_positions).foot
    }

    fn foot_velocity_relative_to_base_in_base_frame(
        &self,
        leg: usize,
        joint_positions: &JointCoordinates,
        joint_velocities: &JointCoordinates,
    ) -> Vector3<f64> {
        let dq = joint_velocities.fixed_rows::<JOINTS_PER_LEG>(JOINTS_PER_LEG * leg);
        self.leg_jacobian(leg, joint_positions) * dq
    }

    fn clone_box(&self) -> Box<dyn KinematicsModel> {
        Box::new(self.clone())
    }
}

/// Whole robot lumped into one mass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointMassComModel {
    pub mass: f64,
}

impl PointMassComModel {
    pub const fn new(mass: f64) -> Self {
        Self { mass }
    }
}

impl Default for PointMassComModel {
    fn default() -> Self {
        Self::new(20.0)
    }
}

impl ComModel for PointMassComModel {
    fn total_mass(&self) -> f64 {
        self.mass
    }

    fn clone_box(&self) -> Box<dyn ComModel> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn straight_leg_points_down() {
        let kin = QuadrupedKinematics::default();
        let q = JointCoordinates::zeros();
        let foot = kin.position_base_to_foot_in_base_frame(0, &q);
        assert_relative_eq!(foot, Vector3::new(0.3, 0.2, -0.5), epsilon = 1e-12);
        let foot = kin.position_base_to_foot_in_base_frame(3, &q);
        assert_relative_eq!(foot, Vector3::new(-0.3, -0.2, -0.5), epsilon = 1e-12);
    }

    #[test]
    fn straight_leg_jacobian() {
        let kin = QuadrupedKinematics::default();
        let j = kin.leg_jacobian(0, &JointCoordinates::zeros());
        // HAA swings the foot sideways, HFE and KFE swing it fore/aft.
        assert_relative_eq!(j[(1, 0)], 0.5, epsilon = 1e-12);
        assert_relative_eq!(j[(0, 1)], -0.5, epsilon = 1e-12);
        assert_relative_eq!(j[(0, 2)], -0.25, epsilon = 1e-12);
        assert_relative_eq!(j.row(2).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn velocity_matches_finite_difference() {
        let kin = QuadrupedKinematics::default();
        let q = JointCoordinates::from_fn(|i, _| 0.1 * (i as f64 + 1.0).sin());
        let dq = JointCoordinates::from_fn(|i, _| 0.3 * (i as f64 * 0.7).cos());
        let h = 1e-6;

        for leg in 0..4 {
            let v = kin.foot_velocity_relative_to_base_in_base_frame(leg, &q, &dq);
            let forward = kin.position_base_to_foot_in_base_frame(leg, &(q + dq * h));
            let backward = kin.position_base_to_foot_in_base_frame(leg, &(q - dq * h));
            let numeric = (forward - backward) / (2.0 * h);
            assert_relative_eq!(v, numeric, epsilon = 1e-6);
        }
    }

    #[test]
    fn legs_are_independent() {
        let kin = QuadrupedKinematics::default();
        let mut q = JointCoordinates::zeros();
        q[4] = 0.5;
        let lf = kin.position_base_to_foot_in_base_frame(0, &q);
        assert_relative_eq!(lf, Vector3::new(0.3, 0.2, -0.5), epsilon = 1e-12);
    }

    #[test]
    fn boxed_clones() {
        let kin: Box<dyn KinematicsModel> = Box::new(QuadrupedKinematics::default());
        let copy = kin.clone();
        let q = JointCoordinates::zeros();
        assert_eq!(
            kin.position_base_to_foot_in_base_frame(1, &q),
            copy.position_base_to_foot_in_base_frame(1, &q)
        );

        let com: Box<dyn ComModel> = Box::new(PointMassComModel::new(12.5));
        assert_relative_eq!(com.clone().total_mass(), 12.5);
    }
}

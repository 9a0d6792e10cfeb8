//! State and input layout of the switched CoM-kinematics model.
//!
//! ```text
//! x = [Θ_xyz(3), p_base(3), ω_local(3), v_local(3), q_joints(12)]   (24)
//! u = [f_contact(3 × 4), q̇_joints(12)]                              (24)
//! ```
//!
//! Base twist is expressed in the base frame, contact forces in the base
//! frame, joints ordered per leg (HAA, HFE, KFE).

use nalgebra::{DVector, Matrix3, Rotation3, SVector, Vector3};

/// Number of contact points (legs).
pub const NUM_CONTACT_POINTS: usize = 4;
/// Actuated joints per leg.
pub const JOINTS_PER_LEG: usize = 3;
/// Total actuated joints.
pub const JOINT_COORDINATES: usize = JOINTS_PER_LEG * NUM_CONTACT_POINTS;
/// Euler angles, position, local angular and linear velocity.
pub const BASE_COORDINATES: usize = 12;
pub const STATE_DIM: usize = BASE_COORDINATES + JOINT_COORDINATES;
pub const INPUT_DIM: usize = 3 * NUM_CONTACT_POINTS + JOINT_COORDINATES;

/// Standard gravity magnitude (m/s²).
pub const GRAVITY: f64 = 9.81;

/// One value per leg in LF, RF, LH, RH order.
pub type FeetArray<T> = [T; NUM_CONTACT_POINTS];

/// All joint positions or velocities.
pub type JointCoordinates = SVector<f64, JOINT_COORDINATES>;

/// Base orientation as XYZ Euler angles.
pub fn euler_xyz(x: &DVector<f64>) -> Vector3<f64> {
    x.fixed_rows::<3>(0).into()
}

/// Base position in the origin frame.
pub fn base_position(x: &DVector<f64>) -> Vector3<f64> {
    x.fixed_rows::<3>(3).into()
}

/// Base angular velocity in the base frame.
pub fn base_local_angular_velocity(x: &DVector<f64>) -> Vector3<f64> {
    x.fixed_rows::<3>(6).into()
}

/// Base linear velocity in the base frame.
pub fn base_local_linear_velocity(x: &DVector<f64>) -> Vector3<f64> {
    x.fixed_rows::<3>(9).into()
}

pub fn joint_positions(x: &DVector<f64>) -> JointCoordinates {
    x.fixed_rows::<JOINT_COORDINATES>(BASE_COORDINATES).into()
}

/// Contact force of `leg`, base frame.
pub fn contact_force(u: &DVector<f64>, leg: usize) -> Vector3<f64> {
    u.fixed_rows::<3>(3 * leg).into()
}

pub fn joint_velocities(u: &DVector<f64>) -> JointCoordinates {
    u.fixed_rows::<JOINT_COORDINATES>(3 * NUM_CONTACT_POINTS).into()
}

/// Rotation taking base-frame vectors to the origin frame, `R = Rx · Ry · Rz`.
pub fn rotation_matrix_base_to_origin(euler_xyz: &Vector3<f64>) -> Matrix3<f64> {
    let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), euler_xyz.x);
    let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), euler_xyz.y);
    let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), euler_xyz.z);
    (rx * ry * rz).into_inner()
}

/// Structured view of a state vector.
#[derive(Clone, Debug, PartialEq)]
pub struct ComKinoState {
    /// XYZ Euler angles (radians).
    pub euler_xyz: Vector3<f64>,
    /// Base position in the origin frame (meters).
    pub position: Vector3<f64>,
    /// Angular velocity in the base frame (rad/s).
    pub local_angular_velocity: Vector3<f64>,
    /// Linear velocity in the base frame (m/s).
    pub local_linear_velocity: Vector3<f64>,
    pub joint_positions: JointCoordinates,
}

impl Default for ComKinoState {
    fn default() -> Self {
        Self {
            euler_xyz: Vector3::zeros(),
            position: Vector3::zeros(),
            local_angular_velocity: Vector3::zeros(),
            local_linear_velocity: Vector3::zeros(),
            joint_positions: JointCoordinates::zeros(),
        }
    }
}

impl ComKinoState {
    /// Pack into the 24-element state vector.
    pub fn to_state_vector(&self) -> DVector<f64> {
        let mut x = DVector::zeros(STATE_DIM);
        x.fixed_rows_mut::<3>(0).copy_from(&self.euler_xyz);
        x.fixed_rows_mut::<3>(3).copy_from(&self.position);
        x.fixed_rows_mut::<3>(6).copy_from(&self.local_angular_velocity);
        x.fixed_rows_mut::<3>(9).copy_from(&self.local_linear_velocity);
        x.fixed_rows_mut::<JOINT_COORDINATES>(BASE_COORDINATES)
            .copy_from(&self.joint_positions);
        x
    }

    /// Unpack from a 24-element state vector.
    pub fn from_state_vector(x: &DVector<f64>) -> Self {
        Self {
            euler_xyz: euler_xyz(x),
            position: base_position(x),
            local_angular_velocity: base_local_angular_velocity(x),
            local_linear_velocity: base_local_linear_velocity(x),
            joint_positions: joint_positions(x),
        }
    }
}

/// Structured view of an input vector.
#[derive(Clone, Debug, PartialEq)]
pub struct ComKinoInput {
    /// Contact force per leg, base frame (N).
    pub contact_forces: FeetArray<Vector3<f64>>,
    pub joint_velocities: JointCoordinates,
}

impl Default for ComKinoInput {
    fn default() -> Self {
        Self {
            contact_forces: [Vector3::zeros(); NUM_CONTACT_POINTS],
            joint_velocities: JointCoordinates::zeros(),
        }
    }
}

impl ComKinoInput {
    /// Pack into the 24-element input vector.
    pub fn to_input_vector(&self) -> DVector<f64> {
        let mut u = DVector::zeros(INPUT_DIM);
        for (leg, force) in self.contact_forces.iter().enumerate() {
            u.fixed_rows_mut::<3>(3 * leg).copy_from(force);
        }
        u.fixed_rows_mut::<JOINT_COORDINATES>(3 * NUM_CONTACT_POINTS)
            .copy_from(&self.joint_velocities);
        u
    }

    /// Unpack from a 24-element input vector.
    pub fn from_input_vector(u: &DVector<f64>) -> Self {
        Self {
            contact_forces: std::array::from_fn(|leg| contact_force(u, leg)),
            joint_velocities: joint_velocities(u),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn dimensions() {
        assert_eq!(STATE_DIM, 24);
        assert_eq!(INPUT_DIM, 24);
    }

    #[test]
    fn state_roundtrip() {
        let state = ComKinoState {
            euler_xyz: Vector3::new(0.1, -0.05, 0.3),
            position: Vector3::new(1.0, 2.0, 0.45),
            local_angular_velocity: Vector3::new(0.0, 0.0, 0.5),
            local_linear_velocity: Vector3::new(0.3, 0.0, 0.0),
            joint_positions: JointCoordinates::from_fn(|i, _| 0.1 * i as f64),
        };
        let x = state.to_state_vector();
        assert_eq!(x.len(), STATE_DIM);
        assert_relative_eq!(x[5], 0.45);
        assert_relative_eq!(x[BASE_COORDINATES + 3], 0.3);
        assert_eq!(ComKinoState::from_state_vector(&x), state);
    }

    #[test]
    fn input_layout() {
        let mut input = ComKinoInput::default();
        input.contact_forces[2] = Vector3::new(1.0, 2.0, 3.0);
        input.joint_velocities[0] = -1.0;
        let u = input.to_input_vector();
        assert_relative_eq!(u[8], 3.0);
        assert_relative_eq!(u[12], -1.0);
        assert_eq!(ComKinoInput::from_input_vector(&u), input);
    }

    #[test]
    fn yaw_rotation_maps_x_to_y() {
        let r = rotation_matrix_base_to_origin(&Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2));
        let v = r * Vector3::x();
        assert_relative_eq!(v, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn rotation_is_orthonormal() {
        let r = rotation_matrix_base_to_origin(&Vector3::new(0.3, -0.2, 1.1));
        assert_relative_eq!(r * r.transpose(), Matrix3::identity(), epsilon = 1e-12);
    }
}

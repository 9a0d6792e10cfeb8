//! Weighted tracking of base, joint, foot and contact-force targets.
//!
//! The residual compares features computed from the current state and input
//! against the same features computed from the desired trajectory:
//!
//! ```text
//! r = (targets(x, u) - targets(x_ref, u_ref)) ⊙ √w
//! ```
//!
//! Feature layout (60 entries):
//!
//! ```text
//! base: euler_xyz(3) com_position(3) com_angular_velocity(3) com_linear_velocity(3)
//! leg:  joint_position(3) foot_position(3) foot_velocity(3) contact_force(3)   × 4
//! ```
//!
//! Base velocities are expressed in the origin frame; foot quantities in the
//! base frame.

use std::sync::Arc;

use nalgebra::{DVector, Vector3};

use strider_core::config::TrackingWeights;
use strider_core::error::ConfigError;
use strider_core::traits::{ComModel, ContactFlagProvider, DesiredTrajectory, KinematicsModel};
use strider_core::types::{
    FeetArray, INPUT_DIM, JOINTS_PER_LEG, NUM_CONTACT_POINTS, STATE_DIM, base_local_angular_velocity,
    base_local_linear_velocity, base_position, contact_force, euler_xyz, joint_positions,
    joint_velocities, rotation_matrix_base_to_origin,
};

use crate::dynamics::weight_compensating_input;
use crate::gauss_newton::StateInputCostFunction;

pub const BASE_TARGETS: usize = 12;
pub const LEG_TARGETS: usize = 12;
pub const COST_VECTOR_LENGTH: usize = BASE_TARGETS + NUM_CONTACT_POINTS * LEG_TARGETS;

// ---------------------------------------------------------------------------
// CostElements
// ---------------------------------------------------------------------------

/// Structured view of the feature vector.
#[derive(Clone, Debug, PartialEq)]
pub struct CostElements {
    pub euler_xyz: Vector3<f64>,
    pub com_position: Vector3<f64>,
    pub com_angular_velocity: Vector3<f64>,
    pub com_linear_velocity: Vector3<f64>,
    pub joint_position: FeetArray<Vector3<f64>>,
    pub foot_position: FeetArray<Vector3<f64>>,
    pub foot_velocity: FeetArray<Vector3<f64>>,
    pub contact_force: FeetArray<Vector3<f64>>,
}

impl Default for CostElements {
    fn default() -> Self {
        let zeros = [Vector3::zeros(); NUM_CONTACT_POINTS];
        Self {
            euler_xyz: Vector3::zeros(),
            com_position: Vector3::zeros(),
            com_angular_velocity: Vector3::zeros(),
            com_linear_velocity: Vector3::zeros(),
            joint_position: zeros,
            foot_position: zeros,
            foot_velocity: zeros,
            contact_force: zeros,
        }
    }
}

impl CostElements {
    /// Same weight on every leg.
    pub fn from_weights(weights: &TrackingWeights) -> Self {
        Self {
            euler_xyz: weights.euler_xyz,
            com_position: weights.com_position,
            com_angular_velocity: weights.com_angular_velocity,
            com_linear_velocity: weights.com_linear_velocity,
            joint_position: [weights.joint_position; NUM_CONTACT_POINTS],
            foot_position: [weights.foot_position; NUM_CONTACT_POINTS],
            foot_velocity: [weights.foot_velocity; NUM_CONTACT_POINTS],
            contact_force: [weights.contact_force; NUM_CONTACT_POINTS],
        }
    }

    /// Features of `state` and `input`.
    pub fn from_state_input(
        state: &DVector<f64>,
        input: &DVector<f64>,
        kinematics: &dyn KinematicsModel,
    ) -> Self {
        let euler = euler_xyz(state);
        let o_r_b = rotation_matrix_base_to_origin(&euler);
        let q = joint_positions(state);
        let dq = joint_velocities(input);

        Self {
            euler_xyz: euler,
            com_position: base_position(state),
            com_angular_velocity: o_r_b * base_local_angular_velocity(state),
            com_linear_velocity: o_r_b * base_local_linear_velocity(state),
            joint_position: std::array::from_fn(|leg| {
                q.fixed_rows::<JOINTS_PER_LEG>(JOINTS_PER_LEG * leg).into()
            }),
            foot_position: std::array::from_fn(|leg| {
                kinematics.position_base_to_foot_in_base_frame(leg, &q)
            }),
            foot_velocity: std::array::from_fn(|leg| {
                kinematics.foot_velocity_relative_to_base_in_base_frame(leg, &q, &dq)
            }),
            contact_force: std::array::from_fn(|leg| contact_force(input, leg)),
        }
    }

    /// Flatten in feature order.
    pub fn to_vector(&self) -> DVector<f64> {
        let mut v = DVector::zeros(COST_VECTOR_LENGTH);
        let base = [
            &self.euler_xyz,
            &self.com_position,
            &self.com_angular_velocity,
            &self.com_linear_velocity,
        ];
        for (i, block) in base.into_iter().enumerate() {
            v.fixed_rows_mut::<3>(3 * i).copy_from(block);
        }
        for leg in 0..NUM_CONTACT_POINTS {
            let offset = BASE_TARGETS + leg * LEG_TARGETS;
            let blocks = [
                &self.joint_position[leg],
                &self.foot_position[leg],
                &self.foot_velocity[leg],
                &self.contact_force[leg],
            ];
            for (i, block) in blocks.into_iter().enumerate() {
                v.fixed_rows_mut::<3>(offset + 3 * i).copy_from(block);
            }
        }
        v
    }
}

#[allow(clippy::float_cmp)]
fn is_exactly_zero(v: &DVector<f64>) -> bool {
    v.iter().all(|&x| x == 0.0)
}

// ---------------------------------------------------------------------------
// MotionTrackingCost
// ---------------------------------------------------------------------------

/// Quadratic tracking cost on the state-input features.
///
/// Holds its own copies of the kinematics and CoM models. The numeric
/// kinematics computes parameters; the differentiable one is used inside the
/// residual.
#[derive(Clone)]
pub struct MotionTrackingCost {
    sqrt_weights: DVector<f64>,
    contact_flags: Arc<dyn ContactFlagProvider>,
    kinematics: Box<dyn KinematicsModel>,
    ad_kinematics: Box<dyn KinematicsModel>,
    com_model: Box<dyn ComModel>,
}

impl MotionTrackingCost {
    pub fn new(
        weights: &TrackingWeights,
        contact_flags: Arc<dyn ContactFlagProvider>,
        kinematics: &dyn KinematicsModel,
        ad_kinematics: &dyn KinematicsModel,
        com_model: &dyn ComModel,
    ) -> Result<Self, ConfigError> {
        weights.validate()?;
        Ok(Self {
            sqrt_weights: CostElements::from_weights(weights).to_vector().map(f64::sqrt),
            contact_flags,
            kinematics: kinematics.clone_box(),
            ad_kinematics: ad_kinematics.clone_box(),
            com_model: com_model.clone_box(),
        })
    }

    pub const fn sqrt_weights(&self) -> &DVector<f64> {
        &self.sqrt_weights
    }

    /// Desired input at `time`, or the weight-compensating input for the
    /// scheduled stance when the desired input is exactly zero.
    pub fn reference_input(&self, time: f64, desired: &dyn DesiredTrajectory) -> DVector<f64> {
        let u_ref = desired.desired_input(time);
        if !is_exactly_zero(&u_ref) {
            return u_ref;
        }
        let x_ref = desired.desired_state(time);
        let flags = self.contact_flags.contact_flags(time);
        weight_compensating_input(self.com_model.as_ref(), &flags, &euler_xyz(&x_ref))
    }
}

impl StateInputCostFunction for MotionTrackingCost {
    fn state_dim(&self) -> usize {
        STATE_DIM
    }

    fn input_dim(&self) -> usize {
        INPUT_DIM
    }

    fn cost_vector_length(&self) -> usize {
        COST_VECTOR_LENGTH
    }

    fn get_parameters(&self, time: f64, desired: &dyn DesiredTrajectory) -> DVector<f64> {
        let x_ref = desired.desired_state(time);
        let u_ref = self.reference_input(time, desired);
        CostElements::from_state_input(&x_ref, &u_ref, self.kinematics.as_ref()).to_vector()
    }

    fn cost_vector(
        &self,
        _time: f64,
        state: &DVector<f64>,
        input: &DVector<f64>,
        parameters: &DVector<f64>,
    ) -> DVector<f64> {
        let targets =
            CostElements::from_state_input(state, input, self.ad_kinematics.as_ref()).to_vector();
        (targets - parameters).component_mul(&self.sqrt_weights)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::models::{PointMassComModel, QuadrupedKinematics};
    use crate::trajectory::CostDesiredTrajectories;
    use strider_core::modes::ContactFlags;
    use strider_core::types::{ComKinoInput, ComKinoState, GRAVITY};

    struct Fixed(ContactFlags);

    impl ContactFlagProvider for Fixed {
        fn contact_flags(&self, _time: f64) -> ContactFlags {
            self.0
        }
    }

    fn cost(flags: ContactFlags) -> MotionTrackingCost {
        let kin = QuadrupedKinematics::default();
        MotionTrackingCost::new(
            &TrackingWeights::default(),
            Arc::new(Fixed(flags)),
            &kin,
            &kin,
            &PointMassComModel::new(20.0),
        )
        .unwrap()
    }

    fn nominal_state() -> DVector<f64> {
        let mut state = ComKinoState {
            euler_xyz: Vector3::new(0.05, -0.02, 0.4),
            position: Vector3::new(0.1, -0.2, 0.45),
            local_angular_velocity: Vector3::new(0.0, 0.1, 0.3),
            local_linear_velocity: Vector3::new(0.5, 0.0, 0.0),
            ..ComKinoState::default()
        };
        for leg in 0..NUM_CONTACT_POINTS {
            state.joint_positions[3 * leg + 1] = 0.6;
            state.joint_positions[3 * leg + 2] = -1.2;
        }
        state.to_state_vector()
    }

    fn nominal_input() -> DVector<f64> {
        let mut input = ComKinoInput::default();
        input.contact_forces = [Vector3::new(1.0, 0.0, 40.0); NUM_CONTACT_POINTS];
        input.joint_velocities[0] = 0.2;
        input.to_input_vector()
    }

    #[test]
    fn layout_constants() {
        assert_eq!(COST_VECTOR_LENGTH, 60);
        assert_eq!(cost([true; 4]).cost_vector_length(), 60);
    }

    #[test]
    fn sqrt_weights_in_feature_order() {
        let c = cost([true; 4]);
        let w = c.sqrt_weights();
        assert_relative_eq!(w[0], 10.0);
        assert_relative_eq!(w[5], 1000.0_f64.sqrt());
        // LF joint HAA, then RH contact force z.
        assert_relative_eq!(w[12], 2.0_f64.sqrt());
        assert_relative_eq!(w[59], 0.1, epsilon = 1e-12);
    }

    #[test]
    fn negative_weight_rejected() {
        let weights = TrackingWeights {
            foot_velocity: Vector3::new(1.0, -1.0, 1.0),
            ..TrackingWeights::default()
        };
        let kin = QuadrupedKinematics::default();
        let err = MotionTrackingCost::new(
            &weights,
            Arc::new(Fixed([true; 4])),
            &kin,
            &kin,
            &PointMassComModel::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            ConfigError::InvalidWeight {
                field: "foot_velocity_y",
                ..
            }
        ));
    }

    #[test]
    fn zero_residual_on_reference() {
        let c = cost([true; 4]);
        let (x, u) = (nominal_state(), nominal_input());
        let desired = CostDesiredTrajectories::constant(x.clone(), u.clone());
        let p = c.get_parameters(0.3, &desired);
        let r = c.cost_vector(0.3, &x, &u, &p);
        assert_relative_eq!(r.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn base_velocities_in_origin_frame() {
        let x = nominal_state();
        let kin = QuadrupedKinematics::default();
        let features = CostElements::from_state_input(&x, &nominal_input(), &kin);
        let o_r_b = rotation_matrix_base_to_origin(&euler_xyz(&x));
        assert_relative_eq!(
            features.com_linear_velocity,
            o_r_b * Vector3::new(0.5, 0.0, 0.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(features.com_linear_velocity.norm(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn zero_desired_input_uses_weight_compensation() {
        let c = cost([true, false, false, true]);
        let x = nominal_state();
        let desired = CostDesiredTrajectories::constant(x.clone(), DVector::zeros(INPUT_DIM));
        let p = c.get_parameters(1.0, &desired);

        let o_r_b = rotation_matrix_base_to_origin(&euler_xyz(&x));
        let force_block = |leg: usize| -> Vector3<f64> {
            let offset = BASE_TARGETS + leg * LEG_TARGETS + 9;
            p.fixed_rows::<3>(offset).into()
        };
        let world_total = o_r_b * (force_block(0) + force_block(3));
        assert_relative_eq!(world_total, Vector3::new(0.0, 0.0, 20.0 * GRAVITY), epsilon = 1e-9);
        assert_eq!(force_block(1), Vector3::zeros());
        assert_eq!(force_block(2), Vector3::zeros());
    }

    #[test]
    fn nonzero_desired_input_kept() {
        let c = cost([true; 4]);
        let desired = CostDesiredTrajectories::constant(nominal_state(), nominal_input());
        assert_eq!(c.reference_input(0.0, &desired), nominal_input());
    }

    #[test]
    fn zero_weight_removes_contribution() {
        let weights = TrackingWeights {
            contact_force: Vector3::zeros(),
            ..TrackingWeights::default()
        };
        let kin = QuadrupedKinematics::default();
        let c = MotionTrackingCost::new(
            &weights,
            Arc::new(Fixed([true; 4])),
            &kin,
            &kin,
            &PointMassComModel::default(),
        )
        .unwrap();
        let x = nominal_state();
        let desired = CostDesiredTrajectories::constant(x.clone(), nominal_input());
        let p = c.get_parameters(0.0, &desired);

        let mut u = nominal_input();
        u[2] += 100.0;
        let r = c.cost_vector(0.0, &x, &u, &p);
        assert_relative_eq!(r.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn clones_are_independent_and_equal() {
        let c = cost([true; 4]);
        let copy = c.clone();
        let (x, u) = (nominal_state(), nominal_input());
        let desired = CostDesiredTrajectories::constant(DVector::zeros(STATE_DIM), u.clone());
        let p = c.get_parameters(0.0, &desired);
        assert_eq!(c.cost_vector(0.0, &x, &u, &p), copy.cost_vector(0.0, &x, &u, &p));
    }
}

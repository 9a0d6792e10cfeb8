//! Static force distribution used as the default input reference.

use nalgebra::{DVector, Vector3};

use strider_core::modes::{ContactFlags, stance_leg_count};
use strider_core::traits::ComModel;
use strider_core::types::{ComKinoInput, GRAVITY, rotation_matrix_base_to_origin};

/// Input that holds the robot still: body weight split evenly over the
/// stance legs, contact forces in the base frame, zero joint velocities.
///
/// With no leg in stance every force is zero.
pub fn weight_compensating_input(
    com_model: &dyn ComModel,
    contact_flags: &ContactFlags,
    euler_xyz: &Vector3<f64>,
) -> DVector<f64> {
    let mut input = ComKinoInput::default();
    let stance_legs = stance_leg_count(contact_flags);
    if stance_legs > 0 {
        #[allow(clippy::cast_precision_loss)]
        let per_leg = com_model.total_mass() * GRAVITY / stance_legs as f64;
        let o_r_b = rotation_matrix_base_to_origin(euler_xyz);
        let force_in_base = o_r_b.transpose() * Vector3::new(0.0, 0.0, per_leg);
        for (force, &in_contact) in input.contact_forces.iter_mut().zip(contact_flags) {
            if in_contact {
                *force = force_in_base;
            }
        }
    }
    input.to_input_vector()
}

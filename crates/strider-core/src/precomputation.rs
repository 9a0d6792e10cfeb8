//! Request flags shared between the solver and its pre-computation modules.
//!
//! Before evaluating dynamics, costs or constraints at a point the solver
//! announces what it is about to need through a [`Request`] set. A
//! [`PreComputation`] prepares shared quantities once instead of every
//! consumer recomputing them.

use std::sync::Arc;

use bitflags::bitflags;
use nalgebra::DVector;

use crate::modes::{ContactFlags, DEFAULT_MODE, mode_number_to_contact_flags};
use crate::traits::ContactFlagProvider;

bitflags! {
    /// What the solver is about to evaluate.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Request: u8 {
        const DYNAMICS = 1;
        const COST = 2;
        const CONSTRAINT = 4;
        const SOFT_CONSTRAINT = 8;
        /// Derivatives are requested in addition to values.
        const APPROXIMATION = 16;
    }
}

/// Per-point cache filled ahead of dynamics/cost/constraint evaluation.
pub trait PreComputation: Send {
    /// Intermediate time point.
    fn request(
        &mut self,
        _flags: Request,
        _time: f64,
        _state: &DVector<f64>,
        _input: &DVector<f64>,
    ) {
    }

    /// Just before a mode switch.
    fn request_pre_jump(&mut self, _flags: Request, _time: f64, _state: &DVector<f64>) {}

    /// Final time of the horizon.
    fn request_final(&mut self, _flags: Request, _time: f64, _state: &DVector<f64>) {}

    fn clone_box(&self) -> Box<dyn PreComputation>;
}

impl Clone for Box<dyn PreComputation> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Caches the scheduled stance whenever a consumer of it is requested.
#[derive(Clone)]
pub struct ContactPreComputation {
    provider: Arc<dyn ContactFlagProvider>,
    time: f64,
    contact_flags: ContactFlags,
}

impl ContactPreComputation {
    const STANCE_CONSUMERS: Request = Request::DYNAMICS
        .union(Request::COST)
        .union(Request::CONSTRAINT);

    pub fn new(provider: Arc<dyn ContactFlagProvider>) -> Self {
        Self {
            provider,
            time: f64::NAN,
            contact_flags: mode_number_to_contact_flags(DEFAULT_MODE),
        }
    }

    /// Time of the last refresh (`NaN` before the first one).
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// Stance cached by the last refresh.
    pub const fn contact_flags(&self) -> &ContactFlags {
        &self.contact_flags
    }

    fn refresh(&mut self, flags: Request, time: f64) {
        if flags.intersects(Self::STANCE_CONSUMERS) {
            self.time = time;
            self.contact_flags = self.provider.contact_flags(time);
        }
    }
}

impl PreComputation for ContactPreComputation {
    fn request(&mut self, flags: Request, time: f64, _state: &DVector<f64>, _input: &DVector<f64>) {
        self.refresh(flags, time);
    }

    fn request_pre_jump(&mut self, flags: Request, time: f64, _state: &DVector<f64>) {
        self.refresh(flags, time);
    }

    fn request_final(&mut self, flags: Request, time: f64, _state: &DVector<f64>) {
        self.refresh(flags, time);
    }

    fn clone_box(&self) -> Box<dyn PreComputation> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::{LF_RH, STANCE};

    struct SwitchAt(f64);

    impl ContactFlagProvider for SwitchAt {
        fn contact_flags(&self, time: f64) -> ContactFlags {
            if time < self.0 {
                mode_number_to_contact_flags(STANCE)
            } else {
                mode_number_to_contact_flags(LF_RH)
            }
        }
    }

    #[test]
    fn request_combination() {
        let r = Request::COST | Request::APPROXIMATION;
        assert!(r.contains(Request::COST));
        assert!(!r.contains(Request::DYNAMICS));
        assert_eq!(r.bits(), 18);
    }

    #[test]
    fn refreshes_on_cost_request() {
        let mut pre = ContactPreComputation::new(Arc::new(SwitchAt(1.0)));
        let x = DVector::zeros(1);
        pre.request(Request::COST, 1.5, &x, &x);
        assert_eq!(pre.contact_flags(), &[true, false, false, true]);
        assert!((pre.time() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn ignores_unrelated_requests() {
        let mut pre = ContactPreComputation::new(Arc::new(SwitchAt(1.0)));
        let x = DVector::zeros(1);
        pre.request(Request::SOFT_CONSTRAINT | Request::APPROXIMATION, 2.0, &x, &x);
        assert!(pre.time().is_nan());
        assert_eq!(pre.contact_flags(), &[true; 4]);
    }

    #[test]
    fn final_request_refreshes_only_the_receiver() {
        let mut pre = ContactPreComputation::new(Arc::new(SwitchAt(1.0)));
        let copy = pre.clone();
        pre.request_final(Request::DYNAMICS, 3.0, &DVector::zeros(1));
        assert_eq!(pre.contact_flags(), &[true, false, false, true]);
        assert_eq!(copy.contact_flags(), &[true; 4]);
    }
}

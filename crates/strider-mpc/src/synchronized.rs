//! Hooks run by the control thread around each solver call.

use nalgebra::DVector;

use strider_core::error::StriderError;

/// Solve window and measured state for the cycle about to run.
#[derive(Clone, Copy, Debug)]
pub struct SolveContext<'a> {
    pub init_time: f64,
    pub final_time: f64,
    pub current_state: &'a DVector<f64>,
}

impl<'a> SolveContext<'a> {
    pub const fn new(init_time: f64, final_time: f64, current_state: &'a DVector<f64>) -> Self {
        Self {
            init_time,
            final_time,
            current_state,
        }
    }
}

/// A module synchronized with the solver loop.
///
/// `pre_solver_run` is called exactly once per cycle before the solver reads
/// any shared state; `post_solver_run` after it returns.
pub trait SolverSynchronizedModule: Send + Sync {
    fn pre_solver_run(
        &self,
        init_time: f64,
        final_time: f64,
        current_state: &DVector<f64>,
    ) -> Result<(), StriderError>;

    fn post_solver_run(&self) {}
}

/// Run `pre_solver_run` on every module, stopping at the first failure.
pub fn pre_solver_run_all(
    modules: &[&dyn SolverSynchronizedModule],
    init_time: f64,
    final_time: f64,
    current_state: &DVector<f64>,
) -> Result<(), StriderError> {
    for module in modules {
        module.pre_solver_run(init_time, final_time, current_state)?;
    }
    Ok(())
}

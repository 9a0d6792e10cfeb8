//! Contact-mode scheduling and motion tracking for legged MPC.
//!
//! 1. **Gaits**: periodic contact patterns and presets (stand, trot, walk, bound)
//! 2. **Gait schedule**: time-indexed gait segments expanded into mode schedules
//! 3. **Gait receiver**: last-writer-wins command buffer applied once per solver cycle
//! 4. **Tracking cost**: weighted feature residual with a Gauss-Newton approximation
//!
//! # Threading
//!
//! Producers hand commands to a [`GaitReceiver`] from any thread. The control
//! thread calls `pre_solver_run` once per cycle, which applies the latest
//! command to the shared [`LockableGaitSchedule`] before the solver reads it.

pub mod dynamics;
pub mod gait;
pub mod gauss_newton;
pub mod lockable;
pub mod models;
pub mod receiver;
pub mod schedule;
pub mod synchronized;
pub mod tracking;
pub mod trajectory;

pub use dynamics::weight_compensating_input;
pub use gait::{Gait, GaitType, ModeSequenceTemplate};
pub use gauss_newton::{
    DerivativeEvaluator, Differentiator, FiniteDifference, GaussNewtonCost,
    ScalarFunctionQuadraticApproximation, StateInputCostFunction,
};
pub use lockable::LockableGaitSchedule;
pub use models::{PointMassComModel, QuadrupedKinematics, compute_leg_jacobian};
pub use receiver::{GaitReceiver, PendingAction, ReceiverStats};
pub use schedule::{GaitSchedule, ModeSchedule, ScheduledSegment};
pub use synchronized::{SolveContext, SolverSynchronizedModule, pre_solver_run_all};
pub use tracking::{COST_VECTOR_LENGTH, CostElements, MotionTrackingCost};
pub use trajectory::CostDesiredTrajectories;

//! Buffered gait commands, applied once per control cycle.
//!
//! Producer threads call the command handlers at any time. Each handler
//! overwrites the single pending slot; the control thread applies whatever
//! is buffered when it calls [`GaitReceiver::apply_pending`] (or
//! `pre_solver_run`) at the top of the next cycle.
//!
//! Lock order is slot, then schedule. Producers only ever take the slot.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use nalgebra::DVector;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use strider_core::error::{ScheduleError, StriderError};

use crate::gait::{Gait, ModeSequenceTemplate};
use crate::lockable::LockableGaitSchedule;
use crate::schedule::GaitSchedule;
use crate::synchronized::{SolveContext, SolverSynchronizedModule};

// ---------------------------------------------------------------------------
// PendingAction
// ---------------------------------------------------------------------------

/// A schedule update waiting for the next cycle.
#[derive(Clone, Debug, PartialEq)]
pub enum PendingAction {
    /// Start `gait` at `time`; `None` means the final time of the cycle
    /// that applies it.
    SetAfter { gait: Gait, time: Option<f64> },
    /// Start `gait` at exactly `time`.
    SetAt { gait: Gait, time: f64 },
    /// Several gaits at their own start times.
    SetSequence {
        gaits: Vec<Gait>,
        start_times: Vec<f64>,
    },
}

impl PendingAction {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetAfter { .. } => "set_after",
            Self::SetAt { .. } => "set_at",
            Self::SetSequence { .. } => "set_sequence",
        }
    }

    /// Checks everything that does not depend on the solve context.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        match self {
            Self::SetAfter { time: None, .. } => Ok(()),
            Self::SetAfter {
                time: Some(time), ..
            }
            | Self::SetAt { time, .. } => finite(*time),
            Self::SetSequence { gaits, start_times } => {
                if gaits.len() != start_times.len() {
                    return Err(ScheduleError::SequenceLengthMismatch {
                        gaits: gaits.len(),
                        start_times: start_times.len(),
                    });
                }
                start_times.iter().try_for_each(|&t| finite(t))
            }
        }
    }

    /// Apply to `schedule`. Nothing is mutated when this fails.
    pub fn apply(
        &self,
        schedule: &mut GaitSchedule,
        ctx: &SolveContext<'_>,
    ) -> Result<(), ScheduleError> {
        self.validate()?;
        match self {
            Self::SetAfter { gait, time } => {
                schedule.set_gait_after_time(gait.clone(), time.unwrap_or(ctx.final_time))
            }
            Self::SetAt { gait, time } => schedule.set_gait_at_time(gait.clone(), *time),
            Self::SetSequence { gaits, start_times } => {
                schedule.set_gait_sequence_at_time(gaits, start_times)
            }
        }
    }
}

fn finite(time: f64) -> Result<(), ScheduleError> {
    if time.is_finite() {
        Ok(())
    } else {
        Err(ScheduleError::InvalidStartTime(time))
    }
}

// ---------------------------------------------------------------------------
// ReceiverStats
// ---------------------------------------------------------------------------

/// Counters since construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Commands accepted into the slot.
    pub received: u64,
    /// Commands replaced before they were applied.
    pub overwritten: u64,
    pub applied: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    overwritten: AtomicU64,
    applied: AtomicU64,
    failed: AtomicU64,
}

// ---------------------------------------------------------------------------
// GaitReceiver
// ---------------------------------------------------------------------------

/// Single-slot, last-writer-wins buffer in front of a shared schedule.
#[derive(Debug)]
pub struct GaitReceiver {
    schedule: Arc<LockableGaitSchedule>,
    slot: Mutex<Option<PendingAction>>,
    /// Fast-path hint; the slot is authoritative.
    pending: AtomicBool,
    counters: Counters,
}

impl GaitReceiver {
    pub fn new(schedule: Arc<LockableGaitSchedule>) -> Self {
        Self {
            schedule,
            slot: Mutex::new(None),
            pending: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    /// Schedule this receiver writes to.
    pub fn schedule(&self) -> &Arc<LockableGaitSchedule> {
        &self.schedule
    }

    /// Buffer `action`, dropping whatever was pending.
    pub fn submit(&self, action: PendingAction) {
        let name = action.name();
        let mut slot = self.slot.lock();
        if let Some(previous) = slot.replace(action) {
            self.counters.overwritten.fetch_add(1, Ordering::Relaxed);
            debug!(
                dropped = previous.name(),
                replacement = name,
                "pending gait command overwritten"
            );
        } else {
            debug!(action = name, "gait command received");
        }
        self.pending.store(true, Ordering::Release);
        self.counters.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Start `gait` at the end of the horizon of the next cycle.
    pub fn set_gait_after_horizon(&self, gait: Gait) {
        self.submit(PendingAction::SetAfter { gait, time: None });
    }

    pub fn set_gait_after_time(&self, gait: Gait, time: f64) {
        self.submit(PendingAction::SetAfter {
            gait,
            time: Some(time),
        });
    }

    pub fn set_gait_at_time(&self, gait: Gait, time: f64) {
        self.submit(PendingAction::SetAt { gait, time });
    }

    pub fn set_gait_sequence(&self, gaits: Vec<Gait>, start_times: Vec<f64>) {
        self.submit(PendingAction::SetSequence { gaits, start_times });
    }

    /// Convert `template` and start it at the end of the next horizon.
    ///
    /// Conversion errors are returned to the producer and nothing is buffered.
    pub fn receive_mode_sequence_template(
        &self,
        template: &ModeSequenceTemplate,
    ) -> Result<(), ScheduleError> {
        let gait = template.to_gait()?;
        self.set_gait_after_horizon(gait);
        Ok(())
    }

    /// Convert `template` and start it at its first switching time.
    pub fn receive_scheduled_mode_sequence_template(
        &self,
        template: &ModeSequenceTemplate,
    ) -> Result<(), ScheduleError> {
        let gait = template.to_gait()?;
        let start = template
            .start_time()
            .ok_or(ScheduleError::TemplateTooShort(0))?;
        self.set_gait_at_time(gait, start);
        Ok(())
    }

    /// Whether a command is waiting. Advisory only.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Copy of the buffered command, if any.
    pub fn pending_action(&self) -> Option<PendingAction> {
        self.slot.lock().clone()
    }

    pub fn stats(&self) -> ReceiverStats {
        ReceiverStats {
            received: self.counters.received.load(Ordering::Relaxed),
            overwritten: self.counters.overwritten.load(Ordering::Relaxed),
            applied: self.counters.applied.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Apply the buffered command, if any, against the schedule.
    ///
    /// Returns `Ok(true)` when a command was applied, `Ok(false)` when none
    /// was pending. A failing command is consumed, logged and returned; the
    /// schedule keeps its previous content.
    pub fn apply_pending(&self, ctx: &SolveContext<'_>) -> Result<bool, ScheduleError> {
        if !self.pending.load(Ordering::Acquire) {
            return Ok(false);
        }

        let mut slot = self.slot.lock();
        self.pending.store(false, Ordering::Release);
        let Some(action) = slot.take() else {
            return Ok(false);
        };

        let result = {
            let mut schedule = self.schedule.lock();
            let result = action.apply(&mut schedule, ctx);
            if result.is_ok() {
                schedule.discard_past(ctx.init_time);
                debug_assert!(schedule.check_invariants().is_ok());
            }
            result
        };
        drop(slot);

        match result {
            Ok(()) => {
                self.counters.applied.fetch_add(1, Ordering::Relaxed);
                log_applied(&action, ctx);
                Ok(true)
            }
            Err(err) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(action = action.name(), error = %err, "gait command rejected");
                Err(err)
            }
        }
    }
}

fn log_applied(action: &PendingAction, ctx: &SolveContext<'_>) {
    match action {
        PendingAction::SetAfter { gait, time } => info!(
            time = time.unwrap_or(ctx.final_time),
            init_time = ctx.init_time,
            "setting new gait after time\n{gait}"
        ),
        PendingAction::SetAt { gait, time } => info!(
            time,
            init_time = ctx.init_time,
            "setting scheduled gait at time\n{gait}"
        ),
        PendingAction::SetSequence { start_times, .. } => info!(
            count = start_times.len(),
            init_time = ctx.init_time,
            "setting gait sequence"
        ),
    }
}

impl SolverSynchronizedModule for GaitReceiver {
    fn pre_solver_run(
        &self,
        init_time: f64,
        final_time: f64,
        current_state: &DVector<f64>,
    ) -> Result<(), StriderError> {
        let ctx = SolveContext::new(init_time, final_time, current_state);
        self.apply_pending(&ctx)?;
        Ok(())
    }
}

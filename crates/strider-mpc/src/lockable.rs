//! Gait schedule shared between the solver and the command receiver.

use parking_lot::{Mutex, MutexGuard};

use strider_core::modes::ContactFlags;
use strider_core::traits::ContactFlagProvider;

use crate::schedule::{GaitSchedule, ModeSchedule};

/// A [`GaitSchedule`] behind a mutex.
///
/// Readers and writers go through [`lock`](Self::lock), so no reader ever
/// observes an update half applied. The lock is not reentrant: do not call
/// the convenience readers while holding a guard.
#[derive(Debug, Default)]
pub struct LockableGaitSchedule {
    inner: Mutex<GaitSchedule>,
}

impl LockableGaitSchedule {
    pub fn new(schedule: GaitSchedule) -> Self {
        Self {
            inner: Mutex::new(schedule),
        }
    }

    /// Exclusive access until the guard drops.
    pub fn lock(&self) -> MutexGuard<'_, GaitSchedule> {
        self.inner.lock()
    }

    pub fn try_lock(&self) -> Option<MutexGuard<'_, GaitSchedule>> {
        self.inner.try_lock()
    }

    /// Run `f` with the schedule locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut GaitSchedule) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Locked [`GaitSchedule::mode_schedule`].
    pub fn mode_schedule(&self, t0: f64, t1: f64) -> ModeSchedule {
        self.inner.lock().mode_schedule(t0, t1)
    }

    /// Copy of the current schedule.
    pub fn snapshot(&self) -> GaitSchedule {
        self.inner.lock().clone()
    }

    /// Direct access; no locking needed with `&mut self`.
    pub fn get_mut(&mut self) -> &mut GaitSchedule {
        self.inner.get_mut()
    }

    pub fn into_inner(self) -> GaitSchedule {
        self.inner.into_inner()
    }
}

impl From<GaitSchedule> for LockableGaitSchedule {
    fn from(schedule: GaitSchedule) -> Self {
        Self::new(schedule)
    }
}

impl ContactFlagProvider for LockableGaitSchedule {
    fn contact_flags(&self, time: f64) -> ContactFlags {
        self.inner.lock().contact_flags(time)
    }
}

//! Time-indexed sequence of gaits.
//!
//! The schedule is an ordered list of segments. Each segment repeats its gait
//! cyclically from its start time until the next segment begins; the last
//! segment repeats indefinitely. Before the first segment the robot is in
//! [`DEFAULT_MODE`].
//!
//! ```text
//! time  ───┬─────────────┬───────────────────────▶
//!          s₀ trot trot  s₁ walk walk walk ...
//! ```
//!
//! Mode changes inside a queried window are reported as events; cycle
//! boundaries count as events even when the mode does not change.

use strider_core::error::ScheduleError;
use strider_core::modes::{ContactFlags, DEFAULT_MODE, ModeNumber, mode_number_to_contact_flags};
use strider_core::traits::ContactFlagProvider;

use crate::gait::Gait;

// ---------------------------------------------------------------------------
// ModeSchedule
// ---------------------------------------------------------------------------

/// Event times and the modes between them over a queried window.
///
/// `mode_sequence[0]` is active before `event_times[0]`, `mode_sequence[i]`
/// between `event_times[i - 1]` and `event_times[i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct ModeSchedule {
    pub event_times: Vec<f64>,
    pub mode_sequence: Vec<ModeNumber>,
}

impl ModeSchedule {
    /// A schedule that stays in one mode.
    pub fn constant(mode: ModeNumber) -> Self {
        Self {
            event_times: Vec::new(),
            mode_sequence: vec![mode],
        }
    }

    /// Mode active at `time`; events are right-continuous.
    pub fn mode_at_time(&self, time: f64) -> ModeNumber {
        let index = self.event_times.partition_point(|&t| t <= time);
        self.mode_sequence[index]
    }

    /// One more mode than events, events strictly increasing.
    pub fn is_well_formed(&self) -> bool {
        self.mode_sequence.len() == self.event_times.len() + 1
            && self.event_times.windows(2).all(|w| w[0] < w[1])
    }
}

/// Upper bound on the events one window may expand to. Horizons span a
/// few gait cycles; anything near this is a caller bug.
const MAX_WINDOW_EVENTS: usize = 100_000;

/// Accumulates events in (t0, t1]. An event at `t0` is already carried by
/// the initial mode.
struct ModeScheduleBuilder {
    t0: f64,
    t1: f64,
    schedule: ModeSchedule,
}

impl ModeScheduleBuilder {
    fn new(t0: f64, t1: f64, initial_mode: ModeNumber) -> Self {
        Self {
            t0,
            t1,
            schedule: ModeSchedule::constant(initial_mode),
        }
    }

    fn push(&mut self, time: f64, mode: ModeNumber) {
        if !(time > self.t0 && time <= self.t1) {
            return;
        }
        debug_assert!(
            self.schedule.event_times.len() < MAX_WINDOW_EVENTS,
            "mode schedule window [{}, {}] expands to too many events",
            self.t0,
            self.t1
        );
        match self.schedule.event_times.last() {
            // Zero-length interval from rounding: the later mode wins.
            Some(&last) if time <= last => {
                if let Some(m) = self.schedule.mode_sequence.last_mut() {
                    *m = mode;
                }
            }
            _ => {
                self.schedule.event_times.push(time);
                self.schedule.mode_sequence.push(mode);
            }
        }
    }

    fn finish(self) -> ModeSchedule {
        self.schedule
    }
}

// ---------------------------------------------------------------------------
// GaitSchedule
// ---------------------------------------------------------------------------

/// A gait and the absolute time it starts repeating from.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledSegment {
    pub start_time: f64,
    pub gait: Gait,
}

/// Index and start time of the gait cycle containing `time`.
///
/// Expects `time >= start`. Recomputes the floor when rounding put the cycle
/// start on the wrong side of `time`.
fn cycle_at(start: f64, duration: f64, time: f64) -> (f64, f64) {
    let mut k = ((time - start) / duration).floor().max(0.0);
    if start + k * duration > time && k > 0.0 {
        k -= 1.0;
    } else if start + (k + 1.0) * duration <= time {
        k += 1.0;
    }
    (k, start + k * duration)
}

/// Ordered gait segments with strictly increasing start times.
#[derive(Clone, Debug, Default)]
pub struct GaitSchedule {
    segments: Vec<ScheduledSegment>,
}

impl GaitSchedule {
    /// Empty schedule: [`DEFAULT_MODE`] at every time.
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Schedule repeating `gait` from `start_time` on.
    pub fn with_gait(gait: Gait, start_time: f64) -> Result<Self, ScheduleError> {
        let mut schedule = Self::new();
        schedule.set_gait_at_time(gait, start_time)?;
        Ok(schedule)
    }

    pub fn segments(&self) -> &[ScheduledSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Index of the segment whose window contains `time`.
    fn active_index(&self, time: f64) -> Option<usize> {
        self.segments
            .partition_point(|s| s.start_time <= time)
            .checked_sub(1)
    }

    /// Mode active at `time`.
    pub fn mode_at_time(&self, time: f64) -> ModeNumber {
        let Some(index) = self.active_index(time) else {
            return DEFAULT_MODE;
        };
        let segment = &self.segments[index];
        let gait = &segment.gait;
        let duration = gait.duration();
        let (_, cycle_start) = cycle_at(segment.start_time, duration, time);
        let phase_index = gait
            .event_phases()
            .partition_point(|&p| cycle_start + p * duration <= time);
        gait.mode_sequence()[phase_index]
    }

    /// Contact flags at `time`, right-continuous at events.
    pub fn contact_flags(&self, time: f64) -> ContactFlags {
        mode_number_to_contact_flags(self.mode_at_time(time))
    }

    /// Event times and modes over `[t0, t1]`.
    ///
    /// The first mode is the one active at `t0`; events after `t0` up to and
    /// including `t1` are reported, so the last mode is the one active at
    /// `t1`. A window that is empty or not finite yields the mode at `t0`
    /// alone. Cost is linear in the number of gait cycles the window covers.
    pub fn mode_schedule(&self, t0: f64, t1: f64) -> ModeSchedule {
        let mut builder = ModeScheduleBuilder::new(t0, t1, self.mode_at_time(t0));
        if !(t0 < t1) || !t0.is_finite() || !t1.is_finite() {
            return builder.finish();
        }

        let first = self.active_index(t0).unwrap_or(0);
        for (index, segment) in self.segments.iter().enumerate().skip(first) {
            if segment.start_time > t1 {
                break;
            }
            let segment_end = self
                .segments
                .get(index + 1)
                .map_or(f64::INFINITY, |next| next.start_time);
            // Events at `segment_end` belong to the next segment.
            let in_window = |time: f64| time < segment_end && time <= t1;

            let gait = &segment.gait;
            let duration = gait.duration();
            let modes = gait.mode_sequence();
            let (mut k, _) = cycle_at(segment.start_time, duration, t0.max(segment.start_time));
            loop {
                let cycle_start = segment.start_time + k * duration;
                if !in_window(cycle_start) {
                    break;
                }
                builder.push(cycle_start, modes[0]);
                for (&phase, &mode) in gait.event_phases().iter().zip(&modes[1..]) {
                    let event = cycle_start + phase * duration;
                    if !in_window(event) {
                        break;
                    }
                    builder.push(event, mode);
                }
                k += 1.0;
            }
        }
        builder.finish()
    }

    /// Start repeating `gait` at `time`, discarding everything scheduled at
    /// or after it. Segments that started earlier are clipped at `time`.
    pub fn set_gait_after_time(&mut self, gait: Gait, time: f64) -> Result<(), ScheduleError> {
        validate_start_time(time)?;
        self.splice(gait, time);
        Ok(())
    }

    /// Replace the schedule from exactly `time` on with `gait`.
    pub fn set_gait_at_time(&mut self, gait: Gait, time: f64) -> Result<(), ScheduleError> {
        validate_start_time(time)?;
        self.splice(gait, time);
        Ok(())
    }

    /// Schedule several gaits at once.
    ///
    /// Entries are applied in ascending start-time order; for equal start
    /// times the later entry wins. Validation happens before any mutation.
    pub fn set_gait_sequence_at_time(
        &mut self,
        gaits: &[Gait],
        start_times: &[f64],
    ) -> Result<(), ScheduleError> {
        if gaits.len() != start_times.len() {
            return Err(ScheduleError::SequenceLengthMismatch {
                gaits: gaits.len(),
                start_times: start_times.len(),
            });
        }
        for &time in start_times {
            validate_start_time(time)?;
        }
        let mut order: Vec<usize> = (0..gaits.len()).collect();
        order.sort_by(|&a, &b| start_times[a].total_cmp(&start_times[b]));
        for index in order {
            self.splice(gaits[index].clone(), start_times[index]);
        }
        Ok(())
    }

    /// Drop segments whose window ended at or before `time`.
    ///
    /// The segment active at `time` and everything after it are kept.
    pub fn discard_past(&mut self, time: f64) {
        if let Some(active) = self.active_index(time) {
            self.segments.drain(..active);
        }
    }

    /// Start times must be finite and strictly increasing.
    pub fn check_invariants(&self) -> Result<(), ScheduleError> {
        for (index, pair) in self.segments.windows(2).enumerate() {
            let (previous, start) = (pair[0].start_time, pair[1].start_time);
            if !(start > previous) {
                return Err(ScheduleError::UnorderedSegments {
                    index: index + 1,
                    previous,
                    start,
                });
            }
        }
        Ok(())
    }

    fn splice(&mut self, gait: Gait, time: f64) {
        let keep = self.segments.partition_point(|s| s.start_time < time);
        self.segments.truncate(keep);
        self.segments.push(ScheduledSegment {
            start_time: time,
            gait,
        });
    }
}

fn validate_start_time(time: f64) -> Result<(), ScheduleError> {
    if time.is_finite() {
        Ok(())
    } else {
        Err(ScheduleError::InvalidStartTime(time))
    }
}

impl ContactFlagProvider for GaitSchedule {
    fn contact_flags(&self, time: f64) -> ContactFlags {
        Self::contact_flags(self, time)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::gait::GaitType;
    use strider_core::modes::{LF_RF, LF_RH, LH_RH, RF_LH, STANCE};

    fn trot_from(start: f64) -> GaitSchedule {
        GaitSchedule::with_gait(GaitType::Trot.to_gait(), start).unwrap()
    }

    #[test]
    fn empty_schedule_is_default_mode() {
        let schedule = GaitSchedule::new();
        assert!(schedule.is_empty());
        assert_eq!(schedule.mode_at_time(3.0), DEFAULT_MODE);
        let modes = schedule.mode_schedule(0.0, 10.0);
        assert_eq!(modes, ModeSchedule::constant(DEFAULT_MODE));
    }

    #[test]
    fn default_mode_before_first_segment() {
        let schedule = trot_from(1.0);
        assert_eq!(schedule.mode_at_time(0.5), STANCE);
        assert_eq!(schedule.mode_at_time(1.0), LF_RH);
        assert_eq!(schedule.contact_flags(0.99), [true; 4]);
    }

    #[test]
    fn trot_mode_schedule_over_one_second() {
        let schedule = trot_from(0.0);
        let modes = schedule.mode_schedule(0.0, 1.0);

        let expected = [0.175, 0.35, 0.525, 0.7, 0.875];
        assert_eq!(modes.event_times.len(), expected.len());
        for (t, e) in modes.event_times.iter().zip(expected) {
            assert_relative_eq!(*t, e, epsilon = 1e-12);
        }
        assert_eq!(modes.mode_sequence, vec![LF_RH, RF_LH, LF_RH, RF_LH, LF_RH, RF_LH]);
        assert!(modes.is_well_formed());
    }

    #[test]
    fn window_includes_event_at_final_time() {
        let schedule = trot_from(0.0);
        let modes = schedule.mode_schedule(0.175, 0.35);
        assert_eq!(modes.event_times, vec![0.35]);
        assert_eq!(modes.mode_sequence, vec![RF_LH, LF_RH]);
    }

    #[test]
    fn final_time_mode_matches_point_query() {
        let schedule = trot_from(0.0);
        let modes = schedule.mode_schedule(0.0, 0.35);
        assert_eq!(modes.event_times.len(), 2);
        assert_relative_eq!(modes.event_times[0], 0.175);
        assert_eq!(modes.mode_sequence, vec![LF_RH, RF_LH, LF_RH]);
        assert_eq!(modes.mode_at_time(0.35), schedule.mode_at_time(0.35));
    }

    #[test]
    fn segment_starting_at_final_time_is_reported() {
        let mut schedule = trot_from(0.0);
        schedule.set_gait_at_time(GaitType::Bound.to_gait(), 0.3).unwrap();
        let modes = schedule.mode_schedule(0.0, 0.3);
        assert_eq!(modes.mode_sequence, vec![LF_RH, RF_LH, LF_RF]);
        assert_relative_eq!(modes.event_times[1], 0.3);
        assert_eq!(modes.mode_at_time(0.3), schedule.mode_at_time(0.3));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "too many events")]
    fn oversized_window_is_caught_in_debug_builds() {
        let _ = trot_from(0.0).mode_schedule(0.0, 1.0e6);
    }

    #[test]
    fn first_segment_start_is_an_event() {
        let schedule = trot_from(1.0);
        let modes = schedule.mode_schedule(0.0, 1.2);
        assert_eq!(modes.event_times.len(), 2);
        assert_relative_eq!(modes.event_times[0], 1.0);
        assert_relative_eq!(modes.event_times[1], 1.175, epsilon = 1e-12);
        assert_eq!(modes.mode_sequence, vec![STANCE, LF_RH, RF_LH]);
    }

    #[test]
    fn stand_gait_reports_cycle_boundaries() {
        let schedule = GaitSchedule::with_gait(GaitType::Stand.to_gait(), 0.0).unwrap();
        let modes = schedule.mode_schedule(0.1, 1.6);
        assert_eq!(modes.event_times.len(), 3);
        assert!(modes.mode_sequence.iter().all(|&m| m == STANCE));
    }

    #[test]
    fn degenerate_window() {
        let schedule = trot_from(0.0);
        assert_eq!(schedule.mode_schedule(0.5, 0.5), ModeSchedule::constant(LF_RH));
        assert_eq!(schedule.mode_schedule(0.5, 0.2), ModeSchedule::constant(LF_RH));
        assert_eq!(
            schedule.mode_schedule(0.0, f64::INFINITY),
            ModeSchedule::constant(LF_RH)
        );
    }

    #[test]
    fn set_gait_after_time_replaces_future() {
        let mut schedule = trot_from(0.0);
        schedule.set_gait_after_time(GaitType::Bound.to_gait(), 2.0).unwrap();
        schedule.set_gait_after_time(GaitType::Walk.to_gait(), 3.0).unwrap();
        schedule.set_gait_after_time(GaitType::Bound.to_gait(), 2.5).unwrap();

        let starts: Vec<f64> = schedule.segments().iter().map(|s| s.start_time).collect();
        assert_eq!(starts, vec![0.0, 2.0, 2.5]);
        assert_eq!(schedule.mode_at_time(2.5), LF_RF);
        assert_eq!(schedule.mode_at_time(2.75), LH_RH);
    }

    #[test]
    fn set_gait_after_time_is_idempotent() {
        let mut once = trot_from(0.0);
        once.set_gait_after_time(GaitType::Walk.to_gait(), 1.3).unwrap();
        let mut twice = once.clone();
        twice.set_gait_after_time(GaitType::Walk.to_gait(), 1.3).unwrap();
        assert_eq!(once.segments(), twice.segments());
    }

    #[test]
    fn set_gait_at_time_clips_active_cycle() {
        let mut schedule = trot_from(0.0);
        schedule.set_gait_at_time(GaitType::Bound.to_gait(), 0.1).unwrap();
        let modes = schedule.mode_schedule(0.0, 0.4);
        assert_eq!(modes.event_times.len(), 2);
        assert_relative_eq!(modes.event_times[0], 0.1);
        assert_relative_eq!(modes.event_times[1], 0.3, epsilon = 1e-12);
        assert_eq!(modes.mode_sequence, vec![LF_RH, LF_RF, LH_RH]);
    }

    #[test]
    fn non_finite_start_rejected() {
        let mut schedule = trot_from(0.0);
        let before = schedule.clone();
        let err = schedule
            .set_gait_at_time(GaitType::Walk.to_gait(), f64::NAN)
            .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidStartTime(_)));
        assert_eq!(schedule.segments(), before.segments());
    }

    #[test]
    fn sequence_applied_in_time_order() {
        let mut schedule = GaitSchedule::new();
        let gaits = [GaitType::Walk.to_gait(), GaitType::Trot.to_gait()];
        schedule.set_gait_sequence_at_time(&gaits, &[2.0, 1.0]).unwrap();

        let segments = schedule.segments();
        assert_eq!(segments.len(), 2);
        assert_relative_eq!(segments[0].start_time, 1.0);
        assert_eq!(segments[0].gait, GaitType::Trot.to_gait());
        assert_eq!(segments[1].gait, GaitType::Walk.to_gait());
    }

    #[test]
    fn sequence_equal_times_last_wins() {
        let mut schedule = GaitSchedule::new();
        let gaits = [GaitType::Walk.to_gait(), GaitType::Bound.to_gait()];
        schedule.set_gait_sequence_at_time(&gaits, &[1.0, 1.0]).unwrap();
        assert_eq!(schedule.segments().len(), 1);
        assert_eq!(schedule.segments()[0].gait, GaitType::Bound.to_gait());
    }

    #[test]
    fn sequence_length_mismatch_leaves_schedule_untouched() {
        let mut schedule = trot_from(0.0);
        let err = schedule
            .set_gait_sequence_at_time(&[GaitType::Walk.to_gait()], &[1.0, 2.0])
            .unwrap_err();
        assert_eq!(
            err,
            ScheduleError::SequenceLengthMismatch {
                gaits: 1,
                start_times: 2
            }
        );
        assert_eq!(schedule.segments().len(), 1);
    }

    #[test]
    fn sequence_bad_time_leaves_schedule_untouched() {
        let mut schedule = trot_from(0.0);
        let gaits = [GaitType::Walk.to_gait(), GaitType::Bound.to_gait()];
        let err = schedule
            .set_gait_sequence_at_time(&gaits, &[1.0, f64::INFINITY])
            .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidStartTime(_)));
        assert_eq!(schedule.segments().len(), 1);
    }

    #[test]
    fn discard_past_keeps_active_segment() {
        let mut schedule = trot_from(0.0);
        schedule.set_gait_at_time(GaitType::Walk.to_gait(), 1.0).unwrap();
        schedule.set_gait_at_time(GaitType::Bound.to_gait(), 2.0).unwrap();

        let mode_before = schedule.mode_at_time(1.5);
        schedule.discard_past(1.5);
        assert_eq!(schedule.segments().len(), 2);
        assert_eq!(schedule.mode_at_time(1.5), mode_before);

        schedule.discard_past(0.5);
        assert_eq!(schedule.segments().len(), 2);
    }

    #[test]
    fn invariants_hold_after_updates() {
        let mut schedule = trot_from(0.0);
        schedule.set_gait_at_time(GaitType::Walk.to_gait(), 1.0).unwrap();
        schedule.set_gait_after_time(GaitType::Bound.to_gait(), 0.5).unwrap();
        assert!(schedule.check_invariants().is_ok());
    }

    #[test]
    fn mode_at_time_agrees_with_mode_schedule() {
        let mut schedule = trot_from(0.0);
        schedule.set_gait_at_time(GaitType::Walk.to_gait(), 0.9).unwrap();
        let modes = schedule.mode_schedule(0.0, 3.0);
        for i in 0..300 {
            let t = f64::from(i) * 0.01;
            assert_eq!(modes.mode_at_time(t), schedule.mode_at_time(t), "t = {t}");
        }
    }
}

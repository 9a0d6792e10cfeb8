//! Periodic gait description.
//!
//! A gait is one period of a hybrid contact pattern:
//! - Duration of the period in seconds
//! - Event phases: normalized switch times in (0, 1), strictly increasing
//! - Mode sequence: one contact mode per interval between events
//!
//! ```text
//! phase  0 ───── p₁ ───── p₂ ───── 1
//! mode     m₀       m₁       m₂
//! ```

use std::fmt;

use strider_core::error::ScheduleError;
use strider_core::modes::{
    self, LF_LH_RH, LF_RF_LH, LF_RF_RH, ModeNumber, RF_LH_RH, STANCE,
};

/// One period of a hybrid contact pattern. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct Gait {
    duration: f64,
    event_phases: Vec<f64>,
    mode_sequence: Vec<ModeNumber>,
}

impl Gait {
    /// Build a gait, validating every invariant.
    ///
    /// # Errors
    ///
    /// - `InvalidDuration` if `duration` is not finite and positive
    /// - `EventPhaseOutOfRange` if a phase is not strictly inside (0, 1)
    /// - `EventPhasesNotIncreasing` if phases are not strictly increasing
    /// - `ModeSequenceLength` unless `mode_sequence.len() == event_phases.len() + 1`
    pub fn new(
        duration: f64,
        event_phases: Vec<f64>,
        mode_sequence: Vec<ModeNumber>,
    ) -> Result<Self, ScheduleError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(ScheduleError::InvalidDuration(duration));
        }
        for (index, &phase) in event_phases.iter().enumerate() {
            if !(phase > 0.0 && phase < 1.0) {
                return Err(ScheduleError::EventPhaseOutOfRange { index, phase });
            }
            if index > 0 && phase <= event_phases[index - 1] {
                return Err(ScheduleError::EventPhasesNotIncreasing { index });
            }
        }
        if mode_sequence.len() != event_phases.len() + 1 {
            return Err(ScheduleError::ModeSequenceLength {
                expected: event_phases.len() + 1,
                got: mode_sequence.len(),
            });
        }
        Ok(Self {
            duration,
            event_phases,
            mode_sequence,
        })
    }

    /// A gait holding a single mode for its whole period.
    pub fn single_mode(mode: ModeNumber, duration: f64) -> Result<Self, ScheduleError> {
        Self::new(duration, Vec::new(), vec![mode])
    }

    /// Period in seconds.
    pub const fn duration(&self) -> f64 {
        self.duration
    }

    pub fn event_phases(&self) -> &[f64] {
        &self.event_phases
    }

    pub fn mode_sequence(&self) -> &[ModeNumber] {
        &self.mode_sequence
    }

    /// Mode active at a normalized phase in [0, 1).
    pub fn mode_at_phase(&self, phase: f64) -> ModeNumber {
        let index = self.event_phases.partition_point(|&p| p <= phase);
        self.mode_sequence[index]
    }

    /// Event times of one period starting at `start_time`.
    pub fn event_times(&self, start_time: f64) -> impl Iterator<Item = f64> + '_ {
        self.event_phases
            .iter()
            .map(move |&p| start_time + p * self.duration)
    }
}

impl fmt::Display for Gait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Gait:")?;
        writeln!(f, "  duration:      {}", self.duration)?;
        writeln!(f, "  event phases:  {:?}", self.event_phases)?;
        write!(f, "  mode sequence: {:?}", self.mode_sequence)
    }
}

// ---------------------------------------------------------------------------
// GaitType presets
// ---------------------------------------------------------------------------

/// Predefined quadruped gait patterns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GaitType {
    /// All feet on ground (static balance).
    Stand,
    /// Diagonal pairs alternate: LF+RH and RF+LH.
    Trot,
    /// One foot lifts at a time, in sequence.
    Walk,
    /// Front pair and rear pair alternate.
    Bound,
}

impl GaitType {
    /// Build the preset gait.
    pub fn to_gait(self) -> Gait {
        let (duration, event_phases, mode_sequence) = match self {
            Self::Stand => (0.5, vec![], vec![STANCE]),
            Self::Trot => (0.35, vec![0.5], vec![modes::LF_RH, modes::RF_LH]),
            Self::Walk => (
                0.8,
                vec![0.25, 0.5, 0.75],
                vec![LF_RF_LH, LF_LH_RH, LF_RF_RH, RF_LH_RH],
            ),
            Self::Bound => (0.4, vec![0.5], vec![modes::LF_RF, modes::LH_RH]),
        };
        Gait {
            duration,
            event_phases,
            mode_sequence,
        }
    }
}

impl From<GaitType> for Gait {
    fn from(gait_type: GaitType) -> Self {
        gait_type.to_gait()
    }
}

// ---------------------------------------------------------------------------
// ModeSequenceTemplate
// ---------------------------------------------------------------------------

/// Mode sequence over absolute switching times, the shape external
/// producers send gaits in.
///
/// `switching_times` includes the start and end of the period, so it holds
/// one more entry than `mode_sequence`.
#[derive(Clone, Debug, PartialEq)]
pub struct ModeSequenceTemplate {
    pub switching_times: Vec<f64>,
    pub mode_sequence: Vec<ModeNumber>,
}

impl ModeSequenceTemplate {
    pub const fn new(switching_times: Vec<f64>, mode_sequence: Vec<ModeNumber>) -> Self {
        Self {
            switching_times,
            mode_sequence,
        }
    }

    /// First switching time: where a scheduled template begins.
    pub fn start_time(&self) -> Option<f64> {
        self.switching_times.first().copied()
    }

    /// Convert to a gait, normalizing interior switching times against the
    /// first and last entries.
    ///
    /// Switching times are taken relative to the first one:
    /// `duration = last - first` and `phase = (t - first) / duration`.
    /// Templates that start at zero convert the same as under an absolute
    /// reading (`duration = last`, `phase = t / last`). Templates with a
    /// later first time keep their own cycle length instead of stretching
    /// it by the offset; the offset is only used as the start time by
    /// `GaitReceiver::receive_scheduled_mode_sequence_template`.
    pub fn to_gait(&self) -> Result<Gait, ScheduleError> {
        let n = self.switching_times.len();
        let (Some(&first), Some(&last)) = (self.switching_times.first(), self.switching_times.last())
        else {
            return Err(ScheduleError::TemplateTooShort(n));
        };
        if n < 2 {
            return Err(ScheduleError::TemplateTooShort(n));
        }
        let duration = last - first;
        let event_phases = self.switching_times[1..n - 1]
            .iter()
            .map(|&t| (t - first) / duration)
            .collect();
        Gait::new(duration, event_phases, self.mode_sequence.clone())
    }
}

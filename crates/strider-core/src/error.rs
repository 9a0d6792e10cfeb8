use thiserror::Error;

/// Top-level error type for strider.
#[derive(Debug, Error)]
pub enum StriderError {
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cost error: {0}")]
    Cost(#[from] CostError),
}

/// Coarse classification of a [`ScheduleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied a malformed gait or command.
    InvalidArgument,
    /// Internal schedule state is inconsistent. Indicates a bug.
    InvariantViolation,
}

/// Gait construction and schedule update errors.
///
/// Every variant is raised before any mutation takes place, so readers never
/// observe a partially applied update.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("Invalid gait duration: {0} (must be finite and > 0)")]
    InvalidDuration(f64),

    #[error("Event phase {phase} at index {index} is outside (0, 1)")]
    EventPhaseOutOfRange { index: usize, phase: f64 },

    #[error("Event phases not strictly increasing at index {index}")]
    EventPhasesNotIncreasing { index: usize },

    #[error("Mode sequence length mismatch: expected {expected}, got {got}")]
    ModeSequenceLength { expected: usize, got: usize },

    #[error("Gait sequence length mismatch: {gaits} gaits, {start_times} start times")]
    SequenceLengthMismatch { gaits: usize, start_times: usize },

    #[error("Invalid start time: {0} (must be finite)")]
    InvalidStartTime(f64),

    #[error("Mode sequence template needs at least 2 switching times, got {0}")]
    TemplateTooShort(usize),

    #[error("Segment {index} starts at {start}, not after previous start {previous}")]
    UnorderedSegments {
        index: usize,
        previous: f64,
        start: f64,
    },
}

impl ScheduleError {
    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnorderedSegments { .. } => ErrorKind::InvariantViolation,
            _ => ErrorKind::InvalidArgument,
        }
    }

    /// Shorthand for `kind() == ErrorKind::InvalidArgument`.
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidArgument)
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Missing table: {0}")]
    MissingTable(String),

    #[error("Invalid weight for {field}: {value} (must be finite and >= 0)")]
    InvalidWeight { field: &'static str, value: f64 },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Cost construction and derivative backend errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CostError {
    #[error("Dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Derivative compilation failed for {model}: {message}")]
    Compilation { model: String, message: String },

    #[error("Invalid desired trajectory: {0}")]
    InvalidTrajectory(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strider_error_from_schedule_error() {
        let err = ScheduleError::InvalidDuration(-1.0);
        let top: StriderError = err.into();
        assert!(matches!(top, StriderError::Schedule(_)));
        assert!(top.to_string().contains("-1"));
    }

    #[test]
    fn strider_error_from_config_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let top: StriderError = ConfigError::from(io_err).into();
        assert!(matches!(top, StriderError::Config(ConfigError::Io(_))));
    }

    #[test]
    fn strider_error_from_cost_error() {
        let err = CostError::DimensionMismatch {
            what: "state",
            expected: 24,
            got: 12,
        };
        let top: StriderError = err.into();
        assert!(matches!(top, StriderError::Cost(_)));
    }

    #[test]
    fn schedule_error_kinds() {
        assert_eq!(
            ScheduleError::SequenceLengthMismatch {
                gaits: 2,
                start_times: 1
            }
            .kind(),
            ErrorKind::InvalidArgument
        );
        assert!(ScheduleError::EventPhasesNotIncreasing { index: 1 }.is_invalid_argument());
        assert_eq!(
            ScheduleError::UnorderedSegments {
                index: 1,
                previous: 1.0,
                start: 0.5
            }
            .kind(),
            ErrorKind::InvariantViolation
        );
    }

    #[test]
    fn schedule_error_display_messages() {
        assert_eq!(
            ScheduleError::InvalidDuration(0.0).to_string(),
            "Invalid gait duration: 0 (must be finite and > 0)"
        );
        assert_eq!(
            ScheduleError::EventPhaseOutOfRange {
                index: 0,
                phase: 1.5
            }
            .to_string(),
            "Event phase 1.5 at index 0 is outside (0, 1)"
        );
        assert_eq!(
            ScheduleError::ModeSequenceLength {
                expected: 3,
                got: 2
            }
            .to_string(),
            "Mode sequence length mismatch: expected 3, got 2"
        );
        assert_eq!(
            ScheduleError::SequenceLengthMismatch {
                gaits: 2,
                start_times: 3
            }
            .to_string(),
            "Gait sequence length mismatch: 2 gaits, 3 start times"
        );
        assert_eq!(
            ScheduleError::TemplateTooShort(1).to_string(),
            "Mode sequence template needs at least 2 switching times, got 1"
        );
    }

    #[test]
    fn config_error_display_messages() {
        assert_eq!(
            ConfigError::MissingTable("tracking_cost".into()).to_string(),
            "Missing table: tracking_cost"
        );
        assert_eq!(
            ConfigError::InvalidWeight {
                field: "roll",
                value: -2.0
            }
            .to_string(),
            "Invalid weight for roll: -2 (must be finite and >= 0)"
        );
    }
}

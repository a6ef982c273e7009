//! Error types for sigmon.
//!
//! All errors are strongly typed using thiserror so callers can match on the
//! specific condition. None of them are fatal to the process: a failed
//! activation disables one event kind, a failed reading leaves a gap in one
//! observation stream.

use thiserror::Error;

use crate::observation::EventKind;

/// Errors raised while activating an event kind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActivationError {
    /// A sensor, provider or counter the event kind needs does not exist.
    #[error("Capability absent for {kind:?}: {reason}")]
    CapabilityAbsent {
        kind: EventKind,
        reason: String,
    },

    /// The monitor was built without a slot for this event kind.
    #[error("Event kind {kind:?} is not configured on this monitor")]
    UnknownEvent {
        kind: EventKind,
    },

    /// The signal source failed for a reason other than a missing capability.
    #[error("Signal source for {kind:?} failed: {message}")]
    Source {
        kind: EventKind,
        message: String,
    },
}

impl ActivationError {
    /// Creates a capability-absent error.
    #[must_use]
    pub fn capability_absent(kind: EventKind, reason: impl Into<String>) -> Self {
        Self::CapabilityAbsent {
            kind,
            reason: reason.into(),
        }
    }

    /// The event kind the error refers to.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::CapabilityAbsent { kind, .. } | Self::UnknownEvent { kind } | Self::Source { kind, .. } => *kind,
        }
    }
}

/// Errors converting a single raw reading.
///
/// The reading is dropped; nothing is published and no state changes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReadingError {
    /// The payload could not be interpreted.
    #[error("Malformed reading: {reason}")]
    Malformed {
        reason: String,
    },

    /// The reading does not apply to the event kind it was delivered to.
    #[error("Reading '{reading}' is not accepted by {kind:?}")]
    Unexpected {
        kind: EventKind,
        reading: &'static str,
    },

    /// The reading targets state of another shape (e.g. a CDMA signal on a GSM cell).
    #[error("Reading mismatch: expected {expected}, got {actual}")]
    Mismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// A mandatory counter reported the unsupported sentinel.
    #[error("Counter '{counter}' is unsupported on this device")]
    Unsupported {
        counter: &'static str,
    },
}

impl ReadingError {
    /// Creates a malformed-reading error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// Errors reported by a listener while handling an observation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ListenerError {
    /// The listener refused the observation.
    #[error("Listener rejected observation: {reason}")]
    Rejected {
        reason: String,
    },

    /// The listener's buffer is full.
    #[error("Listener buffer is full")]
    Backpressure,

    /// The listener's consumer is gone.
    #[error("Listener is disconnected")]
    Disconnected,
}

impl ListenerError {
    /// Creates a rejection error.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// Errors receiving from an observation stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("Receive timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Observation stream is disconnected")]
    Disconnected,
}

/// Errors loading activation options.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Options document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Options must be a flat JSON object, got {found}")]
    NotAnObject {
        found: String,
    },

    #[error("Option '{key}' has an unsupported value: {value}")]
    UnsupportedValue {
        key: String,
        value: String,
    },
}

/// Top-level error type for sigmon.
#[derive(Debug, Error)]
pub enum SigmonError {
    #[error("Activation error: {0}")]
    Activation(#[from] ActivationError),

    #[error("Reading error: {0}")]
    Reading(#[from] ReadingError),

    #[error("Listener error: {0}")]
    Listener(#[from] ListenerError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl SigmonError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is an activation error.
    #[must_use]
    pub const fn is_activation(&self) -> bool {
        matches!(self, Self::Activation(_))
    }

    /// Returns true if this is a reading error.
    #[must_use]
    pub const fn is_reading(&self) -> bool {
        matches!(self, Self::Reading(_))
    }

    /// Returns true if retrying the same call may succeed.
    ///
    /// A missing capability is final for the event kind; a full listener
    /// buffer or a stream timeout is not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Activation(_) | Self::Reading(_) | Self::Config(_) | Self::Internal { .. } => false,
            Self::Listener(e) => matches!(e, ListenerError::Backpressure),
            Self::Stream(e) => matches!(e, StreamError::Timeout { .. }),
        }
    }
}

/// Result type alias for sigmon operations.
pub type SigmonResult<T> = Result<T, SigmonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_absent_mentions_kind_and_reason() {
        let err = ActivationError::capability_absent(EventKind::Accelerometer, "no sensor");
        let msg = format!("{err}");
        assert!(msg.contains("Accelerometer"));
        assert!(msg.contains("no sensor"));
        assert_eq!(err.kind(), EventKind::Accelerometer);
    }

    #[test]
    fn reading_error_mismatch_message() {
        let err = ReadingError::Mismatch {
            expected: "gsm",
            actual: "cdma",
        };
        let msg = format!("{err}");
        assert!(msg.contains("expected gsm"));
        assert!(msg.contains("got cdma"));
    }

    #[test]
    fn stream_timeout_message() {
        let err = StreamError::Timeout { duration_ms: 250 };
        assert!(format!("{err}").contains("250ms"));
    }

    #[test]
    fn sigmon_error_from_activation_is_final() {
        let err: SigmonError = ActivationError::UnknownEvent {
            kind: EventKind::Screen,
        }
        .into();
        assert!(err.is_activation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn sigmon_error_retryable_conditions() {
        let backpressure: SigmonError = ListenerError::Backpressure.into();
        assert!(backpressure.is_retryable());

        let timeout: SigmonError = StreamError::Timeout { duration_ms: 1 }.into();
        assert!(timeout.is_retryable());

        let rejected: SigmonError = ListenerError::rejected("nope").into();
        assert!(!rejected.is_retryable());

        let reading: SigmonError = ReadingError::malformed("bad").into();
        assert!(reading.is_reading());
        assert!(!reading.is_retryable());
    }

    #[test]
    fn sigmon_error_internal() {
        let err = SigmonError::internal("unexpected state");
        let msg = format!("{err}");
        assert!(msg.contains("unexpected state"));
    }
}

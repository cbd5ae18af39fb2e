//! Scanner lifecycle states and the legal transitions between them

use serde::{Deserialize, Serialize};

/// Lifecycle status of a scanner session. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScannerStatus {
    /// No resource held, not decoding
    Idle,
    /// Acquiring the camera
    Starting,
    /// Actively decoding
    Running,
    /// Suppressing duplicate decodes after a successful scan
    CoolingDown,
    /// Releasing the camera
    Stopping,
    /// Terminal until the host toggles activation off and on again
    Failed,
}

impl ScannerStatus {
    /// A start or stop sequence is in flight
    #[inline]
    #[must_use]
    pub fn is_transitional(&self) -> bool {
        matches!(self, Self::Starting | Self::Stopping)
    }

    /// The camera is held and decoding
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::CoolingDown)
    }
}

impl std::fmt::Display for ScannerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::CoolingDown => "cooling-down",
            Self::Stopping => "stopping",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Rejected status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal scanner transition: {from} -> {to}")]
pub struct IllegalTransition {
    /// Status before the attempted change
    pub from: ScannerStatus,
    /// Requested status
    pub to: ScannerStatus,
}

/// Validates a status transition.
///
/// Illegal transitions return an error; with the `strict-debug` feature
/// they panic instead.
pub fn validate_transition(from: ScannerStatus, to: ScannerStatus) -> Result<(), IllegalTransition> {
    if allowed(from, to) {
        Ok(())
    } else {
        #[cfg(feature = "strict-debug")]
        panic!("Illegal scanner transition attempted: {from:?} -> {to:?}");

        Err(IllegalTransition { from, to })
    }
}

/// Statuses reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: ScannerStatus) -> Vec<ScannerStatus> {
    use ScannerStatus::*;
    match from {
        Idle => vec![Starting],
        Starting => vec![Running, Failed],
        Running => vec![CoolingDown, Stopping, Failed],
        CoolingDown => vec![Starting, Stopping, Failed],
        Stopping => vec![Idle],
        Failed => vec![Starting, Stopping],
    }
}

fn allowed(from: ScannerStatus, to: ScannerStatus) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ScannerStatus::*;

    #[test]
    fn idle_only_starts() {
        assert!(validate_transition(Idle, Starting).is_ok());
        assert!(validate_transition(Idle, Running).is_err());
        assert!(validate_transition(Idle, Stopping).is_err());
    }

    #[test]
    fn stopping_always_lands_in_idle() {
        assert_eq!(allowed_transitions(Stopping), vec![Idle]);
    }

    #[test]
    fn cooldown_restarts_or_stops() {
        assert!(validate_transition(CoolingDown, Starting).is_ok());
        assert!(validate_transition(CoolingDown, Stopping).is_ok());
        assert!(validate_transition(CoolingDown, Running).is_err());
    }

    #[test]
    fn failed_requires_explicit_retry() {
        assert!(validate_transition(Failed, Starting).is_ok());
        assert!(validate_transition(Failed, Running).is_err());
        assert!(validate_transition(Failed, CoolingDown).is_err());
    }

    #[test]
    fn transitional_and_active_flags() {
        assert!(Starting.is_transitional());
        assert!(Stopping.is_transitional());
        assert!(!Running.is_transitional());
        assert!(Running.is_active());
        assert!(CoolingDown.is_active());
        assert!(!Failed.is_active());
    }

    #[test]
    fn error_names_both_states() {
        let err = validate_transition(Idle, CoolingDown).unwrap_err();
        assert_eq!(err.to_string(), "illegal scanner transition: idle -> cooling-down");
    }
}

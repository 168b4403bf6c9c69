//! Dispatch outcome

use serde::{Deserialize, Serialize};

/// Result of handing one outbox entry to the execution backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchOutcome {
    /// The backend accepted the job (or already held it under the same key)
    Dispatched,
    /// Retryable: network trouble, timeouts, backend overload
    TransientFailure(String),
    /// Not retryable: malformed payload or explicit rejection
    PermanentFailure(String),
}

impl DispatchOutcome {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, DispatchOutcome::Dispatched)
    }

    /// Failure reason, if any
    pub fn error(&self) -> Option<&str> {
        match self {
            DispatchOutcome::Dispatched => None,
            DispatchOutcome::TransientFailure(reason) | DispatchOutcome::PermanentFailure(reason) => {
                Some(reason.as_str())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_dispatched_counts_as_dispatched() {
        assert!(DispatchOutcome::Dispatched.is_dispatched());
        assert!(!DispatchOutcome::TransientFailure("timeout".to_string()).is_dispatched());
        assert!(!DispatchOutcome::PermanentFailure("bad kind".to_string()).is_dispatched());
    }

    #[test]
    fn test_error_reason() {
        assert_eq!(DispatchOutcome::Dispatched.error(), None);
        assert_eq!(
            DispatchOutcome::TransientFailure("timeout".to_string()).error(),
            Some("timeout")
        );
        assert_eq!(
            DispatchOutcome::PermanentFailure("bad kind".to_string()).error(),
            Some("bad kind")
        );
    }
}

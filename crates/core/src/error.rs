use thiserror::Error;

/// Error kinds surfaced by the recorder and media-server clients and by
/// the reconciliation engine.
///
/// A video that is missing on the recorder is not an error; lookups
/// return `Ok(None)` for that case.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl SyncError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport_error",
            Self::Remote { .. } => "remote_error",
            Self::NotFound(_) => "not_found",
            Self::MalformedResponse(_) => "malformed_response",
            Self::InvariantViolation(_) => "invariant_violation",
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Remote { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_and_server_errors_are_transient() {
        assert!(SyncError::Transport("connection refused".into()).is_transient());
        assert!(
            SyncError::Remote {
                status: 503,
                message: "busy".into()
            }
            .is_transient()
        );
        assert!(
            !SyncError::Remote {
                status: 401,
                message: "unauthorized".into()
            }
            .is_transient()
        );
        assert!(!SyncError::MalformedResponse("no Airing".into()).is_transient());
        assert!(!SyncError::InvariantViolation("both unwatched".into()).is_transient());
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(SyncError::NotFound("42".into()).code(), "not_found");
        assert_eq!(
            SyncError::InvariantViolation("x".into()).code(),
            "invariant_violation"
        );
        assert_eq!(
            SyncError::MalformedResponse("x".into()).to_string(),
            "malformed response: x"
        );
    }
}

//! Unified error handling for the reqshield library.
//!
//! Uses [`thiserror`] to define a single error enum that covers all failure
//! modes: rule construction, engine configuration, duration parsing, local
//! analysis, and the remote decision service. Library code returns
//! [`Result<T>`] which aliases `std::result::Result<T, ReqShieldError>`.
//!
//! Only construction errors ([`ReqShieldError::InvalidRule`],
//! [`ReqShieldError::InvalidConfig`], [`ReqShieldError::InvalidDuration`])
//! ever reach callers as `Err`. Everything that goes wrong inside
//! [`protect`](crate::engine::Engine::protect) is recovered into an ERROR
//! rule result or an ERROR decision.

use thiserror::Error;

/// Unified error type for the reqshield library.
#[derive(Debug, Error)]
pub enum ReqShieldError {
    /// A duration argument could not be parsed (empty, negative, unknown
    /// unit, or beyond 2^31-1 seconds).
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    /// A rule constructor was given an inconsistent configuration, such as
    /// both an allow and a deny list.
    #[error("invalid rule: {0}")]
    InvalidRule(String),

    /// The engine builder was missing a required collaborator.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// A local analyzer operation failed (e.g. an unresolvable
    /// characteristic while fingerprinting).
    #[error("analysis failed: {0}")]
    Analysis(String),

    /// A rule rejected the request shape before execution.
    #[error("rule validation failed: {0}")]
    RuleValidation(String),

    /// A rule failed while executing against the request.
    #[error("rule execution failed: {0}")]
    RuleExecution(String),

    /// The remote decision service could not produce a decision.
    #[error("decision service error: {0}")]
    Remote(String),
}

/// Convenience type alias for `std::result::Result<T, ReqShieldError>`.
pub type Result<T> = std::result::Result<T, ReqShieldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_error_displays_message() {
        let err = ReqShieldError::InvalidDuration("unknown unit `w`".to_string());
        assert_eq!(err.to_string(), "invalid duration: unknown unit `w`");
    }

    #[test]
    fn remote_error_displays_message() {
        let err = ReqShieldError::Remote("connection refused".to_string());
        assert_eq!(err.to_string(), "decision service error: connection refused");
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReqShieldError>();
    }
}

//! Error types for deployment orchestration.

use thiserror::Error;

/// Errors that can occur while preparing or updating a target environment.
///
/// Every variant is terminal for the run: the first failing stage halts the
/// pipeline and the failure is surfaced verbatim to the operator. Retries
/// are an external, manual decision.
#[derive(Error, Debug, Clone)]
pub enum DeployError {
    /// Missing or invalid required input, detected before any stage runs
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Credentials are invalid or expired
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The credential principal lacks the required rights
    #[error("permission denied: {0}")]
    Permission(String),

    /// Transient connectivity loss to the target control plane
    #[error("network error: {0}")]
    Network(String),

    /// Malformed stack definition or dangling service-unit reference
    #[error("stack validation failed: {0}")]
    Validation(String),

    /// The target environment failed to reach the declared state
    #[error("stack failed to converge: {0}")]
    Convergence(String),

    /// The operation exceeded its allotted time budget
    #[error("timed out: {0}")]
    Timeout(String),
}

impl DeployError {
    /// Short machine-readable kind, used in stage reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            DeployError::Configuration(_) => "configuration",
            DeployError::Authentication(_) => "authentication",
            DeployError::Permission(_) => "permission",
            DeployError::Network(_) => "network",
            DeployError::Validation(_) => "validation",
            DeployError::Convergence(_) => "convergence",
            DeployError::Timeout(_) => "timeout",
        }
    }
}

/// Result type for deployment operations
pub type Result<T> = std::result::Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(DeployError::Configuration("x".into()).kind(), "configuration");
        assert_eq!(DeployError::Authentication("x".into()).kind(), "authentication");
        assert_eq!(DeployError::Permission("x".into()).kind(), "permission");
        assert_eq!(DeployError::Network("x".into()).kind(), "network");
        assert_eq!(DeployError::Validation("x".into()).kind(), "validation");
        assert_eq!(DeployError::Convergence("x".into()).kind(), "convergence");
        assert_eq!(DeployError::Timeout("x".into()).kind(), "timeout");
    }

    #[test]
    fn test_error_display_carries_detail() {
        let err = DeployError::Permission("principal lacks cdk bootstrap rights".into());
        assert_eq!(
            err.to_string(),
            "permission denied: principal lacks cdk bootstrap rights"
        );
    }
}

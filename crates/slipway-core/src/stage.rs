//! Pipeline stage identities and outcomes.

use serde::{Deserialize, Serialize};

use crate::error::DeployError;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Prepare the target environment for stack-management operations.
    Bootstrap,

    /// Apply the declared stack definition against the target.
    Update,
}

impl Stage {
    /// Get the stage name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Bootstrap => "bootstrap",
            Stage::Update => "update",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Terminal status of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Success,
    Failure,
}

/// Outcome of running one pipeline stage.
///
/// `error_kind` and `error_detail` are present iff the stage failed; the
/// constructors enforce this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// Which stage produced this result.
    pub stage: Stage,

    /// Terminal status.
    pub status: StageStatus,

    /// Error kind from the taxonomy, present iff the stage failed.
    pub error_kind: Option<String>,

    /// Human-readable failure detail, present iff the stage failed.
    pub error_detail: Option<String>,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl StageResult {
    /// A successful stage outcome.
    pub fn success(stage: Stage, duration_ms: u64) -> Self {
        Self {
            stage,
            status: StageStatus::Success,
            error_kind: None,
            error_detail: None,
            duration_ms,
        }
    }

    /// A failed stage outcome carrying the error verbatim.
    pub fn failure(stage: Stage, error: &DeployError, duration_ms: u64) -> Self {
        Self {
            stage,
            status: StageStatus::Failure,
            error_kind: Some(error.kind().to_string()),
            error_detail: Some(error.to_string()),
            duration_ms,
        }
    }

    /// Whether this stage succeeded.
    pub fn passed(&self) -> bool {
        self.status == StageStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Bootstrap.name(), "bootstrap");
        assert_eq!(Stage::Update.name(), "update");
    }

    #[test]
    fn test_success_has_no_error_fields() {
        let result = StageResult::success(Stage::Bootstrap, 1200);
        assert!(result.passed());
        assert_eq!(result.status, StageStatus::Success);
        assert!(result.error_kind.is_none());
        assert!(result.error_detail.is_none());
        assert_eq!(result.duration_ms, 1200);
    }

    #[test]
    fn test_failure_carries_kind_and_detail() {
        let err = DeployError::Permission("principal lacks bootstrap rights".into());
        let result = StageResult::failure(Stage::Bootstrap, &err, 430);
        assert!(!result.passed());
        assert_eq!(result.status, StageStatus::Failure);
        assert_eq!(result.error_kind.as_deref(), Some("permission"));
        assert!(result
            .error_detail
            .as_deref()
            .unwrap()
            .contains("principal lacks bootstrap rights"));
    }
}

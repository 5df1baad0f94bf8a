//! Deployment pipeline orchestration.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::bootstrap::Bootstrapper;
use crate::config::PipelineConfig;
use crate::engine::{ImageRegistry, StackDefinition, StackEngine};
use crate::stage::StageResult;
use crate::update::StackUpdater;

/// Aggregate outcome of one pipeline run. Consumed by the caller to decide
/// the process exit status; not persisted beyond the run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique id for this run.
    pub run_id: String,

    /// Whether every executed stage succeeded.
    pub success: bool,

    /// Results of the stages that ran, in execution order.
    pub stages: Vec<StageResult>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run finished.
    pub finished_at: DateTime<Utc>,

    /// Digest of the stack definition this run applied.
    pub definition_digest: String,
}

impl RunReport {
    /// The stage that halted the run, if any.
    pub fn failed_stage(&self) -> Option<&StageResult> {
        self.stages.iter().find(|s| !s.passed())
    }
}

/// Two-stage deployment pipeline: bootstrap, then update.
///
/// The dependency between the stages is explicit and sequential: the
/// update stage is entered only when the bootstrap result for this run is
/// a success. The first failing stage halts the run.
pub struct DeployPipeline;

impl DeployPipeline {
    /// Execute one run against the given engine and registry.
    pub async fn run(
        engine: &dyn StackEngine,
        registry: &dyn ImageRegistry,
        config: &PipelineConfig,
        definition: &StackDefinition,
    ) -> RunReport {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let start = Instant::now();

        info!(
            run_id = %run_id,
            stack = %definition.stack_name,
            digest = %definition.short_digest(),
            environment = %config.target(),
            "starting deployment pipeline"
        );

        let mut stages = Vec::new();

        let bootstrap = Bootstrapper::new(engine).run(config).await;
        let bootstrap_passed = bootstrap.passed();
        stages.push(bootstrap);

        if bootstrap_passed {
            let update = StackUpdater::new(engine, registry)
                .run(config, definition)
                .await;
            stages.push(update);
        } else {
            info!(run_id = %run_id, "bootstrap failed, update stage not entered");
        }

        let success = stages.iter().all(StageResult::passed);
        let duration_ms = start.elapsed().as_millis() as u64;

        if success {
            info!(run_id = %run_id, duration_ms, "deployment pipeline completed");
        } else {
            info!(run_id = %run_id, duration_ms, "deployment pipeline failed");
        }

        RunReport {
            run_id,
            success,
            stages,
            duration_ms,
            started_at,
            finished_at: Utc::now(),
            definition_digest: definition.digest(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeployError;
    use crate::stage::Stage;

    fn report_with(stages: Vec<StageResult>) -> RunReport {
        let success = stages.iter().all(StageResult::passed);
        RunReport {
            run_id: "run123".to_string(),
            success,
            stages,
            duration_ms: 300,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            definition_digest: "abc123".to_string(),
        }
    }

    #[test]
    fn test_report_success_has_no_failed_stage() {
        let report = report_with(vec![
            StageResult::success(Stage::Bootstrap, 100),
            StageResult::success(Stage::Update, 200),
        ]);
        assert!(report.success);
        assert!(report.failed_stage().is_none());
    }

    #[test]
    fn test_report_surfaces_first_failed_stage() {
        let err = DeployError::Convergence("stack rolled back".into());
        let report = report_with(vec![
            StageResult::success(Stage::Bootstrap, 100),
            StageResult::failure(Stage::Update, &err, 200),
        ]);
        assert!(!report.success);
        let failed = report.failed_stage().expect("should have failed stage");
        assert_eq!(failed.stage, Stage::Update);
        assert_eq!(failed.error_kind.as_deref(), Some("convergence"));
    }
}

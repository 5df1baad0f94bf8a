//! Environment bootstrap stage.

use std::time::Instant;

use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::engine::StackEngine;
use crate::stage::{Stage, StageResult};

/// Prepares the target account/region to receive stack-management
/// operations (asset staging, permission scaffolding).
///
/// Idempotent by delegation: re-running against an already-bootstrapped
/// environment succeeds without further side effects. Failures are
/// terminal for the run; there is no in-pipeline retry.
pub struct Bootstrapper<'a> {
    engine: &'a dyn StackEngine,
}

impl<'a> Bootstrapper<'a> {
    pub fn new(engine: &'a dyn StackEngine) -> Self {
        Self { engine }
    }

    /// Run the bootstrap stage. Engine errors are folded into a Failure
    /// result and surfaced verbatim, never swallowed.
    pub async fn run(&self, config: &PipelineConfig) -> StageResult {
        let start = Instant::now();
        let environment = config.target();

        info!(environment = %environment, "bootstrapping environment");

        match self.engine.bootstrap(&environment, &config.credentials).await {
            Ok(()) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                info!(environment = %environment, duration_ms, "environment ready");
                StageResult::success(Stage::Bootstrap, duration_ms)
            }
            Err(error) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                warn!(environment = %environment, error = %error, "bootstrap failed");
                StageResult::failure(Stage::Bootstrap, &error, duration_ms)
            }
        }
    }
}

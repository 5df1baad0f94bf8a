//! Stack update stage.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::engine::{ImageRegistry, StackDefinition, StackEngine};
use crate::error::{DeployError, Result};
use crate::stage::{Stage, StageResult};

/// Applies the declared stack definition so every service unit is running
/// its container image, waiting for convergence without interactive
/// confirmation.
///
/// Callers must have observed a successful bootstrap for the same run; the
/// ordering gate lives in the pipeline, not here.
pub struct StackUpdater<'a> {
    engine: &'a dyn StackEngine,
    registry: &'a dyn ImageRegistry,
}

impl<'a> StackUpdater<'a> {
    pub fn new(engine: &'a dyn StackEngine, registry: &'a dyn ImageRegistry) -> Self {
        Self { engine, registry }
    }

    /// Run the update stage. Engine errors are folded into a Failure
    /// result; a failed update leaves rollback to the external engine.
    pub async fn run(
        &self,
        config: &PipelineConfig,
        definition: &StackDefinition,
    ) -> StageResult {
        let start = Instant::now();

        match self.apply(config, definition).await {
            Ok(()) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                info!(stack = %definition.stack_name, duration_ms, "stack converged");
                StageResult::success(Stage::Update, duration_ms)
            }
            Err(error) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                warn!(stack = %definition.stack_name, error = %error, "update failed");
                StageResult::failure(Stage::Update, &error, duration_ms)
            }
        }
    }

    async fn apply(&self, config: &PipelineConfig, definition: &StackDefinition) -> Result<()> {
        // Every unit must resolve to an image before anything is submitted,
        // so a dangling reference cannot leave a partial deploy behind.
        for unit in &config.service_units {
            let image = self.registry.resolve_image(unit).await.map_err(|error| {
                DeployError::Validation(format!(
                    "service unit '{}' has no resolvable image: {}",
                    unit, error
                ))
            })?;
            debug!(unit = %unit, image = %image.uri, "resolved service image");
        }

        info!(
            stack = %definition.stack_name,
            digest = %definition.short_digest(),
            environment = %config.target(),
            "deploying stack"
        );

        self.engine
            .deploy(
                definition,
                &config.target(),
                &config.credentials,
                config.approval,
            )
            .await
    }
}

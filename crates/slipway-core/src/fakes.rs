//! In-memory fakes for the engine traits (testing only)
//!
//! Provides `FakeStackEngine` and `FakeImageRegistry` that satisfy the
//! trait contracts without a live cloud environment.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::config::{ApprovalPolicy, Credentials, ServiceUnit};
use crate::engine::{ImageRef, ImageRegistry, StackDefinition, StackEngine, Target};
use crate::error::{DeployError, Result};

// ---------------------------------------------------------------------------
// FakeStackEngine
// ---------------------------------------------------------------------------

/// Scripted stack engine that records every call in order.
///
/// Scripted failures persist across calls, so retried stages keep failing
/// the same way the real control plane would.
#[derive(Debug, Default)]
pub struct FakeStackEngine {
    calls: Mutex<Vec<&'static str>>,
    bootstrap_error: Mutex<Option<DeployError>>,
    deploy_error: Mutex<Option<DeployError>>,
    bootstrapped: Mutex<bool>,
    deployed_digests: Mutex<Vec<String>>,
}

impl FakeStackEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script every bootstrap call to fail with the given error.
    pub fn fail_bootstrap(self, error: DeployError) -> Self {
        *self.bootstrap_error.lock().unwrap() = Some(error);
        self
    }

    /// Script every deploy call to fail with the given error.
    pub fn fail_deploy(self, error: DeployError) -> Self {
        *self.deploy_error.lock().unwrap() = Some(error);
        self
    }

    /// All calls received, in order (`"bootstrap"` / `"deploy"`).
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn bootstrap_count(&self) -> usize {
        self.calls().iter().filter(|c| **c == "bootstrap").count()
    }

    pub fn deploy_count(&self) -> usize {
        self.calls().iter().filter(|c| **c == "deploy").count()
    }

    /// Whether a successful bootstrap has marked the environment ready.
    pub fn is_bootstrapped(&self) -> bool {
        *self.bootstrapped.lock().unwrap()
    }

    /// Digests of definitions successfully deployed, in order.
    pub fn deployed_digests(&self) -> Vec<String> {
        self.deployed_digests.lock().unwrap().clone()
    }
}

#[async_trait]
impl StackEngine for FakeStackEngine {
    async fn bootstrap(&self, _target: &Target, _credentials: &Credentials) -> Result<()> {
        self.calls.lock().unwrap().push("bootstrap");
        if let Some(error) = self.bootstrap_error.lock().unwrap().as_ref() {
            return Err(error.clone());
        }
        // Re-bootstrapping a ready environment only confirms readiness.
        *self.bootstrapped.lock().unwrap() = true;
        Ok(())
    }

    async fn deploy(
        &self,
        definition: &StackDefinition,
        _target: &Target,
        _credentials: &Credentials,
        _approval: ApprovalPolicy,
    ) -> Result<()> {
        self.calls.lock().unwrap().push("deploy");
        if let Some(error) = self.deploy_error.lock().unwrap().as_ref() {
            return Err(error.clone());
        }
        self.deployed_digests
            .lock()
            .unwrap()
            .push(definition.digest());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeImageRegistry
// ---------------------------------------------------------------------------

/// Registry that resolves every unit except those marked missing.
#[derive(Debug, Default)]
pub struct FakeImageRegistry {
    missing: HashSet<String>,
}

impl FakeImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a unit as having no pushed image.
    pub fn missing(mut self, unit: &str) -> Self {
        self.missing.insert(unit.to_string());
        self
    }
}

#[async_trait]
impl ImageRegistry for FakeImageRegistry {
    async fn resolve_image(&self, unit: &ServiceUnit) -> Result<ImageRef> {
        if self.missing.contains(unit.as_str()) {
            return Err(DeployError::Validation(format!(
                "no image pushed for '{}'",
                unit
            )));
        }
        Ok(ImageRef {
            unit: unit.clone(),
            uri: format!("registry.test/{}:latest", unit),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_engine_records_call_order() {
        let engine = FakeStackEngine::new();
        let target = Target {
            account_id: "123456789012".to_string(),
            region: "us-east-1".to_string(),
        };
        let credentials = Credentials::new("key", "secret");
        let definition = StackDefinition::new("TestStack");

        engine.bootstrap(&target, &credentials).await.unwrap();
        engine
            .deploy(&definition, &target, &credentials, ApprovalPolicy::Auto)
            .await
            .unwrap();

        assert_eq!(engine.calls(), vec!["bootstrap", "deploy"]);
        assert!(engine.is_bootstrapped());
        assert_eq!(engine.deployed_digests(), vec![definition.digest()]);
    }

    #[tokio::test]
    async fn test_fake_engine_scripted_failure_persists() {
        let engine = FakeStackEngine::new()
            .fail_bootstrap(DeployError::Network("connection reset".into()));
        let target = Target {
            account_id: "123456789012".to_string(),
            region: "us-east-1".to_string(),
        };
        let credentials = Credentials::new("key", "secret");

        assert!(engine.bootstrap(&target, &credentials).await.is_err());
        assert!(engine.bootstrap(&target, &credentials).await.is_err());
        assert_eq!(engine.bootstrap_count(), 2);
        assert!(!engine.is_bootstrapped());
    }

    #[tokio::test]
    async fn test_fake_registry_missing_unit() {
        let registry = FakeImageRegistry::new().missing("mqtt-lambda");

        let rest = ServiceUnit::new("rest-api-lambda").unwrap();
        let mqtt = ServiceUnit::new("mqtt-lambda").unwrap();

        let image = registry.resolve_image(&rest).await.unwrap();
        assert_eq!(image.uri, "registry.test/rest-api-lambda:latest");

        let err = registry.resolve_image(&mqtt).await.unwrap_err();
        assert!(matches!(err, DeployError::Validation(_)));
    }
}

//! Process-backed stack engine driving the AWS CDK toolkit.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use slipway_core::{
    ApprovalPolicy, Credentials, DeployError, Result, StackDefinition, StackEngine, Target,
};

use crate::classify::classify_failure;

/// Stack engine that shells out to the CDK toolkit.
///
/// Credentials are injected into the child process environment only,
/// never onto the command line, so they cannot surface in process
/// listings or captured output.
pub struct CdkStackEngine {
    /// Path to the toolkit binary.
    binary_path: String,

    /// Wall-clock ceiling per operation, in seconds.
    timeout_secs: u64,
}

impl CdkStackEngine {
    pub const DEFAULT_BINARY: &'static str = "cdk";

    /// Default per-operation ceiling. Stack convergence can take most of
    /// an hour on large diffs.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

    pub fn new() -> Self {
        Self {
            binary_path: Self::DEFAULT_BINARY.to_string(),
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Use a specific toolkit binary instead of `cdk` from PATH.
    pub fn with_binary_path(mut self, path: impl Into<String>) -> Self {
        self.binary_path = path.into();
        self
    }

    /// Override the per-operation wall-clock ceiling.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Arguments for the bootstrap operation.
    fn bootstrap_args(target: &Target) -> Vec<String> {
        vec!["bootstrap".to_string(), target.to_string()]
    }

    /// Arguments for the deploy operation.
    fn deploy_args(definition: &StackDefinition, approval: ApprovalPolicy) -> Vec<String> {
        let mut args = vec![
            "deploy".to_string(),
            definition.stack_name.clone(),
            "--ci".to_string(),
            "--require-approval".to_string(),
            match approval {
                ApprovalPolicy::Auto => "never".to_string(),
                ApprovalPolicy::Manual => "broadening".to_string(),
            },
        ];
        if let Some(app) = &definition.app {
            args.push("--app".to_string());
            args.push(app.clone());
        }
        for (key, value) in &definition.context {
            args.push("--context".to_string());
            args.push(format!("{}={}", key, value));
        }
        args
    }

    /// Run one toolkit operation to completion.
    async fn run_toolkit(
        &self,
        operation: &str,
        args: Vec<String>,
        target: &Target,
        credentials: &Credentials,
    ) -> Result<()> {
        debug!(operation, binary = %self.binary_path, "invoking stack engine");

        let child = Command::new(&self.binary_path)
            .args(&args)
            .env("AWS_ACCESS_KEY_ID", credentials.access_key_id())
            .env("AWS_SECRET_ACCESS_KEY", credentials.secret_access_key())
            .env("AWS_REGION", &target.region)
            .env("AWS_DEFAULT_REGION", &target.region)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DeployError::Configuration(format!(
                    "failed to launch stack engine '{}': {}",
                    self.binary_path, e
                ))
            })?;

        let output = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| {
            DeployError::Timeout(format!(
                "{} did not complete within {} seconds",
                operation, self.timeout_secs
            ))
        })?
        .map_err(|e| {
            DeployError::Configuration(format!("failed to collect stack engine output: {}", e))
        })?;

        if output.status.success() {
            info!(operation, environment = %target, "stack engine operation completed");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(classify_failure(operation, output.status.code(), &stderr))
        }
    }
}

impl Default for CdkStackEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StackEngine for CdkStackEngine {
    async fn bootstrap(&self, target: &Target, credentials: &Credentials) -> Result<()> {
        self.run_toolkit("bootstrap", Self::bootstrap_args(target), target, credentials)
            .await
    }

    async fn deploy(
        &self,
        definition: &StackDefinition,
        target: &Target,
        credentials: &Credentials,
        approval: ApprovalPolicy,
    ) -> Result<()> {
        self.run_toolkit(
            "deploy",
            Self::deploy_args(definition, approval),
            target,
            credentials,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Target {
        Target {
            account_id: "123456789012".to_string(),
            region: "us-east-1".to_string(),
        }
    }

    #[test]
    fn test_bootstrap_args_address_the_target() {
        let args = CdkStackEngine::bootstrap_args(&target());
        assert_eq!(args, vec!["bootstrap", "aws://123456789012/us-east-1"]);
    }

    #[test]
    fn test_deploy_args_auto_approval() {
        let definition = StackDefinition::new("MicroservicesStack");
        let args = CdkStackEngine::deploy_args(&definition, ApprovalPolicy::Auto);
        assert_eq!(args[0], "deploy");
        assert_eq!(args[1], "MicroservicesStack");
        assert!(args.contains(&"--ci".to_string()));
        let approval_at = args.iter().position(|a| a == "--require-approval").unwrap();
        assert_eq!(args[approval_at + 1], "never");
    }

    #[test]
    fn test_deploy_args_manual_approval() {
        let definition = StackDefinition::new("MicroservicesStack");
        let args = CdkStackEngine::deploy_args(&definition, ApprovalPolicy::Manual);
        let approval_at = args.iter().position(|a| a == "--require-approval").unwrap();
        assert_eq!(args[approval_at + 1], "broadening");
    }

    #[test]
    fn test_deploy_args_forward_app_and_context() {
        let definition = StackDefinition::new("MicroservicesStack")
            .with_app("python3 app.py")
            .with_context("log_level", "INFO")
            .with_context("lambda_memory", "1024");
        let args = CdkStackEngine::deploy_args(&definition, ApprovalPolicy::Auto);

        let app_at = args.iter().position(|a| a == "--app").unwrap();
        assert_eq!(args[app_at + 1], "python3 app.py");

        let contexts: Vec<&str> = args
            .iter()
            .enumerate()
            .filter(|(i, _)| *i > 0 && args[i - 1] == "--context")
            .map(|(_, a)| a.as_str())
            .collect();
        assert_eq!(contexts, vec!["log_level=INFO", "lambda_memory=1024"]);
    }

    #[test]
    fn test_credentials_never_appear_in_args() {
        let definition = StackDefinition::new("MicroservicesStack").with_app("python3 app.py");
        let args = CdkStackEngine::deploy_args(&definition, ApprovalPolicy::Auto);
        assert!(args.iter().all(|a| !a.contains("AWS_SECRET")));
    }
}

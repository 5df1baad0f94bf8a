//! Capability interfaces onto the external stack engine and image registry.
//!
//! The orchestrator consumes its collaborators through two narrow traits:
//! `StackEngine` (`{bootstrap, deploy}`) and `ImageRegistry`
//! (`{resolve_image}`). Both are async and backend-agnostic; in-memory
//! fakes are provided for testing via the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{ApprovalPolicy, Credentials, ServiceUnit};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// The (account, region) pair a stack operation runs against.
///
/// At most one live update per target is assumed safe; serializing
/// concurrent runs is the trigger system's responsibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub account_id: String,
    pub region: String,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "aws://{}/{}", self.account_id, self.region)
    }
}

// ---------------------------------------------------------------------------
// Stack definition
// ---------------------------------------------------------------------------

/// The declared stack definition, opaque to the orchestrator.
///
/// Carries only what the stack engine needs to be invoked: the stack name,
/// an optional app command that synthesizes the definition, and context
/// key/value pairs passed through to it. The orchestrator never interprets
/// the definition's contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDefinition {
    /// Name of the stack to apply, e.g. `MicroservicesStack`.
    pub stack_name: String,

    /// Command that synthesizes the definition (engine default if absent).
    pub app: Option<String>,

    /// Context key/value pairs forwarded to the stack engine.
    pub context: Vec<(String, String)>,
}

impl StackDefinition {
    pub fn new(stack_name: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            app: None,
            context: Vec::new(),
        }
    }

    /// Set the app command that synthesizes the definition.
    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app = Some(app.into());
        self
    }

    /// Append a context key/value pair.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    /// Deterministic SHA-256 digest over the definition's identity fields.
    /// Gives runs a stable identity for logging and reporting.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.stack_name.as_bytes());
        hasher.update(b"\0");
        if let Some(app) = &self.app {
            hasher.update(app.as_bytes());
        }
        hasher.update(b"\0");
        for (key, value) in &self.context {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b"\0");
        }
        hex::encode(hasher.finalize())
    }

    /// Short form of the digest (first 12 hex chars).
    pub fn short_digest(&self) -> String {
        let digest = self.digest();
        digest[..12.min(digest.len())].to_string()
    }
}

// ---------------------------------------------------------------------------
// Image references
// ---------------------------------------------------------------------------

/// Resolved container image for one service unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// The unit this image backs.
    pub unit: ServiceUnit,

    /// Fully qualified image URI, including tag.
    pub uri: String,
}

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// Stack-management engine consumed via two operations only.
///
/// Both calls are long-running and block until the engine reports a
/// terminal state; no mid-operation cancellation is defined.
#[async_trait]
pub trait StackEngine: Send + Sync {
    /// Prepare the target environment for stack-management operations.
    ///
    /// Idempotent: bootstrapping an environment already at an
    /// equal-or-newer version succeeds without side effects beyond
    /// confirming readiness. Must not touch application-level resources.
    async fn bootstrap(&self, target: &Target, credentials: &Credentials) -> Result<()>;

    /// Submit the stack definition for deployment and block until the
    /// target converges or reports failure. A failed deploy leaves the
    /// target in the engine's own last-known rollback state.
    async fn deploy(
        &self,
        definition: &StackDefinition,
        target: &Target,
        credentials: &Credentials,
        approval: ApprovalPolicy,
    ) -> Result<()>;
}

/// Image registry consumed via a single resolution capability.
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Resolve the image a service unit should run. A unit with no
    /// resolvable image is a validation failure for the update stage.
    async fn resolve_image(&self, unit: &ServiceUnit) -> Result<ImageRef>;
}

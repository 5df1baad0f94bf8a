//! ECR image registry addressed by convention.

use async_trait::async_trait;

use slipway_core::{ImageRef, ImageRegistry, Result, ServiceUnit, Target};

/// Resolves service unit images in the target account's ECR registry.
///
/// Addressing is by convention: one repository per unit, named after it,
/// in the same account and region the stack deploys to. The stack engine
/// verifies the image actually exists when the definition is applied.
#[derive(Debug, Clone)]
pub struct EcrImageRegistry {
    account_id: String,
    region: String,
    tag: String,
}

impl EcrImageRegistry {
    pub const DEFAULT_TAG: &'static str = "latest";

    pub fn new(target: &Target) -> Self {
        Self {
            account_id: target.account_id.clone(),
            region: target.region.clone(),
            tag: Self::DEFAULT_TAG.to_string(),
        }
    }

    /// Resolve a specific image tag instead of `latest`.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    fn registry_host(&self) -> String {
        format!("{}.dkr.ecr.{}.amazonaws.com", self.account_id, self.region)
    }
}

#[async_trait]
impl ImageRegistry for EcrImageRegistry {
    async fn resolve_image(&self, unit: &ServiceUnit) -> Result<ImageRef> {
        Ok(ImageRef {
            unit: unit.clone(),
            uri: format!("{}/{}:{}", self.registry_host(), unit, self.tag),
        })
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

    #[tokio::test]
    async fn test_resolves_conventional_uri() {
        let registry = EcrImageRegistry::new(&target());
        let unit = ServiceUnit::new("rest-api-lambda").unwrap();

        let image = registry.resolve_image(&unit).await.unwrap();
        assert_eq!(
            image.uri,
            "123456789012.dkr.ecr.us-east-1.amazonaws.com/rest-api-lambda:latest"
        );
        assert_eq!(image.unit, unit);
    }

    #[tokio::test]
    async fn test_tag_override() {
        let registry = EcrImageRegistry::new(&target()).with_tag("v42");
        let unit = ServiceUnit::new("mqtt-lambda").unwrap();

        let image = registry.resolve_image(&unit).await.unwrap();
        assert!(image.uri.ends_with("/mqtt-lambda:v42"));
    }
}

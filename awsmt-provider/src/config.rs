//! Provider configuration

use aws_config::{BehaviorVersion, Region};
use awsmt_core::resource::Value;
use serde::{Deserialize, Serialize};

use crate::schemas::types::{aws_region, normalize_region};

/// Settings of the `provider` block
///
/// Unset values fall back to the AWS default chain (environment, profile
/// files, instance metadata).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

impl ProviderConfig {
    /// Region in AWS format, if configured
    pub fn region(&self) -> Option<String> {
        self.region.as_deref().map(normalize_region)
    }

    /// Reject regions where MediaTailor is not offered
    pub fn validate(&self) -> Result<(), String> {
        match &self.region {
            Some(region) => aws_region()
                .validate(&Value::string(region))
                .map_err(|e| format!("provider.region: {}", e)),
            None => Ok(()),
        }
    }

    /// Load the AWS SDK configuration for these settings
    pub async fn load_sdk_config(&self) -> aws_config::SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = self.region() {
            loader = loader.region(Region::new(region));
        }
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        loader.load().await
    }
}

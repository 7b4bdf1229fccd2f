//! MediaTailor-specific type definitions

use awsmt_core::resource::Value;
use awsmt_core::schema::{AttributeType, types};

/// Regions where MediaTailor is available
pub const VALID_REGIONS: &[&str] = &[
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-south-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ca-central-1",
    "eu-central-1",
    "eu-north-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "me-central-1",
    "sa-east-1",
    "us-east-1",
    "us-east-2",
    "us-west-2",
];

/// AWS region type with custom validation
/// Accepts:
/// - AWS string format: "ap-northeast-1"
/// - Underscore format: "ap_northeast_1"
pub fn aws_region() -> AttributeType {
    AttributeType::Custom {
        name: "Region".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| {
            if let Value::String(s) = value {
                let normalized = normalize_region(s);
                if VALID_REGIONS.contains(&normalized.as_str()) {
                    Ok(())
                } else {
                    Err(format!(
                        "Invalid region '{}', expected one of: {}",
                        s,
                        VALID_REGIONS.join(", ")
                    ))
                }
            } else {
                Err("Expected string".to_string())
            }
        },
    }
}

/// Normalize region string to AWS format (hyphens)
/// - "ap_northeast_1" -> "ap-northeast-1"
/// - "ap-northeast-1" -> "ap-northeast-1"
pub fn normalize_region(s: &str) -> String {
    s.trim().replace('_', "-")
}

/// RUNNING / STOPPED
pub fn channel_state() -> AttributeType {
    types::one_of(&["RUNNING", "STOPPED"])
}

/// LINEAR / LOOP
pub fn playback_mode() -> AttributeType {
    types::one_of(&["LINEAR", "LOOP"])
}

pub fn tier() -> AttributeType {
    types::one_of(&["BASIC", "STANDARD"])
}

pub fn ad_markup_type() -> AttributeType {
    types::one_of(&["DATERANGE", "SCTE35_ENHANCED"])
}

pub fn access_type() -> AttributeType {
    types::one_of(&["S3_SIGV4", "SECRETS_MANAGER_ACCESS_TOKEN", "AUTODETECT_SIGV4"])
}

/// Packaging format of a source
pub fn package_type() -> AttributeType {
    types::one_of(&["DASH", "HLS"])
}

pub fn avail_suppression_mode() -> AttributeType {
    types::one_of(&["OFF", "BEHIND_LIVE_EDGE", "AFTER_LIVE_EDGE"])
}

pub fn fill_policy() -> AttributeType {
    types::one_of(&["FULL_AVAIL_ONLY", "PARTIAL_AVAIL"])
}

pub fn origin_manifest_type() -> AttributeType {
    types::one_of(&["SINGLE_PERIOD", "MULTI_PERIOD"])
}

pub fn mpd_location() -> AttributeType {
    types::one_of(&["DISABLED", "EMT_DEFAULT"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_accepts_aws_format() {
        assert!(
            aws_region()
                .validate(&Value::String("eu-west-1".to_string()))
                .is_ok()
        );
    }

    #[test]
    fn region_accepts_underscore_format() {
        assert!(
            aws_region()
                .validate(&Value::String("ap_northeast_1".to_string()))
                .is_ok()
        );
    }

    #[test]
    fn region_rejects_invalid_region() {
        let result = aws_region().validate(&Value::String("invalid-region".to_string()));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Invalid region"));
        assert!(err.contains("us-east-1")); // Should suggest valid regions
    }

    #[test]
    fn region_rejects_availability_zone() {
        assert!(
            aws_region()
                .validate(&Value::String("us-east-1a".to_string()))
                .is_err()
        );
    }

    #[test]
    fn channel_state_rejects_lowercase() {
        assert!(channel_state().validate(&Value::string("running")).is_err());
        assert!(channel_state().validate(&Value::string("RUNNING")).is_ok());
    }

    #[test]
    fn package_type_rejects_bool() {
        assert!(package_type().validate(&Value::Bool(true)).is_err());
    }
}

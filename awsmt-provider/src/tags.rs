//! Tag handling shared by all MediaTailor resources

use std::collections::HashMap;

use aws_sdk_mediatailor::Client;
use awsmt_core::differ::diff_tags;
use awsmt_core::provider::{ProviderError, ProviderResult};

use crate::convert::{Attributes, string_map_value, to_string_map};

/// Tags declared on a resource (empty when absent)
pub fn tags_from_attributes(attrs: &Attributes) -> HashMap<String, String> {
    attrs.get("tags").map(to_string_map).unwrap_or_default()
}

/// Tags to send on create; `None` when no tags are declared
pub fn tags_for_create(attrs: &Attributes) -> Option<HashMap<String, String>> {
    let tags = tags_from_attributes(attrs);
    if tags.is_empty() { None } else { Some(tags) }
}

/// Record tags reported by the API, omitting an empty map
pub fn insert_tags(attrs: &mut Attributes, tags: Option<&HashMap<String, String>>) {
    if let Some(tags) = tags
        && !tags.is_empty()
    {
        attrs.insert("tags".to_string(), string_map_value(tags));
    }
}

/// Bring the tags on `arn` from `old` to `new`
///
/// Removed keys are untagged first, then added or changed keys are tagged.
/// Equal maps make no calls.
pub async fn apply_tag_diff(
    client: &Client,
    arn: &str,
    old: &HashMap<String, String>,
    new: &HashMap<String, String>,
) -> ProviderResult<()> {
    let diff = diff_tags(old, new);
    if diff.is_empty() {
        return Ok(());
    }

    if !diff.remove.is_empty() {
        log::debug!("Untagging {}: {:?}", arn, diff.remove);
        client
            .untag_resource()
            .resource_arn(arn)
            .set_tag_keys(Some(diff.remove))
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("Failed to untag resource: {:?}", e)))?;
    }

    if !diff.set.is_empty() {
        log::debug!("Tagging {}: {:?}", arn, diff.set);
        client
            .tag_resource()
            .resource_arn(arn)
            .set_tags(Some(diff.set))
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("Failed to tag resource: {:?}", e)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use awsmt_core::resource::Value;

    #[test]
    fn missing_tags_are_empty() {
        let attrs = Attributes::new();
        assert!(tags_from_attributes(&attrs).is_empty());
        assert_eq!(tags_for_create(&attrs), None);
    }

    #[test]
    fn declared_tags_are_read() {
        let mut tags = HashMap::new();
        tags.insert("team".to_string(), Value::string("video"));
        let mut attrs = Attributes::new();
        attrs.insert("tags".to_string(), Value::Map(tags));

        let tags = tags_for_create(&attrs).unwrap();
        assert_eq!(tags.get("team").map(String::as_str), Some("video"));
    }

    #[test]
    fn empty_api_tags_are_not_recorded() {
        let mut attrs = Attributes::new();
        insert_tags(&mut attrs, Some(&HashMap::new()));
        insert_tags(&mut attrs, None);
        assert!(attrs.is_empty());
    }
}

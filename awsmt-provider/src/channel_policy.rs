//! Channel policy - IAM policy attached to a channel
//!
//! Used both by `awsmt_channel` (its optional `policy` attribute) and by the
//! standalone `awsmt_channel_policy` resource.

use aws_sdk_mediatailor::Client;
use awsmt_core::provider::{ProviderError, ProviderResult};
use awsmt_core::resource::{Resource, ResourceId, State, Value};

use crate::convert::{Attributes, get_str};
use crate::{api_error, deleted, is_not_found};

/// What to do with the policy to reach the planned document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    Put(&'a str),
    Delete,
    Keep,
}

/// Compare planned and current policy documents
///
/// Documents are compared as JSON so formatting differences are not changes.
pub fn action<'a>(desired: Option<&'a str>, current: Option<&str>) -> Action<'a> {
    match (desired, current) {
        (Some(d), Some(c)) if same_document(d, c) => Action::Keep,
        (Some(d), _) => Action::Put(d),
        (None, Some(_)) => Action::Delete,
        (None, None) => Action::Keep,
    }
}

fn same_document(a: &str, b: &str) -> bool {
    match (
        serde_json::from_str::<serde_json::Value>(a),
        serde_json::from_str::<serde_json::Value>(b),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Current policy document, `None` when the channel has no policy
pub async fn get(client: &Client, channel_name: &str) -> ProviderResult<Option<String>> {
    log::debug!("GetChannelPolicy {}", channel_name);
    match client
        .get_channel_policy()
        .channel_name(channel_name)
        .send()
        .await
    {
        Ok(out) => Ok(out.policy().map(String::from)),
        Err(err) if is_not_found(&err) => Ok(None),
        Err(err) => Err(api_error("get channel policy", err)),
    }
}

pub async fn put(client: &Client, channel_name: &str, document: &str) -> ProviderResult<()> {
    log::info!("Putting policy on channel {}", channel_name);
    client
        .put_channel_policy()
        .channel_name(channel_name)
        .policy(document)
        .send()
        .await
        .map_err(|e| api_error("put channel policy", e))?;
    Ok(())
}

pub async fn delete(client: &Client, channel_name: &str) -> ProviderResult<()> {
    log::info!("Deleting policy of channel {}", channel_name);
    let result = client
        .delete_channel_policy()
        .channel_name(channel_name)
        .send()
        .await;
    deleted("delete channel policy", result)
}

// ========== awsmt_channel_policy ==========

pub async fn read_resource(
    client: &Client,
    id: &ResourceId,
    channel_name: &str,
) -> ProviderResult<State> {
    let document = get(client, channel_name)
        .await
        .map_err(|e| e.for_resource(id.clone()))?;

    match document {
        Some(document) => {
            let mut attrs = Attributes::new();
            attrs.insert("channel_name".to_string(), Value::string(channel_name));
            attrs.insert("policy".to_string(), Value::string(document));
            Ok(State::existing(id.clone(), attrs).with_identifier(channel_name))
        }
        None => Ok(State::not_found(id.clone())),
    }
}

pub async fn create_resource(client: &Client, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let channel_name = get_str(&resource.attributes, "channel_name")
        .ok_or_else(|| ProviderError::missing_attribute(id, "channel_name"))?;
    let document = get_str(&resource.attributes, "policy")
        .ok_or_else(|| ProviderError::missing_attribute(id, "policy"))?;

    put(client, channel_name, document)
        .await
        .map_err(|e| e.for_resource(id.clone()))?;

    read_resource(client, id, channel_name).await
}

pub async fn update_resource(
    client: &Client,
    id: &ResourceId,
    channel_name: &str,
    to: &Resource,
) -> ProviderResult<State> {
    let document = get_str(&to.attributes, "policy")
        .ok_or_else(|| ProviderError::missing_attribute(id, "policy"))?;

    put(client, channel_name, document)
        .await
        .map_err(|e| e.for_resource(id.clone()))?;

    read_resource(client, id, channel_name).await
}

pub async fn delete_resource(
    client: &Client,
    id: &ResourceId,
    channel_name: &str,
) -> ProviderResult<()> {
    delete(client, channel_name)
        .await
        .map_err(|e| e.for_resource(id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: &str = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Principal":"*","Action":"mediatailor:GetManifest","Resource":"*"}]}"#;

    #[test]
    fn put_when_state_lacks_policy() {
        assert_eq!(action(Some(POLICY), None), Action::Put(POLICY));
    }

    #[test]
    fn put_when_policy_differs() {
        let other = r#"{"Version":"2012-10-17","Statement":[]}"#;
        assert_eq!(action(Some(POLICY), Some(other)), Action::Put(POLICY));
    }

    #[test]
    fn delete_when_plan_lacks_policy() {
        assert_eq!(action(None, Some(POLICY)), Action::Delete);
    }

    #[test]
    fn keep_when_equal_or_both_absent() {
        let reformatted = serde_json::to_string_pretty(
            &serde_json::from_str::<serde_json::Value>(POLICY).unwrap(),
        )
        .unwrap();
        assert_eq!(action(Some(POLICY), Some(&reformatted)), Action::Keep);
        assert_eq!(action(None, None), Action::Keep);
    }
}

//! Awsmt MediaTailor Provider
//!
//! AWS Elemental MediaTailor Provider implementation

pub mod channel;
pub mod channel_policy;
pub mod config;
pub mod convert;
pub mod http_package;
pub mod live_source;
pub mod playback_configuration;
pub mod schemas;
pub mod source_location;
pub mod tags;
pub mod vod_source;

use aws_sdk_mediatailor::Client;
use aws_sdk_mediatailor::error::SdkError;
use awsmt_core::provider::{BoxFuture, Provider, ProviderError, ProviderResult};
use awsmt_core::resource::{Resource, ResourceId, State};
use awsmt_core::schema::ResourceSchema;

pub use config::ProviderConfig;

use schemas::channel::{CHANNEL, CHANNEL_POLICY};
use schemas::playback_configuration::PLAYBACK_CONFIGURATION;
use schemas::source_location::SOURCE_LOCATION;
use schemas::sources::{LIVE_SOURCE, VOD_SOURCE};

/// Whether an SDK error means the requested object does not exist
pub(crate) fn is_not_found<E: std::fmt::Debug>(err: &SdkError<E>) -> bool {
    match err {
        SdkError::ServiceError(service_err) => {
            service_err.raw().status().as_u16() == 404
                || format!("{:?}", service_err.err()).contains("NotFound")
        }
        _ => false,
    }
}

/// Wrap an SDK error as "Failed to <action>: <error>"
pub(crate) fn api_error<E: std::fmt::Debug>(action: &str, err: SdkError<E>) -> ProviderError {
    ProviderError::new(format!("Failed to {}: {:?}", action, err))
}

/// Finish a delete call; an object that is already gone counts as deleted
pub(crate) fn deleted<T, E: std::fmt::Debug>(
    action: &str,
    result: Result<T, SdkError<E>>,
) -> ProviderResult<()> {
    match result {
        Ok(_) => Ok(()),
        Err(err) if is_not_found(&err) => {
            log::warn!("Nothing to {}: already gone", action);
            Ok(())
        }
        Err(err) => Err(api_error(action, err)),
    }
}

/// MediaTailor Provider
pub struct MediaTailorProvider {
    client: Client,
}

impl MediaTailorProvider {
    /// Create a new MediaTailor Provider
    pub async fn new(config: &ProviderConfig) -> Self {
        let sdk_config = config.load_sdk_config().await;
        Self {
            client: Client::new(&sdk_config),
        }
    }

    /// Create with a specific client (for testing)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Provider for MediaTailorProvider {
    fn name(&self) -> &'static str {
        "awsmt"
    }

    fn schemas(&self) -> Vec<ResourceSchema> {
        schemas::all_schemas()
    }

    fn identifier_of(&self, resource: &Resource) -> Option<String> {
        identifier_of(resource)
    }

    fn read(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move {
            let client = &self.client;
            match id.resource_type.as_str() {
                CHANNEL => channel::read(client, &id, &identifier).await,
                CHANNEL_POLICY => channel_policy::read_resource(client, &id, &identifier).await,
                SOURCE_LOCATION => source_location::read(client, &id, &identifier).await,
                VOD_SOURCE => vod_source::read(client, &id, &identifier).await,
                LIVE_SOURCE => live_source::read(client, &id, &identifier).await,
                PLAYBACK_CONFIGURATION => {
                    playback_configuration::read(client, &id, &identifier).await
                }
                _ => Err(ProviderError::unknown_type(&id)),
            }
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            let client = &self.client;
            match resource.id.resource_type.as_str() {
                CHANNEL => channel::create(client, &resource).await,
                CHANNEL_POLICY => channel_policy::create_resource(client, &resource).await,
                SOURCE_LOCATION => source_location::create(client, &resource).await,
                VOD_SOURCE => vod_source::create(client, &resource).await,
                LIVE_SOURCE => live_source::create(client, &resource).await,
                PLAYBACK_CONFIGURATION => playback_configuration::create(client, &resource).await,
                _ => Err(ProviderError::unknown_type(&resource.id)),
            }
        })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move {
            let client = &self.client;
            match id.resource_type.as_str() {
                CHANNEL => channel::update(client, &id, &identifier, &from, &to).await,
                CHANNEL_POLICY => {
                    channel_policy::update_resource(client, &id, &identifier, &to).await
                }
                SOURCE_LOCATION => {
                    source_location::update(client, &id, &identifier, &from, &to).await
                }
                VOD_SOURCE => vod_source::update(client, &id, &identifier, &from, &to).await,
                LIVE_SOURCE => live_source::update(client, &id, &identifier, &from, &to).await,
                PLAYBACK_CONFIGURATION => {
                    playback_configuration::update(client, &id, &identifier, &from, &to).await
                }
                _ => Err(ProviderError::unknown_type(&id)),
            }
        })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move {
            let client = &self.client;
            match id.resource_type.as_str() {
                CHANNEL => channel::delete(client, &id, &identifier).await,
                CHANNEL_POLICY => channel_policy::delete_resource(client, &id, &identifier).await,
                SOURCE_LOCATION => source_location::delete(client, &id, &identifier).await,
                VOD_SOURCE => vod_source::delete(client, &id, &identifier).await,
                LIVE_SOURCE => live_source::delete(client, &id, &identifier).await,
                PLAYBACK_CONFIGURATION => {
                    playback_configuration::delete(client, &id, &identifier).await
                }
                _ => Err(ProviderError::unknown_type(&id)),
            }
        })
    }
}

/// Provider identifier derived from declared attributes
///
/// - channel, channel policy: channel name
/// - source location: source location name
/// - VOD / live source: `"<source_location_name>,<source_name>"`
/// - playback configuration: name
pub fn identifier_of(resource: &Resource) -> Option<String> {
    let get = |key: &str| resource.get_str(key).map(String::from);
    match resource.id.resource_type.as_str() {
        CHANNEL | CHANNEL_POLICY => get("channel_name"),
        SOURCE_LOCATION => get("source_location_name"),
        VOD_SOURCE => Some(http_package::join_identifier(
            resource.get_str("source_location_name")?,
            resource.get_str("vod_source_name")?,
        )),
        LIVE_SOURCE => Some(http_package::join_identifier(
            resource.get_str("source_location_name")?,
            resource.get_str("live_source_name")?,
        )),
        PLAYBACK_CONFIGURATION => get("name"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_smithy_runtime_api::http::{Response, StatusCode};
    use aws_smithy_types::body::SdkBody;
    use awsmt_core::resource::Value;

    #[test]
    fn channel_identifier_is_its_name() {
        let resource = Resource::new(CHANNEL, "main")
            .with_attribute("channel_name", Value::string("linear-1"));
        assert_eq!(identifier_of(&resource), Some("linear-1".to_string()));

        let policy = Resource::new(CHANNEL_POLICY, "main")
            .with_attribute("channel_name", Value::string("linear-1"));
        assert_eq!(identifier_of(&policy), Some("linear-1".to_string()));
    }

    #[test]
    fn source_identifiers_are_composite() {
        let vod = Resource::new(VOD_SOURCE, "ad")
            .with_attribute("source_location_name", Value::string("origin"))
            .with_attribute("vod_source_name", Value::string("ad-1"));
        assert_eq!(identifier_of(&vod), Some("origin,ad-1".to_string()));

        let live = Resource::new(LIVE_SOURCE, "feed")
            .with_attribute("source_location_name", Value::string("origin"))
            .with_attribute("live_source_name", Value::string("feed-1"));
        assert_eq!(identifier_of(&live), Some("origin,feed-1".to_string()));
    }

    #[test]
    fn missing_name_has_no_identifier() {
        let vod = Resource::new(VOD_SOURCE, "ad")
            .with_attribute("source_location_name", Value::string("origin"));
        assert_eq!(identifier_of(&vod), None);
        assert_eq!(identifier_of(&Resource::new("awsmt_unknown", "x")), None);
    }

    #[test]
    fn playback_configuration_identifier() {
        let resource = Resource::new(PLAYBACK_CONFIGURATION, "ssai")
            .with_attribute("name", Value::string("ssai-prod"));
        assert_eq!(identifier_of(&resource), Some("ssai-prod".to_string()));
    }

    fn service_error(status: u16, message: &str) -> SdkError<String> {
        let raw = Response::new(StatusCode::try_from(status).unwrap(), SdkBody::empty());
        SdkError::service_error(message.to_string(), raw)
    }

    #[test]
    fn delete_of_missing_object_succeeds() {
        let result: Result<(), _> = Err(service_error(404, "NotFoundException"));
        assert!(deleted("delete VOD source", result).is_ok());
    }

    #[test]
    fn delete_failure_is_reported() {
        let result: Result<(), _> = Err(service_error(400, "BadRequestException"));
        let err = deleted("delete live source", result).unwrap_err();
        assert!(err.to_string().contains("Failed to delete live source"));
    }

    #[test]
    fn not_found_is_recognised_by_status_or_name() {
        assert!(is_not_found(&service_error(404, "")));
        assert!(is_not_found(&service_error(400, "NotFoundException")));
        assert!(!is_not_found(&service_error(409, "ConflictException")));
    }

    #[test]
    fn unknown_type_errors_name_the_resource() {
        let err = ProviderError::unknown_type(&ResourceId::new("awsmt_bogus", "x"));
        assert_eq!(
            err.to_string(),
            "[awsmt_bogus.x] Unknown resource type: awsmt_bogus"
        );
    }
}

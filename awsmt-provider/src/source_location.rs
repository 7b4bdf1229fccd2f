//! Source location - CRUD for `awsmt_source_location`

use aws_sdk_mediatailor::Client;
use aws_sdk_mediatailor::operation::describe_source_location::DescribeSourceLocationOutput;
use aws_sdk_mediatailor::types::{
    AccessConfiguration, AccessType, DefaultSegmentDeliveryConfiguration, HttpConfiguration,
    SecretsManagerAccessTokenConfiguration, SegmentDeliveryConfiguration,
};
use awsmt_core::provider::{ProviderError, ProviderResult};
use awsmt_core::resource::{Resource, ResourceId, State, Value};

use crate::convert::{
    Attributes, build_error, get_block, get_blocks, get_str, insert_block, insert_datetime,
    insert_str,
};
use crate::tags::{apply_tag_diff, insert_tags, tags_for_create, tags_from_attributes};
use crate::{api_error, deleted, is_not_found, live_source, vod_source};

// ========== Plan -> API ==========

pub fn access_configuration_to_api(block: &Attributes) -> AccessConfiguration {
    let secrets = get_block(block, "secrets_manager_access_token_configuration").map(|s| {
        SecretsManagerAccessTokenConfiguration::builder()
            .set_header_name(get_str(s, "header_name").map(String::from))
            .set_secret_arn(get_str(s, "secret_arn").map(String::from))
            .set_secret_string_key(get_str(s, "secret_string_key").map(String::from))
            .build()
    });
    AccessConfiguration::builder()
        .set_access_type(get_str(block, "access_type").map(AccessType::from))
        .set_secrets_manager_access_token_configuration(secrets)
        .build()
}

pub fn http_configuration_to_api(attrs: &Attributes) -> ProviderResult<HttpConfiguration> {
    HttpConfiguration::builder()
        .set_base_url(
            get_block(attrs, "http_configuration")
                .and_then(|b| get_str(b, "base_url"))
                .map(String::from),
        )
        .build()
        .map_err(|e| build_error("http configuration", e))
}

pub fn default_segment_delivery_to_api(block: &Attributes) -> DefaultSegmentDeliveryConfiguration {
    DefaultSegmentDeliveryConfiguration::builder()
        .set_base_url(get_str(block, "base_url").map(String::from))
        .build()
}

pub fn segment_delivery_to_api(attrs: &Attributes) -> Option<Vec<SegmentDeliveryConfiguration>> {
    attrs.get("segment_delivery_configurations")?;
    Some(
        get_blocks(attrs, "segment_delivery_configurations")
            .into_iter()
            .map(|block| {
                SegmentDeliveryConfiguration::builder()
                    .set_base_url(get_str(block, "base_url").map(String::from))
                    .set_name(get_str(block, "name").map(String::from))
                    .build()
            })
            .collect(),
    )
}

// ========== API -> State ==========

pub fn access_configuration_from_api(config: &AccessConfiguration) -> Attributes {
    let mut block = Attributes::new();
    insert_str(
        &mut block,
        "access_type",
        config.access_type().map(|t| t.as_str()),
    );
    if let Some(secrets) = config.secrets_manager_access_token_configuration() {
        let mut inner = Attributes::new();
        insert_str(&mut inner, "header_name", secrets.header_name());
        insert_str(&mut inner, "secret_arn", secrets.secret_arn());
        insert_str(&mut inner, "secret_string_key", secrets.secret_string_key());
        insert_block(
            &mut block,
            "secrets_manager_access_token_configuration",
            inner,
        );
    }
    block
}

pub fn segment_delivery_from_api(configs: &[SegmentDeliveryConfiguration]) -> Value {
    Value::List(
        configs
            .iter()
            .map(|config| {
                let mut block = Attributes::new();
                insert_str(&mut block, "base_url", config.base_url());
                insert_str(&mut block, "name", config.name());
                Value::Map(block)
            })
            .collect(),
    )
}

fn source_location_from_api(out: &DescribeSourceLocationOutput) -> Attributes {
    let mut attrs = Attributes::new();
    insert_str(&mut attrs, "source_location_name", out.source_location_name());
    insert_str(&mut attrs, "arn", out.arn());
    if let Some(http) = out.http_configuration() {
        let mut block = Attributes::new();
        block.insert("base_url".to_string(), Value::string(http.base_url()));
        insert_block(&mut attrs, "http_configuration", block);
    }
    if let Some(access) = out.access_configuration() {
        insert_block(
            &mut attrs,
            "access_configuration",
            access_configuration_from_api(access),
        );
    }
    if let Some(default) = out.default_segment_delivery_configuration() {
        let mut block = Attributes::new();
        insert_str(&mut block, "base_url", default.base_url());
        insert_block(&mut attrs, "default_segment_delivery_configuration", block);
    }
    if !out.segment_delivery_configurations().is_empty() {
        attrs.insert(
            "segment_delivery_configurations".to_string(),
            segment_delivery_from_api(out.segment_delivery_configurations()),
        );
    }
    insert_tags(&mut attrs, out.tags());
    insert_datetime(&mut attrs, "creation_time", out.creation_time());
    insert_datetime(&mut attrs, "last_modified_time", out.last_modified_time());
    attrs
}

// ========== Operations ==========

pub async fn read(client: &Client, id: &ResourceId, name: &str) -> ProviderResult<State> {
    log::debug!("DescribeSourceLocation {}", name);
    match client
        .describe_source_location()
        .source_location_name(name)
        .send()
        .await
    {
        Ok(out) => {
            Ok(State::existing(id.clone(), source_location_from_api(&out)).with_identifier(name))
        }
        Err(err) if is_not_found(&err) => Ok(State::not_found(id.clone())),
        Err(err) => Err(api_error("describe source location", err).for_resource(id.clone())),
    }
}

pub async fn create(client: &Client, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let attrs = &resource.attributes;
    let name = get_str(attrs, "source_location_name")
        .ok_or_else(|| ProviderError::missing_attribute(id, "source_location_name"))?;
    let http = http_configuration_to_api(attrs).map_err(|e| e.for_resource(id.clone()))?;

    log::info!("Creating source location {}", name);
    client
        .create_source_location()
        .source_location_name(name)
        .http_configuration(http)
        .set_access_configuration(
            get_block(attrs, "access_configuration").map(access_configuration_to_api),
        )
        .set_default_segment_delivery_configuration(
            get_block(attrs, "default_segment_delivery_configuration")
                .map(default_segment_delivery_to_api),
        )
        .set_segment_delivery_configurations(segment_delivery_to_api(attrs))
        .set_tags(tags_for_create(attrs))
        .send()
        .await
        .map_err(|e| api_error("create source location", e).for_resource(id.clone()))?;

    read(client, id, name).await
}

pub async fn update(
    client: &Client,
    id: &ResourceId,
    name: &str,
    from: &State,
    to: &Resource,
) -> ProviderResult<State> {
    let attrs = &to.attributes;
    let http = http_configuration_to_api(attrs).map_err(|e| e.for_resource(id.clone()))?;

    log::info!("Updating source location {}", name);
    client
        .update_source_location()
        .source_location_name(name)
        .http_configuration(http)
        .set_access_configuration(
            get_block(attrs, "access_configuration").map(access_configuration_to_api),
        )
        .set_default_segment_delivery_configuration(
            get_block(attrs, "default_segment_delivery_configuration")
                .map(default_segment_delivery_to_api),
        )
        .set_segment_delivery_configurations(segment_delivery_to_api(attrs))
        .send()
        .await
        .map_err(|e| api_error("update source location", e).for_resource(id.clone()))?;

    if let Some(arn) = from.get_str("arn") {
        apply_tag_diff(
            client,
            arn,
            &tags_from_attributes(&from.attributes),
            &tags_from_attributes(attrs),
        )
        .await
        .map_err(|e| e.for_resource(id.clone()))?;
    }

    read(client, id, name).await
}

/// Delete a source location along with every VOD and live source it holds
pub async fn delete(client: &Client, id: &ResourceId, name: &str) -> ProviderResult<()> {
    for source in vod_source::list(client, name)
        .await
        .map_err(|e| e.for_resource(id.clone()))?
    {
        log::info!("Deleting VOD source {} of {}", source, name);
        vod_source::delete_source(client, name, &source)
            .await
            .map_err(|e| e.for_resource(id.clone()))?;
    }

    for source in live_source::list(client, name)
        .await
        .map_err(|e| e.for_resource(id.clone()))?
    {
        log::info!("Deleting live source {} of {}", source, name);
        live_source::delete_source(client, name, &source)
            .await
            .map_err(|e| e.for_resource(id.clone()))?;
    }

    log::info!("Deleting source location {}", name);
    let result = client
        .delete_source_location()
        .source_location_name(name)
        .send()
        .await;
    deleted("delete source location", result).map_err(|e| e.for_resource(id.clone()))
}

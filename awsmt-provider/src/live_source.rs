//! Live source - CRUD for `awsmt_live_source`

use aws_sdk_mediatailor::Client;
use aws_sdk_mediatailor::operation::describe_live_source::DescribeLiveSourceOutput;
use awsmt_core::provider::{ProviderError, ProviderResult};
use awsmt_core::resource::{Resource, ResourceId, State};

use crate::convert::{Attributes, get_str, insert_datetime, insert_str};
use crate::http_package::{self, join_identifier, split_identifier};
use crate::tags::{apply_tag_diff, insert_tags, tags_for_create, tags_from_attributes};
use crate::{api_error, deleted, is_not_found};

fn live_source_from_api(out: &DescribeLiveSourceOutput) -> Attributes {
    let mut attrs = Attributes::new();
    insert_str(&mut attrs, "live_source_name", out.live_source_name());
    insert_str(&mut attrs, "source_location_name", out.source_location_name());
    insert_str(&mut attrs, "arn", out.arn());
    attrs.insert(
        "http_package_configurations".to_string(),
        http_package::from_api(out.http_package_configurations()),
    );
    insert_tags(&mut attrs, out.tags());
    insert_datetime(&mut attrs, "creation_time", out.creation_time());
    insert_datetime(&mut attrs, "last_modified_time", out.last_modified_time());
    attrs
}

/// Names of the live sources in a source location
pub async fn list(client: &Client, source_location_name: &str) -> ProviderResult<Vec<String>> {
    let mut names = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
        log::debug!("ListLiveSources {}", source_location_name);
        let out = client
            .list_live_sources()
            .source_location_name(source_location_name)
            .set_next_token(next_token.take())
            .send()
            .await
            .map_err(|e| api_error("list live sources", e))?;

        names.extend(out.items().iter().map(|s| s.live_source_name().to_string()));

        match out.next_token() {
            Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
            _ => break,
        }
    }

    Ok(names)
}

pub async fn delete_source(
    client: &Client,
    source_location_name: &str,
    live_source_name: &str,
) -> ProviderResult<()> {
    let result = client
        .delete_live_source()
        .source_location_name(source_location_name)
        .live_source_name(live_source_name)
        .send()
        .await;
    deleted("delete live source", result)
}

pub async fn read(client: &Client, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
    let (location, name) = split_identifier(identifier).map_err(|e| e.for_resource(id.clone()))?;

    log::debug!("DescribeLiveSource {}", identifier);
    match client
        .describe_live_source()
        .source_location_name(location)
        .live_source_name(name)
        .send()
        .await
    {
        Ok(out) => {
            Ok(State::existing(id.clone(), live_source_from_api(&out)).with_identifier(identifier))
        }
        Err(err) if is_not_found(&err) => Ok(State::not_found(id.clone())),
        Err(err) => Err(api_error("describe live source", err).for_resource(id.clone())),
    }
}

pub async fn create(client: &Client, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let attrs = &resource.attributes;
    let location = get_str(attrs, "source_location_name")
        .ok_or_else(|| ProviderError::missing_attribute(id, "source_location_name"))?;
    let name = get_str(attrs, "live_source_name")
        .ok_or_else(|| ProviderError::missing_attribute(id, "live_source_name"))?;
    let packages = http_package::to_api(attrs).map_err(|e| e.for_resource(id.clone()))?;

    log::info!("Creating live source {} in {}", name, location);
    client
        .create_live_source()
        .source_location_name(location)
        .live_source_name(name)
        .set_http_package_configurations(Some(packages))
        .set_tags(tags_for_create(attrs))
        .send()
        .await
        .map_err(|e| api_error("create live source", e).for_resource(id.clone()))?;

    read(client, id, &join_identifier(location, name)).await
}

pub async fn update(
    client: &Client,
    id: &ResourceId,
    identifier: &str,
    from: &State,
    to: &Resource,
) -> ProviderResult<State> {
    let (location, name) = split_identifier(identifier).map_err(|e| e.for_resource(id.clone()))?;
    let attrs = &to.attributes;
    let packages = http_package::to_api(attrs).map_err(|e| e.for_resource(id.clone()))?;

    log::info!("Updating live source {} in {}", name, location);
    client
        .update_live_source()
        .source_location_name(location)
        .live_source_name(name)
        .set_http_package_configurations(Some(packages))
        .send()
        .await
        .map_err(|e| api_error("update live source", e).for_resource(id.clone()))?;

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

    read(client, id, identifier).await
}

pub async fn delete(client: &Client, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
    let (location, name) = split_identifier(identifier).map_err(|e| e.for_resource(id.clone()))?;
    log::info!("Deleting live source {} in {}", name, location);
    delete_source(client, location, name)
        .await
        .map_err(|e| e.for_resource(id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_mediatailor::primitives::DateTime;
    use aws_sdk_mediatailor::types::{HttpPackageConfiguration, Type};
    use awsmt_core::resource::Value;

    fn package(path: &str, source_group: &str, kind: Type) -> HttpPackageConfiguration {
        HttpPackageConfiguration::builder()
            .path(path)
            .source_group(source_group)
            .r#type(kind)
            .build()
            .unwrap()
    }

    #[test]
    fn describe_output_carries_every_field() {
        let out = DescribeLiveSourceOutput::builder()
            .live_source_name("feed-1")
            .source_location_name("origin")
            .arn("arn:aws:mediatailor:us-east-1:123456789012:liveSource/origin/feed-1")
            .http_package_configurations(package("/live/index.m3u8", "hls", Type::Hls))
            .http_package_configurations(package("/live/index.mpd", "dash", Type::Dash))
            .tags("env", "prod")
            .last_modified_time(DateTime::from_secs(1_700_000_000))
            .build();

        let attrs = live_source_from_api(&out);
        assert_eq!(attrs["live_source_name"], Value::string("feed-1"));
        assert_eq!(attrs["source_location_name"], Value::string("origin"));
        assert_eq!(
            attrs["arn"],
            Value::string("arn:aws:mediatailor:us-east-1:123456789012:liveSource/origin/feed-1")
        );
        assert_eq!(
            attrs["last_modified_time"],
            Value::string("2023-11-14T22:13:20+00:00")
        );
        assert!(!attrs.contains_key("ad_break_opportunities"));

        let packages = attrs["http_package_configurations"].as_list().unwrap();
        assert_eq!(packages.len(), 2);
        assert_eq!(
            packages[1].as_map().unwrap()["source_group"],
            Value::string("dash")
        );
        assert_eq!(
            attrs["tags"].as_map().unwrap()["env"],
            Value::string("prod")
        );
    }

    #[test]
    fn identifier_must_be_composite() {
        let id = ResourceId::new("awsmt_live_source", "feed");
        let err = split_identifier("feed-1")
            .map_err(|e| e.for_resource(id))
            .unwrap_err();
        assert!(err.to_string().starts_with("[awsmt_live_source.feed] Invalid source identifier"));
    }
}

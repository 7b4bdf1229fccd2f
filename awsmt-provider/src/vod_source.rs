//! VOD source - CRUD for `awsmt_vod_source`

use aws_sdk_mediatailor::Client;
use aws_sdk_mediatailor::operation::describe_vod_source::DescribeVodSourceOutput;
use awsmt_core::provider::{ProviderError, ProviderResult};
use awsmt_core::resource::{Resource, ResourceId, State, Value};

use crate::convert::{Attributes, get_str, insert_datetime, insert_str};
use crate::http_package::{self, join_identifier, split_identifier};
use crate::tags::{apply_tag_diff, insert_tags, tags_for_create, tags_from_attributes};
use crate::{api_error, deleted, is_not_found};

fn vod_source_from_api(out: &DescribeVodSourceOutput) -> Attributes {
    let mut attrs = Attributes::new();
    insert_str(&mut attrs, "vod_source_name", out.vod_source_name());
    insert_str(&mut attrs, "source_location_name", out.source_location_name());
    insert_str(&mut attrs, "arn", out.arn());
    attrs.insert(
        "http_package_configurations".to_string(),
        http_package::from_api(out.http_package_configurations()),
    );
    attrs.insert(
        "ad_break_opportunities".to_string(),
        Value::List(
            out.ad_break_opportunities()
                .iter()
                .map(|o| Value::Int(o.offset_millis()))
                .collect(),
        ),
    );
    insert_tags(&mut attrs, out.tags());
    insert_datetime(&mut attrs, "creation_time", out.creation_time());
    insert_datetime(&mut attrs, "last_modified_time", out.last_modified_time());
    attrs
}

/// Names of the VOD sources in a source location
pub async fn list(client: &Client, source_location_name: &str) -> ProviderResult<Vec<String>> {
    let mut names = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
        log::debug!("ListVodSources {}", source_location_name);
        let out = client
            .list_vod_sources()
            .source_location_name(source_location_name)
            .set_next_token(next_token.take())
            .send()
            .await
            .map_err(|e| api_error("list VOD sources", e))?;

        names.extend(out.items().iter().map(|s| s.vod_source_name().to_string()));

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
    vod_source_name: &str,
) -> ProviderResult<()> {
    let result = client
        .delete_vod_source()
        .source_location_name(source_location_name)
        .vod_source_name(vod_source_name)
        .send()
        .await;
    deleted("delete VOD source", result)
}

pub async fn read(client: &Client, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
    let (location, name) = split_identifier(identifier).map_err(|e| e.for_resource(id.clone()))?;

    log::debug!("DescribeVodSource {}", identifier);
    match client
        .describe_vod_source()
        .source_location_name(location)
        .vod_source_name(name)
        .send()
        .await
    {
        Ok(out) => {
            Ok(State::existing(id.clone(), vod_source_from_api(&out)).with_identifier(identifier))
        }
        Err(err) if is_not_found(&err) => Ok(State::not_found(id.clone())),
        Err(err) => Err(api_error("describe VOD source", err).for_resource(id.clone())),
    }
}

pub async fn create(client: &Client, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let attrs = &resource.attributes;
    let location = get_str(attrs, "source_location_name")
        .ok_or_else(|| ProviderError::missing_attribute(id, "source_location_name"))?;
    let name = get_str(attrs, "vod_source_name")
        .ok_or_else(|| ProviderError::missing_attribute(id, "vod_source_name"))?;
    let packages = http_package::to_api(attrs).map_err(|e| e.for_resource(id.clone()))?;

    log::info!("Creating VOD source {} in {}", name, location);
    client
        .create_vod_source()
        .source_location_name(location)
        .vod_source_name(name)
        .set_http_package_configurations(Some(packages))
        .set_tags(tags_for_create(attrs))
        .send()
        .await
        .map_err(|e| api_error("create VOD source", e).for_resource(id.clone()))?;

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

    log::info!("Updating VOD source {} in {}", name, location);
    client
        .update_vod_source()
        .source_location_name(location)
        .vod_source_name(name)
        .set_http_package_configurations(Some(packages))
        .send()
        .await
        .map_err(|e| api_error("update VOD source", e).for_resource(id.clone()))?;

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
    log::info!("Deleting VOD source {} in {}", name, location);
    delete_source(client, location, name)
        .await
        .map_err(|e| e.for_resource(id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_mediatailor::primitives::DateTime;
    use aws_sdk_mediatailor::types::{AdBreakOpportunity, HttpPackageConfiguration, Type};

    fn opportunity(offset_millis: i64) -> AdBreakOpportunity {
        AdBreakOpportunity::builder()
            .offset_millis(offset_millis)
            .build()
    }

    #[test]
    fn describe_output_carries_every_field() {
        let out = DescribeVodSourceOutput::builder()
            .vod_source_name("ad-1")
            .source_location_name("origin")
            .arn("arn:aws:mediatailor:us-east-1:123456789012:vodSource/origin/ad-1")
            .http_package_configurations(
                HttpPackageConfiguration::builder()
                    .path("/ad/index.m3u8")
                    .source_group("hls")
                    .r#type(Type::Hls)
                    .build()
                    .unwrap(),
            )
            .ad_break_opportunities(opportunity(15000))
            .ad_break_opportunities(opportunity(45000))
            .tags("team", "ads")
            .creation_time(DateTime::from_secs(1_700_000_000))
            .build();

        let attrs = vod_source_from_api(&out);
        assert_eq!(attrs["vod_source_name"], Value::string("ad-1"));
        assert_eq!(attrs["source_location_name"], Value::string("origin"));
        assert_eq!(
            attrs["arn"],
            Value::string("arn:aws:mediatailor:us-east-1:123456789012:vodSource/origin/ad-1")
        );
        assert_eq!(
            attrs["ad_break_opportunities"],
            Value::List(vec![Value::Int(15000), Value::Int(45000)])
        );
        assert_eq!(
            attrs["creation_time"],
            Value::string("2023-11-14T22:13:20+00:00")
        );
        assert!(!attrs.contains_key("last_modified_time"));

        let packages = attrs["http_package_configurations"].as_list().unwrap();
        let package = packages[0].as_map().unwrap();
        assert_eq!(package["path"], Value::string("/ad/index.m3u8"));
        assert_eq!(package["type"], Value::string("HLS"));

        let tags = attrs["tags"].as_map().unwrap();
        assert_eq!(tags["team"], Value::string("ads"));
    }

    #[test]
    fn source_without_ad_breaks_has_empty_list() {
        let out = DescribeVodSourceOutput::builder()
            .vod_source_name("main")
            .source_location_name("origin")
            .build();

        let attrs = vod_source_from_api(&out);
        assert_eq!(attrs["ad_break_opportunities"], Value::List(vec![]));
        assert_eq!(attrs["http_package_configurations"], Value::List(vec![]));
        assert!(!attrs.contains_key("tags"));
    }
}

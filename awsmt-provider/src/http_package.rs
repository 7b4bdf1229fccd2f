//! Pieces shared by VOD and live sources

use aws_sdk_mediatailor::types::{HttpPackageConfiguration, Type};
use awsmt_core::provider::{ProviderError, ProviderResult};
use awsmt_core::resource::Value;

use crate::convert::{Attributes, build_error, get_blocks, get_str};

/// Identifier of a source: `"<source_location_name>,<source_name>"`
pub fn join_identifier(source_location_name: &str, source_name: &str) -> String {
    format!("{},{}", source_location_name, source_name)
}

/// Split a source identifier into source location name and source name
pub fn split_identifier(identifier: &str) -> ProviderResult<(&str, &str)> {
    match identifier.split_once(',') {
        Some((location, source)) if !location.is_empty() && !source.is_empty() => {
            Ok((location, source))
        }
        _ => Err(ProviderError::new(format!(
            "Invalid source identifier '{}': expected <source_location_name>,<source_name>",
            identifier
        ))),
    }
}

pub fn to_api(attrs: &Attributes) -> ProviderResult<Vec<HttpPackageConfiguration>> {
    get_blocks(attrs, "http_package_configurations")
        .into_iter()
        .map(|block| {
            HttpPackageConfiguration::builder()
                .set_path(get_str(block, "path").map(String::from))
                .set_source_group(get_str(block, "source_group").map(String::from))
                .set_type(get_str(block, "type").map(Type::from))
                .build()
                .map_err(|e| build_error("http package configuration", e))
        })
        .collect()
}

pub fn from_api(configs: &[HttpPackageConfiguration]) -> Value {
    Value::List(
        configs
            .iter()
            .map(|config| {
                let mut block = Attributes::new();
                block.insert("path".to_string(), Value::string(config.path()));
                block.insert(
                    "source_group".to_string(),
                    Value::string(config.source_group()),
                );
                block.insert("type".to_string(), Value::string(config.r#type().as_str()));
                Value::Map(block)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_round_trip() {
        let identifier = join_identifier("origin", "ad-1");
        assert_eq!(identifier, "origin,ad-1");
        assert_eq!(split_identifier(&identifier).unwrap(), ("origin", "ad-1"));
    }

    #[test]
    fn malformed_identifiers_are_rejected() {
        assert!(split_identifier("origin").is_err());
        assert!(split_identifier(",ad").is_err());
        assert!(split_identifier("origin,").is_err());
    }

    #[test]
    fn packages_carry_every_field() {
        let mut block = Attributes::new();
        block.insert("path".to_string(), Value::string("/vod/ad.mpd"));
        block.insert("source_group".to_string(), Value::string("dash"));
        block.insert("type".to_string(), Value::string("DASH"));
        let list = Value::List(vec![Value::Map(block)]);
        let mut attrs = Attributes::new();
        attrs.insert("http_package_configurations".to_string(), list.clone());

        let api = to_api(&attrs).unwrap();
        assert_eq!(api[0].r#type(), &Type::Dash);
        assert_eq!(from_api(&api), list);
    }

    #[test]
    fn package_without_type_is_rejected() {
        let mut block = Attributes::new();
        block.insert("path".to_string(), Value::string("/vod/ad.mpd"));
        block.insert("source_group".to_string(), Value::string("dash"));
        let mut attrs = Attributes::new();
        attrs.insert(
            "http_package_configurations".to_string(),
            Value::List(vec![Value::Map(block)]),
        );
        assert!(to_api(&attrs).is_err());
    }
}

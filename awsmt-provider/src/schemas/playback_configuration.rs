//! Playback configuration schema definition

use awsmt_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::types as mt;

pub const PLAYBACK_CONFIGURATION: &str = "awsmt_playback_configuration";

/// Returns the schema for playback configurations
pub fn playback_configuration_schema() -> ResourceSchema {
    ResourceSchema::new(PLAYBACK_CONFIGURATION)
        .with_description("Ad insertion settings between an origin and an ad decision server")
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(AttributeSchema::new("ad_decision_server_url", types::url()))
        .attribute(
            AttributeSchema::new(
                "avail_suppression",
                AttributeType::Struct(vec![
                    AttributeSchema::new("mode", mt::avail_suppression_mode()),
                    AttributeSchema::new("value", types::hh_mm_ss()),
                    AttributeSchema::new("fill_policy", mt::fill_policy()).optional_computed(),
                ]),
            )
            .optional_computed(),
        )
        .attribute(AttributeSchema::new(
            "bumper",
            AttributeType::Struct(vec![
                AttributeSchema::new("start_url", types::url()),
                AttributeSchema::new("end_url", types::url()),
            ]),
        ))
        .attribute(AttributeSchema::new(
            "cdn_configuration",
            AttributeType::Struct(vec![
                AttributeSchema::new("ad_segment_url_prefix", types::url()),
                AttributeSchema::new("content_segment_url_prefix", types::url()),
            ]),
        ))
        .attribute(
            AttributeSchema::new(
                "configuration_aliases",
                AttributeType::Map(Box::new(types::string_map())),
            )
            .with_description("Player parameter name to alias values"),
        )
        .attribute(
            AttributeSchema::new(
                "dash_configuration",
                AttributeType::Struct(vec![
                    AttributeSchema::new("mpd_location", mt::mpd_location()).optional_computed(),
                    AttributeSchema::new("origin_manifest_type", mt::origin_manifest_type())
                        .optional_computed(),
                    AttributeSchema::new("manifest_endpoint_prefix", AttributeType::String)
                        .computed(),
                ]),
            )
            .optional_computed(),
        )
        .attribute(
            AttributeSchema::new(
                "live_pre_roll_configuration",
                AttributeType::Struct(vec![
                    AttributeSchema::new("ad_decision_server_url", types::url()),
                    AttributeSchema::new("max_duration_seconds", types::positive_int())
                        .optional_computed(),
                ]),
            )
            .optional_computed(),
        )
        .attribute(
            AttributeSchema::new("log_configuration_percent_enabled", types::percent())
                .optional_computed(),
        )
        .attribute(
            AttributeSchema::new(
                "manifest_processing_rules",
                AttributeType::Struct(vec![AttributeSchema::new(
                    "ad_marker_passthrough_enabled",
                    AttributeType::Bool,
                )]),
            )
            .optional_computed(),
        )
        .attribute(AttributeSchema::new(
            "personalization_threshold_seconds",
            types::positive_int(),
        ))
        .attribute(AttributeSchema::new("slate_ad_url", types::url()))
        .attribute(AttributeSchema::new("tags", types::string_map()))
        .attribute(AttributeSchema::new(
            "transcode_profile_name",
            AttributeType::String,
        ))
        .attribute(AttributeSchema::new("video_content_source_url", types::url()))
        .attribute(
            AttributeSchema::new("playback_configuration_arn", AttributeType::String).computed(),
        )
        .attribute(
            AttributeSchema::new(
                "hls_configuration_manifest_endpoint_prefix",
                AttributeType::String,
            )
            .computed(),
        )
        .attribute(AttributeSchema::new("playback_endpoint_prefix", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new("session_initialization_endpoint_prefix", AttributeType::String)
                .computed(),
        )
}

pub fn schemas() -> Vec<ResourceSchema> {
    vec![playback_configuration_schema()]
}

pub fn data_source_schemas() -> Vec<ResourceSchema> {
    vec![playback_configuration_schema().as_data_source(&["name"])]
}

#[cfg(test)]
mod tests {
    use super::*;
    use awsmt_core::differ::{Diff, diff};
    use awsmt_core::resource::{Resource, ResourceId, State, Value};
    use std::collections::HashMap;

    fn block(pairs: &[(&str, Value)]) -> Value {
        Value::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    /// What GetPlaybackConfiguration returns for a configuration created
    /// with only a name and an origin
    fn server_defaults() -> State {
        let mut attrs = attrs();
        attrs.insert(
            "playback_configuration_arn".to_string(),
            Value::string("arn:aws:mediatailor:us-east-1:123456789012:playbackConfiguration/ssai"),
        );
        attrs.insert(
            "avail_suppression".to_string(),
            block(&[
                ("mode", Value::string("OFF")),
                ("fill_policy", Value::string("PARTIAL_AVAIL")),
            ]),
        );
        attrs.insert(
            "dash_configuration".to_string(),
            block(&[
                ("mpd_location", Value::string("EMT_DEFAULT")),
                ("origin_manifest_type", Value::string("MULTI_PERIOD")),
                (
                    "manifest_endpoint_prefix",
                    Value::string("https://abc.mediatailor.us-east-1.amazonaws.com/v1/dash/"),
                ),
            ]),
        );
        attrs.insert(
            "live_pre_roll_configuration".to_string(),
            block(&[("max_duration_seconds", Value::Int(0))]),
        );
        attrs.insert(
            "manifest_processing_rules".to_string(),
            block(&[("ad_marker_passthrough_enabled", Value::Bool(false))]),
        );
        attrs.insert(
            "log_configuration_percent_enabled".to_string(),
            Value::Int(100),
        );
        State::existing(ResourceId::new(PLAYBACK_CONFIGURATION, "ssai"), attrs)
            .with_identifier("ssai")
    }

    fn desired(extra: &[(&str, Value)]) -> Resource {
        let mut resource = Resource::new(PLAYBACK_CONFIGURATION, "ssai");
        resource.attributes = attrs();
        for (k, v) in extra {
            resource.attributes.insert(k.to_string(), v.clone());
        }
        resource
    }

    fn attrs() -> HashMap<String, Value> {
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::string("ssai"));
        attrs.insert(
            "video_content_source_url".to_string(),
            Value::string("https://origin.example.com"),
        );
        attrs
    }

    #[test]
    fn valid_playback_configuration() {
        assert!(playback_configuration_schema().validate(&attrs()).is_ok());
    }

    #[test]
    fn percent_out_of_range() {
        let mut attrs = attrs();
        attrs.insert(
            "log_configuration_percent_enabled".to_string(),
            Value::Int(150),
        );
        assert!(playback_configuration_schema().validate(&attrs).is_err());
    }

    #[test]
    fn avail_suppression_value_format() {
        let mut suppression = HashMap::new();
        suppression.insert("mode".to_string(), Value::string("BEHIND_LIVE_EDGE"));
        suppression.insert("value".to_string(), Value::string("5m"));
        let mut attrs = attrs();
        attrs.insert("avail_suppression".to_string(), Value::Map(suppression));
        assert!(playback_configuration_schema().validate(&attrs).is_err());
    }

    #[test]
    fn configuration_aliases_are_nested_maps() {
        let mut inner = HashMap::new();
        inner.insert("player_params.ad_type".to_string(), Value::string("preroll"));
        let mut aliases = HashMap::new();
        aliases.insert("player_params.origin_domain".to_string(), Value::Map(inner));
        let mut attrs = attrs();
        attrs.insert("configuration_aliases".to_string(), Value::Map(aliases));
        assert!(playback_configuration_schema().validate(&attrs).is_ok());
    }

    #[test]
    fn server_defaults_do_not_drift() {
        let schema = playback_configuration_schema();
        let result = diff(&desired(&[]), &server_defaults(), Some(&schema));
        assert!(matches!(result, Diff::NoChange(_)), "{:?}", result);
    }

    #[test]
    fn partial_block_ignores_server_filled_fields() {
        let schema = playback_configuration_schema();
        let desired = desired(&[(
            "avail_suppression",
            block(&[("mode", Value::string("OFF"))]),
        )]);
        let result = diff(&desired, &server_defaults(), Some(&schema));
        assert!(matches!(result, Diff::NoChange(_)), "{:?}", result);
    }

    #[test]
    fn explicit_block_change_is_detected() {
        let schema = playback_configuration_schema();
        let desired = desired(&[(
            "dash_configuration",
            block(&[("mpd_location", Value::string("DISABLED"))]),
        )]);
        match diff(&desired, &server_defaults(), Some(&schema)) {
            Diff::Update {
                changed_attributes, ..
            } => assert_eq!(changed_attributes, vec!["dash_configuration".to_string()]),
            other => panic!("expected update, got {:?}", other),
        }
    }
}

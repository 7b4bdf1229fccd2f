//! Channel and channel policy schema definitions

use awsmt_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::types as mt;

pub const CHANNEL: &str = "awsmt_channel";
pub const CHANNEL_POLICY: &str = "awsmt_channel_policy";

/// Attributes that can only change while the channel is stopped
pub const STOP_TO_UPDATE: &[&str] = &[
    "outputs",
    "filler_slate",
    "time_shift_configuration",
    "audiences",
];

fn hls_playlist_settings() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new("manifest_window_seconds", types::positive_int())
            .optional_computed(),
        AttributeSchema::new(
            "ad_markup_type",
            AttributeType::List(Box::new(mt::ad_markup_type())),
        )
        .optional_computed(),
    ])
}

fn dash_playlist_settings() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new("manifest_window_seconds", types::positive_int())
            .optional_computed(),
        AttributeSchema::new("min_buffer_time_seconds", types::positive_int())
            .optional_computed(),
        AttributeSchema::new("min_update_period_seconds", types::positive_int())
            .optional_computed(),
        AttributeSchema::new(
            "suggested_presentation_delay_seconds",
            types::non_negative_int(),
        )
        .optional_computed(),
    ])
}

fn output() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new("manifest_name", AttributeType::String).required(),
        AttributeSchema::new("source_group", AttributeType::String).required(),
        AttributeSchema::new("hls_playlist_settings", hls_playlist_settings()),
        AttributeSchema::new("dash_playlist_settings", dash_playlist_settings()),
        AttributeSchema::new("playback_url", AttributeType::String).computed(),
    ])
}

/// Returns the schema for channels
pub fn channel_schema() -> ResourceSchema {
    ResourceSchema::new(CHANNEL)
        .with_description("A MediaTailor channel assembling a linear stream from sources")
        .attribute(
            AttributeSchema::new("channel_name", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("channel_state", mt::channel_state())
                .optional_computed()
                .with_description("Desired running state (defaults to STOPPED on create)"),
        )
        .attribute(
            AttributeSchema::new("playback_mode", mt::playback_mode())
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("outputs", AttributeType::List(Box::new(output()))).required(),
        )
        .attribute(AttributeSchema::new(
            "filler_slate",
            AttributeType::Struct(vec![
                AttributeSchema::new("source_location_name", AttributeType::String),
                AttributeSchema::new("vod_source_name", AttributeType::String),
            ]),
        ))
        .attribute(
            AttributeSchema::new("tier", mt::tier())
                .optional_computed()
                .force_new(),
        )
        .attribute(AttributeSchema::new(
            "time_shift_configuration",
            AttributeType::Struct(vec![
                AttributeSchema::new("max_time_delay_seconds", types::positive_int()).required(),
            ]),
        ))
        .attribute(AttributeSchema::new(
            "audiences",
            AttributeType::List(Box::new(AttributeType::String)),
        ))
        .attribute(
            AttributeSchema::new("policy", AttributeType::Json)
                .with_description("IAM policy document attached to the channel"),
        )
        .attribute(AttributeSchema::new("tags", types::string_map()))
        .attribute(AttributeSchema::new("arn", AttributeType::String).computed())
        .attribute(AttributeSchema::new("creation_time", AttributeType::String).computed())
        .attribute(AttributeSchema::new("last_modified_time", AttributeType::String).computed())
}

/// Returns the schema for standalone channel policies
pub fn channel_policy_schema() -> ResourceSchema {
    ResourceSchema::new(CHANNEL_POLICY)
        .with_description("IAM policy attached to a MediaTailor channel")
        .attribute(
            AttributeSchema::new("channel_name", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(AttributeSchema::new("policy", AttributeType::Json).required())
}

pub fn schemas() -> Vec<ResourceSchema> {
    vec![channel_schema(), channel_policy_schema()]
}

pub fn data_source_schemas() -> Vec<ResourceSchema> {
    vec![channel_schema().as_data_source(&["channel_name"])]
}

#[cfg(test)]
mod tests {
    use super::*;
    use awsmt_core::resource::Value;
    use std::collections::HashMap;

    fn output_value(manifest: &str) -> Value {
        let mut map = HashMap::new();
        map.insert("manifest_name".to_string(), Value::string(manifest));
        map.insert("source_group".to_string(), Value::string("hls"));
        Value::Map(map)
    }

    fn valid_channel() -> HashMap<String, Value> {
        let mut attrs = HashMap::new();
        attrs.insert("channel_name".to_string(), Value::string("linear"));
        attrs.insert("playback_mode".to_string(), Value::string("LOOP"));
        attrs.insert(
            "outputs".to_string(),
            Value::List(vec![output_value("index")]),
        );
        attrs
    }

    #[test]
    fn valid_channel_passes() {
        assert!(channel_schema().validate(&valid_channel()).is_ok());
    }

    #[test]
    fn invalid_playback_mode() {
        let mut attrs = valid_channel();
        attrs.insert("playback_mode".to_string(), Value::string("ONCE"));
        assert!(channel_schema().validate(&attrs).is_err());
    }

    #[test]
    fn playback_url_cannot_be_set() {
        let mut output = HashMap::new();
        output.insert("manifest_name".to_string(), Value::string("index"));
        output.insert("source_group".to_string(), Value::string("hls"));
        output.insert("playback_url".to_string(), Value::string("https://x"));
        let mut attrs = valid_channel();
        attrs.insert("outputs".to_string(), Value::List(vec![Value::Map(output)]));

        assert!(channel_schema().validate(&attrs).is_err());
    }

    #[test]
    fn policy_must_be_json() {
        let mut attrs = valid_channel();
        attrs.insert("policy".to_string(), Value::string("not json"));
        assert!(channel_schema().validate(&attrs).is_err());
    }

    #[test]
    fn stop_to_update_attributes_exist() {
        let schema = channel_schema();
        for name in STOP_TO_UPDATE {
            assert!(schema.attributes.contains_key(*name), "{} missing", name);
        }
    }

    #[test]
    fn channel_policy_requires_policy() {
        let mut attrs = HashMap::new();
        attrs.insert("channel_name".to_string(), Value::string("linear"));
        assert!(channel_policy_schema().validate(&attrs).is_err());
    }
}

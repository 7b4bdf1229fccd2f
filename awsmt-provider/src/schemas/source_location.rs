//! Source location schema definition

use awsmt_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::types as mt;

pub const SOURCE_LOCATION: &str = "awsmt_source_location";

fn access_configuration() -> AttributeType {
    AttributeType::Struct(vec![
        AttributeSchema::new("access_type", mt::access_type()),
        AttributeSchema::new(
            "secrets_manager_access_token_configuration",
            AttributeType::Struct(vec![
                AttributeSchema::new("header_name", AttributeType::String),
                AttributeSchema::new("secret_arn", types::arn()),
                AttributeSchema::new("secret_string_key", AttributeType::String),
            ]),
        ),
    ])
}

/// Returns the schema for source locations
pub fn source_location_schema() -> ResourceSchema {
    ResourceSchema::new(SOURCE_LOCATION)
        .with_description("An origin server holding VOD and live content")
        .attribute(
            AttributeSchema::new("source_location_name", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new(
                "http_configuration",
                AttributeType::Struct(vec![
                    AttributeSchema::new("base_url", types::url()).required(),
                ]),
            )
            .required(),
        )
        .attribute(AttributeSchema::new(
            "access_configuration",
            access_configuration(),
        ))
        .attribute(AttributeSchema::new(
            "default_segment_delivery_configuration",
            AttributeType::Struct(vec![AttributeSchema::new("base_url", types::url())]),
        ))
        .attribute(AttributeSchema::new(
            "segment_delivery_configurations",
            AttributeType::List(Box::new(AttributeType::Struct(vec![
                AttributeSchema::new("base_url", types::url()),
                AttributeSchema::new("name", AttributeType::String),
            ]))),
        ))
        .attribute(AttributeSchema::new("tags", types::string_map()))
        .attribute(AttributeSchema::new("arn", AttributeType::String).computed())
        .attribute(AttributeSchema::new("creation_time", AttributeType::String).computed())
        .attribute(AttributeSchema::new("last_modified_time", AttributeType::String).computed())
}

pub fn schemas() -> Vec<ResourceSchema> {
    vec![source_location_schema()]
}

pub fn data_source_schemas() -> Vec<ResourceSchema> {
    vec![source_location_schema().as_data_source(&["source_location_name"])]
}

#[cfg(test)]
mod tests {
    use super::*;
    use awsmt_core::resource::Value;
    use std::collections::HashMap;

    fn base_url(url: &str) -> Value {
        let mut map = HashMap::new();
        map.insert("base_url".to_string(), Value::string(url));
        Value::Map(map)
    }

    #[test]
    fn valid_source_location() {
        let mut attrs = HashMap::new();
        attrs.insert("source_location_name".to_string(), Value::string("origin"));
        attrs.insert(
            "http_configuration".to_string(),
            base_url("https://origin.example.com"),
        );
        assert!(source_location_schema().validate(&attrs).is_ok());
    }

    #[test]
    fn http_configuration_is_required() {
        let mut attrs = HashMap::new();
        attrs.insert("source_location_name".to_string(), Value::string("origin"));
        assert!(source_location_schema().validate(&attrs).is_err());
    }

    #[test]
    fn invalid_base_url() {
        let mut attrs = HashMap::new();
        attrs.insert("source_location_name".to_string(), Value::string("origin"));
        attrs.insert("http_configuration".to_string(), base_url("origin.example.com"));
        assert!(source_location_schema().validate(&attrs).is_err());
    }

    #[test]
    fn invalid_access_type() {
        let mut access = HashMap::new();
        access.insert("access_type".to_string(), Value::string("PASSWORD"));
        let mut attrs = HashMap::new();
        attrs.insert("source_location_name".to_string(), Value::string("origin"));
        attrs.insert(
            "http_configuration".to_string(),
            base_url("https://origin.example.com"),
        );
        attrs.insert("access_configuration".to_string(), Value::Map(access));
        assert!(source_location_schema().validate(&attrs).is_err());
    }
}

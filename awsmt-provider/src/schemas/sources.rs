//! VOD and live source schema definitions

use awsmt_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::types as mt;

pub const VOD_SOURCE: &str = "awsmt_vod_source";
pub const LIVE_SOURCE: &str = "awsmt_live_source";

fn http_package_configurations() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::Struct(vec![
        AttributeSchema::new("path", AttributeType::String).required(),
        AttributeSchema::new("source_group", AttributeType::String).required(),
        AttributeSchema::new("type", mt::package_type()).required(),
    ])))
}

/// Schema shared by VOD and live sources; `name_attribute` is the source name key
fn source_schema(resource_type: &str, name_attribute: &str) -> ResourceSchema {
    ResourceSchema::new(resource_type)
        .attribute(
            AttributeSchema::new(name_attribute, AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("source_location_name", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("http_package_configurations", http_package_configurations())
                .required(),
        )
        .attribute(AttributeSchema::new("tags", types::string_map()))
        .attribute(AttributeSchema::new("arn", AttributeType::String).computed())
        .attribute(AttributeSchema::new("creation_time", AttributeType::String).computed())
        .attribute(AttributeSchema::new("last_modified_time", AttributeType::String).computed())
}

pub fn vod_source_schema() -> ResourceSchema {
    source_schema(VOD_SOURCE, "vod_source_name")
        .with_description("A VOD asset served from a source location")
        .attribute(
            AttributeSchema::new(
                "ad_break_opportunities",
                AttributeType::List(Box::new(AttributeType::Int)),
            )
            .computed()
            .with_description("Ad break offsets in milliseconds"),
        )
}

pub fn live_source_schema() -> ResourceSchema {
    source_schema(LIVE_SOURCE, "live_source_name")
        .with_description("A live stream served from a source location")
}

pub fn schemas() -> Vec<ResourceSchema> {
    vec![vod_source_schema(), live_source_schema()]
}

pub fn data_source_schemas() -> Vec<ResourceSchema> {
    vec![
        vod_source_schema().as_data_source(&["source_location_name", "vod_source_name"]),
        live_source_schema().as_data_source(&["source_location_name", "live_source_name"]),
    ]
}

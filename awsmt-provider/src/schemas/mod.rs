//! MediaTailor resource schema definitions

pub mod channel;
pub mod playback_configuration;
pub mod source_location;
pub mod sources;
pub mod types;

use awsmt_core::schema::ResourceSchema;

/// Returns all managed resource schemas
pub fn resource_schemas() -> Vec<ResourceSchema> {
    let mut schemas = Vec::new();
    schemas.extend(channel::schemas());
    schemas.extend(source_location::schemas());
    schemas.extend(sources::schemas());
    schemas.extend(playback_configuration::schemas());
    schemas
}

/// Returns all data source schemas
pub fn data_source_schemas() -> Vec<ResourceSchema> {
    let mut schemas = Vec::new();
    schemas.extend(channel::data_source_schemas());
    schemas.extend(source_location::data_source_schemas());
    schemas.extend(sources::data_source_schemas());
    schemas.extend(playback_configuration::data_source_schemas());
    schemas
}

/// Returns all schemas, resources first
pub fn all_schemas() -> Vec<ResourceSchema> {
    let mut schemas = resource_schemas();
    schemas.extend(data_source_schemas());
    schemas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_resource_type_has_a_schema() {
        let names: Vec<String> = resource_schemas()
            .into_iter()
            .map(|s| s.resource_type)
            .collect();
        assert_eq!(
            names,
            vec![
                "awsmt_channel",
                "awsmt_channel_policy",
                "awsmt_source_location",
                "awsmt_vod_source",
                "awsmt_live_source",
                "awsmt_playback_configuration",
            ]
        );
    }

    #[test]
    fn channel_policy_has_no_data_source() {
        assert!(
            data_source_schemas()
                .iter()
                .all(|s| s.data_source && s.resource_type != "awsmt_channel_policy")
        );
        assert_eq!(data_source_schemas().len(), 5);
    }
}

//! Configuration file (`awsmt.json`)

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use awsmt_core::resource::{Resource, Value};
use awsmt_core::schema::ResourceSchema;
use awsmt_provider::ProviderConfig;
use awsmt_state::BackendConfig;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub resources: Vec<ResourceBlock>,
    /// Data sources: existing objects looked up by their arguments
    #[serde(default)]
    pub data: Vec<ResourceBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceBlock {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ResourceBlock {
    fn to_resource(&self, read_only: bool) -> Resource {
        let mut resource = Resource::new(&self.resource_type, &self.name).with_read_only(read_only);
        for (key, value) in &self.attributes {
            if let Some(value) = Value::from_json(value) {
                resource.attributes.insert(key.clone(), value);
            }
        }
        resource
    }
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::parse(&content).map_err(|e| format!("{}: {}", path.display(), e))
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|e| format!("Parse error: {}", e))
    }

    /// Data sources followed by managed resources
    ///
    /// References name their target by address alone, so addresses are
    /// unique across both kinds.
    pub fn resources(&self) -> Result<Vec<Resource>, String> {
        let mut seen = HashSet::new();
        let mut resources = Vec::new();

        for (blocks, read_only) in [(&self.data, true), (&self.resources, false)] {
            for block in blocks {
                let resource = block.to_resource(read_only);
                if !seen.insert(resource.id.clone()) {
                    return Err(format!("Duplicate address {}", resource.id));
                }
                resources.push(resource);
            }
        }

        Ok(resources)
    }
}

/// Resource and data source schemas, which share type names
pub struct SchemaIndex {
    pub resources: HashMap<String, ResourceSchema>,
    pub data_sources: HashMap<String, ResourceSchema>,
}

impl SchemaIndex {
    pub fn new(schemas: Vec<ResourceSchema>) -> Self {
        let mut resources = HashMap::new();
        let mut data_sources = HashMap::new();
        for schema in schemas {
            let target = if schema.data_source {
                &mut data_sources
            } else {
                &mut resources
            };
            target.insert(schema.resource_type.clone(), schema);
        }
        Self {
            resources,
            data_sources,
        }
    }

    pub fn for_resource(&self, resource: &Resource) -> Option<&ResourceSchema> {
        if resource.is_data_source() {
            self.data_sources.get(&resource.id.resource_type)
        } else {
            self.resources.get(&resource.id.resource_type)
        }
    }

    /// Check every resource against its schema, collecting all errors
    pub fn validate(&self, resources: &[Resource]) -> Result<(), String> {
        let mut all_errors = Vec::new();

        for resource in resources {
            let prefix = if resource.is_data_source() { "data." } else { "" };
            match self.for_resource(resource) {
                None => all_errors.push(format!(
                    "{}{}: Unknown {} type '{}'",
                    prefix,
                    resource.id,
                    if resource.is_data_source() {
                        "data source"
                    } else {
                        "resource"
                    },
                    resource.id.resource_type
                )),
                Some(schema) => {
                    if let Err(errors) = schema.validate(&resource.attributes) {
                        for error in errors {
                            all_errors.push(format!("{}{}: {}", prefix, resource.id, error));
                        }
                    }
                }
            }
        }

        if all_errors.is_empty() {
            Ok(())
        } else {
            Err(all_errors.join("\n"))
        }
    }
}

//! State file structures for persisting infrastructure state

use awsmt_core::resource::{ResourceId, State, attributes_from_json, attributes_to_json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The state file persisted by a backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Incremented on every write
    pub serial: u64,
    /// Identifies this state across writes; a different lineage is never overwritten
    pub lineage: String,
    /// Version of awsmt that last wrote this state
    pub awsmt_version: String,
    /// Managed resources in the order they were created
    pub resources: Vec<ResourceState>,
}

impl StateFile {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self::with_lineage(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_lineage(lineage: String) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage,
            awsmt_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    /// Prepare for a write: bump the serial and stamp the current version
    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.awsmt_version = env!("CARGO_PKG_VERSION").to_string();
    }

    pub fn find_resource(&self, resource_type: &str, name: &str) -> Option<&ResourceState> {
        self.resources
            .iter()
            .find(|r| r.resource_type == resource_type && r.name == name)
    }

    pub fn find_resource_mut(
        &mut self,
        resource_type: &str,
        name: &str,
    ) -> Option<&mut ResourceState> {
        self.resources
            .iter_mut()
            .find(|r| r.resource_type == resource_type && r.name == name)
    }

    /// Replace the entry with the same address, or append a new one
    pub fn upsert_resource(&mut self, resource: ResourceState) {
        if let Some(existing) = self.find_resource_mut(&resource.resource_type, &resource.name) {
            *existing = resource;
        } else {
            self.resources.push(resource);
        }
    }

    pub fn remove_resource(&mut self, resource_type: &str, name: &str) -> Option<ResourceState> {
        let pos = self
            .resources
            .iter()
            .position(|r| r.resource_type == resource_type && r.name == name)?;
        Some(self.resources.remove(pos))
    }

    /// Record an observed state; a missing object drops its entry
    ///
    /// The protection flag of an existing entry is kept.
    pub fn record(&mut self, provider: &str, state: &State) {
        if state.exists {
            let protected = self
                .find_resource(&state.id.resource_type, &state.id.name)
                .is_some_and(|r| r.protected);
            self.upsert_resource(
                ResourceState::from_state(provider, state).with_protected(protected),
            );
        } else {
            self.remove_resource(&state.id.resource_type, &state.id.name);
        }
    }

    /// Stored states keyed by resource ID
    pub fn states(&self) -> HashMap<ResourceId, State> {
        self.resources
            .iter()
            .map(|r| (r.id(), r.to_state()))
            .collect()
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// State of a single managed resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource type (e.g., "awsmt_channel")
    pub resource_type: String,
    /// Resource name from the configuration
    pub name: String,
    pub provider: String,
    /// Provider identifier (channel name, "location,source", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub attributes: HashMap<String, serde_json::Value>,
    /// Protected resources are never planned for deletion
    #[serde(default)]
    pub protected: bool,
}

impl ResourceState {
    pub fn new(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            provider: provider.into(),
            identifier: None,
            attributes: HashMap::new(),
            protected: false,
        }
    }

    pub fn from_state(provider: &str, state: &State) -> Self {
        Self {
            resource_type: state.id.resource_type.clone(),
            name: state.id.name.clone(),
            provider: provider.to_string(),
            identifier: state.identifier.clone(),
            attributes: attributes_to_json(&state.attributes),
            protected: false,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }

    pub fn id(&self) -> ResourceId {
        ResourceId::new(&self.resource_type, &self.name)
    }

    /// The last observed state of this resource
    pub fn to_state(&self) -> State {
        let state = State::existing(self.id(), attributes_from_json(&self.attributes));
        match &self.identifier {
            Some(identifier) => state.with_identifier(identifier),
            None => state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awsmt_core::resource::Value;

    #[test]
    fn test_state_file_new() {
        let state = StateFile::new();
        assert_eq!(state.version, StateFile::CURRENT_VERSION);
        assert_eq!(state.serial, 0);
        assert!(!state.lineage.is_empty());
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_state_file_increment_serial() {
        let mut state = StateFile::new();
        state.increment_serial();
        state.increment_serial();
        assert_eq!(state.serial, 2);
    }

    #[test]
    fn test_state_file_upsert_resource() {
        let mut state = StateFile::new();

        state.upsert_resource(
            ResourceState::new("awsmt_channel", "main", "awsmt")
                .with_attribute("tier", serde_json::json!("BASIC")),
        );
        state.upsert_resource(
            ResourceState::new("awsmt_channel", "main", "awsmt")
                .with_attribute("tier", serde_json::json!("STANDARD")),
        );

        assert_eq!(state.resources.len(), 1);
        assert_eq!(
            state.resources[0].attributes.get("tier"),
            Some(&serde_json::json!("STANDARD"))
        );
    }

    #[test]
    fn test_state_file_remove_resource() {
        let mut state = StateFile::new();
        state.upsert_resource(ResourceState::new("awsmt_source_location", "origin", "awsmt"));

        assert!(state.remove_resource("awsmt_source_location", "origin").is_some());
        assert!(state.resources.is_empty());
        assert!(state.remove_resource("awsmt_source_location", "other").is_none());
    }

    #[test]
    fn test_record_keeps_identifier_and_attributes() {
        let mut attributes = HashMap::new();
        attributes.insert("vod_source_name".to_string(), Value::string("ad-1"));
        attributes.insert(
            "ad_break_opportunities".to_string(),
            Value::List(vec![Value::Int(15000)]),
        );
        let observed = State::existing(ResourceId::new("awsmt_vod_source", "ad"), attributes)
            .with_identifier("origin,ad-1");

        let mut state = StateFile::new();
        state.record("awsmt", &observed);

        let stored = state.find_resource("awsmt_vod_source", "ad").unwrap();
        assert_eq!(stored.identifier.as_deref(), Some("origin,ad-1"));
        assert_eq!(stored.to_state(), observed);
        assert_eq!(state.states().get(&observed.id), Some(&observed));
    }

    #[test]
    fn test_record_missing_state_removes_entry() {
        let mut state = StateFile::new();
        state.upsert_resource(ResourceState::new("awsmt_channel", "main", "awsmt"));

        state.record(
            "awsmt",
            &State::not_found(ResourceId::new("awsmt_channel", "main")),
        );
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_record_keeps_protection() {
        let mut state = StateFile::new();
        state.upsert_resource(
            ResourceState::new("awsmt_source_location", "origin", "awsmt").with_protected(true),
        );

        state.record(
            "awsmt",
            &State::existing(
                ResourceId::new("awsmt_source_location", "origin"),
                HashMap::new(),
            )
            .with_identifier("origin"),
        );
        assert!(state.resources[0].protected);
    }

    #[test]
    fn test_resource_state_protected() {
        let resource = ResourceState::new("awsmt_channel", "main", "awsmt").with_protected(true);
        assert!(resource.protected);
    }

    #[test]
    fn test_state_file_serialization() {
        let mut state = StateFile::new();
        state.upsert_resource(
            ResourceState::new("awsmt_playback_configuration", "ssai", "awsmt")
                .with_identifier("ssai-prod")
                .with_attribute("name", serde_json::json!("ssai-prod")),
        );

        let json = serde_json::to_string_pretty(&state).unwrap();
        let deserialized: StateFile = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.lineage, state.lineage);
        assert_eq!(deserialized.serial, state.serial);
        assert_eq!(
            deserialized.resources[0].identifier.as_deref(),
            Some("ssai-prod")
        );
    }

    #[test]
    fn test_older_entries_without_identifier_load() {
        let json = r#"{
            "resource_type": "awsmt_channel",
            "name": "main",
            "provider": "awsmt",
            "attributes": {}
        }"#;
        let resource: ResourceState = serde_json::from_str(json).unwrap();
        assert!(resource.identifier.is_none());
        assert!(!resource.protected);
    }
}

//! Differ - Compare desired state with current state to generate a Plan
//!
//! Compares the "desired state" declared in configuration with the "current
//! state" fetched from the Provider, and generates the required Effects.

use std::collections::{BTreeSet, HashMap};

use crate::effect::Effect;
use crate::plan::Plan;
use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::ResourceSchema;

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// An attribute that forces replacement changed
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State, schema: Option<&ResourceSchema>) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(&desired.attributes, &current.attributes, schema);

    if changed.is_empty() {
        return Diff::NoChange(desired.id.clone());
    }

    let replace = schema.is_some_and(|s| {
        s.force_new_attributes()
            .any(|name| changed.iter().any(|c| c == name))
    });

    if replace {
        Diff::Replace {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Find changed attributes between desired and current state
///
/// With a schema, attributes removed from the configuration count as changed
/// unless the provider computes them; without one only declared attributes
/// are compared.
fn find_changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
    schema: Option<&ResourceSchema>,
) -> Vec<String> {
    let mut changed = Vec::new();

    let Some(schema) = schema else {
        for (key, desired_value) in desired {
            // Skip internal attributes (starting with _)
            if key.starts_with('_') {
                continue;
            }
            match current.get(key) {
                Some(current_value) if current_value == desired_value => {}
                _ => changed.push(key.clone()),
            }
        }
        changed.sort();
        return changed;
    };

    let keys: BTreeSet<&String> = desired.keys().chain(schema.attributes.keys()).collect();
    for key in keys {
        if key.starts_with('_') {
            continue;
        }
        let matches = match schema.attributes.get(key) {
            Some(attr) => attr.matches(desired.get(key), current.get(key)),
            None => desired.get(key) == current.get(key),
        };
        if !matches {
            changed.push(key.clone());
        }
    }

    changed
}

/// Compute Diffs for all resources and generate a Plan
///
/// `orphans` are states no longer declared in configuration, in the order
/// they should be deleted. Deletions come first, then data source reads,
/// then creates and updates in the order of `desired`.
pub fn create_plan(
    desired: &[Resource],
    current_states: &HashMap<ResourceId, State>,
    orphans: &[State],
    schemas: &HashMap<String, ResourceSchema>,
) -> Plan {
    let mut plan = Plan::new();

    for orphan in orphans {
        if let Some(identifier) = &orphan.identifier {
            plan.add(Effect::Delete {
                id: orphan.id.clone(),
                identifier: identifier.clone(),
            });
        }
    }

    for resource in desired.iter().filter(|r| r.is_data_source()) {
        plan.add(Effect::Read(resource.clone()));
    }

    for resource in desired.iter().filter(|r| !r.is_data_source()) {
        let current = current_states
            .get(&resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));

        match diff(resource, &current, schemas.get(&resource.id.resource_type)) {
            Diff::Create(r) => plan.add(Effect::Create(r)),
            Diff::Update {
                id,
                from,
                to,
                changed_attributes,
            } => plan.add(Effect::Update {
                id,
                from,
                to,
                changed_attributes,
            }),
            Diff::Replace {
                id,
                from,
                to,
                changed_attributes,
            } => plan.add(Effect::Replace {
                id,
                from,
                to,
                changed_attributes,
            }),
            Diff::NoChange(_) => {}
        }
    }

    plan
}

/// Tag changes between two tag maps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagDiff {
    /// Keys present before and absent now (sorted)
    pub remove: Vec<String>,
    /// Keys added or whose value changed
    pub set: HashMap<String, String>,
}

impl TagDiff {
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.set.is_empty()
    }
}

/// Compute the untag/tag calls needed to go from `old` tags to `new` tags
pub fn diff_tags(old: &HashMap<String, String>, new: &HashMap<String, String>) -> TagDiff {
    if old == new {
        return TagDiff::default();
    }

    let mut remove: Vec<String> = old
        .keys()
        .filter(|k| !new.contains_key(*k))
        .cloned()
        .collect();
    remove.sort();

    let set = new
        .iter()
        .filter(|(k, v)| old.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    TagDiff { remove, set }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSchema, AttributeType};

    fn channel_schema() -> ResourceSchema {
        ResourceSchema::new("awsmt_channel")
            .attribute(
                AttributeSchema::new("channel_name", AttributeType::String)
                    .required()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("channel_state", AttributeType::String).optional_computed())
            .attribute(AttributeSchema::new("policy", AttributeType::Json))
            .attribute(AttributeSchema::new("arn", AttributeType::String).computed())
    }

    fn state(attrs: &[(&str, &str)]) -> State {
        let attributes = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::string(*v)))
            .collect();
        State::existing(ResourceId::new("awsmt_channel", "main"), attributes)
            .with_identifier("main")
    }

    #[test]
    fn diff_create_when_not_exists() {
        let desired = Resource::new("awsmt_channel", "main");
        let current = State::not_found(ResourceId::new("awsmt_channel", "main"));

        let result = diff(&desired, &current, None);
        assert!(matches!(result, Diff::Create(_)));
    }

    #[test]
    fn diff_no_change_ignores_computed_attributes() {
        let desired = Resource::new("awsmt_channel", "main")
            .with_attribute("channel_name", Value::string("main"));
        let current = state(&[
            ("channel_name", "main"),
            ("channel_state", "STOPPED"),
            ("arn", "arn:aws:mediatailor:us-east-1:1:channel/main"),
        ]);

        let result = diff(&desired, &current, Some(&channel_schema()));
        assert!(!result.is_change());
    }

    #[test]
    fn diff_update_when_state_differs() {
        let desired = Resource::new("awsmt_channel", "main")
            .with_attribute("channel_name", Value::string("main"))
            .with_attribute("channel_state", Value::string("RUNNING"));
        let current = state(&[("channel_name", "main"), ("channel_state", "STOPPED")]);

        match diff(&desired, &current, Some(&channel_schema())) {
            Diff::Update {
                changed_attributes, ..
            } => assert_eq!(changed_attributes, vec!["channel_state".to_string()]),
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn diff_update_when_policy_removed() {
        let desired = Resource::new("awsmt_channel", "main")
            .with_attribute("channel_name", Value::string("main"));
        let current = state(&[("channel_name", "main"), ("policy", "{}")]);

        match diff(&desired, &current, Some(&channel_schema())) {
            Diff::Update {
                changed_attributes, ..
            } => assert_eq!(changed_attributes, vec!["policy".to_string()]),
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn diff_replace_when_force_new_changes() {
        let desired = Resource::new("awsmt_channel", "main")
            .with_attribute("channel_name", Value::string("renamed"));
        let current = state(&[("channel_name", "main")]);

        assert!(matches!(
            diff(&desired, &current, Some(&channel_schema())),
            Diff::Replace { .. }
        ));
    }

    #[test]
    fn diff_without_schema_compares_declared_attributes() {
        let desired = Resource::new("awsmt_channel", "main")
            .with_attribute("channel_name", Value::string("main"))
            .with_attribute("_binding", Value::string("ignored"));
        let current = state(&[("channel_name", "main"), ("extra", "x")]);

        assert!(!diff(&desired, &current, None).is_change());
    }

    #[test]
    fn create_plan_orders_deletes_reads_then_changes() {
        let mut schemas = HashMap::new();
        schemas.insert("awsmt_channel".to_string(), channel_schema());

        let resources = vec![
            Resource::new("awsmt_channel", "new")
                .with_attribute("channel_name", Value::string("new")),
            Resource::new("awsmt_source_location", "lookup").with_read_only(true),
        ];
        let orphan = State::existing(ResourceId::new("awsmt_channel", "old"), HashMap::new())
            .with_identifier("old");

        let plan = create_plan(&resources, &HashMap::new(), &[orphan], &schemas);

        assert_eq!(plan.effects().len(), 3);
        assert!(matches!(&plan.effects()[0], Effect::Delete { identifier, .. } if identifier == "old"));
        assert!(matches!(plan.effects()[1], Effect::Read(_)));
        assert!(matches!(plan.effects()[2], Effect::Create(_)));
    }

    #[test]
    fn create_plan_skips_unchanged_resources() {
        let resources = vec![
            Resource::new("awsmt_channel", "main")
                .with_attribute("channel_name", Value::string("main")),
        ];
        let mut current_states = HashMap::new();
        current_states.insert(
            ResourceId::new("awsmt_channel", "main"),
            state(&[("channel_name", "main")]),
        );

        let plan = create_plan(&resources, &current_states, &[], &HashMap::new());
        assert!(plan.is_empty());
    }

    fn tags(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn diff_tags_equal_is_empty() {
        let old = tags(&[("env", "prod")]);
        assert!(diff_tags(&old, &old.clone()).is_empty());
    }

    #[test]
    fn diff_tags_removes_and_sets() {
        let old = tags(&[("env", "prod"), ("team", "video"), ("keep", "1")]);
        let new = tags(&[("env", "dev"), ("keep", "1"), ("owner", "ads")]);

        let d = diff_tags(&old, &new);
        assert_eq!(d.remove, vec!["team".to_string()]);
        assert_eq!(d.set, tags(&[("env", "dev"), ("owner", "ads")]));
    }

    #[test]
    fn diff_tags_all_removed() {
        let d = diff_tags(&tags(&[("a", "1"), ("b", "2")]), &HashMap::new());
        assert_eq!(d.remove, vec!["a".to_string(), "b".to_string()]);
        assert!(d.set.is_empty());
    }
}

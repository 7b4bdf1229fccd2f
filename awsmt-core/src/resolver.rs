//! Resolver - Reference resolution and dependency ordering
//!
//! Attributes may reference other resources as `${type.name.attribute}`.
//! Resources are ordered so that referenced resources come first, and
//! references are substituted from a binding map of known attributes.

use std::collections::{HashMap, HashSet};

use crate::resource::{Resource, ResourceId, State, Value};

/// Known attributes per resource address ("awsmt_channel.main")
pub type BindingMap = HashMap<String, HashMap<String, Value>>;

/// Build a binding map from declared attributes merged with current state
///
/// Declared values win; state fills in computed attributes such as `arn`.
pub fn build_binding_map(
    resources: &[Resource],
    current_states: &HashMap<ResourceId, State>,
) -> BindingMap {
    let mut binding_map = BindingMap::new();

    for resource in resources {
        let mut attrs = resource.attributes.clone();
        if let Some(state) = current_states.get(&resource.id)
            && state.exists
        {
            for (k, v) in &state.attributes {
                if !attrs.contains_key(k) {
                    attrs.insert(k.clone(), v.clone());
                }
            }
        }
        binding_map.insert(resource.id.address(), attrs);
    }

    binding_map
}

/// Record the attributes of a resource after it was read, created or updated
pub fn record_state(binding_map: &mut BindingMap, resource: &Resource, state: &State) {
    let mut attrs = resource.attributes.clone();
    for (k, v) in &state.attributes {
        attrs.insert(k.clone(), v.clone());
    }
    binding_map.insert(resource.id.address(), attrs);
}

/// Substitute every resolvable reference in a resource's attributes
pub fn resolve_resource(resource: &Resource, binding_map: &BindingMap) -> Resource {
    let mut resolved = resource.clone();
    resolved.attributes = resource
        .attributes
        .iter()
        .map(|(k, v)| (k.clone(), resolve_ref_value(v, binding_map)))
        .collect();
    resolved
}

/// Resolve references in all resources in place
pub fn resolve_refs(resources: &mut [Resource], binding_map: &BindingMap) {
    for resource in resources.iter_mut() {
        *resource = resolve_resource(resource, binding_map);
    }
}

pub fn resolve_ref_value(value: &Value, binding_map: &BindingMap) -> Value {
    resolve_value(value, binding_map, &mut Vec::new())
}

/// `chain` holds the references being followed. A reference that shows up
/// again is part of a cycle and stays unresolved.
fn resolve_value<'a>(
    value: &'a Value,
    binding_map: &'a BindingMap,
    chain: &mut Vec<&'a Value>,
) -> Value {
    match value {
        Value::ResourceRef(binding_name, attr_name) => {
            if chain.contains(&value) {
                return value.clone();
            }
            // Referenced attributes may themselves be references
            if let Some(attr_value) = binding_map
                .get(binding_name)
                .and_then(|attrs| attrs.get(attr_name))
            {
                chain.push(value);
                let resolved = resolve_value(attr_value, binding_map, chain);
                chain.pop();
                return resolved;
            }
            // Keep as-is if not found
            value.clone()
        }
        Value::List(items) => Value::List(
            items
                .iter()
                .map(|v| resolve_value(v, binding_map, chain))
                .collect(),
        ),
        Value::Map(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, binding_map, chain)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// Collect references that could not be resolved
pub fn unresolved_refs(resource: &Resource) -> Vec<String> {
    fn collect(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::ResourceRef(binding, attr) => out.push(format!("{}.{}", binding, attr)),
            Value::List(items) => items.iter().for_each(|v| collect(v, out)),
            Value::Map(map) => map.values().for_each(|v| collect(v, out)),
            _ => {}
        }
    }
    let mut out = Vec::new();
    for value in resource.attributes.values() {
        collect(value, &mut out);
    }
    out.sort();
    out
}

/// Extract binding addresses that a resource depends on
pub fn get_resource_dependencies(resource: &Resource) -> HashSet<String> {
    let mut deps = HashSet::new();
    for value in resource.attributes.values() {
        collect_dependencies(value, &mut deps);
    }
    deps
}

fn collect_dependencies(value: &Value, deps: &mut HashSet<String>) {
    match value {
        Value::ResourceRef(binding_name, _) => {
            deps.insert(binding_name.clone());
        }
        Value::List(items) => {
            for item in items {
                collect_dependencies(item, deps);
            }
        }
        Value::Map(map) => {
            for v in map.values() {
                collect_dependencies(v, deps);
            }
        }
        _ => {}
    }
}

/// Find a reference cycle between resources
///
/// Returns the addresses along the cycle, starting and ending with the same
/// one. References from a resource to its own attributes are not cycles.
pub fn find_dependency_cycle(resources: &[Resource]) -> Option<Vec<String>> {
    let by_address: HashMap<String, &Resource> = resources
        .iter()
        .map(|r| (r.id.address(), r))
        .collect();
    let mut done: HashSet<String> = HashSet::new();
    let mut path: Vec<String> = Vec::new();

    fn visit(
        address: &str,
        by_address: &HashMap<String, &Resource>,
        done: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        if let Some(pos) = path.iter().position(|a| a == address) {
            let mut cycle = path[pos..].to_vec();
            cycle.push(address.to_string());
            return Some(cycle);
        }
        if done.contains(address) {
            return None;
        }
        let resource = by_address.get(address)?;

        path.push(address.to_string());
        let mut deps: Vec<String> = get_resource_dependencies(resource)
            .into_iter()
            .filter(|dep| dep != address)
            .collect();
        deps.sort();
        for dep in deps {
            if let Some(cycle) = visit(&dep, by_address, done, path) {
                return Some(cycle);
            }
        }
        path.pop();
        done.insert(address.to_string());
        None
    }

    resources
        .iter()
        .find_map(|r| visit(&r.id.address(), &by_address, &mut done, &mut path))
}

/// Sort resources topologically based on dependencies
///
/// Declaration order is kept among independent resources. Cycles are broken
/// at the first revisited resource.
pub fn sort_resources_by_dependencies(resources: &[Resource]) -> Vec<Resource> {
    let binding_to_resource: HashMap<String, &Resource> = resources
        .iter()
        .map(|r| (r.id.address(), r))
        .collect();

    let mut sorted = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut visiting: HashSet<String> = HashSet::new();

    fn visit<'a>(
        resource: &'a Resource,
        binding_to_resource: &HashMap<String, &'a Resource>,
        visited: &mut HashSet<String>,
        visiting: &mut HashSet<String>,
        sorted: &mut Vec<Resource>,
    ) {
        let binding_name = resource.id.address();

        if visited.contains(&binding_name) || visiting.contains(&binding_name) {
            return;
        }

        visiting.insert(binding_name.clone());

        // Visit dependencies first
        let mut deps: Vec<String> = get_resource_dependencies(resource).into_iter().collect();
        deps.sort();
        for dep in deps {
            if let Some(dep_resource) = binding_to_resource.get(&dep) {
                visit(dep_resource, binding_to_resource, visited, visiting, sorted);
            }
        }

        visiting.remove(&binding_name);
        visited.insert(binding_name);
        sorted.push(resource.clone());
    }

    for resource in resources {
        visit(
            resource,
            &binding_to_resource,
            &mut visited,
            &mut visiting,
            &mut sorted,
        );
    }

    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(binding: &str, attr: &str) -> Value {
        Value::ResourceRef(binding.to_string(), attr.to_string())
    }

    #[test]
    fn sort_puts_dependencies_first() {
        let vod = Resource::new("awsmt_vod_source", "ad").with_attribute(
            "source_location_name",
            reference("awsmt_source_location.main", "source_location_name"),
        );
        let location = Resource::new("awsmt_source_location", "main")
            .with_attribute("source_location_name", Value::string("origin"));

        let sorted = sort_resources_by_dependencies(&[vod, location]);
        assert_eq!(sorted[0].id.resource_type, "awsmt_source_location");
        assert_eq!(sorted[1].id.resource_type, "awsmt_vod_source");
    }

    #[test]
    fn sort_tolerates_cycles() {
        let a = Resource::new("awsmt_channel", "a")
            .with_attribute("x", reference("awsmt_channel.b", "arn"));
        let b = Resource::new("awsmt_channel", "b")
            .with_attribute("x", reference("awsmt_channel.a", "arn"));

        assert_eq!(sort_resources_by_dependencies(&[a, b]).len(), 2);
    }

    #[test]
    fn resolve_nested_references() {
        let location = Resource::new("awsmt_source_location", "main")
            .with_attribute("source_location_name", Value::string("origin"));
        let mut filler = HashMap::new();
        filler.insert(
            "source_location_name".to_string(),
            reference("awsmt_source_location.main", "source_location_name"),
        );
        let channel = Resource::new("awsmt_channel", "main")
            .with_attribute("filler_slate", Value::Map(filler));

        let binding_map = build_binding_map(&[location], &HashMap::new());
        let resolved = resolve_resource(&channel, &binding_map);

        let slate = resolved.attributes["filler_slate"].as_map().unwrap();
        assert_eq!(slate["source_location_name"], Value::string("origin"));
        assert!(unresolved_refs(&resolved).is_empty());
    }

    #[test]
    fn computed_attributes_come_from_state() {
        let channel = Resource::new("awsmt_channel", "main");
        let policy = Resource::new("awsmt_channel_policy", "main")
            .with_attribute("arn", reference("awsmt_channel.main", "arn"));

        let mut attrs = HashMap::new();
        attrs.insert("arn".to_string(), Value::string("arn:aws:mediatailor:::channel/main"));
        let mut states = HashMap::new();
        states.insert(
            channel.id.clone(),
            State::existing(channel.id.clone(), attrs),
        );

        let binding_map = build_binding_map(&[channel], &states);
        let resolved = resolve_resource(&policy, &binding_map);
        assert_eq!(
            resolved.get_str("arn"),
            Some("arn:aws:mediatailor:::channel/main")
        );
    }

    #[test]
    fn unknown_references_are_kept_and_reported() {
        let vod = Resource::new("awsmt_vod_source", "ad").with_attribute(
            "source_location_name",
            reference("awsmt_source_location.missing", "source_location_name"),
        );
        let resolved = resolve_resource(&vod, &BindingMap::new());
        assert_eq!(
            unresolved_refs(&resolved),
            vec!["awsmt_source_location.missing.source_location_name".to_string()]
        );
    }

    fn mutual_pair() -> (Resource, Resource) {
        let a = Resource::new("awsmt_channel", "a").with_attribute(
            "channel_name",
            reference("awsmt_channel.b", "channel_name"),
        );
        let b = Resource::new("awsmt_channel", "b").with_attribute(
            "channel_name",
            reference("awsmt_channel.a", "channel_name"),
        );
        (a, b)
    }

    #[test]
    fn mutual_references_stay_unresolved() {
        let (a, b) = mutual_pair();
        let binding_map = build_binding_map(&[a.clone(), b], &HashMap::new());

        let resolved = resolve_resource(&a, &binding_map);
        assert_eq!(unresolved_refs(&resolved).len(), 1);
    }

    #[test]
    fn self_reference_stays_unresolved() {
        let a = Resource::new("awsmt_channel", "a")
            .with_attribute("channel_name", reference("awsmt_channel.a", "channel_name"));
        let binding_map = build_binding_map(std::slice::from_ref(&a), &HashMap::new());

        let resolved = resolve_resource(&a, &binding_map);
        assert_eq!(
            resolved.attributes["channel_name"],
            reference("awsmt_channel.a", "channel_name")
        );
    }

    #[test]
    fn repeated_reference_in_siblings_resolves() {
        let location = Resource::new("awsmt_source_location", "main")
            .with_attribute("source_location_name", Value::string("origin"));
        let name = reference("awsmt_source_location.main", "source_location_name");
        let vod = Resource::new("awsmt_vod_source", "ad").with_attribute(
            "names",
            Value::List(vec![name.clone(), name]),
        );

        let binding_map = build_binding_map(&[location], &HashMap::new());
        let resolved = resolve_resource(&vod, &binding_map);
        assert_eq!(
            resolved.attributes["names"],
            Value::List(vec![Value::string("origin"), Value::string("origin")])
        );
    }

    #[test]
    fn cycle_is_found() {
        let (a, b) = mutual_pair();
        let c = Resource::new("awsmt_channel_policy", "c")
            .with_attribute("channel_name", reference("awsmt_channel.a", "channel_name"));

        assert_eq!(
            find_dependency_cycle(&[c, a, b]),
            Some(vec![
                "awsmt_channel.a".to_string(),
                "awsmt_channel.b".to_string(),
                "awsmt_channel.a".to_string(),
            ])
        );
    }

    #[test]
    fn acyclic_and_self_references_have_no_cycle() {
        let location = Resource::new("awsmt_source_location", "main")
            .with_attribute("source_location_name", Value::string("origin"));
        let vod = Resource::new("awsmt_vod_source", "ad")
            .with_attribute(
                "source_location_name",
                reference("awsmt_source_location.main", "source_location_name"),
            )
            .with_attribute("name", reference("awsmt_vod_source.ad", "vod_source_name"));

        assert_eq!(find_dependency_cycle(&[vod, location]), None);
    }
}

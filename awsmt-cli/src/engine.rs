//! Refresh, plan and apply against the state file

use std::collections::{HashMap, HashSet};

use colored::Colorize;

use awsmt_core::differ::create_plan;
use awsmt_core::effect::Effect;
use awsmt_core::interpreter::{ApplyResult, EffectOutcome, Interpreter};
use awsmt_core::plan::Plan;
use awsmt_core::provider::Provider;
use awsmt_core::resolver::{self, BindingMap};
use awsmt_core::resource::{Resource, ResourceId, State};
use awsmt_state::StateFile;

use crate::config::SchemaIndex;
use crate::display::format_effect;

/// A plan together with what it was computed from
pub struct PlannedChanges {
    pub plan: Plan,
    pub binding_map: BindingMap,
    pub current_states: HashMap<ResourceId, State>,
}

/// Read every resource recorded in the state from the provider
///
/// Entries without an identifier cannot be read and are reported missing.
pub async fn refresh<P: Provider>(
    provider: &P,
    state_file: &StateFile,
) -> Result<HashMap<ResourceId, State>, String> {
    let mut current_states = HashMap::new();

    for entry in &state_file.resources {
        let id = entry.id();
        let state = match &entry.identifier {
            Some(identifier) => provider
                .read(&id, identifier)
                .await
                .map_err(|e| format!("Failed to refresh {}: {}", id, e))?,
            None => {
                log::warn!("{} has no identifier in state; treating it as missing", id);
                State::not_found(id.clone())
            }
        };
        if !state.exists {
            log::info!("{} no longer exists", id);
        }
        current_states.insert(id, state);
    }

    Ok(current_states)
}

/// Store refreshed states, dropping entries whose objects are gone
pub fn record_refresh(
    state_file: &mut StateFile,
    provider_name: &str,
    current_states: &HashMap<ResourceId, State>,
) {
    for state in current_states.values() {
        state_file.record(provider_name, state);
    }
}

/// Look up data sources whose arguments are already known
///
/// Their attributes become available to references when planning.
async fn read_data_sources<P: Provider>(
    provider: &P,
    resources: &[Resource],
    binding_map: &mut BindingMap,
) -> Result<(), String> {
    for resource in resources.iter().filter(|r| r.is_data_source()) {
        let resolved = resolver::resolve_resource(resource, binding_map);
        if !resolver::unresolved_refs(&resolved).is_empty() {
            continue;
        }
        let Some(identifier) = provider.identifier_of(&resolved) else {
            continue;
        };
        let state = provider
            .read(&resolved.id, &identifier)
            .await
            .map_err(|e| format!("Failed to read data.{}: {}", resolved.id, e))?;
        if !state.exists {
            return Err(format!(
                "data.{}: Data source '{}' not found",
                resolved.id, identifier
            ));
        }
        resolver::record_state(binding_map, &resolved, &state);
    }
    Ok(())
}

/// Refresh the state and compute the changes needed to reach `resources`
///
/// `resources` must already be sorted by dependencies. Recorded resources
/// that are no longer declared are deleted in reverse creation order.
pub async fn plan_changes<P: Provider>(
    provider: &P,
    resources: &[Resource],
    schemas: &SchemaIndex,
    state_file: &StateFile,
) -> Result<PlannedChanges, String> {
    let current_states = refresh(provider, state_file).await?;

    let declared: HashSet<ResourceId> = resources
        .iter()
        .filter(|r| !r.is_data_source())
        .map(|r| r.id.clone())
        .collect();
    let orphans: Vec<State> = state_file
        .resources
        .iter()
        .rev()
        .filter(|r| !r.protected && !declared.contains(&r.id()))
        .filter_map(|r| current_states.get(&r.id()))
        .filter(|s| s.exists)
        .cloned()
        .collect();

    let mut binding_map = resolver::build_binding_map(resources, &current_states);
    read_data_sources(provider, resources, &mut binding_map).await?;

    let mut desired = resources.to_vec();
    resolver::resolve_refs(&mut desired, &binding_map);
    let plan = create_plan(&desired, &current_states, &orphans, &schemas.resources);

    Ok(PlannedChanges {
        plan,
        binding_map,
        current_states,
    })
}

/// Plan deleting every unprotected resource recorded in the state
///
/// Resources no longer declared go first, then declared resources in
/// reverse dependency order.
pub fn destroy_plan(
    resources: &[Resource],
    state_file: &StateFile,
    current_states: &HashMap<ResourceId, State>,
) -> Plan {
    let declared: Vec<ResourceId> = resources
        .iter()
        .filter(|r| !r.is_data_source())
        .map(|r| r.id.clone())
        .collect();

    let mut order: Vec<ResourceId> = state_file
        .resources
        .iter()
        .rev()
        .map(|r| r.id())
        .filter(|id| !declared.contains(id))
        .collect();
    order.extend(declared.into_iter().rev());

    let mut plan = Plan::new();
    for id in order {
        let Some(entry) = state_file.find_resource(&id.resource_type, &id.name) else {
            continue;
        };
        if entry.protected {
            continue;
        }
        if let Some(state) = current_states.get(&id)
            && state.exists
            && let Some(identifier) = &state.identifier
        {
            plan.add(Effect::Delete {
                id,
                identifier: identifier.clone(),
            });
        }
    }
    plan
}

/// Apply a plan, printing each outcome and recording it in `state_file`
///
/// After a failed effect the object is read back so the state reflects
/// whatever was left behind.
pub async fn apply_plan<P: Provider>(
    interpreter: &Interpreter<P>,
    plan: &Plan,
    binding_map: &mut BindingMap,
    state_file: &mut StateFile,
) -> ApplyResult {
    let result = interpreter.apply(plan, binding_map).await;
    let provider = interpreter.provider();

    for (effect, outcome) in plan.effects().iter().zip(&result.outcomes) {
        match outcome {
            Ok(outcome) => {
                println!("  {} {}", "✓".green(), format_effect(effect));
                match outcome {
                    EffectOutcome::Created { state }
                    | EffectOutcome::Updated { state }
                    | EffectOutcome::Replaced { state } => {
                        state_file.record(provider.name(), state);
                    }
                    EffectOutcome::Deleted { id } => {
                        state_file.remove_resource(&id.resource_type, &id.name);
                    }
                    EffectOutcome::Read { .. } | EffectOutcome::Skipped { .. } => {}
                }
            }
            Err(e) => {
                println!("  {} {} - {}", "✗".red(), format_effect(effect), e);
                reconcile_failure(provider, effect, binding_map, state_file).await;
            }
        }
    }

    for effect in plan.effects().iter().skip(result.outcomes.len()) {
        println!("  {} {} - skipped", "-".dimmed(), format_effect(effect));
    }

    result
}

async fn reconcile_failure<P: Provider>(
    provider: &P,
    effect: &Effect,
    binding_map: &BindingMap,
    state_file: &mut StateFile,
) {
    let declared_identifier =
        |r: &Resource| provider.identifier_of(&resolver::resolve_resource(r, binding_map));

    let (id, candidates) = match effect {
        Effect::Read(_) => return,
        Effect::Create(r) => (&r.id, vec![declared_identifier(r)]),
        Effect::Update { id, from, .. } => (id, vec![from.identifier.clone()]),
        Effect::Replace { id, from, to, .. } => {
            (id, vec![declared_identifier(to), from.identifier.clone()])
        }
        Effect::Delete { id, identifier } => (id, vec![Some(identifier.clone())]),
    };

    let mut seen = HashSet::new();
    let mut last = None;
    for identifier in candidates.into_iter().flatten() {
        if !seen.insert(identifier.clone()) {
            continue;
        }
        match provider.read(id, &identifier).await {
            Ok(state) if state.exists => {
                state_file.record(provider.name(), &state);
                return;
            }
            Ok(state) => last = Some(state),
            Err(e) => {
                log::warn!("Could not read {} after failure: {}", id, e);
                return;
            }
        }
    }

    if let Some(state) = last {
        state_file.record(provider.name(), &state);
    }
}

//! Interpreter - Execute Effects using a Provider
//!
//! The Interpreter executes Effects contained in a Plan in order,
//! collecting the results. This is where side effects actually occur.
//! References are resolved against the binding map just before each
//! Effect runs, so values computed by earlier Effects flow into later ones.

use crate::effect::Effect;
use crate::plan::Plan;
use crate::provider::{Provider, ProviderError, ProviderResult};
use crate::resolver::{self, BindingMap};
use crate::resource::{Resource, ResourceId, State};

/// Result of executing each Effect
#[derive(Debug)]
pub enum EffectOutcome {
    /// Read succeeded
    Read { state: State },
    /// Create succeeded
    Created { state: State },
    /// Update succeeded
    Updated { state: State },
    /// Delete then create succeeded
    Replaced { state: State },
    /// Delete succeeded
    Deleted { id: ResourceId },
    /// Skipped (e.g., dry-run)
    Skipped { reason: String },
}

impl EffectOutcome {
    /// State after the Effect, if the resource still exists
    pub fn state(&self) -> Option<&State> {
        match self {
            EffectOutcome::Read { state }
            | EffectOutcome::Created { state }
            | EffectOutcome::Updated { state }
            | EffectOutcome::Replaced { state } => Some(state),
            EffectOutcome::Deleted { .. } | EffectOutcome::Skipped { .. } => None,
        }
    }
}

/// Result of executing the entire Plan
///
/// `outcomes[i]` belongs to `plan.effects()[i]`. Effects after a failure are
/// absent unless `continue_on_error` is set.
#[derive(Debug)]
pub struct ApplyResult {
    pub outcomes: Vec<Result<EffectOutcome, ProviderError>>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl ApplyResult {
    pub fn is_success(&self) -> bool {
        self.failure_count == 0
    }
}

/// Interpreter configuration
#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    /// If true, skip actual side effects
    pub dry_run: bool,
    /// Continue on error
    pub continue_on_error: bool,
}

/// Interpreter that executes Effects using a Provider
pub struct Interpreter<P: Provider> {
    provider: P,
    config: InterpreterConfig,
}

impl<P: Provider> Interpreter<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            config: InterpreterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Execute a Plan, interpreting all Effects and causing side effects
    ///
    /// `binding_map` is updated with the state of every resource read,
    /// created or updated.
    pub async fn apply(&self, plan: &Plan, binding_map: &mut BindingMap) -> ApplyResult {
        let mut outcomes = Vec::new();
        let mut success_count = 0;
        let mut failure_count = 0;

        for effect in plan.effects() {
            log::debug!("Executing {}", effect);
            let result = self.execute_effect(effect, binding_map).await;

            match &result {
                Ok(_) => success_count += 1,
                Err(e) => {
                    log::warn!("{} failed: {}", effect, e);
                    failure_count += 1;
                    if !self.config.continue_on_error {
                        outcomes.push(result);
                        break;
                    }
                }
            }

            outcomes.push(result);
        }

        ApplyResult {
            outcomes,
            success_count,
            failure_count,
        }
    }

    /// Execute a single Effect
    async fn execute_effect(
        &self,
        effect: &Effect,
        binding_map: &mut BindingMap,
    ) -> ProviderResult<EffectOutcome> {
        if self.config.dry_run {
            return Ok(EffectOutcome::Skipped {
                reason: "dry-run mode".to_string(),
            });
        }

        match effect {
            Effect::Read(resource) => {
                let resource = resolve(resource, binding_map)?;
                let identifier = self.provider.identifier_of(&resource).ok_or_else(|| {
                    ProviderError::new("Cannot determine identifier of data source")
                        .for_resource(resource.id.clone())
                })?;
                let state = self.provider.read(&resource.id, &identifier).await?;
                if !state.exists {
                    return Err(ProviderError::new(format!(
                        "Data source '{}' not found",
                        identifier
                    ))
                    .for_resource(resource.id.clone()));
                }
                resolver::record_state(binding_map, &resource, &state);
                Ok(EffectOutcome::Read { state })
            }
            Effect::Create(resource) => {
                let resource = resolve(resource, binding_map)?;
                let state = self.provider.create(&resource).await?;
                resolver::record_state(binding_map, &resource, &state);
                Ok(EffectOutcome::Created { state })
            }
            Effect::Update { id, from, to, .. } => {
                let to = resolve(to, binding_map)?;
                let identifier = identifier_of(id, from)?;
                let state = self.provider.update(id, identifier, from, &to).await?;
                resolver::record_state(binding_map, &to, &state);
                Ok(EffectOutcome::Updated { state })
            }
            Effect::Replace { id, from, to, .. } => {
                let to = resolve(to, binding_map)?;
                let identifier = identifier_of(id, from)?;
                self.provider.delete(id, identifier).await?;
                let state = self.provider.create(&to).await?;
                resolver::record_state(binding_map, &to, &state);
                Ok(EffectOutcome::Replaced { state })
            }
            Effect::Delete { id, identifier } => {
                self.provider.delete(id, identifier).await?;
                binding_map.remove(&id.address());
                Ok(EffectOutcome::Deleted { id: id.clone() })
            }
        }
    }
}

fn resolve(resource: &Resource, binding_map: &BindingMap) -> ProviderResult<Resource> {
    let resolved = resolver::resolve_resource(resource, binding_map);
    let unresolved = resolver::unresolved_refs(&resolved);
    if !unresolved.is_empty() {
        return Err(ProviderError::new(format!(
            "Unresolved references: {}",
            unresolved.join(", ")
        ))
        .for_resource(resource.id.clone()));
    }
    Ok(resolved)
}

fn identifier_of<'a>(id: &ResourceId, from: &'a State) -> ProviderResult<&'a str> {
    from.identifier.as_deref().ok_or_else(|| {
        ProviderError::new("Current state has no identifier").for_resource(id.clone())
    })
}

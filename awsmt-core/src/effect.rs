//! Effect - A single side effect to be performed by a Provider

use crate::resource::{Resource, ResourceId, State};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Look up a data source
    Read(Resource),
    Create(Resource),
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Delete then create, because an attribute that cannot change in place changed
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    Delete {
        id: ResourceId,
        identifier: String,
    },
}

impl Effect {
    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Effect::Read(r) | Effect::Create(r) => &r.id,
            Effect::Update { id, .. } | Effect::Replace { id, .. } | Effect::Delete { id, .. } => {
                id
            }
        }
    }

    /// Whether this effect changes infrastructure
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Effect::Read(_))
    }

    /// Short symbol used in plan output
    pub fn symbol(&self) -> &'static str {
        match self {
            Effect::Read(_) => "<=",
            Effect::Create(_) => "+",
            Effect::Update { .. } => "~",
            Effect::Replace { .. } => "-/+",
            Effect::Delete { .. } => "-",
        }
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.symbol(), self.resource_id())
    }
}

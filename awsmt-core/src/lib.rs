//! Awsmt Core
//!
//! Core library for declaring MediaTailor resources and reconciling them
//! through a Provider: schemas, diffing, plans of Effects and their execution.

pub mod differ;
pub mod effect;
pub mod interpreter;
pub mod plan;
pub mod provider;
pub mod resolver;
pub mod resource;
pub mod schema;

//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource type, enabling validation of
//! declared attributes and schema-aware comparison of plan and state.

use std::collections::HashMap;
use std::fmt;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// String holding a JSON document, compared semantically
    Json,
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
    /// Nested block with its own attributes
    Struct(Vec<AttributeSchema>),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            // References resolve at apply time; their target is validated there
            (_, Value::ResourceRef(_, _)) => Ok(()),
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Json, Value::String(s)) => serde_json::from_str::<serde_json::Value>(s)
                .map(|_| ())
                .map_err(|e| TypeError::ValidationFailed {
                    message: format!("Invalid JSON document: {}", e),
                }),

            (AttributeType::Custom { validate, base, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Struct(fields), Value::Map(map)) => {
                let errors = validate_attributes(fields.iter(), map);
                match errors.into_iter().next() {
                    None => Ok(()),
                    Some(e) => Err(e),
                }
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    /// Whether a planned value matches the value currently held in state
    ///
    /// Struct fields that are computed and absent from the plan are ignored.
    pub fn matches(&self, desired: &Value, current: &Value) -> bool {
        match (self, desired, current) {
            (_, Value::ResourceRef(_, _), _) => false,
            (AttributeType::Json, Value::String(a), Value::String(b)) => {
                match (
                    serde_json::from_str::<serde_json::Value>(a),
                    serde_json::from_str::<serde_json::Value>(b),
                ) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => a == b,
                }
            }
            (AttributeType::Custom { base, .. }, d, c) => base.matches(d, c),
            (AttributeType::List(inner), Value::List(d), Value::List(c)) => {
                d.len() == c.len() && d.iter().zip(c).all(|(d, c)| inner.matches(d, c))
            }
            (AttributeType::Map(inner), Value::Map(d), Value::Map(c)) => {
                d.len() == c.len()
                    && d
                        .iter()
                        .all(|(k, v)| c.get(k).is_some_and(|cv| inner.matches(v, cv)))
            }
            (AttributeType::Struct(fields), Value::Map(d), Value::Map(c)) => fields
                .iter()
                .all(|field| field.matches(d.get(&field.name), c.get(&field.name))),
            _ => desired == current,
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Json => "Json".to_string(),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Struct(_) => "Struct".to_string(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ReadOnlyAttribute { name: String },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
            Value::ResourceRef(binding, attr) => format!("ResourceRef({}.{})", binding, attr),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// May be set in configuration
    pub optional: bool,
    /// May be filled in by the provider
    pub computed: bool,
    /// Changing this attribute requires replacing the resource
    pub force_new: bool,
    pub description: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            optional: true,
            computed: false,
            force_new: false,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self.optional = false;
        self
    }

    /// Read-only attribute reported by the provider
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self.optional = false;
        self
    }

    /// Optional attribute that the provider fills in when unset
    pub fn optional_computed(mut self) -> Self {
        self.computed = true;
        self.optional = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Returns true if the attribute cannot be set in configuration
    pub fn is_read_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }

    /// Compare an optional planned value with an optional state value
    pub fn matches(&self, desired: Option<&Value>, current: Option<&Value>) -> bool {
        if self.is_read_only() {
            return true;
        }
        match (desired, current) {
            (Some(d), Some(c)) => self.attr_type.matches(d, c),
            (Some(_), None) => false,
            (None, Some(_)) => self.computed,
            (None, None) => true,
        }
    }
}

fn validate_attributes<'a>(
    schemas: impl Iterator<Item = &'a AttributeSchema> + Clone,
    attributes: &HashMap<String, Value>,
) -> Vec<TypeError> {
    let mut errors = Vec::new();

    for schema in schemas.clone() {
        if schema.required && !attributes.contains_key(&schema.name) {
            errors.push(TypeError::MissingRequired {
                name: schema.name.clone(),
            });
        }
    }

    let mut names: Vec<&String> = attributes.keys().collect();
    names.sort();
    for name in names {
        let value = &attributes[name];
        match schemas.clone().find(|s| &s.name == name) {
            None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
            Some(schema) if schema.is_read_only() => {
                errors.push(TypeError::ReadOnlyAttribute { name: name.clone() })
            }
            Some(schema) => {
                if let Err(e) = schema.attr_type.validate(value) {
                    errors.push(TypeError::AttributeError {
                        name: name.clone(),
                        inner: Box::new(e),
                    });
                }
            }
        }
    }

    errors
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
    /// Data source schema (read-only object looked up by its arguments)
    pub data_source: bool,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
            data_source: false,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Derive the data source flavour of this schema
    ///
    /// The listed arguments stay required; everything else becomes computed.
    pub fn as_data_source(&self, arguments: &[&str]) -> ResourceSchema {
        let attributes = self
            .attributes
            .iter()
            .map(|(name, attr)| {
                let mut attr = attr.clone();
                attr.force_new = false;
                if arguments.contains(&name.as_str()) {
                    attr.required = true;
                    attr.optional = false;
                    attr.computed = false;
                } else {
                    attr.required = false;
                    attr.optional = false;
                    attr.computed = true;
                }
                (name.clone(), attr)
            })
            .collect();

        ResourceSchema {
            resource_type: self.resource_type.clone(),
            attributes,
            description: self.description.clone(),
            data_source: true,
        }
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let errors = validate_attributes(self.attributes.values(), attributes);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Names of attributes whose change forces replacement
    pub fn force_new_attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .values()
            .filter(|a| a.force_new)
            .map(|a| a.name.as_str())
    }

    /// Render the schema as JSON for `awsmt schema`
    pub fn to_json(&self) -> serde_json::Value {
        let mut attrs: Vec<&AttributeSchema> = self.attributes.values().collect();
        attrs.sort_by(|a, b| a.name.cmp(&b.name));
        serde_json::json!({
            "description": self.description,
            "attributes": attrs.into_iter().map(attribute_to_json).collect::<Vec<_>>(),
        })
    }
}

fn attribute_to_json(attr: &AttributeSchema) -> serde_json::Value {
    let mut value = serde_json::json!({
        "name": attr.name,
        "type": attr.attr_type.to_string(),
        "required": attr.required,
        "optional": attr.optional,
        "computed": attr.computed,
        "force_new": attr.force_new,
        "description": attr.description,
    });
    let nested = match &attr.attr_type {
        AttributeType::Struct(fields) => Some(fields),
        AttributeType::List(inner) => match inner.as_ref() {
            AttributeType::Struct(fields) => Some(fields),
            _ => None,
        },
        _ => None,
    };
    if let Some(fields) = nested {
        value["attributes"] = serde_json::Value::Array(fields.iter().map(attribute_to_json).collect());
    }
    value
}

/// Helper functions for common types
pub mod types {
    use super::*;

    fn regex_match(pattern: &str, s: &str) -> bool {
        regex::Regex::new(pattern).is_ok_and(|re| re.is_match(s))
    }

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        AttributeType::Custom {
            name: "PositiveInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value {
                Value::Int(n) if *n > 0 => Ok(()),
                Value::Int(_) => Err("Value must be positive".to_string()),
                _ => Ok(()),
            },
        }
    }

    /// Non-negative integer type
    pub fn non_negative_int() -> AttributeType {
        AttributeType::Custom {
            name: "NonNegativeInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value {
                Value::Int(n) if *n >= 0 => Ok(()),
                Value::Int(_) => Err("Value must not be negative".to_string()),
                _ => Ok(()),
            },
        }
    }

    /// Percentage between 0 and 100
    pub fn percent() -> AttributeType {
        AttributeType::Custom {
            name: "Percent".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value {
                Value::Int(n) if (0..=100).contains(n) => Ok(()),
                Value::Int(n) => Err(format!("Percentage must be between 0 and 100, got {}", n)),
                _ => Ok(()),
            },
        }
    }

    /// HTTP or HTTPS URL
    pub fn url() -> AttributeType {
        AttributeType::Custom {
            name: "Url".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| match value {
                Value::String(s) if regex_match(r"^https?://\S+$", s) => Ok(()),
                Value::String(s) => Err(format!("Invalid URL '{}': expected http(s)://", s)),
                _ => Ok(()),
            },
        }
    }

    /// Time offset in HH:MM:SS format
    pub fn hh_mm_ss() -> AttributeType {
        AttributeType::Custom {
            name: "Duration".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| match value {
                Value::String(s) if regex_match(r"^\d{2}:[0-5]\d:[0-5]\d$", s) => Ok(()),
                Value::String(s) => Err(format!("Invalid duration '{}': expected HH:MM:SS", s)),
                _ => Ok(()),
            },
        }
    }

    /// AWS ARN
    pub fn arn() -> AttributeType {
        AttributeType::Custom {
            name: "Arn".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| match value {
                Value::String(s) if regex_match(r"^arn:aws[a-z-]*:[a-z0-9-]+:", s) => Ok(()),
                Value::String(s) => Err(format!("Invalid ARN '{}'", s)),
                _ => Ok(()),
            },
        }
    }

    /// String to string map (tags)
    pub fn string_map() -> AttributeType {
        AttributeType::Map(Box::new(AttributeType::String))
    }

    /// Enum from a list of literals
    pub fn one_of(values: &[&str]) -> AttributeType {
        AttributeType::Enum(values.iter().map(|s| s.to_string()).collect())
    }
}

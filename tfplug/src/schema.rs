//! Schema types and builders for tfplug
//!
//! A resource describes its attributes with a [`Schema`]. Besides the shape
//! the host needs, the schema carries the checks the framework runs before a
//! resource sees a request: requiredness, types, validators, conflicts and
//! which attributes force replacement.

use crate::types::{has_errors, AttributePath, Diagnostic, Dynamic, DynamicValue};
use crate::validator::Validator;
use std::sync::Arc;

/// AttributeType defines the type system for Terraform attributes
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>),
    Map(Box<AttributeType>), // String keys only
}

impl AttributeType {
    fn accepts(&self, value: &Dynamic) -> bool {
        match (self, value) {
            (_, Dynamic::Null) | (_, Dynamic::Unknown) => true,
            (AttributeType::String, Dynamic::String(_)) => true,
            (AttributeType::Number, Dynamic::Number(_)) => true,
            (AttributeType::Bool, Dynamic::Bool(_)) => true,
            (AttributeType::List(elem), Dynamic::List(items)) => {
                items.iter().all(|item| elem.accepts(item))
            }
            (AttributeType::Map(elem), Dynamic::Map(entries)) => {
                entries.values().all(|item| elem.accepts(item))
            }
            _ => false,
        }
    }
}

/// Schema is returned by providers and resources
/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

/// Block represents the root configuration block
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub attributes: Vec<Attribute>,
    pub description: String,
}

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// Changing this attribute destroys and recreates the resource
    pub requires_replace: bool,
    /// Attributes that may not be set alongside this one
    pub conflicts_with: Vec<String>,
    pub default: Option<Dynamic>,
    pub validators: Vec<Arc<dyn Validator>>,
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field("requires_replace", &self.requires_replace)
            .field("conflicts_with", &self.conflicts_with)
            .field("default", &self.default)
            .field(
                "validators",
                &format!("{} validators", self.validators.len()),
            )
            .finish()
    }
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.iter().find(|a| a.name == name)
    }

    /// Checks a configuration against the schema. Unknown values are
    /// skipped since they will only be known at apply time.
    pub fn validate_config(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        let entries = match &config.value {
            Dynamic::Map(m) => m,
            Dynamic::Null => {
                return diagnostics;
            }
            other => {
                diagnostics.push(Diagnostic::error(
                    "Invalid configuration",
                    format!("Expected an object, got {}", other.type_name()),
                ));
                return diagnostics;
            }
        };

        for name in entries.keys() {
            if self.attribute(name).is_none() {
                diagnostics.push(
                    Diagnostic::error(
                        "Unsupported argument",
                        format!("An argument named \"{}\" is not expected here", name),
                    )
                    .with_attribute(AttributePath::new(name)),
                );
            }
        }

        for attr in &self.block.attributes {
            let path = AttributePath::new(&attr.name);
            let value = entries.get(&attr.name).unwrap_or(&Dynamic::Null);
            let is_set = !matches!(value, Dynamic::Null);

            if attr.required && !is_set {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing required argument",
                        format!("The argument \"{}\" is required", attr.name),
                    )
                    .with_attribute(path),
                );
                continue;
            }

            if is_set && attr.computed && !attr.optional && !attr.required {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid configuration",
                        format!("\"{}\" is computed and cannot be set", attr.name),
                    )
                    .with_attribute(path),
                );
                continue;
            }

            if !attr.r#type.accepts(value) {
                diagnostics.push(
                    Diagnostic::error(
                        "Incorrect attribute value type",
                        format!(
                            "\"{}\" expects {:?}, got {}",
                            attr.name,
                            attr.r#type,
                            value.type_name()
                        ),
                    )
                    .with_attribute(path),
                );
                continue;
            }

            if matches!(value, Dynamic::Null | Dynamic::Unknown) {
                continue;
            }

            for validator in &attr.validators {
                validator.validate(value, &path, &mut diagnostics);
            }

            for other in &attr.conflicts_with {
                let other_set = entries
                    .get(other)
                    .is_some_and(|v| !matches!(v, Dynamic::Null));
                if other_set {
                    diagnostics.push(
                        Diagnostic::error(
                            "Conflicting configuration arguments",
                            format!("\"{}\": conflicts with {}", attr.name, other),
                        )
                        .with_attribute(AttributePath::new(&attr.name)),
                    );
                }
            }
        }

        diagnostics
    }

    /// Fills unset optional attributes with their declared default
    pub fn apply_defaults(&self, value: &mut DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for attr in &self.block.attributes {
            let Some(default) = &attr.default else {
                continue;
            };
            let path = AttributePath::new(&attr.name);
            if matches!(value.get(&path), Dynamic::Null) {
                if let Err(e) = value.set_value(&path, default.clone()) {
                    diagnostics.push(
                        Diagnostic::error("Failed to apply default", e.to_string())
                            .with_attribute(path),
                    );
                }
            }
        }
        diagnostics
    }

    /// Attributes marked `requires_replace` whose value differs between the
    /// prior state and the plan
    pub fn replacement_paths(
        &self,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Vec<AttributePath> {
        if prior.is_null() || planned.is_null() {
            return Vec::new();
        }
        self.block
            .attributes
            .iter()
            .filter(|a| a.requires_replace)
            .map(|a| AttributePath::new(&a.name))
            .filter(|path| !prior.get(path).semantically_equal(planned.get(path)))
            .collect()
    }

    pub fn is_valid_config(&self, config: &DynamicValue) -> bool {
        !has_errors(&self.validate_config(config))
    }
}

/// AttributeBuilder provides fluent API for building attributes
/// ALWAYS use this instead of constructing Attribute directly
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                requires_replace: false,
                conflicts_with: Vec::new(),
                default: None,
                validators: Vec::new(),
            },
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn requires_replace(mut self) -> Self {
        self.attribute.requires_replace = true;
        self
    }

    pub fn conflicts_with(mut self, other: &str) -> Self {
        self.attribute.conflicts_with.push(other.to_string());
        self
    }

    pub fn default(mut self, value: impl Into<Dynamic>) -> Self {
        self.attribute.default = Some(value.into());
        self
    }

    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.attribute.validators.push(Arc::new(validator));
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// SchemaBuilder provides fluent API for building schemas
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block::default(),
            },
        }
    }

    /// Set schema version
    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

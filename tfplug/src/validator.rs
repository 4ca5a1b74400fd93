use crate::types::{AttributePath, Diagnostic, Dynamic};

/// Validator performs validation on a configured attribute value.
/// Only called for known, non-null values.
pub trait Validator: Send + Sync {
    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>);
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for StringLengthValidator {
    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            let len = s.chars().count();
            if let Some(min) = self.min {
                if len < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have minimum length of {}", path, min),
                            format!("Got length {}", len),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if len > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have maximum length of {}", path, max),
                            format!("Got length {}", len),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
        }
    }
}

pub struct StringPatternValidator {
    pub pattern: regex::Regex,
    pub description: String,
}

impl StringPatternValidator {
    pub fn new(pattern: regex::Regex, description: &str) -> Self {
        Self {
            pattern,
            description: description.to_string(),
        }
    }
}

impl Validator for StringPatternValidator {
    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if !self.pattern.is_match(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must match {}", path, self.description),
                        format!("Value '{}' does not match pattern", s),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

/// Every value of a string map must satisfy the inner validator
pub struct MapValuesValidator<V> {
    pub inner: V,
}

impl<V: Validator> Validator for MapValuesValidator<V> {
    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Dynamic::Map(entries) = value {
            let mut keys: Vec<&String> = entries.keys().collect();
            keys.sort();
            for key in keys {
                let item_path = path.clone().key(key);
                self.inner.validate(&entries[key], &item_path, diagnostics);
            }
        }
    }
}

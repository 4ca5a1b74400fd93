//! Core type system for tfplug
//!
//! Configuration, planned state and stored state all travel between the host
//! and the provider as a [`DynamicValue`]: an untyped tree addressed with
//! [`AttributePath`]s. Resources read and write it through the typed
//! accessors below and report problems as [`Diagnostic`]s.

use crate::error::{Result, TfplugError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dynamic represents Terraform values that can be of any type
/// IMPORTANT: Always use type-safe accessors instead of matching directly
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    Null,
    Bool(bool),
    /// All numbers are f64 to match Terraform
    Number(f64),
    String(String),
    List(Vec<Dynamic>),
    /// Objects and maps share this representation
    Map(HashMap<String, Dynamic>),
    /// Value not yet known (during planning)
    Unknown,
}

impl Dynamic {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    /// Null, empty strings and empty collections are indistinguishable to
    /// the host once stored, so comparisons treat them as the same value.
    pub fn is_empty_like(&self) -> bool {
        match self {
            Dynamic::Null => true,
            Dynamic::String(s) => s.is_empty(),
            Dynamic::List(l) => l.is_empty(),
            Dynamic::Map(m) => m.is_empty(),
            _ => false,
        }
    }

    /// Equality that honours [`Dynamic::is_empty_like`]
    pub fn semantically_equal(&self, other: &Dynamic) -> bool {
        if self.is_empty_like() && other.is_empty_like() {
            return true;
        }
        self == other
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Null => "null",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Map(_) => "map",
            Dynamic::Unknown => "unknown",
        }
    }
}

impl From<&str> for Dynamic {
    fn from(value: &str) -> Self {
        Dynamic::String(value.to_string())
    }
}

impl From<String> for Dynamic {
    fn from(value: String) -> Self {
        Dynamic::String(value)
    }
}

impl From<bool> for Dynamic {
    fn from(value: bool) -> Self {
        Dynamic::Bool(value)
    }
}

impl<T: Into<Dynamic>> From<Option<T>> for Dynamic {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Dynamic::Null)
    }
}

impl Serialize for Dynamic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Dynamic::Null => serializer.serialize_unit(),
            Dynamic::Bool(b) => serializer.serialize_bool(*b),
            Dynamic::Number(n) => serializer.serialize_f64(*n),
            Dynamic::String(s) => serializer.serialize_str(s),
            Dynamic::List(l) => l.serialize(serializer),
            Dynamic::Map(m) => m.serialize(serializer),
            Dynamic::Unknown => serializer.serialize_str(UNKNOWN_SENTINEL),
        }
    }
}

const UNKNOWN_SENTINEL: &str = "__unknown__";

impl<'de> Deserialize<'de> for Dynamic {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};
        use std::fmt;

        struct DynamicVisitor;

        impl<'de> Visitor<'de> for DynamicVisitor {
            type Value = Dynamic;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a valid Dynamic value")
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Null)
            }

            fn visit_none<E: de::Error>(self) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Dynamic, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                Dynamic::deserialize(deserializer)
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Bool(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> std::result::Result<Dynamic, E> {
                Ok(Dynamic::Number(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Dynamic, E> {
                if value == UNKNOWN_SENTINEL {
                    Ok(Dynamic::Unknown)
                } else {
                    Ok(Dynamic::String(value.to_string()))
                }
            }

            fn visit_seq<V>(self, mut seq: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(elem) = seq.next_element()? {
                    items.push(elem);
                }
                Ok(Dynamic::List(items))
            }

            fn visit_map<V>(self, mut map: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::MapAccess<'de>,
            {
                let mut entries = HashMap::new();
                while let Some((key, value)) = map.next_entry()? {
                    entries.insert(key, value);
                }
                Ok(Dynamic::Map(entries))
            }
        }

        deserializer.deserialize_any(DynamicVisitor)
    }
}

/// DynamicValue wraps Dynamic and provides encoding/decoding capabilities
/// This is what gets passed between Terraform and the provider
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub value: Dynamic,
}

impl Default for DynamicValue {
    fn default() -> Self {
        Self::object()
    }
}

impl DynamicValue {
    pub fn new(value: Dynamic) -> Self {
        Self { value }
    }

    pub fn null() -> Self {
        Self {
            value: Dynamic::Null,
        }
    }

    /// An empty object, the usual starting point for building state
    pub fn object() -> Self {
        Self {
            value: Dynamic::Map(HashMap::new()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, Dynamic::Null)
    }

    /// Terraform uses msgpack on the wire; a null value encodes to nothing
    pub fn encode_msgpack(&self) -> Result<Vec<u8>> {
        if self.is_null() {
            return Ok(vec![]);
        }
        rmp_serde::encode::to_vec(&self.value)
            .map_err(|e| TfplugError::EncodingError(format!("msgpack encoding failed: {}", e)))
    }

    pub fn decode_msgpack(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::null());
        }
        let value = rmp_serde::decode::from_slice::<Dynamic>(data)
            .map_err(|e| TfplugError::DecodingError(format!("msgpack decoding failed: {}", e)))?;
        Ok(Self { value })
    }

    pub fn encode_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.value)
            .map_err(|e| TfplugError::EncodingError(format!("json encoding failed: {}", e)))
    }

    pub fn decode_json(data: &[u8]) -> Result<Self> {
        let value = serde_json::from_slice(data)
            .map_err(|e| TfplugError::DecodingError(format!("json decoding failed: {}", e)))?;
        Ok(Self { value })
    }

    /// Raw access, returning `Dynamic::Null` for anything not present
    pub fn get(&self, path: &AttributePath) -> &Dynamic {
        const NULL: Dynamic = Dynamic::Null;
        self.navigate_path(path).unwrap_or(&NULL)
    }

    /// Type-safe accessors - ALWAYS use these instead of pattern matching.
    /// A missing or null attribute is reported as `AttributeNotFound`.
    pub fn get_string(&self, path: &AttributePath) -> Result<String> {
        match self.present(path)? {
            Dynamic::String(s) => Ok(s.clone()),
            other => Err(Self::mismatch("string", other)),
        }
    }

    pub fn get_number(&self, path: &AttributePath) -> Result<f64> {
        match self.present(path)? {
            Dynamic::Number(n) => Ok(*n),
            other => Err(Self::mismatch("number", other)),
        }
    }

    pub fn get_bool(&self, path: &AttributePath) -> Result<bool> {
        match self.present(path)? {
            Dynamic::Bool(b) => Ok(*b),
            other => Err(Self::mismatch("bool", other)),
        }
    }

    pub fn get_map(&self, path: &AttributePath) -> Result<HashMap<String, Dynamic>> {
        match self.present(path)? {
            Dynamic::Map(m) => Ok(m.clone()),
            other => Err(Self::mismatch("map", other)),
        }
    }

    /// Reads an optional string: missing, null or unknown is `Ok(None)`, a
    /// wrong type is an error
    pub fn get_optional_string(&self, path: &AttributePath) -> Result<Option<String>> {
        if self.is_unknown(path) {
            return Ok(None);
        }
        match self.get_string(path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.is_missing() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn get_optional_bool(&self, path: &AttributePath) -> Result<Option<bool>> {
        if self.is_unknown(path) {
            return Ok(None);
        }
        match self.get_bool(path) {
            Ok(b) => Ok(Some(b)),
            Err(e) if e.is_missing() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Reads a map whose values must all be strings
    pub fn get_string_map(&self, path: &AttributePath) -> Result<HashMap<String, String>> {
        if self.is_unknown(path) {
            return Ok(HashMap::new());
        }
        let entries = match self.get_map(path) {
            Ok(m) => m,
            Err(e) if e.is_missing() => return Ok(HashMap::new()),
            Err(e) => return Err(e),
        };

        entries
            .into_iter()
            .map(|(key, value)| match value {
                Dynamic::String(s) => Ok((key, s)),
                other => Err(Self::mismatch("string", &other)),
            })
            .collect()
    }

    /// Type-safe setters - Use for building state/config objects
    pub fn set_string(&mut self, path: &AttributePath, value: String) -> Result<()> {
        self.set_value(path, Dynamic::String(value))
    }

    pub fn set_bool(&mut self, path: &AttributePath, value: bool) -> Result<()> {
        self.set_value(path, Dynamic::Bool(value))
    }

    pub fn set_null(&mut self, path: &AttributePath) -> Result<()> {
        self.set_value(path, Dynamic::Null)
    }

    pub fn set_string_map<I>(&mut self, path: &AttributePath, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k, Dynamic::String(v)))
            .collect();
        self.set_value(path, Dynamic::Map(map))
    }

    /// Removes a top-level attribute, returning its previous value
    pub fn remove(&mut self, name: &str) -> Option<Dynamic> {
        match &mut self.value {
            Dynamic::Map(m) => m.remove(name),
            _ => None,
        }
    }

    pub fn set_value(&mut self, path: &AttributePath, new_value: Dynamic) -> Result<()> {
        let Some((last, parents)) = path.steps.split_last() else {
            self.value = new_value;
            return Ok(());
        };

        if !matches!(self.value, Dynamic::Map(_)) {
            self.value = Dynamic::Map(HashMap::new());
        }

        let mut current = &mut self.value;
        for step in parents {
            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => m
                    .entry(name.clone())
                    .or_insert_with(|| Dynamic::Map(HashMap::new())),
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
                    let len = l.len();
                    l.get_mut(*idx as usize).ok_or_else(|| {
                        TfplugError::Custom(format!("list index {} out of bounds ({})", idx, len))
                    })?
                }
                _ => return Err(TfplugError::Custom("invalid path navigation".to_string())),
            };
        }

        match (current, last) {
            (Dynamic::Map(m), AttributePathStep::AttributeName(name))
            | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => {
                m.insert(name.clone(), new_value);
                Ok(())
            }
            (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
                let len = l.len();
                let slot = l.get_mut(*idx as usize).ok_or_else(|| {
                    TfplugError::Custom(format!("list index {} out of bounds ({})", idx, len))
                })?;
                *slot = new_value;
                Ok(())
            }
            _ => Err(TfplugError::Custom("invalid path navigation".to_string())),
        }
    }

    /// True when the value will only be known after apply
    pub fn is_unknown(&self, path: &AttributePath) -> bool {
        matches!(self.navigate_path(path), Some(Dynamic::Unknown))
    }

    fn present(&self, path: &AttributePath) -> Result<&Dynamic> {
        match self.navigate_path(path) {
            Some(Dynamic::Null) | None => Err(TfplugError::AttributeNotFound(path.to_string())),
            Some(value) => Ok(value),
        }
    }

    fn navigate_path(&self, path: &AttributePath) -> Option<&Dynamic> {
        path.steps
            .iter()
            .try_fold(&self.value, |current, step| match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => m.get(name),
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => l.get(*idx as usize),
                _ => None,
            })
    }

    fn mismatch(expected: &str, actual: &Dynamic) -> TfplugError {
        TfplugError::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.type_name().to_string(),
        }
    }
}

/// AttributePath represents a path to an attribute within a DynamicValue
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributePath {
    pub steps: Vec<AttributePathStep>,
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![AttributePathStep::AttributeName(name.to_string())],
        }
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.steps
            .push(AttributePathStep::AttributeName(name.to_string()));
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.steps
            .push(AttributePathStep::ElementKeyString(key.to_string()));
        self
    }
}

impl std::fmt::Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                AttributePathStep::AttributeName(name) if i == 0 => write!(f, "{}", name)?,
                AttributePathStep::AttributeName(name) => write!(f, ".{}", name)?,
                AttributePathStep::ElementKeyString(key) => write!(f, "[{:?}]", key)?,
                AttributePathStep::ElementKeyInt(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

/// Individual step in an AttributePath
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributePathStep {
    AttributeName(String),
    ElementKeyString(String),
    ElementKeyInt(i64),
}

/// RawState holds the stored state for a resource to be upgraded
#[derive(Debug, Clone, Default)]
pub struct RawState {
    pub json: Option<Vec<u8>>,
    pub flatmap: Option<HashMap<String, String>>,
}

impl RawState {
    /// Decodes whichever representation the host supplied into a value tree.
    /// Flatmap states (pre-0.12 Terraform) only carry top-level strings.
    pub fn decode(&self) -> Result<DynamicValue> {
        if let Some(json) = &self.json {
            return DynamicValue::decode_json(json);
        }
        if let Some(flatmap) = &self.flatmap {
            let map = flatmap
                .iter()
                .map(|(k, v)| (k.clone(), Dynamic::String(v.clone())))
                .collect();
            return Ok(DynamicValue::new(Dynamic::Map(map)));
        }
        Err(TfplugError::InvalidState(
            "raw state carries neither json nor flatmap".to_string(),
        ))
    }
}

/// Diagnostic represents a warning or error from the provider
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
    pub attribute: Option<AttributePath>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, path: AttributePath) -> Self {
        self.attribute = Some(path);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiagnosticSeverity {
    Invalid,
    Error,
    Warning,
}

/// True if any diagnostic in the slice is an error
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Config represents configuration values
pub type Config = DynamicValue;

/// State represents resource state values
pub type State = DynamicValue;

//! Attribute-level differences between prior and planned state
//!
//! Resources decide which remote calls an Update needs from a [`ChangeSet`]
//! instead of inspecting raw configuration.

use crate::types::{Dynamic, DynamicValue};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changed: BTreeSet<String>,
}

impl ChangeSet {
    /// Compares every top-level attribute present in either value.
    /// Null, empty strings and empty collections count as equal.
    pub fn between(prior: &DynamicValue, planned: &DynamicValue) -> Self {
        let empty = std::collections::HashMap::new();
        let prior_attrs = match &prior.value {
            Dynamic::Map(m) => m,
            _ => &empty,
        };
        let planned_attrs = match &planned.value {
            Dynamic::Map(m) => m,
            _ => &empty,
        };

        let changed = prior_attrs
            .keys()
            .chain(planned_attrs.keys())
            .filter(|name| {
                let before = prior_attrs.get(*name).unwrap_or(&Dynamic::Null);
                let after = planned_attrs.get(*name).unwrap_or(&Dynamic::Null);
                !before.semantically_equal(after)
            })
            .cloned()
            .collect();

        Self { changed }
    }

    /// Builds a change set naming the given attributes directly
    pub fn of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            changed: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_change(&self, attribute: &str) -> bool {
        self.changed.contains(attribute)
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.changed.iter().map(String::as_str)
    }
}

//! Parameter definitions, caller-supplied values and the effective set passed downstream.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A parameter declared by a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ParameterDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_value: None,
            description: None,
        }
    }

    pub fn with_default(name: impl Into<String>, default_value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_value: Some(default_value.into()),
            description: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The value this definition contributes when the caller supplies nothing
    pub fn default_parameter_value(&self) -> Option<ParameterValue> {
        self.default_value
            .as_ref()
            .map(|value| ParameterValue::new(self.name.clone(), value.clone()))
    }
}

/// A `{name, value}` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterValue {
    pub name: String,
    pub value: String,
}

impl ParameterValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered, name-unique parameter values handed to the downstream job.
///
/// Names keep the position of their first occurrence; a later value for the same
/// name replaces the earlier one. There are no mutators once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveParameterSet {
    values: Vec<ParameterValue>,
}

impl EffectiveParameterSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterValue> {
        self.values.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.values.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Environment variables the downstream run sees
    pub fn to_environment(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect()
    }

    fn upsert(&mut self, value: ParameterValue) {
        match self.values.iter_mut().find(|p| p.name == value.name) {
            Some(existing) => existing.value = value.value,
            None => self.values.push(value),
        }
    }
}

impl FromIterator<ParameterValue> for EffectiveParameterSet {
    fn from_iter<I: IntoIterator<Item = ParameterValue>>(iter: I) -> Self {
        let mut set = Self::empty();
        for value in iter {
            set.upsert(value);
        }
        set
    }
}

impl<'a> IntoIterator for &'a EffectiveParameterSet {
    type Item = &'a ParameterValue;
    type IntoIter = std::slice::Iter<'a, ParameterValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

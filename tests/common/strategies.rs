use proptest::prelude::*;
use release_trigger::models::{ParameterDefinition, ParameterValue};

/// Strategy for generating parameter names from a small alphabet so collisions happen
pub fn parameter_name_strategy() -> impl Strategy<Value = String> {
    "[A-F]"
}

pub fn parameter_value_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9]{0,8}"
}

/// Definitions with unique names, some without defaults
pub fn definitions_strategy() -> impl Strategy<Value = Vec<ParameterDefinition>> {
    prop::collection::btree_map(
        parameter_name_strategy(),
        prop::option::of(parameter_value_strategy()),
        0..6,
    )
    .prop_map(|map| {
        map.into_iter()
            .map(|(name, default)| match default {
                Some(value) => ParameterDefinition::with_default(name, value),
                None => ParameterDefinition::new(name),
            })
            .collect()
    })
}

/// Explicit values, possibly repeating names
pub fn explicit_strategy() -> impl Strategy<Value = Vec<ParameterValue>> {
    prop::collection::vec(
        (parameter_name_strategy(), parameter_value_strategy())
            .prop_map(|(name, value)| ParameterValue::new(name, value)),
        0..8,
    )
}

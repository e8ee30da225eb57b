//! # Parameter Resolver
//!
//! Merges a job's declared parameters with the values a caller passes to
//! `release`. Declared order is preserved; an explicit value replaces the
//! declared default, and a declaration with neither contributes nothing.
//! Explicit names the job does not declare follow the configured
//! [`UnknownParameterPolicy`].

use tracing::debug;

use crate::config::UnknownParameterPolicy;
use crate::error::{ReleaseError, Result};
use crate::models::{EffectiveParameterSet, ParameterDefinition, ParameterValue};

#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterResolver {
    policy: UnknownParameterPolicy,
}

impl ParameterResolver {
    pub fn new(policy: UnknownParameterPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> UnknownParameterPolicy {
        self.policy
    }

    /// Compute the effective parameter set for `job_name`.
    ///
    /// When the caller names the same parameter twice, the last value wins.
    pub fn resolve(
        &self,
        job_name: &str,
        definitions: &[ParameterDefinition],
        explicit: &[ParameterValue],
    ) -> Result<EffectiveParameterSet> {
        let explicit_value = |name: &str| {
            explicit
                .iter()
                .rev()
                .find(|p| p.name == name)
                .map(|p| p.value.clone())
        };

        let declared = definitions.iter().filter_map(|definition| {
            explicit_value(&definition.name)
                .map(|value| ParameterValue::new(definition.name.clone(), value))
                .or_else(|| definition.default_parameter_value())
        });

        let unknown: Vec<&ParameterValue> = explicit
            .iter()
            .filter(|p| !definitions.iter().any(|d| d.name == p.name))
            .collect();

        if unknown.is_empty() {
            return Ok(declared.collect());
        }

        let mut unknown_names: Vec<String> = Vec::with_capacity(unknown.len());
        for p in &unknown {
            if !unknown_names.contains(&p.name) {
                unknown_names.push(p.name.clone());
            }
        }

        match self.policy {
            UnknownParameterPolicy::Reject => Err(ReleaseError::InvalidParameters {
                job_name: job_name.to_string(),
                names: unknown_names,
                reason: "not declared by the job".to_string(),
            }),
            UnknownParameterPolicy::PassThrough => {
                debug!(
                    job_name = %job_name,
                    parameters = ?unknown_names,
                    "Passing through undeclared parameters"
                );
                Ok(declared
                    .chain(unknown.into_iter().cloned())
                    .collect())
            }
            UnknownParameterPolicy::Ignore => {
                debug!(
                    job_name = %job_name,
                    parameters = ?unknown_names,
                    "Ignoring undeclared parameters"
                );
                Ok(declared.collect())
            }
        }
    }
}

//! Validation of values submitted through a job's release form

use crate::error::{ReleaseError, Result};
use crate::models::{JobInfo, ParameterValue};

/// Maximum length of a submitted parameter value
const MAX_VALUE_LENGTH: usize = 10000;

/// Validates a release form submission against the job's release parameters.
///
/// Returns the submitted values in submission order.
pub fn validate_release_form(
    job: &JobInfo,
    submitted: &[ParameterValue],
) -> Result<Vec<ParameterValue>> {
    let Some(definitions) = job.release_parameters.as_deref() else {
        return Err(ReleaseError::Configuration(format!(
            "Job {} has no release configuration",
            job.full_display_name()
        )));
    };

    let mut unknown: Vec<String> = Vec::new();
    for value in submitted {
        if !definitions.iter().any(|d| d.name == value.name) && !unknown.contains(&value.name) {
            unknown.push(value.name.clone());
        }
    }
    if !unknown.is_empty() {
        return Err(ReleaseError::InvalidParameters {
            job_name: job.full_name.clone(),
            names: unknown,
            reason: "not a release parameter of the job".to_string(),
        });
    }

    let oversized: Vec<String> = submitted
        .iter()
        .filter(|v| v.value.len() > MAX_VALUE_LENGTH)
        .map(|v| v.name.clone())
        .collect();
    if !oversized.is_empty() {
        return Err(ReleaseError::InvalidParameters {
            job_name: job.full_name.clone(),
            names: oversized,
            reason: format!("value longer than {MAX_VALUE_LENGTH} characters"),
        });
    }

    Ok(submitted.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParameterDefinition;

    fn releasable() -> JobInfo {
        JobInfo::project("deploy").with_release_parameters(vec![
            ParameterDefinition::with_default("version", "1.0"),
            ParameterDefinition::new("notes"),
        ])
    }

    #[test]
    fn test_valid_submission_keeps_order() {
        let submitted = vec![
            ParameterValue::new("notes", "hotfix"),
            ParameterValue::new("version", "1.1"),
        ];
        let validated = validate_release_form(&releasable(), &submitted).unwrap();
        assert_eq!(validated, submitted);
    }

    #[test]
    fn test_job_without_release_configuration() {
        let err = validate_release_form(&JobInfo::project("deploy"), &[]).unwrap_err();
        assert!(matches!(err, ReleaseError::Configuration(_)));
    }

    #[test]
    fn test_unknown_names_reported_once() {
        let err = validate_release_form(
            &releasable(),
            &[
                ParameterValue::new("branch", "main"),
                ParameterValue::new("version", "2.0"),
                ParameterValue::new("branch", "dev"),
            ],
        )
        .unwrap_err();

        match err {
            ReleaseError::InvalidParameters { names, .. } => assert_eq!(names, vec!["branch"]),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_oversized_value_rejected() {
        let err = validate_release_form(
            &releasable(),
            &[ParameterValue::new("notes", "x".repeat(MAX_VALUE_LENGTH + 1))],
        )
        .unwrap_err();
        assert!(matches!(err, ReleaseError::InvalidParameters { .. }));
    }
}

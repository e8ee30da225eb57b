//! Jobs as seen through the host facade.

use serde::{Deserialize, Serialize};

use super::parameter::ParameterDefinition;

/// Separator the host uses between path segments in display names
const DISPLAY_SEPARATOR: &str = " » ";

/// Kind of item stored in the host's item tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// A buildable, parameterizable project
    Project,
    /// A container of other items
    Folder,
}

/// A job (or folder) known to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    /// Slash-separated path from the root, e.g. `team/deploy`
    pub full_name: String,
    pub kind: ItemKind,
    /// Declared parameters in declaration order
    #[serde(default)]
    pub parameter_definitions: Vec<ParameterDefinition>,
    /// Parameters of the job's release configuration, absent when the job has none
    #[serde(default)]
    pub release_parameters: Option<Vec<ParameterDefinition>>,
    #[serde(default)]
    pub disabled: bool,
}

impl JobInfo {
    pub fn project(full_name: impl Into<String>) -> Self {
        Self::new(full_name, ItemKind::Project)
    }

    pub fn folder(full_name: impl Into<String>) -> Self {
        Self::new(full_name, ItemKind::Folder)
    }

    fn new(full_name: impl Into<String>, kind: ItemKind) -> Self {
        let full_name: String = full_name.into();
        Self {
            full_name: full_name.trim_matches('/').to_string(),
            kind,
            parameter_definitions: Vec::new(),
            release_parameters: None,
            disabled: false,
        }
    }

    pub fn with_parameter(mut self, definition: ParameterDefinition) -> Self {
        self.parameter_definitions.push(definition);
        self
    }

    pub fn with_release_parameters(mut self, definitions: Vec<ParameterDefinition>) -> Self {
        self.release_parameters = Some(definitions);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Last path segment
    pub fn name(&self) -> &str {
        self.full_name
            .rsplit('/')
            .next()
            .unwrap_or(self.full_name.as_str())
    }

    /// Path of the containing folder, empty for top-level items
    pub fn parent(&self) -> &str {
        match self.full_name.rfind('/') {
            Some(idx) => &self.full_name[..idx],
            None => "",
        }
    }

    /// Human-readable path, e.g. `team » deploy`
    pub fn full_display_name(&self) -> String {
        self.full_name.split('/').collect::<Vec<_>>().join(DISPLAY_SEPARATOR)
    }

    pub fn is_buildable(&self) -> bool {
        self.kind == ItemKind::Project && !self.disabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_and_parent() {
        let job = JobInfo::project("/team/releases/deploy/");
        assert_eq!(job.full_name, "team/releases/deploy");
        assert_eq!(job.name(), "deploy");
        assert_eq!(job.parent(), "team/releases");
        assert_eq!(job.full_display_name(), "team » releases » deploy");

        let top = JobInfo::project("deploy");
        assert_eq!(top.parent(), "");
        assert_eq!(top.full_display_name(), "deploy");
    }

    #[test]
    fn test_buildable() {
        assert!(JobInfo::project("deploy").is_buildable());
        assert!(!JobInfo::project("deploy").disabled().is_buildable());
        assert!(!JobInfo::folder("team").is_buildable());
    }
}

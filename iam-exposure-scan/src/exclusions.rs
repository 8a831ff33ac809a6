//! Exclusion configuration: principals, policies, and actions to leave out
//! of scan results.
//!
//! Exclusion entries are stored lower-cased. Name matching supports a single
//! leading or trailing `*`: `aws-service-role*` matches by prefix,
//! `*-readonly` by suffix, anything else matches exactly. The mapping filter
//! additionally uses exact set membership over the same lists.

use serde::{Deserialize, Serialize};

use crate::action_table::{EmbeddedScanData, DEFAULT_EXCLUSIONS_FILE};
use crate::errors::{ScanError, ScanResult};
use crate::principal_detail::PrincipalType;

/// User-supplied exclusions configuration, as read from a YAML or JSON file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExclusionsConfig {
    pub users: Vec<String>,
    pub groups: Vec<String>,
    pub roles: Vec<String>,
    pub policies: Vec<String>,
    pub include_actions: Vec<String>,
    pub exclude_actions: Vec<String>,
}

impl ExclusionsConfig {
    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> ScanResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// Validated exclusion sets with lower-cased storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclusions {
    users: Vec<String>,
    groups: Vec<String>,
    roles: Vec<String>,
    policies: Vec<String>,
    include_actions: Vec<String>,
    exclude_actions: Vec<String>,
}

impl Exclusions {
    pub fn new(config: ExclusionsConfig) -> Self {
        Self {
            users: lowercase_all(config.users),
            groups: lowercase_all(config.groups),
            roles: lowercase_all(config.roles),
            policies: lowercase_all(config.policies),
            include_actions: lowercase_all(config.include_actions),
            exclude_actions: lowercase_all(config.exclude_actions),
        }
    }

    /// The built-in default exclusions embedded with the library.
    pub fn defaults() -> ScanResult<Self> {
        let data = EmbeddedScanData::read(DEFAULT_EXCLUSIONS_FILE)?;
        let yaml = std::str::from_utf8(&data)
            .map_err(|e| ScanError::EmbeddedData(format!("{DEFAULT_EXCLUSIONS_FILE}: {e}")))?;
        let config = ExclusionsConfig::from_yaml_str(yaml)?;
        Ok(Self::new(config))
    }

    /// Check the exclusions contract: every stored entry must be non-blank.
    ///
    /// Scanning and filtering operations call this before doing any work and
    /// fail with [`ScanError::InvalidExclusions`] on violation.
    pub fn validate(&self) -> ScanResult<()> {
        for (list, entries) in [
            ("users", &self.users),
            ("groups", &self.groups),
            ("roles", &self.roles),
            ("policies", &self.policies),
            ("include-actions", &self.include_actions),
            ("exclude-actions", &self.exclude_actions),
        ] {
            if entries.iter().any(|entry| entry.trim().is_empty()) {
                return Err(ScanError::InvalidExclusions(format!(
                    "blank entry in the {list} exclusion list"
                )));
            }
        }
        Ok(())
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn policies(&self) -> &[String] {
        &self.policies
    }

    /// Whether a policy name or policy path matches a policy exclusion.
    pub fn is_policy_excluded(&self, name: &str) -> bool {
        is_name_in(name, &self.policies)
    }

    /// Whether a principal of the given type matches an exclusion by name.
    pub fn is_principal_excluded(&self, name: &str, principal_type: PrincipalType) -> bool {
        let list = match principal_type {
            PrincipalType::User => &self.users,
            PrincipalType::Group => &self.groups,
            PrincipalType::Role => &self.roles,
        };
        is_name_in(name, list)
    }

    /// Whether an action is excluded from evaluation results. An entry in
    /// `include-actions` overrides a match in `exclude-actions`.
    pub fn is_action_excluded(&self, action: &str) -> bool {
        is_name_in(action, &self.exclude_actions) && !is_name_in(action, &self.include_actions)
    }
}

fn lowercase_all(entries: Vec<String>) -> Vec<String> {
    entries.into_iter().map(|e| e.to_lowercase()).collect()
}

fn is_name_in(name: &str, exclusions: &[String]) -> bool {
    let name = name.to_lowercase();
    exclusions
        .iter()
        .any(|exclusion| is_name_excluded(&name, exclusion))
}

/// Match a lower-cased name against a single lower-cased exclusion entry.
fn is_name_excluded(name: &str, exclusion: &str) -> bool {
    if let Some(suffix) = exclusion.strip_prefix('*') {
        name.ends_with(suffix)
    } else if let Some(prefix) = exclusion.strip_suffix('*') {
        name.starts_with(prefix)
    } else {
        name == exclusion
    }
}

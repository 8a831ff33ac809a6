//! Principal-policy attachment mapping and its exclusion-aware filter.
//!
//! One entry per (principal, policy) relationship, including group-inherited
//! attachments for users. Entries are emitted sorted by
//! `(type, principal, policy type, policy name)`.

use serde::{Deserialize, Serialize};

use crate::errors::{ScanError, ScanResult};
use crate::exclusions::Exclusions;
use crate::policy_detail::ManagedBy;
use crate::principal_detail::PrincipalType;

/// How a policy is attached to a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyType {
    Inline,
    Managed,
}

impl PolicyType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "Inline",
            Self::Managed => "Managed",
        }
    }
}

/// One (principal, policy) attachment record.
///
/// `comment` carries the owning user's full group-membership list on
/// group-inherited entries and is absent on direct attachments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct PrincipalPolicyMappingEntry {
    #[serde(rename = "Principal")]
    pub principal_name: String,
    #[serde(rename = "Type")]
    pub principal_type: PrincipalType,
    pub policy_type: PolicyType,
    pub managed_by: ManagedBy,
    pub policy_name: String,
    #[serde(rename = "Comment")]
    pub comment: Option<Vec<String>>,
}

impl PrincipalPolicyMappingEntry {
    fn sort_key(&self) -> (&str, &str, &str, &str) {
        (
            self.principal_type.as_str(),
            &self.principal_name,
            self.policy_type.as_str(),
            &self.policy_name,
        )
    }
}

/// The complete principal-policy attachment mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrincipalPolicyMapping {
    entries: Vec<PrincipalPolicyMappingEntry>,
}

impl PrincipalPolicyMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: PrincipalPolicyMappingEntry) {
        self.entries.push(entry);
    }

    /// Add a raw JSON record. A record that does not conform to the entry
    /// shape fails with [`ScanError::MappingEntryType`]; nothing is added.
    pub fn add_value(&mut self, value: serde_json::Value) -> ScanResult<()> {
        let entry: PrincipalPolicyMappingEntry = serde_json::from_value(value)
            .map_err(|e| ScanError::MappingEntryType(e.to_string()))?;
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[PrincipalPolicyMappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn users(&self) -> impl Iterator<Item = &PrincipalPolicyMappingEntry> {
        self.by_type(PrincipalType::User)
    }

    pub fn groups(&self) -> impl Iterator<Item = &PrincipalPolicyMappingEntry> {
        self.by_type(PrincipalType::Group)
    }

    pub fn roles(&self) -> impl Iterator<Item = &PrincipalPolicyMappingEntry> {
        self.by_type(PrincipalType::Role)
    }

    fn by_type(
        &self,
        principal_type: PrincipalType,
    ) -> impl Iterator<Item = &PrincipalPolicyMappingEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.principal_type == principal_type)
    }

    /// Entries sorted by `(type, principal, policy type, policy name)`.
    pub fn sorted_entries(&self) -> Vec<PrincipalPolicyMappingEntry> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        sorted
    }

    /// Apply the exclusion filter, producing a new mapping.
    ///
    /// User entries are filtered first, then groups, then roles; the order is
    /// load-bearing. A user entry survives only if it is group-inherited
    /// (carries a comment) with at least one non-excluded group, on top of
    /// the user- and policy-name checks. A group entry survives only if some
    /// already-surviving user entry still references the group in its
    /// comment: a group whose members were all excluded individually is
    /// suppressed even when the group itself is not. Role entries have no
    /// cascade.
    pub fn apply_exclusions(&self, exclusions: &Exclusions) -> ScanResult<Self> {
        exclusions.validate()?;
        let mut filtered = Self::new();

        for entry in self.users() {
            if in_set(&entry.principal_name, exclusions.users())
                || in_set(&entry.policy_name, exclusions.policies())
            {
                continue;
            }
            let Some(comment) = &entry.comment else {
                continue;
            };
            if comment
                .iter()
                .any(|group| !in_set(group, exclusions.groups()))
            {
                filtered.add(entry.clone());
            }
        }

        let surviving_groups: Vec<String> = filtered
            .users()
            .filter_map(|entry| entry.comment.as_ref())
            .flatten()
            .map(|group| group.to_lowercase())
            .collect();

        for entry in self.groups() {
            if in_set(&entry.principal_name, exclusions.groups())
                || in_set(&entry.policy_name, exclusions.policies())
            {
                continue;
            }
            if surviving_groups.contains(&entry.principal_name.to_lowercase()) {
                filtered.add(entry.clone());
            }
        }

        for entry in self.roles() {
            if in_set(&entry.principal_name, exclusions.roles())
                || in_set(&entry.policy_name, exclusions.policies())
            {
                continue;
            }
            filtered.add(entry.clone());
        }

        Ok(filtered)
    }
}

/// Exact membership in a lower-cased exclusion set, as opposed to the
/// wildcard matching used during scanning.
fn in_set(name: &str, set: &[String]) -> bool {
    let name = name.to_lowercase();
    set.iter().any(|entry| *entry == name)
}

//! Embedded action access-level data.
//!
//! The statement evaluator needs to know, per AWS service action, its access
//! level (Read, List, Write, Tagging, Permissions management) and whether the
//! action supports resource-level ARNs at all. That table is pre-processed
//! into `data/action-access-levels.json` and embedded directly into the
//! binary at compile time, alongside the default exclusions configuration.

use std::collections::BTreeMap;

use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};

use crate::errors::{ScanError, ScanResult};

/// Embedded scan data: the action access-level table and the default
/// exclusions configuration.
#[derive(RustEmbed)]
#[folder = "data"]
#[include = "*.json"]
#[include = "*.yml"]
pub struct EmbeddedScanData;

pub(crate) const ACTION_TABLE_FILE: &str = "action-access-levels.json";
pub(crate) const DEFAULT_EXCLUSIONS_FILE: &str = "default-exclusions.yml";

impl EmbeddedScanData {
    pub(crate) fn read(file: &str) -> ScanResult<Vec<u8>> {
        Self::get(file)
            .map(|f| f.data.to_vec())
            .ok_or_else(|| ScanError::EmbeddedData(format!("embedded file not found: {file}")))
    }
}

/// Access level of a single service action, per the AWS service
/// authorization reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessLevel {
    Read,
    List,
    Write,
    Tagging,
    #[serde(rename = "Permissions management")]
    PermissionsManagement,
}

impl AccessLevel {
    /// Whether this level mutates state ("modify"-class).
    pub fn is_modify(self) -> bool {
        matches!(self, Self::Write | Self::Tagging | Self::PermissionsManagement)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ServiceActions {
    /// Canonical action name to access level.
    actions: BTreeMap<String, AccessLevel>,
    /// Actions that only ever apply to `"Resource": "*"` and therefore
    /// cannot be missing a resource constraint.
    #[serde(rename = "wildcard-only", default)]
    wildcard_only: Vec<String>,
}

/// Lookup table over the embedded access-level data.
///
/// Action matching is case-insensitive, as IAM action matching is; expansion
/// returns canonical `service:ActionName` spellings in table order.
#[derive(Debug, Clone)]
pub struct ActionTable {
    services: BTreeMap<String, ServiceActions>,
}

impl ActionTable {
    /// Load the table from the embedded data.
    pub fn load() -> ScanResult<Self> {
        let data = EmbeddedScanData::read(ACTION_TABLE_FILE)?;
        let services: BTreeMap<String, ServiceActions> = serde_json::from_slice(&data)
            .map_err(|e| ScanError::EmbeddedData(format!("{ACTION_TABLE_FILE}: {e}")))?;
        log::debug!(
            "Loaded action table: {} services, {} actions",
            services.len(),
            services.values().map(|s| s.actions.len()).sum::<usize>()
        );
        Ok(Self { services })
    }

    /// Expand an IAM action pattern (`*`, `s3:*`, `s3:Get*`, `s3:GetObject`)
    /// into the known canonical actions it covers. Unknown services and
    /// actions expand to nothing.
    pub fn expand(&self, pattern: &str) -> Vec<String> {
        if pattern == "*" {
            return self
                .services
                .iter()
                .flat_map(|(service, entry)| {
                    entry.actions.keys().map(move |name| format!("{service}:{name}"))
                })
                .collect();
        }
        let Some((service_pattern, action_pattern)) = pattern.split_once(':') else {
            return Vec::new();
        };
        let service_pattern = service_pattern.to_ascii_lowercase();
        let action_pattern = action_pattern.to_ascii_lowercase();
        let mut expanded = Vec::new();
        for (service, entry) in &self.services {
            if !wildcard_match(&service_pattern, service) {
                continue;
            }
            for name in entry.actions.keys() {
                if wildcard_match(&action_pattern, &name.to_ascii_lowercase()) {
                    expanded.push(format!("{service}:{name}"));
                }
            }
        }
        expanded
    }

    /// Access level of a canonical action, if the table knows it.
    pub fn access_level(&self, service: &str, action: &str) -> Option<AccessLevel> {
        self.services.get(service).and_then(|entry| {
            entry
                .actions
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(action))
                .map(|(_, level)| *level)
        })
    }

    /// Whether an action supports resource-level ARNs.
    pub fn supports_resource_constraints(&self, service: &str, action: &str) -> bool {
        self.services.get(service).is_some_and(|entry| {
            !entry
                .wildcard_only
                .iter()
                .any(|name| name.eq_ignore_ascii_case(action))
        })
    }
}

/// Glob-style match where `*` matches any run of characters. Both inputs are
/// expected to be lower-cased by the caller.
fn wildcard_match(pattern: &str, name: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == name;
    }
    let segments: Vec<&str> = pattern.split('*').collect();
    let mut remainder = name;
    for (index, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        if index == 0 {
            match remainder.strip_prefix(segment) {
                Some(rest) => remainder = rest,
                None => return false,
            }
        } else if index == segments.len() - 1 && !pattern.ends_with('*') {
            return remainder.ends_with(segment);
        } else {
            match remainder.find(segment) {
                Some(position) => remainder = &remainder[position + segment.len()..],
                None => return false,
            }
        }
    }
    true
}

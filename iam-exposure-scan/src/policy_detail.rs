//! Managed-policy entities from the `Policies` block of an
//! account-authorization-details snapshot.

use serde::{Deserialize, Serialize};

use crate::policy_document::PolicyDocument;

/// ARN path segment identifying AWS-managed policies. Classification is a
/// case-sensitive substring test on the full ARN, applied identically to
/// standalone and attached policies.
pub const AWS_MANAGED_ARN_SEGMENT: &str = "arn:aws:iam::aws:";

/// Who manages a policy, derived from its ARN scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManagedBy {
    #[serde(rename = "AWS")]
    Aws,
    Customer,
}

impl ManagedBy {
    pub fn from_arn(arn: &str) -> Self {
        if arn.contains(AWS_MANAGED_ARN_SEGMENT) {
            Self::Aws
        } else {
            Self::Customer
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aws => "AWS",
            Self::Customer => "Customer",
        }
    }
}

/// One version of a managed policy in the snapshot.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawPolicyVersion {
    pub document: PolicyDocument,
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub is_default_version: bool,
}

/// A managed policy exactly as it appears in the snapshot's `Policies` list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawManagedPolicy {
    pub policy_name: String,
    pub arn: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub default_version_id: Option<String>,
    #[serde(default)]
    pub policy_version_list: Vec<RawPolicyVersion>,
}

fn default_path() -> String {
    "/".to_string()
}

/// A managed policy with its effective (default-version) document resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDetail {
    pub policy_name: String,
    pub arn: String,
    pub path: String,
    pub policy_document: PolicyDocument,
}

impl PolicyDetail {
    /// Pick the default version's document; a policy with no versions at all
    /// is dropped from the snapshot.
    fn from_raw(raw: RawManagedPolicy) -> Option<Self> {
        let default_id = raw.default_version_id;
        let mut versions = raw.policy_version_list;
        let position = versions
            .iter()
            .position(|version| {
                version.is_default_version
                    || (version.version_id.is_some() && version.version_id == default_id)
            })
            .unwrap_or(0);
        if versions.is_empty() {
            log::debug!("Policy {} has no versions, skipping", raw.policy_name);
            return None;
        }
        let document = versions.swap_remove(position).document;
        Some(Self {
            policy_name: raw.policy_name,
            arn: raw.arn,
            path: raw.path,
            policy_document: document,
        })
    }

    /// The path-qualified policy name, e.g. `service-role/MyPolicy`.
    pub fn full_policy_path(&self) -> String {
        let path = self.path.trim_matches('/');
        if path.is_empty() {
            self.policy_name.clone()
        } else {
            format!("{}/{}", path, self.policy_name)
        }
    }

    pub fn managed_by(&self) -> ManagedBy {
        ManagedBy::from_arn(&self.arn)
    }
}

/// All standalone managed policies in the snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyDetails {
    policies: Vec<PolicyDetail>,
}

impl PolicyDetails {
    pub fn from_raw(raw: Vec<RawManagedPolicy>) -> Self {
        Self {
            policies: raw.into_iter().filter_map(PolicyDetail::from_raw).collect(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PolicyDetail> {
        self.policies.iter()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn find_by_arn(&self, arn: &str) -> Option<&PolicyDetail> {
        self.policies.iter().find(|policy| policy.arn == arn)
    }
}

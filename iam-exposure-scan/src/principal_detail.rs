//! Principal entities (users, groups, roles) from an
//! account-authorization-details snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::policy_detail::PolicyDetails;
use crate::policy_document::PolicyDocument;

/// Principal discriminant. Serialized with the singular spelling used
/// throughout the snapshot format ("User", "Group", "Role").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrincipalType {
    User,
    Group,
    Role,
}

impl PrincipalType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Group => "Group",
            Self::Role => "Role",
        }
    }
}

impl fmt::Display for PrincipalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inline policy embedded in a principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PrincipalPolicy {
    pub policy_name: String,
    pub policy_document: PolicyDocument,
}

/// A managed-policy attachment (name and ARN only; the document lives in the
/// snapshot's `Policies` block).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttachedManagedPolicy {
    pub policy_name: String,
    pub policy_arn: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawUserDetail {
    pub user_name: String,
    pub arn: String,
    #[serde(default)]
    pub group_list: Vec<String>,
    #[serde(default)]
    pub user_policy_list: Vec<PrincipalPolicy>,
    #[serde(default)]
    pub attached_managed_policies: Vec<AttachedManagedPolicy>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawGroupDetail {
    pub group_name: String,
    pub arn: String,
    #[serde(default)]
    pub group_policy_list: Vec<PrincipalPolicy>,
    #[serde(default)]
    pub attached_managed_policies: Vec<AttachedManagedPolicy>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawRoleDetail {
    pub role_name: String,
    pub arn: String,
    #[serde(default)]
    pub assume_role_policy_document: Option<PolicyDocument>,
    #[serde(default)]
    pub role_policy_list: Vec<PrincipalPolicy>,
    #[serde(default)]
    pub attached_managed_policies: Vec<AttachedManagedPolicy>,
}

/// A principal with its policies in scannable form.
///
/// `policy_list` is the union of inline policies and those attached managed
/// policies whose documents could be resolved against the snapshot's
/// `Policies` block. `members` starts empty and is populated exactly once by
/// group membership resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalDetail {
    pub principal_type: PrincipalType,
    pub name: String,
    pub arn: String,
    pub inline_policies: Vec<PrincipalPolicy>,
    pub attached_managed_policies: Vec<AttachedManagedPolicy>,
    pub policy_list: Vec<PrincipalPolicy>,
    /// Group names this user belongs to (User only).
    pub group_memberships: Vec<String>,
    /// Resolved member user names (Group only).
    pub members: Vec<String>,
    /// Trust policy (Role only).
    pub assume_role_policy_document: Option<PolicyDocument>,
}

impl PrincipalDetail {
    pub fn from_user(raw: RawUserDetail) -> Self {
        Self {
            principal_type: PrincipalType::User,
            name: raw.user_name,
            arn: raw.arn,
            policy_list: raw.user_policy_list.clone(),
            inline_policies: raw.user_policy_list,
            attached_managed_policies: raw.attached_managed_policies,
            group_memberships: raw.group_list,
            members: Vec::new(),
            assume_role_policy_document: None,
        }
    }

    pub fn from_group(raw: RawGroupDetail) -> Self {
        Self {
            principal_type: PrincipalType::Group,
            name: raw.group_name,
            arn: raw.arn,
            policy_list: raw.group_policy_list.clone(),
            inline_policies: raw.group_policy_list,
            attached_managed_policies: raw.attached_managed_policies,
            group_memberships: Vec::new(),
            members: Vec::new(),
            assume_role_policy_document: None,
        }
    }

    pub fn from_role(raw: RawRoleDetail) -> Self {
        Self {
            principal_type: PrincipalType::Role,
            name: raw.role_name,
            arn: raw.arn,
            policy_list: raw.role_policy_list.clone(),
            inline_policies: raw.role_policy_list,
            attached_managed_policies: raw.attached_managed_policies,
            group_memberships: Vec::new(),
            members: Vec::new(),
            assume_role_policy_document: None,
        }
    }

    /// Append attached managed policies with resolvable documents to
    /// `policy_list`. Attachments whose ARN is absent from the snapshot's
    /// `Policies` block are skipped.
    pub fn resolve_attached_documents(&mut self, policies: &PolicyDetails) {
        for attached in &self.attached_managed_policies {
            match policies.find_by_arn(&attached.policy_arn) {
                Some(policy) => self.policy_list.push(PrincipalPolicy {
                    policy_name: attached.policy_name.clone(),
                    policy_document: policy.policy_document.clone(),
                }),
                None => log::debug!(
                    "No document for attached policy {} on {} {}",
                    attached.policy_arn,
                    self.principal_type,
                    self.name
                ),
            }
        }
    }
}

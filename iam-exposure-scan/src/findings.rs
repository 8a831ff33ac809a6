//! Typed findings and the aggregator that accumulates them over a scan.

use serde::Serialize;

use crate::exclusions::Exclusions;
use crate::mapping::{PrincipalPolicyMapping, PrincipalPolicyMappingEntry};
use crate::policy_document::PolicyDocument;
use crate::principal_detail::AttachedManagedPolicy;

/// A standalone managed policy with unconstrained actions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyFinding {
    pub policy_name: String,
    pub arn: String,
    /// Deduplicated, lexicographically sorted, never empty.
    pub actions: Vec<String>,
    pub policy_document: PolicyDocument,
    /// Exclusions in effect when the finding was produced.
    #[serde(skip)]
    pub exclusions: Exclusions,
}

/// A user policy (inline or attached) with unconstrained actions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserFinding {
    pub policy_name: String,
    pub arn: String,
    pub actions: Vec<String>,
    pub policy_document: PolicyDocument,
    pub attached_managed_policies: Vec<AttachedManagedPolicy>,
    pub group_membership: Vec<String>,
    #[serde(skip)]
    pub exclusions: Exclusions,
}

/// A group policy (inline or attached) with unconstrained actions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupFinding {
    pub policy_name: String,
    pub arn: String,
    pub actions: Vec<String>,
    pub policy_document: PolicyDocument,
    pub attached_managed_policies: Vec<AttachedManagedPolicy>,
    pub members: Vec<String>,
    #[serde(skip)]
    pub exclusions: Exclusions,
}

/// A role policy (inline or attached) with unconstrained actions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoleFinding {
    pub policy_name: String,
    pub arn: String,
    pub actions: Vec<String>,
    pub policy_document: PolicyDocument,
    pub attached_managed_policies: Vec<AttachedManagedPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assume_role_policy_document: Option<PolicyDocument>,
    #[serde(skip)]
    pub exclusions: Exclusions,
}

/// The serializable result of one scan invocation.
///
/// Constructed fresh at the start of every scan; stale state from a prior
/// scan never leaks into a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Findings {
    pub policies: Vec<PolicyFinding>,
    pub users: Vec<UserFinding>,
    pub groups: Vec<GroupFinding>,
    pub roles: Vec<RoleFinding>,
    pub principal_policy_mapping: Vec<PrincipalPolicyMappingEntry>,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_policy_finding(&mut self, finding: PolicyFinding) {
        self.policies.push(finding);
    }

    pub fn add_user_finding(&mut self, finding: UserFinding) {
        self.users.push(finding);
    }

    pub fn add_group_finding(&mut self, finding: GroupFinding) {
        self.groups.push(finding);
    }

    pub fn add_role_finding(&mut self, finding: RoleFinding) {
        self.roles.push(finding);
    }

    /// Attach the full principal-policy mapping in canonical sorted order.
    pub fn set_principal_policy_mapping(&mut self, mapping: &PrincipalPolicyMapping) {
        self.principal_policy_mapping = mapping.sorted_entries();
    }

    pub fn total_findings(&self) -> usize {
        self.policies.len() + self.users.len() + self.groups.len() + self.roles.len()
    }
}

//! The authorization-details snapshot and its findings engine.
//!
//! [`AuthorizationDetails`] holds the parsed output shape of
//! `aws iam get-account-authorization-details`: all standalone managed
//! policies plus the user, group, and role detail lists. Construction
//! classifies managed policies in use, resolves attached-policy documents,
//! and resolves group membership; scanning happens afterwards against the
//! immutable snapshot.

use std::collections::HashSet;

use log::{debug, info};
use serde::Deserialize;

use crate::errors::ScanResult;
use crate::exclusions::Exclusions;
use crate::findings::{Findings, GroupFinding, PolicyFinding, RoleFinding, UserFinding};
use crate::mapping::{PolicyType, PrincipalPolicyMapping, PrincipalPolicyMappingEntry};
use crate::policy_detail::{ManagedBy, PolicyDetails, RawManagedPolicy};
use crate::principal_detail::{
    PrincipalDetail, PrincipalType, RawGroupDetail, RawRoleDetail, RawUserDetail,
};
use crate::statement_evaluator::StatementEvaluator;

/// The raw snapshot file shape. Absent lists are valid empty input.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawAuthorizationDetails {
    pub policies: Vec<RawManagedPolicy>,
    pub user_detail_list: Vec<RawUserDetail>,
    pub group_detail_list: Vec<RawGroupDetail>,
    pub role_detail_list: Vec<RawRoleDetail>,
}

/// An account authorization-details snapshot, ready to scan.
#[derive(Debug)]
pub struct AuthorizationDetails {
    policies: PolicyDetails,
    users: Vec<PrincipalDetail>,
    groups: Vec<PrincipalDetail>,
    roles: Vec<PrincipalDetail>,
    evaluator: StatementEvaluator,
    aws_managed_policies_in_use: Vec<String>,
    customer_managed_policies_in_use: Vec<String>,
}

impl AuthorizationDetails {
    /// Build a snapshot using the embedded action table.
    pub fn new(raw: RawAuthorizationDetails) -> ScanResult<Self> {
        Ok(Self::with_evaluator(raw, StatementEvaluator::load()?))
    }

    /// Parse and build a snapshot from JSON text.
    pub fn from_json_str(json: &str) -> ScanResult<Self> {
        let raw: RawAuthorizationDetails = serde_json::from_str(json)?;
        Self::new(raw)
    }

    pub fn with_evaluator(raw: RawAuthorizationDetails, evaluator: StatementEvaluator) -> Self {
        let policies = PolicyDetails::from_raw(raw.policies);
        let mut users: Vec<PrincipalDetail> = raw
            .user_detail_list
            .into_iter()
            .map(PrincipalDetail::from_user)
            .collect();
        let mut groups: Vec<PrincipalDetail> = raw
            .group_detail_list
            .into_iter()
            .map(PrincipalDetail::from_group)
            .collect();
        let mut roles: Vec<PrincipalDetail> = raw
            .role_detail_list
            .into_iter()
            .map(PrincipalDetail::from_role)
            .collect();

        for principal in users.iter_mut().chain(&mut groups).chain(&mut roles) {
            principal.resolve_attached_documents(&policies);
        }
        // Membership must be fully resolved before any scan reads `members`.
        resolve_group_members(&users, &mut groups);

        let aws_managed = managed_policies_in_use(&policies, [&users, &groups, &roles], ManagedBy::Aws);
        let customer_managed =
            managed_policies_in_use(&policies, [&users, &groups, &roles], ManagedBy::Customer);

        Self {
            policies,
            users,
            groups,
            roles,
            evaluator,
            aws_managed_policies_in_use: aws_managed,
            customer_managed_policies_in_use: customer_managed,
        }
    }

    /// Names of AWS-managed policies referenced anywhere in the snapshot,
    /// deduplicated in first-observed order.
    pub fn aws_managed_policies_in_use(&self) -> &[String] {
        &self.aws_managed_policies_in_use
    }

    /// Names of customer-managed policies referenced anywhere in the
    /// snapshot, deduplicated in first-observed order.
    pub fn customer_managed_policies_in_use(&self) -> &[String] {
        &self.customer_managed_policies_in_use
    }

    pub fn user_names(&self) -> Vec<&str> {
        self.users.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn role_names(&self) -> Vec<&str> {
        self.roles.iter().map(|p| p.name.as_str()).collect()
    }

    /// All principals: users, then groups, then roles.
    pub fn principals(&self) -> impl Iterator<Item = &PrincipalDetail> {
        self.users.iter().chain(&self.groups).chain(&self.roles)
    }

    /// Scan the snapshot for actions missing resource constraints.
    ///
    /// Produces a fresh findings snapshot on every call: user, group, and
    /// role findings, standalone-policy findings, and the full (unfiltered)
    /// principal-policy mapping. Filtering the mapping by exclusions is a
    /// separate step, [`PrincipalPolicyMapping::apply_exclusions`].
    pub fn missing_resource_constraints(
        &self,
        exclusions: &Exclusions,
        modify_only: bool,
    ) -> ScanResult<Findings> {
        exclusions.validate()?;
        let mut findings = Findings::new();
        info!("Scanning {} users", self.users.len());
        self.scan_principal_type(&self.users, &mut findings, exclusions, modify_only);
        info!("Scanning {} groups", self.groups.len());
        self.scan_principal_type(&self.groups, &mut findings, exclusions, modify_only);
        info!("Scanning {} roles", self.roles.len());
        self.scan_principal_type(&self.roles, &mut findings, exclusions, modify_only);
        findings.set_principal_policy_mapping(&self.principal_policy_mapping());
        info!("Scanning {} standalone policies", self.policies.len());
        self.scan_policy_details(&mut findings, exclusions, modify_only);
        Ok(findings)
    }

    fn scan_principal_type(
        &self,
        principals: &[PrincipalDetail],
        findings: &mut Findings,
        exclusions: &Exclusions,
        modify_only: bool,
    ) {
        for principal in principals {
            debug!("Scanning {}: {}", principal.principal_type, principal.name);
            for policy in &principal.policy_list {
                // A globally excluded policy short-circuits before the
                // principal exclusion is consulted.
                if exclusions.is_policy_excluded(&policy.policy_name) {
                    debug!("Excluded policy name: {}", policy.policy_name);
                    continue;
                }
                if exclusions.is_principal_excluded(&principal.name, principal.principal_type) {
                    debug!("Excluded principal name: {}", principal.name);
                    continue;
                }
                let mut actions = Vec::new();
                for statement in policy.policy_document.statements() {
                    if !statement.is_allow() {
                        continue;
                    }
                    if modify_only {
                        actions.extend(
                            self.evaluator
                                .missing_resource_constraints_for_modify_actions(
                                    statement, exclusions,
                                ),
                        );
                    } else {
                        actions.extend(
                            self.evaluator
                                .missing_resource_constraints(statement, exclusions),
                        );
                    }
                }
                let mut actions = deduplicate_preserving_order(actions);
                actions.sort();
                if actions.is_empty() {
                    continue;
                }
                match principal.principal_type {
                    PrincipalType::User => findings.add_user_finding(UserFinding {
                        policy_name: policy.policy_name.clone(),
                        arn: principal.arn.clone(),
                        actions,
                        policy_document: policy.policy_document.clone(),
                        attached_managed_policies: principal.attached_managed_policies.clone(),
                        group_membership: principal.group_memberships.clone(),
                        exclusions: exclusions.clone(),
                    }),
                    PrincipalType::Group => findings.add_group_finding(GroupFinding {
                        policy_name: policy.policy_name.clone(),
                        arn: principal.arn.clone(),
                        actions,
                        policy_document: policy.policy_document.clone(),
                        attached_managed_policies: principal.attached_managed_policies.clone(),
                        members: principal.members.clone(),
                        exclusions: exclusions.clone(),
                    }),
                    PrincipalType::Role => findings.add_role_finding(RoleFinding {
                        policy_name: policy.policy_name.clone(),
                        arn: principal.arn.clone(),
                        actions,
                        policy_document: policy.policy_document.clone(),
                        attached_managed_policies: principal.attached_managed_policies.clone(),
                        assume_role_policy_document: principal
                            .assume_role_policy_document
                            .clone(),
                        exclusions: exclusions.clone(),
                    }),
                }
            }
        }
    }

    fn scan_policy_details(
        &self,
        findings: &mut Findings,
        exclusions: &Exclusions,
        modify_only: bool,
    ) {
        for policy in self.policies.iter() {
            debug!("Scanning policy: {}", policy.policy_name);
            if exclusions.is_policy_excluded(&policy.policy_name)
                || exclusions.is_policy_excluded(&policy.full_policy_path())
            {
                debug!("Excluded policy name: {}", policy.policy_name);
                continue;
            }
            let mut actions = Vec::new();
            for statement in policy.policy_document.statements() {
                if !statement.is_allow() {
                    continue;
                }
                if modify_only {
                    actions.extend(
                        self.evaluator
                            .missing_resource_constraints_for_modify_actions(statement, exclusions),
                    );
                } else {
                    actions.extend(
                        self.evaluator
                            .missing_resource_constraints(statement, exclusions),
                    );
                }
            }
            let mut actions = deduplicate_preserving_order(actions);
            actions.sort();
            if actions.is_empty() {
                continue;
            }
            findings.add_policy_finding(PolicyFinding {
                policy_name: policy.policy_name.clone(),
                arn: policy.arn.clone(),
                actions,
                policy_document: policy.policy_document.clone(),
                exclusions: exclusions.clone(),
            });
        }
    }

    /// Build the complete principal-policy attachment mapping.
    ///
    /// Users additionally get one entry per policy of each group they belong
    /// to; those inherited entries carry the user's entire group-membership
    /// list as their comment, not the specific group that granted the policy.
    pub fn principal_policy_mapping(&self) -> PrincipalPolicyMapping {
        let mut mapping = PrincipalPolicyMapping::new();
        for principal in self.principals() {
            for inline_policy in &principal.inline_policies {
                mapping.add(PrincipalPolicyMappingEntry {
                    principal_name: principal.name.clone(),
                    principal_type: principal.principal_type,
                    policy_type: PolicyType::Inline,
                    managed_by: ManagedBy::Customer,
                    policy_name: inline_policy.policy_name.clone(),
                    comment: None,
                });
            }
            for attached in &principal.attached_managed_policies {
                mapping.add(PrincipalPolicyMappingEntry {
                    principal_name: principal.name.clone(),
                    principal_type: principal.principal_type,
                    policy_type: PolicyType::Managed,
                    managed_by: ManagedBy::from_arn(&attached.policy_arn),
                    policy_name: attached.policy_name.clone(),
                    comment: None,
                });
            }
            if principal.principal_type != PrincipalType::User {
                continue;
            }
            for group_name in &principal.group_memberships {
                let Some(group) = self.groups.iter().find(|g| g.name == *group_name) else {
                    continue;
                };
                for inline_policy in &group.inline_policies {
                    mapping.add(PrincipalPolicyMappingEntry {
                        principal_name: principal.name.clone(),
                        principal_type: principal.principal_type,
                        policy_type: PolicyType::Inline,
                        managed_by: ManagedBy::Customer,
                        policy_name: inline_policy.policy_name.clone(),
                        comment: Some(principal.group_memberships.clone()),
                    });
                }
                for attached in &group.attached_managed_policies {
                    mapping.add(PrincipalPolicyMappingEntry {
                        principal_name: principal.name.clone(),
                        principal_type: principal.principal_type,
                        policy_type: PolicyType::Managed,
                        managed_by: ManagedBy::from_arn(&attached.policy_arn),
                        policy_name: attached.policy_name.clone(),
                        comment: Some(principal.group_memberships.clone()),
                    });
                }
            }
        }
        mapping
    }
}

/// Collect managed-policy names with the given scope: standalone policies
/// first, then attachments of every user, group, and role, deduplicated
/// preserving first occurrence. Classification is per-ARN.
fn managed_policies_in_use(
    policies: &PolicyDetails,
    principal_lists: [&Vec<PrincipalDetail>; 3],
    managed_by: ManagedBy,
) -> Vec<String> {
    let mut names = Vec::new();
    for policy in policies.iter() {
        if policy.managed_by() == managed_by {
            names.push(policy.policy_name.clone());
        }
    }
    for principals in principal_lists {
        for principal in principals {
            for attached in &principal.attached_managed_policies {
                if ManagedBy::from_arn(&attached.policy_arn) == managed_by {
                    names.push(attached.policy_name.clone());
                }
            }
        }
    }
    deduplicate_preserving_order(names)
}

/// Populate each group's `members` from the users that declare membership in
/// it. Group names match case-insensitively; member names keep their
/// original casing and accumulate in first-seen order. A membership
/// referencing a non-existent group is silently ignored.
fn resolve_group_members(users: &[PrincipalDetail], groups: &mut [PrincipalDetail]) {
    let mut memberships: Vec<(String, Vec<String>)> = Vec::new();
    for user in users.iter().filter(|p| p.principal_type == PrincipalType::User) {
        for group_name in &user.group_memberships {
            match memberships.iter_mut().find(|(name, _)| name == group_name) {
                Some((_, members)) => members.push(user.name.clone()),
                None => memberships.push((group_name.clone(), vec![user.name.clone()])),
            }
        }
    }
    for group in groups
        .iter_mut()
        .filter(|p| p.principal_type == PrincipalType::Group)
    {
        for (name, members) in &memberships {
            if name.eq_ignore_ascii_case(&group.name) {
                debug!("Group {} has members: {:?}", group.name, members);
                group.members.extend(members.iter().cloned());
            }
        }
    }
}

/// Deduplicate preserving first occurrence.
fn deduplicate_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut deduped = Vec::new();
    for item in items {
        if seen.insert(item.clone()) {
            deduped.push(item);
        }
    }
    deduped
}

//! Scan IAM account-authorization-details snapshots for policies that grant
//! actions without resource constraints.
//!
//! The entry point is [`AuthorizationDetails`]: parse a snapshot (the JSON
//! output of `aws iam get-account-authorization-details`), then call
//! [`AuthorizationDetails::missing_resource_constraints`] to produce a
//! [`Findings`] snapshot of standalone-policy, user, group, and role
//! findings plus the principal-policy mapping. The mapping can be narrowed
//! afterwards with [`PrincipalPolicyMapping::apply_exclusions`].
//!
//! ```
//! use iam_exposure_scan::{AuthorizationDetails, Exclusions};
//!
//! # fn main() -> iam_exposure_scan::ScanResult<()> {
//! let json = r#"{"Policies": [], "UserDetailList": [], "GroupDetailList": [], "RoleDetailList": []}"#;
//! let details = AuthorizationDetails::from_json_str(json)?;
//! let findings = details.missing_resource_constraints(&Exclusions::defaults()?, true)?;
//! println!("{} findings", findings.total_findings());
//! # Ok(())
//! # }
//! ```

pub mod action_table;
pub mod authorization_details;
pub mod errors;
pub mod exclusions;
pub mod findings;
pub mod mapping;
pub mod policy_detail;
pub mod policy_document;
pub mod principal_detail;
pub mod statement_evaluator;

pub use authorization_details::{AuthorizationDetails, RawAuthorizationDetails};
pub use errors::{ScanError, ScanResult};
pub use exclusions::{Exclusions, ExclusionsConfig};
pub use findings::Findings;
pub use mapping::{PrincipalPolicyMapping, PrincipalPolicyMappingEntry};
pub use policy_detail::ManagedBy;
pub use principal_detail::PrincipalType;
pub use statement_evaluator::StatementEvaluator;

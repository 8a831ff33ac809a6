//! Statement evaluation: which actions in a statement lack a resource
//! constraint.
//!
//! A statement is only ever at fault when it applies to all resources
//! (`"Resource": "*"`). Its action patterns are expanded against the embedded
//! action table; actions that cannot take a resource ARN at all are not
//! reported, and the modify-only mode keeps only Write, Tagging, and
//! Permissions management access levels. Evaluation is pure: it never
//! mutates the statement or the exclusions.

use crate::action_table::ActionTable;
use crate::errors::ScanResult;
use crate::exclusions::Exclusions;
use crate::policy_document::Statement;

#[derive(Debug)]
pub struct StatementEvaluator {
    table: ActionTable,
}

impl StatementEvaluator {
    pub fn new(table: ActionTable) -> Self {
        Self { table }
    }

    /// Build an evaluator over the embedded action table.
    pub fn load() -> ScanResult<Self> {
        Ok(Self::new(ActionTable::load()?))
    }

    /// All actions in the statement missing a resource constraint.
    pub fn missing_resource_constraints(
        &self,
        statement: &Statement,
        exclusions: &Exclusions,
    ) -> Vec<String> {
        self.evaluate(statement, exclusions, false)
    }

    /// Modify-class actions in the statement missing a resource constraint.
    pub fn missing_resource_constraints_for_modify_actions(
        &self,
        statement: &Statement,
        exclusions: &Exclusions,
    ) -> Vec<String> {
        self.evaluate(statement, exclusions, true)
    }

    fn evaluate(
        &self,
        statement: &Statement,
        exclusions: &Exclusions,
        modify_only: bool,
    ) -> Vec<String> {
        if !statement.is_allow() || !statement.applies_to_all_resources() {
            return Vec::new();
        }
        let mut flagged = Vec::new();
        for pattern in statement.actions() {
            for action in self.table.expand(pattern) {
                let Some((service, name)) = action.split_once(':') else {
                    continue;
                };
                if !self.table.supports_resource_constraints(service, name) {
                    continue;
                }
                if modify_only
                    && !self
                        .table
                        .access_level(service, name)
                        .is_some_and(|level| level.is_modify())
                {
                    continue;
                }
                if exclusions.is_action_excluded(&action) {
                    log::debug!("Excluded action: {action}");
                    continue;
                }
                flagged.push(action);
            }
        }
        flagged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exclusions::{Exclusions, ExclusionsConfig};
    use crate::policy_document::PolicyDocument;

    fn evaluator() -> StatementEvaluator {
        StatementEvaluator::load().expect("embedded table should load")
    }

    fn statement(json: serde_json::Value) -> Statement {
        let document = PolicyDocument::from_value(&serde_json::json!({"Statement": [json]}))
            .expect("fixture should parse");
        document.statements()[0].clone()
    }

    #[test]
    fn test_constrained_statement_has_no_findings() {
        let stmt = statement(serde_json::json!({
            "Effect": "Allow",
            "Action": "s3:DeleteBucket",
            "Resource": "arn:aws:s3:::my-bucket"
        }));
        assert!(evaluator()
            .missing_resource_constraints(&stmt, &Exclusions::default())
            .is_empty());
    }

    #[test]
    fn test_wildcard_resource_flags_known_action() {
        let stmt = statement(serde_json::json!({
            "Effect": "Allow",
            "Action": "s3:DeleteBucket",
            "Resource": "*"
        }));
        assert_eq!(
            evaluator().missing_resource_constraints_for_modify_actions(
                &stmt,
                &Exclusions::default()
            ),
            ["s3:DeleteBucket"]
        );
    }

    #[test]
    fn test_modify_only_drops_read_actions() {
        let stmt = statement(serde_json::json!({
            "Effect": "Allow",
            "Action": ["s3:GetObject", "s3:DeleteBucket"],
            "Resource": "*"
        }));
        let eval = evaluator();
        assert_eq!(
            eval.missing_resource_constraints_for_modify_actions(&stmt, &Exclusions::default()),
            ["s3:DeleteBucket"]
        );
        let all = eval.missing_resource_constraints(&stmt, &Exclusions::default());
        assert!(all.contains(&"s3:GetObject".to_string()));
        assert!(all.contains(&"s3:DeleteBucket".to_string()));
    }

    #[test]
    fn test_deny_statement_is_ignored() {
        let stmt = statement(serde_json::json!({
            "Effect": "Deny",
            "Action": "s3:DeleteBucket",
            "Resource": "*"
        }));
        assert!(evaluator()
            .missing_resource_constraints(&stmt, &Exclusions::default())
            .is_empty());
    }

    #[test]
    fn test_wildcard_only_actions_are_not_flagged() {
        let stmt = statement(serde_json::json!({
            "Effect": "Allow",
            "Action": "s3:ListAllMyBuckets",
            "Resource": "*"
        }));
        assert!(evaluator()
            .missing_resource_constraints(&stmt, &Exclusions::default())
            .is_empty());
    }

    #[test]
    fn test_service_wildcard_expands_to_modify_actions() {
        let stmt = statement(serde_json::json!({
            "Effect": "Allow",
            "Action": "kms:*",
            "Resource": "*"
        }));
        let flagged =
            evaluator().missing_resource_constraints_for_modify_actions(&stmt, &Exclusions::default());
        assert!(flagged.contains(&"kms:ScheduleKeyDeletion".to_string()));
        assert!(flagged.contains(&"kms:PutKeyPolicy".to_string()));
        // CreateKey only ever applies to "*", so it is not missing anything.
        assert!(!flagged.contains(&"kms:CreateKey".to_string()));
        assert!(!flagged.contains(&"kms:DescribeKey".to_string()));
    }

    #[test]
    fn test_excluded_actions_are_dropped() {
        let stmt = statement(serde_json::json!({
            "Effect": "Allow",
            "Action": ["s3:DeleteBucket", "s3:PutObject"],
            "Resource": "*"
        }));
        let exclusions = Exclusions::new(ExclusionsConfig {
            exclude_actions: vec!["s3:PutObject".to_string()],
            ..ExclusionsConfig::default()
        });
        assert_eq!(
            evaluator().missing_resource_constraints_for_modify_actions(&stmt, &exclusions),
            ["s3:DeleteBucket"]
        );
    }

    #[test]
    fn test_unknown_actions_expand_to_nothing() {
        let stmt = statement(serde_json::json!({
            "Effect": "Allow",
            "Action": "madeupservice:DoThing",
            "Resource": "*"
        }));
        assert!(evaluator()
            .missing_resource_constraints(&stmt, &Exclusions::default())
            .is_empty());
    }
}

//! IAM policy document model.
//!
//! Deserializes the policy-document shapes found in account authorization
//! details: `Statement` may be a single object or an array, and `Action` /
//! `Resource` may be a single string or an array of strings. Statements
//! preserve source order; parsing never mutates its input.

use serde::{Deserialize, Serialize};

use crate::errors::ScanResult;

/// A JSON value that is either a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    Single(String),
    Multiple(Vec<String>),
}

impl OneOrMany {
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::Single(value) => std::slice::from_ref(value),
            Self::Multiple(values) => values,
        }
    }
}

/// A single policy statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<serde_json::Value>,
}

impl Statement {
    pub fn is_allow(&self) -> bool {
        self.effect == "Allow"
    }

    /// Action patterns in source order; an absent `Action` block is empty.
    pub fn actions(&self) -> &[String] {
        self.action.as_ref().map_or(&[], OneOrMany::as_slice)
    }

    /// Resource entries in source order; an absent `Resource` block is empty.
    pub fn resources(&self) -> &[String] {
        self.resource.as_ref().map_or(&[], OneOrMany::as_slice)
    }

    /// Whether this statement applies to all resources (`"Resource": "*"`).
    pub fn applies_to_all_resources(&self) -> bool {
        self.resources().iter().any(|resource| resource == "*")
    }
}

/// An ordered sequence of statements with the standard policy envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(deserialize_with = "one_or_many_statements")]
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    pub fn statements(&self) -> &[Statement] {
        &self.statement
    }

    /// Parse a policy document from a raw JSON value.
    pub fn from_value(value: &serde_json::Value) -> ScanResult<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Parse a policy document from JSON text.
    pub fn from_json_str(json: &str) -> ScanResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn one_or_many_statements<'de, D>(deserializer: D) -> Result<Vec<Statement>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StatementBlock {
        Single(Statement),
        Multiple(Vec<Statement>),
    }

    Ok(match StatementBlock::deserialize(deserializer)? {
        StatementBlock::Single(statement) => vec![statement],
        StatementBlock::Multiple(statements) => statements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_statement_document() {
        let document = PolicyDocument::from_json_str(
            r#"{
                "Version": "2012-10-17",
                "Statement": {
                    "Effect": "Allow",
                    "Action": "s3:GetObject",
                    "Resource": "*"
                }
            }"#,
        )
        .expect("should parse");
        assert_eq!(document.statements().len(), 1);
        assert_eq!(document.statements()[0].actions(), ["s3:GetObject"]);
        assert!(document.statements()[0].applies_to_all_resources());
    }

    #[test]
    fn test_parse_statement_array_preserves_order() {
        let document = PolicyDocument::from_json_str(
            r#"{
                "Version": "2012-10-17",
                "Statement": [
                    {"Sid": "First", "Effect": "Allow", "Action": ["s3:PutObject", "s3:DeleteObject"], "Resource": ["arn:aws:s3:::bucket/*"]},
                    {"Sid": "Second", "Effect": "Deny", "Action": "iam:*", "Resource": "*"}
                ]
            }"#,
        )
        .expect("should parse");
        assert_eq!(document.statements().len(), 2);
        assert_eq!(document.statements()[0].sid.as_deref(), Some("First"));
        assert_eq!(
            document.statements()[0].actions(),
            ["s3:PutObject", "s3:DeleteObject"]
        );
        assert!(!document.statements()[0].applies_to_all_resources());
        assert!(!document.statements()[1].is_allow());
    }

    #[test]
    fn test_statement_without_action_block_is_empty() {
        let document = PolicyDocument::from_json_str(
            r#"{"Statement": [{"Effect": "Allow", "Resource": "*"}]}"#,
        )
        .expect("should parse");
        assert!(document.statements()[0].actions().is_empty());
    }

    #[test]
    fn test_serializes_statements_as_array() {
        let document = PolicyDocument::from_json_str(
            r#"{"Statement": {"Effect": "Allow", "Action": "s3:GetObject", "Resource": "*"}}"#,
        )
        .expect("should parse");
        let json = serde_json::to_value(&document).expect("should serialize");
        assert!(json["Statement"].is_array());
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let result = PolicyDocument::from_json_str(r#"{"Statement": 42}"#);
        assert!(result.is_err());
    }
}

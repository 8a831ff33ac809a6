use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;

const SNAPSHOT: &str = r#"{
    "Policies": [
        {
            "PolicyName": "InsecurePolicy",
            "Arn": "arn:aws:iam::012345678901:policy/InsecurePolicy",
            "DefaultVersionId": "v1",
            "PolicyVersionList": [
                {
                    "Document": {"Statement": [{"Effect": "Allow", "Action": "s3:DeleteBucket", "Resource": "*"}]},
                    "VersionId": "v1",
                    "IsDefaultVersion": true
                }
            ]
        }
    ],
    "UserDetailList": [
        {
            "UserName": "alice",
            "Arn": "arn:aws:iam::012345678901:user/alice",
            "GroupList": ["admins"]
        }
    ],
    "GroupDetailList": [
        {
            "GroupName": "admins",
            "Arn": "arn:aws:iam::012345678901:group/admins",
            "AttachedManagedPolicies": [
                {"PolicyName": "InsecurePolicy", "PolicyArn": "arn:aws:iam::012345678901:policy/InsecurePolicy"}
            ]
        }
    ],
    "RoleDetailList": []
}"#;

#[test]
fn help_lists_subcommands() {
    Command::new(env!("CARGO_BIN_EXE_iam-exposure"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("filter-mapping"));
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_iam-exposure"))
        .output()
        .expect("failed to run without arguments");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn scan_writes_findings_json() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let input = dir.path().join("details.json");
    let out = dir.path().join("findings.json");
    fs::write(&input, SNAPSHOT).expect("failed to write snapshot");

    let output = Command::new(env!("CARGO_BIN_EXE_iam-exposure"))
        .args([
            "scan",
            "--input",
            input.to_str().expect("utf-8 path"),
            "--output",
            out.to_str().expect("utf-8 path"),
        ])
        .output()
        .expect("failed to run scan");
    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr was: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let findings: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).expect("failed to read output"))
            .expect("output should be JSON");
    assert_eq!(findings["groups"][0]["PolicyName"], "InsecurePolicy");
    assert_eq!(findings["groups"][0]["Actions"][0], "s3:DeleteBucket");
    // alice has no policies of her own.
    assert!(findings["users"].as_array().is_some_and(Vec::is_empty));
    // Her inherited attachment appears in the mapping with the group comment.
    let mapping = findings["principal_policy_mapping"]
        .as_array()
        .expect("mapping should be an array");
    assert!(mapping
        .iter()
        .any(|e| e["Principal"] == "alice" && e["Comment"][0] == "admins"));
}

#[test]
fn scan_rejects_missing_input_file() {
    let output = Command::new(env!("CARGO_BIN_EXE_iam-exposure"))
        .args(["scan", "--input", "/nonexistent/details.json"])
        .output()
        .expect("failed to run scan");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read"));
}

#[test]
fn scan_rejects_blank_exclusion_entries() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let input = dir.path().join("details.json");
    let exclusions = dir.path().join("exclusions.yml");
    fs::write(&input, SNAPSHOT).expect("failed to write snapshot");
    fs::write(&exclusions, "users:\n  - \"  \"\n").expect("failed to write exclusions");

    let output = Command::new(env!("CARGO_BIN_EXE_iam-exposure"))
        .args([
            "scan",
            "--input",
            input.to_str().expect("utf-8 path"),
            "--exclusions",
            exclusions.to_str().expect("utf-8 path"),
        ])
        .output()
        .expect("failed to run scan");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid exclusions"));
}

#[test]
fn filter_mapping_applies_exclusions_to_scan_output() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let input = dir.path().join("details.json");
    let findings = dir.path().join("findings.json");
    let exclusions = dir.path().join("exclusions.yml");
    let filtered = dir.path().join("filtered.json");
    fs::write(&input, SNAPSHOT).expect("failed to write snapshot");
    fs::write(&exclusions, "groups:\n  - admins\n").expect("failed to write exclusions");

    Command::new(env!("CARGO_BIN_EXE_iam-exposure"))
        .args([
            "scan",
            "--input",
            input.to_str().expect("utf-8 path"),
            "--output",
            findings.to_str().expect("utf-8 path"),
        ])
        .assert()
        .success();

    // Without exclusions, alice's inherited entry and the group survive.
    Command::new(env!("CARGO_BIN_EXE_iam-exposure"))
        .args([
            "filter-mapping",
            "--findings",
            findings.to_str().expect("utf-8 path"),
            "--output",
            filtered.to_str().expect("utf-8 path"),
        ])
        .assert()
        .success();
    let entries: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&filtered).expect("failed to read output"))
            .expect("output should be JSON");
    assert_eq!(entries.as_array().map(Vec::len), Some(2));

    // Excluding the group cascades to the inherited user entry.
    Command::new(env!("CARGO_BIN_EXE_iam-exposure"))
        .args([
            "filter-mapping",
            "--findings",
            findings.to_str().expect("utf-8 path"),
            "--exclusions",
            exclusions.to_str().expect("utf-8 path"),
            "--output",
            filtered.to_str().expect("utf-8 path"),
        ])
        .assert()
        .success();
    let entries: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&filtered).expect("failed to read output"))
            .expect("output should be JSON");
    assert!(entries.as_array().is_some_and(Vec::is_empty));
}

#[test]
fn filter_mapping_rejects_files_without_a_mapping() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let findings = dir.path().join("findings.json");
    fs::write(&findings, "{}").expect("failed to write findings");

    let output = Command::new(env!("CARGO_BIN_EXE_iam-exposure"))
        .args([
            "filter-mapping",
            "--findings",
            findings.to_str().expect("utf-8 path"),
        ])
        .output()
        .expect("failed to run filter-mapping");
    assert_eq!(output.status.code(), Some(1));
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("principal_policy_mapping"),
        "stderr was: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

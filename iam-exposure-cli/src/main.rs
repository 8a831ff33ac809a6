use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use iam_exposure_scan::{
    AuthorizationDetails, Exclusions, ExclusionsConfig, PrincipalPolicyMapping,
};

#[derive(Parser, Debug)]
#[command(
    name = "iam-exposure",
    version,
    about = "Scan IAM account authorization details for actions missing resource constraints"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan an account-authorization-details snapshot and write findings JSON
    Scan {
        /// Path to the get-account-authorization-details JSON output
        #[arg(short, long)]
        input: PathBuf,
        /// Exclusions file (YAML or JSON); built-in defaults when omitted
        #[arg(short, long)]
        exclusions: Option<PathBuf>,
        /// Report all access levels, not just modify-class actions
        #[arg(long)]
        all_actions: bool,
        /// Write findings to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pretty-print the findings JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Re-filter the principal-policy mapping of an existing findings snapshot
    FilterMapping {
        /// Path to a findings JSON file produced by `scan`
        #[arg(short, long)]
        findings: PathBuf,
        /// Exclusions file (YAML or JSON); built-in defaults when omitted
        #[arg(short, long)]
        exclusions: Option<PathBuf>,
        /// Write the filtered mapping to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Scan {
            input,
            exclusions,
            all_actions,
            output,
            pretty,
        } => scan(&input, exclusions.as_deref(), all_actions, output.as_deref(), pretty),
        Commands::FilterMapping {
            findings,
            exclusions,
            output,
        } => filter_mapping(&findings, exclusions.as_deref(), output.as_deref()),
    }
}

fn scan(
    input: &Path,
    exclusions: Option<&Path>,
    all_actions: bool,
    output: Option<&Path>,
    pretty: bool,
) -> anyhow::Result<()> {
    let json = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let details = AuthorizationDetails::from_json_str(&json)
        .with_context(|| format!("failed to parse {}", input.display()))?;
    let exclusions = load_exclusions(exclusions)?;
    let findings = details
        .missing_resource_constraints(&exclusions, !all_actions)
        .context("scan failed")?;
    log::info!("{} findings", findings.total_findings());
    let rendered = if pretty {
        serde_json::to_string_pretty(&findings)?
    } else {
        serde_json::to_string(&findings)?
    };
    write_output(output, &rendered)
}

fn filter_mapping(
    findings: &Path,
    exclusions: Option<&Path>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let json = fs::read_to_string(findings)
        .with_context(|| format!("failed to read {}", findings.display()))?;
    let snapshot: serde_json::Value = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse {}", findings.display()))?;
    let records = snapshot["principal_policy_mapping"]
        .as_array()
        .context("findings file has no principal_policy_mapping array")?;

    let mut mapping = PrincipalPolicyMapping::new();
    for record in records {
        mapping
            .add_value(record.clone())
            .context("malformed principal-policy mapping record")?;
    }

    let exclusions = load_exclusions(exclusions)?;
    let filtered = mapping
        .apply_exclusions(&exclusions)
        .context("mapping filter failed")?;
    log::info!(
        "{} of {} mapping entries survive the exclusion filter",
        filtered.len(),
        mapping.len()
    );
    let rendered = serde_json::to_string_pretty(&filtered.sorted_entries())?;
    write_output(output, &rendered)
}

/// Load exclusions from a YAML or JSON file, or fall back to the embedded
/// defaults. YAML parsing accepts JSON input as-is.
fn load_exclusions(path: Option<&Path>) -> anyhow::Result<Exclusions> {
    let exclusions = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let config = ExclusionsConfig::from_yaml_str(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            Exclusions::new(config)
        }
        None => Exclusions::defaults().context("failed to load default exclusions")?,
    };
    exclusions.validate().context("invalid exclusions")?;
    Ok(exclusions)
}

fn write_output(output: Option<&Path>, rendered: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

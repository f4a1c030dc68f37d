//! CLI entry point for subont-extract.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use subont_core::{parse_code_list, ExtractConfig};
use subont_extract::{run_extraction, ExtractRequest};

#[derive(Parser)]
#[command(name = "subont-extract")]
#[command(about = "Extract a SNOMED CT sub-terminology: all descendants of the given concepts and their terms")]
struct Cli {
    /// RF2 relationship file (sct2_Relationship_*).
    #[arg(short = 'r', long)]
    rel_file: String,

    /// RF2 concept or description file with conceptId and term columns.
    #[arg(short = 'c', long)]
    concept_file: String,

    /// Output term file.
    #[arg(short, long)]
    output: String,

    /// Comma-separated seed concept codes.
    #[arg(short = 'l', long)]
    codes: String,

    /// Root concept of the ontology (overrides config).
    #[arg(long)]
    root_code: Option<String>,

    /// Relationship types to follow: is-a, 116680003 or all (overrides config).
    #[arg(long)]
    rel_types: Option<String>,

    /// Skip rows whose active flag is 0.
    #[arg(long)]
    active_only: bool,

    /// Abort after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,

    /// Config file prefix (default: subont).
    #[arg(short = 'C', long, default_value = "subont")]
    config: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config = apply_overrides(
        ExtractConfig::load(&cli.config).context("Failed to load configuration")?,
        &cli,
    );
    let seeds = parse_code_list(&cli.codes).context("Invalid --codes")?;

    let request = ExtractRequest::from_config(
        &config,
        &cli.rel_file,
        &cli.concept_file,
        &cli.output,
        seeds,
    )?;

    let summary = run_extraction(&request)
        .with_context(|| format!("Extraction into {} failed", cli.output))?;

    tracing::info!(
        nodes = summary.build.nodes,
        descendants = summary.descendants,
        terms = summary.terms.rows_written,
        output_blake3 = %summary.output.blake3,
        "Extraction complete"
    );
    println!("{}", serde_json::to_string(&summary)?);

    Ok(())
}

/// Command-line flags take precedence over file and environment settings.
fn apply_overrides(mut config: ExtractConfig, cli: &Cli) -> ExtractConfig {
    if let Some(root) = &cli.root_code {
        config.root_code = root.clone();
    }
    if let Some(types) = &cli.rel_types {
        config.relation_types = types.clone();
    }
    if cli.active_only {
        config.active_only = true;
    }
    if cli.timeout_secs.is_some() {
        config.timeout_secs = cli.timeout_secs;
    }
    config
}

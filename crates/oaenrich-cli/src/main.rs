use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use oaenrich_core::{EnrichConfig, PendingDigest, Workbook};
use oaenrich_science::{EnrichmentEngine, EnrichmentSummary};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "oaenrich",
    about = "Fill open-access links, DOIs and author emails in a publications workbook",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default: $OAENRICH_CONFIG or ~/.config/oaenrich/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Workbook to enrich in place.
    #[arg(long, global = true)]
    workbook: Option<PathBuf>,

    /// Sheet to process; repeat for several. Replaces the configured list.
    #[arg(long = "sheet", global = true, action = clap::ArgAction::Append)]
    sheets: Vec<String>,

    /// Look up the open-access record even when the link is already filled.
    #[arg(long, global = true)]
    overwrite_open_access_link: bool,

    /// Never write the DOI column.
    #[arg(long, global = true)]
    no_doi: bool,

    /// Where to write the pending-papers report.
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    /// Skip the pending-papers report.
    #[arg(long, global = true)]
    no_report: bool,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Enrich the workbook (default).
    Run,
    /// Print the effective configuration as TOML.
    Config,
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EnrichConfig::load_from(path)?,
        None => EnrichConfig::load()?,
    };
    apply_overrides(&cli, &mut config);
    config.validate()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
        Commands::Run => {
            init_logging(&config.logging.level);
            run(&config)?;
        }
    }

    Ok(())
}

fn apply_overrides(cli: &Cli, config: &mut EnrichConfig) {
    if let Some(path) = &cli.workbook {
        config.workbook.path = path.clone();
    }
    if !cli.sheets.is_empty() {
        config.workbook.sheets = cli.sheets.clone();
    }
    if cli.overwrite_open_access_link {
        config.enrichment.overwrite_open_access_link = true;
    }
    if cli.no_doi {
        config.enrichment.populate_doi = false;
    }
    if let Some(path) = &cli.report {
        config.report.path = path.clone();
    }
    if cli.no_report {
        config.report.enabled = false;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,oaenrich={level},oaenrich_core={level},oaenrich_science={level}"
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(config: &EnrichConfig) -> Result<()> {
    let start = Instant::now();
    let path = &config.workbook.path;
    if !path.exists() {
        bail!("XLSX file not found: {}", path.display());
    }

    let mut workbook = Workbook::open(path)?;
    let engine = EnrichmentEngine::from_config(config)?;
    let summary = engine.run_blocking(&mut workbook, &config.workbook.sheets)?;

    if config.report.enabled {
        let digest = PendingDigest::collect(&workbook, &config.workbook.sheets);
        if let Err(err) = digest.write_to(&config.report.path) {
            warn!("cannot write report {}: {err}", config.report.path.display());
        }
    }

    info!(elapsed_ms = start.elapsed().as_millis() as u64, "run finished");
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &EnrichmentSummary) {
    println!(
        "Sheets: {} processed, {} skipped",
        summary.sheets_processed, summary.sheets_skipped
    );
    println!(
        "Rows:   {} processed, {} skipped",
        summary.rows_processed, summary.rows_skipped
    );
    println!(
        "Filled: {} open-access links, {} DOIs, {} link texts, {} author emails",
        summary.links_found, summary.dois_written, summary.link_texts_written, summary.emails_found
    );
    if summary.failed_saves > 0 {
        println!("Failed saves: {}", summary.failed_saves);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "oaenrich",
            "--workbook",
            "pubs.xlsx",
            "--sheet",
            "YEAR 2021",
            "--sheet",
            "YEAR 2020",
            "--overwrite-open-access-link",
            "--no-doi",
            "--no-report",
            "--log-level",
            "debug",
        ]);
        let mut config = EnrichConfig::default();
        apply_overrides(&cli, &mut config);

        assert_eq!(config.workbook.path, PathBuf::from("pubs.xlsx"));
        assert_eq!(config.workbook.sheets, vec!["YEAR 2021", "YEAR 2020"]);
        assert!(config.enrichment.overwrite_open_access_link);
        assert!(!config.enrichment.populate_doi);
        assert!(!config.report.enabled);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn no_flags_keep_config() {
        let cli = Cli::parse_from(["oaenrich", "config"]);
        let mut config = EnrichConfig::default();
        apply_overrides(&cli, &mut config);

        assert!(matches!(cli.command, Some(Commands::Config)));
        assert_eq!(config.workbook.sheets.len(), 3);
        assert!(config.enrichment.populate_doi);
        assert!(config.report.enabled);
    }
}

//! jpxfin CLI: JPX-listed company metrics and financial statements as CSV.
//!
//! Commands:
//! - (none): load the roster, fetch every ticker from Yahoo Finance, write
//!   the metrics and statement reports
//! - `roster`: load and filter the roster and print it, without network access

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jpxfin_core::data::{FundamentalsProvider, Roster, RosterError, YahooProvider};
use jpxfin_runner::{execute, LogProgress, PipelineConfig, PipelineError, PipelineOptions, RunReport};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Where the listed-issues spreadsheet is published.
const JPX_LISTING_URL: &str = "https://www.jpx.co.jp/markets/statistics-equities/misc/01.html";

#[derive(Parser)]
#[command(
    name = "jpxfin",
    about = "Collect dividend metrics and financial statements for JPX-listed companies"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Roster spreadsheet (.xls, .xlsx, .ods or .csv). Overrides the config.
    #[arg(long, global = true)]
    roster: Option<PathBuf>,

    /// Directory for both reports. Overrides the config.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Process only the first N roster entries (after filtering).
    #[arg(long)]
    limit: Option<usize>,

    /// Log at debug level.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the filtered roster with provider tickers.
    Roster,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(path) = cli.roster {
        config.roster.path = path;
    }

    match cli.command {
        Some(Commands::Roster) => run_roster_cmd(&config),
        None => {
            if let Some(dir) = &cli.output_dir {
                config.output.relocate(dir);
            }
            run_pipeline_cmd(&config, cli.limit)
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run_pipeline_cmd(config: &PipelineConfig, limit: Option<usize>) -> Result<()> {
    let provider =
        YahooProvider::new(config.provider.yahoo()).context("failed to set up Yahoo client")?;
    let options = PipelineOptions {
        limit,
        ..PipelineOptions::from(config)
    };
    tracing::info!(
        roster = %config.roster.path.display(),
        provider = provider.name(),
        "starting run"
    );

    match execute(config, &options, &provider, Some(&LogProgress)) {
        Ok(report) => {
            print_summary(&report);
            Ok(())
        }
        Err(PipelineError::Roster(RosterError::NotFound { path })) => missing_roster(&path),
        Err(e) => Err(e.into()),
    }
}

fn run_roster_cmd(config: &PipelineConfig) -> Result<()> {
    let roster = match Roster::load(&config.roster.path, &config.roster.filter()) {
        Ok(roster) => roster,
        Err(RosterError::NotFound { path }) => missing_roster(&path),
        Err(e) => {
            return Err(e).with_context(|| {
                format!("failed to load roster {}", config.roster.path.display())
            })
        }
    };

    for (entry, ticker) in roster.tickers(&config.roster.exchange_suffix) {
        println!(
            "{ticker}\t{}\t{}\t{}\t{}",
            entry.name, entry.market_category, entry.industry_33, entry.industry_17
        );
    }
    println!("{} issues", roster.len());
    Ok(())
}

/// Explain where the roster comes from and exit with status 1.
fn missing_roster(path: &Path) -> ! {
    eprintln!("Roster file not found: {}", path.display());
    eprintln!("Download the list of TSE-listed issues (data_j.xls) from");
    eprintln!("  {JPX_LISTING_URL}");
    eprintln!("and save it at that path, or pass --roster <path>.");
    std::process::exit(1);
}

fn print_summary(report: &RunReport) {
    let summary = &report.output.summary;
    println!();
    println!("=== jpxfin run ===");
    println!("Tickers:              {}", summary.tickers);
    println!("Statement rows:       {}", summary.statement_rows);
    println!("Without statements:   {}", summary.tickers_without_statements);
    println!("Diagnostics:          {}", summary.diagnostics);
    for artifact in [&report.metrics_report, &report.statements_report] {
        println!(
            "Wrote {} ({} rows, {} bytes, blake3 {})",
            artifact.path.display(),
            artifact.rows,
            artifact.bytes,
            &artifact.digest[..16]
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_arguments_runs_the_pipeline() {
        let cli = Cli::try_parse_from(["jpxfin"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn roster_subcommand_accepts_global_flags() {
        let cli = Cli::try_parse_from(["jpxfin", "roster", "--roster", "list.csv", "-v"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Roster)));
        assert_eq!(cli.roster, Some(PathBuf::from("list.csv")));
        assert!(cli.verbose);
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from(["jpxfin", "--output-dir", "out", "--limit", "10"]).unwrap();
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));
        assert_eq!(cli.limit, Some(10));
    }
}

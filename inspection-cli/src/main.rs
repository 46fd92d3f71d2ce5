use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use inspection_cli::commands;
use inspection_cli::config::{CliConfig, TOKEN_ENV_VAR};
use inspection_cli::logging;
use inspection_core::calculations::common::format_currency;
use inspection_core::wizard::StepId;

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Mould inspection cost estimator and wizard checker.
///
/// Prices inspections with the standard (or a supplied) pricing table,
/// reports which wizard steps are incomplete, and completes inspections
/// through the inspection service.
#[derive(Debug, Parser)]
#[command(name = "inspection-estimator", version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `inspection_core=trace` (overrides RUST_LOG).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also append log output to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the cost estimate for an inspection JSON file.
    Estimate {
        #[arg(long)]
        input: PathBuf,

        /// Pricing CSV (overrides `[pricing] table`).
        #[arg(long)]
        pricing: Option<PathBuf>,
    },

    /// Report missing required fields per wizard step.
    Validate {
        #[arg(long)]
        input: PathBuf,

        /// Only check this step (name or number).
        #[arg(long, value_parser = parse_step)]
        step: Option<StepId>,
    },

    /// List the active wizard steps and progress.
    Steps {
        #[arg(long)]
        input: PathBuf,

        /// Step the wizard is positioned at (name or number).
        #[arg(long, value_parser = parse_step)]
        at: Option<StepId>,
    },

    /// Complete an inspection through the configured backend.
    Complete {
        #[arg(long)]
        id: String,

        /// Backend name (overrides `[api] backend`).
        #[arg(long)]
        backend: Option<String>,

        /// Service base URL (overrides `[api] base_url`).
        #[arg(long)]
        base_url: Option<String>,
    },
}

fn parse_step(value: &str) -> Result<StepId, String> {
    StepId::parse(value).ok_or_else(|| format!("unknown wizard step '{value}'"))
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level.as_deref(), cli.log_file.as_deref())?;

    let config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    debug!(?config.api.backend, "configuration loaded");

    match cli.command {
        Command::Estimate { input, pricing } => {
            let table = pricing.or_else(|| config.pricing.table.clone());
            let policy = commands::load_policy(table.as_deref())?;
            let record = commands::load_record(&input)?;
            let report = commands::estimate_report(&record, policy)
                .with_context(|| format!("Cannot price inspection {}", record.id))?;
            println!("{report}");
        }
        Command::Validate { input, step } => {
            let record = commands::load_record(&input)?;
            print!("{}", commands::validation_report(&record, step));
        }
        Command::Steps { input, at } => {
            let policy = commands::load_policy(config.pricing.table.as_deref())?;
            let record = commands::load_record(&input)?;
            let report = commands::steps_report(record, policy, config.wizard_config(), at)?;
            print!("{report}");
        }
        Command::Complete {
            id,
            backend,
            base_url,
        } => {
            if id.trim().is_empty() {
                bail!("inspection id must not be empty");
            }
            let policy = commands::load_policy(config.pricing.table.as_deref())?;
            let mut api_config = config.api_config(std::env::var(TOKEN_ENV_VAR).ok());
            if let Some(backend) = backend {
                api_config.backend = backend;
            }
            if let Some(base_url) = base_url {
                api_config.base_url = base_url;
            }

            let registry = commands::build_registry(policy.clone());
            let summary = commands::complete_remote(
                &registry,
                &api_config,
                &id,
                policy,
                config.wizard_config(),
            )
            .await?;

            info!(inspection = %id, total = %summary.total_cost, "inspection completed");
            match &summary.breakdown {
                Some(breakdown) => println!("{breakdown}"),
                None => println!("Total: {}", format_currency(summary.total_cost)),
            }
        }
    }

    Ok(())
}

//! UX Audit CLI - Main Entry Point
//!
//! Thin consumer of the engine's three entry points. Report rendering,
//! persistence, and serving belong to surrounding layers; this binary
//! just runs scenarios and prints the normalized report.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use uxaudit_engine::{
    AnalysisReport, EngineConfig, Orchestrator, PlaywrightConfig, PlaywrightFactory,
};

mod output;

/// UX Audit - scenario-driven UX quality analysis
#[derive(Parser)]
#[command(name = "uxaudit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "json", global = true)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Fixed clock and seeded simulation for reproducible reports
    #[arg(long, global = true)]
    deterministic: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// YAML
    Yaml,
    /// Plain one-line-per-field text
    Plain,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file against a live URL
    Run {
        /// URL of the application under test
        #[arg(long)]
        url: String,

        /// Scenario document (YAML or JSON)
        #[arg(long)]
        scenario: PathBuf,

        /// Scenario identifier within the document
        #[arg(long)]
        id: Option<String>,
    },

    /// Run the built-in scenario for a mock application
    Mock {
        /// Mock application name
        app: String,
    },

    /// Run a scenario from a file by identifier
    Scenario {
        /// Scenario identifier
        id: String,

        /// Scenario document (YAML or JSON)
        #[arg(long)]
        scenario: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let report = execute(&cli).await?;
    output::print_report(&report, cli.format)?;

    if report.is_failed() {
        std::process::exit(1);
    }
    Ok(())
}

async fn execute(cli: &Cli) -> anyhow::Result<AnalysisReport> {
    let base_config = EngineConfig {
        deterministic: cli.deterministic,
        ..EngineConfig::default()
    };

    let report = match &cli.command {
        Commands::Run { url, scenario, id } => {
            tracing::info!(url, scenario = %scenario.display(), "starting analysis");
            let factory = Arc::new(PlaywrightFactory::new(PlaywrightConfig::default())?);
            let document = uxaudit_engine::scenario::load_document(scenario)?;
            Orchestrator::new(base_config, factory)
                .execute_for_url(url, &document, id.as_deref())
                .await
        }
        Commands::Mock { app } => {
            Orchestrator::simulated(base_config).execute_for_mock_app(app).await
        }
        Commands::Scenario { id, scenario } => {
            let config = EngineConfig {
                scenario_path: Some(scenario.clone()),
                ..base_config
            };
            let factory = Arc::new(PlaywrightFactory::new(PlaywrightConfig::default())?);
            Orchestrator::new(config, factory).execute_by_identifier(id).await
        }
    };
    Ok(report)
}

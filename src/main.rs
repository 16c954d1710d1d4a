use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use fiscal_dash::config::{self, DashboardSettings, FiscalDashConfig};
use fiscal_dash::{cli, logging};

#[derive(Debug, Parser)]
#[command(name = "fiscal-dash")]
#[command(about = "Municipal tax-collection dashboard with simulated data")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate one snapshot and print it
    Show {
        /// Output format
        #[arg(long, value_enum, default_value_t = cli::OutputFormat::Table)]
        format: cli::OutputFormat,
        /// Fixed RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Live dashboard, refreshed on a fixed interval
    Watch {
        /// Milliseconds between refreshes (default from config: 5000)
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Exit after this many rendered updates (at least 1)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        ticks: Option<u64>,
        /// Fixed RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Check config files and validate the effective configuration
    Health,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the effective merged configuration
    Show,
    /// Write the annotated default config to ~/.fiscal-dash/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a dotted key, e.g. `revenue.iptu.max 41000000`
    Set { key: String, value: String },
    /// Overwrite the global config with defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();
    let mut cfg = config::load();
    logging::init(&cfg.logging)?;

    match app.command {
        Commands::Show { format, seed } => {
            if seed.is_some() {
                cfg.general.seed = seed;
            }
            cli::run_show(&settings(&cfg)?, format)
        }
        Commands::Watch {
            interval_ms,
            ticks,
            seed,
        } => {
            if let Some(ms) = interval_ms {
                cfg.general.refresh_interval_ms = ms;
            }
            if seed.is_some() {
                cfg.general.seed = seed;
            }
            cli::run_watch(&settings(&cfg)?, ticks)
        }
        Commands::Health => cli::run_health(&cfg),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}

fn settings(cfg: &FiscalDashConfig) -> Result<DashboardSettings> {
    DashboardSettings::from_config(cfg).context("invalid configuration (see `fiscal-dash health`)")
}

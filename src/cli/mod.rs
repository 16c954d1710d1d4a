//! CLI command implementations for fiscal-dash.
//!
//! Provides subcommand handlers for:
//! - `fiscal-dash show`: one snapshot as table, JSON or CSV
//! - `fiscal-dash watch`: live dashboard, re-rendered on every refresh
//! - `fiscal-dash health`: config file status and validation
//! - `fiscal-dash config show|init|set|reset`: configuration management
pub mod render;

use std::io::{BufRead, IsTerminal, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::{self, DashboardSettings, FileStatus, FiscalDashConfig};
use crate::metrics::TaxCategory;
use crate::scheduler::Published;

/// How often the watch loop checks for keyboard commands between updates.
const WATCH_POLL: Duration = Duration::from_millis(100);

/// Output format for `show`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

// ---------------------------------------------------------------------------
// fiscal-dash show
// ---------------------------------------------------------------------------

/// Generate one snapshot and print it.
pub fn run_show(settings: &DashboardSettings, format: OutputFormat) -> Result<()> {
    let mut scheduler = settings.scheduler();
    scheduler.start();
    let update = scheduler.current();
    scheduler.stop();
    let update = update.context("scheduler did not publish an initial snapshot")?;

    match format {
        OutputFormat::Json => print_json(&update)?,
        OutputFormat::Csv => print_csv(&update),
        OutputFormat::Table => print!("{}", render::dashboard(&update)),
    }

    Ok(())
}

fn print_json(update: &Published) -> Result<()> {
    let value = serde_json::json!({
        "update": update,
        "alerts": crate::metrics::derived::alerts(&update.snapshot, &update.derived),
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_csv(update: &Published) {
    println!("category,target,collected,achieved_percent,severity");
    for category in TaxCategory::ALL {
        println!("{}", render::csv_row(category, update));
    }
}

// ---------------------------------------------------------------------------
// fiscal-dash watch
// ---------------------------------------------------------------------------

/// Keyboard commands accepted while watching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchCommand {
    Refresh,
    Quit,
}

fn parse_watch_command(line: &str) -> Option<WatchCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "r" | "refresh" => Some(WatchCommand::Refresh),
        "q" | "quit" | "exit" => Some(WatchCommand::Quit),
        _ => None,
    }
}

/// Run the live dashboard until `max_updates` renders or the user quits.
/// A limit of zero is treated as one: the initial snapshot always renders.
///
/// Enter `r` for an immediate refresh, `q` to quit.
pub fn run_watch(settings: &DashboardSettings, max_updates: Option<u64>) -> Result<()> {
    let mut scheduler = settings.scheduler();
    let updates = scheduler.subscribe();
    let commands = spawn_command_reader();
    let clear = std::io::stdout().is_terminal();

    scheduler.start();

    let mut rendered = 0u64;
    loop {
        match updates.recv_timeout(WATCH_POLL) {
            Ok(update) => {
                draw(&update, clear)?;
                rendered += 1;
                if max_updates.is_some_and(|limit| rendered >= limit) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        // A closed stdin only ends keyboard control, not the dashboard.
        match commands.try_recv() {
            Ok(WatchCommand::Refresh) => {
                scheduler.refresh_now();
            }
            Ok(WatchCommand::Quit) => break,
            Err(_) => {}
        }
    }

    scheduler.stop();
    Ok(())
}

fn draw(update: &Published, clear: bool) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    if clear {
        write!(stdout, "\x1B[2J\x1B[H")?;
    }
    write!(stdout, "{}", render::dashboard(update))?;
    writeln!(
        stdout,
        "\n{}",
        "[r] refresh now  [q] quit (then Enter)".dimmed()
    )?;
    stdout.flush().context("failed to flush dashboard")
}

fn spawn_command_reader() -> Receiver<WatchCommand> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines().map_while(Result::ok) {
            if let Some(cmd) = parse_watch_command(&line)
                && tx.send(cmd).is_err()
            {
                break;
            }
        }
    });
    rx
}

// ---------------------------------------------------------------------------
// fiscal-dash health
// ---------------------------------------------------------------------------

/// Report config file status and validate the effective configuration.
pub fn run_health(cfg: &FiscalDashConfig) -> Result<()> {
    println!("{}", "fiscal-dash Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    print_file_status(
        "Global config",
        config::global_config_file(),
        "run `fiscal-dash config init` to create",
    );
    print_file_status("Project config", config::project_config_file(), "optional");

    let result = DashboardSettings::from_config(cfg);
    match &result {
        Ok(settings) => {
            print_health_item("Configuration", true, "valid");
            print_health_item(
                "Refresh interval",
                true,
                &format!("{} ms", settings.refresh_interval.as_millis()),
            );
            print_health_item(
                "Agents",
                true,
                &settings.policy.agent_count.to_string(),
            );
            print_health_item(
                "Severity bands",
                true,
                &format!(
                    "critical < {} <= warning < {} <= satisfactory",
                    settings.policy.thresholds.critical_below,
                    settings.policy.thresholds.warning_below
                ),
            );
            print_health_item(
                "Random seed",
                true,
                &settings
                    .seed
                    .map_or_else(|| "entropy".to_string(), |s| s.to_string()),
            );
        }
        Err(e) => print_health_item("Configuration", false, &e.to_string()),
    }
    print_health_item(
        "Logging",
        true,
        &format!("{} ({})", cfg.logging.level, cfg.logging.format),
    );

    result.map(|_| ()).context("configuration is invalid")
}

fn print_file_status(name: &str, path: Option<std::path::PathBuf>, missing_hint: &str) {
    let Some(path) = path else {
        print_health_item(name, false, "could not determine location");
        return;
    };
    match config::check_file(&path) {
        FileStatus::Loaded => print_health_item(name, true, &format!("{} found", path.display())),
        FileStatus::Missing => print_health_item(name, true, &format!("none ({missing_hint})")),
        FileStatus::Malformed(e) => print_health_item(name, false, &format!("ignored: {e}")),
    }
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<20} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// fiscal-dash config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective fiscal-dash Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    for (label, path) in [
        ("~/.fiscal-dash/config.toml", config::global_config_file()),
        (".fiscal-dash.toml", config::project_config_file()),
    ] {
        let status = path.map_or(FileStatus::Missing, |p| config::check_file(&p));
        match status {
            FileStatus::Loaded => println!("  {} {}", "✓".green(), label.dimmed()),
            FileStatus::Missing => {
                println!("  {} {}", "·".dimmed(), format!("{label} (not found)").dimmed())
            }
            FileStatus::Malformed(_) => {
                println!("  {} {}", "✗".red(), format!("{label} (malformed, ignored)").dimmed())
            }
        }
    }
    println!(
        "  {} {}",
        "·".dimmed(),
        "FISCAL_DASH_* environment variables".dimmed()
    );

    Ok(())
}

/// Initialize a default config file at `~/.fiscal-dash/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!("  {}", "Edit the file to adjust targets and ranges.".dimmed());
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parsing() {
        use clap::ValueEnum;

        assert_eq!(OutputFormat::from_str("json", true), Ok(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("CSV", true), Ok(OutputFormat::Csv));
        assert_eq!(OutputFormat::from_str("table", false), Ok(OutputFormat::Table));
        assert!(OutputFormat::from_str("xml", true).is_err());
    }

    #[test]
    fn test_parse_watch_command() {
        assert_eq!(parse_watch_command("r"), Some(WatchCommand::Refresh));
        assert_eq!(parse_watch_command(" R \n"), Some(WatchCommand::Refresh));
        assert_eq!(parse_watch_command("quit"), Some(WatchCommand::Quit));
        assert_eq!(parse_watch_command("q"), Some(WatchCommand::Quit));
        assert_eq!(parse_watch_command(""), None);
        assert_eq!(parse_watch_command("x"), None);
    }

    #[test]
    fn health_fails_on_invalid_config() {
        let mut cfg = FiscalDashConfig::default();
        cfg.general.agent_count = 0;
        assert!(run_health(&cfg).is_err());
    }
}

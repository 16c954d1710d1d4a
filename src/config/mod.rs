//! Configuration system for fiscal-dash.
//!
//! Provides a layered configuration hierarchy:
//!
//! 1. **Built-in defaults**: hardcoded in [`schema::FiscalDashConfig::default()`]
//! 2. **User global config**: `~/.fiscal-dash/config.toml`
//! 3. **Project local config**: `.fiscal-dash.toml` in the current working directory
//! 4. **Environment variables**: `FISCAL_DASH_*` overrides (highest precedence)
//!
//! File layers merge key by key: a project file that only sets
//! `general.refresh_interval_ms` keeps everything the global file set.
//! Loading is lenient: a missing or malformed file is skipped and the
//! previous layer stands. Validation of the merged result is strict and
//! happens once, in [`DashboardSettings::from_config`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use fiscal_dash::config::{self, DashboardSettings};
//!
//! let cfg = config::load();
//! let settings = DashboardSettings::from_config(&cfg)?;
//! let mut scheduler = settings.scheduler();
//! ```
pub mod schema;
mod settings;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::FiscalDashConfig;
pub use settings::DashboardSettings;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars. Does not validate; see [`DashboardSettings::from_config`].
pub fn load() -> FiscalDashConfig {
    let files: Vec<PathBuf> = [global_config_path(), project_config_path()]
        .into_iter()
        .flatten()
        .collect();

    let mut config = load_layers(&files);
    apply_env_overrides(&mut config);
    config
}

/// Merge config files over the defaults, lowest precedence first.
fn load_layers(files: &[PathBuf]) -> FiscalDashConfig {
    let mut merged = defaults_value();
    let mut config = FiscalDashConfig::default();

    for path in files {
        match overlay_file(&merged, path) {
            Ok(Some((value, resolved))) => {
                merged = value;
                config = resolved;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %format!("{e:#}"), "ignoring config file");
            }
        }
    }

    config
}

/// State of a config file on disk, as reported by `fiscal-dash health`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Missing,
    Loaded,
    Malformed(String),
}

/// Parse a config file on its own, over the built-in defaults.
pub fn check_file(path: &Path) -> FileStatus {
    match overlay_file(&defaults_value(), path) {
        Ok(None) => FileStatus::Missing,
        Ok(Some(_)) => FileStatus::Loaded,
        Err(e) => FileStatus::Malformed(format!("{e:#}")),
    }
}

/// Merge the file at `path` over `base` and deserialize the result.
///
/// Returns the merged value alongside the typed config so the next layer can
/// build on it.
fn overlay_file(
    base: &toml::Value,
    path: &Path,
) -> Result<Option<(toml::Value, FiscalDashConfig)>> {
    let Some(layer) = read_toml_file(path)? else {
        return Ok(None);
    };
    let resolved = overlay(base, layer)
        .with_context(|| format!("invalid settings in {}", path.display()))?;
    Ok(Some(resolved))
}

fn overlay(base: &toml::Value, layer: toml::Value) -> Result<(toml::Value, FiscalDashConfig)> {
    let mut merged = base.clone();
    merge_values(&mut merged, layer);
    let config = merged.clone().try_into()?;
    Ok((merged, config))
}

fn read_toml_file(path: &Path) -> Result<Option<toml::Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(value))
}

/// The built-in defaults as a TOML tree, the base every file merges onto.
fn defaults_value() -> toml::Value {
    toml::Value::try_from(FiscalDashConfig::default())
        .unwrap_or_else(|_| toml::Value::Table(toml::Table::new()))
}

/// Deep-merge `overlay` into `base`. Tables merge key by key; any other
/// value replaces what was there.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.fiscal-dash/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".fiscal-dash").join("config.toml"))
}

/// Path to the project local config: `.fiscal-dash.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".fiscal-dash.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `FISCAL_DASH_REFRESH_INTERVAL_MS`: refresh cadence
/// - `FISCAL_DASH_AGENT_COUNT`: agents sharing enforcement actions
/// - `FISCAL_DASH_SEED`: fixed RNG seed (empty string clears it)
/// - `FISCAL_DASH_LOG_LEVEL`: `tracing` filter directive
///
/// Unparseable values are ignored.
fn apply_env_overrides(config: &mut FiscalDashConfig) {
    if let Ok(val) = std::env::var("FISCAL_DASH_REFRESH_INTERVAL_MS")
        && let Ok(ms) = val.trim().parse::<u64>()
    {
        config.general.refresh_interval_ms = ms;
    }
    if let Ok(val) = std::env::var("FISCAL_DASH_AGENT_COUNT")
        && let Ok(n) = val.trim().parse::<u32>()
    {
        config.general.agent_count = n;
    }
    if let Ok(val) = std::env::var("FISCAL_DASH_SEED") {
        if val.trim().is_empty() {
            config.general.seed = None;
        } else if let Ok(seed) = val.trim().parse::<u64>() {
            config.general.seed = Some(seed);
        }
    }
    if let Ok(val) = std::env::var("FISCAL_DASH_LOG_LEVEL")
        && !val.is_empty()
    {
        config.logging.level = val;
    }
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.fiscal-dash/config.toml`.
///
/// Creates the `~/.fiscal-dash/` directory if it doesn't exist. Returns an
/// error if the file already exists (use `force = true` to overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;
    write_default_config(&path, force)?;
    Ok(path)
}

fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }

    fs::write(path, FiscalDashConfig::default_toml()).context("failed to write config file")
}

/// Set a single config key to a value in the global config file.
///
/// Reads the current global config (or starts empty), updates the specified
/// key, and writes the result back. Supports dotted keys like
/// `revenue.iptu.max`. Only the keys present in the file are written.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;
    set_config_value_at(&path, key, value)
}

fn set_config_value_at(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut value_table = read_toml_file(path)
        .context("failed to read config file")?
        .unwrap_or_else(|| toml::Value::Table(toml::Table::new()));

    set_toml_value(&mut value_table, key, value)?;

    // Refuse to write a file that would no longer load.
    overlay(&defaults_value(), value_table.clone())
        .with_context(|| format!("'{value}' is not a valid value for '{key}'"))?;
    let output =
        toml::to_string_pretty(&value_table).context("failed to serialize updated config")?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, output).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
///
/// The key must exist in the built-in defaults, whose value decides how
/// `raw_value` is parsed. `general.seed` is optional and absent from the
/// serialized defaults. Missing tables along the path are created.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        anyhow::bail!("invalid config key: '{key}'");
    }

    let defaults = defaults_value();
    let template = parts
        .iter()
        .try_fold(&defaults, |node, part| node.get(part));

    let new_value = match template {
        Some(toml::Value::Integer(_)) => parse_integer(key, raw_value)?,
        None if key == "general.seed" => parse_integer(key, raw_value)?,
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(toml::Value::String(_)) => toml::Value::String(raw_value.to_string()),
        Some(toml::Value::Table(_)) => anyhow::bail!("'{key}' is a section, not a value"),
        _ => anyhow::bail!("unknown config key: '{key}'"),
    };

    // Navigate to the parent table, creating sections the file lacks.
    let mut current = root;
    for &part in &parts[..parts.len() - 1] {
        let table = current
            .as_table_mut()
            .with_context(|| format!("expected table above '{key}'"))?;
        current = table
            .entry(part)
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
    }

    let leaf = parts[parts.len() - 1];
    current
        .as_table_mut()
        .with_context(|| format!("expected table above '{key}'"))?
        .insert(leaf.to_string(), new_value);
    Ok(())
}

fn parse_integer(key: &str, raw_value: &str) -> Result<toml::Value> {
    let n: i64 = raw_value
        .parse()
        .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
    Ok(toml::Value::Integer(n))
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

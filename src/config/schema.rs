//! Configuration schema and defaults for fiscal-dash.
//!
//! Defines the TOML-serializable configuration structure with all sections:
//! `[general]`, `[thresholds]`, `[revenue.*]`, `[enforcement.*]`,
//! `[projects.*]` and `[logging]`.
//!
//! Every field has a built-in default taken from the standard generation
//! tables. Users only need to set the values they want to override.

use serde::{Deserialize, Serialize};

use crate::metrics::derived::{DEFAULT_AGENT_COUNT, DEFAULT_CRITICAL_BELOW, DEFAULT_WARNING_BELOW};
use crate::metrics::source::{DEFAULT_ENFORCEMENT, DEFAULT_PROJECTS, DEFAULT_REVENUE};
use crate::metrics::{ActionStatus, ProjectId, TaxCategory};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level fiscal-dash configuration.
///
/// Maps directly to the `~/.fiscal-dash/config.toml` and `.fiscal-dash.toml`
/// file schemas. Missing sections fall back to built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiscalDashConfig {
    pub general: GeneralConfig,
    pub thresholds: ThresholdsConfig,
    pub revenue: RevenueConfig,
    pub enforcement: EnforcementConfig,
    pub projects: ProjectsConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [general]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Time between scheduled refreshes (milliseconds).
    pub refresh_interval_ms: u64,
    /// Agents sharing the enforcement workload.
    pub agent_count: u32,
    /// Fixed RNG seed for reproducible output. Unset means OS entropy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 5000,
            agent_count: DEFAULT_AGENT_COUNT,
            seed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// [thresholds]
// ---------------------------------------------------------------------------

/// Severity bands for achieved-percent classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    pub critical_below: f64,
    pub warning_below: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            critical_below: DEFAULT_CRITICAL_BELOW,
            warning_below: DEFAULT_WARNING_BELOW,
        }
    }
}

// ---------------------------------------------------------------------------
// [revenue.<category>]
// ---------------------------------------------------------------------------

/// Annual target and collected-amount draw range for one tax category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueRange {
    pub target: u64,
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevenueConfig {
    pub iss: RevenueRange,
    pub iptu: RevenueRange,
    pub itbi: RevenueRange,
    pub trsd: RevenueRange,
    pub itr: RevenueRange,
}

impl Default for RevenueConfig {
    fn default() -> Self {
        let [iss, iptu, itbi, trsd, itr] =
            DEFAULT_REVENUE.map(|(_, target, min, max)| RevenueRange { target, min, max });
        Self {
            iss,
            iptu,
            itbi,
            trsd,
            itr,
        }
    }
}

impl RevenueConfig {
    pub fn get(&self, category: TaxCategory) -> &RevenueRange {
        match category {
            TaxCategory::Iss => &self.iss,
            TaxCategory::Iptu => &self.iptu,
            TaxCategory::Itbi => &self.itbi,
            TaxCategory::Trsd => &self.trsd,
            TaxCategory::Itr => &self.itr,
        }
    }
}

// ---------------------------------------------------------------------------
// [enforcement.<status>]
// ---------------------------------------------------------------------------

/// Draw range for an enforcement-action count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcementConfig {
    pub completed: CountRange,
    pub in_progress: CountRange,
    pub overdue: CountRange,
    pub not_started: CountRange,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        let [completed, in_progress, overdue, not_started] =
            DEFAULT_ENFORCEMENT.map(|(_, min, max)| CountRange { min, max });
        Self {
            completed,
            in_progress,
            overdue,
            not_started,
        }
    }
}

impl EnforcementConfig {
    pub fn get(&self, status: ActionStatus) -> &CountRange {
        match status {
            ActionStatus::Completed => &self.completed,
            ActionStatus::InProgress => &self.in_progress,
            ActionStatus::Overdue => &self.overdue,
            ActionStatus::NotStarted => &self.not_started,
        }
    }
}

// ---------------------------------------------------------------------------
// [projects.<id>]
// ---------------------------------------------------------------------------

/// Draw range for a project's progress percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRange {
    pub min: u8,
    pub max: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectsConfig {
    pub hydro_plants_iptu: ProgressRange,
    pub inspection_fee: ProgressRange,
    pub itbi_observatory: ProgressRange,
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        let [hydro_plants_iptu, inspection_fee, itbi_observatory] =
            DEFAULT_PROJECTS.map(|(_, min, max)| ProgressRange { min, max });
        Self {
            hydro_plants_iptu,
            inspection_fee,
            itbi_observatory,
        }
    }
}

impl ProjectsConfig {
    pub fn get(&self, project: ProjectId) -> &ProgressRange {
        match project {
            ProjectId::HydroPlantsIptu => &self.hydro_plants_iptu,
            ProjectId::InspectionFee => &self.inspection_fee,
            ProjectId::ItbiObservatory => &self.itbi_observatory,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Output format for diagnostic logs on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`,
    /// or a full `tracing` filter such as `"fiscal_dash=debug"`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default TOML content
// ---------------------------------------------------------------------------

impl FiscalDashConfig {
    /// Generate the annotated default TOML config file content.
    ///
    /// Used by `fiscal-dash config init` to create a starting config file
    /// with all settings documented.
    pub fn default_toml() -> String {
        r#"# fiscal-dash Configuration
# Municipal tax-collection dashboard with simulated data
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (FISCAL_DASH_*)
#   2. Project config (.fiscal-dash.toml in current directory)
#   3. User global config (~/.fiscal-dash/config.toml)
#   4. Built-in defaults
#
# Every range is inclusive and must satisfy min <= max.

[general]
refresh_interval_ms = 5000            # Time between automatic refreshes
agent_count = 15                      # Agents sharing enforcement actions
# seed = 42                           # Fixed seed for reproducible data

[thresholds]
critical_below = 65.0                 # Achieved % below this is critical
warning_below = 80.0                  # Achieved % below this is a warning

[revenue.iss]
target = 258196651
min = 180000000
max = 260000000

[revenue.iptu]
target = 40976191
min = 30000000
max = 42000000

[revenue.itbi]
target = 24882600
min = 17000000
max = 25000000

[revenue.trsd]
target = 35760432
min = 20000000
max = 36000000

[revenue.itr]
target = 3395740
min = 1900000
max = 3400000

[enforcement.completed]
min = 25
max = 40

[enforcement.in_progress]
min = 50
max = 70

[enforcement.overdue]
min = 10
max = 25

[enforcement.not_started]
min = 20
max = 30

[projects.hydro_plants_iptu]
min = 20                              # Progress percentages, 0-100
max = 40

[projects.inspection_fee]
min = 40
max = 60

[projects.itbi_observatory]
min = 10
max = 30

[logging]
level = "warn"                        # error | warn | info | debug | trace
format = "pretty"                     # pretty | json
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

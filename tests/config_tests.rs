//! Integration tests for configuration loading and validation.
//!
//! Covers the FISCAL_DASH_* environment layer and every way a merged
//! configuration can be rejected at startup.

use fiscal_dash::config::{self, DashboardSettings, FiscalDashConfig};
use fiscal_dash::error::ConfigError;
use fiscal_dash::metrics::ActionStatus;
use fiscal_dash::metrics::derived::DerivedMetrics;
use fiscal_dash::metrics::source::MetricSource;

fn rejected_field(config: &FiscalDashConfig) -> String {
    match DashboardSettings::from_config(config) {
        Err(err @ ConfigError::InvalidConfiguration { .. }) => err.field().to_string(),
        Ok(_) => panic!("configuration unexpectedly accepted"),
    }
}

// ---------------------------------------------------------------------------
// Environment overrides
// ---------------------------------------------------------------------------

/// All env-var cases live in one test: the process environment is shared
/// across test threads.
#[test]
fn env_overrides_take_highest_precedence() {
    let baseline = config::load();

    // SAFETY: no other test in this binary reads FISCAL_DASH_* variables.
    unsafe {
        std::env::set_var("FISCAL_DASH_REFRESH_INTERVAL_MS", "250");
        std::env::set_var("FISCAL_DASH_AGENT_COUNT", "30");
        std::env::set_var("FISCAL_DASH_SEED", "4242");
        std::env::set_var("FISCAL_DASH_LOG_LEVEL", "fiscal_dash=debug");
    }
    let cfg = config::load();
    assert_eq!(cfg.general.refresh_interval_ms, 250);
    assert_eq!(cfg.general.agent_count, 30);
    assert_eq!(cfg.general.seed, Some(4242));
    assert_eq!(cfg.logging.level, "fiscal_dash=debug");

    // Unparseable numbers are ignored; an empty seed clears it.
    unsafe {
        std::env::set_var("FISCAL_DASH_AGENT_COUNT", "lots");
        std::env::set_var("FISCAL_DASH_SEED", "");
    }
    let cfg = config::load();
    assert_eq!(cfg.general.agent_count, baseline.general.agent_count);
    assert_eq!(cfg.general.seed, None);

    // A zero interval loads, then fails validation.
    unsafe {
        std::env::set_var("FISCAL_DASH_REFRESH_INTERVAL_MS", "0");
    }
    let cfg = config::load();
    assert_eq!(rejected_field(&cfg), "general.refresh_interval_ms");

    unsafe {
        std::env::remove_var("FISCAL_DASH_REFRESH_INTERVAL_MS");
        std::env::remove_var("FISCAL_DASH_AGENT_COUNT");
        std::env::remove_var("FISCAL_DASH_SEED");
        std::env::remove_var("FISCAL_DASH_LOG_LEVEL");
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn defaults_are_valid() {
    let settings = DashboardSettings::from_config(&FiscalDashConfig::default()).unwrap();
    assert_eq!(settings.refresh_interval.as_millis(), 5000);
    assert_eq!(settings.policy.agent_count, 15);
    assert_eq!(settings.policy.thresholds.critical_below, 65.0);
    assert_eq!(settings.policy.thresholds.warning_below, 80.0);
    assert_eq!(settings.seed, None);
}

#[test]
fn inverted_revenue_range_is_rejected() {
    let mut cfg = FiscalDashConfig::default();
    cfg.revenue.itbi.min = cfg.revenue.itbi.max + 1;
    assert_eq!(rejected_field(&cfg), "revenue.itbi");
}

#[test]
fn zero_target_is_rejected() {
    let mut cfg = FiscalDashConfig::default();
    cfg.revenue.itr.target = 0;
    assert_eq!(rejected_field(&cfg), "revenue.itr");
}

#[test]
fn inverted_action_range_is_rejected() {
    let mut cfg = FiscalDashConfig::default();
    cfg.enforcement.overdue.min = 50;
    cfg.enforcement.overdue.max = 10;
    assert_eq!(rejected_field(&cfg), "enforcement.overdue");
}

#[test]
fn progress_above_hundred_is_rejected() {
    let mut cfg = FiscalDashConfig::default();
    cfg.projects.inspection_fee.max = 101;
    assert_eq!(rejected_field(&cfg), "projects.inspection_fee");
}

#[test]
fn zero_agents_are_rejected() {
    let mut cfg = FiscalDashConfig::default();
    cfg.general.agent_count = 0;
    assert_eq!(rejected_field(&cfg), "general.agent_count");
}

#[test]
fn bad_thresholds_are_rejected() {
    let mut cfg = FiscalDashConfig::default();
    cfg.thresholds.critical_below = 90.0;
    assert_eq!(rejected_field(&cfg), "thresholds");

    cfg.thresholds.critical_below = f64::NAN;
    assert_eq!(rejected_field(&cfg), "thresholds");
}

#[test]
fn counts_that_overflow_totals_are_rejected() {
    let mut cfg = FiscalDashConfig::default();
    cfg.enforcement.completed.min = u32::MAX;
    cfg.enforcement.completed.max = u32::MAX;
    assert_eq!(rejected_field(&cfg), "enforcement");
}

#[test]
fn largest_accepted_counts_derive_without_overflow() {
    let mut cfg = FiscalDashConfig::default();
    for status in ActionStatus::ALL {
        let range = match status {
            ActionStatus::Completed => &mut cfg.enforcement.completed,
            ActionStatus::InProgress => &mut cfg.enforcement.in_progress,
            ActionStatus::Overdue => &mut cfg.enforcement.overdue,
            ActionStatus::NotStarted => &mut cfg.enforcement.not_started,
        };
        range.min = u32::MAX / 4;
        range.max = u32::MAX / 4;
    }
    let settings = DashboardSettings::from_config(&cfg).unwrap();
    let snapshot = settings.source().generate();
    let derived = DerivedMetrics::compute(&snapshot, &settings.policy);
    assert_eq!(derived.total_actions, (u32::MAX / 4) * 4);
}

#[test]
fn degenerate_ranges_are_accepted() {
    let mut cfg = FiscalDashConfig::default();
    cfg.revenue.iss.min = cfg.revenue.iss.target;
    cfg.revenue.iss.max = cfg.revenue.iss.target;
    cfg.projects.itbi_observatory.min = 100;
    cfg.projects.itbi_observatory.max = 100;
    assert!(DashboardSettings::from_config(&cfg).is_ok());
}

#[test]
fn toml_file_with_partial_sections_validates() {
    let cfg: FiscalDashConfig = toml::from_str(
        r#"
[general]
agent_count = 10

[revenue.iptu]
target = 1000
min = 500
max = 1500
"#,
    )
    .unwrap();
    let settings = DashboardSettings::from_config(&cfg).unwrap();
    assert_eq!(settings.policy.agent_count, 10);
    assert_eq!(settings.refresh_interval.as_millis(), 5000);
}

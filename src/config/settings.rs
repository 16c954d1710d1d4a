use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::metrics::derived::{DerivationPolicy, SeverityThresholds};
use crate::metrics::source::{MetricTables, RandomSource};
use crate::scheduler::RefreshScheduler;

use super::FiscalDashConfig;

/// Validated runtime settings, built once at startup.
///
/// Holding one of these means every range, target and threshold has been
/// checked, so generation and derivation can no longer fail.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSettings {
    pub refresh_interval: Duration,
    pub policy: DerivationPolicy,
    pub tables: MetricTables,
    pub seed: Option<u64>,
}

impl DashboardSettings {
    pub fn from_config(config: &FiscalDashConfig) -> ConfigResult<Self> {
        let general = &config.general;
        if general.refresh_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "general.refresh_interval_ms",
                "must be greater than zero",
            ));
        }
        if general.agent_count == 0 {
            return Err(ConfigError::invalid(
                "general.agent_count",
                "must be greater than zero",
            ));
        }

        let thresholds = SeverityThresholds::new(
            config.thresholds.critical_below,
            config.thresholds.warning_below,
        )?;

        Ok(Self {
            refresh_interval: Duration::from_millis(general.refresh_interval_ms),
            policy: DerivationPolicy {
                agent_count: general.agent_count,
                thresholds,
            },
            tables: MetricTables::from_config(config)?,
            seed: general.seed,
        })
    }

    /// The configured random source: seeded when `general.seed` is set.
    pub fn source(&self) -> RandomSource {
        match self.seed {
            Some(seed) => RandomSource::seeded(self.tables.clone(), seed),
            None => RandomSource::from_entropy(self.tables.clone()),
        }
    }

    /// An inactive scheduler wired to [`Self::source`].
    pub fn scheduler(&self) -> RefreshScheduler<RandomSource> {
        RefreshScheduler::new(self.source(), self.refresh_interval).with_policy(self.policy)
    }
}

//! Aggregates computed from a [`Snapshot`].
//!
//! Nothing here is stored independently of the snapshot it came from: the
//! scheduler recomputes a [`DerivedMetrics`] for every published snapshot.
//!
//! # Severity bands
//!
//! | Achieved        | Severity       |
//! |-----------------|----------------|
//! | `< 65%`         | `Critical`     |
//! | `65% .. < 80%`  | `Warning`      |
//! | `>= 80%`        | `Satisfactory` |

use serde::Serialize;

use super::{ActionStatus, Snapshot, TaxCategory};
use crate::error::{ConfigError, ConfigResult};

/// Agents sharing the enforcement workload.
pub const DEFAULT_AGENT_COUNT: u32 = 15;

/// Below this achieved percentage a category is critical.
pub const DEFAULT_CRITICAL_BELOW: f64 = 65.0;

/// Below this achieved percentage a category needs attention.
pub const DEFAULT_WARNING_BELOW: f64 = 80.0;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Satisfactory,
}

impl Severity {
    /// Classify with the default 65/80 bands.
    pub fn classify(achieved_percent: f64) -> Self {
        SeverityThresholds::default().classify(achieved_percent)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Warning => write!(f, "warning"),
            Self::Satisfactory => write!(f, "satisfactory"),
        }
    }
}

/// Band boundaries. Each boundary belongs to the upper band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeverityThresholds {
    pub critical_below: f64,
    pub warning_below: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            critical_below: DEFAULT_CRITICAL_BELOW,
            warning_below: DEFAULT_WARNING_BELOW,
        }
    }
}

impl SeverityThresholds {
    /// Build thresholds, rejecting negative or out-of-order bands.
    pub fn new(critical_below: f64, warning_below: f64) -> ConfigResult<Self> {
        if !(critical_below.is_finite() && warning_below.is_finite()) {
            return Err(ConfigError::invalid(
                "thresholds",
                "bands must be finite numbers",
            ));
        }
        if critical_below < 0.0 {
            return Err(ConfigError::invalid(
                "thresholds.critical_below",
                format!("{critical_below} is negative"),
            ));
        }
        if critical_below > warning_below {
            return Err(ConfigError::invalid(
                "thresholds",
                format!("critical_below {critical_below} exceeds warning_below {warning_below}"),
            ));
        }
        Ok(Self {
            critical_below,
            warning_below,
        })
    }

    pub fn classify(&self, achieved_percent: f64) -> Severity {
        if achieved_percent < self.critical_below {
            Severity::Critical
        } else if achieved_percent < self.warning_below {
            Severity::Warning
        } else {
            Severity::Satisfactory
        }
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Inputs to [`DerivedMetrics::compute`] that come from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivationPolicy {
    pub agent_count: u32,
    pub thresholds: SeverityThresholds,
}

impl Default for DerivationPolicy {
    fn default() -> Self {
        Self {
            agent_count: DEFAULT_AGENT_COUNT,
            thresholds: SeverityThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedMetrics {
    pub total_collected: u64,
    pub total_target: u64,
    /// `total_collected / total_target`, as a whole percentage.
    pub overall_achieved_percent: u32,
    pub total_actions: u32,
    pub average_actions_per_agent: u32,
    pub completed_actions: u32,
    pub overdue_actions: u32,
    /// One entry per [`TaxCategory`], in display order.
    pub severities: [Severity; 5],
}

impl DerivedMetrics {
    pub fn compute(snapshot: &Snapshot, policy: &DerivationPolicy) -> Self {
        let total_collected: u64 = snapshot.revenue.iter().map(|m| m.collected()).sum();
        let total_target: u64 = snapshot.revenue.iter().map(|m| m.target()).sum();
        let total_actions: u32 = snapshot.enforcement.iter().map(|a| a.count).sum();

        Self {
            total_collected,
            total_target,
            overall_achieved_percent: rounded_ratio(total_collected as f64 * 100.0, total_target as f64),
            total_actions,
            average_actions_per_agent: rounded_ratio(
                f64::from(total_actions),
                f64::from(policy.agent_count),
            ),
            completed_actions: snapshot.actions(ActionStatus::Completed),
            overdue_actions: snapshot.actions(ActionStatus::Overdue),
            severities: snapshot
                .revenue
                .each_ref()
                .map(|m| policy.thresholds.classify(m.achieved_percent())),
        }
    }

    pub fn severity(&self, category: TaxCategory) -> Severity {
        self.severities[category.index()]
    }
}

/// `round(numerator / denominator)`, or zero for an empty denominator.
fn rounded_ratio(numerator: f64, denominator: f64) -> u32 {
    if denominator <= 0.0 {
        return 0;
    }
    (numerator / denominator).round() as u32
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertSubject {
    BelowTarget { category: TaxCategory },
    OverdueActions { count: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub severity: Severity,
    pub subject: AlertSubject,
    /// Achieved percentage for revenue alerts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub achieved_percent: Option<f64>,
}

/// Alerts for the notification panel, critical first.
///
/// A revenue category alerts at its own severity when it is not
/// satisfactory. Any overdue enforcement action raises a warning.
pub fn alerts(snapshot: &Snapshot, derived: &DerivedMetrics) -> Vec<Alert> {
    let mut alerts: Vec<Alert> = snapshot
        .revenue
        .iter()
        .zip(derived.severities)
        .filter(|(_, severity)| *severity != Severity::Satisfactory)
        .map(|(metric, severity)| Alert {
            severity,
            subject: AlertSubject::BelowTarget {
                category: metric.category(),
            },
            achieved_percent: Some(metric.achieved_percent()),
        })
        .collect();

    if derived.overdue_actions > 0 {
        alerts.push(Alert {
            severity: Severity::Warning,
            subject: AlertSubject::OverdueActions {
                count: derived.overdue_actions,
            },
            achieved_percent: None,
        });
    }

    // Stable sort keeps display order within a band.
    alerts.sort_by_key(|a| a.severity);
    alerts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{
        EnforcementActionMetric, PriorityProject, ProjectId, RevenueCategoryMetric,
    };

    fn snapshot(collected: [u64; 5], counts: [u32; 4]) -> Snapshot {
        let targets = [100, 200, 300, 400, 500];
        let revenue = TaxCategory::ALL.map(|category| {
            let i = category.index();
            RevenueCategoryMetric::new(category, targets[i], collected[i])
        });
        Snapshot {
            revenue,
            enforcement: ActionStatus::ALL.map(|status| EnforcementActionMetric {
                status,
                count: counts[status.index()],
            }),
            projects: ProjectId::ALL.map(|project| PriorityProject::new(project, 50)),
        }
    }

    #[test]
    fn severity_bands_include_upper_boundary() {
        assert_eq!(Severity::classify(64.9), Severity::Critical);
        assert_eq!(Severity::classify(65.0), Severity::Warning);
        assert_eq!(Severity::classify(79.9), Severity::Warning);
        assert_eq!(Severity::classify(80.0), Severity::Satisfactory);
        assert_eq!(Severity::classify(0.0), Severity::Critical);
        assert_eq!(Severity::classify(123.4), Severity::Satisfactory);
    }

    #[test]
    fn custom_thresholds_classify() {
        let t = SeverityThresholds::new(50.0, 90.0).unwrap();
        assert_eq!(t.classify(49.9), Severity::Critical);
        assert_eq!(t.classify(50.0), Severity::Warning);
        assert_eq!(t.classify(90.0), Severity::Satisfactory);
    }

    #[test]
    fn thresholds_reject_bad_bands() {
        assert!(SeverityThresholds::new(80.0, 65.0).is_err());
        assert!(SeverityThresholds::new(-1.0, 65.0).is_err());
        assert!(SeverityThresholds::new(f64::NAN, 65.0).is_err());
        assert!(SeverityThresholds::new(70.0, 70.0).is_ok());
    }

    #[test]
    fn totals_sum_every_entry() {
        let snap = snapshot([50, 100, 150, 200, 250], [30, 60, 15, 25]);
        let derived = DerivedMetrics::compute(&snap, &DerivationPolicy::default());

        assert_eq!(derived.total_collected, 750);
        assert_eq!(derived.total_target, 1500);
        assert_eq!(derived.overall_achieved_percent, 50);
        assert_eq!(derived.total_actions, 130);
        // 130 / 15 = 8.67
        assert_eq!(derived.average_actions_per_agent, 9);
        assert_eq!(derived.completed_actions, 30);
        assert_eq!(derived.overdue_actions, 15);
    }

    #[test]
    fn overall_percent_rounds_to_nearest() {
        // 1003 / 1500 = 66.87%
        let snap = snapshot([100, 200, 300, 400, 3], [0; 4]);
        let derived = DerivedMetrics::compute(&snap, &DerivationPolicy::default());
        assert_eq!(derived.overall_achieved_percent, 67);
        assert_eq!(derived.total_actions, 0);
        assert_eq!(derived.average_actions_per_agent, 0);
    }

    #[test]
    fn severities_follow_category_order() {
        // 64%, 65%, 79.7%, 80%, 100%
        let snap = snapshot([64, 130, 239, 320, 500], [1, 1, 1, 1]);
        let derived = DerivedMetrics::compute(&snap, &DerivationPolicy::default());
        assert_eq!(
            derived.severities,
            [
                Severity::Critical,
                Severity::Warning,
                Severity::Warning,
                Severity::Satisfactory,
                Severity::Satisfactory,
            ]
        );
        assert_eq!(derived.severity(TaxCategory::Iss), Severity::Critical);
        assert_eq!(derived.severity(TaxCategory::Itr), Severity::Satisfactory);
    }

    #[test]
    fn zero_agents_average_is_zero() {
        let snap = snapshot([1; 5], [10; 4]);
        let policy = DerivationPolicy {
            agent_count: 0,
            ..DerivationPolicy::default()
        };
        let derived = DerivedMetrics::compute(&snap, &policy);
        assert_eq!(derived.average_actions_per_agent, 0);
    }

    #[test]
    fn alerts_list_critical_before_warning() {
        // ISS warning (70%), IPTU satisfactory, ITBI critical (10%)
        let snap = snapshot([70, 200, 30, 400, 500], [1, 1, 4, 1]);
        let derived = DerivedMetrics::compute(&snap, &DerivationPolicy::default());
        let alerts = alerts(&snap, &derived);

        assert_eq!(alerts.len(), 3);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(
            alerts[0].subject,
            AlertSubject::BelowTarget {
                category: TaxCategory::Itbi
            }
        );
        assert_eq!(alerts[0].achieved_percent, Some(10.0));
        assert_eq!(
            alerts[1].subject,
            AlertSubject::BelowTarget {
                category: TaxCategory::Iss
            }
        );
        assert_eq!(alerts[2].subject, AlertSubject::OverdueActions { count: 4 });
    }

    #[test]
    fn no_alerts_when_everything_on_target() {
        let snap = snapshot([100, 200, 300, 400, 500], [5, 5, 0, 5]);
        let derived = DerivedMetrics::compute(&snap, &DerivationPolicy::default());
        assert!(alerts(&snap, &derived).is_empty());
    }
}

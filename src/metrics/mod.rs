//! Dashboard data model.
//!
//! A [`Snapshot`] holds the three mock datasets produced by one generation
//! cycle:
//!
//! - revenue collected per tax category against its annual target
//! - enforcement-action counts per status
//! - progress on the priority projects
//!
//! Cardinalities are fixed by the array types. Snapshots are replaced
//! wholesale and never patched field by field.
//!
//! Submodules:
//! - [`source`]: the [`MetricSource`](source::MetricSource) capability and
//!   its bounded-random implementation
//! - [`derived`]: totals, percentages and severity classification
pub mod derived;
pub mod source;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Revenue
// ---------------------------------------------------------------------------

/// Tax categories tracked by the revenue panel, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaxCategory {
    Iss,
    Iptu,
    Itbi,
    Trsd,
    Itr,
}

impl TaxCategory {
    pub const ALL: [Self; 5] = [Self::Iss, Self::Iptu, Self::Itbi, Self::Trsd, Self::Itr];

    /// Short display code, e.g. `"IPTU"`.
    pub fn code(self) -> &'static str {
        match self {
            Self::Iss => "ISS",
            Self::Iptu => "IPTU",
            Self::Itbi => "ITBI",
            Self::Trsd => "TRSD",
            Self::Itr => "ITR",
        }
    }

    /// Position of this category inside [`Snapshot::revenue`].
    pub fn index(self) -> usize {
        match self {
            Self::Iss => 0,
            Self::Iptu => 1,
            Self::Itbi => 2,
            Self::Trsd => 3,
            Self::Itr => 4,
        }
    }

    /// Key of this category's section under `[revenue]`.
    pub fn config_key(self) -> &'static str {
        match self {
            Self::Iss => "iss",
            Self::Iptu => "iptu",
            Self::Itbi => "itbi",
            Self::Trsd => "trsd",
            Self::Itr => "itr",
        }
    }
}

impl std::fmt::Display for TaxCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Collected revenue for one category.
///
/// `achieved_percent` is computed by the constructor, so it always agrees
/// with `collected` and `target`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueCategoryMetric {
    category: TaxCategory,
    target: u64,
    collected: u64,
    achieved_percent: f64,
}

impl RevenueCategoryMetric {
    pub fn new(category: TaxCategory, target: u64, collected: u64) -> Self {
        Self {
            category,
            target,
            collected,
            achieved_percent: achieved_percent(collected, target),
        }
    }

    pub fn category(&self) -> TaxCategory {
        self.category
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    pub fn collected(&self) -> u64 {
        self.collected
    }

    pub fn achieved_percent(&self) -> f64 {
        self.achieved_percent
    }

    /// Replace the collected amount, recomputing the achieved percentage.
    pub fn with_collected(self, collected: u64) -> Self {
        Self::new(self.category, self.target, collected)
    }
}

/// Percentage of `target` reached by `collected`, rounded half-up to one
/// decimal place.
///
/// Returns `0.0` for a zero target. Validated configuration never produces
/// one.
pub fn achieved_percent(collected: u64, target: u64) -> f64 {
    if target == 0 {
        return 0.0;
    }
    (collected as f64 / target as f64 * 1000.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Enforcement actions
// ---------------------------------------------------------------------------

/// Status of an enforcement action. Declaration order is the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Completed,
    InProgress,
    Overdue,
    NotStarted,
}

impl ActionStatus {
    pub const ALL: [Self; 4] = [
        Self::Completed,
        Self::InProgress,
        Self::Overdue,
        Self::NotStarted,
    ];

    /// Position of this status inside [`Snapshot::enforcement`].
    pub fn index(self) -> usize {
        match self {
            Self::Completed => 0,
            Self::InProgress => 1,
            Self::Overdue => 2,
            Self::NotStarted => 3,
        }
    }

    /// Key of this status's section under `[enforcement]`.
    pub fn config_key(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::InProgress => "in_progress",
            Self::Overdue => "overdue",
            Self::NotStarted => "not_started",
        }
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.config_key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnforcementActionMetric {
    pub status: ActionStatus,
    pub count: u32,
}

// ---------------------------------------------------------------------------
// Priority projects
// ---------------------------------------------------------------------------

/// The strategic projects tracked on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectId {
    HydroPlantsIptu,
    InspectionFee,
    ItbiObservatory,
}

impl ProjectId {
    pub const ALL: [Self; 3] = [
        Self::HydroPlantsIptu,
        Self::InspectionFee,
        Self::ItbiObservatory,
    ];

    /// Position of this project inside [`Snapshot::projects`].
    pub fn index(self) -> usize {
        match self {
            Self::HydroPlantsIptu => 0,
            Self::InspectionFee => 1,
            Self::ItbiObservatory => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::HydroPlantsIptu => "IPTU Usinas Rio Madeira",
            Self::InspectionFee => "Taxa Fiscalização (4.516 contrib.)",
            Self::ItbiObservatory => "ITBI (Observatório Imobiliário)",
        }
    }

    pub fn potential_value_label(self) -> &'static str {
        match self {
            Self::HydroPlantsIptu => "R$ 40 milhões/ano",
            Self::InspectionFee => "R$ 0,5 milhão/ano",
            Self::ItbiObservatory => "R$ 5 milhões/ano",
        }
    }

    pub fn status_label(self) -> &'static str {
        match self {
            Self::HydroPlantsIptu => "Em análise",
            Self::InspectionFee => "Em execução",
            Self::ItbiObservatory => "Em desenvolvimento",
        }
    }

    /// Key of this project's section under `[projects]`.
    pub fn config_key(self) -> &'static str {
        match self {
            Self::HydroPlantsIptu => "hydro_plants_iptu",
            Self::InspectionFee => "inspection_fee",
            Self::ItbiObservatory => "itbi_observatory",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityProject {
    pub project: ProjectId,
    pub name: &'static str,
    pub potential_value_label: &'static str,
    pub status_label: &'static str,
    pub progress_percent: u8,
}

impl PriorityProject {
    pub fn new(project: ProjectId, progress_percent: u8) -> Self {
        Self {
            project,
            name: project.name(),
            potential_value_label: project.potential_value_label(),
            status_label: project.status_label(),
            progress_percent,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One complete generation cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub revenue: [RevenueCategoryMetric; 5],
    pub enforcement: [EnforcementActionMetric; 4],
    pub projects: [PriorityProject; 3],
}

impl Snapshot {
    pub fn revenue_for(&self, category: TaxCategory) -> &RevenueCategoryMetric {
        &self.revenue[category.index()]
    }

    pub fn actions(&self, status: ActionStatus) -> u32 {
        self.enforcement[status.index()].count
    }
}

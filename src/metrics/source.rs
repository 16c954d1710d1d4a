//! Snapshot generation.
//!
//! [`MetricSource`] is the seam between the refresh scheduler and whatever
//! produces the data. The dashboard ships one implementation,
//! [`RandomSource`], which draws every figure uniformly from the validated
//! ranges in [`MetricTables`]. Tests substitute deterministic sources.
//!
//! # Default tables
//!
//! | Category | Target      | Collected range           |
//! |----------|-------------|---------------------------|
//! | ISS      | 258,196,651 | 180,000,000 – 260,000,000 |
//! | IPTU     | 40,976,191  | 30,000,000 – 42,000,000   |
//! | ITBI     | 24,882,600  | 17,000,000 – 25,000,000   |
//! | TRSD     | 35,760,432  | 20,000,000 – 36,000,000   |
//! | ITR      | 3,395,740   | 1,900,000 – 3,400,000     |

use std::fmt::Display;

use rand::distributions::uniform::SampleUniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{
    ActionStatus, EnforcementActionMetric, PriorityProject, ProjectId, RevenueCategoryMetric,
    Snapshot, TaxCategory,
};
use crate::config::FiscalDashConfig;
use crate::error::{ConfigError, ConfigResult};

/// `(category, target, min collected, max collected)`
pub const DEFAULT_REVENUE: [(TaxCategory, u64, u64, u64); 5] = [
    (TaxCategory::Iss, 258_196_651, 180_000_000, 260_000_000),
    (TaxCategory::Iptu, 40_976_191, 30_000_000, 42_000_000),
    (TaxCategory::Itbi, 24_882_600, 17_000_000, 25_000_000),
    (TaxCategory::Trsd, 35_760_432, 20_000_000, 36_000_000),
    (TaxCategory::Itr, 3_395_740, 1_900_000, 3_400_000),
];

/// `(status, min count, max count)`
pub const DEFAULT_ENFORCEMENT: [(ActionStatus, u32, u32); 4] = [
    (ActionStatus::Completed, 25, 40),
    (ActionStatus::InProgress, 50, 70),
    (ActionStatus::Overdue, 10, 25),
    (ActionStatus::NotStarted, 20, 30),
];

/// `(project, min progress, max progress)`
pub const DEFAULT_PROJECTS: [(ProjectId, u8, u8); 3] = [
    (ProjectId::HydroPlantsIptu, 20, 40),
    (ProjectId::InspectionFee, 40, 60),
    (ProjectId::ItbiObservatory, 10, 30),
];

// ---------------------------------------------------------------------------
// MetricSource
// ---------------------------------------------------------------------------

/// Produces a complete [`Snapshot`] per call.
///
/// Implementations must not fail: any validation belongs to construction.
pub trait MetricSource {
    fn generate(&mut self) -> Snapshot;
}

impl<T: MetricSource + ?Sized> MetricSource for Box<T> {
    fn generate(&mut self) -> Snapshot {
        (**self).generate()
    }
}

// ---------------------------------------------------------------------------
// Validated tables
// ---------------------------------------------------------------------------

/// Inclusive draw range. Only constructible with `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRange<T> {
    min: T,
    max: T,
}

impl<T: PartialOrd + Copy + Display> DrawRange<T> {
    pub fn new(field: &str, min: T, max: T) -> ConfigResult<Self> {
        if min > max {
            return Err(ConfigError::invalid(
                field,
                format!("min {min} exceeds max {max}"),
            ));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> T {
        self.min
    }

    pub fn max(&self) -> T {
        self.max
    }

    pub fn contains(&self, value: T) -> bool {
        self.min <= value && value <= self.max
    }
}

impl<T: SampleUniform + PartialOrd + Copy> DrawRange<T> {
    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        rng.gen_range(self.min..=self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevenueTable {
    pub category: TaxCategory,
    pub target: u64,
    pub collected: DrawRange<u64>,
}

/// Generation policy for every dataset, checked once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricTables {
    revenue: [RevenueTable; 5],
    enforcement: [(ActionStatus, DrawRange<u32>); 4],
    projects: [(ProjectId, DrawRange<u8>); 3],
}

impl MetricTables {
    /// Built-in tables. Known valid, so no validation pass is needed.
    pub fn standard() -> Self {
        Self {
            revenue: DEFAULT_REVENUE.map(|(category, target, min, max)| RevenueTable {
                category,
                target,
                collected: DrawRange { min, max },
            }),
            enforcement: DEFAULT_ENFORCEMENT
                .map(|(status, min, max)| (status, DrawRange { min, max })),
            projects: DEFAULT_PROJECTS.map(|(project, min, max)| (project, DrawRange { min, max })),
        }
    }

    /// Validate the `[revenue]`, `[enforcement]` and `[projects]` sections.
    ///
    /// Rejects inverted ranges, zero targets and progress above 100%.
    pub fn from_config(config: &FiscalDashConfig) -> ConfigResult<Self> {
        for category in TaxCategory::ALL {
            let field = format!("revenue.{}", category.config_key());
            let entry = config.revenue.get(category);
            if entry.target == 0 {
                return Err(ConfigError::invalid(field, "target must be positive"));
            }
            DrawRange::new(&field, entry.min, entry.max)?;
        }
        for status in ActionStatus::ALL {
            let field = format!("enforcement.{}", status.config_key());
            let entry = config.enforcement.get(status);
            DrawRange::new(&field, entry.min, entry.max)?;
        }
        for project in ProjectId::ALL {
            let field = format!("projects.{}", project.config_key());
            let entry = config.projects.get(project);
            DrawRange::new(&field, entry.min, entry.max)?;
            if entry.max > 100 {
                return Err(ConfigError::invalid(
                    field,
                    format!("progress max {} exceeds 100", entry.max),
                ));
            }
        }

        // Snapshot totals are summed in the entries' own integer types.
        let revenue = TaxCategory::ALL.map(|c| config.revenue.get(c));
        if checked_total(revenue.iter().map(|e| e.max)).is_none()
            || checked_total(revenue.iter().map(|e| e.target)).is_none()
        {
            return Err(ConfigError::invalid(
                "revenue",
                "sum of targets or maximum collections overflows",
            ));
        }
        let most_actions = ActionStatus::ALL
            .iter()
            .try_fold(0u32, |acc, &s| acc.checked_add(config.enforcement.get(s).max));
        if most_actions.is_none() {
            return Err(ConfigError::invalid(
                "enforcement",
                "sum of maximum counts overflows",
            ));
        }

        Ok(Self {
            revenue: TaxCategory::ALL.map(|category| {
                let entry = config.revenue.get(category);
                RevenueTable {
                    category,
                    target: entry.target,
                    collected: DrawRange {
                        min: entry.min,
                        max: entry.max,
                    },
                }
            }),
            enforcement: ActionStatus::ALL.map(|status| {
                let entry = config.enforcement.get(status);
                (status, DrawRange { min: entry.min, max: entry.max })
            }),
            projects: ProjectId::ALL.map(|project| {
                let entry = config.projects.get(project);
                (project, DrawRange { min: entry.min, max: entry.max })
            }),
        })
    }

    pub fn revenue(&self) -> &[RevenueTable; 5] {
        &self.revenue
    }

    pub fn enforcement(&self, status: ActionStatus) -> DrawRange<u32> {
        self.enforcement[status.index()].1
    }

    pub fn project(&self, project: ProjectId) -> DrawRange<u8> {
        self.projects[project.index()].1
    }
}

fn checked_total(mut values: impl Iterator<Item = u64>) -> Option<u64> {
    values.try_fold(0u64, u64::checked_add)
}

impl Default for MetricTables {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// RandomSource
// ---------------------------------------------------------------------------

/// Bounded-random mock data, standing in for a real collection feed.
#[derive(Debug, Clone)]
pub struct RandomSource<R = StdRng> {
    tables: MetricTables,
    rng: R,
}

impl RandomSource<StdRng> {
    /// Seed from operating-system entropy.
    pub fn from_entropy(tables: MetricTables) -> Self {
        Self::with_rng(tables, StdRng::from_entropy())
    }

    /// Reproducible sequence of snapshots for a given seed.
    pub fn seeded(tables: MetricTables, seed: u64) -> Self {
        Self::with_rng(tables, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomSource<R> {
    pub fn with_rng(tables: MetricTables, rng: R) -> Self {
        Self { tables, rng }
    }

    pub fn tables(&self) -> &MetricTables {
        &self.tables
    }
}

impl<R: Rng> MetricSource for RandomSource<R> {
    fn generate(&mut self) -> Snapshot {
        let rng = &mut self.rng;
        let tables = &self.tables;

        let revenue = tables.revenue.map(|row| {
            RevenueCategoryMetric::new(row.category, row.target, row.collected.draw(&mut *rng))
        });
        let enforcement = tables.enforcement.map(|(status, range)| EnforcementActionMetric {
            status,
            count: range.draw(&mut *rng),
        });
        let projects = tables
            .projects
            .map(|(project, range)| PriorityProject::new(project, range.draw(&mut *rng)));

        Snapshot {
            revenue,
            enforcement,
            projects,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Municipal tax-collection dashboard fed by simulated data.
//!
//! The core is three pieces:
//! - [`metrics::source`]: the [`MetricSource`](metrics::source::MetricSource)
//!   seam and its bounded-random implementation
//! - [`scheduler`]: periodic regeneration and publication to subscribers
//! - [`metrics::derived`]: totals, percentages and severity bands
//!
//! [`config`] validates everything up front; [`cli`] renders to a terminal.
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod scheduler;

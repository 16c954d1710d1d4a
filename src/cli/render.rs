//! Terminal rendering of a published snapshot.
//!
//! Everything here is presentation: currency and percent formatting, bars,
//! and the colour cue for each severity band. The core never calls into it.

use chrono::Local;
use colored::{ColoredString, Colorize};

use crate::metrics::derived::{Alert, AlertSubject, Severity, alerts};
use crate::metrics::{ActionStatus, TaxCategory};
use crate::scheduler::Published;

const BAR_WIDTH: usize = 30;
const RULE_WIDTH: usize = 72;

/// Render the full dashboard for one update.
pub fn dashboard(update: &Published) -> String {
    let mut out = String::new();
    let snapshot = &update.snapshot;
    let derived = &update.derived;

    // Header
    out.push_str(&format!(
        "{}\n",
        "Sistema de Gestão Fiscal - Porto Velho".bold().cyan()
    ));
    out.push_str(&format!(
        "{}\n",
        format!(
            "Last update: {}  (#{})",
            update
                .generated_at
                .with_timezone(&Local)
                .format("%d/%m/%Y %H:%M:%S"),
            update.sequence
        )
        .dimmed()
    ));
    out.push_str(&format!("{}\n\n", "=".repeat(RULE_WIDTH)));

    // Summary
    out.push_str(&format!(
        "  {} {}  {} {}  {}\n",
        "Collected:".bold(),
        format_brl(derived.total_collected),
        "Target:".bold(),
        format_brl(derived.total_target),
        format!("{}%", derived.overall_achieved_percent).yellow()
    ));
    out.push_str(&format!(
        "  {} {}  {}  {}  {} {}\n\n",
        "Enforcement actions:".bold(),
        derived.total_actions,
        format!("{} completed", derived.completed_actions).green(),
        format!("{} overdue", derived.overdue_actions).red(),
        "avg/agent:".dimmed(),
        derived.average_actions_per_agent
    ));

    // Revenue by category
    out.push_str(&format!("{}\n", "Revenue by Category".bold().cyan()));
    out.push_str(&format!(
        "  {:<6} {:>7}  {:<width$} {:>17} {:>17}\n",
        "Tax",
        "Achv.",
        "",
        "Collected",
        "Target",
        width = BAR_WIDTH
    ));
    out.push_str(&format!("  {}\n", "-".repeat(RULE_WIDTH - 2)));
    for (metric, severity) in snapshot.revenue.iter().zip(derived.severities) {
        out.push_str(&format!(
            "  {:<6} {:>7}  {} {:>17} {:>17}\n",
            metric.category().code().bold(),
            format_percent(metric.achieved_percent()),
            severity_cue(severity, &bar(metric.achieved_percent(), BAR_WIDTH)),
            format_brl(metric.collected()),
            format_brl(metric.target()),
        ));
    }
    out.push('\n');

    // Enforcement actions
    out.push_str(&format!("{}\n", "Enforcement Action Status".bold().cyan()));
    for action in &snapshot.enforcement {
        out.push_str(&format!(
            "  {:<14} {}\n",
            status_label(action.status),
            status_cue(action.status, &format!("{:>4}", action.count))
        ));
    }
    out.push_str(&format!(
        "  {}\n\n",
        format!(
            "Average: {} actions/agent",
            derived.average_actions_per_agent
        )
        .dimmed()
    ));

    // Priority projects
    out.push_str(&format!("{}\n", "Priority Projects".bold().cyan()));
    for project in &snapshot.projects {
        out.push_str(&format!(
            "  {:<36} {:<18} {:<20} {} {:>3}%\n",
            truncate(project.name, 36),
            project.potential_value_label.green(),
            project.status_label,
            bar(f64::from(project.progress_percent), 20).blue(),
            project.progress_percent
        ));
    }
    out.push('\n');

    // Alerts
    let alerts = alerts(snapshot, derived);
    let critical = alerts
        .iter()
        .filter(|a| a.severity == Severity::Critical)
        .count();
    out.push_str(&format!(
        "{}  {}\n",
        "Alerts".bold().cyan(),
        format!("{critical} critical").red()
    ));
    if alerts.is_empty() {
        out.push_str(&format!("  {}\n", "No alerts.".dimmed()));
    }
    for alert in &alerts {
        out.push_str(&format!(
            "  {} {}\n",
            severity_cue(alert.severity, "●"),
            alert_text(alert)
        ));
    }

    out
}

/// One-line description of an alert.
pub fn alert_text(alert: &Alert) -> String {
    match alert.subject {
        AlertSubject::BelowTarget { category } => format!(
            "{} collection below target: {} of annual goal",
            category,
            format_percent(alert.achieved_percent.unwrap_or_default())
        ),
        AlertSubject::OverdueActions { count } => {
            format!("{count} enforcement actions overdue")
        }
    }
}

pub fn status_label(status: ActionStatus) -> &'static str {
    match status {
        ActionStatus::Completed => "Completed",
        ActionStatus::InProgress => "In progress",
        ActionStatus::Overdue => "Overdue",
        ActionStatus::NotStarted => "Not started",
    }
}

/// Colour cue for a severity band.
pub fn severity_cue(severity: Severity, text: &str) -> ColoredString {
    match severity {
        Severity::Critical => text.red(),
        Severity::Warning => text.yellow(),
        Severity::Satisfactory => text.green(),
    }
}

fn status_cue(status: ActionStatus, text: &str) -> ColoredString {
    match status {
        ActionStatus::Completed => text.green(),
        ActionStatus::InProgress => text.blue(),
        ActionStatus::Overdue => text.red(),
        ActionStatus::NotStarted => text.normal(),
    }
}

/// Category-level row for CSV output.
pub fn csv_row(category: TaxCategory, update: &Published) -> String {
    let metric = update.snapshot.revenue_for(category);
    format!(
        "{},{},{},{:.1},{}",
        category,
        metric.target(),
        metric.collected(),
        metric.achieved_percent(),
        update.derived.severity(category),
    )
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Format an amount as Brazilian reais with no decimals: `R$ 40.976.191`.
pub fn format_brl(amount: u64) -> String {
    let s = amount.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push('.');
        }
        result.push(ch);
    }
    format!("R$ {}", result.chars().rev().collect::<String>())
}

/// One decimal place, pt-BR decimal comma: `48,8%`.
pub fn format_percent(value: f64) -> String {
    format!("{value:.1}%").replace('.', ",")
}

/// Horizontal bar filled to `percent`, capped at 100%.
pub fn bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Truncate a string to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

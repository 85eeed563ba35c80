//! Output formatting helpers for CLI commands

use crate::gateway::GatewayStatsSnapshot;
use crate::intent::RoutePath;
use crate::quota::{QuotaHealth, QuotaSnapshot};
use crate::router::TurnOutcome;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

/// Colored tag for a routing path
pub fn path_label(path: RoutePath) -> String {
    match path {
        RoutePath::Template => path.as_str().cyan().to_string(),
        RoutePath::PatternOnly => path.as_str().blue().to_string(),
        RoutePath::HandlerDirect => path.as_str().green().to_string(),
        RoutePath::ModelGateway => path.as_str().magenta().to_string(),
    }
}

pub fn health_label(health: QuotaHealth) -> String {
    match health {
        QuotaHealth::Healthy => "Healthy".green().to_string(),
        QuotaHealth::Warning => "Warning".yellow().to_string(),
        QuotaHealth::Critical => "Critical".red().to_string(),
    }
}

/// One-line routing summary printed under a reply
pub fn format_route_line(outcome: &TurnOutcome) -> String {
    let mut line = format!(
        "[{} · {} · quota {}/{}",
        path_label(outcome.path()),
        outcome.reason(),
        outcome.quota.remaining,
        outcome.quota.limit
    );
    if outcome.cached {
        line.push_str(" · cached");
    }
    if let Some(fallback) = outcome.fallback {
        line.push_str(&format!(" · fallback {}", fallback.to_string().yellow()));
    }
    line.push(']');
    line
}

/// Format the quota snapshot as a table
pub fn format_quota_table(quota: &QuotaSnapshot) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Day", "Used", "Limit", "Remaining", "Health"]);
    table.add_row(vec![
        Cell::new(quota.day),
        Cell::new(quota.used),
        Cell::new(quota.limit),
        Cell::new(quota.remaining),
        Cell::new(health_label(quota.health)),
    ]);
    table.to_string()
}

/// Format gateway counters as a table
pub fn format_stats_table(
    stats: &GatewayStatsSnapshot,
    sessions: usize,
    cache_entries: usize,
) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Metric", "Value"]);

    let rows: [(&str, u64); 8] = [
        ("Cache hits", stats.cache_hits),
        ("Upstream calls", stats.upstream_calls),
        ("Upstream failures", stats.upstream_failures),
        ("Rate limited", stats.rate_limited),
        ("Refused (quota)", stats.refused),
        ("Duplicates suppressed", stats.duplicates),
        ("Cached responses", cache_entries as u64),
        ("Active sessions", sessions as u64),
    ];
    for (name, value) in rows {
        table.add_row(vec![Cell::new(name), Cell::new(value)]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn snapshot(remaining: u32, health: QuotaHealth) -> QuotaSnapshot {
        QuotaSnapshot {
            day: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            used: 50 - remaining,
            limit: 50,
            remaining,
            health,
        }
    }

    #[test]
    fn test_quota_table_contents() {
        let output = format_quota_table(&snapshot(8, QuotaHealth::Critical));
        assert!(output.contains("Remaining"));
        assert!(output.contains("2025-03-01"));
        assert!(output.contains("Critical"));
    }

    #[test]
    fn test_stats_table_lists_every_counter() {
        let stats = GatewayStatsSnapshot {
            cache_hits: 3,
            upstream_calls: 4,
            upstream_failures: 1,
            rate_limited: 0,
            refused: 2,
            duplicates: 0,
        };
        let output = format_stats_table(&stats, 5, 4);
        for label in ["Cache hits", "Upstream calls", "Refused (quota)", "Active sessions"] {
            assert!(output.contains(label), "missing {}", label);
        }
    }
}

// src/io/reporting.rs

use crate::simulation::config::WEEK;
use crate::simulation::stats::StatManager;
use serde::Serialize;
use tracing::info;

/// Episode metrics, as printed by the binary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeSummary {
    /// Recorded (post-transient) days.
    pub days: usize,
    pub weeks: f64,
    pub average_profit: f64,
    pub average_scrapped: f64,
    pub average_unmet: f64,
    pub total_revenue: f64,
    pub total_purchase_cost: f64,
    /// Fraction of recorded days with lost sales, per channel.
    pub stock_out: Vec<(String, f64)>,
}

impl EpisodeSummary {
    pub fn from_stats(stats: &StatManager) -> Self {
        let stock_out = stats
            .channel_names()
            .filter_map(|name| {
                stats
                    .stock_out_probability(name)
                    .ok()
                    .map(|probability| (name.to_string(), probability))
            })
            .collect();
        Self {
            days: stats.steps(),
            weeks: stats.steps() as f64 / WEEK as f64,
            average_profit: stats.average_profit(),
            average_scrapped: stats.average_scrapped(),
            average_unmet: stats.average_unmet(),
            total_revenue: stats.total_revenue(),
            total_purchase_cost: stats.total_purchase_cost(),
            stock_out,
        }
    }
}

/// Writes the summary to the log; nothing is persisted.
pub fn log_summary(policy: &str, summary: &EpisodeSummary) {
    info!(
        policy,
        days = summary.days,
        weeks = format_args!("{:.1}", summary.weeks),
        average_profit = format_args!("{:.3}", summary.average_profit),
        average_scrapped = format_args!("{:.3}", summary.average_scrapped),
        average_unmet = format_args!("{:.3}", summary.average_unmet),
        "episode finished"
    );
    for (channel, probability) in &summary.stock_out {
        info!(channel = %channel, stock_out = format_args!("{probability:.3}"), "stock-out probability");
    }
}

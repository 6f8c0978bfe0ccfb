// src/logging.rs

use std::str::FromStr;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber. Call once, from the binary.
///
/// `log_level` is either a bare level (`"debug"`) or a full `EnvFilter`
/// directive string (`"info,perishable_chain::model=debug"`).
pub fn setup_logging(log_level: &str, json_format: bool) {
    let filter_spec = log_level.trim();
    let filter = EnvFilter::from_str(filter_spec).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry().with(filter);

    if json_format {
        let json_layer = fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(false);
        subscriber.with(json_layer).init();
    } else {
        let fmt_layer = fmt::layer().with_target(true).compact();
        subscriber.with(fmt_layer).init();
    }

    tracing::info!(
        filter = filter_spec,
        format = if json_format { "json" } else { "compact" },
        "logging initialized"
    );
}

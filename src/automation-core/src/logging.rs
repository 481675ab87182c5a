use std::str::FromStr;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. Safe to call more than once; later calls are no-ops.
///
/// A bare level ("debug") is applied to the engine crates only; directive strings containing
/// ',' or '=' are used as given.
pub fn setup_logging(log_level: &str, json_format: bool) {
    let normalized = log_level.trim();
    let filter_spec = if normalized.contains(',') || normalized.contains('=') {
        normalized.to_string()
    } else {
        format!("warn,automation_core={normalized},automation_types={normalized}")
    };
    let filter = EnvFilter::from_str(&filter_spec).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = if json_format {
        let json_layer = fmt::layer()
            .json()
            .with_target(false)
            .with_current_span(false);
        subscriber.with(json_layer).try_init().is_ok()
    } else {
        let fmt_layer = fmt::layer().with_target(true).compact();
        subscriber.with(fmt_layer).try_init().is_ok()
    };

    if installed {
        tracing::info!(
            filter = %filter_spec,
            format = if json_format { "json" } else { "compact" },
            "logging initialized"
        );
    }
}

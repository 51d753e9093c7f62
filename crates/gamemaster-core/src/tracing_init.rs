//! Logging setup for the `gamemaster` binary.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset: `level` for the referee's own targets
/// (including diagnostics under `gamemaster::diagnostic`), default for the rest.
pub fn default_filter(level: &str) -> String {
    format!("gamemaster_referee={level},gamemaster_core={level},gamemaster={level}")
}

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` wins over `level`. With `log_json` each event is one JSON line.
pub fn init_tracing(level: &str, log_json: bool) {
    let env_filter = std::env::var("RUST_LOG")
        .map_or_else(|_| EnvFilter::new(default_filter(level)), EnvFilter::new);
    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(env_filter);
    if log_json {
        registry.with(fmt.json()).init();
    } else {
        registry.with(fmt).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_covers_referee_targets() {
        let filter = default_filter("debug");
        assert!(filter.contains("gamemaster_referee=debug"));
        assert!(filter.contains("gamemaster=debug"));
    }
}

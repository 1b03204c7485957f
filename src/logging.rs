// src/logging.rs
use tracing_subscriber::{fmt, EnvFilter, FmtSubscriber};

const DEFAULT_FILTER: &str = "info,ghcn_season=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init() {
    fmt::Subscriber::builder()
        .with_env_filter(env_filter())
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
}

/// Subscriber for tests; later calls are no-ops.
pub fn init_for_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter())
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

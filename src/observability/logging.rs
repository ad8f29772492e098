//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Resolve the filter from the CLI flag, then `RUST_LOG`, then the default

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither a flag nor `RUST_LOG` is set.
pub const DEFAULT_FILTER: &str = "candy_operator=info";

/// Build the filter for `level`. A bare level (`debug`) applies to this crate only.
pub fn env_filter(level: Option<&str>) -> EnvFilter {
    match level {
        Some(level) if !level.contains('=') => EnvFilter::new(format!("candy_operator={}", level)),
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()),
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(level: Option<&str>) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

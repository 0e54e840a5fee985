// src/logging.rs
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber: `RUST_LOG` controls the filter, `info`
/// when unset. Safe to call more than once; later calls are no-ops.
pub fn init() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt::Subscriber::builder().with_env_filter(env).try_init();
}

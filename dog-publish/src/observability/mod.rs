pub mod metrics;

pub use metrics::{LiveMetrics, MetricsSnapshot, SubscriberMetrics};

/// Install a fmt subscriber; `RUST_LOG` overrides `default_filter`.
///
/// Set `DOGPUB_LOG_JSON=1` for JSON lines. Returns an error if a global
/// subscriber is already installed.
#[cfg(feature = "tracing-basic")]
pub fn init_tracing(default_filter: &str) -> crate::PublishResult<()> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let json = std::env::var("DOGPUB_LOG_JSON").map(|v| v == "1").unwrap_or(false);

    let result = if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };
    result.map_err(|e| crate::PublishError::Config(format!("tracing init failed: {e}")))
}

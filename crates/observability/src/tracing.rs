//! Tracing/logging initialization.
//!
//! JSON lines with timestamps, filtered by `RUST_LOG` (default `info`).
//! Stock-integrity failures are emitted at `error` by the infra services.

use tracing_subscriber::EnvFilter;

/// Default directive when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with_filter(filter_from_env());
}

/// Initialize with an explicit filter (e.g. `"storefront_infra=debug"`).
pub fn init_with_filter(filter: EnvFilter) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .with_current_span(true)
        .try_init();
}

fn filter_from_env() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_a_no_op() {
        init_with_filter(EnvFilter::new("debug"));
        init();
        ::tracing::info!(order = "o-1", "logged after double init");
    }
}

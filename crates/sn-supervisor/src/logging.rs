//! Structured logging init, shared by the API and both worker binaries.
//! Grounded on this codebase's existing `tracing_subscriber::fmt` +
//! `EnvFilter` startup sequence (`ferrumyx-agent/src/main.rs`), generalized
//! to take the filter string from `AppConfig::log_filter` (`SN_LOG`,
//! SPEC_FULL.md §6) instead of a hardcoded default.
use tracing_subscriber::EnvFilter;

/// Installs the process-wide `tracing` subscriber. `default_filter` is used
/// only when `RUST_LOG` isn't set in the environment — `SN_LOG` is read by
/// the caller and passed in here rather than read twice.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter.to_string()));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

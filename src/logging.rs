//! Tracing subscriber setup for binaries and ad-hoc debugging.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs a fmt subscriber. `RUST_LOG` takes precedence over `default_filter`.
///
/// Returns false if a global subscriber was already installed.
pub fn init(default_filter: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_thread_names(true))
        .with(env_filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        let _ = init("debug");
        assert!(!init("debug"));
    }
}

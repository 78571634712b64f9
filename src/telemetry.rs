//! Logging setup
//!
//! The library only emits `tracing` events; binaries and tests decide whether
//! and how to collect them.

use tracing::Level;

/// Install a fmt subscriber at INFO level
///
/// Safe to call more than once: later calls are no-ops.
pub fn init_logging() {
    init_logging_with_level(Level::INFO);
}

/// Install a fmt subscriber with an explicit maximum level
pub fn init_logging_with_level(level: Level) {
    // try_init fails if a global subscriber is already set, which is fine
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_logging();
        init_logging_with_level(Level::DEBUG);
        tracing::info!("logging initialised twice without panicking");
    }
}

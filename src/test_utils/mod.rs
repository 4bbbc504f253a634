//! Test utilities for denorm-cascade
//!
//! This module provides utilities for writing tests: one-time logging setup
//! and fixtures that declare small collection graphs and wire them to an
//! in-memory store.
//!
//! # Example
//!
//! ```rust,no_run
//! use denorm_cascade::core::Record;
//! use denorm_cascade::test_utils::{fixtures, init_test_logging};
//!
//! # async fn example() -> anyhow::Result<()> {
//! init_test_logging(None);
//! let engine = fixtures::memory_engine(fixtures::library_registry());
//! engine.save(&mut Record::new("Author", "a1").with("name", "Ada")).await?;
//! # Ok(())
//! # }
//! ```

pub mod fixtures;

pub use fixtures::{cycle_registry, diamond_registry, library_registry, memory_engine};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Installs a `tracing-subscriber` fmt subscriber once per process. The
/// provided level wins; otherwise `RUST_LOG` is honored; with neither, tests
/// stay silent.
///
/// To enable logging in tests via environment variable:
/// ```bash
/// RUST_LOG=denorm_cascade=trace cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

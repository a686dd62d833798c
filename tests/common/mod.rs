//! Common test utilities.
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//!
//! #[test]
//! fn my_test() {
//!     common::init_tracing();
//!     // ... test code with tracing::info!, tracing::debug!, etc.
//! }
//! ```
//!
//! `RUST_LOG` overrides the default `info` filter, e.g.
//! `RUST_LOG=lazylist=trace cargo test --features tracing`.

#![allow(dead_code)]

use std::sync::Once;

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Ensures tracing is only initialized once across all tests.
static INIT: Once = Once::new();

/// Install a console tracing subscriber.
///
/// Safe to call multiple times - only the first call takes effect.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_thread_ids(true)
            .with_target(true)
            .with_test_writer()
            .compact()
            .try_init();
    });
}

/// Deterministic per-thread key stream over `[0, range)`.
pub struct KeyStream {
    state: u64,
    range: u64,
}

impl KeyStream {
    pub fn new(seed: u64, range: u64) -> Self {
        Self {
            state: seed.wrapping_mul(0x517c_c1b7_2722_0a95) | 1,
            range,
        }
    }

    pub fn next_key(&mut self) -> i64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1);
        ((self.state >> 33) % self.range) as i64
    }
}

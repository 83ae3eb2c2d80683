//! Provision Testing Infrastructure
//!
//! Shared fixtures for testing datasources and the state machines behind
//! them: query types with non-trivial cache-compatibility, an in-memory
//! cache, scripted fetchers, observer recorders and proptest strategies.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! provision-testkit = { path = "../provision-testkit" }
//! ```
//!
//! ```rust,no_run
//! use provision_testkit::*;
//!
//! #[test]
//! fn my_test() {
//!     init_tracing();
//!     let state = success(&impulse("alice"), "data");
//!     assert!(state.is_settled_success());
//! }
//! ```

pub mod cache;
pub mod fetch;
pub mod fixtures;
pub mod query;
pub mod recorder;
pub mod strategies;

pub use cache::{InMemoryCache, ReadGate};
pub use fetch::{Gate, ScriptedFetcher};
pub use fixtures::*;
pub use query::TestQuery;
pub use recorder::StateRecorder;

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

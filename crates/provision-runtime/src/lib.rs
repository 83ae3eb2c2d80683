//! # Provision Runtime
//!
//! Tokio-backed orchestration for the state machines in `provision-core`.
//!
//! ## Key Components
//!
//! - **Datasource**: turns load impulses into one observable sequence of
//!   states (switch-to-latest fetching, cache combination, carryover)
//! - **DatasourceBuilder**: wires a fetcher, an optional cache, config and
//!   impulse sources together and spawns the driver task
//! - **Fetcher / CacheReader / CachePersister**: the effect ports a caller
//!   supplies; closures implement them directly
//! - **LoadImpulseEmitter**: imperative impulse handle, also usable as an
//!   impulse stream through `LoadImpulseEmitter::channel`
//! - **Property**: observable current value with poll and async subscriptions
//!
//! ## Usage
//!
//! ```rust,no_run
//! use provision_core::{LoadImpulse, NoQuery};
//! use provision_runtime::Datasource;
//!
//! # async fn run() -> Result<(), provision_runtime::DatasourceError> {
//! let datasource: Datasource<Vec<String>, NoQuery, String> = Datasource::builder()
//!     .request(|_impulse| async { Ok(vec!["first".to_string()]) })
//!     .initial_impulse(LoadImpulse::initial())
//!     .build()?;
//!
//! datasource.observe(|state| {
//!     if let Some(items) = state.value() {
//!         println!("{} items", items.len());
//!     }
//! })?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod datasource;
pub mod emitter;
pub mod errors;
pub mod ports;
pub mod property;
mod task;

pub use config::{CombinePreviousMode, DatasourceConfig, PersistPolicy};
pub use datasource::{Datasource, DatasourceBuilder, ObserverId};
pub use emitter::{ImpulseStream, LoadImpulseEmitter};
pub use errors::DatasourceError;
pub use ports::{request_fetcher, Cache, CachePersister, CacheReader, Fetcher, StateStream};
pub use property::{Property, Subscription};

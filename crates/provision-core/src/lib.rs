//! Provision Core - Resource State Reconciliation
//!
//! This crate models a *resource*: a value fetched from outside of memory
//! (an API, a disk cache) observed as a sequence of discrete [`State`]s.
//! It contains only pure, runtime-agnostic types and state machines; the
//! Tokio-backed orchestration lives in `provision-runtime`.
//!
//! # Building Blocks
//!
//! - [`Cacheable`]: decides whether a state produced for one query may be
//!   shown for another. Every merging decision in this crate goes through it.
//! - [`LoadImpulse`]: an identity-bearing request to (re)load a resource.
//! - [`State`]: provisioning phase, optional value, optional error and the
//!   impulse that produced it.
//! - [`IdentityBox`]: wraps values with a fresh identity so that state
//!   equality is O(1) and never structural.
//! - [`CacheCombiner`] / [`combine_upstream_with_cache`]: merges a live
//!   upstream state with a cache-read state.
//! - [`CombinePrevious`]: carries the last success value or error forward
//!   into subsequent loading and error states.
//!
//! # Safety Rule
//!
//! A state's value or error is only usable for an impulse if the state's own
//! impulse is cache-compatible with it. Results that fail this check degrade
//! to [`ProvisioningState::NotReady`] instead of leaking into view state.

#![forbid(unsafe_code)]

/// Cache-compatibility contract for query types
pub mod query;

/// Identity-carrying value wrapper
pub mod identity;

/// Load impulses and their metadata
pub mod impulse;

/// Resource states and provisioning phases
pub mod state;

/// Upstream/cache state combination
pub mod combine;

/// Fallback carryover engine
pub mod carryover;

/// `Stream` adapters over state sequences
pub mod stream;

/// Error types
pub mod errors;

pub use carryover::CombinePrevious;
pub use combine::{combine_upstream_with_cache, CacheCombiner};
pub use errors::{ProvisionError, Result};
pub use identity::IdentityBox;
pub use impulse::{ImpulseId, LoadActor, LoadContext, LoadImpulse, LoadImpulseKind};
pub use query::{Cacheable, NoQuery};
pub use state::{ProvisioningState, State};
pub use stream::StateStreamExt;

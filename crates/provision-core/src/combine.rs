//! Upstream/cache combination
//!
//! Merges the latest *upstream* state (the live fetch) with the latest
//! *cache-read* state into the state to emit for the impulse currently in
//! effect. Upstream always wins when both offer a cache-compatible value; the
//! cache is strictly a fallback source.
//!
//! ```text
//! upstream ──┐
//!            ├─► combine_upstream_with_cache(upstream, cached, impulse) ─► state
//! cached ────┘
//! ```
//!
//! The upstream source is not trusted to emit an interim `Loading` state for
//! every impulse change. The cache-compatibility of each *result* against the
//! current impulse is therefore the only thing that keeps data belonging to a
//! superseded request context (e.g. a logged-out user) out of view state.

use tracing::trace;

use crate::impulse::LoadImpulse;
use crate::query::Cacheable;
use crate::state::{ProvisioningState, State};

/// Combine an upstream state with a cached state for `impulse`.
///
/// Emitted states always carry `impulse` as their load impulse.
pub fn combine_upstream_with_cache<V, Q, F>(
    upstream: &State<V, Q, F>,
    cached: &State<V, Q, F>,
    impulse: &LoadImpulse<Q>,
) -> State<V, Q, F>
where
    Q: Cacheable,
    F: Clone,
{
    match upstream.provisioning_state() {
        ProvisioningState::NotReady | ProvisioningState::Loading => {
            if let Some(value) = upstream.cache_compatible_value(impulse) {
                State::loading(
                    impulse.clone(),
                    Some(value.clone()),
                    upstream.cache_compatible_error(impulse).cloned(),
                )
            } else if let Some(value) = cached.cache_compatible_value(impulse) {
                State::loading(
                    impulse.clone(),
                    Some(value.clone()),
                    cached.cache_compatible_error(impulse).cloned(),
                )
            } else if upstream.is_loading() {
                // Surface a stale upstream error while the refresh is in flight
                State::loading(
                    impulse.clone(),
                    None,
                    upstream.cache_compatible_error(impulse).cloned(),
                )
            } else {
                State::not_ready()
            }
        }
        ProvisioningState::Result => {
            if let Some(value) = upstream.cache_compatible_value(impulse) {
                match upstream.error() {
                    Some(error) => {
                        State::failure(impulse.clone(), error.clone(), Some(value.clone()))
                    }
                    None => State::success(impulse.clone(), value.clone(), None),
                }
            } else if let Some(error) = upstream.cache_compatible_error(impulse) {
                State::failure(
                    impulse.clone(),
                    error.clone(),
                    cached.cache_compatible_value(impulse).cloned(),
                )
            } else {
                trace!(
                    impulse = %impulse.id(),
                    "discarding upstream result that is not cache-compatible with current impulse"
                );
                State::not_ready()
            }
        }
    }
}

/// Latest-of-both combiner.
///
/// Holds the most recent upstream state, the most recent cache state and the
/// impulse in effect, and recombines whenever either side changes.
///
/// # Example
///
/// ```rust
/// use provision_core::{CacheCombiner, LoadImpulse, State};
///
/// let impulse = LoadImpulse::initial();
/// let mut combiner: CacheCombiner<String, _, ()> = CacheCombiner::new();
/// combiner.set_impulse(impulse.clone());
///
/// let loading = combiner.on_upstream(State::loading(impulse.clone(), None, None));
/// assert!(loading.value().is_none());
///
/// let cached = combiner.on_cache(State::from_value(impulse.clone(), "cached".into()));
/// assert_eq!(cached.value().map(|v| v.as_str()), Some("cached"));
/// ```
#[derive(Debug)]
pub struct CacheCombiner<V, Q, F> {
    impulse: Option<LoadImpulse<Q>>,
    upstream: State<V, Q, F>,
    cached: State<V, Q, F>,
}

impl<V, Q, F> CacheCombiner<V, Q, F>
where
    Q: Cacheable,
    F: Clone,
{
    /// Empty combiner: no impulse, both sides `NotReady`.
    pub fn new() -> Self {
        Self {
            impulse: None,
            upstream: State::not_ready(),
            cached: State::not_ready(),
        }
    }

    /// Make `impulse` the impulse in effect.
    ///
    /// The previous cache state is kept until the next cache read arrives;
    /// cache-compatibility filters it if it no longer applies.
    pub fn set_impulse(&mut self, impulse: LoadImpulse<Q>) {
        self.impulse = Some(impulse);
    }

    /// The impulse in effect.
    pub fn impulse(&self) -> Option<&LoadImpulse<Q>> {
        self.impulse.as_ref()
    }

    /// Record a new upstream state and recombine.
    pub fn on_upstream(&mut self, state: State<V, Q, F>) -> State<V, Q, F> {
        self.upstream = state;
        self.combined()
    }

    /// Record a new cache state and recombine.
    pub fn on_cache(&mut self, state: State<V, Q, F>) -> State<V, Q, F> {
        self.cached = state;
        self.combined()
    }

    /// Combination of the latest upstream and cache states.
    pub fn combined(&self) -> State<V, Q, F> {
        match &self.impulse {
            Some(impulse) => combine_upstream_with_cache(&self.upstream, &self.cached, impulse),
            None => self.upstream.clone(),
        }
    }
}

impl<V, Q, F> Default for CacheCombiner<V, Q, F>
where
    Q: Cacheable,
    F: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

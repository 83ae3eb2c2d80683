//! Fallback carryover engine
//!
//! Repeats a resource's latest success value or error into subsequent
//! states, so that a transient loading phase (e.g. pull-to-refresh) does not
//! blank out what the user was looking at.
//!
//! Input sequences and the state they yield (S = success, E = error,
//! L = loading, NR = not ready):
//!
//! ```text
//! INPUT SEQUENCE     | OUTPUT STATE
//! -------------------+--------------------------------------------------
//! S > L              | Loading with fallback value from S
//! E > L              | Loading with fallback error from E
//! S > E > L          | prefer value: Loading with fallback value from S
//!                    | prefer error: Loading with fallback error from E
//! S1 > E > S2 > L    | Loading with fallback value from S2
//! S > E > NR > L     | Loading without fallbacks (NR disrupts)
//! E1 > E2 > L        | Loading with fallback error from E2
//! E > S              | Success without fallbacks
//! E > NR > S         | Success without fallbacks
//! S > E              | Error with fallback value from S
//! S1 > S2            | Success with value from S2
//! E1 > E2            | Error with error from E2
//! ```

use tracing::trace;

use crate::identity::IdentityBox;
use crate::impulse::LoadImpulse;
use crate::query::Cacheable;
use crate::state::{ProvisioningState, State};

/// The latest result seen by the engine.
#[derive(Debug, Clone)]
enum LatestResult<V, Q, F> {
    None,
    SuccessValue { query: Q, value: IdentityBox<V> },
    Error { query: Q, error: F },
}

/// Stateful carryover engine.
///
/// Feed it every state of a stream, in order, through [`CombinePrevious::next`].
/// Its memory is owned exclusively and mutated only by that call.
#[derive(Debug, Clone)]
pub struct CombinePrevious<V, Q, F> {
    latest: LatestResult<V, Q, F>,
    prefer_fallback_value_over_fallback_error: bool,
}

impl<V, Q, F> CombinePrevious<V, Q, F>
where
    Q: Cacheable,
    F: Clone,
{
    /// Create an engine with empty memory.
    ///
    /// `prefer_fallback_value_over_fallback_error` decides, when a stale
    /// success value and a newer error are both known, which of them becomes
    /// the fallback of the next loading state.
    pub fn new(prefer_fallback_value_over_fallback_error: bool) -> Self {
        Self {
            latest: LatestResult::None,
            prefer_fallback_value_over_fallback_error,
        }
    }

    /// Whether a stale value wins over a newer error during loading.
    pub fn prefers_fallback_value(&self) -> bool {
        self.prefer_fallback_value_over_fallback_error
    }

    /// Whether the engine currently remembers a result.
    pub fn has_memory(&self) -> bool {
        !matches!(self.latest, LatestResult::None)
    }

    /// Compute the state to emit for `received`, then update memory from
    /// `received` itself (not from the emitted state).
    pub fn next(&mut self, received: &State<V, Q, F>) -> State<V, Q, F> {
        let next = self.make_next_state(received);
        self.remember(received);
        next
    }

    fn make_next_state(&self, state: &State<V, Q, F>) -> State<V, Q, F> {
        match state.provisioning_state() {
            ProvisioningState::NotReady => State::not_ready(),
            ProvisioningState::Loading => {
                let Some(impulse) = state.load_impulse() else {
                    return State::not_ready();
                };

                if let Some(value) = state.value() {
                    return State::loading(impulse.clone(), Some(value.clone()), None);
                }

                match &self.latest {
                    LatestResult::SuccessValue { query, value }
                        if query.is_cache_compatible(impulse.query()) =>
                    {
                        State::loading(impulse.clone(), Some(value.clone()), None)
                    }
                    LatestResult::Error { query, error }
                        if query.is_cache_compatible(impulse.query()) =>
                    {
                        State::loading(impulse.clone(), None, Some(error.clone()))
                    }
                    _ => State::loading(impulse.clone(), None, None),
                }
            }
            ProvisioningState::Result => {
                let Some(impulse) = state.load_impulse() else {
                    return State::not_ready();
                };

                if let Some(error) = state.cache_compatible_error(impulse) {
                    match self.remembered_value_for(impulse) {
                        Some(value) => {
                            State::failure(impulse.clone(), error.clone(), Some(value.clone()))
                        }
                        None => state.clone(),
                    }
                } else if let Some(value) = state.cache_compatible_value(impulse) {
                    // A definitive success erases previous errors
                    State::success(impulse.clone(), value.clone(), None)
                } else {
                    trace!(
                        impulse = %impulse.id(),
                        "result does not match current parameters, emitting notReady"
                    );
                    State::not_ready()
                }
            }
        }
    }

    fn remembered_value_for(&self, impulse: &LoadImpulse<Q>) -> Option<&IdentityBox<V>> {
        match &self.latest {
            LatestResult::SuccessValue { query, value }
                if query.is_cache_compatible(impulse.query()) =>
            {
                Some(value)
            }
            _ => None,
        }
    }

    fn remember(&mut self, state: &State<V, Q, F>) {
        match state.provisioning_state() {
            ProvisioningState::Loading => {}
            ProvisioningState::NotReady => {
                // Continuity is broken; nothing before this point may show up again
                self.latest = LatestResult::None;
            }
            ProvisioningState::Result => {
                let Some(impulse) = state.load_impulse() else {
                    self.latest = LatestResult::None;
                    return;
                };

                if let Some(error) = state.cache_compatible_error(impulse) {
                    let keep_value = self.prefer_fallback_value_over_fallback_error
                        && matches!(self.latest, LatestResult::SuccessValue { .. });
                    if !keep_value {
                        self.latest = LatestResult::Error {
                            query: impulse.query().clone(),
                            error: error.clone(),
                        };
                    }
                } else if let Some(value) = state.cache_compatible_value(impulse) {
                    self.latest = LatestResult::SuccessValue {
                        query: impulse.query().clone(),
                        value: value.clone(),
                    };
                } else {
                    self.latest = LatestResult::None;
                }
            }
        }
    }
}

impl<V, Q, F> Default for CombinePrevious<V, Q, F>
where
    Q: Cacheable,
    F: Clone,
{
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impulse::LoadImpulseKind;

    #[derive(Debug, Clone, PartialEq)]
    struct User(&'static str);

    impl Cacheable for User {
        fn is_cache_compatible(&self, other: &Self) -> bool {
            self.0 == other.0
        }
    }

    type TestState = State<&'static str, User, u32>;

    fn impulse(user: &'static str) -> LoadImpulse<User> {
        LoadImpulse::new(User(user), LoadImpulseKind::INITIAL)
    }

    #[test]
    fn test_memory_untouched_by_loading() {
        let mut engine = CombinePrevious::new(true);
        let alice = impulse("alice");
        engine.next(&TestState::from_value(alice.clone(), "a"));
        engine.next(&TestState::loading(alice.clone(), None, None));
        assert!(engine.has_memory());
    }

    #[test]
    fn test_not_ready_resets_memory() {
        let mut engine = CombinePrevious::new(true);
        let alice = impulse("alice");
        engine.next(&TestState::from_value(alice.clone(), "a"));
        engine.next(&TestState::not_ready());
        assert!(!engine.has_memory());
    }

    #[test]
    fn test_loading_with_own_value_drops_error() {
        let mut engine = CombinePrevious::new(true);
        let alice = impulse("alice");
        let own = IdentityBox::new("own");
        let emitted = engine.next(&TestState::loading(alice.clone(), Some(own.clone()), Some(3)));
        assert_eq!(emitted, TestState::loading(alice, Some(own), None));
    }

    #[test]
    fn test_incompatible_memory_is_not_carried() {
        let mut engine = CombinePrevious::new(true);
        engine.next(&TestState::from_value(impulse("alice"), "alice's data"));

        let bob = impulse("bob");
        let loading = engine.next(&TestState::loading(bob.clone(), None, None));
        assert_eq!(loading, TestState::loading(bob.clone(), None, None));

        let failed = engine.next(&TestState::failure(bob.clone(), 1, None));
        assert_eq!(failed, TestState::failure(bob, 1, None));
    }

    #[test]
    fn test_result_without_compatible_data_is_not_ready() {
        // A query that is not even compatible with itself
        #[derive(Debug, Clone)]
        struct Never;
        impl Cacheable for Never {
            fn is_cache_compatible(&self, _other: &Self) -> bool {
                false
            }
        }

        let mut strict: CombinePrevious<&'static str, Never, u32> = CombinePrevious::new(true);
        let never = LoadImpulse::new(Never, LoadImpulseKind::INITIAL);
        let emitted = strict.next(&State::from_value(never, "x"));
        assert!(emitted.is_not_ready());
        assert!(!strict.has_memory());
    }

    #[test]
    fn test_error_error_loading_carries_latest_error() {
        let mut engine = CombinePrevious::new(true);
        let alice = impulse("alice");
        let e1 = TestState::failure(alice.clone(), 1, None);
        let e2 = TestState::failure(alice.clone(), 2, None);
        assert_eq!(engine.next(&e1), e1);
        assert_eq!(engine.next(&e2), e2);
        let loading = engine.next(&TestState::loading(alice.clone(), None, None));
        assert_eq!(loading, TestState::loading(alice, None, Some(2)));
    }
}

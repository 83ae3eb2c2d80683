//! Property test strategies for Provision types
//!
//! Queries are drawn from a small pool of names in mixed case, so generated
//! sequences regularly contain both compatible-but-unequal and incompatible
//! query pairs.

use proptest::prelude::*;

// Re-export proptest for convenience
pub use proptest;

use provision_core::{IdentityBox, LoadActor, LoadContext, LoadImpulse, LoadImpulseKind, State};

use crate::fixtures::{TestError, TestState};
use crate::query::TestQuery;

const NAMES: &[&str] = &["alice", "Alice", "ALICE", "bob", "Bob", "carol"];

/// Strategy for test queries from a fixed pool of names
///
/// # Example
///
/// ```rust
/// use provision_core::Cacheable;
/// use provision_testkit::strategies::arb_test_query;
/// use proptest::prelude::*;
///
/// proptest! {
///     #[test]
///     fn test_compatibility_is_reflexive(query in arb_test_query()) {
///         prop_assert!(query.is_cache_compatible(&query));
///     }
/// }
/// ```
pub fn arb_test_query() -> impl Strategy<Value = TestQuery> {
    prop::sample::select(NAMES).prop_map(TestQuery::new)
}

pub fn arb_load_context() -> impl Strategy<Value = LoadContext> {
    prop_oneof![
        Just(LoadContext::Initial),
        Just(LoadContext::FullRefresh),
        Just(LoadContext::PartialLoad),
        Just(LoadContext::PartialReload),
    ]
}

pub fn arb_load_actor() -> impl Strategy<Value = LoadActor> {
    prop_oneof![Just(LoadActor::User), Just(LoadActor::System)]
}

pub fn arb_impulse_kind() -> impl Strategy<Value = LoadImpulseKind> {
    (arb_load_context(), arb_load_actor(), any::<bool>())
        .prop_map(|(context, actor, indicator)| LoadImpulseKind::new(context, actor, indicator))
}

/// Strategy for load impulses; every generated impulse has a fresh id
pub fn arb_load_impulse() -> impl Strategy<Value = LoadImpulse<TestQuery>> {
    (arb_test_query(), arb_impulse_kind()).prop_map(|(query, kind)| LoadImpulse::new(query, kind))
}

pub fn arb_test_error() -> impl Strategy<Value = TestError> {
    prop_oneof![
        (0u8..4).prop_map(|code| TestError::Request(format!("code {}", code))),
        Just(TestError::CacheUnavailable),
    ]
}

/// One step of a generated state sequence.
#[derive(Debug, Clone)]
pub enum StateOp {
    NotReady,
    Loading {
        query: TestQuery,
        own_value: Option<String>,
    },
    Success {
        query: TestQuery,
        value: String,
    },
    Failure {
        query: TestQuery,
        error: TestError,
    },
}

impl StateOp {
    /// Materialize the step as a state. Values get a fresh identity.
    pub fn to_state(&self) -> TestState {
        match self {
            StateOp::NotReady => State::not_ready(),
            StateOp::Loading { query, own_value } => State::loading(
                LoadImpulse::new(query.clone(), LoadImpulseKind::USER_REFRESH),
                own_value.clone().map(IdentityBox::new),
                None,
            ),
            StateOp::Success { query, value } => State::from_value(
                LoadImpulse::new(query.clone(), LoadImpulseKind::INITIAL),
                value.clone(),
            ),
            StateOp::Failure { query, error } => State::failure(
                LoadImpulse::new(query.clone(), LoadImpulseKind::INITIAL),
                error.clone(),
                None,
            ),
        }
    }
}

pub fn arb_state_op() -> impl Strategy<Value = StateOp> {
    let value = (0u8..8).prop_map(|n| format!("value {}", n));
    prop_oneof![
        1 => Just(StateOp::NotReady),
        3 => (arb_test_query(), prop::option::of(value.clone()))
            .prop_map(|(query, own_value)| StateOp::Loading { query, own_value }),
        3 => (arb_test_query(), value)
            .prop_map(|(query, value)| StateOp::Success { query, value }),
        3 => (arb_test_query(), arb_test_error())
            .prop_map(|(query, error)| StateOp::Failure { query, error }),
    ]
}

pub fn arb_state_ops(max_len: usize) -> impl Strategy<Value = Vec<StateOp>> {
    prop::collection::vec(arb_state_op(), 0..=max_len)
}

/// Strategy for single states of any provisioning phase
pub fn arb_state() -> impl Strategy<Value = TestState> {
    arb_state_op().prop_map(|op| op.to_state())
}

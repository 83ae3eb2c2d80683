//! State and impulse fixtures.

use provision_core::{IdentityBox, LoadImpulse, LoadImpulseKind, State};
use serde::{Deserialize, Serialize};

use crate::query::TestQuery;

/// Failure type used across the test suites.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum TestError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("cache could not load")]
    CacheUnavailable,
}

impl TestError {
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request(message.into())
    }
}

/// The state type used by most tests.
pub type TestState = State<String, TestQuery, TestError>;

/// Initial-kind impulse for the named query.
pub fn impulse(query: &str) -> LoadImpulse<TestQuery> {
    LoadImpulse::new(TestQuery::new(query), LoadImpulseKind::INITIAL)
}

/// User-refresh impulse for the named query.
pub fn refresh_impulse(query: &str) -> LoadImpulse<TestQuery> {
    LoadImpulse::new(TestQuery::new(query), LoadImpulseKind::USER_REFRESH)
}

pub fn success(impulse: &LoadImpulse<TestQuery>, value: &str) -> TestState {
    State::from_value(impulse.clone(), value.to_string())
}

pub fn failure(impulse: &LoadImpulse<TestQuery>, message: &str) -> TestState {
    State::failure(impulse.clone(), TestError::request(message), None)
}

pub fn loading(impulse: &LoadImpulse<TestQuery>) -> TestState {
    State::loading(impulse.clone(), None, None)
}

/// The value of a state, unboxed.
pub fn value_of(state: &TestState) -> Option<&str> {
    state.value().map(|value| value.value().as_str())
}

/// A boxed value with a fresh identity.
pub fn boxed(value: &str) -> IdentityBox<String> {
    IdentityBox::new(value.to_string())
}

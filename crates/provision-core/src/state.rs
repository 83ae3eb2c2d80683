//! Resource states
//!
//! A [`State`] is what a resource currently knows: its provisioning phase,
//! optionally a value, optionally an error, and the [`LoadImpulse`] that
//! produced it. States are immutable values; every emission replaces the
//! previous state wholesale.
//!
//! # Invariants
//!
//! - `NotReady` carries no impulse, no value and no error.
//! - `Loading` and `Result` always carry an impulse.
//! - `Result` is the definitive outcome for its impulse. Value and error may
//!   both be present (a success with a stale error, or an error with a stale
//!   fallback value). [`State::success`] and [`State::failure`] build them.
//!
//! The constructors uphold these invariants; [`State::try_from_parts`] and
//! deserialization validate them.

use serde::{Deserialize, Serialize};

use crate::errors::{ProvisionError, Result};
use crate::identity::IdentityBox;
use crate::impulse::LoadImpulse;
use crate::query::Cacheable;

/// Lifecycle phase of a resource, before or following a load impulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProvisioningState {
    /// Nothing usable is known
    NotReady,
    /// A load is in flight
    Loading,
    /// A definitive outcome for the impulse
    Result,
}

/// The state of a resource at one point in time.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawState<V, Q, F>")]
pub struct State<V, Q, F> {
    provisioning_state: ProvisioningState,
    load_impulse: Option<LoadImpulse<Q>>,
    value: Option<IdentityBox<V>>,
    error: Option<F>,
}

/// Unvalidated wire form of [`State`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawState<V, Q, F> {
    provisioning_state: ProvisioningState,
    load_impulse: Option<LoadImpulse<Q>>,
    value: Option<IdentityBox<V>>,
    error: Option<F>,
}

impl<V, Q, F> TryFrom<RawState<V, Q, F>> for State<V, Q, F> {
    type Error = ProvisionError;

    fn try_from(raw: RawState<V, Q, F>) -> Result<Self> {
        Self::try_from_parts(raw.provisioning_state, raw.load_impulse, raw.value, raw.error)
    }
}

impl<V, Q, F> State<V, Q, F> {
    /// Not ready to provide data.
    pub fn not_ready() -> Self {
        Self {
            provisioning_state: ProvisioningState::NotReady,
            load_impulse: None,
            value: None,
            error: None,
        }
    }

    /// Loading, optionally with a fallback value and/or fallback error
    /// (e.g. from a cache or a previous result).
    pub fn loading(
        load_impulse: LoadImpulse<Q>,
        fallback_value: Option<IdentityBox<V>>,
        fallback_error: Option<F>,
    ) -> Self {
        Self {
            provisioning_state: ProvisioningState::Loading,
            load_impulse: Some(load_impulse),
            value: fallback_value,
            error: fallback_error,
        }
    }

    /// A value has been produced. A stale error may still be attached.
    pub fn success(
        load_impulse: LoadImpulse<Q>,
        value: IdentityBox<V>,
        fallback_error: Option<F>,
    ) -> Self {
        Self {
            provisioning_state: ProvisioningState::Result,
            load_impulse: Some(load_impulse),
            value: Some(value),
            error: fallback_error,
        }
    }

    /// An error has been encountered. A fallback value may still be
    /// available (e.g. the API call failed but the cache had a value).
    pub fn failure(
        load_impulse: LoadImpulse<Q>,
        error: F,
        fallback_value: Option<IdentityBox<V>>,
    ) -> Self {
        Self {
            provisioning_state: ProvisioningState::Result,
            load_impulse: Some(load_impulse),
            value: fallback_value,
            error: Some(error),
        }
    }

    /// Success state boxing a freshly produced value.
    pub fn from_value(load_impulse: LoadImpulse<Q>, value: V) -> Self {
        Self::success(load_impulse, IdentityBox::new(value), None)
    }

    /// Assemble a state from raw parts, validating the provisioning invariants.
    pub fn try_from_parts(
        provisioning_state: ProvisioningState,
        load_impulse: Option<LoadImpulse<Q>>,
        value: Option<IdentityBox<V>>,
        error: Option<F>,
    ) -> Result<Self> {
        match provisioning_state {
            ProvisioningState::NotReady => {
                if load_impulse.is_some() || value.is_some() || error.is_some() {
                    return Err(ProvisionError::invalid(
                        "notReady state must not carry an impulse, value or error",
                    ));
                }
            }
            ProvisioningState::Loading => {
                if load_impulse.is_none() {
                    return Err(ProvisionError::invalid(
                        "loading state requires a load impulse",
                    ));
                }
            }
            ProvisioningState::Result => {
                if load_impulse.is_none() {
                    return Err(ProvisionError::invalid(
                        "result state requires a load impulse",
                    ));
                }
            }
        }

        Ok(Self {
            provisioning_state,
            load_impulse,
            value,
            error,
        })
    }

    /// Provisioning phase.
    pub fn provisioning_state(&self) -> ProvisioningState {
        self.provisioning_state
    }

    /// The impulse that produced this state.
    pub fn load_impulse(&self) -> Option<&LoadImpulse<Q>> {
        self.load_impulse.as_ref()
    }

    /// Value or fallback value, regardless of cache-compatibility.
    pub fn value(&self) -> Option<&IdentityBox<V>> {
        self.value.as_ref()
    }

    /// Error or fallback error, regardless of cache-compatibility.
    pub fn error(&self) -> Option<&F> {
        self.error.as_ref()
    }

    /// Whether the state is `NotReady`.
    pub fn is_not_ready(&self) -> bool {
        self.provisioning_state == ProvisioningState::NotReady
    }

    /// Whether the state is `Loading`.
    pub fn is_loading(&self) -> bool {
        self.provisioning_state == ProvisioningState::Loading
    }

    /// Whether the state is `Result`.
    pub fn is_result(&self) -> bool {
        self.provisioning_state == ProvisioningState::Result
    }

    /// A settled, error-free result carrying a value.
    pub fn is_settled_success(&self) -> bool {
        self.is_result() && self.value.is_some() && self.error.is_none()
    }

    /// Replace the value slot. `NotReady` states are returned unchanged.
    pub fn with_value(mut self, value: Option<IdentityBox<V>>) -> Self {
        if !self.is_not_ready() {
            self.value = value;
        }
        self
    }

    /// Replace the error slot. `NotReady` states are returned unchanged.
    pub fn with_error(mut self, error: Option<F>) -> Self {
        if !self.is_not_ready() {
            self.error = error;
        }
        self
    }

    /// Decompose into raw parts.
    pub fn into_parts(
        self,
    ) -> (
        ProvisioningState,
        Option<LoadImpulse<Q>>,
        Option<IdentityBox<V>>,
        Option<F>,
    ) {
        (
            self.provisioning_state,
            self.load_impulse,
            self.value,
            self.error,
        )
    }
}

impl<V, Q: Clone, F: Clone> State<V, Q, F> {
    /// Transform the value, keeping phase, impulse and error.
    ///
    /// The transformed value gets a new identity.
    pub fn map<U>(&self, transform: impl FnOnce(&V) -> U) -> State<U, Q, F> {
        State {
            provisioning_state: self.provisioning_state,
            load_impulse: self.load_impulse.clone(),
            value: self.value.as_ref().map(|boxed| boxed.map(transform)),
            error: self.error.clone(),
        }
    }
}

impl<V, Q: Cacheable, F> State<V, Q, F> {
    /// The value, if this state's impulse is cache-compatible with `impulse`.
    pub fn cache_compatible_value(&self, impulse: &LoadImpulse<Q>) -> Option<&IdentityBox<V>> {
        let own = self.load_impulse.as_ref()?;
        let value = self.value.as_ref()?;
        own.is_cache_compatible(impulse).then_some(value)
    }

    /// The error, if this state's impulse is cache-compatible with `impulse`.
    pub fn cache_compatible_error(&self, impulse: &LoadImpulse<Q>) -> Option<&F> {
        let own = self.load_impulse.as_ref()?;
        let error = self.error.as_ref()?;
        own.is_cache_compatible(impulse).then_some(error)
    }

    /// Settled result with a cache-compatible value and no error.
    pub fn has_loaded_successfully(&self, impulse: &LoadImpulse<Q>) -> bool {
        match self.provisioning_state {
            ProvisioningState::NotReady | ProvisioningState::Loading => false,
            ProvisioningState::Result => {
                self.cache_compatible_value(impulse).is_some() && self.error.is_none()
            }
        }
    }
}

impl<V, Q: Clone, F: Clone> Clone for State<V, Q, F> {
    fn clone(&self) -> Self {
        Self {
            provisioning_state: self.provisioning_state,
            load_impulse: self.load_impulse.clone(),
            value: self.value.clone(),
            error: self.error.clone(),
        }
    }
}

// Impulses and values compare by identity, so this never walks the value.
impl<V, Q, F: PartialEq> PartialEq for State<V, Q, F> {
    fn eq(&self, other: &Self) -> bool {
        self.provisioning_state == other.provisioning_state
            && self.load_impulse == other.load_impulse
            && self.value == other.value
            && self.error == other.error
    }
}

impl<V, Q, F: Eq> Eq for State<V, Q, F> {}

impl<V, Q, F> Default for State<V, Q, F> {
    fn default() -> Self {
        Self::not_ready()
    }
}

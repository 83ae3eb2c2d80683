//! Load impulses: identity-bearing requests to (re)load a resource.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::query::{Cacheable, NoQuery};

/// Unique identity of a load impulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImpulseId(Uuid);

impl ImpulseId {
    /// Generate a fresh identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ImpulseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ImpulseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "impulse-{}", self.0)
    }
}

/// What part of the resource an impulse asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadContext {
    /// First load of the resource
    Initial,
    /// Reload everything
    FullRefresh,
    /// Load an additional part (e.g. next page)
    PartialLoad,
    /// Reload a part
    PartialReload,
}

/// Who triggered an impulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadActor {
    /// Explicit user action, e.g. pull-to-refresh
    User,
    /// Triggered by the application itself
    System,
}

/// Metadata describing an impulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadImpulseKind {
    /// What is being loaded
    pub context: LoadContext,
    /// Who asked for it
    pub actor: LoadActor,
    /// Whether views should show a loading indicator
    pub show_loading_indicator: bool,
}

impl LoadImpulseKind {
    /// First load, triggered by the system, with indicator.
    pub const INITIAL: Self = Self::new(LoadContext::Initial, LoadActor::System, true);

    /// Full refresh triggered by the user, with indicator.
    pub const USER_REFRESH: Self = Self::new(LoadContext::FullRefresh, LoadActor::User, true);

    /// Full refresh triggered by the system, with indicator.
    pub const SYSTEM_REFRESH: Self = Self::new(LoadContext::FullRefresh, LoadActor::System, true);

    /// Create an impulse kind.
    pub const fn new(context: LoadContext, actor: LoadActor, show_loading_indicator: bool) -> Self {
        Self {
            context,
            actor,
            show_loading_indicator,
        }
    }
}

/// A request to (re)load a resource for a given query.
///
/// Two impulses with identical queries are still distinct impulses: equality
/// and hashing use the [`ImpulseId`] only. The query may be replaced through
/// [`LoadImpulse::with_query`] (e.g. after a token renewal) without changing
/// the identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadImpulse<Q> {
    query: Q,
    kind: LoadImpulseKind,
    id: ImpulseId,
}

impl<Q> LoadImpulse<Q> {
    /// Create an impulse with a fresh identity.
    pub fn new(query: Q, kind: LoadImpulseKind) -> Self {
        Self::with_id(query, kind, ImpulseId::new())
    }

    /// Create an impulse with a known identity.
    pub fn with_id(query: Q, kind: LoadImpulseKind, id: ImpulseId) -> Self {
        Self { query, kind, id }
    }

    /// The request parameters.
    pub fn query(&self) -> &Q {
        &self.query
    }

    /// Trigger metadata.
    pub fn kind(&self) -> LoadImpulseKind {
        self.kind
    }

    /// Identity of this impulse.
    pub fn id(&self) -> ImpulseId {
        self.id
    }

    /// Copy of this impulse carrying a different query. Identity is kept.
    pub fn with_query(&self, query: Q) -> Self {
        Self {
            query,
            kind: self.kind,
            id: self.id,
        }
    }

    /// Impulse over a different query type, keeping kind and identity.
    pub fn map_query<R>(&self, transform: impl FnOnce(&Q) -> R) -> LoadImpulse<R> {
        LoadImpulse {
            query: transform(&self.query),
            kind: self.kind,
            id: self.id,
        }
    }
}

impl<Q: Cacheable> LoadImpulse<Q> {
    /// Whether a state produced for `self` may be used for `candidate`.
    pub fn is_cache_compatible(&self, candidate: &LoadImpulse<Q>) -> bool {
        candidate.query.is_cache_compatible(&self.query)
    }
}

impl LoadImpulse<NoQuery> {
    /// Default first impulse for parameterless resources.
    pub fn initial() -> Self {
        Self::new(NoQuery, LoadImpulseKind::SYSTEM_REFRESH)
    }

    /// Parameterless impulse of the given kind.
    pub fn of_kind(kind: LoadImpulseKind) -> Self {
        Self::new(NoQuery, kind)
    }
}

impl<Q> PartialEq for LoadImpulse<Q> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<Q> Eq for LoadImpulse<Q> {}

impl<Q> Hash for LoadImpulse<Q> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Token(&'static str);

    impl Cacheable for Token {
        fn is_cache_compatible(&self, other: &Self) -> bool {
            self.0 == other.0
        }
    }

    #[test]
    fn test_same_query_distinct_impulses() {
        let a = LoadImpulse::new(Token("t1"), LoadImpulseKind::INITIAL);
        let b = LoadImpulse::new(Token("t1"), LoadImpulseKind::INITIAL);
        assert_ne!(a, b);
        assert!(a.is_cache_compatible(&b));
    }

    #[test]
    fn test_with_query_keeps_identity() {
        let a = LoadImpulse::new(Token("t1"), LoadImpulseKind::USER_REFRESH);
        let renewed = a.with_query(Token("t2"));
        assert_eq!(a, renewed);
        assert_eq!(renewed.query(), &Token("t2"));
        assert_eq!(renewed.kind(), LoadImpulseKind::USER_REFRESH);
        assert!(!a.is_cache_compatible(&renewed));
    }

    #[test]
    fn test_initial_no_query_impulse() {
        let impulse = LoadImpulse::initial();
        assert_eq!(impulse.kind().context, LoadContext::FullRefresh);
        assert_eq!(impulse.kind().actor, LoadActor::System);
        assert!(impulse.kind().show_loading_indicator);
    }

    #[derive(Debug, Clone)]
    struct Name(String);

    impl Cacheable for Name {
        fn is_cache_compatible(&self, other: &Self) -> bool {
            self.0.eq_ignore_ascii_case(&other.0)
        }
    }

    proptest! {
        #[test]
        fn prop_map_query_keeps_identity_and_kind(
            query in "[a-c]{1,3}",
            indicator in any::<bool>()
        ) {
            let kind = LoadImpulseKind::new(LoadContext::PartialLoad, LoadActor::User, indicator);
            let impulse = LoadImpulse::new(Name(query), kind);
            let mapped = impulse.map_query(|name| Name(name.0.to_uppercase()));

            prop_assert_eq!(mapped.id(), impulse.id());
            prop_assert_eq!(mapped.kind(), kind);
            prop_assert!(impulse.is_cache_compatible(&mapped));
        }

        #[test]
        fn prop_compatibility_follows_query(a in "[ab]{1,2}", b in "[ab]{1,2}") {
            let first = LoadImpulse::new(Name(a.clone()), LoadImpulseKind::INITIAL);
            let second = LoadImpulse::new(Name(b.clone()), LoadImpulseKind::INITIAL);
            prop_assert_eq!(first.is_cache_compatible(&second), a.eq_ignore_ascii_case(&b));
        }
    }

    #[test]
    fn test_kind_serializes_camel_case() {
        let json = serde_json::to_string(&LoadImpulseKind::INITIAL).unwrap();
        assert_eq!(
            json,
            r#"{"context":"initial","actor":"system","showLoadingIndicator":true}"#
        );
    }
}

//! Query types for tests.

use provision_core::Cacheable;
use serde::{Deserialize, Serialize};

/// A named query whose cache-compatibility ignores case.
///
/// `TestQuery::new("alice")` and `TestQuery::new("ALICE")` are different
/// queries that may share results, which keeps tests honest about using
/// compatibility rather than equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestQuery(pub String);

impl TestQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Cacheable for TestQuery {
    fn is_cache_compatible(&self, other: &Self) -> bool {
        self.0.to_lowercase() == other.0.to_lowercase()
    }
}

impl From<&str> for TestQuery {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatibility_ignores_case() {
        let lower = TestQuery::new("alice");
        let upper = TestQuery::from("ALICE");
        assert_ne!(lower, upper);
        assert!(lower.is_cache_compatible(&upper));
        assert!(upper.is_cache_compatible(&lower));
        assert!(!lower.is_cache_compatible(&TestQuery::new("bob")));
    }
}

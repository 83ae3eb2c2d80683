//! Cache-compatibility of query parameters.

use serde::{Deserialize, Serialize};

/// Request parameters whose results may or may not be shared.
///
/// `is_cache_compatible` decides whether a state produced for `self` may be
/// shown for `other` (or vice versa). In most cases `self == other` is fine,
/// but every invalidation condition relevant to the domain must be encoded
/// here, because all merging decisions depend on it:
///
/// - An authenticated request must not be compatible with one carrying a
///   different user or token, or the previous user's data would be shown.
/// - A paginated request must not be compatible with a different page offset.
///
/// The relation should be symmetric. This is documented, not enforced.
pub trait Cacheable: Clone + Send + Sync + 'static {
    /// Returns true if a state produced for `other` may be used for `self`.
    fn is_cache_compatible(&self, other: &Self) -> bool;
}

/// Query for resources without any changing parameters.
///
/// Always cache-compatible with itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoQuery;

impl Cacheable for NoQuery {
    fn is_cache_compatible(&self, _other: &Self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Page(u32);

    impl Cacheable for Page {
        fn is_cache_compatible(&self, other: &Self) -> bool {
            self.0 == other.0
        }
    }

    #[test]
    fn test_no_query_always_compatible() {
        assert!(NoQuery.is_cache_compatible(&NoQuery));
    }

    #[test]
    fn test_custom_query_compatibility() {
        assert!(Page(1).is_cache_compatible(&Page(1)));
        assert!(!Page(1).is_cache_compatible(&Page(2)));
    }
}

//! IdentityBox<V> - values with a synthetic identity
//!
//! A box is minted once, where a value enters the system (API response
//! decode, cache read), and is then shared immutably by every state that
//! carries it. Two boxes are equal only if they are the same box, so
//! comparing states is O(1) and two independently fetched but equal values
//! are never treated as identical across fetch boundaries.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A shared value plus a unique identity token.
///
/// Equality and hashing use the token only.
///
/// # Example
///
/// ```rust
/// use provision_core::IdentityBox;
///
/// let a = IdentityBox::new("repo list".to_string());
/// let b = IdentityBox::new("repo list".to_string());
///
/// assert_ne!(a, b);
/// assert_eq!(a, a.clone());
/// ```
#[derive(Serialize, Deserialize)]
pub struct IdentityBox<V> {
    value: Arc<V>,
    id: Uuid,
}

impl<V> IdentityBox<V> {
    /// Wrap a value with a freshly generated identity.
    pub fn new(value: V) -> Self {
        Self {
            value: Arc::new(value),
            id: Uuid::new_v4(),
        }
    }

    /// Borrow the wrapped value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// The identity token of this box.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Shared handle to the wrapped value.
    pub fn shared(&self) -> Arc<V> {
        Arc::clone(&self.value)
    }

    /// Transform the value. The result is a new box with a new identity.
    pub fn map<U>(&self, transform: impl FnOnce(&V) -> U) -> IdentityBox<U> {
        IdentityBox::new(transform(&self.value))
    }
}

impl<V> Clone for IdentityBox<V> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            id: self.id,
        }
    }
}

impl<V> PartialEq for IdentityBox<V> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<V> Eq for IdentityBox<V> {}

impl<V> Hash for IdentityBox<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<V> Deref for IdentityBox<V> {
    type Target = V;

    fn deref(&self) -> &V {
        &self.value
    }
}

impl<V: fmt::Debug> fmt::Debug for IdentityBox<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityBox")
            .field("value", &self.value)
            .field("id", &self.id)
            .finish()
    }
}

//! Property<T> - an observable current value
//!
//! `Property<T>` holds the latest value of something that changes over time
//! (here: the reconciled state of a datasource) and lets readers either take
//! a snapshot or follow changes through a [`Subscription`].
//!
//! Subscriptions are version-based: intermediate values set between two polls
//! are coalesced into the latest one. Consumers that need every single value
//! register an observer on the datasource instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Notify;

/// Inner state of a Property.
struct PropertyInner<T> {
    /// The current value.
    value: RwLock<T>,
    /// Version counter incremented on each update.
    version: AtomicU64,
    /// Wakes async subscribers on each update.
    changed: Notify,
}

/// An observable value.
///
/// - `get()`: read the current value
/// - `set()`: replace the value, bump the version, wake async subscribers
/// - `subscribe()`: follow changes by polling or awaiting
///
/// Clones share the same value.
///
/// # Example
///
/// ```rust
/// use provision_runtime::Property;
///
/// let counter = Property::new(0);
/// let mut sub = counter.subscribe();
///
/// counter.set(1);
/// assert_eq!(counter.get(), 1);
/// assert_eq!(sub.poll(), Some(1));
/// assert_eq!(sub.poll(), None);
/// ```
#[derive(Clone)]
pub struct Property<T> {
    inner: Arc<PropertyInner<T>>,
}

impl<T: Clone + Send + Sync + 'static> Property<T> {
    /// Create a Property with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(PropertyInner {
                value: RwLock::new(value),
                version: AtomicU64::new(0),
                changed: Notify::new(),
            }),
        }
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, read: impl FnOnce(&T) -> R) -> R {
        read(&self.inner.value.read())
    }

    /// Get the current version number.
    ///
    /// The version is incremented each time `set()` is called.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Set a new value and increment the version.
    pub fn set(&self, value: T) {
        {
            let mut guard = self.inner.value.write();
            *guard = value;
            self.inner.version.fetch_add(1, Ordering::Release);
        }
        self.inner.changed.notify_waiters();
    }

    /// Update the value using a function.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(T) -> T,
    {
        let new_value = f(self.get());
        self.set(new_value);
    }

    /// Subscribe to value changes.
    ///
    /// The subscription starts at the current version; only later updates
    /// count as changes.
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            source: Arc::clone(&self.inner),
            last_version: self.inner.version.load(Ordering::Acquire),
        }
    }
}

impl<T: Clone + Send + Sync + Default + 'static> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + Send + Sync + std::fmt::Debug + 'static> std::fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.get())
            .field("version", &self.version())
            .finish()
    }
}

/// A subscription to a [`Property`].
pub struct Subscription<T> {
    source: Arc<PropertyInner<T>>,
    last_version: u64,
}

impl<T: Clone + Send + Sync + 'static> Subscription<T> {
    /// Check if the source has changed since the last poll.
    pub fn has_changed(&self) -> bool {
        self.source.version.load(Ordering::Acquire) > self.last_version
    }

    /// Poll for a new value.
    ///
    /// Returns `Some(value)` if the source has been updated since the last
    /// poll. Returns `None` if no change.
    pub fn poll(&mut self) -> Option<T> {
        let guard = self.source.value.read();
        let current_version = self.source.version.load(Ordering::Acquire);
        if current_version > self.last_version {
            self.last_version = current_version;
            Some(guard.clone())
        } else {
            None
        }
    }

    /// Get the current value regardless of whether it changed.
    pub fn get(&self) -> T {
        self.source.value.read().clone()
    }

    /// Wait for the next change and return the new value.
    pub async fn changed(&mut self) -> T {
        let source = Arc::clone(&self.source);
        loop {
            let notified = source.changed.notified();
            if let Some(value) = self.poll() {
                return value;
            }
            notified.await;
        }
    }

    /// Wait until the value satisfies `predicate`, checking the current
    /// value first.
    pub async fn wait_for(&mut self, mut predicate: impl FnMut(&T) -> bool) -> T {
        let current = {
            let guard = self.source.value.read();
            self.last_version = self.source.version.load(Ordering::Acquire);
            guard.clone()
        };
        if predicate(&current) {
            return current;
        }
        loop {
            let value = self.changed().await;
            if predicate(&value) {
                return value;
            }
        }
    }

    /// Get the last version this subscription observed.
    pub fn last_observed_version(&self) -> u64 {
        self.last_version
    }
}

//! In-memory cache for datasource tests.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use provision_core::{LoadImpulse, State};
use tokio::sync::oneshot;

/// Answers a gated cache read.
pub struct ReadGate<V, Q, F> {
    tx: oneshot::Sender<State<V, Q, F>>,
}

impl<V, Q, F> ReadGate<V, Q, F> {
    /// Answer the read with `state`. Returns false if the read was cancelled
    /// or never started.
    pub fn release(self, state: State<V, Q, F>) -> bool {
        self.tx.send(state).is_ok()
    }

    /// Whether the read waiting on this gate is gone.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

struct CacheInner<V, Q, F> {
    stored: Option<State<V, Q, F>>,
    persisted: Vec<State<V, Q, F>>,
    reads: Vec<LoadImpulse<Q>>,
    gated_reads: VecDeque<oneshot::Receiver<State<V, Q, F>>>,
}

/// A single-slot cache.
///
/// The persister logs every state it is handed and stores `Result` states
/// that carry a value. The reader returns whatever is stored (or `NotReady`)
/// without checking compatibility, so tests can verify that the datasource
/// filters out cached data belonging to another query.
pub struct InMemoryCache<V, Q, F> {
    inner: Arc<Mutex<CacheInner<V, Q, F>>>,
}

impl<V, Q, F> InMemoryCache<V, Q, F>
where
    V: Send + Sync + 'static,
    Q: Clone + Send + Sync + 'static,
    F: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner {
                stored: None,
                persisted: Vec::new(),
                reads: Vec::new(),
                gated_reads: VecDeque::new(),
            })),
        }
    }

    /// A cache that already holds `state`.
    pub fn with_state(state: State<V, Q, F>) -> Self {
        let cache = Self::new();
        cache.inner.lock().stored = Some(state);
        cache
    }

    pub fn stored(&self) -> Option<State<V, Q, F>> {
        self.inner.lock().stored.clone()
    }

    /// Every state handed to the persister, in order.
    pub fn persisted(&self) -> Vec<State<V, Q, F>> {
        self.inner.lock().persisted.clone()
    }

    /// Every impulse the cache was read for, in order.
    pub fn reads(&self) -> Vec<LoadImpulse<Q>> {
        self.inner.lock().reads.clone()
    }

    /// Make the next read wait for the returned gate instead of answering
    /// from the stored state.
    pub fn push_gated_read(&self) -> ReadGate<V, Q, F> {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().gated_reads.push_back(rx);
        ReadGate { tx }
    }

    pub fn clear(&self) {
        self.inner.lock().stored = None;
    }

    /// Reader closure; implements the runtime's `CacheReader`.
    pub fn reader(
        &self,
    ) -> impl Fn(LoadImpulse<Q>) -> BoxStream<'static, State<V, Q, F>> + Send + Sync + 'static
    {
        let inner = Arc::clone(&self.inner);
        move |impulse: LoadImpulse<Q>| -> BoxStream<'static, State<V, Q, F>> {
            let mut inner = inner.lock();
            inner.reads.push(impulse);
            match inner.gated_reads.pop_front() {
                Some(rx) => stream::once(async move { rx.await.ok() })
                    .filter_map(future::ready)
                    .boxed(),
                None => {
                    let state = inner.stored.clone().unwrap_or_default();
                    stream::once(future::ready(state)).boxed()
                }
            }
        }
    }

    /// Persister closure; implements the runtime's `CachePersister`.
    pub fn persister(
        &self,
    ) -> impl Fn(State<V, Q, F>) -> BoxFuture<'static, ()> + Send + Sync + 'static {
        let inner = Arc::clone(&self.inner);
        move |state: State<V, Q, F>| -> BoxFuture<'static, ()> {
            let mut inner = inner.lock();
            if state.is_result() && state.value().is_some() {
                inner.stored = Some(state.clone());
            }
            inner.persisted.push(state);
            Box::pin(future::ready(()))
        }
    }
}

impl<V, Q, F> Clone for InMemoryCache<V, Q, F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, Q, F> Default for InMemoryCache<V, Q, F>
where
    V: Send + Sync + 'static,
    Q: Clone + Send + Sync + 'static,
    F: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{impulse, loading, success, TestError, TestState};

    #[tokio::test]
    async fn test_persister_stores_only_results_with_values() {
        let cache = InMemoryCache::new();
        let persist = cache.persister();
        let alice = impulse("alice");

        persist(loading(&alice)).await;
        assert!(cache.stored().is_none());

        let saved = success(&alice, "a");
        persist(saved.clone()).await;
        assert_eq!(cache.stored(), Some(saved));
        assert_eq!(cache.persisted().len(), 2);
    }

    #[tokio::test]
    async fn test_gated_read_waits_for_release() {
        let cache = InMemoryCache::with_state(success(&impulse("alice"), "stored"));
        let gate = cache.push_gated_read();
        let read = cache.reader();

        let mut gated = read(impulse("alice"));
        let answer = success(&impulse("alice"), "gated");
        assert!(gate.release(answer.clone()));
        assert_eq!(gated.next().await, Some(answer));
        assert!(gated.next().await.is_none());

        // Later reads answer from the stored state again
        let states: Vec<TestState> = read(impulse("alice")).collect().await;
        assert_eq!(states, cache.stored().into_iter().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_dropped_read_abandons_gate() {
        let cache: InMemoryCache<String, _, TestError> = InMemoryCache::new();
        let gate = cache.push_gated_read();
        let read = cache.reader();

        drop(read(impulse("alice")));
        assert!(gate.is_abandoned());
    }

    #[tokio::test]
    async fn test_reader_defaults_to_not_ready() {
        let cache: InMemoryCache<String, _, _> = InMemoryCache::new();
        let read = cache.reader();
        let states: Vec<TestState> = read(impulse("alice")).collect().await;
        assert_eq!(states, vec![TestState::not_ready()]);
        assert_eq!(cache.reads().len(), 1);
    }
}

//! Scripted fetchers.
//!
//! Each fetch takes the next [`Script`] from the queue. Every script yields
//! `Loading` first, like a request adapter would, and then:
//!
//! - `Value` / `Failure`: the result right away
//! - `Gated`: the result once the paired [`Gate`] is released
//! - `Pending`: nothing more (the fetch never completes)
//!
//! With the queue empty, fetches behave like `Pending`.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use provision_core::{LoadImpulse, State};
use tokio::sync::oneshot;

enum Script<V, F> {
    Value(V),
    Failure(F),
    Gated(oneshot::Receiver<Result<V, F>>),
    Pending,
}

/// Releases a gated fetch.
pub struct Gate<V, F> {
    tx: oneshot::Sender<Result<V, F>>,
}

impl<V, F> Gate<V, F> {
    /// Complete the fetch with a value. Returns false if the fetch was
    /// cancelled (its stream was dropped) or never started.
    pub fn release_value(self, value: V) -> bool {
        self.tx.send(Ok(value)).is_ok()
    }

    /// Complete the fetch with a failure.
    pub fn release_failure(self, failure: F) -> bool {
        self.tx.send(Err(failure)).is_ok()
    }

    /// Whether the fetch waiting on this gate is gone.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

struct FetchInner<V, Q, F> {
    scripts: VecDeque<Script<V, F>>,
    requests: Vec<LoadImpulse<Q>>,
}

/// A fetcher that replays queued scripts and records every request.
pub struct ScriptedFetcher<V, Q, F> {
    inner: Arc<Mutex<FetchInner<V, Q, F>>>,
}

impl<V, Q, F> ScriptedFetcher<V, Q, F>
where
    V: Send + Sync + 'static,
    Q: Clone + Send + Sync + 'static,
    F: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FetchInner {
                scripts: VecDeque::new(),
                requests: Vec::new(),
            })),
        }
    }

    pub fn push_value(&self, value: V) -> &Self {
        self.inner.lock().scripts.push_back(Script::Value(value));
        self
    }

    pub fn push_failure(&self, failure: F) -> &Self {
        self.inner.lock().scripts.push_back(Script::Failure(failure));
        self
    }

    pub fn push_pending(&self) -> &Self {
        self.inner.lock().scripts.push_back(Script::Pending);
        self
    }

    /// Queue a fetch that completes when the returned gate is released.
    pub fn push_gated(&self) -> Gate<V, F> {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().scripts.push_back(Script::Gated(rx));
        Gate { tx }
    }

    /// Impulses fetched so far, in order.
    pub fn requests(&self) -> Vec<LoadImpulse<Q>> {
        self.inner.lock().requests.clone()
    }

    pub fn calls(&self) -> usize {
        self.inner.lock().requests.len()
    }

    /// Fetcher closure; implements the runtime's `Fetcher`.
    pub fn fetcher(
        &self,
    ) -> impl Fn(LoadImpulse<Q>) -> BoxStream<'static, State<V, Q, F>> + Send + Sync + 'static
    {
        let inner = Arc::clone(&self.inner);
        move |impulse: LoadImpulse<Q>| -> BoxStream<'static, State<V, Q, F>> {
            let script = {
                let mut inner = inner.lock();
                inner.requests.push(impulse.clone());
                inner.scripts.pop_front().unwrap_or(Script::Pending)
            };

            let loading = stream::once(future::ready(State::loading(impulse.clone(), None, None)));
            match script {
                Script::Value(value) => loading
                    .chain(stream::once(future::ready(State::from_value(impulse, value))))
                    .boxed(),
                Script::Failure(failure) => loading
                    .chain(stream::once(future::ready(State::failure(impulse, failure, None))))
                    .boxed(),
                Script::Gated(rx) => loading
                    .chain(
                        stream::once(async move {
                            match rx.await {
                                Ok(Ok(value)) => Some(State::from_value(impulse, value)),
                                Ok(Err(failure)) => Some(State::failure(impulse, failure, None)),
                                Err(_) => None,
                            }
                        })
                        .filter_map(future::ready),
                    )
                    .boxed(),
                Script::Pending => loading.chain(stream::pending()).boxed(),
            }
        }
    }
}

impl<V, Q, F> Clone for ScriptedFetcher<V, Q, F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, Q, F> Default for ScriptedFetcher<V, Q, F>
where
    V: Send + Sync + 'static,
    Q: Clone + Send + Sync + 'static,
    F: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

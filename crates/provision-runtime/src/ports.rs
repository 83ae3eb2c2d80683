//! Effect ports a datasource is built from.
//!
//! Callers supply the side effects (fetching, reading the cache, writing the
//! cache); the datasource only orchestrates them. Each port is a trait with a
//! blanket implementation for plain closures, so small call sites can pass a
//! closure and larger ones can implement the trait on a service type.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{self, BoxFuture};
use futures::stream::{self, BoxStream, StreamExt};
use provision_core::{Cacheable, LoadImpulse, State};

/// A boxed stream of resource states.
pub type StateStream<V, Q, F> = BoxStream<'static, State<V, Q, F>>;

/// Produces the upstream states for one load impulse.
///
/// The stream must eventually yield a `Result` state. It may start with an
/// interim `Loading` state. Dropping the stream cancels the fetch.
pub trait Fetcher<V, Q, F>: Send + Sync + 'static {
    /// Start loading for `impulse`.
    fn fetch(&self, impulse: LoadImpulse<Q>) -> StateStream<V, Q, F>;
}

impl<V, Q, F, Func> Fetcher<V, Q, F> for Func
where
    Func: Fn(LoadImpulse<Q>) -> StateStream<V, Q, F> + Send + Sync + 'static,
{
    fn fetch(&self, impulse: LoadImpulse<Q>) -> StateStream<V, Q, F> {
        self(impulse)
    }
}

/// Reads the best known cached state for a load impulse.
///
/// The stream may start with `NotReady`. Cached states carry the impulse
/// they were originally produced for; the datasource checks them for
/// cache-compatibility before showing anything.
pub trait CacheReader<V, Q, F>: Send + Sync + 'static {
    /// Read the cached state to show for `impulse`.
    fn read(&self, impulse: LoadImpulse<Q>) -> StateStream<V, Q, F>;
}

impl<V, Q, F, Func> CacheReader<V, Q, F> for Func
where
    Func: Fn(LoadImpulse<Q>) -> StateStream<V, Q, F> + Send + Sync + 'static,
{
    fn read(&self, impulse: LoadImpulse<Q>) -> StateStream<V, Q, F> {
        self(impulse)
    }
}

/// Writes an upstream state to the cache.
///
/// Persisting is fire-and-forget: the datasource neither awaits completion
/// nor observes failures.
#[async_trait]
pub trait CachePersister<V, Q, F>: Send + Sync + 'static
where
    V: Send + Sync + 'static,
    Q: Send + Sync + 'static,
    F: Send + Sync + 'static,
{
    /// Store `state`.
    async fn persist(&self, state: State<V, Q, F>);
}

#[async_trait]
impl<V, Q, F, Func> CachePersister<V, Q, F> for Func
where
    Func: Fn(State<V, Q, F>) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    V: Send + Sync + 'static,
    Q: Send + Sync + 'static,
    F: Send + Sync + 'static,
{
    async fn persist(&self, state: State<V, Q, F>) {
        self(state).await
    }
}

/// A cache: how to read it and how to write it.
pub struct Cache<V, Q, F>
where
    V: Send + Sync + 'static,
    Q: Send + Sync + 'static,
    F: Send + Sync + 'static,
{
    reader: Arc<dyn CacheReader<V, Q, F>>,
    persister: Arc<dyn CachePersister<V, Q, F>>,
}

impl<V, Q, F> Cache<V, Q, F>
where
    V: Send + Sync + 'static,
    Q: Send + Sync + 'static,
    F: Send + Sync + 'static,
{
    /// Pair a reader with a persister.
    pub fn new(
        reader: impl CacheReader<V, Q, F>,
        persister: impl CachePersister<V, Q, F>,
    ) -> Self {
        Self {
            reader: Arc::new(reader),
            persister: Arc::new(persister),
        }
    }

    /// The cache reader.
    pub fn reader(&self) -> Arc<dyn CacheReader<V, Q, F>> {
        Arc::clone(&self.reader)
    }

    /// The cache persister.
    pub fn persister(&self) -> Arc<dyn CachePersister<V, Q, F>> {
        Arc::clone(&self.persister)
    }
}

impl<V, Q, F> Clone for Cache<V, Q, F>
where
    V: Send + Sync + 'static,
    Q: Send + Sync + 'static,
    F: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
            persister: Arc::clone(&self.persister),
        }
    }
}

/// Adapt a single async request into a [`Fetcher`].
///
/// The resulting stream yields `Loading` without fallbacks, then either a
/// success state for the returned value or an error state for the returned
/// failure, both for the requesting impulse.
///
/// ```rust
/// use futures::{executor::block_on, StreamExt};
/// use provision_core::{LoadImpulse, NoQuery, State};
/// use provision_runtime::{request_fetcher, Fetcher};
///
/// let fetcher = request_fetcher(|_impulse: LoadImpulse<NoQuery>| async {
///     Ok::<_, String>(7u32)
/// });
/// let states: Vec<State<u32, NoQuery, String>> =
///     block_on(fetcher.fetch(LoadImpulse::initial()).collect());
///
/// assert!(states[0].is_loading());
/// assert_eq!(states[1].value().map(|v| *v.value()), Some(7));
/// ```
pub fn request_fetcher<V, Q, F, Req, Fut>(request: Req) -> impl Fetcher<V, Q, F>
where
    V: Send + Sync + 'static,
    Q: Cacheable,
    F: Send + Sync + 'static,
    Req: Fn(LoadImpulse<Q>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, F>> + Send + 'static,
{
    move |impulse: LoadImpulse<Q>| -> StateStream<V, Q, F> {
        let loading = State::loading(impulse.clone(), None, None);
        let response = request(impulse.clone());
        stream::once(future::ready(loading))
            .chain(stream::once(async move {
                match response.await {
                    Ok(value) => State::from_value(impulse, value),
                    Err(failure) => State::failure(impulse, failure, None),
                }
            }))
            .boxed()
    }
}

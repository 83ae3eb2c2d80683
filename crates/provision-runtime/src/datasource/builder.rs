use std::future::Future;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use futures::stream::{Stream, StreamExt};
use provision_core::{Cacheable, LoadImpulse, ProvisionError, State};
use tokio::sync::{mpsc, watch};

use super::driver::{Driver, DriverParts};
use super::{Datasource, Emission, Shared};
use crate::config::DatasourceConfig;
use crate::emitter::ImpulseStream;
use crate::errors::DatasourceError;
use crate::ports::{request_fetcher, Cache, Fetcher};
use crate::property::Property;

/// Builder for [`Datasource`].
///
/// A fetcher is required; everything else is optional.
///
/// ```rust,no_run
/// use provision_core::{LoadImpulse, NoQuery};
/// use provision_runtime::{Datasource, DatasourceConfig};
///
/// # async fn run() -> Result<(), provision_runtime::DatasourceError> {
/// let datasource: Datasource<String, NoQuery, String> = Datasource::builder()
///     .request(|_impulse| async { Ok("hello".to_string()) })
///     .config(DatasourceConfig::default())
///     .initial_impulse(LoadImpulse::initial())
///     .build()?;
///
/// datasource.observe(|state| println!("{:?}", state.provisioning_state()))?;
/// datasource.refresh(NoQuery, false).await?;
/// # Ok(())
/// # }
/// ```
pub struct DatasourceBuilder<V, Q, F>
where
    V: Send + Sync + 'static,
    Q: Cacheable,
    F: Clone + PartialEq + Send + Sync + 'static,
{
    fetcher: Option<Arc<dyn Fetcher<V, Q, F>>>,
    cache: Option<Cache<V, Q, F>>,
    config: DatasourceConfig,
    initial_impulse: Option<LoadImpulse<Q>>,
    impulse_source: Option<ImpulseStream<Q>>,
}

impl<V, Q, F> DatasourceBuilder<V, Q, F>
where
    V: Send + Sync + 'static,
    Q: Cacheable,
    F: Clone + PartialEq + Send + Sync + 'static,
{
    /// An empty builder with the default configuration.
    pub fn new() -> Self {
        Self {
            fetcher: None,
            cache: None,
            config: DatasourceConfig::default(),
            initial_impulse: None,
            impulse_source: None,
        }
    }

    /// Use `fetcher` to produce upstream states.
    pub fn fetcher(mut self, fetcher: impl Fetcher<V, Q, F>) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Use a single async request per impulse to produce upstream states.
    pub fn request<Req, Fut>(self, request: Req) -> Self
    where
        Req: Fn(LoadImpulse<Q>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, F>> + Send + 'static,
    {
        self.fetcher(request_fetcher(request))
    }

    /// Combine upstream states with `cache` and persist them to it.
    pub fn cache(mut self, cache: Cache<V, Q, F>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the default configuration.
    pub fn config(mut self, config: DatasourceConfig) -> Self {
        self.config = config;
        self
    }

    /// Impulse emitted as soon as the first observer registers.
    pub fn initial_impulse(mut self, impulse: LoadImpulse<Q>) -> Self {
        self.initial_impulse = Some(impulse);
        self
    }

    /// External impulses (timers, push notifications, a refresh control),
    /// listened to from the first observer on.
    pub fn impulse_source(
        mut self,
        impulses: impl Stream<Item = LoadImpulse<Q>> + Send + 'static,
    ) -> Self {
        self.impulse_source = Some(impulses.boxed());
        self
    }

    /// Spawn the driver on the current Tokio runtime.
    pub fn build(self) -> Result<Datasource<V, Q, F>, DatasourceError> {
        let fetcher = self
            .fetcher
            .ok_or_else(|| DatasourceError::config("A datasource needs a fetcher"))?;

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            ProvisionError::internal(format!("Datasource requires a Tokio runtime: {}", e))
        })?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = Property::new(State::not_ready());
        let emission = Property::new(Emission::default());

        let driver = Driver::new(DriverParts {
            fetcher,
            cache: self.cache,
            config: self.config,
            initial_impulse: self.initial_impulse,
            impulse_source: self.impulse_source,
            events_tx: events_tx.clone(),
            events_rx,
            shutdown_rx,
            state: state.clone(),
            emission: emission.clone(),
        });
        runtime.spawn(driver.run());

        Ok(Datasource {
            shared: Arc::new(Shared {
                events: events_tx,
                state,
                emission,
                shutdown_tx,
                next_observer: AtomicU64::new(0),
            }),
        })
    }
}

impl<V, Q, F> Default for DatasourceBuilder<V, Q, F>
where
    V: Send + Sync + 'static,
    Q: Cacheable,
    F: Clone + PartialEq + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use provision_core::NoQuery;

    #[tokio::test]
    async fn test_build_requires_fetcher() {
        let result = DatasourceBuilder::<u32, NoQuery, String>::new().build();
        assert_matches!(result, Err(DatasourceError::Config { .. }));
    }

    #[test]
    fn test_build_requires_runtime() {
        let result = DatasourceBuilder::<u32, NoQuery, String>::new()
            .request(|_impulse| async { Ok(1) })
            .build();
        assert_matches!(result, Err(DatasourceError::Core(ProvisionError::Internal { .. })));
    }
}

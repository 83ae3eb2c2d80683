//! Datasource orchestration
//!
//! A [`Datasource`] turns load impulses into a single observable sequence of
//! resource states:
//!
//! 1. every impulse starts a fresh fetch and cancels the previous one
//!    (latest impulse wins), immediately transitioning to `Loading`;
//! 2. upstream states are persisted to the cache (if any) and combined with
//!    the cache read for the same impulse;
//! 3. the combined states go through the carryover engine (unless disabled)
//!    and are published to observers.
//!
//! All of this runs on one driver task per datasource; the handle is a cheap,
//! cloneable front end that sends it events.

mod builder;
mod driver;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future;
use futures::stream::{BoxStream, StreamExt};
use provision_core::{Cacheable, LoadImpulse, LoadImpulseKind, ProvisioningState, State};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;

pub use builder::DatasourceBuilder;
use driver::DriverEvent;

use crate::emitter::LoadImpulseEmitter;
use crate::errors::DatasourceError;
use crate::property::{Property, Subscription};

/// Identifies an observer registered with [`Datasource::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Record of the latest emission, used to detect when a refresh has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Emission {
    pub generation: u64,
    pub provisioning_state: ProvisioningState,
}

impl Default for Emission {
    fn default() -> Self {
        Self {
            generation: 0,
            provisioning_state: ProvisioningState::NotReady,
        }
    }
}

struct Shared<V, Q, F> {
    events: mpsc::UnboundedSender<DriverEvent<V, Q, F>>,
    state: Property<State<V, Q, F>>,
    emission: Property<Emission>,
    shutdown_tx: watch::Sender<bool>,
    next_observer: AtomicU64,
}

/// Handle to a running datasource.
///
/// Clones share the same driver. The driver stops when [`shutdown`] is
/// called or the last handle is dropped; in-flight fetches, cache reads and
/// the impulse source are cancelled with it.
///
/// [`shutdown`]: Datasource::shutdown
pub struct Datasource<V, Q, F> {
    shared: Arc<Shared<V, Q, F>>,
}

impl<V, Q, F> Datasource<V, Q, F>
where
    V: Send + Sync + 'static,
    Q: Cacheable,
    F: Clone + PartialEq + Send + Sync + 'static,
{
    /// Start building a datasource.
    pub fn builder() -> DatasourceBuilder<V, Q, F> {
        DatasourceBuilder::new()
    }

    /// The latest published state.
    pub fn state(&self) -> State<V, Q, F> {
        self.shared.state.get()
    }

    /// Follow the published state. Intermediate states may be coalesced;
    /// use [`observe`](Self::observe) or [`states`](Self::states) to see
    /// every one of them.
    pub fn subscribe(&self) -> Subscription<State<V, Q, F>> {
        self.shared.state.subscribe()
    }

    /// Register `observer` for every future state.
    ///
    /// `observer` is called with `NotReady` before this returns, whatever the
    /// datasource is doing. It then receives the current state (unless that
    /// is `NotReady`) and every later state, in order, on the driver task.
    /// The first observer starts listening to the impulse source.
    pub fn observe(
        &self,
        mut observer: impl FnMut(&State<V, Q, F>) + Send + 'static,
    ) -> Result<ObserverId, DatasourceError> {
        observer(&State::not_ready());
        self.register(Box::new(move |state: &State<V, Q, F>| {
            observer(state);
            true
        }))
    }

    /// Stop delivering states to an observer.
    pub fn remove_observer(&self, id: ObserverId) -> Result<(), DatasourceError> {
        self.send(DriverEvent::Unobserve(id))
    }

    /// Every emitted state as a stream, starting with the `NotReady`
    /// sentinel. Dropping the stream unregisters it.
    pub fn states(&self) -> Result<BoxStream<'static, State<V, Q, F>>, DatasourceError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(State::not_ready());
        self.register(Box::new(move |state: &State<V, Q, F>| {
            tx.send(state.clone()).is_ok()
        }))?;
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }

    /// Yields whenever a `Result` state is emitted.
    pub fn loading_ended(&self) -> Result<BoxStream<'static, ()>, DatasourceError> {
        Ok(self
            .states()?
            .filter(|state| future::ready(state.is_result()))
            .map(|_| ())
            .boxed())
    }

    /// An emitter feeding impulses straight into this datasource.
    pub fn emitter(&self) -> LoadImpulseEmitter<Q> {
        let events = self.shared.events.clone();
        LoadImpulseEmitter::from_fn(move |impulse| {
            events
                .send(DriverEvent::Impulse { impulse, ack: None })
                .map_err(|_| DatasourceError::Shutdown)
        })
    }

    /// Send a load impulse.
    pub fn emit(&self, impulse: LoadImpulse<Q>) -> Result<(), DatasourceError> {
        self.send(DriverEvent::Impulse { impulse, ack: None })
    }

    /// Reload the resource for `query` on behalf of the user.
    ///
    /// With `skip_if_result_available`, nothing happens while the current
    /// state is an error-free result with a value. Otherwise a full-refresh
    /// impulse is emitted and this completes once a `Result` state is
    /// published for it (or for a later impulse).
    pub async fn refresh(
        &self,
        query: Q,
        skip_if_result_available: bool,
    ) -> Result<(), DatasourceError> {
        if skip_if_result_available && self.shared.state.with(|state| state.is_settled_success())
        {
            return Ok(());
        }

        let mut emissions = self.shared.emission.subscribe();
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(DriverEvent::Impulse {
            impulse: LoadImpulse::new(query, LoadImpulseKind::USER_REFRESH),
            ack: Some(ack_tx),
        })?;
        let generation = ack_rx.await.map_err(|_| DatasourceError::Shutdown)?;

        tokio::select! {
            _ = emissions.wait_for(|emission| {
                emission.generation >= generation
                    && emission.provisioning_state == ProvisioningState::Result
            }) => Ok(()),
            _ = self.shared.events.closed() => Err(DatasourceError::Shutdown),
        }
    }

    /// Return the current state right away; if it has no value, also emit a
    /// system full-refresh impulse for `query`.
    ///
    /// The returned state is not updated by that refresh. Observe the
    /// datasource to see it land.
    pub fn result_and_refresh_if_no_data_available(
        &self,
        query: Q,
    ) -> Result<State<V, Q, F>, DatasourceError> {
        let current = self.state();
        if current.value().is_none() {
            self.emit(LoadImpulse::new(query, LoadImpulseKind::SYSTEM_REFRESH))?;
        }
        Ok(current)
    }

    /// Stop the driver. Later operations fail with [`DatasourceError::Shutdown`].
    pub fn shutdown(&self) {
        let _ = self.shared.shutdown_tx.send(true);
    }

    /// Whether the driver has stopped.
    pub fn is_shut_down(&self) -> bool {
        self.shared.events.is_closed()
    }

    fn register(&self, observer: driver::Observer<V, Q, F>) -> Result<ObserverId, DatasourceError> {
        let id = ObserverId(self.shared.next_observer.fetch_add(1, Ordering::Relaxed));
        self.send(DriverEvent::Observe { id, observer })?;
        Ok(id)
    }

    fn send(&self, event: DriverEvent<V, Q, F>) -> Result<(), DatasourceError> {
        self.shared
            .events
            .send(event)
            .map_err(|_| DatasourceError::Shutdown)
    }
}

impl<V, Q, F> Clone for Datasource<V, Q, F> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<V, Q, F> fmt::Debug for Datasource<V, Q, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Datasource")
            .field("closed", &self.shared.events.is_closed())
            .finish_non_exhaustive()
    }
}

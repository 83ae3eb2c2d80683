//! The datasource driver task.
//!
//! One driver task per datasource owns every piece of mutable pipeline
//! state: the cache combiner, the carryover engine, the observer list and
//! the generation counter. Everything else talks to it through
//! [`DriverEvent`]s, so recombination always happens on a single logical
//! sequence of states.

use std::sync::Arc;

use futures::StreamExt;
use provision_core::{CacheCombiner, Cacheable, CombinePrevious, LoadImpulse, State};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, trace};

use super::{Emission, ObserverId};
use crate::config::{DatasourceConfig, PersistPolicy};
use crate::emitter::ImpulseStream;
use crate::ports::{Cache, Fetcher, StateStream};
use crate::property::Property;
use crate::task::{SwitchTask, TaskRegistry};

/// Receives every emitted state; returning `false` unregisters it.
pub(crate) type Observer<V, Q, F> = Box<dyn FnMut(&State<V, Q, F>) -> bool + Send>;

pub(crate) enum DriverEvent<V, Q, F> {
    /// A new load impulse. `ack` receives the generation assigned to it.
    Impulse {
        impulse: LoadImpulse<Q>,
        ack: Option<oneshot::Sender<u64>>,
    },
    /// A state from the fetch started for `generation`.
    Upstream { generation: u64, state: State<V, Q, F> },
    /// A state from the cache read started for `generation`.
    Cached { generation: u64, state: State<V, Q, F> },
    Observe {
        id: ObserverId,
        observer: Observer<V, Q, F>,
    },
    Unobserve(ObserverId),
}

/// Everything the driver is built from.
pub(crate) struct DriverParts<V, Q, F>
where
    V: Send + Sync + 'static,
    Q: Cacheable,
    F: Clone + PartialEq + Send + Sync + 'static,
{
    pub fetcher: Arc<dyn Fetcher<V, Q, F>>,
    pub cache: Option<Cache<V, Q, F>>,
    pub config: DatasourceConfig,
    pub initial_impulse: Option<LoadImpulse<Q>>,
    pub impulse_source: Option<ImpulseStream<Q>>,
    pub events_tx: mpsc::UnboundedSender<DriverEvent<V, Q, F>>,
    pub events_rx: mpsc::UnboundedReceiver<DriverEvent<V, Q, F>>,
    pub shutdown_rx: watch::Receiver<bool>,
    pub state: Property<State<V, Q, F>>,
    pub emission: Property<Emission>,
}

pub(crate) struct Driver<V, Q, F>
where
    V: Send + Sync + 'static,
    Q: Cacheable,
    F: Clone + PartialEq + Send + Sync + 'static,
{
    fetcher: Arc<dyn Fetcher<V, Q, F>>,
    cache: Option<Cache<V, Q, F>>,
    persist_policy: PersistPolicy,
    initial_impulse: Option<LoadImpulse<Q>>,
    impulse_source: Option<ImpulseStream<Q>>,
    events_tx: mpsc::UnboundedSender<DriverEvent<V, Q, F>>,
    events_rx: mpsc::UnboundedReceiver<DriverEvent<V, Q, F>>,
    shutdown_rx: watch::Receiver<bool>,
    state: Property<State<V, Q, F>>,
    emission: Property<Emission>,
    combiner: CacheCombiner<V, Q, F>,
    carryover: Option<CombinePrevious<V, Q, F>>,
    last_emitted: State<V, Q, F>,
    observers: Vec<(ObserverId, Observer<V, Q, F>)>,
    generation: u64,
    listening: bool,
    fetch_task: SwitchTask,
    cache_task: SwitchTask,
    background: TaskRegistry,
}

impl<V, Q, F> Driver<V, Q, F>
where
    V: Send + Sync + 'static,
    Q: Cacheable,
    F: Clone + PartialEq + Send + Sync + 'static,
{
    pub(crate) fn new(parts: DriverParts<V, Q, F>) -> Self {
        let carryover = parts
            .config
            .combine_previous
            .preference()
            .map(CombinePrevious::new);

        Self {
            fetcher: parts.fetcher,
            cache: parts.cache,
            persist_policy: parts.config.persist_policy,
            initial_impulse: parts.initial_impulse,
            impulse_source: parts.impulse_source,
            events_tx: parts.events_tx,
            events_rx: parts.events_rx,
            shutdown_rx: parts.shutdown_rx,
            state: parts.state,
            emission: parts.emission,
            combiner: CacheCombiner::new(),
            carryover,
            last_emitted: State::not_ready(),
            observers: Vec::new(),
            generation: 0,
            listening: false,
            fetch_task: SwitchTask::new(),
            cache_task: SwitchTask::new(),
            background: TaskRegistry::new(),
        }
    }

    /// Process events until shutdown is requested or every handle is gone.
    pub(crate) async fn run(mut self) {
        debug!(
            cached = self.cache.is_some(),
            carryover = self.carryover.is_some(),
            "datasource driver started"
        );

        loop {
            let event = tokio::select! {
                _ = self.shutdown_rx.changed() => break,
                event = self.events_rx.recv() => event,
            };
            match event {
                Some(event) => self.handle(event),
                None => break,
            }
        }

        self.fetch_task.cancel();
        self.cache_task.cancel();
        self.background.shutdown();
        debug!(generation = self.generation, "datasource driver stopped");
    }

    fn handle(&mut self, event: DriverEvent<V, Q, F>) {
        match event {
            DriverEvent::Impulse { impulse, ack } => self.on_impulse(impulse, ack),
            DriverEvent::Upstream { generation, state } => {
                if self.is_current(generation, "upstream") {
                    self.on_upstream(state);
                }
            }
            DriverEvent::Cached { generation, state } => {
                if self.is_current(generation, "cache") {
                    let combined = self.combiner.on_cache(state);
                    self.emit(combined);
                }
            }
            DriverEvent::Observe { id, observer } => self.on_observe(id, observer),
            DriverEvent::Unobserve(id) => self.observers.retain(|(existing, _)| *existing != id),
        }
    }

    fn is_current(&self, generation: u64, origin: &'static str) -> bool {
        if generation == self.generation {
            return true;
        }
        trace!(
            generation,
            current = self.generation,
            origin,
            "dropping state from superseded impulse"
        );
        false
    }

    fn on_impulse(&mut self, impulse: LoadImpulse<Q>, ack: Option<oneshot::Sender<u64>>) {
        // A pending initial impulse is older than anything accepted here
        self.initial_impulse = None;
        self.generation += 1;
        let generation = self.generation;
        debug!(generation, impulse = %impulse.id(), "accepted load impulse");

        self.combiner.set_impulse(impulse.clone());
        if let Some(ack) = ack {
            let _ = ack.send(generation);
        }

        let fetched = self.fetcher.fetch(impulse.clone());
        self.fetch_task.replace(forward(
            fetched,
            self.events_tx.clone(),
            move |state| DriverEvent::Upstream { generation, state },
        ));

        // Transition to loading before the fetch produces anything
        self.reconcile_upstream(State::loading(impulse.clone(), None, None));

        if let Some(cache) = &self.cache {
            let cached = cache.reader().read(impulse);
            self.cache_task.replace(forward(
                cached,
                self.events_tx.clone(),
                move |state| DriverEvent::Cached { generation, state },
            ));
        }
    }

    fn on_upstream(&mut self, state: State<V, Q, F>) {
        if let Some(cache) = &self.cache {
            let persist = match self.persist_policy {
                PersistPolicy::AllStates => true,
                PersistPolicy::ResultsOnly => state.is_result(),
            };
            if persist {
                let persister = cache.persister();
                let persisted = state.clone();
                self.background
                    .spawn(async move { persister.persist(persisted).await });
            }
        }
        self.reconcile_upstream(state);
    }

    fn reconcile_upstream(&mut self, state: State<V, Q, F>) {
        let combined = if self.cache.is_some() {
            self.combiner.on_upstream(state)
        } else {
            state
        };
        self.emit(combined);
    }

    fn emit(&mut self, state: State<V, Q, F>) {
        let state = match &mut self.carryover {
            Some(engine) => engine.next(&state),
            None => state,
        };
        if state == self.last_emitted {
            return;
        }

        trace!(
            generation = self.generation,
            provisioning_state = ?state.provisioning_state(),
            has_value = state.value().is_some(),
            has_error = state.error().is_some(),
            "emitting state"
        );

        self.last_emitted = state.clone();
        self.state.set(state.clone());
        self.emission.set(Emission {
            generation: self.generation,
            provisioning_state: state.provisioning_state(),
        });
        self.observers.retain_mut(|(_, observer)| observer(&state));
    }

    fn on_observe(&mut self, id: ObserverId, mut observer: Observer<V, Q, F>) {
        if !self.last_emitted.is_not_ready() && !observer(&self.last_emitted) {
            return;
        }
        self.observers.push((id, observer));

        if !self.listening {
            self.start_listening();
        }
    }

    fn start_listening(&mut self) {
        self.listening = true;
        debug!(
            initial_impulse = self.initial_impulse.is_some(),
            impulse_source = self.impulse_source.is_some(),
            "datasource started listening"
        );

        if let Some(initial) = self.initial_impulse.take() {
            self.on_impulse(initial, None);
        }

        if let Some(mut impulses) = self.impulse_source.take() {
            let events = self.events_tx.clone();
            self.background.spawn(async move {
                while let Some(impulse) = impulses.next().await {
                    if events.send(DriverEvent::Impulse { impulse, ack: None }).is_err() {
                        break;
                    }
                }
            });
        }
    }
}

/// Forward every state of `states` to the driver, tagged by `wrap`.
async fn forward<V, Q, F>(
    mut states: StateStream<V, Q, F>,
    events: mpsc::UnboundedSender<DriverEvent<V, Q, F>>,
    wrap: impl Fn(State<V, Q, F>) -> DriverEvent<V, Q, F> + Send + 'static,
) {
    while let Some(state) = states.next().await {
        if events.send(wrap(state)).is_err() {
            break;
        }
    }
}

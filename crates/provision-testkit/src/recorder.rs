//! Observer that records every state it receives.

use std::sync::Arc;

use parking_lot::Mutex;
use provision_core::State;

/// Collects the states delivered to a datasource observer.
pub struct StateRecorder<V, Q, F> {
    states: Arc<Mutex<Vec<State<V, Q, F>>>>,
}

impl<V, Q, F> StateRecorder<V, Q, F>
where
    V: Send + Sync + 'static,
    Q: Clone + Send + Sync + 'static,
    F: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            states: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Callback to pass to `Datasource::observe`.
    pub fn observer(&self) -> impl FnMut(&State<V, Q, F>) + Send + 'static {
        let states = Arc::clone(&self.states);
        move |state: &State<V, Q, F>| states.lock().push(state.clone())
    }

    /// Snapshot of everything recorded so far.
    pub fn states(&self) -> Vec<State<V, Q, F>> {
        self.states.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.states.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.lock().is_empty()
    }

    pub fn last(&self) -> Option<State<V, Q, F>> {
        self.states.lock().last().cloned()
    }
}

impl<V, Q, F> Clone for StateRecorder<V, Q, F> {
    fn clone(&self) -> Self {
        Self {
            states: Arc::clone(&self.states),
        }
    }
}

impl<V, Q, F> Default for StateRecorder<V, Q, F>
where
    V: Send + Sync + 'static,
    Q: Clone + Send + Sync + 'static,
    F: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

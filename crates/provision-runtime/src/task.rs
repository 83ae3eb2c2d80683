//! Task ownership for datasource background work.
//!
//! Every task a datasource starts is owned by one of the types here, so that
//! shutting the datasource down (or dropping it) aborts all of them.

use std::future::Future;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Owns fire-and-forget tasks (cache persistence, impulse pumps).
#[derive(Debug)]
pub(crate) struct TaskRegistry {
    shutdown_tx: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskRegistry {
    pub(crate) fn new() -> Self {
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        Self {
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn a task that runs to completion unless the registry shuts down.
    pub(crate) fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.changed() => {}
                _ = fut => {}
            }
        });

        let mut handles = self.handles.lock();
        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);
    }

    /// Number of tasks that have not finished yet.
    #[cfg(test)]
    pub(crate) fn active(&self) -> usize {
        self.handles
            .lock()
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    #[cfg(test)]
    pub(crate) fn is_shutdown(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    pub(crate) fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles.lock().drain(..) {
            handle.abort();
        }
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Holds at most one running task; starting a new one aborts the previous.
///
/// This is what makes a datasource "switch to latest": the fetch for an
/// outdated impulse is cancelled the moment a newer impulse arrives.
#[derive(Debug, Default)]
pub(crate) struct SwitchTask {
    current: Option<JoinHandle<()>>,
}

impl SwitchTask {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Abort the running task, if any, and start `fut` in its place.
    pub(crate) fn replace<F>(&mut self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.current = Some(tokio::spawn(fut));
    }

    /// Abort the running task, if any.
    pub(crate) fn cancel(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.abort();
        }
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for SwitchTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_registry_runs_tasks() {
        let registry = TaskRegistry::new();
        let (tx, rx) = oneshot::channel();
        registry.spawn(async move {
            let _ = tx.send(42);
        });
        assert_eq!(rx.await.ok(), Some(42));
    }

    #[tokio::test]
    async fn test_registry_shutdown_aborts_tasks() {
        let registry = TaskRegistry::new();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        registry.spawn(async move {
            std::future::pending::<()>().await;
            flag.store(true, Ordering::SeqCst);
        });

        registry.shutdown();
        tokio::task::yield_now().await;
        assert!(registry.is_shutdown());
        assert_eq!(registry.active(), 0);
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_switch_task_aborts_previous() {
        let mut switch = SwitchTask::new();
        let (first_tx, first_rx) = oneshot::channel::<()>();
        switch.replace(async move {
            std::future::pending::<()>().await;
            drop(first_tx);
        });
        assert!(switch.is_running());

        let (second_tx, second_rx) = oneshot::channel();
        switch.replace(async move {
            let _ = second_tx.send("second");
        });

        // The aborted task drops its sender without sending
        assert!(first_rx.await.is_err());
        assert_eq!(second_rx.await.ok(), Some("second"));
    }
}

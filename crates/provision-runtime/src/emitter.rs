//! Imperative load impulse emitters.

use std::fmt;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use provision_core::LoadImpulse;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::errors::DatasourceError;

/// A boxed stream of load impulses, usable as a datasource impulse source.
pub type ImpulseStream<Q> = BoxStream<'static, LoadImpulse<Q>>;

type SendFn<Q> = dyn Fn(LoadImpulse<Q>) -> Result<(), DatasourceError> + Send + Sync;

/// A cloneable handle for triggering loads, e.g. from a refresh button.
pub struct LoadImpulseEmitter<Q> {
    send: Arc<SendFn<Q>>,
}

impl<Q: Send + 'static> LoadImpulseEmitter<Q> {
    /// Create an emitter that hands every impulse to `send`.
    pub fn from_fn(
        send: impl Fn(LoadImpulse<Q>) -> Result<(), DatasourceError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            send: Arc::new(send),
        }
    }

    /// Create an emitter together with the stream of impulses it emits.
    ///
    /// The stream yields `initial` first, if given, and ends once every
    /// emitter clone is dropped.
    pub fn channel(initial: Option<LoadImpulse<Q>>) -> (Self, ImpulseStream<Q>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let emitter = Self::from_fn(move |impulse| {
            tx.send(impulse)
                .map_err(|_| DatasourceError::ImpulseSourceClosed)
        });
        let impulses = stream::iter(initial)
            .chain(UnboundedReceiverStream::new(rx))
            .boxed();
        (emitter, impulses)
    }

    /// Emit a load impulse.
    pub fn emit(&self, impulse: LoadImpulse<Q>) -> Result<(), DatasourceError> {
        (self.send)(impulse)
    }
}

impl<Q> Clone for LoadImpulseEmitter<Q> {
    fn clone(&self) -> Self {
        Self {
            send: Arc::clone(&self.send),
        }
    }
}

impl<Q> fmt::Debug for LoadImpulseEmitter<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadImpulseEmitter").finish_non_exhaustive()
    }
}

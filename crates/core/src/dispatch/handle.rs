use tokio::sync::{mpsc, oneshot};

use super::context::CallContext;
use super::unit::CallUnit;
use super::DispatchError;

/// Handle for submitting call units to the runner.
///
/// Cheaply cloneable; one clone per RPC handler task is the expected use.
/// Sending on the queue is also the wakeup, so enqueue and signal are a
/// single operation.
#[derive(Clone)]
pub struct CallDispatcher {
    tx: mpsc::Sender<CallUnit>,
}

impl CallDispatcher {
    pub(super) fn new(tx: mpsc::Sender<CallUnit>) -> Self {
        Self { tx }
    }

    /// Queue `f` for serialized execution and wait for its result.
    ///
    /// Units are executed in enqueue order; each caller receives exactly
    /// the value its own closure produced. Fails fast with
    /// [`DispatchError::Unavailable`] once the runner has shut down, and
    /// resolves the same way if the unit is dropped unexecuted (runner
    /// stopped with the queue non-empty, or the unit panicked).
    pub async fn submit<T, F>(&self, op: &'static str, f: F) -> Result<T, DispatchError>
    where
        F: FnOnce(&mut CallContext) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let unit = CallUnit::new(op, move |context| {
            let _ = result_tx.send(f(context));
        });

        self.tx
            .send(unit)
            .await
            .map_err(|_| DispatchError::Unavailable)?;

        result_rx.await.map_err(|_| DispatchError::Unavailable)
    }
}

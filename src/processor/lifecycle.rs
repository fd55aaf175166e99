//! Lifecycle of a single worker run: spawn, liveness, cancellation, and join.

use super::queue::{request_channel, RequestSender, WorkItem};
use super::worker::ProcessingWorker;
use crate::api::ApiTransport;
use crate::runtime::telemetry::Telemetry;
use futures::FutureExt;
use std::any::Any;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub(crate) struct WorkerHandle {
    requests: RequestSender,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

pub(crate) struct WorkerSpawnParams<'a> {
    pub runtime: &'a Handle,
    pub shutdown_root: &'a CancellationToken,
    pub api: Arc<dyn ApiTransport>,
    pub telemetry: Arc<Telemetry>,
}

impl WorkerHandle {
    pub(crate) fn spawn(params: WorkerSpawnParams<'_>) -> Self {
        let WorkerSpawnParams {
            runtime,
            shutdown_root,
            api,
            telemetry,
        } = params;

        let (requests, receiver) = request_channel();
        let shutdown = shutdown_root.child_token();
        let worker = ProcessingWorker::new(api, telemetry, receiver, shutdown.clone());

        let handle = runtime.spawn(async move {
            let result = std::panic::AssertUnwindSafe(worker.run())
                .catch_unwind()
                .await;

            if let Err(panic_payload) = result {
                tracing::error!(
                    panic = %panic_message(panic_payload.as_ref()),
                    "network worker panicked; the next request starts a new one"
                );
            }
        });

        Self {
            requests,
            shutdown,
            handle,
        }
    }

    /// A worker is alive until its task finishes, its token is cancelled, or its queue closes.
    pub(crate) fn is_alive(&self) -> bool {
        !self.handle.is_finished() && !self.shutdown.is_cancelled() && !self.requests.is_closed()
    }

    pub(crate) fn enqueue(&self, item: WorkItem) -> Result<(), WorkItem> {
        self.requests.enqueue(item)
    }

    pub(crate) fn pending(&self) -> usize {
        self.requests.pending()
    }

    pub(crate) fn cancel(&self) {
        self.shutdown.cancel();
    }

    /// Cancels the worker's wait and joins its task. The item in flight, if any, completes first.
    pub(crate) async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(err) = self.handle.await {
            tracing::warn!(error = %err, "network worker task terminated unexpectedly");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

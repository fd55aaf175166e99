//! FIFO hand-off between callers and the processing worker.

use crate::runtime::connectivity::Connectivity;
use crate::runtime::listener::NetworkListener;
use crate::runtime::storage::ReportStore;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkRequest {
    /// Refresh the tracker catalog, then store the reports of the listed packages.
    FetchReports { packages: HashSet<String> },
    /// Kind the worker does not understand; dropped without any listener callback.
    Unknown,
}

/// Caller-side collaborators a work item runs against.
#[derive(Clone)]
pub struct RequestContext {
    pub connectivity: Arc<dyn Connectivity>,
    pub store: Arc<dyn ReportStore>,
}

impl RequestContext {
    pub fn new(connectivity: Arc<dyn Connectivity>, store: Arc<dyn ReportStore>) -> Self {
        Self {
            connectivity,
            store,
        }
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("active_network", &self.connectivity.active_network())
            .finish_non_exhaustive()
    }
}

pub struct WorkItem {
    pub request: WorkRequest,
    pub context: RequestContext,
    pub listener: Arc<dyn NetworkListener>,
}

impl WorkItem {
    pub fn new(
        request: WorkRequest,
        context: RequestContext,
        listener: Arc<dyn NetworkListener>,
    ) -> Self {
        Self {
            request,
            context,
            listener,
        }
    }

    pub fn fetch_reports<I, S>(
        context: RequestContext,
        listener: Arc<dyn NetworkListener>,
        packages: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let packages = packages.into_iter().map(Into::into).collect();
        Self::new(WorkRequest::FetchReports { packages }, context, listener)
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("request", &self.request)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Creates a connected queue pair. The sender side may be cloned and used from any thread.
pub fn request_channel() -> (RequestSender, RequestReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let pending = Arc::new(AtomicUsize::new(0));
    (
        RequestSender {
            tx,
            pending: pending.clone(),
        },
        RequestReceiver { rx, pending },
    )
}

#[derive(Clone)]
pub struct RequestSender {
    tx: mpsc::UnboundedSender<WorkItem>,
    pending: Arc<AtomicUsize>,
}

impl RequestSender {
    /// Appends `item` to the tail without blocking. Hands the item back when the receiving
    /// worker is gone.
    pub fn enqueue(&self, item: WorkItem) -> Result<(), WorkItem> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        match self.tx.send(item) {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendError(item)) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                Err(item)
            }
        }
    }

    /// Number of items enqueued but not yet taken by the worker.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub struct RequestReceiver {
    rx: mpsc::UnboundedReceiver<WorkItem>,
    pending: Arc<AtomicUsize>,
}

impl RequestReceiver {
    /// Waits for the head item. Returns `None` once `shutdown` fires or every sender is gone.
    pub async fn dequeue(&mut self, shutdown: &CancellationToken) -> Option<WorkItem> {
        let item = tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            item = self.rx.recv() => item,
        };

        if item.is_some() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        item
    }
}

//! Entry point callers use to request report refreshes.
//!
//! `NetworkManager` owns at most one live worker. Submissions never block: they go to the
//! live worker's queue, or start a fresh worker (and queue) when the previous one has
//! finished, been cancelled, or panicked.

use super::lifecycle::{WorkerHandle, WorkerSpawnParams};
use super::queue::{RequestContext, WorkItem};
use crate::api::{ApiTransport, HttpApiClient};
use crate::runtime::config::ManagerConfig;
use crate::runtime::listener::NetworkListener;
use crate::runtime::telemetry::Telemetry;
use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

const MAX_SPAWN_ATTEMPTS: usize = 2;

pub struct NetworkManager {
    config: ManagerConfig,
    api: Arc<dyn ApiTransport>,
    telemetry: Arc<Telemetry>,
    runtime: Handle,
    shutdown_root: CancellationToken,
    worker: Mutex<Option<WorkerHandle>>,
}

impl NetworkManager {
    /// Creates a manager talking to the configured API over HTTP.
    ///
    /// Must be called from within a tokio runtime; workers are spawned on that runtime even
    /// when [`Self::submit`] is later called from a thread outside it.
    pub fn new(config: ManagerConfig) -> Result<Self> {
        let api = Arc::new(HttpApiClient::from_config(&config).context("failed to build API client")?);
        Self::with_transport(config, api)
    }

    /// Creates a manager using a caller-provided transport.
    pub fn with_transport(config: ManagerConfig, api: Arc<dyn ApiTransport>) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current()
            .context("NetworkManager must be created inside a tokio runtime")?;
        Ok(Self::with_runtime(config, api, runtime))
    }

    pub fn with_runtime(config: ManagerConfig, api: Arc<dyn ApiTransport>, runtime: Handle) -> Self {
        Self {
            config,
            api,
            telemetry: Arc::new(Telemetry::default()),
            runtime,
            shutdown_root: CancellationToken::new(),
            worker: Mutex::new(None),
        }
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    /// Queues a refresh of the tracker catalog followed by the reports of `packages`.
    ///
    /// All outcomes are delivered through `listener`.
    pub fn submit<I, S>(&self, context: RequestContext, listener: Arc<dyn NetworkListener>, packages: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.submit_item(WorkItem::fetch_reports(context, listener, packages));
    }

    pub fn submit_item(&self, item: WorkItem) {
        let mut slot = self.worker.lock().unwrap_or_else(|err| err.into_inner());
        let mut item = item;

        for _ in 0..MAX_SPAWN_ATTEMPTS {
            if !slot.as_ref().is_some_and(WorkerHandle::is_alive) {
                if let Some(stale) = slot.take() {
                    stale.cancel();
                }
                tracing::debug!(api_url = %self.config.api_url(), "starting network worker");
            }

            let worker = slot.get_or_insert_with(|| self.spawn_worker());
            match worker.enqueue(item) {
                Ok(()) => return,
                Err(rejected) => {
                    tracing::debug!("network worker exited before accepting the request");
                    item = rejected;
                    slot.take();
                }
            }
        }

        tracing::error!(request = ?item.request, "dropping request: network worker could not be started");
    }

    pub fn is_worker_running(&self) -> bool {
        let slot = self.worker.lock().unwrap_or_else(|err| err.into_inner());
        slot.as_ref().is_some_and(WorkerHandle::is_alive)
    }

    /// Requests queued for the live worker and not yet started.
    pub fn pending(&self) -> usize {
        let slot = self.worker.lock().unwrap_or_else(|err| err.into_inner());
        slot.as_ref().map(WorkerHandle::pending).unwrap_or(0)
    }

    /// Stops the live worker, if any, and waits for it to exit. Queued requests that have not
    /// started are discarded; a later submission starts a new worker.
    pub async fn stop(&self) {
        let worker = {
            let mut slot = self.worker.lock().unwrap_or_else(|err| err.into_inner());
            slot.take()
        };

        if let Some(worker) = worker {
            tracing::info!(pending = worker.pending(), "stopping network worker");
            worker.shutdown().await;
        }
    }

    fn spawn_worker(&self) -> WorkerHandle {
        WorkerHandle::spawn(WorkerSpawnParams {
            runtime: &self.runtime,
            shutdown_root: &self.shutdown_root,
            api: self.api.clone(),
            telemetry: self.telemetry.clone(),
        })
    }
}

impl Drop for NetworkManager {
    fn drop(&mut self) {
        self.shutdown_root.cancel();
    }
}

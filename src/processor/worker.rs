//! Sequential consumer of the request queue.
//!
//! Every `FetchReports` item runs two phases against the API:
//! - trackers: refresh the whole tracker catalog and store it as one batch;
//! - reports: walk the published applications and store the requested ones one by one.
//!
//! A connectivity failure aborts the item at the phase where it is detected. A request
//! that cannot be issued at all abandons the item silently. Decode failures are reported
//! as `InvalidJson` and processing moves on; the reports phase always ends with
//! `on_success`.

use super::queue::{RequestContext, RequestReceiver, WorkItem, WorkRequest};
use crate::api::{ApiResponse, ApiTransport, Endpoint};
use crate::domain::decode::{
    application_entries, decode_application, decode_tracker, parse_document, tracker_entries,
};
use crate::domain::{DecodeError, Tracker};
use crate::runtime::connectivity::is_connected;
use crate::runtime::listener::{NetworkError, NetworkListener, ProgressStep};
use crate::runtime::telemetry::Telemetry;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseOutcome {
    Completed,
    Aborted,
}

pub struct ProcessingWorker {
    api: Arc<dyn ApiTransport>,
    telemetry: Arc<Telemetry>,
    requests: RequestReceiver,
    shutdown: CancellationToken,
}

impl ProcessingWorker {
    pub fn new(
        api: Arc<dyn ApiTransport>,
        telemetry: Arc<Telemetry>,
        requests: RequestReceiver,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            api,
            telemetry,
            requests,
            shutdown,
        }
    }

    #[tracing::instrument(name = "network_worker", skip_all)]
    pub async fn run(mut self) {
        tracing::info!("network worker started");

        while let Some(item) = self.requests.dequeue(&self.shutdown).await {
            self.process(item).await;
        }

        if self.shutdown.is_cancelled() {
            tracing::info!("shutdown requested; exiting network worker");
        } else {
            tracing::info!("request queue closed; exiting network worker");
        }
    }

    pub async fn process(&self, item: WorkItem) {
        let WorkItem {
            request,
            context,
            listener,
        } = item;

        match request {
            WorkRequest::FetchReports { packages } => {
                tracing::debug!(packages = packages.len(), "processing report request");
                self.fetch_reports(&context, listener.as_ref(), &packages)
                    .await;
            }
            WorkRequest::Unknown => {
                tracing::debug!("dropping work item of unknown kind");
            }
        }

        self.telemetry.record_processed_item();
    }

    async fn fetch_reports(
        &self,
        context: &RequestContext,
        listener: &dyn NetworkListener,
        packages: &HashSet<String>,
    ) {
        if self.refresh_trackers(context, listener).await == PhaseOutcome::Aborted {
            return;
        }
        self.refresh_reports(context, listener, packages).await;
    }

    async fn refresh_trackers(
        &self,
        context: &RequestContext,
        listener: &dyn NetworkListener,
    ) -> PhaseOutcome {
        let response = match self
            .open(context, listener, Endpoint::Trackers, ProgressStep::TrackersConnecting)
            .await
        {
            Some(response) => response,
            None => return PhaseOutcome::Aborted,
        };
        listener.on_progress(ProgressStep::TrackersFetching, 0, 0);

        let body = match response {
            ApiResponse::Success(body) => body,
            ApiResponse::Failure { status, .. } => {
                tracing::info!(?status, "tracker catalog request failed; keeping stored catalog");
                return PhaseOutcome::Completed;
            }
        };

        match decode_trackers(&body, listener) {
            Ok(trackers) => {
                let count = trackers.len() as u64;
                match context.store.upsert_trackers(trackers).await {
                    Ok(()) => {
                        self.telemetry.record_stored_trackers(count);
                        tracing::debug!(count, "tracker catalog stored");
                    }
                    Err(err) => {
                        self.telemetry.record_storage_error();
                        tracing::warn!(error = %err, "failed to store tracker catalog");
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "tracker catalog response could not be decoded");
                self.telemetry.record_json_error();
                listener.on_error(NetworkError::InvalidJson);
            }
        }

        PhaseOutcome::Completed
    }

    async fn refresh_reports(
        &self,
        context: &RequestContext,
        listener: &dyn NetworkListener,
        packages: &HashSet<String>,
    ) -> PhaseOutcome {
        let response = match self
            .open(context, listener, Endpoint::Reports, ProgressStep::ReportsConnecting)
            .await
        {
            Some(response) => response,
            None => return PhaseOutcome::Aborted,
        };
        listener.on_progress(ProgressStep::ReportsFetching, 0, 0);

        match response {
            ApiResponse::Success(body) => {
                if let Err(err) = self
                    .store_applications(context, listener, &body, packages)
                    .await
                {
                    tracing::warn!(error = %err, "reports response could not be decoded");
                    self.telemetry.record_json_error();
                    listener.on_error(NetworkError::InvalidJson);
                }
            }
            ApiResponse::Failure { status, .. } => {
                tracing::info!(?status, "reports request failed; nothing to store");
            }
        }

        listener.on_success();
        PhaseOutcome::Completed
    }

    /// Checks connectivity, announces the connection step, and issues the request.
    /// Returns `None` when the current item must be abandoned.
    async fn open(
        &self,
        context: &RequestContext,
        listener: &dyn NetworkListener,
        endpoint: Endpoint,
        step: ProgressStep,
    ) -> Option<ApiResponse> {
        if !is_connected(context.connectivity.as_ref()) {
            tracing::info!(%endpoint, "no connected network; aborting request");
            self.telemetry.record_connectivity_error();
            listener.on_error(NetworkError::NotConnected);
            return None;
        }

        listener.on_progress(step, 0, 0);

        match self.api.get(endpoint).await {
            Ok(response) => Some(response),
            Err(err) => {
                tracing::warn!(%endpoint, error = %err, "request could not be issued; abandoning work item");
                self.telemetry.record_transport_failure();
                None
            }
        }
    }

    async fn store_applications(
        &self,
        context: &RequestContext,
        listener: &dyn NetworkListener,
        body: &str,
        packages: &HashSet<String>,
    ) -> Result<(), DecodeError> {
        let document = parse_document(body)?;
        let applications = application_entries(&document)?;
        let total = applications.len();

        for (index, (package_name, value)) in applications.iter().enumerate() {
            listener.on_progress(ProgressStep::ApplicationsParsing, index + 1, total);
            if !packages.contains(package_name) {
                continue;
            }

            let application = decode_application(package_name, value)?;
            let reports = application.reports.len();
            match context.store.upsert_application(application).await {
                Ok(()) => {
                    self.telemetry.record_stored_application();
                    tracing::debug!(package = %package_name, reports, "application stored");
                }
                Err(err) => {
                    self.telemetry.record_storage_error();
                    tracing::warn!(package = %package_name, error = %err, "failed to store application");
                }
            }
        }

        Ok(())
    }
}

fn decode_trackers(
    body: &str,
    listener: &dyn NetworkListener,
) -> Result<Vec<Tracker>, DecodeError> {
    let document = parse_document(body)?;
    let entries = tracker_entries(&document)?;
    let total = entries.len();

    let mut trackers = Vec::with_capacity(total);
    for (index, (tracker_id, value)) in entries.iter().enumerate() {
        listener.on_progress(ProgressStep::TrackersParsing, index + 1, total);
        trackers.push(decode_tracker(tracker_id, value)?);
    }
    Ok(trackers)
}

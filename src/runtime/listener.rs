//! Progress/error/success reporting surface consumed by callers of the manager.
//!
//! Per work item a listener sees zero or more progress and error calls followed by at
//! most one `on_success`. Errors do not rule out a later success call.

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Pipeline step announced through [`NetworkListener::on_progress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgressStep {
    TrackersConnecting,
    TrackersFetching,
    TrackersParsing,
    ReportsConnecting,
    ReportsFetching,
    ApplicationsParsing,
}

impl ProgressStep {
    /// Stable message key, suitable for looking up a localized label.
    pub fn key(self) -> &'static str {
        match self {
            ProgressStep::TrackersConnecting => "get_trackers_connection",
            ProgressStep::TrackersFetching => "get_trackers",
            ProgressStep::TrackersParsing => "parse_trackers",
            ProgressStep::ReportsConnecting => "get_reports_connection",
            ProgressStep::ReportsFetching => "get_reports",
            ProgressStep::ApplicationsParsing => "parse_application",
        }
    }
}

impl fmt::Display for ProgressStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Failure reported to the listener. Transport failures are never reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkError {
    NotConnected,
    InvalidJson,
}

impl NetworkError {
    pub fn key(self) -> &'static str {
        match self {
            NetworkError::NotConnected => "not_connected",
            NetworkError::InvalidJson => "json_error",
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::NotConnected => write!(f, "not connected to a network"),
            NetworkError::InvalidJson => write!(f, "invalid JSON received from the API"),
        }
    }
}

impl std::error::Error for NetworkError {}

pub trait NetworkListener: Send + Sync {
    fn on_progress(&self, step: ProgressStep, current: usize, total: usize);

    fn on_error(&self, error: NetworkError);

    fn on_success(&self);
}

/// Callback recorded by [`ChannelListener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    Progress {
        step: ProgressStep,
        current: usize,
        total: usize,
    },
    Error(NetworkError),
    Success,
}

/// Listener that forwards every callback as a [`ListenerEvent`] on an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<ListenerEvent>,
}

impl ChannelListener {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ListenerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }

    fn emit(&self, event: ListenerEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("listener receiver dropped; discarding event");
        }
    }
}

impl NetworkListener for ChannelListener {
    fn on_progress(&self, step: ProgressStep, current: usize, total: usize) {
        self.emit(ListenerEvent::Progress {
            step,
            current,
            total,
        });
    }

    fn on_error(&self, error: NetworkError) {
        self.emit(ListenerEvent::Error(error));
    }

    fn on_success(&self) {
        self.emit(ListenerEvent::Success);
    }
}

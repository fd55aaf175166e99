use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Rolling counters describing what the worker has done so far.
#[derive(Default, Debug)]
pub struct Telemetry {
    processed_items: AtomicU64,
    connectivity_errors: AtomicU64,
    json_errors: AtomicU64,
    transport_failures: AtomicU64,
    stored_trackers: AtomicU64,
    stored_applications: AtomicU64,
    storage_errors: AtomicU64,
}

impl Telemetry {
    pub fn record_processed_item(&self) {
        self.processed_items.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connectivity_error(&self) {
        self.connectivity_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_json_error(&self) {
        self.json_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_failure(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stored_trackers(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.stored_trackers.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_stored_application(&self) {
        self.stored_applications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_storage_error(&self) {
        self.storage_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            processed_items: self.processed_items.load(Ordering::Relaxed),
            connectivity_errors: self.connectivity_errors.load(Ordering::Relaxed),
            json_errors: self.json_errors.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            stored_trackers: self.stored_trackers.load(Ordering::Relaxed),
            stored_applications: self.stored_applications.load(Ordering::Relaxed),
            storage_errors: self.storage_errors.load(Ordering::Relaxed),
        }
    }

    pub fn processed_items(&self) -> u64 {
        self.processed_items.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub processed_items: u64,
    pub connectivity_errors: u64,
    pub json_errors: u64,
    pub transport_failures: u64,
    pub stored_trackers: u64,
    pub stored_applications: u64,
    pub storage_errors: u64,
}

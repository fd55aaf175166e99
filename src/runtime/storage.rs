use crate::domain::{Application, Tracker};
use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::RwLock;

/// Persistence collaborator receiving decoded records.
///
/// Both operations are insert-or-update keyed on the record identity (tracker id, package
/// name). Failures are logged by the worker and never reach the listener.
pub trait ReportStore: Send + Sync {
    fn upsert_trackers<'a>(&'a self, trackers: Vec<Tracker>) -> BoxFuture<'a, Result<()>>;

    fn upsert_application<'a>(&'a self, application: Application) -> BoxFuture<'a, Result<()>>;
}

/// Volatile [`ReportStore`] keeping the latest version of every record in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    trackers: RwLock<HashMap<u64, Tracker>>,
    applications: RwLock<HashMap<String, Application>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracker(&self, id: u64) -> Option<Tracker> {
        let trackers = self.trackers.read().unwrap_or_else(|err| err.into_inner());
        trackers.get(&id).cloned()
    }

    /// All stored trackers ordered by id.
    pub fn trackers(&self) -> Vec<Tracker> {
        let trackers = self.trackers.read().unwrap_or_else(|err| err.into_inner());
        let mut all: Vec<Tracker> = trackers.values().cloned().collect();
        all.sort_by_key(|tracker| tracker.id);
        all
    }

    pub fn application(&self, package_name: &str) -> Option<Application> {
        let applications = self
            .applications
            .read()
            .unwrap_or_else(|err| err.into_inner());
        applications.get(package_name).cloned()
    }

    /// Stored package names in lexical order.
    pub fn package_names(&self) -> Vec<String> {
        let applications = self
            .applications
            .read()
            .unwrap_or_else(|err| err.into_inner());
        let mut names: Vec<String> = applications.keys().cloned().collect();
        names.sort();
        names
    }
}

impl ReportStore for InMemoryStore {
    fn upsert_trackers<'a>(&'a self, trackers: Vec<Tracker>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut stored = self
                .trackers
                .write()
                .map_err(|_| anyhow!("tracker table lock poisoned"))?;
            for tracker in trackers {
                stored.insert(tracker.id, tracker);
            }
            Ok(())
        })
    }

    fn upsert_application<'a>(&'a self, application: Application) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut stored = self
                .applications
                .write()
                .map_err(|_| anyhow!("application table lock poisoned"))?;
            stored.insert(application.package_name.clone(), application);
            Ok(())
        })
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// A tracker signature known to the Exodus catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracker {
    pub id: u64,
    pub website: String,
    pub name: String,
    pub description: String,
    pub network_signature: String,
    pub code_signature: String,
    /// Day the tracker entered the catalog (UTC). `None` when the API value was malformed.
    pub creation_date: Option<NaiveDate>,
}

/// One analysis report for a given application version.
///
/// Equality and hashing only consider [`Report::id`], so a `HashSet<Report>` keeps a
/// single entry per report even if the API repeats it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: u64,
    pub downloads: String,
    pub version: String,
    pub version_code: Option<u64>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub trackers: HashSet<u64>,
}

impl PartialEq for Report {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Report {}

impl Hash for Report {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub package_name: String,
    pub creator: String,
    pub name: String,
    pub reports: HashSet<Report>,
}

impl Application {
    /// Returns the report with the highest id, which the API assigns to the newest analysis.
    pub fn latest_report(&self) -> Option<&Report> {
        self.reports.iter().max_by_key(|report| report.id)
    }
}

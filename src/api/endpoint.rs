use super::client::TransportError;
use reqwest::Url;
use std::fmt;

/// Resources exposed by the Exodus API that the worker consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Trackers,
    Reports,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Trackers => "trackers",
            Endpoint::Reports => "reports",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Joins `base` and the endpoint path with exactly one slash and parses the result.
pub fn endpoint_url(base: &str, endpoint: Endpoint) -> Result<Url, TransportError> {
    let raw = format!("{}/{}", base.trim_end_matches('/'), endpoint.path());
    Url::parse(&raw).map_err(|err| TransportError::InvalidUrl {
        url: raw,
        reason: err.to_string(),
    })
}

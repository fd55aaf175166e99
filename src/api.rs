//! Exodus API plumbing: endpoint addressing, response classification, and the HTTP
//! transport used by the processing worker.

pub mod client;
pub mod endpoint;

pub use client::{ApiResponse, ApiTransport, HttpApiClient, TransportError};
pub use endpoint::{endpoint_url, Endpoint};

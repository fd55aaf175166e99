//! HTTP access to the Exodus API. Houses the `ApiTransport` seam used by the worker and
//! the `reqwest`-backed `HttpApiClient`.

use super::endpoint::{endpoint_url, Endpoint};
use crate::runtime::config::ManagerConfig;
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::fmt;

/// The request could not even be issued. The worker abandons the item without telling
/// the listener when it sees one of these.
#[derive(Debug)]
pub enum TransportError {
    InvalidUrl { url: String, reason: String },
    Request { url: String, reason: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::InvalidUrl { url, reason } => {
                write!(f, "invalid API url {url}: {reason}")
            }
            TransportError::Request { url, reason } => {
                write!(f, "failed to open request to {url}: {reason}")
            }
        }
    }
}

impl std::error::Error for TransportError {}

/// Outcome of a request that reached the point of producing a response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResponse {
    /// 2xx response with its full body.
    Success(String),
    /// Error status, or a connection that failed after it was opened. `status` is `None`
    /// when no HTTP status was received at all.
    Failure { status: Option<u16>, body: String },
}

pub trait ApiTransport: Send + Sync {
    fn get<'a>(&'a self, endpoint: Endpoint) -> BoxFuture<'a, Result<ApiResponse, TransportError>>;
}

#[derive(Debug, Clone)]
pub struct HttpApiClient {
    base_url: String,
    client: Client,
}

impl ApiTransport for HttpApiClient {
    fn get<'a>(&'a self, endpoint: Endpoint) -> BoxFuture<'a, Result<ApiResponse, TransportError>> {
        Box::pin(self.fetch(endpoint))
    }
}

impl HttpApiClient {
    pub fn from_config(config: &ManagerConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("failed to build API HTTP client")?;

        Ok(Self {
            base_url: config.api_url().to_owned(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn fetch(&self, endpoint: Endpoint) -> Result<ApiResponse, TransportError> {
        let url = endpoint_url(&self.base_url, endpoint)?;

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(err) if err.is_builder() => {
                return Err(TransportError::Request {
                    url: url.to_string(),
                    reason: err.to_string(),
                });
            }
            Err(err) => {
                tracing::warn!(%endpoint, error = %err, "API request failed before a response arrived");
                return Ok(ApiResponse::Failure {
                    status: None,
                    body: String::new(),
                });
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(%endpoint, status = status.as_u16(), error = %err, "failed to read API response body");
                String::new()
            }
        };

        tracing::debug!(
            %endpoint,
            status = status.as_u16(),
            bytes = body.len(),
            "API response received"
        );

        if status.is_success() {
            Ok(ApiResponse::Success(body))
        } else {
            Ok(ApiResponse::Failure {
                status: Some(status.as_u16()),
                body,
            })
        }
    }
}

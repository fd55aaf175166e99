use std::{
    collections::HashMap,
    convert::Infallible,
    sync::{Arc, RwLock},
    time::Duration,
};

use anyhow::{Context, Result};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub accept: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Clone, Default)]
pub struct MockApi {
    inner: Arc<RwLock<MockApiInner>>,
}

#[derive(Default)]
struct MockApiInner {
    routes: HashMap<String, (u16, String)>,
    requests: Vec<RecordedRequest>,
    delay: Option<Duration>,
}

impl MockApi {
    pub fn new(trackers: impl Into<String>, reports: impl Into<String>) -> Self {
        let api = Self::default();
        api.respond("/api/trackers", 200, trackers);
        api.respond("/api/reports", 200, reports);
        api
    }

    pub fn respond(&self, path: &str, status: u16, body: impl Into<String>) {
        let mut inner = self.inner.write().expect("mock api poisoned");
        inner.routes.insert(path.to_owned(), (status, body.into()));
    }

    /// Delays every response, keeping the worker busy while more requests queue up.
    pub fn set_delay(&self, delay: Duration) {
        self.inner.write().expect("mock api poisoned").delay = Some(delay);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.read().expect("mock api poisoned").requests.clone()
    }

    fn record(&self, request: RecordedRequest) -> (Option<Duration>, Option<(u16, String)>) {
        let mut inner = self.inner.write().expect("mock api poisoned");
        let route = inner.routes.get(&request.path).cloned();
        inner.requests.push(request);
        (inner.delay, route)
    }
}

pub struct MockApiServer {
    url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MockApiServer {
    pub async fn start(api: MockApi) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind mock API listener")?;
        let addr = listener
            .local_addr()
            .context("failed to read mock listener address")?;
        let std_listener = listener
            .into_std()
            .context("failed to convert mock listener")?;
        std_listener
            .set_nonblocking(true)
            .context("failed to set mock listener non-blocking")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let make_service = make_service_fn(move |_| {
            let api = api.clone();
            async move { Ok::<_, Infallible>(service_fn(move |req| serve_request(api.clone(), req))) }
        });

        let server = Server::from_tcp(std_listener)
            .context("failed to build mock HTTP server")?
            .serve(make_service);
        let graceful = server.with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });

        let handle = tokio::spawn(async move {
            if let Err(err) = graceful.await {
                eprintln!("mock API server stopped: {err}");
            }
        });

        Ok(Self {
            url: format!("http://{addr}/api"),
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn serve_request(api: MockApi, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    if req.method() != Method::GET {
        let mut response = Response::new(Body::from("Unsupported method"));
        *response.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
        return Ok(response);
    }

    let header = |name: hyper::header::HeaderName| {
        req.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };
    let recorded = RecordedRequest {
        path: req.uri().path().to_owned(),
        accept: header(hyper::header::ACCEPT),
        content_type: header(hyper::header::CONTENT_TYPE),
    };

    let (delay, route) = api.record(recorded);
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let (status, body) = route.unwrap_or((404, "not found".to_owned()));
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    Ok(response)
}

pub mod api;
pub mod domain;
pub mod processor;
pub mod runtime;

pub use api::{ApiResponse, ApiTransport, Endpoint, HttpApiClient, TransportError};
pub use domain::{Application, DecodeError, Report, Tracker};
pub use processor::manager::NetworkManager;
pub use processor::queue::{RequestContext, WorkItem, WorkRequest};
pub use runtime::config::{ManagerConfig, ManagerConfigBuilder, ManagerConfigParams};
pub use runtime::connectivity::{is_connected, Connectivity, NetworkState, StaticConnectivity};
pub use runtime::listener::{
    ChannelListener, ListenerEvent, NetworkError, NetworkListener, ProgressStep,
};
pub use runtime::storage::{InMemoryStore, ReportStore};
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};

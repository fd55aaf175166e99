//! Runtime glue: configuration, telemetry, and the collaborator seams (connectivity,
//! listener, storage) the worker runs against.

pub mod config;
pub mod connectivity;
pub mod listener;
pub mod storage;
pub mod telemetry;

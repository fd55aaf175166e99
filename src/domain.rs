//! Domain records published by the Exodus API and the decoders that build them.

pub mod decode;
pub mod models;

pub use decode::DecodeError;
pub use models::{Application, Report, Tracker};

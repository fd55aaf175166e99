//! Request processing: the FIFO queue, the single sequential worker, its lifecycle, and
//! the manager facade callers submit work through.

pub(crate) mod lifecycle;
pub mod manager;
pub mod queue;
pub mod worker;

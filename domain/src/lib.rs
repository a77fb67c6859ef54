//! Batch job model shared by the scheduler back ends.

pub mod error;
pub mod model;
pub mod service;

pub use error::{SchedulerError, SchedulerResult};

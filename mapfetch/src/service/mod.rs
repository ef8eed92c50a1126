//! High-level service facade.
//!
//! [`FetchService`] builds the transport, cache and coordinator from a
//! [`ConfigFile`](crate::config::ConfigFile) and owns the coordinator task.

mod error;
mod facade;

pub use error::ServiceError;
pub use facade::FetchService;

//! Backend Query Integration
//!
//! The backend owns the network model. Most traffic toward it is
//! fire-and-forget ([`BackendCall`](crate::messages::BackendCall)); queries
//! that return a value go through the [`NetworkBackend`] trait.
//!
//! # Available Backends
//!
//! - **JSON lines**: [`JsonLinesBackend`](crate::transport::JsonLinesBackend),
//!   answers queries over the daemon's frame stream
//!
//! # Usage
//!
//! ```ignore
//! use mapsync_core::backend::NetworkBackend;
//!
//! let bandwidth = backend.get_bandwidth(&"onu-7".into()).await?;
//! ```

mod traits;

pub use traits::NetworkBackend;

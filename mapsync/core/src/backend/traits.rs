//! Network Backend Traits
//!
//! Trait definition for backend queries. This abstraction lets the controller
//! run against an RPC bridge, a JSON-lines pipe or a test double without
//! changing its logic.

use async_trait::async_trait;

use crate::messages::EntityId;

/// Network backend trait
///
/// Implement this trait to answer the queries the map layer makes.
#[async_trait]
pub trait NetworkBackend: Send + Sync {
    /// Get the backend name (e.g. "json-lines")
    fn name(&self) -> &str;

    /// Fetch the provisioned bandwidth of a node, in Mbps
    ///
    /// Resolves at most once per call. The controller treats an error as
    /// "no enrichment" and logs it.
    async fn get_bandwidth(&self, id: &EntityId) -> anyhow::Result<f64>;
}

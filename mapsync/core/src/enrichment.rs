//! Marker Enrichment
//!
//! Some markers get extra display text fetched from the backend after they are
//! installed (currently the provisioned bandwidth of ONU nodes). The query is
//! the only suspension point in the sync layer.
//!
//! Each query is spawned as a task that remembers the id *and* the layer
//! handle it was issued for. The controller applies results on its own turn
//! and drops any result whose layer is gone or was replaced in the meantime.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinSet;

use crate::backend::NetworkBackend;
use crate::messages::EntityId;
use crate::render::LayerHandle;

/// Result of a bandwidth query, ready to be applied to a marker
#[derive(Clone, Debug, PartialEq)]
pub struct Enrichment {
    /// Marker the query was issued for
    pub id: EntityId,
    /// Layer instance the query was issued for
    pub handle: LayerHandle,
    /// Component type at the time of the query
    pub component_type: String,
    /// Bandwidth returned by the backend, in Mbps
    pub bandwidth: f64,
}

impl Enrichment {
    /// Display text for the enriched marker
    #[must_use]
    pub fn display_text(&self) -> String {
        format!(
            "{}<br>Bandwidth: {} Mbps",
            self.component_type, self.bandwidth
        )
    }
}

/// Spawn a bandwidth query for a freshly installed marker
///
/// The task yields `None` if the backend query fails. Without a Tokio
/// runtime on the calling thread no query is issued and `false` is returned;
/// the marker keeps its plain text.
pub(crate) fn spawn_bandwidth_query<B: NetworkBackend + 'static>(
    tasks: &mut JoinSet<Option<Enrichment>>,
    backend: Arc<B>,
    id: EntityId,
    handle: LayerHandle,
    component_type: String,
) -> bool {
    let Ok(runtime) = Handle::try_current() else {
        tracing::warn!(id = %id, "No async runtime, skipping bandwidth query");
        return false;
    };

    tracing::debug!(id = %id, backend = backend.name(), "Bandwidth query issued");
    let query = async move {
        match backend.get_bandwidth(&id).await {
            Ok(bandwidth) => Some(Enrichment {
                id,
                handle,
                component_type,
                bandwidth,
            }),
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "Bandwidth query failed");
                None
            }
        }
    };
    tasks.spawn_on(query, &runtime);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_text() {
        let enrichment = Enrichment {
            id: "m1".into(),
            handle: LayerHandle::from_raw(1),
            component_type: "ONUNode".to_string(),
            bandwidth: 100.0,
        };
        assert_eq!(enrichment.display_text(), "ONUNode<br>Bandwidth: 100 Mbps");
    }

    #[test]
    fn test_display_text_fractional() {
        let enrichment = Enrichment {
            id: "m1".into(),
            handle: LayerHandle::from_raw(1),
            component_type: "ONUNode".to_string(),
            bandwidth: 2.5,
        };
        assert_eq!(enrichment.display_text(), "ONUNode<br>Bandwidth: 2.5 Mbps");
    }
}

//! Layer Registry - Rendered Entity Bookkeeping
//!
//! The registry maps backend identifiers to the layers currently installed on
//! the map surface. It owns the surface while one is attached and is the only
//! code that installs or removes tagged layers.
//!
//! # Architecture
//!
//! ```text
//!                        LayerRegistry
//!            ┌─────────────────────────────────────────┐
//!            │ HashMap<EntityId, Layer>                │
//!            │ HashMap<LayerHandle, EntityId>          │
//!            │ Option<S: RenderSurface>                │
//!            └───────────────┬─────────────────────────┘
//!                            │
//!        ┌───────────────────┼───────────────────┐
//!        │                   │                   │
//!  ┌─────▼─────┐      ┌──────▼──────┐     ┌──────▼──────┐
//!  │ base tiles│      │ marker "m1" │     │ line "c1"   │
//!  │ (no id)   │      │  layer-3    │     │  layer-7    │
//!  └───────────┘      └─────────────┘     └─────────────┘
//! ```
//!
//! The base layer is never recorded here, so bulk operations cannot reach it.
//!
//! # Ownership
//!
//! The registry is plain single-owner state. All mutation happens on the
//! controller's turn, so there is no locking.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::geo::LatLng;
use crate::messages::EntityId;
use crate::render::{LayerHandle, RenderSurface};

/// Layer discriminator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    /// Icon marker for a network node
    Marker,
    /// Polyline for a network link
    Connection,
}

/// How a connection's color is changed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecolorStrategy {
    /// Remove the layer and install a new one with the new color
    #[default]
    Recreate,
    /// Patch the stroke color of the existing layer
    Restyle,
}

impl RecolorStrategy {
    /// Parse a strategy name
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "recreate" => Some(Self::Recreate),
            "restyle" => Some(Self::Restyle),
            _ => None,
        }
    }
}

/// A network node rendered as a marker
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerEntity {
    /// Backend identifier
    pub id: EntityId,
    /// Marker position
    pub position: LatLng,
    /// Backend component type tag
    pub component_type: String,
    /// Icon asset reference
    pub icon_ref: String,
    /// Display text bound to the marker
    pub display_text: String,
}

/// A network link rendered as a polyline
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionEntity {
    /// Backend identifier
    pub id: EntityId,
    /// Line endpoints
    pub endpoints: [LatLng; 2],
    /// Current stroke color
    pub color: String,
}

impl ConnectionEntity {
    /// Discriminator carried by every connection
    pub const KIND: LayerKind = LayerKind::Connection;
}

/// Entity behind a registry layer
#[derive(Clone, Debug, PartialEq)]
pub enum Entity {
    /// Node marker
    Marker(MarkerEntity),
    /// Link polyline
    Connection(ConnectionEntity),
}

impl Entity {
    /// Backend identifier
    #[must_use]
    pub fn id(&self) -> &EntityId {
        match self {
            Self::Marker(m) => &m.id,
            Self::Connection(c) => &c.id,
        }
    }

    /// Layer discriminator
    #[must_use]
    pub fn kind(&self) -> LayerKind {
        match self {
            Self::Marker(_) => LayerKind::Marker,
            Self::Connection(_) => ConnectionEntity::KIND,
        }
    }

    /// Borrow as a marker
    #[must_use]
    pub fn as_marker(&self) -> Option<&MarkerEntity> {
        match self {
            Self::Marker(m) => Some(m),
            Self::Connection(_) => None,
        }
    }

    /// Borrow as a connection
    #[must_use]
    pub fn as_connection(&self) -> Option<&ConnectionEntity> {
        match self {
            Self::Connection(c) => Some(c),
            Self::Marker(_) => None,
        }
    }
}

/// An installed, tagged layer
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    /// Surface handle of the current layer instance
    pub handle: LayerHandle,
    /// Entity the layer renders
    pub entity: Entity,
}

/// Counts of registered layers by kind
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySummary {
    /// Number of marker layers
    pub markers: usize,
    /// Number of connection layers
    pub connections: usize,
}

impl RegistrySummary {
    /// Total number of tagged layers
    #[must_use]
    pub fn total(&self) -> usize {
        self.markers + self.connections
    }
}

/// Registry of tagged layers on one map surface
pub struct LayerRegistry<S> {
    /// Attached surface (`None` = not initialized)
    surface: Option<S>,
    /// Layers keyed by backend identifier
    layers: HashMap<EntityId, Layer>,
    /// Reverse index for interaction dispatch
    by_handle: HashMap<LayerHandle, EntityId>,
}

impl<S: RenderSurface> Default for LayerRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: RenderSurface> LayerRegistry<S> {
    /// Create a registry with no surface attached
    #[must_use]
    pub fn new() -> Self {
        Self {
            surface: None,
            layers: HashMap::new(),
            by_handle: HashMap::new(),
        }
    }

    /// Create a registry bound to a surface
    #[must_use]
    pub fn with_surface(surface: S) -> Self {
        let mut registry = Self::new();
        registry.attach(surface);
        registry
    }

    /// Attach a surface, starting from an empty registry
    ///
    /// Returns the previously attached surface, if any.
    pub fn attach(&mut self, surface: S) -> Option<S> {
        tracing::info!(surface = surface.name(), "Render surface attached");
        let previous = self.surface.replace(surface);
        self.layers.clear();
        self.by_handle.clear();
        previous
    }

    /// Detach the surface and forget every layer
    pub fn detach(&mut self) -> Option<S> {
        self.layers.clear();
        self.by_handle.clear();
        let surface = self.surface.take();
        if let Some(ref s) = surface {
            tracing::info!(surface = s.name(), "Render surface detached");
        }
        surface
    }

    /// Whether a surface is attached
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.surface.is_some()
    }

    /// Borrow the attached surface
    #[must_use]
    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    /// Install a marker layer
    ///
    /// A live layer with the same id is removed first. Returns `None` without
    /// touching anything if no surface is attached or the id is empty.
    pub fn upsert_marker(
        &mut self,
        id: EntityId,
        position: LatLng,
        component_type: &str,
        icon_ref: &str,
    ) -> Option<LayerHandle> {
        if id.is_empty() || self.surface.is_none() {
            return None;
        }
        self.remove_by_id(&id);

        let surface = self.surface.as_mut()?;
        let handle = surface.add_marker(position, icon_ref);
        surface.bind_text(handle, component_type);

        tracing::debug!(id = %id, handle = %handle, component_type, "Marker installed");
        self.by_handle.insert(handle, id.clone());
        self.layers.insert(
            id.clone(),
            Layer {
                handle,
                entity: Entity::Marker(MarkerEntity {
                    id,
                    position,
                    component_type: component_type.to_string(),
                    icon_ref: icon_ref.to_string(),
                    display_text: component_type.to_string(),
                }),
            },
        );
        Some(handle)
    }

    /// Install a connection layer
    ///
    /// Same replacement and readiness rules as [`Self::upsert_marker`].
    pub fn upsert_connection(
        &mut self,
        id: EntityId,
        endpoints: [LatLng; 2],
        color: &str,
    ) -> Option<LayerHandle> {
        if id.is_empty() || self.surface.is_none() {
            return None;
        }
        self.remove_by_id(&id);

        let surface = self.surface.as_mut()?;
        let handle = surface.add_polyline(&endpoints, color);

        tracing::debug!(id = %id, handle = %handle, color, "Connection installed");
        self.by_handle.insert(handle, id.clone());
        self.layers.insert(
            id.clone(),
            Layer {
                handle,
                entity: Entity::Connection(ConnectionEntity {
                    id,
                    endpoints,
                    color: color.to_string(),
                }),
            },
        );
        Some(handle)
    }

    /// Remove the layer tagged with `id`
    ///
    /// Returns true if a layer was removed. Removing an absent id is a no-op.
    pub fn remove_by_id(&mut self, id: &EntityId) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        let Some(layer) = self.layers.remove(id) else {
            return false;
        };
        self.by_handle.remove(&layer.handle);
        surface.remove_layer(layer.handle);
        tracing::debug!(id = %id, handle = %layer.handle, "Layer removed");
        true
    }

    /// Remove every tagged layer, leaving untagged layers on the surface
    ///
    /// Returns the number of layers removed.
    pub fn clear_all_tagged(&mut self) -> usize {
        let Some(surface) = self.surface.as_mut() else {
            return 0;
        };
        let removed = self.layers.len();
        for (_, layer) in self.layers.drain() {
            surface.remove_layer(layer.handle);
        }
        self.by_handle.clear();
        tracing::debug!(removed, "Tagged layers cleared");
        removed
    }

    /// Iterate over connection layers
    ///
    /// Each call starts a fresh pass over the current connections.
    pub fn connections(&self) -> impl Iterator<Item = &ConnectionEntity> + '_ {
        self.layers.values().filter_map(|l| l.entity.as_connection())
    }

    /// Iterate over marker layers
    pub fn markers(&self) -> impl Iterator<Item = &MarkerEntity> + '_ {
        self.layers.values().filter_map(|l| l.entity.as_marker())
    }

    /// Change a connection's color, keeping its id and endpoints
    ///
    /// With [`RecolorStrategy::Recreate`] the old layer is removed before the
    /// new one is installed, so at most one layer carries the id at any time.
    /// Returns the handle of the layer now carrying the id.
    pub fn recolor_connection(
        &mut self,
        id: &EntityId,
        color: &str,
        strategy: RecolorStrategy,
    ) -> Option<LayerHandle> {
        let surface = self.surface.as_mut()?;
        let layer = self.layers.get_mut(id)?;
        let Entity::Connection(connection) = &mut layer.entity else {
            return None;
        };

        match strategy {
            RecolorStrategy::Recreate => {
                surface.remove_layer(layer.handle);
                self.by_handle.remove(&layer.handle);
                let handle = surface.add_polyline(&connection.endpoints, color);
                self.by_handle.insert(handle, id.clone());
                layer.handle = handle;
            }
            RecolorStrategy::Restyle => {
                surface.set_color(layer.handle, color);
            }
        }
        connection.color = color.to_string();

        tracing::trace!(id = %id, handle = %layer.handle, color, "Connection recolored");
        Some(layer.handle)
    }

    /// Replace a marker's display text
    ///
    /// Only applies if `id` is still rendered by the exact layer instance
    /// `handle`. Returns true if the text was updated.
    pub fn set_marker_text(&mut self, id: &EntityId, handle: LayerHandle, text: &str) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        let Some(layer) = self.layers.get_mut(id) else {
            return false;
        };
        if layer.handle != handle {
            return false;
        }
        let Entity::Marker(marker) = &mut layer.entity else {
            return false;
        };
        marker.display_text = text.to_string();
        surface.bind_text(handle, text);
        true
    }

    /// Resolve a surface handle to the id it is tagged with
    #[must_use]
    pub fn id_for_handle(&self, handle: LayerHandle) -> Option<&EntityId> {
        self.by_handle.get(&handle)
    }

    /// Look up a layer by id
    #[must_use]
    pub fn get(&self, id: &EntityId) -> Option<&Layer> {
        self.layers.get(id)
    }

    /// Check if an id is currently rendered
    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.layers.contains_key(id)
    }

    /// Number of tagged layers
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether no tagged layers are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Get the ids of all tagged layers
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.layers.keys().cloned().collect()
    }

    /// Count layers by kind
    #[must_use]
    pub fn summary(&self) -> RegistrySummary {
        let mut summary = RegistrySummary::default();
        for layer in self.layers.values() {
            match layer.entity.kind() {
                LayerKind::Marker => summary.markers += 1,
                LayerKind::Connection => summary.connections += 1,
            }
        }
        summary
    }
}

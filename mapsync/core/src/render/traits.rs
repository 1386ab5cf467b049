//! Render Surface Traits
//!
//! Trait definitions for map surfaces. This abstraction lets the sync
//! controller drive a browser map widget, a native canvas or a headless scene
//! without changing its logic.
//!
//! # Design Philosophy
//!
//! A surface knows layers, not entities. It hands out a [`LayerHandle`] for
//! every installed layer and reports interactions in terms of those handles.
//! Mapping handles back to backend identifiers is the registry's job.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geo::LatLng;

/// Surface-assigned identity of one installed layer
///
/// A handle names one layer *instance*. Recreating a connection to change its
/// color yields a new handle even though the backend identifier stays the same.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerHandle(u64);

impl LayerHandle {
    /// Create a handle from a raw value
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw numeric value
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer-{}", self.0)
    }
}

/// Map surface trait
///
/// Implement this trait to let the sync controller drive a map.
/// Operations on handles the surface no longer knows must be no-ops.
pub trait RenderSurface {
    /// Surface name (e.g. "headless", "leaflet")
    fn name(&self) -> &str;

    /// Install a marker layer with an icon at `position`
    fn add_marker(&mut self, position: LatLng, icon_ref: &str) -> LayerHandle;

    /// Install a polyline layer through `vertices`
    fn add_polyline(&mut self, vertices: &[LatLng], color: &str) -> LayerHandle;

    /// Remove a layer
    ///
    /// Returns true if the layer existed.
    fn remove_layer(&mut self, handle: LayerHandle) -> bool;

    /// Restyle a layer's stroke color in place
    ///
    /// Returns true if the layer existed.
    fn set_color(&mut self, handle: LayerHandle, color: &str) -> bool;

    /// Bind display text (popup content) to a layer
    ///
    /// Returns true if the layer existed.
    fn bind_text(&mut self, handle: LayerHandle, text: &str) -> bool;

    /// Enumerate every layer currently on the surface, base layer included
    fn layers(&self) -> Vec<LayerHandle>;

    /// Check whether a layer is currently on the surface
    fn contains(&self, handle: LayerHandle) -> bool {
        self.layers().contains(&handle)
    }
}

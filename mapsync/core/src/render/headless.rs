//! Headless Surface
//!
//! In-memory scene used when no real map is attached: unit tests, integration
//! tests and the daemon. It behaves like a map widget that starts with one
//! untagged tile layer and draws nothing.

use crate::geo::LatLng;

use super::traits::{LayerHandle, RenderSurface};

/// Default tile source for the base layer
const DEFAULT_TILES: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// What a scene layer draws
#[derive(Clone, Debug, PartialEq)]
pub enum SceneLayerKind {
    /// Base tile layer
    Tiles {
        /// Tile URL template
        url: String,
    },
    /// Icon marker
    Marker {
        /// Marker position
        position: LatLng,
        /// Icon asset reference
        icon_ref: String,
    },
    /// Polyline
    Polyline {
        /// Line vertices
        vertices: Vec<LatLng>,
        /// Stroke color
        color: String,
    },
}

/// One layer of the headless scene
#[derive(Clone, Debug, PartialEq)]
pub struct SceneLayer {
    /// Surface handle
    pub handle: LayerHandle,
    /// What the layer draws
    pub kind: SceneLayerKind,
    /// Bound display text
    pub text: Option<String>,
}

/// In-memory map surface
#[derive(Clone, Debug)]
pub struct HeadlessSurface {
    layers: Vec<SceneLayer>,
    next_handle: u64,
    base: LayerHandle,
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessSurface {
    /// Create a surface with the default base tile layer
    #[must_use]
    pub fn new() -> Self {
        Self::with_tiles(DEFAULT_TILES)
    }

    /// Create a surface with a custom base tile source
    #[must_use]
    pub fn with_tiles(url: impl Into<String>) -> Self {
        let base = LayerHandle::from_raw(0);
        Self {
            layers: vec![SceneLayer {
                handle: base,
                kind: SceneLayerKind::Tiles { url: url.into() },
                text: None,
            }],
            next_handle: 1,
            base,
        }
    }

    /// Handle of the base tile layer
    #[must_use]
    pub fn base_layer(&self) -> LayerHandle {
        self.base
    }

    /// Look up a layer by handle
    #[must_use]
    pub fn layer(&self, handle: LayerHandle) -> Option<&SceneLayer> {
        self.layers.iter().find(|l| l.handle == handle)
    }

    /// Number of layers, base layer included
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether the scene is empty (only after the base layer was removed)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Count marker layers
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.layers
            .iter()
            .filter(|l| matches!(l.kind, SceneLayerKind::Marker { .. }))
            .count()
    }

    /// Count polyline layers
    #[must_use]
    pub fn polyline_count(&self) -> usize {
        self.layers
            .iter()
            .filter(|l| matches!(l.kind, SceneLayerKind::Polyline { .. }))
            .count()
    }

    fn install(&mut self, kind: SceneLayerKind) -> LayerHandle {
        let handle = LayerHandle::from_raw(self.next_handle);
        self.next_handle += 1;
        self.layers.push(SceneLayer {
            handle,
            kind,
            text: None,
        });
        handle
    }

    fn layer_mut(&mut self, handle: LayerHandle) -> Option<&mut SceneLayer> {
        self.layers.iter_mut().find(|l| l.handle == handle)
    }
}

impl RenderSurface for HeadlessSurface {
    fn name(&self) -> &str {
        "headless"
    }

    fn add_marker(&mut self, position: LatLng, icon_ref: &str) -> LayerHandle {
        self.install(SceneLayerKind::Marker {
            position,
            icon_ref: icon_ref.to_string(),
        })
    }

    fn add_polyline(&mut self, vertices: &[LatLng], color: &str) -> LayerHandle {
        self.install(SceneLayerKind::Polyline {
            vertices: vertices.to_vec(),
            color: color.to_string(),
        })
    }

    fn remove_layer(&mut self, handle: LayerHandle) -> bool {
        let before = self.layers.len();
        self.layers.retain(|l| l.handle != handle);
        self.layers.len() != before
    }

    fn set_color(&mut self, handle: LayerHandle, color: &str) -> bool {
        match self.layer_mut(handle) {
            Some(SceneLayer {
                kind: SceneLayerKind::Polyline { color: current, .. },
                ..
            }) => {
                *current = color.to_string();
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    fn bind_text(&mut self, handle: LayerHandle, text: &str) -> bool {
        match self.layer_mut(handle) {
            Some(layer) => {
                layer.text = Some(text.to_string());
                true
            }
            None => false,
        }
    }

    fn layers(&self) -> Vec<LayerHandle> {
        self.layers.iter().map(|l| l.handle).collect()
    }

    fn contains(&self, handle: LayerHandle) -> bool {
        self.layers.iter().any(|l| l.handle == handle)
    }
}

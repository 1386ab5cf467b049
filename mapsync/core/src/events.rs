//! Inbound Events
//!
//! Two streams feed the sync controller:
//!
//! - [`BackendSignal`]: what the backend wants shown on the map
//! - [`SurfaceInteraction`]: what the user did on the map surface
//!
//! Both are delivered on the same cooperative thread, in arrival order.
//! Payloads are passed through untouched: a malformed id list or an
//! out-of-range coordinate is the backend's business, not the controller's.

use serde::{Deserialize, Serialize};

use crate::geo::LatLng;
use crate::messages::EntityId;
use crate::render::LayerHandle;

/// Signals from the backend to the map
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BackendSignal {
    /// Place a marker for a network node
    AddMarker {
        /// Marker position
        position: LatLng,
        /// Backend component type tag (e.g. `ONUNode`)
        component_type: String,
        /// Backend identifier
        id: EntityId,
        /// Icon asset reference
        icon_ref: String,
    },

    /// Draw a connection between two positions
    AddConnection {
        /// First endpoint
        from: LatLng,
        /// Second endpoint
        to: LatLng,
        /// Backend identifier
        id: EntityId,
        /// Initial line color
        color: String,
    },

    /// Repaint every connection: listed ids get the highlight color, all
    /// others get the normal color
    HighlightConnections {
        /// Comma-separated connection ids
        ids_csv: String,
        /// Color for listed connections
        highlight_color: String,
        /// Color for every other connection
        normal_color: String,
    },

    /// Recolor a single connection
    RecolorConnection {
        /// Connection identifier
        id: EntityId,
        /// New line color
        color: String,
    },

    /// Remove every tagged layer from the map
    CleanMap,

    /// The backend's selected component type changed (logged only)
    SelectedTypeChanged {
        /// Current value of the backend's selected type property
        selected_type: Option<String>,
    },
}

impl BackendSignal {
    /// Wire name of this signal
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddMarker { .. } => "add-marker",
            Self::AddConnection { .. } => "add-connection",
            Self::HighlightConnections { .. } => "highlight-connections",
            Self::RecolorConnection { .. } => "recolor-connection",
            Self::CleanMap => "clean-map",
            Self::SelectedTypeChanged { .. } => "selected-type-changed",
        }
    }
}

/// Pointer interactions reported by the map surface
///
/// `layer` is the topmost layer under the pointer as reported by the
/// surface, or `None` when the surface reports no hit at all.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SurfaceInteraction {
    /// Primary click
    Click {
        /// Where the click landed
        position: LatLng,
        /// Layer under the pointer
        #[serde(default)]
        layer: Option<LayerHandle>,
    },

    /// Double click
    DoubleClick {
        /// Where the click landed
        position: LatLng,
        /// Layer under the pointer
        #[serde(default)]
        layer: Option<LayerHandle>,
    },
}

impl SurfaceInteraction {
    /// Layer under the pointer, if any
    #[must_use]
    pub fn layer(&self) -> Option<LayerHandle> {
        match self {
            Self::Click { layer, .. } | Self::DoubleClick { layer, .. } => *layer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_names() {
        assert_eq!(BackendSignal::CleanMap.name(), "clean-map");
        let signal = BackendSignal::HighlightConnections {
            ids_csv: "c1,c2".to_string(),
            highlight_color: "red".to_string(),
            normal_color: "blue".to_string(),
        };
        assert_eq!(signal.name(), "highlight-connections");
    }

    #[test]
    fn test_interaction_deserialize() {
        let json = r#"{"kind":"double-click","position":{"lat":1.0,"lng":2.0},"layer":7}"#;
        let interaction: SurfaceInteraction = serde_json::from_str(json).unwrap();
        assert_eq!(interaction.layer(), Some(LayerHandle::from_raw(7)));

        let json = r#"{"kind":"click","position":{"lat":1.0,"lng":2.0}}"#;
        let interaction: SurfaceInteraction = serde_json::from_str(json).unwrap();
        assert!(interaction.layer().is_none());
    }
}

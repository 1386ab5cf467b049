//! Backend Calls
//!
//! Calls sent from the sync layer to the backend. These carry what the user did
//! on the map surface. None of them expects an answer: the backend decides what
//! a click means and reacts by emitting new signals.
//!
//! # Design Philosophy
//!
//! The map surface is a "dumb" renderer. It reports clicks and removal requests
//! and never interprets them. The bandwidth query is the one call that returns
//! a value, so it lives on the [`NetworkBackend`](crate::backend::NetworkBackend)
//! trait instead of this enum.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geo::LatLng;

/// Backend-assigned entity identifier
///
/// Markers and connections share a single identifier space. The base map
/// layer has no identifier at all, so a registry entry always carries a
/// non-empty one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Create an identifier from a string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this identifier is empty (and therefore cannot tag a layer)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Calls from the sync layer to the backend
///
/// All of these are fire-and-forget notifications.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BackendCall {
    /// User clicked an empty area of the map
    MapClick {
        /// Where the click landed
        position: LatLng,
    },

    /// User clicked a marker
    MarkerClick {
        /// Marker that was clicked
        id: EntityId,
    },

    /// User asked for a component to be removed (double-click)
    ///
    /// The layer is removed locally before the backend sees this call.
    RemoveComponent {
        /// Component to remove
        id: EntityId,
    },

    /// Diagnostic message for the backend's own log
    Log {
        /// Message text
        message: String,
    },
}

impl BackendCall {
    /// Wire name of this call
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::MapClick { .. } => "map-click",
            Self::MarkerClick { .. } => "marker-click",
            Self::RemoveComponent { .. } => "remove-component",
            Self::Log { .. } => "log",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_conversions() {
        let a: EntityId = "m1".into();
        let b: EntityId = String::from("m1").into();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "m1");
        assert_eq!(a.to_string(), "m1");
        assert!(!a.is_empty());
        assert!(EntityId::new("").is_empty());
    }

    #[test]
    fn test_backend_call_names() {
        let call = BackendCall::RemoveComponent { id: "c1".into() };
        assert_eq!(call.name(), "remove-component");

        let call = BackendCall::MapClick {
            position: LatLng::new(1.0, 2.0),
        };
        assert_eq!(call.name(), "map-click");
    }
}

//! Mapsync Core - Headless Backend/Map Synchronization
//!
//! This crate mirrors the entities of a network model backend (nodes and
//! links) onto a live 2D map surface, and relays what the user does on that
//! surface back to the backend. It has no opinion about how the map is drawn:
//! it can drive a browser map widget, a native canvas, or run headless for
//! testing and automation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Backend (model)                          │
//! │        owns nodes, links, bandwidth, topology validation         │
//! └───────────────┬───────────────────────────────▲──────────────────┘
//!                 │                               │
//!          BackendSignal (down)            BackendCall (up)
//!                 │                      get-bandwidth query
//!                 │                               │
//! ┌───────────────▼───────────────────────────────┴──────────────────┐
//! │                          MAPSYNC CORE                            │
//! │  ┌────────────────────────────────────────────────────────────┐  │
//! │  │                      SyncController                        │  │
//! │  │  ┌───────────────┐  ┌───────────────┐  ┌────────────────┐  │  │
//! │  │  │ LayerRegistry │  │  Enrichment   │  │ NetworkBackend │  │  │
//! │  │  │ id -> layer   │  │  (JoinSet)    │  │  (queries)     │  │  │
//! │  │  └───────┬───────┘  └───────────────┘  └────────────────┘  │  │
//! │  └──────────┼─────────────────────────────────────────────────┘  │
//! └─────────────┼────────────────────────────────▲───────────────────┘
//!               │                                │
//!        RenderSurface calls            SurfaceInteraction
//!               │                                │
//! ┌─────────────▼────────────────────────────────┴───────────────────┐
//! │               Map surface (web widget / headless)                │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`SyncController`]: Applies backend signals and dispatches interactions
//! - [`LayerRegistry`]: Backend identifier to rendered layer bookkeeping
//! - [`BackendSignal`]: Signals from the backend to the map
//! - [`BackendCall`]: Calls from the map to the backend
//! - [`RenderSurface`]: What the sync layer needs from a map
//! - [`NetworkBackend`]: Queries that return a value
//!
//! # Quick Start
//!
//! ```ignore
//! use mapsync_core::{load_config, HeadlessSurface, SyncController};
//! use tokio::sync::mpsc;
//!
//! let config = load_config()?;
//! let (tx, mut calls) = mpsc::channel(config.sync.channel_capacity);
//! let mut controller = SyncController::new(backend, config.sync, tx);
//! controller.attach_surface(HeadlessSurface::new());
//!
//! controller.handle_signal(signal).await;
//! controller.poll_enrichments();
//! while let Ok(call) = calls.try_recv() {
//!     // forward to the backend
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: Query trait for backend round trips
//! - [`config`]: TOML/env/CLI configuration loading
//! - [`controller`]: The sync controller and its handlers
//! - [`enrichment`]: Asynchronous marker enrichment results
//! - [`events`]: Backend signals and surface interactions
//! - [`geo`]: Latitude/longitude positions
//! - [`messages`]: Entity identifiers and backend calls
//! - [`registry`]: Layer registry
//! - [`render`]: Render surface trait and the headless surface
//! - [`transport`]: JSON lines framing and the JSON lines backend

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod controller;
pub mod enrichment;
pub mod events;
pub mod geo;
pub mod messages;
pub mod registry;
pub mod render;
pub mod transport;

// Re-exports for convenience
pub use backend::NetworkBackend;
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, MapsyncConfigFile,
};
pub use controller::{IgnoreReason, Outcome, SyncConfig, SyncController, DEFAULT_ENRICHMENT_TYPE};
pub use enrichment::Enrichment;
pub use events::{BackendSignal, SurfaceInteraction};
pub use geo::LatLng;
pub use messages::{BackendCall, EntityId};
pub use registry::{
    ConnectionEntity, Entity, Layer, LayerKind, LayerRegistry, MarkerEntity, RecolorStrategy,
    RegistrySummary,
};
pub use render::{HeadlessSurface, LayerHandle, RenderSurface, SceneLayer, SceneLayerKind};
pub use transport::{InboundFrame, JsonLinesBackend, OutboundFrame, WireError};

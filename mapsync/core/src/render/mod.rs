//! Render Adapter
//!
//! The map surface is an external collaborator. This module defines the
//! minimal capability set the sync layer needs from it, plus a headless
//! in-memory surface for tests and the daemon.
//!
//! # Available Surfaces
//!
//! - **Headless**: keeps a scene graph in memory, no drawing
//! - Real surfaces (web map widgets, native canvases) implement
//!   [`RenderSurface`] in their own crates

mod headless;
mod traits;

pub use headless::{HeadlessSurface, SceneLayer, SceneLayerKind};
pub use traits::{LayerHandle, RenderSurface};

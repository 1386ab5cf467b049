//! Sync Controller - Backend/Map Orchestration
//!
//! The controller sits between the backend and the map surface:
//! - Backend signals install, recolor and remove layers
//! - Surface interactions become backend calls
//! - Marker enrichment results are applied when they arrive
//!
//! # Design Philosophy
//!
//! Every handler runs to completion on the owner's turn and fails silently.
//! An unattached surface, an unknown id, a malformed id list or a late query
//! result is a no-op, never an error. Handlers report what happened through
//! [`Outcome`] so callers can log or test it, but nothing is raised and
//! nothing is queued for later.
//!
//! ```text
//!  backend ──BackendSignal──► SyncController ──► LayerRegistry ──► surface
//!  backend ◄──BackendCall──── SyncController ◄──SurfaceInteraction── surface
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::backend::NetworkBackend;
use crate::enrichment::{spawn_bandwidth_query, Enrichment};
use crate::events::{BackendSignal, SurfaceInteraction};
use crate::geo::LatLng;
use crate::messages::{BackendCall, EntityId};
use crate::registry::{LayerKind, LayerRegistry, RecolorStrategy, RegistrySummary};
use crate::render::{LayerHandle, RenderSurface};

/// Component type that gets bandwidth enrichment by default
pub const DEFAULT_ENRICHMENT_TYPE: &str = "ONUNode";

/// Sync controller configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// Component type whose markers get bandwidth enrichment
    pub enrichment_type: String,
    /// Capacity of the outbound call channel
    pub channel_capacity: usize,
    /// Whether selected-type changes are forwarded to the backend log
    pub log_selected_type: bool,
    /// How connection colors are changed
    pub recolor_strategy: RecolorStrategy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enrichment_type: DEFAULT_ENRICHMENT_TYPE.to_string(),
            channel_capacity: 100,
            log_selected_type: true,
            recolor_strategy: RecolorStrategy::Recreate,
        }
    }
}

/// Why a handler did nothing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No render surface attached yet
    SurfaceNotReady,
    /// Identifier was empty
    EmptyId,
    /// No layer carries the identifier
    UnknownId,
    /// Interaction did not hit a tagged layer
    UntaggedLayer,
    /// Tagged layer has no handler for this interaction
    NoLayerHandler,
    /// Enrichment arrived for a layer that is gone or was replaced
    StaleLayer,
    /// Enrichment query failed or was cancelled
    QueryFailed,
}

/// What a handler did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The handler changed the map or notified the backend
    Applied,
    /// The handler was a no-op
    Ignored(IgnoreReason),
}

impl Outcome {
    /// Whether the handler had an effect
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// The sync controller
pub struct SyncController<S: RenderSurface, B: NetworkBackend> {
    /// Configuration
    config: SyncConfig,
    /// Backend for queries
    backend: Arc<B>,
    /// Rendered layers and the surface they live on
    registry: LayerRegistry<S>,
    /// Channel to send calls to the backend
    tx: mpsc::Sender<BackendCall>,
    /// In-flight enrichment queries
    enrichments: JoinSet<Option<Enrichment>>,
}

impl<S: RenderSurface, B: NetworkBackend + 'static> SyncController<S, B> {
    /// Create a controller with no surface attached
    pub fn new(backend: B, config: SyncConfig, tx: mpsc::Sender<BackendCall>) -> Self {
        Self {
            config,
            backend: Arc::new(backend),
            registry: LayerRegistry::new(),
            tx,
            enrichments: JoinSet::new(),
        }
    }

    /// Attach the render surface; the controller becomes ready
    pub fn attach_surface(&mut self, surface: S) {
        self.enrichments.abort_all();
        self.registry.attach(surface);
    }

    /// Detach the render surface, ending the session
    ///
    /// In-flight enrichment queries are cancelled.
    pub fn detach_surface(&mut self) -> Option<S> {
        self.enrichments.abort_all();
        self.registry.detach()
    }

    /// Whether a surface is attached
    pub fn is_ready(&self) -> bool {
        self.registry.is_ready()
    }

    /// Get the layer registry
    pub fn registry(&self) -> &LayerRegistry<S> {
        &self.registry
    }

    /// Get the configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Get the backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Count layers by kind
    pub fn summary(&self) -> RegistrySummary {
        self.registry.summary()
    }

    /// Handle a signal from the backend
    pub async fn handle_signal(&mut self, signal: BackendSignal) -> Outcome {
        tracing::debug!(signal = signal.name(), "Backend signal");
        match signal {
            BackendSignal::AddMarker {
                position,
                component_type,
                id,
                icon_ref,
            } => self.on_add_marker(position, &component_type, id, &icon_ref),

            BackendSignal::AddConnection {
                from,
                to,
                id,
                color,
            } => self.on_add_connection(from, to, id, &color),

            BackendSignal::HighlightConnections {
                ids_csv,
                highlight_color,
                normal_color,
            } => self.on_highlight_connections(&ids_csv, &highlight_color, &normal_color),

            BackendSignal::RecolorConnection { id, color } => {
                self.on_recolor_connection(&id, &color)
            }

            BackendSignal::CleanMap => self.on_clean_map(),

            BackendSignal::SelectedTypeChanged { selected_type } => {
                self.on_selected_component_type_changed(selected_type.as_deref())
                    .await
            }
        }
    }

    /// Handle an interaction reported by the surface
    ///
    /// Layer handlers shadow the generic map handler: a click on a tagged
    /// layer never reaches `map-click`.
    pub async fn handle_interaction(&mut self, interaction: SurfaceInteraction) -> Outcome {
        if !self.is_ready() {
            return Outcome::Ignored(IgnoreReason::SurfaceNotReady);
        }

        let target = self.tagged_layer(interaction.layer());
        match interaction {
            SurfaceInteraction::Click { position, .. } => match target {
                Some((id, LayerKind::Marker)) => self.on_marker_primary_click(id).await,
                Some((id, LayerKind::Connection)) => {
                    tracing::trace!(id = %id, "Click consumed by connection layer");
                    Outcome::Ignored(IgnoreReason::NoLayerHandler)
                }
                None => self.on_surface_click(position).await,
            },
            SurfaceInteraction::DoubleClick { .. } => match target {
                Some((id, _)) => self.on_layer_double_click(id).await,
                None => Outcome::Ignored(IgnoreReason::UntaggedLayer),
            },
        }
    }

    // ============================================
    // Inbound: backend -> surface
    // ============================================

    /// Place a marker and start enrichment if its type qualifies
    pub fn on_add_marker(
        &mut self,
        position: LatLng,
        component_type: &str,
        id: EntityId,
        icon_ref: &str,
    ) -> Outcome {
        if let Some(reason) = self.not_ready_or_empty(&id) {
            return Outcome::Ignored(reason);
        }

        let Some(handle) = self
            .registry
            .upsert_marker(id.clone(), position, component_type, icon_ref)
        else {
            return Outcome::Ignored(IgnoreReason::SurfaceNotReady);
        };

        if component_type == self.config.enrichment_type {
            spawn_bandwidth_query(
                &mut self.enrichments,
                Arc::clone(&self.backend),
                id,
                handle,
                component_type.to_string(),
            );
        }
        Outcome::Applied
    }

    /// Draw a connection
    pub fn on_add_connection(
        &mut self,
        from: LatLng,
        to: LatLng,
        id: EntityId,
        color: &str,
    ) -> Outcome {
        if let Some(reason) = self.not_ready_or_empty(&id) {
            return Outcome::Ignored(reason);
        }

        match self.registry.upsert_connection(id, [from, to], color) {
            Some(_) => Outcome::Applied,
            None => Outcome::Ignored(IgnoreReason::SurfaceNotReady),
        }
    }

    /// Repaint every connection
    ///
    /// Connections listed in `ids_csv` get `highlight_color`; every other
    /// connection gets `normal_color`, whatever its previous color. The list
    /// is split on commas as-is; entries that match nothing are ignored.
    pub fn on_highlight_connections(
        &mut self,
        ids_csv: &str,
        highlight_color: &str,
        normal_color: &str,
    ) -> Outcome {
        if !self.is_ready() {
            return Outcome::Ignored(IgnoreReason::SurfaceNotReady);
        }

        let selected: HashSet<&str> = ids_csv.split(',').collect();
        let plan: Vec<(EntityId, bool)> = self
            .registry
            .connections()
            .map(|c| (c.id.clone(), selected.contains(c.id.as_str())))
            .collect();

        let strategy = self.config.recolor_strategy;
        let mut highlighted = 0usize;
        for (id, is_selected) in &plan {
            let color = if *is_selected {
                highlighted += 1;
                highlight_color
            } else {
                normal_color
            };
            self.registry.recolor_connection(id, color, strategy);
        }

        tracing::debug!(
            highlighted,
            total = plan.len(),
            highlight_color,
            normal_color,
            "Connections repainted"
        );
        Outcome::Applied
    }

    /// Recolor a single connection
    pub fn on_recolor_connection(&mut self, id: &EntityId, color: &str) -> Outcome {
        if !self.is_ready() {
            return Outcome::Ignored(IgnoreReason::SurfaceNotReady);
        }

        let strategy = self.config.recolor_strategy;
        match self.registry.recolor_connection(id, color, strategy) {
            Some(_) => Outcome::Applied,
            None => Outcome::Ignored(IgnoreReason::UnknownId),
        }
    }

    /// Remove every tagged layer
    pub fn on_clean_map(&mut self) -> Outcome {
        if !self.is_ready() {
            return Outcome::Ignored(IgnoreReason::SurfaceNotReady);
        }

        let removed = self.registry.clear_all_tagged();
        tracing::info!(removed, "Map cleaned");
        Outcome::Applied
    }

    /// Note a change of the backend's selected component type
    ///
    /// Has no map effect; the value is echoed to the backend log.
    pub async fn on_selected_component_type_changed(
        &mut self,
        selected_type: Option<&str>,
    ) -> Outcome {
        if !self.is_ready() {
            return Outcome::Ignored(IgnoreReason::SurfaceNotReady);
        }

        let message = selected_type.unwrap_or("None").to_string();
        tracing::info!(selected_type = %message, "Selected component type changed");
        if self.config.log_selected_type {
            self.send(BackendCall::Log { message }).await;
        }
        Outcome::Applied
    }

    // ============================================
    // Outbound: surface -> backend
    // ============================================

    /// Primary click on empty map area
    pub async fn on_surface_click(&mut self, position: LatLng) -> Outcome {
        if !self.is_ready() {
            return Outcome::Ignored(IgnoreReason::SurfaceNotReady);
        }

        self.send(BackendCall::MapClick { position }).await;
        Outcome::Applied
    }

    /// Primary click on a marker
    pub async fn on_marker_primary_click(&mut self, id: EntityId) -> Outcome {
        if !self.is_ready() {
            return Outcome::Ignored(IgnoreReason::SurfaceNotReady);
        }

        self.send(BackendCall::MarkerClick { id }).await;
        Outcome::Applied
    }

    /// Double click on a tagged layer
    ///
    /// The backend is asked to remove the component and the layer is removed
    /// locally right away. There is no rollback if the backend disagrees.
    pub async fn on_layer_double_click(&mut self, id: EntityId) -> Outcome {
        if !self.is_ready() {
            return Outcome::Ignored(IgnoreReason::SurfaceNotReady);
        }

        self.send(BackendCall::RemoveComponent { id: id.clone() })
            .await;
        self.registry.remove_by_id(&id);
        Outcome::Applied
    }

    // ============================================
    // Enrichment
    // ============================================

    /// Number of enrichment queries still in flight
    pub fn pending_enrichments(&self) -> usize {
        self.enrichments.len()
    }

    /// Apply every enrichment result that has already arrived
    ///
    /// Returns the number of markers whose display text changed.
    pub fn poll_enrichments(&mut self) -> usize {
        let mut applied = 0;
        while let Some(joined) = self.enrichments.try_join_next() {
            if self.settle(joined).is_applied() {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next enrichment result and apply it
    ///
    /// Returns `None` when no query is in flight.
    pub async fn next_enrichment(&mut self) -> Option<Outcome> {
        let joined = self.enrichments.join_next().await?;
        Some(self.settle(joined))
    }

    /// Apply an enrichment result to its marker
    ///
    /// The result is dropped unless the marker is still rendered by the same
    /// layer instance the query was issued for.
    pub fn apply_enrichment(&mut self, enrichment: &Enrichment) -> Outcome {
        if !self.is_ready() {
            return Outcome::Ignored(IgnoreReason::SurfaceNotReady);
        }

        let text = enrichment.display_text();
        if self
            .registry
            .set_marker_text(&enrichment.id, enrichment.handle, &text)
        {
            tracing::debug!(id = %enrichment.id, bandwidth = enrichment.bandwidth, "Marker enriched");
            Outcome::Applied
        } else {
            tracing::trace!(id = %enrichment.id, "Dropped enrichment for stale layer");
            Outcome::Ignored(IgnoreReason::StaleLayer)
        }
    }

    fn settle(&mut self, joined: Result<Option<Enrichment>, tokio::task::JoinError>) -> Outcome {
        match joined {
            Ok(Some(enrichment)) => self.apply_enrichment(&enrichment),
            Ok(None) => Outcome::Ignored(IgnoreReason::QueryFailed),
            Err(e) => {
                if !e.is_cancelled() {
                    tracing::warn!(error = %e, "Enrichment task failed");
                }
                Outcome::Ignored(IgnoreReason::QueryFailed)
            }
        }
    }

    // ============================================
    // Helpers
    // ============================================

    fn not_ready_or_empty(&self, id: &EntityId) -> Option<IgnoreReason> {
        if !self.is_ready() {
            Some(IgnoreReason::SurfaceNotReady)
        } else if id.is_empty() {
            Some(IgnoreReason::EmptyId)
        } else {
            None
        }
    }

    /// Resolve a surface handle to a tagged layer
    fn tagged_layer(&self, handle: Option<LayerHandle>) -> Option<(EntityId, LayerKind)> {
        let id = self.registry.id_for_handle(handle?)?;
        let layer = self.registry.get(id)?;
        Some((id.clone(), layer.entity.kind()))
    }

    /// Send a call to the backend
    async fn send(&self, call: BackendCall) {
        let name = call.name();
        if let Err(e) = self.tx.send(call).await {
            tracing::warn!(call = name, "Failed to send call to backend: {}", e);
        }
    }
}

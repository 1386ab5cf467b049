//! Integration tests for the sync layer
//!
//! These tests drive the controller the way a host does: backend signals in,
//! surface interactions in, backend calls and query frames out. Tests cover:
//! - Registry invariants under realistic signal sequences
//! - Highlight exclusivity and geometry preservation
//! - Marker enrichment, including stale and wire-level round trips
//! - Click dispatch and double-click removal
//! - Readiness gating

use std::collections::HashSet;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

use mapsync_core::transport::frame::decode_inbound;
use mapsync_core::{
    BackendCall, BackendSignal, EntityId, HeadlessSurface, IgnoreReason, InboundFrame,
    JsonLinesBackend, LatLng, NetworkBackend, OutboundFrame, Outcome, RecolorStrategy,
    RenderSurface, SceneLayerKind, SurfaceInteraction, SyncConfig, SyncController,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

/// Backend answering every bandwidth query with a fixed value
struct FixedBandwidth(f64);

#[async_trait::async_trait]
impl NetworkBackend for FixedBandwidth {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn get_bandwidth(&self, _id: &EntityId) -> anyhow::Result<f64> {
        Ok(self.0)
    }
}

type Controller = SyncController<HeadlessSurface, FixedBandwidth>;

fn ready_controller(config: SyncConfig) -> (Controller, mpsc::Receiver<BackendCall>) {
    let (tx, rx) = mpsc::channel(64);
    let mut controller = SyncController::new(FixedBandwidth(100.0), config, tx);
    controller.attach_surface(HeadlessSurface::new());
    (controller, rx)
}

fn add_marker(lat: f64, lng: f64, kind: &str, id: &str) -> BackendSignal {
    BackendSignal::AddMarker {
        position: LatLng::new(lat, lng),
        component_type: kind.to_string(),
        id: id.into(),
        icon_ref: format!("{}.png", kind.to_lowercase()),
    }
}

fn add_connection(id: &str, color: &str) -> BackendSignal {
    BackendSignal::AddConnection {
        from: LatLng::new(48.85, 2.35),
        to: LatLng::new(48.86, 2.36),
        id: id.into(),
        color: color.to_string(),
    }
}

fn highlight(ids: &str, highlight_color: &str, normal_color: &str) -> BackendSignal {
    BackendSignal::HighlightConnections {
        ids_csv: ids.to_string(),
        highlight_color: highlight_color.to_string(),
        normal_color: normal_color.to_string(),
    }
}

fn color_of(controller: &Controller, id: &str) -> Option<String> {
    controller
        .registry()
        .get(&id.into())
        .and_then(|l| l.entity.as_connection())
        .map(|c| c.color.clone())
}

fn display_text(controller: &Controller, id: &str) -> Option<String> {
    controller
        .registry()
        .get(&id.into())
        .and_then(|l| l.entity.as_marker())
        .map(|m| m.display_text.clone())
}

fn drain(rx: &mut mpsc::Receiver<BackendCall>) -> Vec<BackendCall> {
    let mut calls = Vec::new();
    while let Ok(call) = rx.try_recv() {
        calls.push(call);
    }
    calls
}

// =============================================================================
// Registry Invariants
// =============================================================================

#[tokio::test]
async fn test_remove_twice_equals_remove_once() {
    let (mut controller, _rx) = ready_controller(SyncConfig::default());
    controller.handle_signal(add_marker(1.0, 1.0, "OLT", "m1")).await;
    controller.handle_signal(add_connection("c1", "blue")).await;

    controller.on_layer_double_click("m1".into()).await;
    let once = controller.registry().surface().unwrap().layers();
    let ids_once = controller.registry().ids();

    controller.on_layer_double_click("m1".into()).await;
    assert_eq!(controller.registry().surface().unwrap().layers(), once);
    assert_eq!(controller.registry().ids(), ids_once);
}

#[tokio::test]
async fn test_ids_stay_unique_under_repeated_adds() {
    let (mut controller, _rx) = ready_controller(SyncConfig::default());
    let sequence = [
        add_marker(0.0, 0.0, "OLT", "n1"),
        add_connection("l1", "blue"),
        add_marker(0.1, 0.1, "Splitter", "n2"),
        add_marker(0.2, 0.2, "OLT", "n1"),
        add_connection("l1", "green"),
        highlight("l1", "red", "blue"),
        add_connection("l2", "blue"),
        add_marker(0.3, 0.3, "ONUNode", "n2"),
        highlight("l2,l1", "red", "blue"),
    ];
    for signal in sequence {
        controller.handle_signal(signal).await;

        let registry = controller.registry();
        let surface = registry.surface().unwrap();
        let handles: Vec<_> = registry.ids().iter().map(|id| registry.get(id).unwrap().handle).collect();
        let unique: HashSet<_> = handles.iter().collect();
        assert_eq!(unique.len(), handles.len());
        // Every tagged layer plus the base layer, nothing else
        assert_eq!(surface.len(), registry.len() + 1);
        assert!(handles.iter().all(|h| surface.contains(*h)));
    }
    assert_eq!(controller.summary().markers, 2);
    assert_eq!(controller.summary().connections, 2);
}

#[tokio::test]
async fn test_clean_map_keeps_base_layer() {
    let (mut controller, _rx) = ready_controller(SyncConfig::default());
    let base = controller.registry().surface().unwrap().base_layer();
    controller.handle_signal(add_marker(1.0, 1.0, "OLT", "m1")).await;
    controller.handle_signal(add_marker(1.0, 2.0, "Splitter", "m2")).await;
    controller.handle_signal(add_connection("c1", "blue")).await;

    let outcome = controller.handle_signal(BackendSignal::CleanMap).await;
    assert_eq!(outcome, Outcome::Applied);
    assert!(controller.registry().is_empty());
    assert_eq!(controller.registry().surface().unwrap().layers(), vec![base]);
}

#[tokio::test]
async fn test_reinstall_after_clean_map() {
    let (mut controller, _rx) = ready_controller(SyncConfig::default());
    controller.handle_signal(add_marker(1.0, 1.0, "OLT", "m1")).await;
    controller.handle_signal(BackendSignal::CleanMap).await;
    controller.handle_signal(add_marker(1.0, 1.0, "OLT", "m1")).await;

    assert!(controller.registry().contains(&"m1".into()));
    assert_eq!(controller.registry().surface().unwrap().marker_count(), 1);
}

// =============================================================================
// Highlight
// =============================================================================

#[tokio::test]
async fn test_highlight_exclusivity() {
    let (mut controller, _rx) = ready_controller(SyncConfig::default());
    for id in ["A", "B", "C"] {
        controller.handle_signal(add_connection(id, "blue")).await;
    }
    controller.handle_signal(highlight("B,C", "red", "blue")).await;
    controller.handle_signal(highlight("A", "red", "blue")).await;

    assert_eq!(color_of(&controller, "A").as_deref(), Some("red"));
    assert_eq!(color_of(&controller, "B").as_deref(), Some("blue"));
    assert_eq!(color_of(&controller, "C").as_deref(), Some("blue"));
}

#[tokio::test]
async fn test_highlight_scenario_two_connections() {
    let (mut controller, _rx) = ready_controller(SyncConfig::default());
    controller.handle_signal(add_connection("c1", "blue")).await;
    controller.handle_signal(add_connection("c2", "blue")).await;
    controller.handle_signal(highlight("c1", "red", "blue")).await;

    assert_eq!(color_of(&controller, "c1").as_deref(), Some("red"));
    assert_eq!(color_of(&controller, "c2").as_deref(), Some("blue"));
}

#[tokio::test]
async fn test_highlight_preserves_geometry_under_both_strategies() {
    for strategy in [RecolorStrategy::Recreate, RecolorStrategy::Restyle] {
        let config = SyncConfig {
            recolor_strategy: strategy,
            ..Default::default()
        };
        let (mut controller, _rx) = ready_controller(config);
        controller.handle_signal(add_connection("c1", "blue")).await;
        controller.handle_signal(highlight("c1", "red", "blue")).await;
        controller.handle_signal(highlight("", "red", "blue")).await;

        let layer = controller.registry().get(&"c1".into()).unwrap();
        let connection = layer.entity.as_connection().unwrap();
        assert_eq!(
            connection.endpoints,
            [LatLng::new(48.85, 2.35), LatLng::new(48.86, 2.36)]
        );

        let scene = controller.registry().surface().unwrap().layer(layer.handle).unwrap();
        match &scene.kind {
            SceneLayerKind::Polyline { vertices, color } => {
                assert_eq!(vertices, &connection.endpoints.to_vec());
                assert_eq!(color, "blue");
            }
            other => panic!("Expected polyline, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_highlight_ignores_markers_and_unknown_ids() {
    let (mut controller, _rx) = ready_controller(SyncConfig::default());
    controller.handle_signal(add_marker(1.0, 1.0, "OLT", "m1")).await;
    controller.handle_signal(add_connection("c1", "blue")).await;

    controller.handle_signal(highlight("m1,ghost,c1", "red", "blue")).await;
    assert_eq!(color_of(&controller, "c1").as_deref(), Some("red"));
    assert_eq!(display_text(&controller, "m1").as_deref(), Some("OLT"));
}

// =============================================================================
// Enrichment
// =============================================================================

#[tokio::test]
async fn test_enrichment_updates_only_target_marker() {
    let (mut controller, _rx) = ready_controller(SyncConfig::default());
    controller.handle_signal(add_marker(5.0, 5.0, "OLT", "olt-1")).await;
    controller
        .handle_signal(BackendSignal::AddMarker {
            position: LatLng::new(10.0, 20.0),
            component_type: "ONUNode".to_string(),
            id: "m1".into(),
            icon_ref: "icon.png".to_string(),
        })
        .await;

    assert_eq!(controller.next_enrichment().await, Some(Outcome::Applied));
    assert_eq!(
        display_text(&controller, "m1").as_deref(),
        Some("ONUNode<br>Bandwidth: 100 Mbps")
    );
    assert_eq!(display_text(&controller, "olt-1").as_deref(), Some("OLT"));

    let handle = controller.registry().get(&"m1".into()).unwrap().handle;
    let scene = controller.registry().surface().unwrap().layer(handle).unwrap();
    assert_eq!(scene.text.as_deref(), Some("ONUNode<br>Bandwidth: 100 Mbps"));
}

#[tokio::test]
async fn test_enrichment_after_removal_is_dropped() {
    let (mut controller, _rx) = ready_controller(SyncConfig::default());
    controller.handle_signal(add_marker(1.0, 1.0, "ONUNode", "m1")).await;
    controller.on_layer_double_click("m1".into()).await;

    assert_eq!(
        controller.next_enrichment().await,
        Some(Outcome::Ignored(IgnoreReason::StaleLayer))
    );
    assert!(controller.registry().is_empty());
}

#[tokio::test]
async fn test_poll_enrichments_applies_finished_queries() {
    let (mut controller, _rx) = ready_controller(SyncConfig::default());
    controller.handle_signal(add_marker(1.0, 1.0, "ONUNode", "a")).await;
    controller.handle_signal(add_marker(1.0, 2.0, "ONUNode", "b")).await;

    let mut applied = 0;
    while controller.pending_enrichments() > 0 {
        tokio::task::yield_now().await;
        applied += controller.poll_enrichments();
    }
    assert_eq!(applied, 2);
    assert!(display_text(&controller, "a").unwrap().contains("Bandwidth"));
    assert!(display_text(&controller, "b").unwrap().contains("Bandwidth"));
}

#[tokio::test]
async fn test_enrichment_over_json_lines() {
    let (frames_tx, mut frames_rx) = mpsc::channel(8);
    let (calls_tx, _calls_rx) = mpsc::channel(8);
    let backend = JsonLinesBackend::new(frames_tx, Duration::from_secs(5));
    let mut controller = SyncController::new(backend, SyncConfig::default(), calls_tx);
    controller.attach_surface(HeadlessSurface::new());

    let InboundFrame::Signal(signal) = decode_inbound(
        r#"{"signal":"add-marker","args":[10.0,20.0,"ONUNode","m1","icon.png"]}"#,
    )
    .unwrap() else {
        panic!("Expected a signal frame");
    };
    controller.handle_signal(signal).await;

    let Some(OutboundFrame::Query { seq, id }) = frames_rx.recv().await else {
        panic!("Expected a query frame");
    };
    assert_eq!(id, EntityId::new("m1"));

    let InboundFrame::Reply { seq: reply, value } =
        decode_inbound(&format!(r#"{{"reply":{seq},"value":100}}"#)).unwrap()
    else {
        panic!("Expected a reply frame");
    };
    assert!(controller.backend().resolve(reply, value));
    assert_eq!(controller.next_enrichment().await, Some(Outcome::Applied));

    let marker = controller
        .registry()
        .get(&"m1".into())
        .and_then(|l| l.entity.as_marker())
        .cloned()
        .unwrap();
    assert_eq!(marker.display_text, "ONUNode<br>Bandwidth: 100 Mbps");
}

// =============================================================================
// Interactions
// =============================================================================

#[tokio::test]
async fn test_double_click_marker_sends_one_remove() {
    let (mut controller, mut rx) = ready_controller(SyncConfig::default());
    controller.handle_signal(add_marker(10.0, 20.0, "OLT", "m1")).await;
    let handle = controller.registry().get(&"m1".into()).unwrap().handle;

    controller
        .handle_interaction(SurfaceInteraction::DoubleClick {
            position: LatLng::new(10.0, 20.0),
            layer: Some(handle),
        })
        .await;

    assert_eq!(
        drain(&mut rx),
        vec![BackendCall::RemoveComponent { id: "m1".into() }]
    );
    assert!(!controller.registry().contains(&"m1".into()));
}

#[tokio::test]
async fn test_one_map_click_per_empty_click() {
    let (mut controller, mut rx) = ready_controller(SyncConfig::default());
    controller.handle_signal(add_marker(1.0, 1.0, "OLT", "m1")).await;
    let marker = controller.registry().get(&"m1".into()).unwrap().handle;

    controller
        .handle_interaction(SurfaceInteraction::Click {
            position: LatLng::new(3.0, 3.0),
            layer: None,
        })
        .await;
    controller
        .handle_interaction(SurfaceInteraction::Click {
            position: LatLng::new(1.0, 1.0),
            layer: Some(marker),
        })
        .await;

    assert_eq!(
        drain(&mut rx),
        vec![
            BackendCall::MapClick {
                position: LatLng::new(3.0, 3.0)
            },
            BackendCall::MarkerClick { id: "m1".into() },
        ]
    );
}

#[tokio::test]
async fn test_double_click_on_base_layer_is_ignored() {
    let (mut controller, mut rx) = ready_controller(SyncConfig::default());
    let base = controller.registry().surface().unwrap().base_layer();

    let outcome = controller
        .handle_interaction(SurfaceInteraction::DoubleClick {
            position: LatLng::new(0.0, 0.0),
            layer: Some(base),
        })
        .await;
    assert_eq!(outcome, Outcome::Ignored(IgnoreReason::UntaggedLayer));
    assert!(drain(&mut rx).is_empty());
    assert_eq!(controller.registry().surface().unwrap().len(), 1);
}

#[tokio::test]
async fn test_double_click_highlighted_connection_removes_it() {
    let (mut controller, mut rx) = ready_controller(SyncConfig::default());
    controller.handle_signal(add_connection("c1", "blue")).await;
    let before = controller.registry().get(&"c1".into()).unwrap().handle;

    controller.handle_signal(highlight("c1", "red", "blue")).await;
    let after = controller.registry().get(&"c1".into()).unwrap().handle;
    assert_ne!(before, after);

    // The replaced line no longer belongs to anything
    let stale = controller
        .handle_interaction(SurfaceInteraction::DoubleClick {
            position: LatLng::new(48.85, 2.35),
            layer: Some(before),
        })
        .await;
    assert_eq!(stale, Outcome::Ignored(IgnoreReason::UntaggedLayer));

    let outcome = controller
        .handle_interaction(SurfaceInteraction::DoubleClick {
            position: LatLng::new(48.85, 2.35),
            layer: Some(after),
        })
        .await;
    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(
        drain(&mut rx),
        vec![BackendCall::RemoveComponent { id: "c1".into() }]
    );
    assert!(!controller.registry().contains(&"c1".into()));
    assert!(!controller.registry().surface().unwrap().contains(after));
}

// =============================================================================
// Readiness
// =============================================================================

#[tokio::test]
async fn test_nothing_happens_before_attach() {
    let (tx, mut rx) = mpsc::channel(8);
    let mut controller: Controller =
        SyncController::new(FixedBandwidth(1.0), SyncConfig::default(), tx);

    let signals = [
        add_marker(1.0, 1.0, "ONUNode", "m1"),
        add_connection("c1", "blue"),
        highlight("c1", "red", "blue"),
        BackendSignal::CleanMap,
        BackendSignal::SelectedTypeChanged {
            selected_type: Some("OLT".to_string()),
        },
    ];
    for signal in signals {
        assert_eq!(
            controller.handle_signal(signal).await,
            Outcome::Ignored(IgnoreReason::SurfaceNotReady)
        );
    }
    assert_eq!(
        controller
            .handle_interaction(SurfaceInteraction::Click {
                position: LatLng::new(0.0, 0.0),
                layer: None,
            })
            .await,
        Outcome::Ignored(IgnoreReason::SurfaceNotReady)
    );
    assert_eq!(controller.pending_enrichments(), 0);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_selected_type_logging_can_be_disabled() {
    let config = SyncConfig {
        log_selected_type: false,
        ..Default::default()
    };
    let (mut controller, mut rx) = ready_controller(config);
    let outcome = controller
        .handle_signal(BackendSignal::SelectedTypeChanged { selected_type: None })
        .await;
    assert_eq!(outcome, Outcome::Applied);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_selected_type_frame_without_value_is_logged() {
    let (mut controller, mut rx) = ready_controller(SyncConfig::default());
    let Ok(InboundFrame::Signal(signal)) = decode_inbound(r#"{"signal":"selected-type-changed"}"#)
    else {
        panic!("Expected a signal frame");
    };

    assert_eq!(controller.handle_signal(signal).await, Outcome::Applied);
    assert_eq!(
        drain(&mut rx),
        vec![BackendCall::Log {
            message: "None".to_string()
        }]
    );
}

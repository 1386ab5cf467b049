//! Daemon Server Implementation
//!
//! This module provides the session loop for the mapsync daemon:
//! - Reads JSON frames line by line from the backend side
//! - Drives one `SyncController` over a headless surface
//! - Writes outbound calls and queries as JSON lines
//! - Stops on end of input or on the shutdown future
//!
//! # Task Layout
//!
//! ```text
//!   input lines ──► session loop ──► SyncController ──► HeadlessSurface
//!                        │                 │
//!                        │          BackendCall (mpsc)
//!                        │                 │
//!                        │            forwarder task
//!                        │                 │
//!                  reply frames     OutboundFrame (mpsc) ◄── JsonLinesBackend
//!                  resolve(seq)            │
//!                                     writer task ──► output lines
//! ```

use std::future::Future;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use mapsync_core::transport::{decode_inbound, encode};
use mapsync_core::{
    BackendCall, HeadlessSurface, InboundFrame, JsonLinesBackend, MapsyncConfigFile,
    OutboundFrame, Outcome, RegistrySummary, SyncController,
};

type Controller = SyncController<HeadlessSurface, JsonLinesBackend>;

/// One turn of the session loop
enum Step {
    Line(std::io::Result<Option<String>>),
    Enriched(Outcome),
    Shutdown,
}

/// The daemon session server
pub struct DaemonServer {
    config: MapsyncConfigFile,
}

impl DaemonServer {
    /// Create a server with resolved configuration
    pub fn new(config: MapsyncConfigFile) -> Self {
        Self { config }
    }

    fn surface(&self) -> HeadlessSurface {
        match self.config.tile_url {
            Some(ref url) => HeadlessSurface::with_tiles(url.as_str()),
            None => HeadlessSurface::new(),
        }
    }

    /// Run one session until input ends or `shutdown` resolves
    ///
    /// Returns the layer counts at the end of the session.
    pub async fn run<R, W, F>(&self, input: R, output: W, shutdown: F) -> Result<RegistrySummary>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
        F: Future<Output = ()>,
    {
        let capacity = self.config.sync.channel_capacity;
        let (frames_tx, frames_rx) = mpsc::channel::<OutboundFrame>(capacity);
        let (calls_tx, calls_rx) = mpsc::channel::<BackendCall>(capacity);

        let writer = tokio::spawn(write_frames(frames_rx, output));
        let backend = JsonLinesBackend::new(frames_tx.clone(), self.config.query_timeout);
        let forwarder = tokio::spawn(forward_calls(calls_rx, frames_tx));

        let mut controller = SyncController::new(backend, self.config.sync.clone(), calls_tx);
        controller.attach_surface(self.surface());
        info!(
            enrichment_type = %self.config.sync.enrichment_type,
            recolor = ?self.config.sync.recolor_strategy,
            "Session started"
        );

        let mut lines = input.lines();
        tokio::pin!(shutdown);

        loop {
            let step = tokio::select! {
                line = lines.next_line() => Step::Line(line),
                Some(outcome) = controller.next_enrichment(), if controller.pending_enrichments() > 0 => {
                    Step::Enriched(outcome)
                }
                () = &mut shutdown => Step::Shutdown,
            };

            match step {
                Step::Line(Ok(Some(line))) => dispatch(&mut controller, &line).await,
                Step::Line(Ok(None)) => {
                    info!("Input closed");
                    break;
                }
                Step::Line(Err(e)) => {
                    warn!(error = %e, "Failed to read input");
                    break;
                }
                Step::Enriched(outcome) => trace!(?outcome, "Enrichment settled"),
                Step::Shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        let summary = controller.summary();
        info!(
            markers = summary.markers,
            connections = summary.connections,
            "Session ended"
        );

        controller.detach_surface();
        drop(controller);

        forwarder.await.context("Call forwarder task failed")?;
        writer.await.context("Writer task failed")??;
        Ok(summary)
    }
}

/// Decode one input line and hand it to the controller
async fn dispatch(controller: &mut Controller, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    match decode_inbound(line) {
        Ok(InboundFrame::Signal(signal)) => {
            let name = signal.name();
            let outcome = controller.handle_signal(signal).await;
            debug!(signal = name, ?outcome, "Signal handled");
        }
        Ok(InboundFrame::Reply { seq, value }) => {
            if !controller.backend().resolve(seq, value) {
                debug!(seq, "Reply dropped");
            }
        }
        Ok(InboundFrame::Interaction(interaction)) => {
            let outcome = controller.handle_interaction(interaction).await;
            debug!(?interaction, ?outcome, "Interaction handled");
        }
        Err(e) => warn!(error = %e, "Skipping malformed frame"),
    }
}

/// Move controller calls onto the frame stream
async fn forward_calls(mut calls: mpsc::Receiver<BackendCall>, frames: mpsc::Sender<OutboundFrame>) {
    while let Some(call) = calls.recv().await {
        if frames.send(call.into()).await.is_err() {
            warn!("Frame writer gone, dropping calls");
            break;
        }
    }
}

/// Encode frames and write them out, one per line
async fn write_frames<W>(mut frames: mpsc::Receiver<OutboundFrame>, mut output: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = frames.recv().await {
        let mut line = match encode(&frame) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to encode frame");
                continue;
            }
        };
        line.push('\n');
        output
            .write_all(line.as_bytes())
            .await
            .context("Failed to write frame")?;
        output.flush().await.context("Failed to flush output")?;
    }
    output.shutdown().await.context("Failed to close output")?;
    Ok(())
}

//! JSON Lines Backend
//!
//! Answers [`NetworkBackend`] queries over the same frame stream that carries
//! signals and calls. A query goes out as an [`OutboundFrame::Query`] with a
//! fresh sequence number; the host feeds matching `reply` frames back through
//! [`JsonLinesBackend::resolve`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};

use crate::backend::NetworkBackend;
use crate::messages::EntityId;

use super::frame::OutboundFrame;

/// Default time to wait for a query reply
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

type PendingReplies = DashMap<u64, oneshot::Sender<Option<f64>>>;

/// Backend reached through a line-oriented frame stream
pub struct JsonLinesBackend {
    tx: mpsc::Sender<OutboundFrame>,
    pending: PendingReplies,
    next_seq: AtomicU64,
    timeout: Duration,
}

impl JsonLinesBackend {
    /// Create a backend that writes query frames to `tx`
    pub fn new(tx: mpsc::Sender<OutboundFrame>, timeout: Duration) -> Self {
        Self {
            tx,
            pending: DashMap::new(),
            next_seq: AtomicU64::new(1),
            timeout,
        }
    }

    /// Deliver a reply frame to the query waiting on `seq`
    ///
    /// Returns false if no query is waiting (unknown, timed out or cancelled).
    pub fn resolve(&self, seq: u64, value: Option<f64>) -> bool {
        match self.pending.remove(&seq) {
            Some((_, waiter)) => waiter.send(value).is_ok(),
            None => {
                tracing::debug!(seq, "Reply for unknown query");
                false
            }
        }
    }

    /// Number of queries waiting for a reply
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Removes the pending entry however the query ends
struct PendingGuard<'a> {
    pending: &'a PendingReplies,
    seq: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.seq);
    }
}

#[async_trait]
impl NetworkBackend for JsonLinesBackend {
    fn name(&self) -> &str {
        "json-lines"
    }

    async fn get_bandwidth(&self, id: &EntityId) -> anyhow::Result<f64> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.insert(seq, reply_tx);
        let _guard = PendingGuard {
            pending: &self.pending,
            seq,
        };

        self.tx
            .send(OutboundFrame::Query {
                seq,
                id: id.clone(),
            })
            .await
            .map_err(|_| anyhow!("frame stream closed"))?;

        let value = tokio::time::timeout(self.timeout, reply_rx)
            .await
            .with_context(|| format!("bandwidth query {seq} for {id} timed out"))?
            .context("reply channel dropped")?;

        value.ok_or_else(|| anyhow!("backend has no bandwidth for {id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn backend(timeout: Duration) -> (Arc<JsonLinesBackend>, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(8);
        (Arc::new(JsonLinesBackend::new(tx, timeout)), rx)
    }

    #[tokio::test]
    async fn test_query_resolved_by_reply() {
        let (backend, mut rx) = backend(DEFAULT_QUERY_TIMEOUT);
        let querying = Arc::clone(&backend);
        let query = tokio::spawn(async move { querying.get_bandwidth(&"m1".into()).await });

        let frame = rx.recv().await.unwrap();
        let OutboundFrame::Query { seq, id } = frame else {
            panic!("Expected query frame, got {frame:?}");
        };
        assert_eq!(id, EntityId::new("m1"));
        assert!(backend.resolve(seq, Some(100.0)));

        assert_eq!(query.await.unwrap().unwrap(), 100.0);
        assert_eq!(backend.pending(), 0);
    }

    #[tokio::test]
    async fn test_null_reply_is_an_error() {
        let (backend, mut rx) = backend(DEFAULT_QUERY_TIMEOUT);
        let querying = Arc::clone(&backend);
        let query = tokio::spawn(async move { querying.get_bandwidth(&"m1".into()).await });

        let Some(OutboundFrame::Query { seq, .. }) = rx.recv().await else {
            panic!("Expected query frame");
        };
        backend.resolve(seq, None);
        assert!(query.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_query_times_out() {
        let (backend, _rx) = backend(Duration::from_millis(50));
        let err = backend.get_bandwidth(&"m1".into()).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert_eq!(backend.pending(), 0);
        // A late reply finds nobody waiting
        assert!(!backend.resolve(1, Some(1.0)));
    }

    #[tokio::test]
    async fn test_closed_stream_fails_fast() {
        let (backend, rx) = backend(DEFAULT_QUERY_TIMEOUT);
        drop(rx);
        assert!(backend.get_bandwidth(&"m1".into()).await.is_err());
        assert_eq!(backend.pending(), 0);
    }

    #[tokio::test]
    async fn test_sequence_numbers_increase() {
        let (backend, mut rx) = backend(Duration::from_millis(1));
        let _ = backend.get_bandwidth(&"a".into()).await;
        let _ = backend.get_bandwidth(&"b".into()).await;
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        match (first, second) {
            (OutboundFrame::Query { seq: a, .. }, OutboundFrame::Query { seq: b, .. }) => {
                assert!(b > a)
            }
            other => panic!("Expected two queries, got {other:?}"),
        }
    }
}

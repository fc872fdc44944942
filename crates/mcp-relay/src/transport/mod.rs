//! Transport layer for MCP communication.

pub mod auth;
pub mod framing;
#[cfg(feature = "sse")]
pub mod sse;
pub mod stdio;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::types::{McpError, McpResult};

pub use auth::{AllowAll, BearerToken, CredentialCheck};
pub use framing::FrameReader;
#[cfg(feature = "sse")]
pub use sse::{ConnectionHub, SseTransport};
pub use stdio::StdioTransport;

/// Outbound half of a connection that can carry server-initiated frames.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Queue one encoded frame for delivery.
    async fn send(&self, frame: String) -> McpResult<()>;
}

/// A `FrameSink` backed by a bounded channel drained by the connection's writer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<String>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send(&self, frame: String) -> McpResult<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| McpError::ConnectionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = ChannelSink::new(tx);
        sink.send("a".into()).await.unwrap();
        sink.send("b".into()).await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("a"));
        assert_eq!(rx.recv().await.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_channel_sink_reports_closed_receiver() {
        let (tx, rx) = mpsc::channel(1);
        let sink = ChannelSink::new(tx);
        drop(rx);
        assert!(sink.is_closed());
        assert!(matches!(
            sink.send("x".into()).await,
            Err(McpError::ConnectionClosed)
        ));
    }
}

//! Stdio transport: reads JSON-RPC from stdin, writes to stdout.

use std::sync::Arc;

use futures::StreamExt;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader, Stdin, Stdout};

use crate::protocol::Dispatcher;
use crate::session::{SessionId, TransportKind};
use crate::types::McpResult;

use super::framing::{self, FrameReader};

/// Duplex-stream transport for desktop MCP clients.
///
/// One session per stream; each request is answered before the next frame is
/// read, so replies leave in arrival order.
pub struct StdioTransport<R, W> {
    dispatcher: Arc<Dispatcher>,
    reader: FrameReader<R>,
    writer: W,
}

impl StdioTransport<BufReader<Stdin>, Stdout> {
    pub fn new(dispatcher: Arc<Dispatcher>, max_frame_bytes: usize) -> Self {
        Self::with_io(
            dispatcher,
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            max_frame_bytes,
        )
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn with_io(dispatcher: Arc<Dispatcher>, reader: R, writer: W, max_frame_bytes: usize) -> Self {
        Self {
            dispatcher,
            reader: FrameReader::new(reader, max_frame_bytes),
            writer,
        }
    }

    /// Run until EOF, shutdown, or a transport error.
    pub async fn run(self) -> McpResult<()> {
        let Self {
            dispatcher,
            reader,
            mut writer,
        } = self;
        let session = dispatcher.open_session(TransportKind::DuplexStream);
        tracing::info!(session = %session, "Stdio transport started");

        let result = serve(&dispatcher, &session, reader, &mut writer).await;

        dispatcher.close_session(&session);
        if let Err(e) = &result {
            tracing::error!(session = %session, "Stdio transport stopped: {e}");
        }
        result
    }
}

async fn serve<R, W>(
    dispatcher: &Dispatcher,
    session: &SessionId,
    reader: FrameReader<R>,
    writer: &mut W,
) -> McpResult<()>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let frames = reader.into_frames();
    futures::pin_mut!(frames);

    while let Some(frame) = frames.next().await {
        let frame = frame?;

        if let Some(reply) = dispatcher.handle_frame(session, frame.as_bytes(), None).await {
            framing::write_frame(writer, &reply).await?;
        }

        if dispatcher.is_closed(session) {
            tracing::info!(session = %session, "Session closed, shutting down");
            return Ok(());
        }
    }

    tracing::info!("EOF on stdin, shutting down");
    Ok(())
}

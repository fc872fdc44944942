//! Newline-delimited JSON framing for byte streams.

use futures::Stream;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::types::{McpError, McpResult};

/// Default upper bound for one frame.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

/// Splits a byte stream into frames, one per line.
pub struct FrameReader<R> {
    reader: R,
    max_bytes: usize,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    pub fn new(reader: R, max_bytes: usize) -> Self {
        Self {
            reader,
            max_bytes,
            buf: Vec::new(),
        }
    }

    /// Next non-blank frame, or `None` at end of stream.
    ///
    /// An oversized line or one that is not UTF-8 is a transport error; the
    /// stream position after it is unspecified, so callers should stop.
    pub async fn next_frame(&mut self) -> McpResult<Option<String>> {
        loop {
            self.buf.clear();
            let limit = u64::try_from(self.max_bytes)
                .unwrap_or(u64::MAX)
                .saturating_add(1);
            let read = (&mut self.reader)
                .take(limit)
                .read_until(b'\n', &mut self.buf)
                .await?;
            if read == 0 {
                return Ok(None);
            }

            let terminated = self.buf.last() == Some(&b'\n');
            if terminated {
                self.buf.pop();
                if self.buf.last() == Some(&b'\r') {
                    self.buf.pop();
                }
            } else if read as u64 == limit {
                return Err(McpError::Transport(format!(
                    "frame exceeds {} bytes",
                    self.max_bytes
                )));
            }
            if self.buf.len() > self.max_bytes {
                return Err(McpError::Transport(format!(
                    "frame exceeds {} bytes",
                    self.max_bytes
                )));
            }

            if self.buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let frame = std::str::from_utf8(&self.buf)
                .map_err(|e| McpError::Transport(format!("frame is not valid UTF-8: {e}")))?;
            return Ok(Some(frame.to_string()));
        }
    }

    /// The frames as a lazy stream. It ends at EOF and yields at most one error.
    pub fn into_frames(self) -> impl Stream<Item = McpResult<String>> {
        let mut reader = self;
        async_stream::try_stream! {
            while let Some(frame) = reader.next_frame().await? {
                yield frame;
            }
        }
    }
}

/// Write one frame followed by a newline, then flush.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &str) -> McpResult<()> {
    writer.write_all(frame.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

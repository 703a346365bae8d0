use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::TransportError;

/// The write half of a line-framed transport.
///
/// Cheaply cloneable (`Arc`-backed) so the owning component (the JSON-RPC
/// client's timeout tasks, in practice) can send a cancellation notification
/// concurrently with the main dispatcher — the same pattern
/// `atm-agent-mcp/proxy.rs` uses for its shared `ChildStdin`.
#[derive(Clone)]
pub struct TransportWriter<W> {
    inner: Arc<Mutex<Option<W>>>,
}

impl<W: AsyncWrite + Unpin + Send> TransportWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(writer))),
        }
    }

    /// Append `bytes + '\n'` to the underlying stream.
    ///
    /// Fails with [`TransportError::TransportClosed`] if `close` has already
    /// been called or the stream previously failed.
    pub async fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut guard = self.inner.lock().await;
        let Some(writer) = guard.as_mut() else {
            return Err(TransportError::TransportClosed);
        };

        let write_result = async {
            writer.write_all(bytes).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = write_result {
            *guard = None;
            return Err(TransportError::Io(e));
        }
        Ok(())
    }

    /// Idempotent close: drops the underlying writer, which for a child's
    /// stdin signals EOF to the process. Subsequent `send`s fail with
    /// [`TransportError::TransportClosed`].
    pub async fn close(&self) -> Result<(), TransportError> {
        let mut guard = self.inner.lock().await;
        if let Some(mut writer) = guard.take() {
            // Best-effort shutdown; a failure here doesn't change the
            // outcome (the writer is dropped either way).
            let _ = writer.shutdown().await;
        }
        Ok(())
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn send_writes_newline_terminated_bytes() {
        let (a, mut b) = duplex(4096);
        let writer = TransportWriter::new(a);
        writer.send(b"ping").await.unwrap();

        let mut buf = [0u8; 5];
        tokio::io::AsyncReadExt::read_exact(&mut b, &mut buf)
            .await
            .unwrap();
        assert_eq!(&buf, b"ping\n");
    }

    #[tokio::test]
    async fn is_closed_reflects_state() {
        let (a, _b) = duplex(4096);
        let writer = TransportWriter::new(a);
        assert!(!writer.is_closed().await);
        writer.close().await.unwrap();
        assert!(writer.is_closed().await);
    }
}

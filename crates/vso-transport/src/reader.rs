use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

use crate::TransportError;

/// The read half of a line-framed transport.
///
/// A message is emitted only when a newline is seen. A partial trailing
/// fragment at EOF is discarded with a warning rather than returned as a
/// message.
pub struct TransportReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin + Send> TransportReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
        }
    }

    /// Read the next complete line.
    ///
    /// Returns `Ok(None)` on clean EOF. Returns
    /// `Err(TransportError::ParseError)` for a line that is not valid UTF-8;
    /// the transport remains usable and the caller should call this again
    /// to get the next line.
    pub async fn next_message(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.buf.drain(..=pos).collect();
                let line = &line[..line.len() - 1]; // strip the newline
                return match std::str::from_utf8(line) {
                    Ok(s) => Ok(Some(s.to_string())),
                    Err(e) => Err(TransportError::ParseError(format!(
                        "invalid UTF-8 in line: {e}"
                    ))),
                };
            }

            let mut chunk = [0u8; 4096];
            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                if !self.buf.is_empty() {
                    tracing::warn!(
                        "discarding {} bytes of partial trailing fragment at EOF",
                        self.buf.len()
                    );
                    self.buf.clear();
                }
                return Ok(None);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn reads_complete_lines_only() {
        let (mut a, b) = duplex(4096);
        let mut reader = TransportReader::new(b);

        tokio::io::AsyncWriteExt::write_all(&mut a, b"line one\nline two\n")
            .await
            .unwrap();

        assert_eq!(
            reader.next_message().await.unwrap().unwrap(),
            "line one"
        );
        assert_eq!(
            reader.next_message().await.unwrap().unwrap(),
            "line two"
        );
    }

    #[tokio::test]
    async fn partial_line_discarded_at_eof() {
        let (mut a, b) = duplex(4096);
        let mut reader = TransportReader::new(b);
        tokio::io::AsyncWriteExt::write_all(&mut a, b"complete\nincomplete")
            .await
            .unwrap();
        drop(a);

        assert_eq!(
            reader.next_message().await.unwrap().unwrap(),
            "complete"
        );
        assert_eq!(reader.next_message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_utf8_yields_parse_error_but_stream_continues() {
        let (mut a, b) = duplex(4096);
        let mut reader = TransportReader::new(b);

        let mut bad_line = vec![0xFF, 0xFE];
        bad_line.push(b'\n');
        bad_line.extend_from_slice(b"good\n");
        tokio::io::AsyncWriteExt::write_all(&mut a, &bad_line)
            .await
            .unwrap();

        let err = reader.next_message().await.unwrap_err();
        assert!(matches!(err, TransportError::ParseError(_)));

        let msg = reader.next_message().await.unwrap().unwrap();
        assert_eq!(msg, "good");
    }

    #[tokio::test]
    async fn eof_with_no_data_returns_none() {
        let (a, b) = duplex(4096);
        drop(a);
        let mut reader = TransportReader::new(b);
        assert_eq!(reader.next_message().await.unwrap(), None);
    }
}

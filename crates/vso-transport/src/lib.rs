//! Line-framed stdio transport.
//!
//! One message per line, terminator is a single `\n` byte. stderr is never
//! interpreted as a message; it is captured separately via [`StderrSink`]
//! and forwarded to a log sink. Both ends of this wire protocol are
//! newline-delimited, so there is no alternate framing to support.

mod reader;
mod stderr;
mod writer;

pub use reader::TransportReader;
pub use stderr::StderrSink;
pub use writer::TransportWriter;

use thiserror::Error;

/// Failure modes for the line-framed transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying stream is gone; `send` cannot proceed.
    #[error("transport closed")]
    TransportClosed,

    /// A line was read but was not valid UTF-8. The transport stays alive;
    /// the caller should call `next_message` again for the next line.
    #[error("parse error: {0}")]
    ParseError(String),

    /// An underlying I/O error not covered by the above.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn round_trip_send_and_receive() {
        let (client, server) = duplex(4096);
        let (client_read, client_write) = tokio::io::split(client);
        let (server_read, server_write) = tokio::io::split(server);

        let writer = TransportWriter::new(client_write);
        let mut reader = TransportReader::new(server_read);
        let mut echo_writer = TransportWriter::new(server_write);
        let mut echo_reader = TransportReader::new(client_read);

        writer.send(b"hello").await.unwrap();
        let msg = reader.next_message().await.unwrap().unwrap();
        assert_eq!(msg, "hello");

        echo_writer.send(b"world").await.unwrap();
        let msg = echo_reader.next_message().await.unwrap().unwrap();
        assert_eq!(msg, "world");
    }

    #[tokio::test]
    async fn send_after_close_fails() {
        let (client, _server) = duplex(4096);
        let (_r, w) = tokio::io::split(client);
        let writer = TransportWriter::new(w);
        writer.close().await.unwrap();
        let err = writer.send(b"x").await.unwrap_err();
        assert!(matches!(err, TransportError::TransportClosed));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (client, _server) = duplex(4096);
        let (_r, w) = tokio::io::split(client);
        let writer = TransportWriter::new(w);
        writer.close().await.unwrap();
        writer.close().await.unwrap();
    }
}

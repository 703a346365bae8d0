//! The JSON-RPC 2.0 client: a cloneable handle wrapping a shared writer
//! and a pending-request table, with a single background task owning the
//! read half and dispatching replies by id.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;

use vso_transport::{TransportReader, TransportWriter};

use crate::error::RpcError;
use crate::message::{parse_and_validate, ParsedMessage};
use crate::pending::{PendingTable, RequestId, RpcOutcome};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// A handle to one child server's JSON-RPC channel. Cheap to clone; every
/// clone shares the same writer and pending table.
#[derive(Clone)]
pub struct RpcClient {
    writer: TransportWriter<BoxedWriter>,
    pending: Arc<Mutex<PendingTable>>,
    next_id: Arc<AtomicI64>,
    default_timeout: Duration,
}

impl RpcClient {
    /// Spawn the dispatcher task and return a ready-to-use client.
    ///
    /// `reader`/`writer` are the child's stdout/stdin, already type-erased
    /// by the caller (`vso-supervisor` owns the process and hands this
    /// crate only the I/O halves, keeping process ownership separate from
    /// protocol handling).
    pub fn spawn(reader: BoxedReader, writer: BoxedWriter, default_timeout: Duration) -> Self {
        let writer = TransportWriter::new(writer);
        let pending = Arc::new(Mutex::new(PendingTable::new()));

        let dispatch_pending = pending.clone();
        tokio::spawn(async move {
            let mut transport_reader = TransportReader::new(reader);
            loop {
                match transport_reader.next_message().await {
                    Ok(Some(line)) => dispatch_line(&dispatch_pending, &line).await,
                    Ok(None) => {
                        tracing::warn!("rpc transport closed; failing all pending requests");
                        dispatch_pending.lock().await.clear();
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("rpc transport parse error: {e}");
                        // Stream stays usable per `TransportReader`'s contract; keep reading.
                    }
                }
            }
        });

        Self {
            writer,
            pending,
            next_id: Arc::new(AtomicI64::new(1)),
            default_timeout,
        }
    }

    /// Issue a request and await its response, or `RpcError::Timeout` after
    /// `timeout` elapses. On timeout the pending entry is removed so a late
    /// reply is dropped rather than delivered to a caller who has moved on.
    pub async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, RpcError> {
        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::Relaxed));

        let mut payload = json!({
            "jsonrpc": "2.0",
            "id": id.to_value(),
            "method": method,
        });
        if let Some(params) = params {
            payload["params"] = params;
        }
        let bytes = serde_json::to_vec(&payload)?;

        let rx = {
            let mut table = self.pending.lock().await;
            table.insert(id.clone(), timeout)
        };

        if let Err(e) = self.writer.send(&bytes).await {
            self.pending.lock().await.remove(&id);
            return Err(e.into());
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(RpcOutcome::Result(value))) => Ok(value),
            Ok(Ok(RpcOutcome::Error(err))) => Err(RpcError::Remote(err)),
            Ok(Err(_)) => Err(RpcError::TransportClosed),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(RpcError::Timeout(timeout))
            }
        }
    }

    /// Issue a request using the client's default timeout.
    pub async fn call_default(&self, method: &str, params: Option<Value>) -> Result<Value, RpcError> {
        self.call(method, params, self.default_timeout).await
    }

    /// Send a fire-and-forget notification (no id, no reply expected).
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), RpcError> {
        let mut payload = json!({
            "jsonrpc": "2.0",
            "method": method,
        });
        if let Some(params) = params {
            payload["params"] = params;
        }
        let bytes = serde_json::to_vec(&payload)?;
        self.writer.send(&bytes).await?;
        Ok(())
    }

    /// The mandatory MCP handshake: every spawned server must answer
    /// `initialize` before it is considered healthy.
    pub async fn initialize(&self, handshake_timeout: Duration) -> Result<Value, RpcError> {
        self.call(
            "initialize",
            Some(json!({ "protocolVersion": "2024-11-05" })),
            handshake_timeout,
        )
        .await
    }

    pub async fn list_tools(&self) -> Result<Value, RpcError> {
        self.call_default("tools/list", None).await
    }

    pub async fn is_closed(&self) -> bool {
        self.writer.is_closed().await
    }

    pub async fn close(&self) {
        self.writer.close().await.ok();
        self.pending.lock().await.clear();
    }
}

async fn dispatch_line(pending: &Arc<Mutex<PendingTable>>, line: &str) {
    let parsed = match parse_and_validate(line) {
        Ok(messages) => messages,
        Err(e) => {
            tracing::warn!("dropping unparseable rpc line: {e:?}");
            return;
        }
    };

    for message in parsed {
        match message {
            Ok(ParsedMessage::Response { id, result, error }) => {
                let Some(request_id) = RequestId::from_value(&id) else {
                    tracing::warn!("response with unrecognized id shape, dropping");
                    continue;
                };
                let outcome = match error {
                    Some(err) => RpcOutcome::Error(err),
                    None => RpcOutcome::Result(result.unwrap_or(Value::Null)),
                };
                let delivered = pending.lock().await.complete(&request_id, outcome);
                if !delivered {
                    tracing::warn!(id = ?request_id, "late reply for unknown or expired request, dropping");
                }
            }
            Ok(ParsedMessage::Request { method, .. }) => {
                tracing::debug!("ignoring unsolicited server-to-client request: {method}");
            }
            Ok(ParsedMessage::Notification { method, .. }) => {
                tracing::debug!("received server notification: {method}");
            }
            Err(validation_error) => {
                tracing::warn!("dropping invalid rpc message: {:?}", validation_error.error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    fn boxed_pair(
        a_read: tokio::io::DuplexStream,
        a_write: tokio::io::DuplexStream,
    ) -> (BoxedReader, BoxedWriter) {
        (Box::new(a_read), Box::new(a_write))
    }

    #[tokio::test]
    async fn call_round_trips_a_result() {
        let (client_side, mut server_side) = tokio::io::duplex(8192);
        let (client_read, client_write) = tokio::io::split(client_side);
        let (reader, writer) = boxed_pair(client_read, client_write);

        let client = RpcClient::spawn(reader, writer, Duration::from_secs(5));

        let server_task = tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            let n = tokio::io::AsyncReadExt::read(&mut server_side, &mut buf)
                .await
                .unwrap();
            let request: Value = serde_json::from_slice(&buf[..n - 1]).unwrap();
            let id = request["id"].clone();
            let response = json!({"jsonrpc":"2.0","id":id,"result":{"ok":true}});
            let mut bytes = serde_json::to_vec(&response).unwrap();
            bytes.push(b'\n');
            server_side.write_all(&bytes).await.unwrap();
        });

        let result = client.call_default("ping", None).await.unwrap();
        assert_eq!(result, json!({"ok": true}));
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn call_times_out_when_no_reply_arrives() {
        let (client_side, _server_side) = tokio::io::duplex(8192);
        let (client_read, client_write) = tokio::io::split(client_side);
        let (reader, writer) = boxed_pair(client_read, client_write);

        let client = RpcClient::spawn(reader, writer, Duration::from_secs(5));
        let err = client
            .call("slow", None, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Timeout(_)));
    }

    #[tokio::test]
    async fn remote_error_is_surfaced() {
        let (client_side, mut server_side) = tokio::io::duplex(8192);
        let (client_read, client_write) = tokio::io::split(client_side);
        let (reader, writer) = boxed_pair(client_read, client_write);

        let client = RpcClient::spawn(reader, writer, Duration::from_secs(5));

        let server_task = tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            let n = tokio::io::AsyncReadExt::read(&mut server_side, &mut buf)
                .await
                .unwrap();
            let request: Value = serde_json::from_slice(&buf[..n - 1]).unwrap();
            let id = request["id"].clone();
            let response = json!({
                "jsonrpc":"2.0","id":id,
                "error":{"code":-32601,"message":"unknown method"}
            });
            let mut bytes = serde_json::to_vec(&response).unwrap();
            bytes.push(b'\n');
            server_side.write_all(&bytes).await.unwrap();
        });

        let err = client.call_default("bogus", None).await.unwrap_err();
        match err {
            RpcError::Remote(obj) => assert_eq!(obj.code, -32601),
            other => panic!("unexpected error: {other:?}"),
        }
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn transport_closed_fails_pending_calls() {
        let (client_side, server_side) = tokio::io::duplex(8192);
        let (client_read, client_write) = tokio::io::split(client_side);
        let (reader, writer) = boxed_pair(client_read, client_write);

        let client = RpcClient::spawn(reader, writer, Duration::from_secs(5));
        drop(server_side);

        let err = client
            .call("anything", None, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RpcError::TransportClosed | RpcError::Timeout(_)
        ));
    }
}

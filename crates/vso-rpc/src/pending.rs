//! The pending-request table: tracks outbound calls awaiting a reply.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::message::RpcErrorObj;

/// A hashable JSON-RPC id. Only string and number ids are ever sent by this
/// client; null ids are rejected for outbound requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl RequestId {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Number(n) => Value::from(*n),
            Self::String(s) => Value::String(s.clone()),
        }
    }

    /// Build a `RequestId` from an inbound response's `id` field. Returns
    /// `None` for ids this client never would have issued (null, float,
    /// object, array) — such a response cannot be correlated and is
    /// dropped as a late/unrecognized reply.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Number(n) => n.as_i64().map(Self::Number),
            _ => None,
        }
    }
}

/// Outcome delivered to a waiting caller: either half of a JSON-RPC
/// response.
#[derive(Debug, Clone)]
pub enum RpcOutcome {
    Result(Value),
    Error(RpcErrorObj),
}

struct PendingEntry {
    tx: oneshot::Sender<RpcOutcome>,
    #[allow(dead_code)] // retained for observability / future deadline sweeps
    deadline: Instant,
}

/// Tracks requests awaiting a reply. Access is serialized by an external
/// `Mutex` in [`crate::client::RpcClient`]; this type itself does no
/// locking and is private to its owning client.
#[derive(Default)]
pub struct PendingTable {
    entries: HashMap<RequestId, PendingEntry>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending request. Spec invariant: "each id is present
    /// in the pending table at most once" — an existing entry for the same
    /// id is replaced (the client guarantees unique ids per instance via a
    /// monotonic counter, so this should never actually collide).
    pub fn insert(
        &mut self,
        id: RequestId,
        timeout: Duration,
    ) -> oneshot::Receiver<RpcOutcome> {
        let (tx, rx) = oneshot::channel();
        self.entries.insert(
            id,
            PendingEntry {
                tx,
                deadline: Instant::now() + timeout,
            },
        );
        rx
    }

    /// Deliver a reply. Returns `false` if no entry was found (late reply —
    /// dropped by the caller with a warning).
    pub fn complete(&mut self, id: &RequestId, outcome: RpcOutcome) -> bool {
        match self.entries.remove(id) {
            Some(entry) => {
                let _ = entry.tx.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Remove an entry without delivering anything (used on timeout —
    /// the caller already learned `Timeout` via the `tokio::time::timeout`
    /// wrapper around its receiver).
    pub fn remove(&mut self, id: &RequestId) {
        self.entries.remove(id);
    }

    /// Drop all pending entries, failing every waiting caller with
    /// `TransportClosed`. Called when the transport dies so no caller
    /// waits forever.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_round_trips_number_and_string() {
        let n = Value::from(42);
        assert_eq!(RequestId::from_value(&n), Some(RequestId::Number(42)));

        let s = Value::String("abc".into());
        assert_eq!(
            RequestId::from_value(&s),
            Some(RequestId::String("abc".into()))
        );

        assert_eq!(RequestId::from_value(&Value::Null), None);
    }

    #[tokio::test]
    async fn complete_delivers_to_waiter() {
        let mut table = PendingTable::new();
        let rx = table.insert(RequestId::Number(1), Duration::from_secs(5));
        assert!(table.complete(&RequestId::Number(1), RpcOutcome::Result(Value::Bool(true))));
        let outcome = rx.await.unwrap();
        assert!(matches!(outcome, RpcOutcome::Result(Value::Bool(true))));
    }

    #[test]
    fn complete_on_missing_id_returns_false() {
        let mut table = PendingTable::new();
        assert!(!table.complete(&RequestId::Number(99), RpcOutcome::Result(Value::Null)));
    }

    #[tokio::test]
    async fn clear_drops_all_waiters() {
        let mut table = PendingTable::new();
        let rx1 = table.insert(RequestId::Number(1), Duration::from_secs(5));
        let rx2 = table.insert(RequestId::Number(2), Duration::from_secs(5));
        table.clear();
        assert!(rx1.await.is_err());
        assert!(rx2.await.is_err());
    }

    #[test]
    fn id_present_at_most_once() {
        let mut table = PendingTable::new();
        let _rx1 = table.insert(RequestId::Number(1), Duration::from_secs(5));
        assert_eq!(table.len(), 1);
        let _rx2 = table.insert(RequestId::Number(1), Duration::from_secs(5));
        assert_eq!(table.len(), 1);
    }
}

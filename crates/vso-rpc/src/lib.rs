//! JSON-RPC 2.0 client over the line-framed transport.

mod client;
mod error;
mod message;
mod pending;

pub use client::RpcClient;
pub use error::RpcError;
pub use message::{parse_and_validate, ParsedMessage, RpcErrorObj, ValidationError};
pub use pending::{PendingTable, RequestId, RpcOutcome};

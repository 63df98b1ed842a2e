//! Request body encoding for the Deluge JSON-RPC dialect.
//!
//! The dialect is a flat `{"id", "method", "params"}` object: no `jsonrpc`
//! version field, no batches, no notifications.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    id: u64,
    method: &'a str,
    params: &'a [Value],
}

/// Encode a call as the JSON request body.
///
/// `params` are serialized as a JSON array in the given order. `method` is not
/// validated.
pub fn encode(method: &str, params: &[Value], id: u64) -> Result<Vec<u8>, serde_json::Error> {
    debug_assert!(!method.is_empty(), "RPC method name must not be empty");
    serde_json::to_vec(&RpcRequest { id, method, params })
}

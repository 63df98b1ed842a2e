//! Error types for the Deluge RPC client.
//!
//! # Design
//! Failures fall into three kinds that callers handle differently:
//! `TransportError` (the round-trip itself broke; worth retrying),
//! `RpcError` (the server answered with an `error` object) and `DecodeError`
//! (the `result` did not have the shape the call site expected, usually a
//! client/server version mismatch). `DelugeError` is the union returned by
//! every client operation.

use std::fmt;
use std::string::FromUtf8Error;

use thiserror::Error;

/// Errors returned by `DelugeClient` operations.
#[derive(Error, Debug)]
pub enum DelugeError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("unexpected response shape: {0}")]
    Decode(#[from] DecodeError),
}

/// The HTTP round-trip failed before a JSON object could be produced.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connecting, writing the request or reading the response failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),

    /// Reading or decompressing the response body failed.
    #[error("failed to read response body: {0}")]
    Io(#[from] std::io::Error),

    #[error("response body is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    #[error("response body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The body parsed as JSON but is not an object.
    #[error("response body is not a JSON object")]
    NotAnObject,
}

/// The server returned a non-null `error` object.
///
/// Match on `code` and `message` for programmatic handling; the `Display`
/// form is for humans only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    pub code: i64,
    pub message: Option<String>,
}

impl RpcError {
    /// Stored in `code` when the server's error object has no usable code.
    pub const UNSET_CODE: i64 = -1;
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error")?;
        if self.code >= 0 {
            write!(f, " {}", self.code)?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RpcError {}

/// A typed decoder met a payload shape it does not understand.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` should be {expected}")]
    UnexpectedType {
        field: &'static str,
        expected: &'static str,
    },

    /// A positional tuple (host, event) had the wrong arity.
    #[error("{what} tuple has {len} elements")]
    BadTuple { what: &'static str, len: usize },

    #[error("unknown host status `{0}`")]
    UnknownHostStatus(String),

    /// A structured record (statistics, torrent) failed to deserialize.
    #[error("invalid record: {0}")]
    Record(#[from] serde_json::Error),
}

/// Invalid client configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid base URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("environment variable {name} has invalid value `{value}`")]
    InvalidEnv { name: &'static str, value: String },
}

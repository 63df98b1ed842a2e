//! Blocking client for the Deluge web UI's JSON-RPC API.
//!
//! # Overview
//! Issues sequential RPC calls to `<base-url>/json`, keeps the login session
//! alive through cookies, and decodes the heterogeneous `result` payloads
//! into typed responses.
//!
//! # Design
//! - `request` encodes `{"id", "method", "params"}` bodies.
//! - `transport` owns the endpoint and `SessionStore`, sets headers, runs
//!   the exchange through an `HttpExecutor` (ureq in production) and
//!   decodes gzip bodies.
//! - `responses` maps `error` objects to `RpcError` and holds one decoder
//!   per result shape; the call site picks which.
//! - `DelugeClient` ties them together with a per-client id counter and the
//!   high-level operations (`login`, `get_hosts`, `update_ui`, ...).
//!
//! ```rust,ignore
//! use deluge_rpc::{ClientConfig, DelugeClient};
//!
//! let config = ClientConfig::new("http://localhost:8112", "deluge");
//! let mut client = DelugeClient::new(&config)?;
//! if client.login()?.value {
//!     for host in client.get_hosts()?.hosts {
//!         println!("{} {:?}", host.id, host.status);
//!     }
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod request;
pub mod responses;
pub mod session;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testutil;

pub use client::{DelugeClient, SessionState, EVENT_NAMES, UI_FIELDS};
pub use config::ClientConfig;
pub use error::{ConfigError, DecodeError, DelugeError, RpcError, TransportError};
pub use http::{HttpRequest, HttpResponse};
pub use responses::{
    EventsResponse, FlagResponse, HostResponse, MethodsResponse, RpcResponse, UiResponse,
};
pub use session::SessionStore;
pub use transport::{HttpExecutor, Transport, UreqExecutor};
pub use types::{Event, Host, HostStatus, Statistics, Torrent};

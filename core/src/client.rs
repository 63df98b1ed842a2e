//! Stateful client for the Deluge web UI's JSON-RPC endpoint.
//!
//! # Design
//! `DelugeClient` owns one `Transport` (endpoint plus cookie session) and the
//! request id counter. Every operation goes through `call`, which takes the
//! next id before any I/O, so ids are consumed by failed calls too and are
//! never reused. Operations take `&mut self`: a client is one logical
//! session and is not meant to be shared between threads.
//!
//! The client reflects session state from server answers but never refuses
//! a call because of it; the server decides what is allowed.

use std::fmt;

use serde_json::{json, Value};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ConfigError, DelugeError, TransportError};
use crate::request::encode;
use crate::responses::{
    decode_connection, decode_events, decode_flag, decode_host_status, decode_hosts,
    decode_methods, decode_ui, EventsResponse, FlagResponse, HostResponse, MethodsResponse,
    RpcResponse, UiResponse,
};
use crate::session::SessionStore;
use crate::transport::{HttpExecutor, Transport, UreqExecutor};

/// Events the web UI can forward, registered by `register_event_listeners`.
pub const EVENT_NAMES: [&str; 16] = [
    "ConfigValueChangedEvent",
    "NewVersionAvailableEvent",
    "PluginDisabledEvent",
    "PluginEnabledEvent",
    "PreTorrentRemovedEvent",
    "SessionPausedEvent",
    "SessionResumedEvent",
    "SessionStartedEvent",
    "TorrentAddedEvent",
    "TorrentFileRenamedEvent",
    "TorrentFinishedEvent",
    "TorrentFolderRenamedEvent",
    "TorrentQueueChangedEvent",
    "TorrentRemovedEvent",
    "TorrentResumedEvent",
    "TorrentStateChangedEvent",
];

/// Torrent fields requested by `update_ui_default`.
pub const UI_FIELDS: [&str; 23] = [
    "queue",
    "name",
    "total_size",
    "state",
    "progress",
    "num_seeds",
    "total_seeds",
    "num_peers",
    "total_peers",
    "download_payload_rate",
    "upload_payload_rate",
    "eta",
    "ratio",
    "distributed_copies",
    "is_auto_managed",
    "time_added",
    "tracker_host",
    "save_path",
    "total_done",
    "total_uploaded",
    "max_download_speed",
    "max_upload_speed",
    "seeds_peers_ratio",
];

/// Session state as last reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No successful login yet.
    #[default]
    Fresh,
    Authenticated,
    /// The server confirmed `auth.delete_session`. Cookies may remain.
    SessionClosed,
}

pub struct DelugeClient<E = UreqExecutor> {
    transport: Transport<E>,
    password: String,
    next_id: u64,
    state: SessionState,
}

impl<E: fmt::Debug> fmt::Debug for DelugeClient<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelugeClient")
            .field("transport", &self.transport)
            .field("password", &"<redacted>")
            .field("next_id", &self.next_id)
            .field("state", &self.state)
            .finish()
    }
}

impl DelugeClient {
    /// Build a client that talks HTTP(S) through ureq.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let endpoint = config.endpoint()?;
        let executor = UreqExecutor::new(config.timeout, config.relaxes_tls());
        Ok(Self::with_executor(endpoint, &config.password, executor))
    }
}

impl<E: HttpExecutor> DelugeClient<E> {
    /// Build a client over any executor. `endpoint` is used as is.
    pub fn with_executor(endpoint: impl Into<String>, password: &str, executor: E) -> Self {
        Self {
            transport: Transport::new(endpoint, executor),
            password: password.to_string(),
            next_id: 0,
            state: SessionState::Fresh,
        }
    }

    pub fn session_state(&self) -> SessionState {
        self.state
    }

    pub fn session(&self) -> &SessionStore {
        self.transport.session()
    }

    /// The id the next call will carry.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn transport(&self) -> &Transport<E> {
        &self.transport
    }

    /// Issue one RPC call and fail on a server-side `error`.
    pub fn call(&mut self, method: &str, params: &[Value]) -> Result<RpcResponse, DelugeError> {
        let id = self.next_id;
        self.next_id += 1;
        debug!(method, id, "rpc call");

        let body = encode(method, params, id).map_err(TransportError::from)?;
        let response = self.transport.send(body)?;
        response.check_error()?;
        Ok(response)
    }

    pub fn list_methods(&mut self) -> Result<MethodsResponse, DelugeError> {
        let raw = self.call("system.listMethods", &[])?;
        Ok(decode_methods(raw)?)
    }

    pub fn check_session(&mut self) -> Result<FlagResponse, DelugeError> {
        let raw = self.call("auth.check_session", &[])?;
        Ok(decode_flag(raw))
    }

    /// Log in with the configured password.
    pub fn login(&mut self) -> Result<FlagResponse, DelugeError> {
        let password = json!(self.password);
        let response = decode_flag(self.call("auth.login", &[password])?);
        if response.value {
            self.state = SessionState::Authenticated;
        }
        Ok(response)
    }

    pub fn delete_session(&mut self) -> Result<FlagResponse, DelugeError> {
        let response = decode_flag(self.call("auth.delete_session", &[])?);
        if response.value {
            self.state = SessionState::SessionClosed;
        }
        Ok(response)
    }

    pub fn register_event_listener(&mut self, event: &str) -> Result<RpcResponse, DelugeError> {
        self.call("web.register_event_listener", &[json!(event)])
    }

    /// Register every event in `EVENT_NAMES`, stopping at the first failure.
    pub fn register_event_listeners(&mut self) -> Result<(), DelugeError> {
        for event in EVENT_NAMES {
            self.register_event_listener(event)?;
        }
        Ok(())
    }

    pub fn is_connected(&mut self) -> Result<FlagResponse, DelugeError> {
        let raw = self.call("web.connected", &[])?;
        Ok(decode_flag(raw))
    }

    pub fn get_hosts(&mut self) -> Result<HostResponse, DelugeError> {
        let raw = self.call("web.get_hosts", &[])?;
        Ok(decode_hosts(raw)?)
    }

    pub fn get_host_status(&mut self, host_id: &str) -> Result<HostResponse, DelugeError> {
        let raw = self.call("web.get_host_status", &[json!(host_id)])?;
        Ok(decode_host_status(raw)?)
    }

    /// Connect the web UI to a daemon. A `null` result means connected.
    pub fn connect(&mut self, host_id: &str) -> Result<FlagResponse, DelugeError> {
        let raw = self.call("web.connect", &[json!(host_id)])?;
        Ok(decode_connection(raw, true)?)
    }

    /// Disconnect from the current daemon. A `null` result means disconnected.
    pub fn disconnect(&mut self) -> Result<FlagResponse, DelugeError> {
        let raw = self.call("web.disconnect", &[])?;
        Ok(decode_connection(raw, false)?)
    }

    pub fn get_events(&mut self) -> Result<EventsResponse, DelugeError> {
        let raw = self.call("web.get_events", &[])?;
        Ok(decode_events(raw)?)
    }

    /// Fetch a UI snapshot with the given torrent fields and filter object.
    pub fn update_ui(&mut self, fields: &[&str], filter: Value) -> Result<UiResponse, DelugeError> {
        let raw = self.call("web.update_ui", &[json!(fields), filter])?;
        Ok(decode_ui(raw)?)
    }

    pub fn update_ui_default(&mut self) -> Result<UiResponse, DelugeError> {
        self.update_ui(&UI_FIELDS, json!({}))
    }
}

//! Domain records decoded from RPC results.
//!
//! # Design
//! Plain owned values: once a decoder returns them the caller owns them
//! outright. `Statistics` and `Torrent` come from JSON objects and derive
//! `Deserialize` with every field defaulted, since the server only sends the
//! fields it was asked for. Hosts and events arrive as positional arrays
//! and are built by hand in `responses`.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::error::DecodeError;

/// Connection state of a daemon as reported by the web UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostStatus {
    Offline,
    Online,
    Connected,
}

impl FromStr for HostStatus {
    type Err = DecodeError;

    /// Exact, case-sensitive match on the server's spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Offline" => Ok(HostStatus::Offline),
            "Online" => Ok(HostStatus::Online),
            "Connected" => Ok(HostStatus::Connected),
            other => Err(DecodeError::UnknownHostStatus(other.to_string())),
        }
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HostStatus::Offline => "Offline",
            HostStatus::Online => "Online",
            HostStatus::Connected => "Connected",
        };
        f.write_str(s)
    }
}

/// A daemon the web UI can proxy to.
///
/// `hostname` and `port` are `None` when the host came from a status-only
/// lookup that does not report them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub id: String,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub status: HostStatus,
    pub version: Option<String>,
}

/// One queued server event: `[name, args...]` on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub args: Vec<Value>,
}

/// Session-wide transfer statistics from the UI snapshot.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Statistics {
    pub upload_rate: f64,
    pub download_rate: f64,
    pub upload_protocol_rate: f64,
    pub download_protocol_rate: f64,
    pub max_upload: f64,
    pub max_download: f64,
    pub num_connections: i64,
    pub max_num_connections: i64,
    pub dht_nodes: i64,
    pub free_space: i64,
    pub has_incoming_connections: bool,
    pub external_ip: Option<String>,
}

/// Status of one torrent in the UI snapshot.
///
/// `id` is the (normalized) key of the torrent in the snapshot map; the rest
/// mirror the requested UI fields.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Torrent {
    #[serde(skip)]
    pub id: String,
    pub queue: i64,
    pub name: String,
    pub total_size: u64,
    pub state: String,
    pub progress: f64,
    pub num_seeds: i64,
    pub total_seeds: i64,
    pub num_peers: i64,
    pub total_peers: i64,
    pub download_payload_rate: f64,
    pub upload_payload_rate: f64,
    pub eta: f64,
    pub ratio: f64,
    pub distributed_copies: f64,
    pub is_auto_managed: bool,
    pub time_added: f64,
    pub tracker_host: String,
    pub save_path: String,
    pub total_done: u64,
    pub total_uploaded: u64,
    pub max_download_speed: f64,
    pub max_upload_speed: f64,
    pub seeds_peers_ratio: f64,
}

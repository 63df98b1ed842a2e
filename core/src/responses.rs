//! Raw RPC responses and the typed decoders built on them.
//!
//! # Design
//! The server's `result` is heterogeneous: a boolean for session calls, an
//! array of positional tuples for hosts and events, a nested object for the
//! UI snapshot. The payload does not say which shape it carries, so each
//! call site picks its decoder explicitly. Every typed response keeps the
//! raw status and payload it was decoded from.
//!
//! Decoders never run on a payload with an `error`: `check_error` is applied
//! first by the client. A decoder that meets an unexpected shape fails the
//! whole call; no partially filled response is returned.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{DecodeError, RpcError};
use crate::types::{Event, Host, HostStatus, Statistics, Torrent};

/// Status code and parsed JSON object of one RPC round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse {
    pub status: u16,
    pub payload: Value,
}

impl RpcResponse {
    pub fn new(status: u16, payload: Value) -> Self {
        Self { status, payload }
    }

    /// The `id` echoed by the server.
    pub fn id(&self) -> Option<u64> {
        self.payload.get("id").and_then(Value::as_u64)
    }

    /// The `result` field, or `None` if absent or `null`.
    pub fn result(&self) -> Option<&Value> {
        self.payload.get("result").filter(|v| !v.is_null())
    }

    pub fn check_error(&self) -> Result<(), RpcError> {
        check_error(&self.payload)
    }
}

/// Fail with `RpcError` if the payload's `error` is present and not `null`.
pub fn check_error(payload: &Value) -> Result<(), RpcError> {
    match payload.get("error") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Object(error)) => Err(RpcError {
            code: error
                .get("code")
                .and_then(Value::as_i64)
                .unwrap_or(RpcError::UNSET_CODE),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
        }),
        Some(Value::String(message)) => Err(RpcError {
            code: RpcError::UNSET_CODE,
            message: Some(message.clone()),
        }),
        Some(_) => Err(RpcError {
            code: RpcError::UNSET_CODE,
            message: None,
        }),
    }
}

/// `true` for JSON `true` or the string `"true"` in any case.
fn lenient_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// A call whose result is a single yes/no answer.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagResponse {
    pub raw: RpcResponse,
    pub value: bool,
}

/// Decode `result` as a boolean; absent or `null` means `false`.
pub fn decode_flag(raw: RpcResponse) -> FlagResponse {
    let value = lenient_bool(raw.result());
    FlagResponse { raw, value }
}

/// Decode the answer to `web.connect` / `web.disconnect`.
///
/// These return `null` on success, so a `null` (or absent) `result` yields
/// `when_null`: the state the caller asked for. A non-null result must be a
/// boolean or the string `"true"`/`"false"` (any case).
pub fn decode_connection(raw: RpcResponse, when_null: bool) -> Result<FlagResponse, DecodeError> {
    let value = match raw.payload.get("result") {
        None | Some(Value::Null) => when_null,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => true,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => false,
        Some(_) => {
            return Err(DecodeError::UnexpectedType {
                field: "result",
                expected: "a boolean",
            })
        }
    };
    Ok(FlagResponse { raw, value })
}

/// Names returned by `system.listMethods`.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodsResponse {
    pub raw: RpcResponse,
    pub methods: Vec<String>,
}

pub fn decode_methods(raw: RpcResponse) -> Result<MethodsResponse, DecodeError> {
    let methods = match raw.result() {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or(DecodeError::UnexpectedType {
                    field: "result",
                    expected: "an array of strings",
                })
            })
            .collect::<Result<_, _>>()?,
        Some(_) => {
            return Err(DecodeError::UnexpectedType {
                field: "result",
                expected: "an array of strings",
            })
        }
    };
    Ok(MethodsResponse { raw, methods })
}

/// Hosts known to the web UI. A single-host lookup still yields a list.
#[derive(Debug, Clone, PartialEq)]
pub struct HostResponse {
    pub raw: RpcResponse,
    pub hosts: Vec<Host>,
}

/// Decode `web.get_hosts`: an array of `[id, hostname, port, status, version?]`.
pub fn decode_hosts(raw: RpcResponse) -> Result<HostResponse, DecodeError> {
    let hosts = match raw.result() {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| host_tuple(item, HostLayout::Full))
            .collect::<Result<_, _>>()?,
        Some(_) => {
            return Err(DecodeError::UnexpectedType {
                field: "result",
                expected: "an array of host tuples",
            })
        }
    };
    Ok(HostResponse { raw, hosts })
}

/// Decode `web.get_host_status`: one `[id, status, version]` tuple, or the
/// full five-element form some servers send.
pub fn decode_host_status(raw: RpcResponse) -> Result<HostResponse, DecodeError> {
    let item = raw.result().ok_or(DecodeError::MissingField("result"))?;
    let host = host_tuple(item, HostLayout::StatusOnly)?;
    Ok(HostResponse {
        raw,
        hosts: vec![host],
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostLayout {
    Full,
    StatusOnly,
}

fn host_tuple(item: &Value, layout: HostLayout) -> Result<Host, DecodeError> {
    let fields = item.as_array().ok_or(DecodeError::UnexpectedType {
        field: "host",
        expected: "an array",
    })?;

    match (layout, fields.len()) {
        (HostLayout::Full, 4 | 5) | (HostLayout::StatusOnly, 5) => Ok(Host {
            id: string_at(fields, 0, "host id")?,
            hostname: Some(string_at(fields, 1, "hostname")?),
            port: Some(port_at(fields, 2)?),
            status: string_at(fields, 3, "host status")?.parse::<HostStatus>()?,
            version: optional_string_at(fields, 4, "version")?,
        }),
        (HostLayout::StatusOnly, 3) => Ok(Host {
            id: string_at(fields, 0, "host id")?,
            hostname: None,
            port: None,
            status: string_at(fields, 1, "host status")?.parse::<HostStatus>()?,
            version: optional_string_at(fields, 2, "version")?,
        }),
        (_, len) => Err(DecodeError::BadTuple { what: "host", len }),
    }
}

fn string_at(fields: &[Value], index: usize, field: &'static str) -> Result<String, DecodeError> {
    fields
        .get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(DecodeError::UnexpectedType {
            field,
            expected: "a string",
        })
}

fn optional_string_at(
    fields: &[Value],
    index: usize,
    field: &'static str,
) -> Result<Option<String>, DecodeError> {
    match fields.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(DecodeError::UnexpectedType {
            field,
            expected: "a string or null",
        }),
    }
}

fn port_at(fields: &[Value], index: usize) -> Result<u16, DecodeError> {
    fields
        .get(index)
        .and_then(Value::as_u64)
        .and_then(|port| u16::try_from(port).ok())
        .ok_or(DecodeError::UnexpectedType {
            field: "port",
            expected: "a port number",
        })
}

/// Events queued for this session since the last poll.
#[derive(Debug, Clone, PartialEq)]
pub struct EventsResponse {
    pub raw: RpcResponse,
    pub events: Vec<Event>,
}

/// Decode `web.get_events`: an array of `[name, args...]`, or `null` when
/// nothing is queued.
pub fn decode_events(raw: RpcResponse) -> Result<EventsResponse, DecodeError> {
    let events = match raw.result() {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(event_tuple).collect::<Result<_, _>>()?,
        Some(_) => {
            return Err(DecodeError::UnexpectedType {
                field: "result",
                expected: "an array of events",
            })
        }
    };
    Ok(EventsResponse { raw, events })
}

fn event_tuple(item: &Value) -> Result<Event, DecodeError> {
    let fields = item.as_array().ok_or(DecodeError::UnexpectedType {
        field: "event",
        expected: "an array",
    })?;
    let (name, args) = fields
        .split_first()
        .ok_or(DecodeError::BadTuple { what: "event", len: 0 })?;
    let name = name.as_str().ok_or(DecodeError::UnexpectedType {
        field: "event name",
        expected: "a string",
    })?;
    Ok(Event {
        name: name.to_string(),
        args: args.to_vec(),
    })
}

/// Point-in-time view returned by `web.update_ui`.
#[derive(Debug, Clone, PartialEq)]
pub struct UiResponse {
    pub raw: RpcResponse,
    pub connected: bool,
    pub stats: Statistics,
    torrents: BTreeMap<String, Torrent>,
}

impl UiResponse {
    /// Torrents ordered by id.
    pub fn torrents(&self) -> impl Iterator<Item = &Torrent> {
        self.torrents.values()
    }

    pub fn torrent(&self, id: &str) -> Option<&Torrent> {
        self.torrents.get(&normalize_torrent_id(id))
    }

    pub fn torrent_count(&self) -> usize {
        self.torrents.len()
    }
}

/// Torrent ids are info-hashes; compare them trimmed and lowercased.
pub fn normalize_torrent_id(id: &str) -> String {
    id.trim().to_ascii_lowercase()
}

/// Decode `web.update_ui`: `{connected, stats, torrents}`.
///
/// `stats` is required. `torrents` may be missing or `null`. When two keys
/// normalize to the same id the first one wins.
pub fn decode_ui(raw: RpcResponse) -> Result<UiResponse, DecodeError> {
    let result = object_field(raw.result(), "result")?;
    let connected = lenient_bool(result.get("connected"));

    let stats = object_field(result.get("stats").filter(|v| !v.is_null()), "stats")?;
    let stats: Statistics = serde_json::from_value(without_nulls(stats))?;

    let mut torrents = BTreeMap::new();
    match result.get("torrents") {
        None | Some(Value::Null) => {}
        Some(Value::Object(entries)) => {
            for (key, detail) in entries {
                let detail = detail.as_object().ok_or(DecodeError::UnexpectedType {
                    field: "torrents",
                    expected: "an object of torrent objects",
                })?;
                let id = normalize_torrent_id(key);
                if let Entry::Vacant(slot) = torrents.entry(id.clone()) {
                    let mut torrent: Torrent = serde_json::from_value(without_nulls(detail))?;
                    torrent.id = id;
                    slot.insert(torrent);
                }
            }
        }
        Some(_) => {
            return Err(DecodeError::UnexpectedType {
                field: "torrents",
                expected: "an object",
            })
        }
    }

    Ok(UiResponse {
        raw,
        connected,
        stats,
        torrents,
    })
}

/// The server sends `null` for values it cannot report yet; treat those
/// fields as absent so they take their defaults.
fn without_nulls(map: &Map<String, Value>) -> Value {
    Value::Object(
        map.iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    )
}

fn object_field<'a>(
    value: Option<&'a Value>,
    field: &'static str,
) -> Result<&'a Map<String, Value>, DecodeError> {
    match value {
        None => Err(DecodeError::MissingField(field)),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(DecodeError::UnexpectedType {
            field,
            expected: "an object",
        }),
    }
}

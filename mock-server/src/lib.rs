use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use cookie::Cookie;
use flate2::{write::GzEncoder, Compression};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub const PASSWORD: &str = "deluge";
pub const SESSION_COOKIE: &str = "_session_id";
pub const HOST_ID: &str = "1cc7ee2e2259ad6c29430b2f5ae75919009ec4da";
pub const DAEMON_VERSION: &str = "1.3.15";

pub const ERR_NOT_AUTHENTICATED: i64 = 1;
pub const ERR_UNKNOWN_METHOD: i64 = 2;
pub const ERR_BAD_REQUEST: i64 = 3;
pub const ERR_UNKNOWN_HOST: i64 = 4;

const METHODS: [&str; 12] = [
    "auth.check_session",
    "auth.delete_session",
    "auth.login",
    "system.listMethods",
    "web.connect",
    "web.connected",
    "web.disconnect",
    "web.get_events",
    "web.get_host_status",
    "web.get_hosts",
    "web.register_event_listener",
    "web.update_ui",
];

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

#[derive(Debug)]
pub struct MockState {
    password: String,
    sessions: HashSet<String>,
    connected: bool,
    listeners: Vec<String>,
    events: Vec<Value>,
    torrents: BTreeMap<String, Value>,
}

impl MockState {
    pub fn new(password: &str) -> Self {
        Self {
            password: password.to_string(),
            sessions: HashSet::new(),
            connected: false,
            listeners: Vec::new(),
            events: Vec::new(),
            torrents: sample_torrents(),
        }
    }

    fn queue_event(&mut self, name: &str, args: &[Value]) {
        if self.listeners.iter().any(|l| l == name) {
            let mut event = vec![json!(name)];
            event.extend_from_slice(args);
            self.events.push(Value::Array(event));
        }
    }
}

pub type Db = Arc<RwLock<MockState>>;

/// Result of one dispatched call, before HTTP encoding.
#[derive(Debug, PartialEq)]
pub struct Outcome {
    pub result: Result<Value, (i64, String)>,
    pub set_cookie: Option<String>,
}

impl Outcome {
    fn ok(result: Value) -> Self {
        Self {
            result: Ok(result),
            set_cookie: None,
        }
    }

    fn err(code: i64, message: &str) -> Self {
        Self {
            result: Err((code, message.to_string())),
            set_cookie: None,
        }
    }
}

pub fn app() -> Router {
    app_with_password(PASSWORD)
}

pub fn app_with_password(password: &str) -> Router {
    let db: Db = Arc::new(RwLock::new(MockState::new(password)));
    Router::new().route("/json", post(rpc)).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn rpc(State(db): State<Db>, headers: HeaderMap, body: Bytes) -> Response {
    let gzip = headers
        .get(header::ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("gzip"));

    let request: RpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            let payload = envelope(&Value::Null, &Err((ERR_BAD_REQUEST, err.to_string())));
            return encode(StatusCode::BAD_REQUEST, payload, None, gzip);
        }
    };
    debug!(method = %request.method, id = %request.id, "mock rpc");

    let session = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(session_from_cookie);

    let outcome = dispatch(&mut *db.write().await, session.as_deref(), &request);
    let payload = envelope(&request.id, &outcome.result);
    encode(StatusCode::OK, payload, outcome.set_cookie, gzip)
}

fn envelope(id: &Value, result: &Result<Value, (i64, String)>) -> Value {
    match result {
        Ok(value) => json!({"id": id, "result": value, "error": null}),
        Err((code, message)) => {
            json!({"id": id, "result": null, "error": {"code": code, "message": message}})
        }
    }
}

fn encode(status: StatusCode, payload: Value, set_cookie: Option<String>, gzip: bool) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(cookie) = set_cookie.and_then(|c| HeaderValue::from_str(&c).ok()) {
        headers.insert(header::SET_COOKIE, cookie);
    }

    let body = payload.to_string().into_bytes();
    let body = if gzip {
        match gzip_bytes(&body) {
            Ok(compressed) => {
                headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
                compressed
            }
            Err(_) => body,
        }
    } else {
        body
    };
    (status, headers, body).into_response()
}

pub fn gzip_bytes(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Find the session id in a `Cookie` header. Pairs may be separated by `;`
/// or `,`.
pub fn session_from_cookie(header: &str) -> Option<String> {
    header
        .split(',')
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value_trimmed().to_string())
}

pub fn dispatch(state: &mut MockState, session: Option<&str>, request: &RpcRequest) -> Outcome {
    let authenticated = session.is_some_and(|s| state.sessions.contains(s));
    let first_param = request.params.first();

    match request.method.as_str() {
        "system.listMethods" => Outcome::ok(json!(METHODS)),
        "auth.check_session" => Outcome::ok(json!(authenticated)),
        "auth.login" => {
            if first_param.and_then(Value::as_str) != Some(state.password.as_str()) {
                return Outcome::ok(json!(false));
            }
            let session_id = Uuid::new_v4().simple().to_string();
            state.sessions.insert(session_id.clone());
            Outcome {
                result: Ok(json!(true)),
                set_cookie: Some(format!("{SESSION_COOKIE}={session_id}; Path=/json")),
            }
        }
        method if !METHODS.contains(&method) => Outcome::err(ERR_UNKNOWN_METHOD, "Unknown method"),
        _ if !authenticated => Outcome::err(ERR_NOT_AUTHENTICATED, "Not authenticated"),
        "auth.delete_session" => {
            if let Some(session) = session {
                state.sessions.remove(session);
            }
            Outcome::ok(json!(true))
        }
        "web.connected" => Outcome::ok(json!(state.connected)),
        "web.get_hosts" => Outcome::ok(json!([[
            HOST_ID,
            "127.0.0.1",
            58846,
            host_status(state),
            DAEMON_VERSION
        ]])),
        "web.get_host_status" => match first_param.and_then(Value::as_str) {
            Some(HOST_ID) => Outcome::ok(json!([HOST_ID, host_status(state), DAEMON_VERSION])),
            _ => Outcome::ok(Value::Null),
        },
        "web.connect" => match first_param.and_then(Value::as_str) {
            Some(HOST_ID) => {
                state.connected = true;
                state.queue_event("SessionStartedEvent", &[]);
                Outcome::ok(Value::Null)
            }
            _ => Outcome::err(ERR_UNKNOWN_HOST, "Unknown host"),
        },
        "web.disconnect" => {
            state.connected = false;
            Outcome::ok(Value::Null)
        }
        "web.register_event_listener" => match first_param.and_then(Value::as_str) {
            Some(event) => {
                if !state.listeners.iter().any(|l| l == event) {
                    state.listeners.push(event.to_string());
                }
                Outcome::ok(Value::Null)
            }
            None => Outcome::err(ERR_BAD_REQUEST, "Missing event name"),
        },
        "web.get_events" => {
            if state.events.is_empty() {
                Outcome::ok(Value::Null)
            } else {
                Outcome::ok(Value::Array(std::mem::take(&mut state.events)))
            }
        }
        "web.update_ui" => Outcome::ok(update_ui(state, &request.params)),
        _ => Outcome::err(ERR_UNKNOWN_METHOD, "Unknown method"),
    }
}

fn host_status(state: &MockState) -> &'static str {
    if state.connected {
        "Connected"
    } else {
        "Online"
    }
}

fn update_ui(state: &MockState, params: &[Value]) -> Value {
    if !state.connected {
        return json!({
            "connected": false,
            "torrents": null,
            "stats": {"max_download": null, "max_upload": null, "max_num_connections": null}
        });
    }

    let fields: Vec<&str> = params
        .first()
        .and_then(Value::as_array)
        .map(|fields| fields.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let state_filter = params
        .get(1)
        .and_then(|filter| filter.get("state"))
        .and_then(Value::as_str);

    let mut torrents = Map::new();
    for (id, detail) in &state.torrents {
        if state_filter.is_some_and(|wanted| detail["state"] != wanted) {
            continue;
        }
        let selected: Map<String, Value> = match detail.as_object() {
            Some(all) if !fields.is_empty() => all
                .iter()
                .filter(|(k, _)| fields.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            Some(all) => all.clone(),
            None => Map::new(),
        };
        torrents.insert(id.clone(), Value::Object(selected));
    }

    json!({
        "connected": true,
        "torrents": torrents,
        "stats": {
            "upload_rate": 10240.0,
            "download_rate": 524288.0,
            "upload_protocol_rate": 512.0,
            "download_protocol_rate": 2048.0,
            "max_upload": -1.0,
            "max_download": -1.0,
            "num_connections": 42,
            "max_num_connections": 200,
            "dht_nodes": 312,
            "free_space": 107374182400i64,
            "has_incoming_connections": true
        }
    })
}

fn sample_torrents() -> BTreeMap<String, Value> {
    BTreeMap::from([
        (
            "2c6b6858d61da9543d4231a71db4b1c9264b0685".to_string(),
            json!({
                "queue": 0,
                "name": "ubuntu-24.04-desktop-amd64.iso",
                "total_size": 6114656256u64,
                "state": "Downloading",
                "progress": 37.5,
                "num_seeds": 12,
                "total_seeds": 340,
                "num_peers": 3,
                "total_peers": 25,
                "download_payload_rate": 524288.0,
                "upload_payload_rate": 4096.0,
                "eta": 7312,
                "ratio": 0.02,
                "distributed_copies": 0.0,
                "is_auto_managed": true,
                "time_added": 1718000000.0,
                "tracker_host": "ubuntu.com",
                "save_path": "/downloads",
                "total_done": 2292996096u64,
                "total_uploaded": 45875200u64,
                "max_download_speed": -1.0,
                "max_upload_speed": -1.0,
                "seeds_peers_ratio": 13.6
            }),
        ),
        (
            "dd8255ecdc7ca55fb0bbf81323d87062db1f6d1c".to_string(),
            json!({
                "queue": -1,
                "name": "debian-12.5.0-amd64-netinst.iso",
                "total_size": 659554304u64,
                "state": "Seeding",
                "progress": 100.0,
                "num_seeds": 0,
                "total_seeds": 88,
                "num_peers": 2,
                "total_peers": 9,
                "download_payload_rate": 0.0,
                "upload_payload_rate": 8192.0,
                "eta": 0,
                "ratio": 1.7,
                "distributed_copies": 0.0,
                "is_auto_managed": true,
                "time_added": 1717000000.0,
                "tracker_host": "debian.org",
                "save_path": "/downloads",
                "total_done": 659554304u64,
                "total_uploaded": 1121242316u64,
                "max_download_speed": -1.0,
                "max_upload_speed": -1.0,
                "seeds_peers_ratio": 9.78
            }),
        ),
    ])
}

//! Blocking HTTP transport for the JSON endpoint.
//!
//! # Design
//! `Transport` owns everything that has to survive between calls on one
//! client: the normalized endpoint URL and the `SessionStore`. Each `send`
//! builds an `HttpRequest`, runs it through an `HttpExecutor`, then decodes
//! the body according to `Content-Encoding` and parses it as a JSON object.
//!
//! `UreqExecutor` is the production executor. It disables ureq's idle
//! connection pool so every call opens its own connection, and the
//! connection is released when the ureq response is dropped, on every exit
//! path. The single configured timeout covers connect, response headers and
//! body read.

use std::io::Read;
use std::time::Duration;

use flate2::read::GzDecoder;
use serde_json::Value;
use tracing::{trace, warn};
use ureq::tls::TlsConfig;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};
use crate::responses::RpcResponse;
use crate::session::SessionStore;

/// Advertised to the server; gzip is preferred.
pub const ACCEPT_ENCODING: &str = "gzip;q=1.0, compress;q=0.5";

/// Executes one HTTP exchange.
///
/// Implementations must not decompress the body or follow cookies: both
/// are the transport's job.
pub trait HttpExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `HttpExecutor` backed by a blocking `ureq` agent.
#[derive(Debug)]
pub struct UreqExecutor {
    agent: ureq::Agent,
}

impl UreqExecutor {
    /// Build an executor with `timeout` on connect and read.
    ///
    /// `relax_tls` accepts any server certificate and skips hostname
    /// verification. This makes the connection open to interception; only use
    /// it for daemons with self-signed certificates on a trusted network.
    pub fn new(timeout: Duration, relax_tls: bool) -> Self {
        let mut builder = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(timeout))
            .timeout_recv_response(Some(timeout))
            .timeout_recv_body(Some(timeout))
            .max_idle_connections(0)
            .max_idle_connections_per_host(0);
        if relax_tls {
            builder = builder.tls_config(TlsConfig::builder().disable_verification(true).build());
        }
        Self {
            agent: builder.build().new_agent(),
        }
    }
}

impl HttpExecutor for UreqExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.agent.post(request.url.as_str());
        // ureq derives Content-Length from the body itself.
        for (name, value) in &request.headers {
            if name.eq_ignore_ascii_case("Content-Length") {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        let mut response = builder.send(request.body.as_slice())?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), value.to_string()))
            })
            .collect();

        let mut body = Vec::new();
        response.body_mut().as_reader().read_to_end(&mut body)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// One client's connection settings and session.
#[derive(Debug)]
pub struct Transport<E = UreqExecutor> {
    endpoint: String,
    executor: E,
    session: SessionStore,
}

impl<E: HttpExecutor> Transport<E> {
    pub fn new(endpoint: impl Into<String>, executor: E) -> Self {
        Self {
            endpoint: endpoint.into(),
            executor,
            session: SessionStore::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Build the `POST` for an encoded body, carrying the current cookies.
    pub fn build_request(&self, body: Vec<u8>) -> HttpRequest {
        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("Accept-Encoding".to_string(), ACCEPT_ENCODING.to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Content-Length".to_string(), body.len().to_string()),
        ];
        if let Some(cookie) = self.session.cookie_header() {
            headers.push(("Cookie".to_string(), cookie));
        }
        HttpRequest {
            url: self.endpoint.clone(),
            headers,
            body,
        }
    }

    /// Send an encoded body and return the status and parsed JSON object.
    ///
    /// Cookies from the response are merged only after the body parsed.
    pub fn send(&mut self, body: Vec<u8>) -> Result<RpcResponse, TransportError> {
        let request = self.build_request(body);
        let mut response = self.executor.execute(&request)?;

        let body = std::mem::take(&mut response.body);
        let text = decode_body(response.header("Content-Encoding"), body)?;
        trace!(status = response.status, body = %text, "response received");
        let payload: Value = serde_json::from_str(&text)?;
        if !payload.is_object() {
            return Err(TransportError::NotAnObject);
        }

        self.session.merge_all(response.header_values("Set-Cookie"));

        Ok(RpcResponse::new(response.status, payload))
    }
}

/// Decompress `body` as announced by `Content-Encoding` and decode as UTF-8.
///
/// `gzip` and `compress` are both read as gzip streams. Unknown encodings
/// are logged and read as plain text.
pub fn decode_body(encoding: Option<&str>, body: Vec<u8>) -> Result<String, TransportError> {
    let encoding = encoding.map(str::trim).unwrap_or_default();
    let gzipped =
        encoding.eq_ignore_ascii_case("gzip") || encoding.eq_ignore_ascii_case("compress");
    let bytes = if gzipped {
        let mut inflated = Vec::new();
        GzDecoder::new(body.as_slice()).read_to_end(&mut inflated)?;
        inflated
    } else {
        if !encoding.is_empty() {
            warn!(encoding, "unknown Content-Encoding, reading body as plain text");
        }
        body
    };
    Ok(String::from_utf8(bytes)?)
}

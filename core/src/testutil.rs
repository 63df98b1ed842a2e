//! Test helpers: an `HttpExecutor` that replays canned responses.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::HttpExecutor;

/// Records every request and answers from a queue.
///
/// When the queue is empty the call fails with a connection-refused
/// `TransportError`, which is how tests simulate an unreachable server.
#[derive(Debug, Default)]
pub(crate) struct RecordingExecutor {
    requests: RefCell<Vec<HttpRequest>>,
    responses: RefCell<VecDeque<HttpResponse>>,
}

impl RecordingExecutor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, response: HttpResponse) {
        self.responses.borrow_mut().push_back(response);
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    /// The JSON bodies sent so far.
    pub(crate) fn sent_bodies(&self) -> Vec<serde_json::Value> {
        self.requests
            .borrow()
            .iter()
            .map(|req| serde_json::from_slice(&req.body).unwrap())
            .collect()
    }
}

impl HttpExecutor for RecordingExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        self.responses.borrow_mut().pop_front().ok_or_else(|| {
            TransportError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "no response queued",
            ))
        })
    }
}

pub(crate) fn json_response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        body: body.as_bytes().to_vec(),
    }
}

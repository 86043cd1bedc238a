//! In-memory transport for tests.

use std::cell::RefCell;
use std::collections::HashMap;

use super::{HttpResponse, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub identifier: String,
    pub body: Option<Vec<u8>>,
}

/// Records requests; results only appear once a test completes them.
#[derive(Default)]
pub(crate) struct MockTransport {
    requests: RefCell<Vec<RecordedRequest>>,
    ready: RefCell<HashMap<String, HttpResponse>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn complete(&self, identifier: &str, response: HttpResponse) {
        self.ready
            .borrow_mut()
            .insert(identifier.to_string(), response);
    }

    pub fn complete_ok(&self, identifier: &str, body: impl Into<Vec<u8>>) {
        self.complete(identifier, HttpResponse::ok(body));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.borrow().last().cloned()
    }

    fn record(&self, method: &'static str, url: &str, identifier: &str, body: Option<Vec<u8>>) {
        self.requests.borrow_mut().push(RecordedRequest {
            method,
            url: url.to_string(),
            identifier: identifier.to_string(),
            body,
        });
    }
}

impl Transport for MockTransport {
    fn async_get(&self, url: &str, identifier: &str) {
        self.record("GET", url, identifier, None);
    }

    fn async_post(&self, url: &str, identifier: &str, body: Vec<u8>) {
        self.record("POST", url, identifier, Some(body));
    }

    fn poll_result(&self, identifier: &str) -> Option<HttpResponse> {
        self.ready.borrow_mut().remove(identifier)
    }
}

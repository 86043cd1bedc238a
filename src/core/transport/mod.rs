// ─── Transport ───
// Identifier-keyed, non-blocking request store consumed by web tasks.
//
// Requests are fired with `async_get`/`async_post` and their results are
// pulled later with `poll_result`, which removes the stored result.

mod client;
#[cfg(test)]
pub(crate) mod mock;

pub use client::HttpTransport;

use crate::core::error::TransportError;

/// Outcome of one request, as stored by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// `true` when the request completed with a 2xx status.
    pub success: bool,
    /// HTTP status code, 0 when no response was received.
    pub status_code: u16,
    /// Network-level failure, if any.
    pub error: Option<TransportError>,
    pub data: Vec<u8>,
}

impl HttpResponse {
    pub fn ok(data: impl Into<Vec<u8>>) -> Self {
        Self {
            success: true,
            status_code: 200,
            error: None,
            data: data.into(),
        }
    }

    pub fn status(status_code: u16) -> Self {
        Self {
            success: (200..300).contains(&status_code),
            status_code,
            error: None,
            data: Vec::new(),
        }
    }

    pub fn failed(error: TransportError) -> Self {
        Self {
            success: false,
            status_code: 0,
            error: Some(error),
            data: Vec::new(),
        }
    }
}

/// Non-blocking HTTP layer shared by every task.
pub trait Transport {
    fn async_get(&self, url: &str, identifier: &str);

    /// POST `body` as `application/x-www-form-urlencoded`.
    fn async_post(&self, url: &str, identifier: &str, body: Vec<u8>);

    /// Take the finished result for `identifier`, if any. Destructive.
    fn poll_result(&self, identifier: &str) -> Option<HttpResponse>;
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::{HttpResponse, Transport};
use crate::core::error::{LauncherResult, TransportError};
use crate::core::http::build_http_client;

type ResultStore = Arc<Mutex<HashMap<String, HttpResponse>>>;

/// reqwest-backed transport.
///
/// Every request runs as a task on the given tokio runtime and parks its
/// result under the request identifier until someone polls it.
pub struct HttpTransport {
    client: Client,
    runtime: Handle,
    results: ResultStore,
    /// Bodies larger than this are discarded and reported as failures.
    max_response_bytes: usize,
}

impl HttpTransport {
    pub fn new(runtime: Handle, max_response_bytes: usize) -> LauncherResult<Self> {
        Ok(Self {
            client: build_http_client()?,
            runtime,
            results: Arc::new(Mutex::new(HashMap::new())),
            max_response_bytes,
        })
    }

    /// Number of finished results nobody has collected yet.
    pub fn unclaimed(&self) -> usize {
        lock(&self.results).len()
    }

    fn spawn(&self, request: RequestBuilder, url: &str, identifier: &str) {
        let results = Arc::clone(&self.results);
        let identifier = identifier.to_string();
        let url = url.to_string();
        let limit = self.max_response_bytes;

        self.runtime.spawn(async move {
            let response = execute(request, limit).await;
            if let Some(err) = &response.error {
                warn!("Request '{}' to {} failed: {}", identifier, url, err);
            } else {
                debug!(
                    "Request '{}' finished: HTTP {} ({} bytes)",
                    identifier,
                    response.status_code,
                    response.data.len()
                );
            }
            lock(&results).insert(identifier, response);
        });
    }
}

impl Transport for HttpTransport {
    fn async_get(&self, url: &str, identifier: &str) {
        debug!("GET {} as '{}'", url, identifier);
        self.spawn(self.client.get(url), url, identifier);
    }

    fn async_post(&self, url: &str, identifier: &str, body: Vec<u8>) {
        debug!("POST {} as '{}'", url, identifier);
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body);
        self.spawn(request, url, identifier);
    }

    fn poll_result(&self, identifier: &str) -> Option<HttpResponse> {
        lock(&self.results).remove(identifier)
    }
}

async fn execute(request: RequestBuilder, limit: usize) -> HttpResponse {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return HttpResponse::failed(e.into()),
    };

    let status = response.status();
    let mut data = Vec::new();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                let mut failed = HttpResponse::failed(e.into());
                failed.status_code = status.as_u16();
                return failed;
            }
        };

        if data.len() + chunk.len() > limit {
            let mut failed = HttpResponse::failed(TransportError::BodyTooLarge(limit));
            failed.status_code = status.as_u16();
            return failed;
        }
        data.extend_from_slice(&chunk);
    }

    HttpResponse {
        success: status.is_success(),
        status_code: status.as_u16(),
        error: None,
        data,
    }
}

fn lock(results: &ResultStore) -> MutexGuard<'_, HashMap<String, HttpResponse>> {
    results.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn transport(limit: usize) -> HttpTransport {
        HttpTransport::new(Handle::current(), limit).unwrap()
    }

    async fn wait_for(transport: &HttpTransport, identifier: &str) -> HttpResponse {
        for _ in 0..500 {
            if let Some(response) = transport.poll_result(identifier) {
                return response;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no result for '{identifier}'");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn get_stores_body_until_polled_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&server)
            .await;

        let transport = transport(1024);
        transport.async_get(&format!("{}/list.json", server.uri()), "list");

        for _ in 0..500 {
            if transport.unclaimed() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(transport.unclaimed(), 1);

        let response = wait_for(&transport, "list").await;
        assert!(response.success);
        assert_eq!(response.status_code, 200);
        assert_eq!(response.error, None);
        assert_eq!(response.data, b"hello".to_vec());

        assert_eq!(transport.poll_result("list"), None);
        assert_eq!(transport.unclaimed(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn non_2xx_is_not_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let transport = transport(1024);
        transport.async_get(&format!("{}/missing.png", server.uri()), "flag");

        let response = wait_for(&transport, "flag").await;
        assert!(!response.success);
        assert_eq!(response.status_code, 404);
        assert_eq!(response.error, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn oversized_body_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 64]))
            .mount(&server)
            .await;

        let transport = transport(16);
        transport.async_get(&format!("{}/big.zip", server.uri()), "zip");

        let response = wait_for(&transport, "zip").await;
        assert!(!response.success);
        assert_eq!(response.status_code, 200);
        assert_eq!(response.error, Some(TransportError::BodyTooLarge(16)));
        assert!(response.data.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn post_sends_form_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string("username=alice&password=pw&token=t"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"username":"alice"}"#))
            .mount(&server)
            .await;

        let transport = transport(1024);
        transport.async_post(
            &format!("{}/api/login", server.uri()),
            "login",
            b"username=alice&password=pw&token=t".to_vec(),
        );

        let response = wait_for(&transport, "login").await;
        assert!(response.success);
        assert_eq!(response.data, br#"{"username":"alice"}"#.to_vec());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_host_reports_transport_error() {
        let transport = transport(1024);
        transport.async_get("http://127.0.0.1:1/nothing", "dead");

        let response = wait_for(&transport, "dead").await;
        assert!(!response.success);
        assert_eq!(response.status_code, 0);
        assert!(response.error.is_some());
    }
}

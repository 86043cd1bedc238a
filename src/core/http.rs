use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

const APP_USER_AGENT: &str = "CubeLauncher/0.1.0";

/// Shared client for every launcher request. The cookie store carries the
/// login session from the token request to the sign-in and server lookups.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .cookie_store(true)
        .connect_timeout(Duration::from_secs(15))
        .build()
}

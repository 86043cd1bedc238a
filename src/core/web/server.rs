// ─── Server Info ───
// Server records filled field-by-field from JSON, plus the single lookup task.

use std::fmt;

use tracing::debug;

use super::task::{WebTask, WebTaskHandler};
use crate::core::json::{parse_json, JsonValue, OnValue, ParseOptions};
use crate::core::transport::Transport;

pub const FETCH_SERVER_TASK_ID: &str = "CC fetch server";

/// Lowercase ISO 3166-1 alpha-2 code, as used by the flag image URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CountryCode([u8; 2]);

impl CountryCode {
    /// Placeholder for servers whose country could not be resolved.
    pub const UNKNOWN: CountryCode = CountryCode(*b"t1");

    /// Take the first two characters of `abbr`, lowercased.
    pub fn parse(abbr: &str) -> Option<Self> {
        match abbr.as_bytes() {
            [a, b, ..] if a.is_ascii() && b.is_ascii() => {
                Some(CountryCode([a.to_ascii_lowercase(), b.to_ascii_lowercase()]))
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("t1")
    }
}

impl Default for CountryCode {
    fn default() -> Self {
        CountryCode::UNKNOWN
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order value of a server that has not been placed in a listing yet.
pub const UNSORTED_ORDER: i32 = -100_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub hash: String,
    pub name: String,
    pub ip: String,
    pub port: u16,
    pub mppass: String,
    pub software: String,
    pub players: i32,
    pub max_players: i32,
    /// Seconds the server has been online.
    pub uptime: i32,
    pub featured: bool,
    pub country: CountryCode,
    pub order: i32,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            hash: String::new(),
            name: String::new(),
            ip: String::new(),
            port: 0,
            mppass: String::new(),
            software: String::new(),
            players: 0,
            max_players: 0,
            uptime: 0,
            featured: false,
            country: CountryCode::UNKNOWN,
            order: UNSORTED_ORDER,
        }
    }
}

impl ServerInfo {
    /// Apply one JSON member. Unknown keys and unparsable numbers leave the
    /// record untouched.
    pub fn apply(&mut self, key: &str, value: &JsonValue<'_>) {
        if value.is_container() {
            return;
        }
        let text = value.as_str();

        match key.to_ascii_lowercase().as_str() {
            "hash" => self.hash = text.to_string(),
            "name" => self.name = text.to_string(),
            "players" => parse_into(text, &mut self.players),
            "maxplayers" => parse_into(text, &mut self.max_players),
            "uptime" => parse_into(text, &mut self.uptime),
            "mppass" => self.mppass = text.to_string(),
            "ip" => self.ip = text.to_string(),
            "port" => parse_into(text, &mut self.port),
            "software" => self.software = text.to_string(),
            "featured" => {
                if let Some(featured) = parse_bool(text) {
                    self.featured = featured;
                }
            }
            "country_abbr" => {
                if let Some(country) = CountryCode::parse(text) {
                    self.country = country;
                }
            }
            _ => {}
        }
    }
}

fn parse_into<T: std::str::FromStr>(text: &str, dst: &mut T) {
    if let Ok(parsed) = text.parse() {
        *dst = parsed;
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") || text == "1" {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") || text == "0" {
        Some(false)
    } else {
        None
    }
}

/// Looks up a single server by its hash.
#[derive(Debug, Default)]
pub struct FetchServerTask {
    base: WebTask,
    json: ParseOptions,
    pub server: ServerInfo,
}

impl FetchServerTask {
    pub fn new(json: ParseOptions) -> Self {
        Self {
            json,
            ..Self::default()
        }
    }

    pub fn run(&mut self, transport: &dyn Transport, fetch_url: &str, hash: &str) {
        if self.base.working {
            return;
        }
        self.base.reset(FETCH_SERVER_TASK_ID);
        self.server = ServerInfo::default();

        let url = format!("{}?s={}", fetch_url, urlencoding::encode(hash));
        transport.async_get(&url, FETCH_SERVER_TASK_ID);
    }
}

impl WebTaskHandler for FetchServerTask {
    fn task(&self) -> &WebTask {
        &self.base
    }

    fn task_mut(&mut self) -> &mut WebTask {
        &mut self.base
    }

    fn handle(&mut self, data: &[u8]) {
        let server = &mut self.server;
        let mut visitor = OnValue(|key: &str, value: &JsonValue<'_>| server.apply(key, value));
        if !parse_json(data, self.json, &mut visitor) {
            debug!("Server lookup response was malformed");
        }
    }
}

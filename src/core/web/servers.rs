// ─── Servers List ───
// Two-pass parse of `{ "<hash>": {server fields}, ... }`.
//
// Pass 1 counts entries so the table is sized once; pass 2 walks the same
// buffer again and fills one `ServerInfo` per entry object.

use std::cmp::Reverse;

use tracing::{debug, info, warn};

use super::server::ServerInfo;
use super::task::{WebTask, WebTaskHandler};
use crate::core::json::{parse_json, JsonValue, JsonVisitor, ParseOptions};
use crate::core::transport::Transport;

pub const FETCH_SERVERS_TASK_ID: &str = "CC fetch servers";

/// Entry objects sit directly inside the outermost container.
const ENTRY_DEPTH: usize = 2;

/// Pass 1: count entry objects.
#[derive(Default)]
struct EntryCounter {
    entries: usize,
}

impl JsonVisitor for EntryCounter {
    fn on_new_object(&mut self, depth: usize) {
        if depth == ENTRY_DEPTH {
            self.entries += 1;
        }
    }
}

/// Pass 2: open a record on every entry object, route values into it.
struct EntryFiller<'s> {
    servers: &'s mut Vec<ServerInfo>,
    capacity: usize,
    depth: usize,
    current: Option<usize>,
}

impl JsonVisitor for EntryFiller<'_> {
    fn on_value(&mut self, key: &str, value: &JsonValue<'_>) {
        if value.is_container() {
            self.depth = self.depth.saturating_sub(1);
            if self.depth < ENTRY_DEPTH {
                self.current = None;
            }
            return;
        }
        if let Some(server) = self.current.and_then(|i| self.servers.get_mut(i)) {
            server.apply(key, value);
        }
    }

    fn on_new_object(&mut self, depth: usize) {
        self.depth = depth;
        if depth != ENTRY_DEPTH || self.servers.len() >= self.capacity {
            return;
        }
        self.current = Some(self.servers.len());
        self.servers.push(ServerInfo::default());
    }

    fn on_new_array(&mut self, depth: usize) {
        self.depth = depth;
    }
}

/// Number of server entries in a list payload.
pub fn count_entries(data: &[u8], options: ParseOptions) -> usize {
    let mut counter = EntryCounter::default();
    parse_json(data, options, &mut counter);
    counter.entries
}

/// Downloads and parses the public servers list.
#[derive(Debug, Default)]
pub struct FetchServersTask {
    base: WebTask,
    json: ParseOptions,
    pub servers: Vec<ServerInfo>,
    /// Display order: `orders[row]` is an index into `servers`.
    pub orders: Vec<usize>,
}

impl FetchServersTask {
    pub fn new(json: ParseOptions) -> Self {
        Self {
            json,
            ..Self::default()
        }
    }

    pub fn run(&mut self, transport: &dyn Transport, list_url: &str) {
        if self.base.working {
            return;
        }
        self.base.reset(FETCH_SERVERS_TASK_ID);
        transport.async_get(list_url, FETCH_SERVERS_TASK_ID);
    }

    pub fn num_servers(&self) -> usize {
        self.servers.len()
    }

    /// Server shown at display row `row`.
    pub fn get(&self, row: usize) -> Option<&ServerInfo> {
        self.orders.get(row).and_then(|&i| self.servers.get(i))
    }

    /// Restore listing order.
    pub fn reset_order(&mut self) {
        self.orders = (0..self.servers.len()).collect();
        self.sync_order_fields();
    }

    /// Most populated servers first; ties keep listing order.
    pub fn sort_orders_by_players(&mut self) {
        let servers = &self.servers;
        self.orders.sort_by_key(|&i| Reverse(servers[i].players));
        self.sync_order_fields();
    }

    fn sync_order_fields(&mut self) {
        for (row, &i) in self.orders.iter().enumerate() {
            if let Some(server) = self.servers.get_mut(i) {
                server.order = row as i32;
            }
        }
    }
}

impl WebTaskHandler for FetchServersTask {
    fn task(&self) -> &WebTask {
        &self.base
    }

    fn task_mut(&mut self) -> &mut WebTask {
        &mut self.base
    }

    fn handle(&mut self, data: &[u8]) {
        self.servers = Vec::new();
        self.orders = Vec::new();

        let count = count_entries(data, self.json);
        if count == 0 {
            return;
        }

        let mut servers = Vec::new();
        let mut orders = Vec::new();
        if servers.try_reserve_exact(count).is_err() || orders.try_reserve_exact(count).is_err() {
            warn!("Out of memory allocating servers list ({} entries)", count);
            return;
        }

        let mut filler = EntryFiller {
            servers: &mut servers,
            capacity: count,
            depth: 0,
            current: None,
        };
        if !parse_json(data, self.json, &mut filler) {
            debug!("Servers list response was malformed");
        }

        orders.extend(0..servers.len());
        self.servers = servers;
        self.orders = orders;
        self.sync_order_fields();
        info!("Loaded {} servers", self.servers.len());
    }
}

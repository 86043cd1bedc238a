// ─── CubeLauncher Core ───
// Web side of a classic block game launcher, driven by polling.
//
// Architecture:
//   core/
//     json/       - Streaming callback JSON scanner
//     transport/  - Identifier-keyed async HTTP with destructive polling
//     web/        - Web tasks: login, servers, updates, flags
//     resources/  - Missing game resource check + batch fetch
//     state/      - Settings file + launcher session owning every task
//     http        - Shared reqwest client

pub mod error;
pub mod http;
pub mod json;
pub mod resources;
pub mod state;
pub mod transport;
pub mod web;

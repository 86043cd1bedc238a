pub mod auth;
pub mod flags;
pub mod server;
pub mod servers;
pub mod task;
pub mod update;

pub use auth::{GetTokenTask, SignInError, SignInTask};
pub use flags::{Flag, FetchFlagsTask};
pub use server::{CountryCode, FetchServerTask, ServerInfo};
pub use servers::FetchServersTask;
pub use task::{describe_http_error, WebTask, WebTaskHandler};
pub use update::{BuildFlavor, CheckUpdateTask, FetchUpdateTask, FsUpdater, Updater};

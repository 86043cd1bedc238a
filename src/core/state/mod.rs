pub mod config;
pub mod session;

pub use config::{default_data_dir, Endpoints, LauncherConfig};
pub use session::LauncherSession;

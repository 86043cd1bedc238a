use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::json::ParseOptions;

const APP_DIR_NAME: &str = "CubeLauncher";
const SETTINGS_FILE: &str = "launcher_settings.json";
const UPDATE_FILE: &str = "CubeLauncher.update";

/// Remote services the launcher talks to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub login_url: String,
    pub server_fetch_url: String,
    pub servers_url: String,
    pub builds_url: String,
    pub update_base: String,
    pub flags_url: String,
    pub audio_url: String,
    pub texture_archive_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login_url: "https://www.classicube.net/api/login".into(),
            server_fetch_url: "http://dulm.blue/cube/server/fetch.php".into(),
            servers_url: "http://dulm.blue/cube/server/list.json".into(),
            builds_url: "http://cs.classicube.net/c_client/builds.json".into(),
            update_base: "http://cs.classicube.net/c_client".into(),
            flags_url: "http://dulm.blue/cube/img/flags".into(),
            audio_url: "http://dulm.blue/cube/audio".into(),
            texture_archive_url: "http://dulm.blue/cube/dulmDefault.zip".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Directory the settings were loaded from; resources live under it too.
    #[serde(skip)]
    pub data_dir: PathBuf,
    pub endpoints: Endpoints,
    /// Multiplier applied to flag images.
    pub display_scale: f32,
    pub tick_interval_ms: u64,
    pub json: ParseOptions,
    /// Responses larger than this fail with `BodyTooLarge`.
    pub max_response_bytes: usize,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            endpoints: Endpoints::default(),
            display_scale: 1.0,
            tick_interval_ms: 16,
            json: ParseOptions::default(),
            max_response_bytes: 64 * 1024 * 1024,
        }
    }
}

impl LauncherConfig {
    /// Read `launcher_settings.json` from `data_dir`, or use defaults.
    pub fn load(data_dir: &Path) -> Self {
        let mut config = load_settings_from_disk(data_dir).unwrap_or_default();
        config.data_dir = data_dir.to_path_buf();
        config
    }

    pub fn save(&self) -> LauncherResult<()> {
        std::fs::create_dir_all(&self.data_dir)
            .map_err(|e| LauncherError::io(&self.data_dir, e))?;
        let path = self.settings_path();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| LauncherError::io(path, e))
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }

    /// Where a downloaded client build is written.
    pub fn update_path(&self) -> PathBuf {
        self.data_dir.join(UPDATE_FILE)
    }

    /// Root for `texpacks/` and `audio/`.
    pub fn resources_dir(&self) -> &Path {
        &self.data_dir
    }
}

fn load_settings_from_disk(data_dir: &Path) -> Option<LauncherConfig> {
    let path = data_dir.join(SETTINGS_FILE);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) => {
            debug!("No settings at {:?} ({}), using defaults", path, e);
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("Ignoring unreadable settings {:?}: {}", path, e);
            None
        }
    }
}

fn default_base_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// `<platform data dir>/CubeLauncher`.
pub fn default_data_dir() -> PathBuf {
    default_base_dir().join(APP_DIR_NAME)
}

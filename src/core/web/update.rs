// ─── Updates ───
// Build metadata check and raw download of a new client binary.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::task::{WebTask, WebTaskHandler};
use crate::core::json::{parse_json, JsonValue, OnValue, ParseOptions};
use crate::core::transport::Transport;

pub const CHECK_UPDATE_TASK_ID: &str = "CC update check";

/// Reads `{release_version, latest_ts, release_ts}` from the builds endpoint.
#[derive(Debug, Default)]
pub struct CheckUpdateTask {
    base: WebTask,
    json: ParseOptions,
    pub latest_release: String,
    /// Unix seconds of the newest development build.
    pub dev_timestamp: u64,
    /// Unix seconds of the newest release build.
    pub rel_timestamp: u64,
}

impl CheckUpdateTask {
    pub fn new(json: ParseOptions) -> Self {
        Self {
            json,
            ..Self::default()
        }
    }

    pub fn run(&mut self, transport: &dyn Transport, builds_url: &str) {
        if self.base.working {
            return;
        }
        self.base.reset(CHECK_UPDATE_TASK_ID);
        self.dev_timestamp = 0;
        self.rel_timestamp = 0;
        self.latest_release.clear();
        transport.async_get(builds_url, CHECK_UPDATE_TASK_ID);
    }

    pub fn latest_build_time(&self) -> Option<DateTime<Utc>> {
        to_datetime(self.dev_timestamp)
    }

    pub fn release_build_time(&self) -> Option<DateTime<Utc>> {
        to_datetime(self.rel_timestamp)
    }
}

impl WebTaskHandler for CheckUpdateTask {
    fn task(&self) -> &WebTask {
        &self.base
    }

    fn task_mut(&mut self) -> &mut WebTask {
        &mut self.base
    }

    fn handle(&mut self, data: &[u8]) {
        let json = self.json;
        let mut visitor = OnValue(|key: &str, value: &JsonValue<'_>| {
            if value.is_container() {
                return;
            }
            if key.eq_ignore_ascii_case("release_version") {
                self.latest_release = value.as_str().to_string();
            } else if key.eq_ignore_ascii_case("latest_ts") {
                self.dev_timestamp = parse_build_time(value.as_str());
            } else if key.eq_ignore_ascii_case("release_ts") {
                self.rel_timestamp = parse_build_time(value.as_str());
            }
        });
        if !parse_json(data, json, &mut visitor) {
            debug!("Build info response was malformed");
        }
    }
}

/// `"seconds.fractional"` to whole seconds. Unparsable input yields 0.
pub fn parse_build_time(text: &str) -> u64 {
    let secs = text.split('.').next().unwrap_or_default();
    secs.parse().unwrap_or(0)
}

fn to_datetime(secs: u64) -> Option<DateTime<Utc>> {
    if secs == 0 {
        return None;
    }
    DateTime::from_timestamp(i64::try_from(secs).ok()?, 0)
}

/// Post-download steps that make a fetched binary runnable.
pub trait Updater {
    fn set_new_build_time(&self, path: &Path, timestamp: u64) -> std::io::Result<()>;

    fn mark_executable(&self, path: &Path) -> std::io::Result<()>;
}

/// Stamps the modification time and sets the exec bit on the file itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsUpdater;

impl Updater for FsUpdater {
    fn set_new_build_time(&self, path: &Path, timestamp: u64) -> std::io::Result<()> {
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_modified(UNIX_EPOCH + Duration::from_secs(timestamp))
    }

    #[cfg(unix)]
    fn mark_executable(&self, path: &Path) -> std::io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms)
    }

    #[cfg(not(unix))]
    fn mark_executable(&self, _path: &Path) -> std::io::Result<()> {
        Ok(())
    }
}

/// Renderer backend of the client build to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildFlavor {
    Direct3D9,
    OpenGl,
}

impl BuildFlavor {
    pub fn file_name(self) -> &'static str {
        if cfg!(target_os = "windows") {
            match self {
                BuildFlavor::Direct3D9 => "ClassiCube.exe",
                BuildFlavor::OpenGl => "ClassiCube.opengl.exe",
            }
        } else if cfg!(target_os = "macos") {
            "ClassiCube.osx"
        } else {
            "ClassiCube"
        }
    }
}

/// Downloads a client build and writes it to the update file.
pub struct FetchUpdateTask {
    base: WebTask,
    update_path: PathBuf,
    updater: Box<dyn Updater>,
    /// Distinguishes successive downloads so a stale one is never applied.
    fetch_counter: u32,
    /// Build time the downloaded file is stamped with.
    pub timestamp: u64,
    /// Set once a downloaded update has been written to disk.
    pub update_ready: bool,
}

impl FetchUpdateTask {
    pub fn new(update_path: PathBuf, updater: Box<dyn Updater>) -> Self {
        Self {
            base: WebTask::new(),
            update_path,
            updater,
            fetch_counter: 0,
            timestamp: 0,
            update_ready: false,
        }
    }

    pub fn update_path(&self) -> &Path {
        &self.update_path
    }

    pub fn run(
        &mut self,
        transport: &dyn Transport,
        update_base: &str,
        release: bool,
        flavor: BuildFlavor,
        check: &CheckUpdateTask,
    ) {
        if self.base.working {
            return;
        }

        let identifier = format!("CC update fetch{}", self.fetch_counter);
        self.fetch_counter += 1;
        self.base.reset(identifier);
        self.timestamp = if release {
            check.rel_timestamp
        } else {
            check.dev_timestamp
        };

        let channel = if release { "release" } else { "latest" };
        let url = format!("{}/{}/{}", update_base, channel, flavor.file_name());
        info!("Downloading {} build from {}", channel, url);
        transport.async_get(&url, &self.base.identifier);
    }
}

impl WebTaskHandler for FetchUpdateTask {
    fn task(&self) -> &WebTask {
        &self.base
    }

    fn task_mut(&mut self) -> &mut WebTask {
        &mut self.base
    }

    fn handle(&mut self, data: &[u8]) {
        let path = &self.update_path;
        if let Err(e) = std::fs::write(path, data) {
            warn!("Saving update to {:?} failed: {}", path, e);
            return;
        }

        if let Err(e) = self.updater.set_new_build_time(path, self.timestamp) {
            warn!("Setting update time failed: {}", e);
        }
        if let Err(e) = self.updater.mark_executable(path) {
            warn!("Making update executable failed: {}", e);
        }

        self.update_ready = true;
        info!("Update saved to {:?} ({} bytes)", path, data.len());
    }
}

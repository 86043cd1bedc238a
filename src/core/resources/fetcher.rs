// ─── Resource Fetcher ───
// One batch that downloads every missing resource and writes it to disk.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::catalog::{
    archive_path, music_path, sound_path, ARCHIVE_ID, MUSIC_TRACKS, SOUND_FILES,
};
use super::check::{check_existence, ResourceStatus};
use crate::core::error::{LauncherError, LauncherResult, TransportError};
use crate::core::transport::{HttpResponse, Transport};
use crate::core::web::describe_http_error;

/// Batch download of the texture archive, music and sounds.
///
/// Each missing resource is requested under its own identifier. The batch
/// completes when every request succeeded, or as soon as one fails.
#[derive(Debug)]
pub struct ResourceFetcher {
    root: PathBuf,
    archive_url: String,
    audio_url: String,
    status: ResourceStatus,
    expected: usize,
    /// Whether this batch requested the sound set.
    fetch_sounds: bool,
    pub working: bool,
    pub completed: bool,
    pub failed: bool,
    /// Successful responses in the current batch.
    pub downloaded: usize,
    pub status_code: u16,
    pub result: Option<TransportError>,
}

impl ResourceFetcher {
    pub fn new(
        root: impl Into<PathBuf>,
        archive_url: impl Into<String>,
        audio_url: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            archive_url: archive_url.into(),
            audio_url: audio_url.into(),
            status: ResourceStatus::default(),
            expected: 0,
            fetch_sounds: false,
            working: false,
            completed: false,
            failed: false,
            downloaded: 0,
            status_code: 0,
            result: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn status(&self) -> &ResourceStatus {
        &self.status
    }

    /// Refresh the presence flags from disk.
    pub fn check_existence(&mut self) -> &ResourceStatus {
        self.status = check_existence(&self.root);
        &self.status
    }

    /// Request every resource that is still missing.
    pub fn run(&mut self, transport: &dyn Transport) {
        if self.working {
            return;
        }

        // sounds are all-or-nothing, a partial set is fetched again in full
        self.fetch_sounds = !self.status.all_sounds_exist();
        self.expected = self.status.missing_count();
        self.working = true;
        self.completed = false;
        self.failed = false;
        self.downloaded = 0;
        self.status_code = 0;
        self.result = None;

        if self.expected == 0 {
            info!("All resources present, nothing to fetch");
            self.finish();
            return;
        }
        info!(
            "Fetching {} resources (~{} KB)",
            self.expected,
            self.status.missing_size_kb()
        );

        if !self.status.all_textures_exist {
            transport.async_get(&self.archive_url, ARCHIVE_ID);
        }
        for (track, _) in MUSIC_TRACKS
            .iter()
            .zip(&self.status.music)
            .filter(|(_, &exists)| !exists)
        {
            let url = format!("{}/{}", self.audio_url, track.name);
            transport.async_get(&url, track.name);
        }
        if self.fetch_sounds {
            for name in SOUND_FILES {
                let url = format!("{}/{}.wav", self.audio_url, name);
                transport.async_get(&url, name);
            }
        }
    }

    /// Collect finished downloads and save them. No-op unless working.
    pub fn update(&mut self, transport: &dyn Transport) {
        if !self.working {
            return;
        }

        if !self.status.all_textures_exist {
            let path = archive_path(&self.root);
            if let Some(true) = self.collect(transport, ARCHIVE_ID, &path) {
                self.status.all_textures_exist = true;
            }
            if !self.working {
                return;
            }
        }

        for (i, track) in MUSIC_TRACKS.iter().enumerate() {
            if self.status.music[i] {
                continue;
            }
            let path = music_path(&self.root, track.name);
            if let Some(true) = self.collect(transport, track.name, &path) {
                self.status.music[i] = true;
            }
            if !self.working {
                return;
            }
        }

        let sounds = if self.fetch_sounds { SOUND_FILES.len() } else { 0 };
        for (i, name) in SOUND_FILES.iter().take(sounds).enumerate() {
            let path = sound_path(&self.root, name);
            if let Some(true) = self.collect(transport, name, &path) {
                self.status.sounds[i] = true;
            }
            if !self.working {
                return;
            }
        }

        if self.downloaded == self.expected {
            info!("Fetched {} resources", self.downloaded);
            self.finish();
        }
    }

    /// Fraction of the batch downloaded so far.
    pub fn progress(&self) -> f32 {
        if self.expected == 0 {
            return if self.completed { 1.0 } else { 0.0 };
        }
        self.downloaded as f32 / self.expected as f32
    }

    /// User-facing description of why the batch failed.
    pub fn display_error(&self) -> String {
        describe_http_error(self.result.as_ref(), self.status_code, "fetching resources")
    }

    /// Poll one identifier. `Some(saved)` once its result has arrived.
    fn collect(&mut self, transport: &dyn Transport, identifier: &str, path: &Path) -> Option<bool> {
        let response = transport.poll_result(identifier)?;
        if !response.success {
            self.fail(identifier, response);
            return Some(false);
        }

        self.downloaded += 1;
        match save_resource(path, &response.data) {
            Ok(()) => {
                debug!("Saved {} to {:?}", identifier, path);
                Some(true)
            }
            Err(e) => {
                warn!("Saving {} failed: {}", identifier, e);
                Some(false)
            }
        }
    }

    fn fail(&mut self, identifier: &str, response: HttpResponse) {
        self.failed = true;
        self.status_code = response.status_code;
        self.result = response.error;
        warn!("Fetching {} failed: {}", identifier, self.display_error());
        self.finish();
    }

    fn finish(&mut self) {
        self.working = false;
        self.completed = true;
    }
}

/// Write `data` to `path`, creating parent directories as needed.
fn save_resource(path: &Path, data: &[u8]) -> LauncherResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
    }
    std::fs::write(path, data).map_err(|e| LauncherError::io(path, e))
}

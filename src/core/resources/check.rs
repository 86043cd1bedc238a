// ─── Existence Check ───
// Works out which resources are missing locally and how much to download.

use std::fs::File;
use std::path::Path;

use tracing::{info, warn};
use zip::ZipArchive;

use super::catalog::{
    archive_path, find_texture, music_path, sound_path, ARCHIVE_SIZE_KB, MUSIC_TRACKS,
    SOUND_FILES, SOUND_SET_SIZE_KB, TEXTURE_FILES,
};
use crate::core::error::{LauncherError, LauncherResult};

/// Per-resource presence flags. A flag set to `true` never goes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceStatus {
    /// The texture archive exists and holds every required texture.
    pub all_textures_exist: bool,
    /// One flag per `MUSIC_TRACKS` entry.
    pub music: Vec<bool>,
    /// One flag per `SOUND_FILES` entry. Sounds are all-or-nothing, so an
    /// existence check sets either every flag or none.
    pub sounds: Vec<bool>,
}

impl Default for ResourceStatus {
    fn default() -> Self {
        Self {
            all_textures_exist: false,
            music: vec![false; MUSIC_TRACKS.len()],
            sounds: vec![false; SOUND_FILES.len()],
        }
    }
}

impl ResourceStatus {
    pub fn all_sounds_exist(&self) -> bool {
        self.sounds.iter().all(|&exists| exists)
    }

    /// Number of downloads needed to make every resource present.
    pub fn missing_count(&self) -> usize {
        let mut count = self.music.iter().filter(|&&exists| !exists).count();
        if !self.all_sounds_exist() {
            count += SOUND_FILES.len();
        }
        if !self.all_textures_exist {
            count += 1;
        }
        count
    }

    /// Rough download size in KB, for progress display.
    pub fn missing_size_kb(&self) -> u32 {
        let mut size: u32 = MUSIC_TRACKS
            .iter()
            .zip(&self.music)
            .filter(|(_, &exists)| !exists)
            .map(|(track, _)| track.size_kb)
            .sum();
        if !self.all_sounds_exist() {
            size += SOUND_SET_SIZE_KB;
        }
        if !self.all_textures_exist {
            size += ARCHIVE_SIZE_KB;
        }
        size
    }

    pub fn is_complete(&self) -> bool {
        self.missing_count() == 0
    }
}

/// Inspect the files under `root`.
pub fn check_existence(root: &Path) -> ResourceStatus {
    let all_textures_exist = check_textures(root);

    let music = MUSIC_TRACKS
        .iter()
        .map(|track| music_path(root, track.name).is_file())
        .collect();

    let any_sound_missing = SOUND_FILES
        .iter()
        .any(|name| !sound_path(root, name).is_file());

    let status = ResourceStatus {
        all_textures_exist,
        music,
        sounds: vec![!any_sound_missing; SOUND_FILES.len()],
    };

    info!(
        "Resource check: {} missing (~{} KB)",
        status.missing_count(),
        status.missing_size_kb()
    );
    status
}

fn check_textures(root: &Path) -> bool {
    let path = archive_path(root);
    if !path.exists() {
        return false;
    }

    match count_archive_textures(&path) {
        // duplicates such as "gui.png" and "GUI.png" both count
        Ok(found) => found >= TEXTURE_FILES.len(),
        Err(e) => {
            warn!("Inspecting {:?} failed: {}", path, e);
            false
        }
    }
}

/// Count archive entries whose file name is a known texture.
pub fn count_archive_textures(path: &Path) -> LauncherResult<usize> {
    let file = File::open(path).map_err(|e| LauncherError::io(path, e))?;
    let archive = ZipArchive::new(file)?;

    let found = archive
        .file_names()
        .filter(|entry| {
            let name = entry.rsplit('/').next().unwrap_or_default();
            find_texture(name).is_some()
        })
        .count();
    Ok(found)
}

// ─── Resource Catalog ───
// Files the game needs that are not shipped with the client.

use std::path::{Path, PathBuf};

/// Transport identifier of the texture archive download.
pub const ARCHIVE_ID: &str = "default zip";
pub const ARCHIVE_SIZE_KB: u32 = 198;

/// Entries the texture archive must contain.
pub const TEXTURE_FILES: [&str; 20] = [
    "char.png", "clouds.png", "default.png", "particles.png",
    "rain.png", "gui_classic.png", "icons.png", "terrain.png",
    "creeper.png", "pig.png", "sheep.png", "sheep_fur.png",
    "skeleton.png", "spider.png", "zombie.png",
    "snow.png", "chicken.png", "gui.png",
    "animations.png", "animations.txt",
];

/// Sound effects, saved as `audio/<name>.wav`.
pub const SOUND_FILES: [&str; 59] = [
    "dig_cloth1", "dig_cloth2", "dig_cloth3", "dig_cloth4",
    "dig_grass1", "dig_grass2", "dig_grass3", "dig_grass4",
    "dig_gravel1", "dig_gravel2", "dig_gravel3", "dig_gravel4",
    "dig_sand1", "dig_sand2", "dig_sand3", "dig_sand4",
    "dig_snow1", "dig_snow2", "dig_snow3", "dig_snow4",
    "dig_stone1", "dig_stone2", "dig_stone3", "dig_stone4",
    "dig_wood1", "dig_wood2", "dig_wood3", "dig_wood4",
    "dig_glass1", "dig_glass2", "dig_glass3",
    "step_cloth1", "step_cloth2", "step_cloth3", "step_cloth4",
    "step_grass1", "step_grass2", "step_grass3", "step_grass4",
    "step_gravel1", "step_gravel2", "step_gravel3", "step_gravel4",
    "step_sand1", "step_sand2", "step_sand3", "step_sand4",
    "step_snow1", "step_snow2", "step_snow3", "step_snow4",
    "step_stone1", "step_stone2", "step_stone3", "step_stone4",
    "step_wood1", "step_wood2", "step_wood3", "step_wood4",
];

/// Estimated size of the whole sound set.
pub const SOUND_SET_SIZE_KB: u32 = 417;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MusicTrack {
    pub name: &'static str,
    pub size_kb: u32,
}

/// Music tracks, saved as `audio/<name>`.
pub const MUSIC_TRACKS: [MusicTrack; 7] = [
    MusicTrack { name: "calm1.ogg", size_kb: 2472 },
    MusicTrack { name: "calm2.ogg", size_kb: 1931 },
    MusicTrack { name: "calm3.ogg", size_kb: 2181 },
    MusicTrack { name: "hal1.ogg", size_kb: 1926 },
    MusicTrack { name: "hal2.ogg", size_kb: 1714 },
    MusicTrack { name: "hal3.ogg", size_kb: 1879 },
    MusicTrack { name: "hal4.ogg", size_kb: 2499 },
];

pub fn archive_path(root: &Path) -> PathBuf {
    root.join("texpacks").join("default.zip")
}

pub fn music_path(root: &Path, name: &str) -> PathBuf {
    root.join("audio").join(name)
}

pub fn sound_path(root: &Path, name: &str) -> PathBuf {
    root.join("audio").join(format!("{}.wav", name))
}

/// Case-insensitive lookup of an archive entry's file name.
pub fn find_texture(name: &str) -> Option<&'static str> {
    TEXTURE_FILES
        .iter()
        .copied()
        .find(|file| file.eq_ignore_ascii_case(name))
}

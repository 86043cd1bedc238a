// ─── Country Flags ───
// Deduplicated flag table filled one download at a time from a queue.

use std::collections::VecDeque;

use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};
use tracing::{debug, warn};

use super::server::CountryCode;
use super::task::{WebTask, WebTaskHandler};
use crate::core::error::LauncherResult;
use crate::core::transport::Transport;

pub const FETCH_FLAG_TASK_ID: &str = "CC get flag";

#[derive(Debug, Clone)]
pub struct Flag {
    pub country: CountryCode,
    /// Decoded image; `None` until downloaded, or if decoding failed.
    pub bitmap: Option<RgbaImage>,
}

/// Downloads flag images for every country added, sequentially.
///
/// All downloads share one task slot, so pending countries wait in `queue`
/// and the next one starts as soon as the current run completes.
#[derive(Debug)]
pub struct FetchFlagsTask {
    base: WebTask,
    flags_url: String,
    display_scale: f32,
    flags: Vec<Flag>,
    queue: VecDeque<usize>,
    current: Option<usize>,
}

impl FetchFlagsTask {
    pub fn new(flags_url: impl Into<String>, display_scale: f32) -> Self {
        Self {
            base: WebTask::new(),
            flags_url: flags_url.into(),
            display_scale,
            flags: Vec::new(),
            queue: VecDeque::new(),
            current: None,
        }
    }

    /// Register `country`; each code is downloaded at most once.
    pub fn add(&mut self, transport: &dyn Transport, country: CountryCode) {
        if self.flags.iter().any(|f| f.country == country) {
            return;
        }
        if self.flags.try_reserve(1).is_err() {
            warn!("Out of memory growing flags table");
            return;
        }

        self.flags.push(Flag {
            country,
            bitmap: None,
        });
        self.queue.push_back(self.flags.len() - 1);
        self.download_next(transport);
    }

    /// Decoded flag for `country`, once available.
    pub fn get(&self, country: CountryCode) -> Option<&RgbaImage> {
        self.flags
            .iter()
            .find(|f| f.country == country)
            .and_then(|f| f.bitmap.as_ref())
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Countries still waiting for their download to start.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drop every flag and anything still queued.
    pub fn clear(&mut self) {
        self.flags.clear();
        self.queue.clear();
        self.current = None;
    }

    fn download_next(&mut self, transport: &dyn Transport) {
        if self.base.working {
            return;
        }
        let Some(index) = self.queue.pop_front() else {
            return;
        };

        self.current = Some(index);
        self.base.reset(FETCH_FLAG_TASK_ID);
        let url = format!("{}/{}.png", self.flags_url, self.flags[index].country);
        transport.async_get(&url, FETCH_FLAG_TASK_ID);
    }
}

impl WebTaskHandler for FetchFlagsTask {
    fn task(&self) -> &WebTask {
        &self.base
    }

    fn task_mut(&mut self) -> &mut WebTask {
        &mut self.base
    }

    fn handle(&mut self, data: &[u8]) {
        let Some(index) = self.current else {
            return;
        };
        match decode_flag(data, self.display_scale) {
            Ok(bitmap) => {
                debug!("Decoded flag {}", self.flags[index].country);
                self.flags[index].bitmap = Some(bitmap);
            }
            Err(e) => warn!("Decoding flag {} failed: {}", self.flags[index].country, e),
        }
    }

    /// Completion of one download, successful or not, starts the next.
    fn tick(&mut self, transport: &dyn Transport) -> bool {
        let Some(response) = self.base.poll(transport) else {
            return false;
        };
        if response.success {
            self.handle(&response.data);
        } else if let Some(index) = self.current {
            warn!(
                "Downloading flag {} failed: {}",
                self.flags[index].country,
                self.base.display_error("fetching flag")
            );
        }

        self.current = None;
        self.download_next(transport);
        true
    }
}

/// Decode a PNG flag and rescale it for the current display scale.
pub fn decode_flag(data: &[u8], display_scale: f32) -> LauncherResult<RgbaImage> {
    let bitmap = image::load_from_memory_with_format(data, ImageFormat::Png)?.to_rgba8();

    let width = scale_dimension(bitmap.width(), display_scale);
    let height = scale_dimension(bitmap.height(), display_scale);
    // at default DPI no rescale is needed
    if width == bitmap.width() && height == bitmap.height() {
        return Ok(bitmap);
    }
    Ok(imageops::resize(&bitmap, width, height, FilterType::Nearest))
}

fn scale_dimension(value: u32, scale: f32) -> u32 {
    ((value as f32 * scale) as u32).max(1)
}

//! Frame sources
//!
//! The physical webcam lives behind [`FrameSource`]; the engine only ever
//! sees RGB frames. A read returning `None` is a miss, counted by the
//! detection runner toward the disconnect threshold.

use std::collections::VecDeque;
use std::path::Path;

use image::RgbImage;

use crate::Result;

/// Source of camera frames
pub trait FrameSource: Send {
    /// Frame dimensions in pixels
    fn dimensions(&self) -> (u32, u32);

    /// Read the next frame. `None` is a read miss.
    fn read(&mut self) -> Option<RgbImage>;
}

/// Replays a fixed sequence of frames, then misses forever.
///
/// `None` entries simulate read misses mid-sequence; tests use them to drive
/// the disconnect threshold.
pub struct FrameSequence {
    frames: VecDeque<Option<RgbImage>>,
    dimensions: (u32, u32),
    loop_playback: bool,
}

impl FrameSequence {
    pub fn new(dimensions: (u32, u32), frames: Vec<Option<RgbImage>>) -> Self {
        Self {
            frames: frames.into(),
            dimensions,
            loop_playback: false,
        }
    }

    /// Replay the sequence forever instead of running dry
    pub fn looped(mut self) -> Self {
        self.loop_playback = true;
        self
    }

    /// Load every image in a directory, sorted by file name
    pub fn from_directory(dir: &Path) -> Result<Self> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut frames = Vec::new();
        let mut dimensions = (0, 0);

        for path in paths {
            match image::open(&path) {
                Ok(img) => {
                    let rgb = img.to_rgb8();
                    dimensions = (rgb.width(), rgb.height());
                    frames.push(Some(rgb));
                }
                Err(e) => {
                    log::warn!("Skipping unreadable frame {}: {}", path.display(), e);
                }
            }
        }

        Ok(Self {
            frames: frames.into(),
            dimensions,
            loop_playback: false,
        })
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for FrameSequence {
    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn read(&mut self) -> Option<RgbImage> {
        let frame = self.frames.pop_front()?;

        if self.loop_playback {
            self.frames.push_back(frame.clone());
        }

        frame
    }
}

//! Accumulation of event frames into a persistent grayscale image.
//!
//! The accumulator is the only state shared between the decode thread
//! (writer) and the emit timer thread (reader); a single mutex covers
//! both paths. Writes are O(1) per event; the timer's snapshot-and-reset
//! holds the lock for O(width x height), acceptable at sensor resolution.

use crate::types::{EventFrame, ImageSnapshot};
use std::sync::{Mutex, PoisonError};

/// Counter change per event.
pub const ACCUMULATION_STEP: u8 = 40;

/// Neutral gray the image is reset to.
pub const NEUTRAL_LEVEL: u8 = 128;

#[derive(Debug)]
struct Grid {
    pixels: Vec<u8>,
    width: usize,
    height: usize,
}

/// Mutex-protected saturating-counter image.
///
/// ON events brighten a pixel by [`ACCUMULATION_STEP`] saturating at 255,
/// OFF events darken it saturating at 0. The periodic trigger copies the
/// grid out and resets every cell to [`NEUTRAL_LEVEL`] under the same
/// lock, so a snapshot never interleaves with a partially applied frame.
#[derive(Debug)]
pub struct ImageAccumulator {
    grid: Mutex<Grid>,
}

impl ImageAccumulator {
    /// Creates an accumulator at the given dimensions, filled with neutral
    /// gray. An event's `x` selects the row (0..height) and `y` the column
    /// (0..width); events outside the grid are ignored.
    pub fn new(width: u32, height: u32) -> Self {
        let n = width as usize * height as usize;
        Self {
            grid: Mutex::new(Grid {
                pixels: vec![NEUTRAL_LEVEL; n],
                width: width as usize,
                height: height as usize,
            }),
        }
    }

    /// Merges one frame into the image under the lock.
    pub fn apply(&self, frame: &EventFrame) {
        let mut grid = self.grid.lock().unwrap_or_else(PoisonError::into_inner);
        let (width, height) = (grid.width, grid.height);

        for &(x, y) in &frame.on_events {
            let (x, y) = (x as usize, y as usize);
            if x < height && y < width {
                let px = &mut grid.pixels[x * width + y];
                *px = px.saturating_add(ACCUMULATION_STEP);
            }
        }
        for &(x, y) in &frame.off_events {
            let (x, y) = (x as usize, y as usize);
            if x < height && y < width {
                let px = &mut grid.pixels[x * width + y];
                *px = px.saturating_sub(ACCUMULATION_STEP);
            }
        }
    }

    /// Copies the image out and resets every cell to neutral, atomically
    /// with respect to concurrent `apply` calls.
    pub fn snapshot_and_reset(&self) -> ImageSnapshot {
        let mut grid = self.grid.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = ImageSnapshot {
            width: grid.width as u32,
            height: grid.height as u32,
            pixels: grid.pixels.clone(),
        };
        grid.pixels.fill(NEUTRAL_LEVEL);
        snapshot
    }
}

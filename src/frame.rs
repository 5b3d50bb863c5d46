//! Decoded video frames and preview slot geometry.
//!
//! - `Frame`: one decoded RGB picture plus its sequence number within a session.
//! - `SlotSize`: the pixel size a frame is scaled to before it reaches a preview.
//!
//! Frames are never written anywhere except through the snapshot path.

use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Width of a preview tile.
pub const TILE_WIDTH: u32 = 320;
/// Height of a preview tile.
pub const TILE_HEIGHT: u32 = 240;

/// Smallest size an enlarged preview is rendered at.
pub const ENLARGED_MIN_WIDTH: u32 = 640;
pub const ENLARGED_MIN_HEIGHT: u32 = 360;

/// Size of a freshly opened enlarged preview.
pub const ENLARGED_DEFAULT_WIDTH: u32 = 960;
pub const ENLARGED_DEFAULT_HEIGHT: u32 = 540;

/// A decoded RGB frame.
#[derive(Clone, Debug)]
pub struct Frame {
    image: RgbImage,
    /// Position of this frame in the stream it was read from (1-based).
    pub sequence: u64,
}

impl Frame {
    pub fn new(image: RgbImage, sequence: u64) -> Self {
        Self { image, sequence }
    }

    /// Build a frame from tightly packed RGB bytes.
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>, sequence: u64) -> Result<Self> {
        let expected = (width as usize) * (height as usize) * 3;
        if pixels.len() != expected {
            return Err(anyhow!(
                "rgb buffer is {} bytes, expected {} for {}x{}",
                pixels.len(),
                expected,
                width,
                height
            ));
        }
        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("rgb buffer does not fit {}x{}", width, height))?;
        Ok(Self::new(image, sequence))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Scale to `size`. Frames that already match are returned as-is.
    pub fn scaled(self, size: SlotSize) -> Frame {
        if self.width() == size.width && self.height() == size.height {
            return self;
        }
        let image = imageops::resize(&self.image, size.width, size.height, FilterType::Triangle);
        Frame {
            image,
            sequence: self.sequence,
        }
    }
}

/// Target pixel size of a preview slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotSize {
    pub width: u32,
    pub height: u32,
}

impl SlotSize {
    pub const fn tile() -> Self {
        Self {
            width: TILE_WIDTH,
            height: TILE_HEIGHT,
        }
    }

    /// Enlarged previews follow the requested size but never shrink below the minimum.
    pub fn enlarged(requested: Option<(u32, u32)>) -> Self {
        let (width, height) =
            requested.unwrap_or((ENLARGED_DEFAULT_WIDTH, ENLARGED_DEFAULT_HEIGHT));
        Self {
            width: width.max(ENLARGED_MIN_WIDTH),
            height: height.max(ENLARGED_MIN_HEIGHT),
        }
    }
}

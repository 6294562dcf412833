//! CPU-side images.
//!
//! Decoding is probed by content (PNG, JPEG, BMP, TGA) and preserves the
//! source's channel count: grayscale stays 1 channel, grayscale+alpha 2,
//! RGB 3, RGBA 4 — the same order textures expect.

use std::path::Path;

use image::{ColorType, DynamicImage};

use crate::{Error, Result};

/// A decoded image: dimensions plus an owned pixel buffer.
#[derive(Debug, Clone)]
pub struct Image {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Color channels, 1..=4.
    pub channels: u8,
    /// Row-major pixel bytes, `width * height * channels` long.
    pub pixels: Vec<u8>,
}

impl Image {
    /// Decode an image file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let decoded = image::ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|error| {
                tracing::warn!(file = %path.display(), %error, "image decode failed");
                error
            })?;

        Ok(Self::from_dynamic(decoded))
    }

    /// Decode an image from an in-memory buffer.
    pub fn from_bytes(name: &str, data: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(data).map_err(|error| {
            tracing::warn!(source = name, %error, "image decode failed");
            error
        })?;

        Ok(Self::from_dynamic(decoded))
    }

    /// Create an image filled with zero bytes.
    pub fn blank(width: u32, height: u32, channels: u8) -> Result<Self> {
        if width == 0 || height == 0 || !(1..=4).contains(&channels) {
            return Err(Error::BadDimensions { width, height, channels });
        }

        Ok(Self {
            width,
            height,
            channels,
            pixels: vec![0; width as usize * height as usize * channels as usize],
        })
    }

    fn from_dynamic(decoded: DynamicImage) -> Self {
        let width = decoded.width();
        let height = decoded.height();

        // Keep the source's channel count rather than widening to RGBA.
        let (channels, pixels) = match decoded.color() {
            ColorType::L8 | ColorType::L16 => (1, decoded.to_luma8().into_raw()),
            ColorType::La8 | ColorType::La16 => (2, decoded.to_luma_alpha8().into_raw()),
            ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => {
                (3, decoded.to_rgb8().into_raw())
            }
            _ => (4, decoded.to_rgba8().into_raw()),
        };

        Self {
            width,
            height,
            channels,
            pixels,
        }
    }
}

//! Cover art decoding and export
//!
//! The server sends cover art as raw encoded image bytes (usually JPEG) with
//! no framing or content type. Decoding validates the data and records the
//! dimensions; the encoded bytes are kept so the image can be saved or
//! retained across sessions without re-encoding.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// JPEG quality used when exporting a resized cover
const JPEG_QUALITY: u8 = 85;

/// Decoded cover art for the current track
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverImage {
    width: u32,
    height: u32,
    encoded: Vec<u8>,
}

impl CoverImage {
    /// Decode cover art bytes as received from the server
    pub fn decode(data: &[u8]) -> Result<Self> {
        let img = load(data)?;
        debug!(
            "Decoded cover art: {}x{} ({} bytes)",
            img.width(),
            img.height(),
            data.len()
        );

        Ok(Self {
            width: img.width(),
            height: img.height(),
            encoded: data.to_vec(),
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// File extension matching the encoded format
    pub fn extension(&self) -> &'static str {
        image::guess_format(&self.encoded)
            .ok()
            .and_then(|format| format.extensions_str().first().copied())
            .unwrap_or("jpg")
    }

    /// Write the cover to `path`, downscaling to `max_size` pixels if given
    ///
    /// Resized covers are re-encoded as JPEG; otherwise the original bytes
    /// are written unchanged.
    pub fn save(&self, path: &Path, max_size: Option<u32>) -> Result<()> {
        let data = match max_size {
            Some(max) if self.width > max || self.height > max => {
                let img = resize_to_fit(load(&self.encoded)?, max);
                let mut output = Vec::new();
                JpegEncoder::new_with_quality(&mut output, JPEG_QUALITY)
                    .encode_image(&img.to_rgb8())
                    .context("Failed to encode cover art as JPEG")?;
                output
            }
            _ => self.encoded.clone(),
        };

        std::fs::write(path, &data)
            .with_context(|| format!("Failed to write cover art to {}", path.display()))?;
        debug!("Wrote cover art: {} ({} bytes)", path.display(), data.len());
        Ok(())
    }
}

impl fmt::Debug for CoverImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoverImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.encoded.len())
            .finish()
    }
}

fn load(data: &[u8]) -> Result<DynamicImage> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .context("Failed to guess image format")?
        .decode()
        .context("Failed to decode cover art")
}

/// Resize image to fit within `max` pixels while maintaining aspect ratio
fn resize_to_fit(img: DynamicImage, max: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());

    if width <= max && height <= max {
        return img;
    }

    let (new_width, new_height) = if width > height {
        let ratio = max as f64 / width as f64;
        (max, ((height as f64 * ratio) as u32).max(1))
    } else {
        let ratio = max as f64 / height as f64;
        (((width as f64 * ratio) as u32).max(1), max)
    };

    debug!(
        "Resizing cover art: {}x{} -> {}x{}",
        width, height, new_width, new_height
    );

    img.resize(new_width, new_height, FilterType::Lanczos3)
}

/// Encode a blank PNG, used by tests that need real image bytes
#[cfg(test)]
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::new();
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut Cursor::new(&mut data), image::ImageFormat::Png)
        .unwrap();
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_records_dimensions() {
        let cover = CoverImage::decode(&sample_png(40, 30)).unwrap();
        assert_eq!(cover.dimensions(), (40, 30));
        assert_eq!(cover.extension(), "png");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(CoverImage::decode(b"not an image").is_err());
        assert!(CoverImage::decode(&[]).is_err());
    }

    #[test]
    fn test_resize_small_image() {
        let img = DynamicImage::new_rgb8(100, 100);
        let resized = resize_to_fit(img, 300);
        assert_eq!(resized.width(), 100);
        assert_eq!(resized.height(), 100);
    }

    #[test]
    fn test_resize_large_image() {
        let img = DynamicImage::new_rgb8(1500, 1000);
        let resized = resize_to_fit(img, 300);
        assert_eq!(resized.width(), 300);
        assert!(resized.height() <= 300);
    }

    #[test]
    fn test_save_resized_cover() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.jpg");

        let cover = CoverImage::decode(&sample_png(600, 400)).unwrap();
        cover.save(&path, Some(150)).unwrap();

        let saved = CoverImage::decode(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(saved.dimensions(), (150, 100));
        assert_eq!(saved.extension(), "jpg");
    }

    #[test]
    fn test_save_keeps_original_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.png");
        let data = sample_png(20, 20);

        CoverImage::decode(&data).unwrap().save(&path, Some(300)).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), data);
    }
}

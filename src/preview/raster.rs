//! Static raster decoding and width scaling.

use std::io::Cursor;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::codecs::gif::GifDecoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, GenericImageView, ImageFormat, RgbaImage};
use tracing::debug;

/// Decode any supported raster file. GIFs yield their first frame.
pub fn open_image(path: &Path) -> Result<DynamicImage> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read image: {:?}", path))?;
    decode_image(&bytes).with_context(|| format!("Failed to decode image: {:?}", path))
}

pub(crate) fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    let format = image::guess_format(bytes).ok();

    if format == Some(ImageFormat::Gif) {
        let decoder = GifDecoder::new(Cursor::new(bytes)).context("Failed to decode GIF")?;
        let frame = decoder
            .into_frames()
            .next()
            .ok_or_else(|| anyhow!("GIF has no frames"))?
            .context("Failed to decode GIF frame")?;
        return Ok(DynamicImage::ImageRgba8(frame.into_buffer()));
    }

    match format {
        Some(fmt) => Ok(image::load_from_memory_with_format(bytes, fmt)?),
        None => Ok(image::load_from_memory(bytes)?),
    }
}

/// Decode `path` and scale it to exactly `target_width`, keeping the aspect
/// ratio.
pub fn load_scaled(path: &Path, target_width: u32) -> Result<RgbaImage> {
    let img = open_image(path)?;
    let scaled = scale_to_width(&img, target_width);
    debug!(
        ?path,
        src_width = img.width(),
        width = scaled.width(),
        height = scaled.height(),
        "Scaled preview image"
    );
    Ok(scaled)
}

pub fn scale_to_width(img: &DynamicImage, target_width: u32) -> RgbaImage {
    let (width, height) = img.dimensions();
    let target_width = target_width.max(1);
    if width == target_width {
        return img.to_rgba8();
    }
    let target_height = scaled_height(width, height, target_width);
    img.resize_exact(target_width, target_height, FilterType::CatmullRom)
        .to_rgba8()
}

/// Like [`scale_to_width`] but never enlarges.
pub fn fit_width(img: RgbaImage, max_width: u32) -> RgbaImage {
    if img.width() <= max_width.max(1) {
        return img;
    }
    scale_to_width(&DynamicImage::ImageRgba8(img), max_width)
}

fn scaled_height(src_width: u32, src_height: u32, target_width: u32) -> u32 {
    if src_width == 0 {
        return src_height.max(1);
    }
    let height = (src_height as f64 * target_width as f64 / src_width as f64).round() as u32;
    height.max(1)
}

use super::types::ImageFormat;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat as Codec};
use std::io::Cursor;

/// Longest side, in pixels, of an attached image.
pub const MAX_DIMENSION: u32 = 1_024;

/// JPEG quality for re-encoded opaque images.
pub const JPEG_QUALITY: u8 = 75;

/// An image after downscaling and re-encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compressed {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

/// Shrink an image for the payload.
///
/// Images wider or taller than [`MAX_DIMENSION`] are scaled down with their
/// aspect ratio kept. The result is JPEG, or PNG when the image has
/// transparent pixels. Returns `None` when the bytes cannot be decoded or
/// re-encoded, and when re-encoding an image that needed no scaling would
/// not make it smaller.
#[must_use]
pub fn compress(data: &[u8], format: ImageFormat) -> Option<Compressed> {
    let decoded = match image::load_from_memory_with_format(data, codec(format)) {
        Ok(decoded) => decoded,
        Err(err) => {
            tracing::debug!(%format, error = %err, "image not decodable; keeping original bytes");
            return None;
        }
    };

    let (width, height) = decoded.dimensions();
    let oversized = width.max(height) > MAX_DIMENSION;
    let scaled = if oversized {
        decoded.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Triangle)
    } else {
        decoded
    };

    let (encoded, out_format) = if has_transparency(&scaled) {
        (encode_png(&scaled)?, ImageFormat::Png)
    } else {
        (encode_jpeg(&scaled)?, ImageFormat::Jpeg)
    };
    if !oversized && encoded.len() >= data.len() {
        return None;
    }

    let (width, height) = scaled.dimensions();
    tracing::debug!(
        from = data.len(),
        to = encoded.len(),
        %out_format,
        width,
        height,
        "image compressed"
    );
    Some(Compressed {
        data: encoded,
        format: out_format,
        width,
        height,
    })
}

/// Percentage saved going from `original` to `compressed` bytes.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compression_ratio(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (1.0 - compressed as f64 / original as f64) * 100.0
}

fn codec(format: ImageFormat) -> Codec {
    match format {
        ImageFormat::Png => Codec::Png,
        ImageFormat::Jpeg => Codec::Jpeg,
        ImageFormat::Gif => Codec::Gif,
        ImageFormat::Bmp => Codec::Bmp,
    }
}

fn has_transparency(image: &DynamicImage) -> bool {
    image.color().has_alpha() && image.to_rgba8().pixels().any(|p| p.0[3] < u8::MAX)
}

fn encode_jpeg(image: &DynamicImage) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    if let Err(err) = DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder) {
        tracing::warn!(error = %err, "jpeg encoding failed");
        return None;
    }
    Some(out)
}

fn encode_png(image: &DynamicImage) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    if let Err(err) = image.write_to(&mut Cursor::new(&mut out), Codec::Png) {
        tracing::warn!(error = %err, "png encoding failed");
        return None;
    }
    Some(out)
}

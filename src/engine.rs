use crate::constants::{
    DEFAULT_QUALITY, LIBDEFLATER_HIGH_LEVEL, LIBDEFLATER_LOW_LEVEL, MAX_IMAGE_DIMENSION,
    MAX_QUALITY, MIN_QUALITY, OXIPNG_PRESET, PNG_HIGH_EFFORT_QUALITY, PNG_ZOPFLI_QUALITY,
    ZOPFLI_ITERATIONS,
};
use crate::error::{CompressionError, Result};
use crate::formats::ImageKind;
use crate::registry::Item;
use crate::utils::calculate_compression_ratio;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use oxipng::{Deflaters, Options};
use std::borrow::Cow;
use std::io::Cursor;
use std::num::NonZeroU8;
use std::sync::Arc;

/// Lossy-encoding quality on the user-facing 1..=100 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u8);

impl Quality {
    pub const MAX: Quality = Quality(MAX_QUALITY);

    pub fn new(value: u8) -> Result<Self> {
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&value) {
            return Err(CompressionError::InvalidQuality(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Quality as an encoder fraction in (0, 1]
    pub fn as_fraction(&self) -> f32 {
        f32::from(self.0) / f32::from(MAX_QUALITY)
    }
}

impl Default for Quality {
    fn default() -> Self {
        Quality(DEFAULT_QUALITY)
    }
}

/// Re-encoded image bytes. The MIME type always matches the source's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedImage {
    bytes: Arc<[u8]>,
    mime_type: String,
    width: u32,
    height: u32,
}

impl CompressedImage {
    pub fn new(
        bytes: impl Into<Arc<[u8]>>,
        mime_type: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
            width,
            height,
        }
    }

    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Compresses one item. The item itself is left untouched; the caller
/// records the result.
pub fn compress(item: &Item, quality: Quality) -> Result<CompressedImage> {
    let output = compress_bytes(
        item.original_name(),
        item.original_bytes(),
        item.mime_type(),
        quality,
    )?;
    crate::verbose!(
        "{} {}: {} -> {} bytes ({:.1}%)",
        item.id(),
        item.original_name(),
        item.original_size(),
        output.size(),
        calculate_compression_ratio(item.original_size(), output.size())
    );
    Ok(output)
}

/// Same as [`compress`], on Tokio's blocking pool.
pub async fn compress_async(item: &Item, quality: Quality) -> Result<CompressedImage> {
    let name = item.original_name().to_string();
    let bytes = item.original_bytes().clone();
    let mime_type = item.mime_type().to_string();

    tokio::task::spawn_blocking(move || compress_bytes(&name, &bytes, &mime_type, quality))
        .await?
}

/// Decode `bytes` and re-encode them as `mime_type` at `quality`.
///
/// # Arguments
/// * `name` - Display name used in error messages
/// * `bytes` - Encoded source image
/// * `mime_type` - Type to re-encode as; never changed by compression
/// * `quality` - Lossy-encoding parameter
///
/// # Returns
/// * `Ok(CompressedImage)` - Same pixel dimensions, same MIME type
/// * `Err(CompressionError::Decode)` - Bytes are not a decodable image
/// * `Err(CompressionError::InvalidDimensions)` - Image exceeds `MAX_IMAGE_DIMENSION`
/// * `Err(CompressionError::Encode)` - No encoder for the type, or encoding failed
pub fn compress_bytes(
    name: &str,
    bytes: &[u8],
    mime_type: &str,
    quality: Quality,
) -> Result<CompressedImage> {
    let img = decode_image(name, bytes)?;
    let kind = ImageKind::from_mime(mime_type).ok_or_else(|| {
        CompressionError::Encode(name.to_string(), format!("no encoder for {}", mime_type))
    })?;

    let encoded = encode_image(&img, kind, quality)
        .map_err(|reason| CompressionError::Encode(name.to_string(), reason))?;
    let (width, height) = img.dimensions();

    Ok(CompressedImage::new(encoded, mime_type, width, height))
}

/// Decodes by sniffing the content, the way a browser image element does.
fn decode_image(name: &str, bytes: &[u8]) -> Result<DynamicImage> {
    let decode_error = |reason: String| CompressionError::Decode(name.to_string(), reason);

    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| decode_error(e.to_string()))?
        .decode()
        .map_err(|e| decode_error(e.to_string()))?;

    let (width, height) = img.dimensions();
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(CompressionError::InvalidDimensions(
            width,
            height,
            MAX_IMAGE_DIMENSION,
        ));
    }

    Ok(img)
}

fn encode_image(
    img: &DynamicImage,
    kind: ImageKind,
    quality: Quality,
) -> std::result::Result<Vec<u8>, String> {
    let mut buffer = Vec::new();

    match kind {
        ImageKind::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.value());
            rgb.write_with_encoder(encoder).map_err(|e| e.to_string())?;
        }
        ImageKind::Png => {
            png_compatible(img)
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
                .map_err(|e| e.to_string())?;
            buffer = oxipng::optimize_from_memory(&buffer, &png_options(quality))
                .map_err(|e| format!("PNG optimization failed: {}", e))?;
        }
        ImageKind::WebP => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            let encoder = WebPEncoder::new_lossless(&mut buffer);
            rgba.write_with_encoder(encoder).map_err(|e| e.to_string())?;
        }
        ImageKind::Gif | ImageKind::Bmp | ImageKind::Tiff => {
            DynamicImage::ImageRgba8(img.to_rgba8())
                .write_to(&mut Cursor::new(&mut buffer), kind.to_image_format())
                .map_err(|e| e.to_string())?;
        }
    }

    Ok(buffer)
}

/// PNG stores 8 and 16 bit samples only
fn png_compatible(img: &DynamicImage) -> Cow<'_, DynamicImage> {
    match img {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            Cow::Owned(DynamicImage::ImageRgba16(img.to_rgba16()))
        }
        _ => Cow::Borrowed(img),
    }
}

/// oxipng settings; higher quality spends more effort on deflate.
fn png_options(quality: Quality) -> Options {
    let mut options = Options::from_preset(OXIPNG_PRESET);
    options.deflate = if quality.value() >= PNG_ZOPFLI_QUALITY {
        Deflaters::Zopfli {
            iterations: NonZeroU8::new(ZOPFLI_ITERATIONS).unwrap_or(NonZeroU8::MIN),
        }
    } else if quality.value() >= PNG_HIGH_EFFORT_QUALITY {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_HIGH_LEVEL,
        }
    } else {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_LOW_LEVEL,
        }
    };
    options
}

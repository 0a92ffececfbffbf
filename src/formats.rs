//! MIME-type based image format handling
//!
//! Items carry the MIME type declared by their source. Compression never
//! changes it, so every encoder decision is keyed off this mapping.

use crate::constants::FALLBACK_MIME_TYPE;
use image::ImageFormat;
use std::fmt;
use std::path::Path;

/// Image formats the engine can re-encode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    /// Lossy, quality drives the encoder directly
    Jpeg,
    /// Lossless, quality picks the optimiser effort
    Png,
    /// Lossless WebP
    WebP,
    Gif,
    Bmp,
    Tiff,
}

impl ImageKind {
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageKind::Jpeg),
            "image/png" | "image/x-png" => Some(ImageKind::Png),
            "image/webp" => Some(ImageKind::WebP),
            "image/gif" => Some(ImageKind::Gif),
            "image/bmp" | "image/x-ms-bmp" => Some(ImageKind::Bmp),
            "image/tiff" => Some(ImageKind::Tiff),
            _ => None,
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            "webp" => Some(ImageKind::WebP),
            "gif" => Some(ImageKind::Gif),
            "bmp" => Some(ImageKind::Bmp),
            "tif" | "tiff" => Some(ImageKind::Tiff),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::WebP => "webp",
            ImageKind::Gif => "gif",
            ImageKind::Bmp => "bmp",
            ImageKind::Tiff => "tiff",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::WebP => "image/webp",
            ImageKind::Gif => "image/gif",
            ImageKind::Bmp => "image/bmp",
            ImageKind::Tiff => "image/tiff",
        }
    }

    /// Convert to the image crate's ImageFormat
    pub fn to_image_format(&self) -> ImageFormat {
        match self {
            ImageKind::Jpeg => ImageFormat::Jpeg,
            ImageKind::Png => ImageFormat::Png,
            ImageKind::WebP => ImageFormat::WebP,
            ImageKind::Gif => ImageFormat::Gif,
            ImageKind::Bmp => ImageFormat::Bmp,
            ImageKind::Tiff => ImageFormat::Tiff,
        }
    }

    /// Whether the quality parameter trades fidelity for size
    pub fn is_lossy(&self) -> bool {
        matches!(self, ImageKind::Jpeg)
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageKind::Jpeg => "JPEG",
            ImageKind::Png => "PNG",
            ImageKind::WebP => "WebP",
            ImageKind::Gif => "GIF",
            ImageKind::Bmp => "BMP",
            ImageKind::Tiff => "TIFF",
        };
        write!(f, "{}", name)
    }
}

/// MIME type a file would be declared with, judged by its extension
pub fn mime_for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageKind::from_extension)
        .map(|kind| kind.mime_type())
        .unwrap_or(FALLBACK_MIME_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mime() {
        assert_eq!(ImageKind::from_mime("image/jpeg"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_mime("IMAGE/PNG"), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_mime("image/webp; q=1"), Some(ImageKind::WebP));
        assert_eq!(ImageKind::from_mime("image/svg+xml"), None);
        assert_eq!(ImageKind::from_mime(""), None);
    }

    #[test]
    fn test_extension_round_trips_through_mime() {
        for ext in ["jpg", "png", "webp", "gif", "bmp", "tiff"] {
            let kind = ImageKind::from_extension(ext).unwrap();
            assert_eq!(kind.extension(), ext);
            assert_eq!(ImageKind::from_mime(kind.mime_type()), Some(kind));
        }
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("photo.JPEG")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("scan.tif")), "image/tiff");
        assert_eq!(mime_for_path(Path::new("notes.txt")), FALLBACK_MIME_TYPE);
        assert_eq!(mime_for_path(Path::new("README")), FALLBACK_MIME_TYPE);
    }

    #[test]
    fn test_only_jpeg_is_lossy() {
        assert!(ImageKind::Jpeg.is_lossy());
        assert!(!ImageKind::Png.is_lossy());
        assert!(!ImageKind::WebP.is_lossy());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ImageKind::Jpeg), "JPEG");
        assert_eq!(format!("{}", ImageKind::WebP), "WebP");
    }
}

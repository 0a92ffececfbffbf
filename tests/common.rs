#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A noisy gradient, so lossy encoders have something to throw away
pub fn test_image(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let noise = (x.wrapping_mul(31) ^ y.wrapping_mul(17)) % 64;
        Rgb([
            ((x * 255 / width.max(1)) as u8).wrapping_add(noise as u8),
            ((y * 255 / height.max(1)) as u8).wrapping_add(noise as u8),
            (((x + y) % 256) as u8).wrapping_sub(noise as u8),
        ])
    });
    DynamicImage::ImageRgb8(img)
}

pub fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
    bytes
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&test_image(width, height), ImageFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(&test_image(width, height), ImageFormat::Jpeg)
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    File::create(&path).unwrap().write_all(bytes).unwrap();
    path
}

/// Directory with two real images and one text file
pub fn create_test_image_files(temp_dir: &Path) -> Vec<PathBuf> {
    vec![
        write_file(temp_dir, "a.png", &png_bytes(40, 30)),
        write_file(temp_dir, "b.jpg", &jpeg_bytes(64, 64)),
        write_file(temp_dir, "notes.txt", b"not an image"),
    ]
}

pub fn create_temp_directory() -> TempDir {
    TempDir::new().unwrap()
}

//! Test fixtures: real encoded images built with the `image` crate.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), format)
        .expect("Failed to encode fixture");
    buffer
}

/// Gradient photo, no light pixels.
pub fn photo(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 200) as u8, (y % 200) as u8, 100])
    }))
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(&photo(width, height), ImageFormat::Jpeg)
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    encode(&photo(width, height), ImageFormat::Png)
}

/// White background with a dark square in the middle, as JPEG.
pub fn logo_jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    for y in height / 4..height * 3 / 4 {
        for x in width / 4..width * 3 / 4 {
            img.put_pixel(x, y, Rgb([20, 20, 120]));
        }
    }
    encode(&DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

/// PNG signature followed by garbage.
pub fn corrupt_png() -> Vec<u8> {
    let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(b"this is not a real png chunk stream");
    data
}

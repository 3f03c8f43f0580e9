//! Transparent background via a luminance mask.
//!
//! Light pixels (luma at or above [`LUMINANCE_THRESHOLD`]) are treated as
//! background. The threshold is hard, so light foreground pixels are removed
//! too and edges are not anti-aliased.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage, RgbaImage};

/// Luma at or above this value counts as background
pub const LUMINANCE_THRESHOLD: u8 = 240;

/// Single-channel mask buffer: 255 keeps a pixel, 0 clears it
#[derive(Debug, Clone)]
pub struct TransparencyMask {
    mask: GrayImage,
}

impl TransparencyMask {
    /// Build the mask from a source image: luma, threshold, invert.
    pub fn from_image(img: &DynamicImage) -> Self {
        let mut mask = img.to_luma8();
        for pixel in mask.pixels_mut() {
            pixel.0[0] = if pixel.0[0] >= LUMINANCE_THRESHOLD {
                255
            } else {
                0
            };
        }
        imageops::invert(&mut mask);
        Self { mask }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.mask.dimensions()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.mask
    }

    /// Scale to the given size with nearest-neighbour sampling so the mask stays binary.
    pub fn resized(self, width: u32, height: u32) -> Self {
        if self.mask.dimensions() == (width, height) {
            return self;
        }
        Self {
            mask: imageops::resize(&self.mask, width, height, FilterType::Nearest),
        }
    }

    /// Composite `img` against the mask with destination-in semantics:
    /// `alpha = alpha * mask / 255`. The mask is rescaled if the sizes differ.
    pub fn apply_destination_in(&self, img: &DynamicImage) -> RgbaImage {
        let (width, height) = img.dimensions();
        let scaled;
        let mask = if self.mask.dimensions() == (width, height) {
            &self.mask
        } else {
            scaled = imageops::resize(&self.mask, width, height, FilterType::Nearest);
            &scaled
        };

        let mut rgba = img.to_rgba8();
        for (pixel, mask_pixel) in rgba.pixels_mut().zip(mask.pixels()) {
            let alpha = pixel.0[3] as u16 * mask_pixel.0[0] as u16;
            pixel.0[3] = ((alpha + 127) / 255) as u8;
        }
        rgba
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage, Rgba};

    /// White canvas with a dark square in the middle
    fn logo(width: u32, height: u32) -> DynamicImage {
        let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        for y in height / 4..height * 3 / 4 {
            for x in width / 4..width * 3 / 4 {
                img.put_pixel(x, y, Rgb([20, 40, 200]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_mask_is_binary_and_inverted() {
        let mask = TransparencyMask::from_image(&logo(40, 40));
        assert_eq!(mask.as_gray().get_pixel(0, 0), &Luma([0]));
        assert_eq!(mask.as_gray().get_pixel(20, 20), &Luma([255]));
        assert!(mask
            .as_gray()
            .pixels()
            .all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn test_threshold_boundary() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(3, 1, |x, _| {
            Luma([[239u8, 240, 241][x as usize]])
        }));
        let mask = TransparencyMask::from_image(&img);
        assert_eq!(mask.as_gray().get_pixel(0, 0), &Luma([255]));
        assert_eq!(mask.as_gray().get_pixel(1, 0), &Luma([0]));
        assert_eq!(mask.as_gray().get_pixel(2, 0), &Luma([0]));
    }

    #[test]
    fn test_destination_in_clears_background() {
        let img = logo(40, 40);
        let mask = TransparencyMask::from_image(&img);
        let out = mask.apply_destination_in(&img);
        assert_eq!(out.get_pixel(0, 0).0[3], 0);
        assert_eq!(out.get_pixel(20, 20), &Rgba([20, 40, 200, 255]));
    }

    #[test]
    fn test_mask_follows_output_resolution() {
        let original = logo(80, 60);
        let mask = TransparencyMask::from_image(&original).resized(40, 30);
        assert_eq!(mask.dimensions(), (40, 30));
        assert!(mask
            .as_gray()
            .pixels()
            .all(|p| p.0[0] == 0 || p.0[0] == 255));

        let resized = original.resize_exact(40, 30, FilterType::Nearest);
        let out = mask.apply_destination_in(&resized);
        assert_eq!(out.dimensions(), (40, 30));
        assert_eq!(out.get_pixel(0, 0).0[3], 0);
        assert_eq!(out.get_pixel(20, 15).0[3], 255);
    }

    #[test]
    fn test_existing_alpha_is_multiplied() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 128])));
        let mask = TransparencyMask::from_image(&img);
        let out = mask.apply_destination_in(&img);
        assert_eq!(out.get_pixel(1, 1).0[3], 128);
    }
}

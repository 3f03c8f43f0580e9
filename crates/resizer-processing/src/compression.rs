use anyhow::{anyhow, Result};
use bytes::Bytes;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::{DynamicImage, Frame, GenericImageView};
use resizer_core::OutputFormat;

/// Speed for the GIF palette quantizer (1 = best, 30 = fastest)
const GIF_QUANTIZER_SPEED: i32 = 10;

/// Per-format encoder settings derived from the request quality
pub struct ImageCompressor;

impl ImageCompressor {
    /// Encode `img` as `format`.
    ///
    /// Quality drives the lossy jpeg/webp encoders and the png compression
    /// effort. It is ignored for gif.
    pub fn compress(img: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Bytes> {
        match format {
            OutputFormat::Jpeg => Self::compress_jpeg(img, quality),
            OutputFormat::Png => Self::compress_png(img, quality),
            OutputFormat::WebP => Self::compress_webp(img, quality),
            OutputFormat::Gif => Self::compress_gif(img),
        }
    }

    /// PNG is lossless; higher quality spends more effort on compression.
    pub fn png_compression(quality: u8) -> CompressionType {
        match quality {
            0..=33 => CompressionType::Fast,
            34..=66 => CompressionType::Default,
            _ => CompressionType::Best,
        }
    }

    fn compress_jpeg(img: &DynamicImage, quality: u8) -> Result<Bytes> {
        let rgb_img = img.to_rgb8();
        let mut buffer = Vec::new();

        // The jpeg encoder rejects quality 0.
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        encoder.encode_image(&rgb_img)?;

        Ok(Bytes::from(buffer))
    }

    fn compress_png(img: &DynamicImage, quality: u8) -> Result<Bytes> {
        let mut buffer = Vec::new();
        let encoder = PngEncoder::new_with_quality(
            &mut buffer,
            Self::png_compression(quality),
            PngFilterType::Adaptive,
        );
        img.write_with_encoder(encoder)?;

        Ok(Bytes::from(buffer))
    }

    fn compress_webp(img: &DynamicImage, quality: u8) -> Result<Bytes> {
        let (width, height) = img.dimensions();
        let quality = quality.min(100) as f32;

        let webp_data = if img.color().has_alpha() {
            let rgba_img = img.to_rgba8();
            let encoded = webp::Encoder::from_rgba(&rgba_img, width, height)
                .encode_simple(false, quality);
            encoded
        } else {
            let rgb_img = img.to_rgb8();
            let encoded =
                webp::Encoder::from_rgb(&rgb_img, width, height).encode_simple(false, quality);
            encoded
        }
        .map_err(|e| anyhow!("WebP encoding failed: {:?}", e))?;

        Ok(Bytes::copy_from_slice(&webp_data))
    }

    fn compress_gif(img: &DynamicImage) -> Result<Bytes> {
        let rgba_img = img.to_rgba8();
        let mut buffer = Vec::new();
        {
            let mut encoder = GifEncoder::new_with_speed(&mut buffer, GIF_QUANTIZER_SPEED);
            encoder.encode_frame(Frame::new(rgba_img))?;
        }

        Ok(Bytes::from(buffer))
    }
}

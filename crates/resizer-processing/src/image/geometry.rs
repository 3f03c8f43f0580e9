use image::{imageops::FilterType, DynamicImage, GenericImageView};
use resizer_core::OriginalDimensions;

/// How the output box relates to the source aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitPolicy {
    /// Preserve aspect ratio, fit inside the requested box, never enlarge
    Inside,
    /// Stretch to exactly the requested box
    Fill,
}

/// Requested output dimensions; either side may be absent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeDimensions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ResizeDimensions {
    pub fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }
}

/// Final output geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedGeometry {
    pub width: u32,
    pub height: u32,
    pub fit: FitPolicy,
}

/// `round(a * b / c)` with halves rounded away from zero, clamped to `1..=u32::MAX`.
fn scale_rounded(a: u32, b: u32, c: u32) -> u32 {
    let (a, b, c) = (a as u64, b as u64, c.max(1) as u64);
    let value = (2 * a * b + c) / (2 * c);
    value.clamp(1, u32::MAX as u64) as u32
}

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Compute the output size for a request.
    ///
    /// With `maintain_aspect_ratio` the result fits inside the requested box
    /// and never exceeds the original; without it missing sides fall back to
    /// the original and the image is stretched.
    pub fn resolve(
        original: OriginalDimensions,
        requested: ResizeDimensions,
        maintain_aspect_ratio: bool,
    ) -> ResolvedGeometry {
        let (ow, oh) = (original.width.max(1), original.height.max(1));
        let fit = if maintain_aspect_ratio {
            FitPolicy::Inside
        } else {
            FitPolicy::Fill
        };

        if requested.is_empty() {
            return ResolvedGeometry {
                width: ow,
                height: oh,
                fit,
            };
        }

        let (width, height) = match fit {
            FitPolicy::Fill => (
                requested.width.unwrap_or(ow).max(1),
                requested.height.unwrap_or(oh).max(1),
            ),
            FitPolicy::Inside => {
                let (width, height) = match (requested.width, requested.height) {
                    (Some(w), None) => (w.max(1), scale_rounded(w, oh, ow)),
                    (None, Some(h)) => (scale_rounded(h, ow, oh), h.max(1)),
                    (Some(w), Some(h)) => {
                        // The tighter side wins; compare w/ow against h/oh without division.
                        if (w as u64) * (oh as u64) <= (h as u64) * (ow as u64) {
                            (w.max(1), scale_rounded(w, oh, ow))
                        } else {
                            (scale_rounded(h, ow, oh), h.max(1))
                        }
                    }
                    (None, None) => (ow, oh),
                };

                if width > ow || height > oh {
                    (ow, oh)
                } else {
                    (width, height)
                }
            }
        };

        ResolvedGeometry { width, height, fit }
    }

    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> FilterType {
        let width_ratio = orig_width as f32 / new_width.max(1) as f32;
        let height_ratio = orig_height as f32 / new_height.max(1) as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            FilterType::Triangle
        } else if max_ratio > 1.5 {
            FilterType::CatmullRom
        } else {
            FilterType::Lanczos3
        }
    }

    /// Resize to exact dimensions. Returns the input untouched when nothing changes.
    pub fn resize_to(img: DynamicImage, width: u32, height: u32) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        if orig_width == width && orig_height == height {
            return img;
        }
        let filter = Self::select_filter(orig_width, orig_height, width, height);
        img.resize_exact(width, height, filter)
    }
}

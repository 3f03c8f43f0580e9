//! Image operations
//!
//! - Resize geometry and filter selection (geometry)
//! - Luminance-threshold transparency mask (mask)

pub mod geometry;
pub mod mask;

pub use geometry::{FitPolicy, ImageResize, ResizeDimensions, ResolvedGeometry};
pub use mask::TransparencyMask;

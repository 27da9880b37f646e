//! Contains various types needed across the crate.

use crate::{QuantizeError, MAX_DEPTH, MAX_PIXELS};
use palette::Srgb;
use std::{
    fmt::{Display, Formatter},
    ops::Deref,
};
use thiserror::Error;
#[cfg(feature = "image")]
use {image::RgbImage, palette::cast::ComponentsAs};

/// An error type for when the length of an input (e.g., `Vec` or slice)
/// is above the maximum supported value.
///
/// The inner value is the maximum supported value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Error)]
#[error("above the maximum length of {0}")]
pub struct AboveMaxLen(pub u32);

/// A simple new type wrapper around `&'a [Color]` with the invariant that the length of the
/// inner slice must not be greater than [`MAX_PIXELS`].
///
/// # Examples
/// Use `try_into` or [`ColorSlice::from_truncated`] to create [`ColorSlice`]s.
///
/// ```
/// # use octquant::{ColorSlice, AboveMaxLen};
/// # use palette::Srgb;
/// # fn main() -> Result<(), AboveMaxLen> {
/// let srgb = vec![Srgb::new(0, 0, 0)];
/// let colors: ColorSlice<_> = srgb.as_slice().try_into()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct ColorSlice<'a, Color>(&'a [Color]);

impl<'a, Color> Clone for ColorSlice<'a, Color> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, Color> Copy for ColorSlice<'a, Color> {}

impl<'a, Color> ColorSlice<'a, Color> {
    /// Creates a new [`ColorSlice`] by truncating the input slice to a max length of [`MAX_PIXELS`].
    pub fn from_truncated(colors: &'a [Color]) -> Self {
        Self(&colors[..colors.len().min(MAX_PIXELS as usize)])
    }

    /// Returns the length of the slice as a `u32`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn num_colors(&self) -> u32 {
        self.0.len() as u32
    }
}

impl<'a, Color> AsRef<[Color]> for ColorSlice<'a, Color> {
    fn as_ref(&self) -> &[Color] {
        self
    }
}

impl<'a, Color> Deref for ColorSlice<'a, Color> {
    type Target = [Color];

    fn deref(&self) -> &Self::Target {
        self.0
    }
}

impl<'a, Color> TryFrom<&'a [Color]> for ColorSlice<'a, Color> {
    type Error = AboveMaxLen;

    fn try_from(slice: &'a [Color]) -> Result<Self, Self::Error> {
        if slice.len() <= MAX_PIXELS as usize {
            Ok(Self(slice))
        } else {
            Err(AboveMaxLen(MAX_PIXELS))
        }
    }
}

#[cfg(feature = "image")]
impl<'a> TryFrom<&'a RgbImage> for ColorSlice<'a, Srgb<u8>> {
    type Error = AboveMaxLen;

    fn try_from(image: &'a RgbImage) -> Result<Self, Self::Error> {
        let pixels = image.pixels().len();
        if pixels <= MAX_PIXELS as usize {
            let buf = &image.as_raw()[..(pixels * 3)];
            Ok(Self(buf.components_as()))
        } else {
            Err(AboveMaxLen(MAX_PIXELS))
        }
    }
}

/// Whether or not to apply error diffusion dithering when remapping an image.
///
/// Dithering is only performed on images that need the octree
/// (more than [`MAX_COLORS`](crate::MAX_COLORS) distinct colors) and that are at least
/// [`DITHER_MIN_DIMENSION`](crate::DITHER_MIN_DIMENSION) pixels wide or tall.
/// For smaller images, [`Dithering::On`] gives the same result as [`Dithering::Off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dithering {
    /// Diffuse the quantization error to neighboring pixels.
    #[default]
    On,
    /// Map each pixel straight to its octree cell.
    Off,
}

impl From<bool> for Dithering {
    fn from(dither: bool) -> Self {
        if dither {
            Self::On
        } else {
            Self::Off
        }
    }
}

/// The number of levels in the color octree, which is also the number of
/// most significant bits of each channel used to address a color.
///
/// This is a simple new type wrapper around `u8` with the invariant that it must be
/// in the range `1..=6`. Depths `4`, `5`, and `6` are the useful ones in practice,
/// deeper trees give more accurate colors at the cost of memory (`8^depth` cells per level).
///
/// # Examples
/// ```
/// # use octquant::{OctreeDepth, QuantizeError};
/// # fn main() -> Result<(), QuantizeError> {
/// let depth = OctreeDepth::try_from(6)?;
/// assert_eq!(depth, OctreeDepth::SIX);
/// assert!(OctreeDepth::try_from(7).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct OctreeDepth(u8);

impl OctreeDepth {
    /// An octree with 4 levels.
    pub const FOUR: Self = Self(4);
    /// An octree with 5 levels.
    pub const FIVE: Self = Self(5);
    /// An octree with 6 levels, the maximum supported depth.
    pub const SIX: Self = Self(MAX_DEPTH);

    /// Gets the inner `u8` value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for OctreeDepth {
    fn default() -> Self {
        Self::FIVE
    }
}

impl TryFrom<u8> for OctreeDepth {
    type Error = QuantizeError;

    fn try_from(depth: u8) -> Result<Self, Self::Error> {
        if (1..=MAX_DEPTH).contains(&depth) {
            Ok(Self(depth))
        } else {
            Err(QuantizeError::InvalidDepth(depth))
        }
    }
}

impl From<OctreeDepth> for u8 {
    fn from(depth: OctreeDepth) -> Self {
        depth.get()
    }
}

impl Display for OctreeDepth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What to do when the octree needs more palette entries than are available.
///
/// This can only happen for pathological images (e.g., many independent gradients),
/// because a margin of the palette is kept in reserve while pruning the octree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PaletteOverflow {
    /// Give the cell the existing palette color closest to its own color.
    #[default]
    NearestColor,
    /// Fail with [`QuantizeError::PaletteOverflow`].
    Error,
}

/// The output struct returned by quantization functions.
///
/// It contains the color `palette` for the image, alongside `counts` which has
/// the number of pixels assigned to each palette color.
/// `indices` contains an index into `palette` for each pixel in row-major order.
///
/// This is exactly the pair of color table and pixel indices that 8-bit
/// palette-based image formats need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizeOutput<Color> {
    /// The palette colors, in order of palette index.
    ///
    /// This has at most [`MAX_COLORS`](crate::MAX_COLORS) colors.
    pub palette: Vec<Color>,
    /// The number of pixels that were assigned to each color in `palette`.
    ///
    /// Each count is not guaranteed to be non-zero.
    pub counts: Vec<u32>,
    /// The remapped image, where each pixel is replaced with an index into `palette`.
    pub indices: Vec<u8>,
}

impl<Color> Default for QuantizeOutput<Color> {
    fn default() -> Self {
        Self {
            palette: Vec::new(),
            counts: Vec::new(),
            indices: Vec::new(),
        }
    }
}

impl<Color> QuantizeOutput<Color> {
    /// Creates a new [`QuantizeOutput`], tallying the `counts` from `indices`.
    pub(crate) fn new(palette: Vec<Color>, indices: Vec<u8>) -> Self {
        let mut counts = vec![0; palette.len()];
        for &i in &indices {
            counts[usize::from(i)] += 1;
        }
        Self { palette, counts, indices }
    }
}

impl QuantizeOutput<Srgb<u8>> {
    /// Replaces each index with its palette color to get a full color image again.
    ///
    /// The returned pixels are in the same row-major order as `indices`.
    #[must_use]
    pub fn materialize(&self) -> Vec<Srgb<u8>> {
        let palette = self.palette.as_slice();
        self.indices.iter().map(|&i| palette[usize::from(i)]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_bounds() {
        assert_eq!(OctreeDepth::try_from(0), Err(QuantizeError::InvalidDepth(0)));
        assert_eq!(OctreeDepth::try_from(7), Err(QuantizeError::InvalidDepth(7)));
        for depth in 1..=6 {
            assert_eq!(OctreeDepth::try_from(depth).map(OctreeDepth::get), Ok(depth));
        }
        assert_eq!(OctreeDepth::default(), OctreeDepth::FIVE);
    }

    #[test]
    fn counts_match_indices() {
        let palette = vec![Srgb::new(0u8, 0, 0), Srgb::new(255, 255, 255), Srgb::new(9, 9, 9)];
        let output = QuantizeOutput::new(palette, vec![1, 1, 0, 1]);
        assert_eq!(output.counts, vec![1, 3, 0]);
    }

    #[test]
    fn materialize_uses_palette() {
        let black = Srgb::new(0u8, 0, 0);
        let white = Srgb::new(255u8, 255, 255);
        let output = QuantizeOutput::new(vec![black, white], vec![1, 0, 1]);
        assert_eq!(output.materialize(), vec![white, black, white]);
    }
}

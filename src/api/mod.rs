//! Contains the types and functions for the high level API.

mod image_pipeline;

pub use image_pipeline::ImagePipeline;

use crate::{ColorSlice, Dithering, OctreeDepth, QuantizeError, QuantizeOutput};
use palette::Srgb;
#[cfg(feature = "image")]
use {
    image::{RgbImage, RgbaImage},
    palette::{cast, cast::IntoComponents, WithAlpha},
};

/// Validates the arguments of the free functions and creates the corresponding [`ImagePipeline`].
///
/// The depth is checked first, so an invalid depth is rejected before anything is allocated.
fn pipeline(
    colors: &[Srgb<u8>],
    width: u32,
    height: u32,
    dither: Dithering,
    depth: u8,
) -> Result<ImagePipeline<'_>, QuantizeError> {
    let depth = OctreeDepth::try_from(depth)?;
    let colors = ColorSlice::try_from(colors)?;
    let mut pipeline = ImagePipeline::new(colors, width, height)?;
    pipeline.dither(dither).depth(depth);
    Ok(pipeline)
}

/// Quantizes a `width` by `height` image to at most [`MAX_COLORS`](crate::MAX_COLORS) colors.
///
/// `colors` holds the pixels of the image in row-major order and
/// `depth` is the octree depth which must be in `1..=6` (`5` is a good default).
/// Images with at most [`MAX_COLORS`](crate::MAX_COLORS) distinct colors are indexed exactly,
/// with the distinct colors in order of first appearance.
///
/// # Errors
/// Returns an error if `depth` is invalid, if the length of `colors` does not match
/// `width * height`, or if a working buffer could not be allocated.
///
/// # Examples
/// ```
/// # use octquant::{quantized, Dithering, QuantizeError};
/// # use palette::Srgb;
/// # fn main() -> Result<(), QuantizeError> {
/// let pixels = vec![Srgb::new(0, 0, 0), Srgb::new(255, 255, 255), Srgb::new(0, 0, 0)];
/// let output = quantized(&pixels, 3, 1, Dithering::Off, 5)?;
/// assert_eq!(output.palette, vec![Srgb::new(0, 0, 0), Srgb::new(255, 255, 255)]);
/// assert_eq!(output.indices, vec![0, 1, 0]);
/// # Ok(())
/// # }
/// ```
pub fn quantized(
    colors: &[Srgb<u8>],
    width: u32,
    height: u32,
    dither: impl Into<Dithering>,
    depth: u8,
) -> Result<QuantizeOutput<Srgb<u8>>, QuantizeError> {
    pipeline(colors, width, height, dither.into(), depth)?.indexed_palette()
}

/// Quantizes an image in parallel. See [`quantized`] for more details.
///
/// The result is identical to [`quantized`].
///
/// # Errors
/// See [`quantized`].
#[cfg(feature = "threads")]
pub fn quantized_par(
    colors: &[Srgb<u8>],
    width: u32,
    height: u32,
    dither: impl Into<Dithering>,
    depth: u8,
) -> Result<QuantizeOutput<Srgb<u8>>, QuantizeError> {
    pipeline(colors, width, height, dither.into(), depth)?.indexed_palette_par()
}

/// Quantizes an image and returns its pixels with each pixel replaced by its palette color.
///
/// # Errors
/// See [`quantized`].
pub fn quantized_pixels(
    colors: &[Srgb<u8>],
    width: u32,
    height: u32,
    dither: impl Into<Dithering>,
    depth: u8,
) -> Result<Vec<Srgb<u8>>, QuantizeError> {
    Ok(quantized(colors, width, height, dither, depth)?.materialize())
}

/// Quantizes an image in place, replacing each pixel by its palette color.
///
/// `colors` is left untouched if an error is returned.
///
/// # Errors
/// See [`quantized`].
pub fn quantize(
    colors: &mut [Srgb<u8>],
    width: u32,
    height: u32,
    dither: impl Into<Dithering>,
    depth: u8,
) -> Result<(), QuantizeError> {
    let QuantizeOutput { palette, indices, .. } = quantized(colors, width, height, dither, depth)?;
    for (color, &i) in colors.iter_mut().zip(&indices) {
        *color = palette[usize::from(i)];
    }
    Ok(())
}

/// Drops the alpha channel of an image.
#[cfg(feature = "image")]
fn rgb_pixels(image: &RgbaImage) -> Vec<Srgb<u8>> {
    image
        .pixels()
        .map(|&image::Rgba([r, g, b, _])| Srgb::new(r, g, b))
        .collect()
}

/// Quantizes an [`RgbImage`] and returns the quantized image.
///
/// # Errors
/// See [`quantized`].
#[cfg(feature = "image")]
pub fn quantized_rgbimage(
    image: &RgbImage,
    dither: impl Into<Dithering>,
    depth: u8,
) -> Result<RgbImage, QuantizeError> {
    let depth = OctreeDepth::try_from(depth)?;
    ImagePipeline::try_from(image)?
        .dither(dither)
        .depth(depth)
        .quantized_rgbimage()
}

/// Quantizes an [`RgbaImage`] and returns the quantized image.
///
/// The alpha channel is ignored and every pixel of the returned image is fully opaque.
///
/// # Errors
/// See [`quantized`].
#[cfg(feature = "image")]
pub fn quantized_rgbaimage(
    image: &RgbaImage,
    dither: impl Into<Dithering>,
    depth: u8,
) -> Result<RgbaImage, QuantizeError> {
    let (width, height) = image.dimensions();
    let colors = rgb_pixels(image);
    let output = quantized(&colors, width, height, dither, depth)?;

    let len = output.indices.len();
    let palette = output.palette.as_slice();
    let buf = output
        .indices
        .iter()
        .map(|&i| palette[usize::from(i)].with_alpha(u8::MAX))
        .collect::<Vec<_>>()
        .into_components();

    RgbaImage::from_vec(width, height, buf)
        .ok_or(QuantizeError::DimensionMismatch { len, width, height })
}

/// Quantizes an [`RgbImage`] in place.
///
/// # Errors
/// See [`quantized`].
#[cfg(feature = "image")]
pub fn quantize_rgbimage(
    image: &mut RgbImage,
    dither: impl Into<Dithering>,
    depth: u8,
) -> Result<(), QuantizeError> {
    let depth = OctreeDepth::try_from(depth)?;
    let QuantizeOutput { palette, indices, .. } = ImagePipeline::try_from(&*image)?
        .dither(dither)
        .depth(depth)
        .indexed_palette()?;

    for (pixel, &i) in image.pixels_mut().zip(&indices) {
        pixel.0 = cast::into_array(palette[usize::from(i)]);
    }
    Ok(())
}

/// Quantizes an [`RgbaImage`] in place, making every pixel fully opaque.
///
/// # Errors
/// See [`quantized`].
#[cfg(feature = "image")]
pub fn quantize_rgbaimage(
    image: &mut RgbaImage,
    dither: impl Into<Dithering>,
    depth: u8,
) -> Result<(), QuantizeError> {
    let (width, height) = image.dimensions();
    let colors = rgb_pixels(image);
    let QuantizeOutput { palette, indices, .. } =
        quantized(&colors, width, height, dither, depth)?;

    for (pixel, &i) in image.pixels_mut().zip(&indices) {
        pixel.0 = cast::into_array(palette[usize::from(i)].with_alpha(u8::MAX));
    }
    Ok(())
}

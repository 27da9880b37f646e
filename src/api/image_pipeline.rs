//! Contains the [`ImagePipeline`] builder struct for the high level API.

use crate::{
    color_counts::exact_indexed_palette,
    dither,
    octree::{index::ColorIndexer, Octree, PruneOptions},
    ColorSlice, Dithering, OctreeDepth, PaletteOverflow, QuantizeError, QuantizeOutput,
    DITHER_MIN_DIMENSION, MAX_COLORS, MAX_K,
};
use palette::Srgb;
#[cfg(all(feature = "threads", feature = "image"))]
use rayon::prelude::*;
#[cfg(feature = "image")]
use {image::RgbImage, palette::cast::IntoComponents};

/// The number of palette colors held back from the octree's pixel-per-cell budget
/// for residual cells.
const RESERVED_COLORS: u16 = 64;

/// A builder struct to specify options to create a quantized image or an indexed palette from an image.
///
/// # Examples
/// To start, create a [`ImagePipeline`] from a [`RgbImage`] (note that the `image` feature is needed):
/// ```no_run
/// # use octquant::ImagePipeline;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let img = image::open("some image")?.into_rgb8();
/// let mut pipeline = ImagePipeline::try_from(&img)?;
/// # Ok(())
/// # }
/// ```
///
/// Then, you can change different options like the octree depth or the dither behavior:
/// ```
/// # use octquant::{ImagePipeline, OctreeDepth, PaletteOverflow, QuantizeError};
/// # use palette::Srgb;
/// # fn main() -> Result<(), QuantizeError> {
/// # let srgb = vec![Srgb::new(0, 0, 0)];
/// # let mut pipeline = ImagePipeline::new(srgb.as_slice().try_into()?, 1, 1)?;
/// let pipeline = pipeline
///     .depth(OctreeDepth::SIX)
///     .dither(false)
///     .palette_overflow(PaletteOverflow::Error);
/// # Ok(())
/// # }
/// ```
///
/// Finally, run the pipeline:
/// ```no_run
/// # use octquant::{ImagePipeline, QuantizeError};
/// # use palette::Srgb;
/// # fn main() -> Result<(), QuantizeError> {
/// # let srgb = vec![Srgb::new(0, 0, 0)];
/// # let pipeline = ImagePipeline::new(srgb.as_slice().try_into()?, 1, 1)?;
/// let image = pipeline.quantized_rgbimage()?;
/// # Ok(())
/// # }
/// ```
///
/// Or, in parallel across multiple threads (needs the `threads` feature):
/// ```no_run
/// # use octquant::{ImagePipeline, QuantizeError};
/// # use palette::Srgb;
/// # fn main() -> Result<(), QuantizeError> {
/// # let srgb = vec![Srgb::new(0, 0, 0)];
/// # let pipeline = ImagePipeline::new(srgb.as_slice().try_into()?, 1, 1)?;
/// let image = pipeline.quantized_rgbimage_par()?;
/// # Ok(())
/// # }
/// ```
///
/// Instead of an [`RgbImage`] you can also get an indexed image
/// (a palette and a list of indices into the palette):
/// ```
/// # use octquant::{ImagePipeline, QuantizeError};
/// # use palette::Srgb;
/// # fn main() -> Result<(), QuantizeError> {
/// # let srgb = vec![Srgb::new(0, 0, 0)];
/// # let pipeline = ImagePipeline::new(srgb.as_slice().try_into()?, 1, 1)?;
/// let output = pipeline.indexed_palette()?;
/// assert_eq!(output.palette, vec![Srgb::new(0, 0, 0)]);
/// assert_eq!(output.indices, vec![0]);
/// # Ok(())
/// # }
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct ImagePipeline<'a> {
    /// The input image as a flat slice of pixels.
    pub(crate) colors: ColorSlice<'a, Srgb<u8>>,
    /// The dimensions of the image.
    pub(crate) dimensions: (u32, u32),
    /// Whether or not to perform dithering on the image.
    pub(crate) dither: Dithering,
    /// The depth of the color octree.
    pub(crate) depth: OctreeDepth,
    /// What to do if the octree runs out of palette colors.
    pub(crate) palette_overflow: PaletteOverflow,
}

impl<'a> ImagePipeline<'a> {
    /// Creates a new [`ImagePipeline`] with default options
    /// and does not validate the size of the input image/slice.
    fn new_unchecked(colors: ColorSlice<'a, Srgb<u8>>, width: u32, height: u32) -> Self {
        Self {
            colors,
            dimensions: (width, height),
            dither: Dithering::default(),
            depth: OctreeDepth::default(),
            palette_overflow: PaletteOverflow::default(),
        }
    }

    /// Creates a new [`ImagePipeline`] with default options.
    ///
    /// # Errors
    /// Returns [`QuantizeError::DimensionMismatch`] if the length of `colors`
    /// is not equal to `width * height`.
    pub fn new(
        colors: ColorSlice<'a, Srgb<u8>>,
        width: u32,
        height: u32,
    ) -> Result<Self, QuantizeError> {
        if colors.len() as u64 == u64::from(width) * u64::from(height) {
            Ok(Self::new_unchecked(colors, width, height))
        } else {
            Err(QuantizeError::DimensionMismatch {
                len: colors.len(),
                width,
                height,
            })
        }
    }

    /// Sets whether or not to apply dithering to the image.
    ///
    /// Dithering is skipped for images less than [`DITHER_MIN_DIMENSION`] pixels
    /// in both width and height, even if it is turned on.
    ///
    /// The default value is [`Dithering::On`].
    pub fn dither(&mut self, dither: impl Into<Dithering>) -> &mut Self {
        self.dither = dither.into();
        self
    }

    /// Sets the depth of the color octree.
    ///
    /// The default depth is [`OctreeDepth::FIVE`].
    pub fn depth(&mut self, depth: OctreeDepth) -> &mut Self {
        self.depth = depth;
        self
    }

    /// Sets what to do if the octree needs more palette colors than are available.
    ///
    /// The default is [`PaletteOverflow::NearestColor`].
    pub fn palette_overflow(&mut self, overflow: PaletteOverflow) -> &mut Self {
        self.palette_overflow = overflow;
        self
    }
}

#[cfg(feature = "image")]
impl<'a> TryFrom<&'a RgbImage> for ImagePipeline<'a> {
    type Error = QuantizeError;

    fn try_from(image: &'a RgbImage) -> Result<Self, Self::Error> {
        Ok(Self::new_unchecked(
            image.try_into()?,
            image.width(),
            image.height(),
        ))
    }
}

impl<'a> ImagePipeline<'a> {
    /// The pruning parameters for the current options.
    fn prune_options(&self) -> PruneOptions {
        PruneOptions {
            palette_size: MAX_COLORS,
            reserved_colors: RESERVED_COLORS,
            overflow: self.palette_overflow,
        }
    }

    /// Whether or not the octree path should dither, logging the reason if it does not.
    fn should_dither(&self) -> bool {
        let (width, height) = self.dimensions;
        match self.dither {
            Dithering::Off => {
                tracing::debug!("dithering is off, remapping pixels directly");
                false
            }
            Dithering::On if width < DITHER_MIN_DIMENSION && height < DITHER_MIN_DIMENSION => {
                tracing::debug!(
                    min_dimension = DITHER_MIN_DIMENSION,
                    "image is too small to dither, remapping pixels directly"
                );
                false
            }
            Dithering::On => {
                tracing::debug!("dithering pixels");
                true
            }
        }
    }

    /// Indexes the image exactly if it has few enough colors.
    fn try_exact(&self) -> Result<Option<QuantizeOutput<Srgb<u8>>>, QuantizeError> {
        let output = exact_indexed_palette(&self.colors, MAX_K)?;
        if let Some(output) = &output {
            tracing::debug!(
                colors = output.palette.len(),
                "image has few enough colors, indexing exactly"
            );
        }
        Ok(output)
    }

    /// Runs the pipeline and returns the quantized image as a list of indices into a palette.
    ///
    /// # Errors
    /// Returns an error if a working buffer could not be allocated
    /// or if the palette overflowed with [`PaletteOverflow::Error`].
    pub fn indexed_palette(&self) -> Result<QuantizeOutput<Srgb<u8>>, QuantizeError> {
        let (width, height) = self.dimensions;
        let span = tracing::debug_span!("quantize", width, height, depth = self.depth.get());
        let _enter = span.enter();

        if let Some(output) = self.try_exact()? {
            return Ok(output);
        }

        let Self { colors, depth, .. } = *self;
        let tree = Octree::build(&colors, depth, &self.prune_options())?;
        tracing::debug!(palette_size = tree.palette().len(), "pruned color octree");

        let indexer = ColorIndexer::new(depth);
        let indices = if self.should_dither() {
            dither::dither(&tree, indexer, &colors, width, height)?
        } else {
            tree.remap(indexer, &colors)?
        };

        Ok(QuantizeOutput::new(tree.into_palette(), indices))
    }
}

#[cfg(feature = "image")]
impl<'a> ImagePipeline<'a> {
    /// Runs the pipeline and returns the quantized image.
    ///
    /// # Errors
    /// See [`ImagePipeline::indexed_palette`].
    pub fn quantized_rgbimage(&self) -> Result<RgbImage, QuantizeError> {
        let (width, height) = self.dimensions;
        let output = self.indexed_palette()?;
        let len = output.indices.len();
        let buf = output.materialize().into_components();
        RgbImage::from_vec(width, height, buf)
            .ok_or(QuantizeError::DimensionMismatch { len, width, height })
    }
}

#[cfg(feature = "threads")]
impl<'a> ImagePipeline<'a> {
    /// Runs the pipeline in parallel and returns the quantized image as a
    /// list of indices into a palette.
    ///
    /// The histogram and the direct remapping are computed in parallel,
    /// dithering is always sequential. The result is identical to [`ImagePipeline::indexed_palette`].
    ///
    /// # Errors
    /// See [`ImagePipeline::indexed_palette`].
    pub fn indexed_palette_par(&self) -> Result<QuantizeOutput<Srgb<u8>>, QuantizeError> {
        let (width, height) = self.dimensions;
        let span = tracing::debug_span!("quantize", width, height, depth = self.depth.get());
        let _enter = span.enter();

        if let Some(output) = self.try_exact()? {
            return Ok(output);
        }

        let Self { colors, depth, .. } = *self;
        let tree = Octree::build_par(&colors, depth, &self.prune_options())?;
        tracing::debug!(palette_size = tree.palette().len(), "pruned color octree");

        let indexer = ColorIndexer::new(depth);
        let indices = if self.should_dither() {
            dither::dither(&tree, indexer, &colors, width, height)?
        } else {
            tree.remap_par(indexer, &colors)?
        };

        Ok(QuantizeOutput::new(tree.into_palette(), indices))
    }
}

#[cfg(all(feature = "threads", feature = "image"))]
impl<'a> ImagePipeline<'a> {
    /// Runs the pipeline in parallel and returns the quantized image.
    ///
    /// # Errors
    /// See [`ImagePipeline::indexed_palette`].
    pub fn quantized_rgbimage_par(&self) -> Result<RgbImage, QuantizeError> {
        let (width, height) = self.dimensions;
        let QuantizeOutput { palette, indices, .. } = self.indexed_palette_par()?;

        let len = indices.len();
        let palette = palette.as_slice();
        let buf = indices
            .par_iter()
            .map(|&i| palette[usize::from(i)])
            .collect::<Vec<_>>()
            .into_components();

        RgbImage::from_vec(width, height, buf)
            .ok_or(QuantizeError::DimensionMismatch { len, width, height })
    }
}

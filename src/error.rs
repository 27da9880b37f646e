//! Contains the error types returned by the quantizer.

use crate::AboveMaxLen;
use std::collections::TryReserveError;
use thiserror::Error;

/// The error type for the quantization functions and [`ImagePipeline`](crate::ImagePipeline).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantizeError {
    /// The requested octree depth was outside of `1..=6`.
    #[error("octree depth must be between 1 and 6, got {0}")]
    InvalidDepth(u8),

    /// The number of pixels does not match the given image dimensions.
    #[error("pixel buffer length {len} does not match dimensions {width}x{height}")]
    DimensionMismatch {
        /// The number of pixels provided.
        len: usize,
        /// The given image width.
        width: u32,
        /// The given image height.
        height: u32,
    },

    /// The image has more pixels than [`MAX_PIXELS`](crate::MAX_PIXELS).
    #[error("too many pixels: {0}")]
    TooManyPixels(#[from] AboveMaxLen),

    /// A working buffer could not be allocated.
    #[error("failed to allocate {what}")]
    OutOfMemory {
        /// The buffer that failed to allocate.
        what: &'static str,
        /// The underlying allocation error.
        #[source]
        source: TryReserveError,
    },

    /// More palette entries were required than the palette can hold.
    ///
    /// Only returned if [`PaletteOverflow::Error`](crate::PaletteOverflow::Error) is set.
    #[error("more than {0} palette colors were required")]
    PaletteOverflow(u16),
}

/// The error returned when adding a color to a palette that is already full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("palette is full")]
pub struct PaletteFull;

/// Allocates a `Vec` of `len` copies of `value`, reporting allocation failure instead of aborting.
pub(crate) fn try_vec<T: Clone>(
    value: T,
    len: usize,
    what: &'static str,
) -> Result<Vec<T>, QuantizeError> {
    let mut vec = Vec::new();
    vec.try_reserve_exact(len)
        .map_err(|source| QuantizeError::OutOfMemory { what, source })?;
    vec.resize(len, value);
    Ok(vec)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn try_vec_fills_value() {
        assert_eq!(try_vec(7u8, 3, "test").unwrap(), vec![7, 7, 7]);
    }

    #[test]
    fn try_vec_reports_oom() {
        let err = try_vec(0u64, usize::MAX, "huge").unwrap_err();
        assert!(matches!(err, QuantizeError::OutOfMemory { what: "huge", .. }));
    }
}

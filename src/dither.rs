//! Contains the fixed-point error diffusion ditherer.
//!
//! Each channel of a pixel is carried as a fixed-point accumulator with 6 fractional bits.
//! After a pixel is mapped to its octree leaf, the difference between the accumulated color
//! and the leaf's color is spread to three neighbors that have not been visited yet:
//! 3/8 to the next pixel in the row, 3/8 to the pixel below, and 2/8 to the pixel below and to the right.
//! The last column and the last row do not propagate any error.

use crate::{
    error::try_vec,
    octree::{index::ColorIndexer, Octree},
    QuantizeError,
};
use palette::{cast, Srgb};

/// The fixed-point scale of the accumulators.
const SCALE: i32 = 64;

/// The largest value an accumulator may hold.
const MAX_ACC: i32 = 16383;

/// A pixel's accumulated color, one fixed-point value per channel.
type Acc = [i32; 3];

/// Adds `err` to the accumulator, keeping it within `0..=MAX_ACC`.
#[inline]
fn add_clamped(acc: &mut i32, err: i32) {
    *acc = (*acc + err).clamp(0, MAX_ACC);
}

/// Converts an accumulator back to a color.
#[inline]
fn acc_color(acc: Acc) -> Srgb<u8> {
    cast::from_array(acc.map(|c| u8::try_from(c / SCALE).unwrap_or(u8::MAX)))
}

/// The accumulated colors of the two rows of pixels being dithered.
struct ErrorBuf<'a> {
    /// The accumulated colors for the current row of pixels.
    this_row: &'a mut [Acc],
    /// The accumulated colors for the next row of pixels.
    next_row: &'a mut [Acc],
}

impl<'a> ErrorBuf<'a> {
    /// Create the backing buffer for a new `ErrorBuf`.
    fn new_buf(width: usize) -> Result<Vec<Acc>, QuantizeError> {
        try_vec([0; 3], 2 * width, "dither rows")
    }

    /// Create a new `ErrorBuf` using the given `buf`.
    fn new(width: usize, buf: &'a mut [Acc]) -> Self {
        let (this_row, next_row) = buf.split_at_mut(width);
        Self { this_row, next_row }
    }

    /// Loads a row of pixels into the next row, discarding anything accumulated there.
    #[inline]
    fn load(&mut self, row: &[Srgb<u8>]) {
        for (acc, &color) in self.next_row.iter_mut().zip(row) {
            *acc = cast::into_array(color).map(|c| i32::from(c) * SCALE);
        }
    }

    /// Moves to the next row of pixels, loading `row` as the row after that.
    #[inline]
    fn advance(&mut self, row: &[Srgb<u8>]) {
        std::mem::swap(&mut self.this_row, &mut self.next_row);
        self.load(row);
    }

    /// Spreads the error of the pixel in column `x` of the current row.
    ///
    /// `x` must not be the last column.
    #[inline]
    fn propagate(&mut self, x: usize, acc: Acc, center: Srgb<u8>) {
        let center = cast::into_array(center);
        for c in 0..3 {
            let diff = acc[c] / 8 - 8 * i32::from(center[c]);
            if diff != 0 {
                add_clamped(&mut self.this_row[x + 1][c], 3 * diff);
                add_clamped(&mut self.next_row[x][c], 3 * diff);
                add_clamped(&mut self.next_row[x + 1][c], 2 * diff);
            }
        }
    }
}

/// Maps each pixel of a `width` by `height` image to a palette index,
/// diffusing the error of each pixel onto its neighbors.
///
/// `colors` must hold exactly `width * height` pixels in row-major order.
pub(crate) fn dither(
    tree: &Octree,
    indexer: ColorIndexer,
    colors: &[Srgb<u8>],
    width: u32,
    height: u32,
) -> Result<Vec<u8>, QuantizeError> {
    let width = width as usize;
    let height = height as usize;
    debug_assert_eq!(colors.len(), width * height);

    let mut indices = try_vec(0, colors.len(), "index map")?;
    if colors.is_empty() {
        return Ok(indices);
    }

    let lookup = |acc: Acc| tree.find(indexer.address(acc_color(acc)));

    let mut buf = ErrorBuf::new_buf(width)?;
    let mut error = ErrorBuf::new(width, &mut buf);
    error.load(&colors[..width]);

    let (body, last_row) = indices.split_at_mut((height - 1) * width);

    for (row, next) in body
        .chunks_exact_mut(width)
        .zip(colors[width..].chunks_exact(width))
    {
        error.advance(next);

        let Some((last, row)) = row.split_last_mut() else {
            continue;
        };

        for (x, index) in row.iter_mut().enumerate() {
            let acc = error.this_row[x];
            let cell = lookup(acc);
            *index = cell.index();
            error.propagate(x, acc, cell.center);
        }

        *last = lookup(error.this_row[width - 1]).index();
    }

    for (index, &acc) in last_row.iter_mut().zip(error.next_row.iter()) {
        *index = lookup(acc).index();
    }

    Ok(indices)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{octree::PruneOptions, tests::*, OctreeDepth, PaletteOverflow};

    const OPTIONS: PruneOptions = PruneOptions {
        palette_size: 256,
        reserved_colors: 64,
        overflow: PaletteOverflow::NearestColor,
    };

    fn setup(colors: &[Srgb<u8>]) -> (Octree, ColorIndexer) {
        let depth = OctreeDepth::FIVE;
        let tree = Octree::build(colors, depth, &OPTIONS).unwrap();
        (tree, ColorIndexer::new(depth))
    }

    #[test]
    fn accumulators_stay_in_range() {
        let mut buf = ErrorBuf::new_buf(2).unwrap();
        let mut error = ErrorBuf::new(2, &mut buf);

        error.load(&[Srgb::new(255, 0, 128); 2]);
        error.advance(&[Srgb::new(255, 0, 128); 2]);

        // red overshoots, green undershoots, and blue is exact
        error.propagate(0, [MAX_ACC, 0, 128 * SCALE], Srgb::new(0, 255, 128));
        assert_eq!(error.this_row[1], [MAX_ACC, 0, 128 * SCALE]);
        assert_eq!(error.next_row[0], [MAX_ACC, 0, 128 * SCALE]);
        assert_eq!(error.next_row[1], [MAX_ACC, 0, 128 * SCALE]);
    }

    #[test]
    fn small_error_is_split_three_ways() {
        let mut buf = ErrorBuf::new_buf(2).unwrap();
        let mut error = ErrorBuf::new(2, &mut buf);

        let color = Srgb::new(100, 100, 100);
        error.load(&[color; 2]);
        error.advance(&[color; 2]);

        // 101 * 8 - 100 * 8 = 8 per channel
        error.propagate(0, [101 * SCALE; 3], color);
        assert_eq!(error.this_row[1], [100 * SCALE + 24; 3]);
        assert_eq!(error.next_row[0], [100 * SCALE + 24; 3]);
        assert_eq!(error.next_row[1], [100 * SCALE + 16; 3]);
    }

    #[test]
    fn acc_color_truncates() {
        assert_eq!(acc_color([0, 63, 64]), Srgb::new(0, 0, 1));
        assert_eq!(acc_color([MAX_ACC; 3]), Srgb::new(255, 255, 255));
    }

    #[test]
    fn indices_are_valid() {
        let colors = gradient(260, 250);
        let (tree, indexer) = setup(&colors);
        let indices = dither(&tree, indexer, &colors, 260, 250).unwrap();
        assert_eq!(indices.len(), colors.len());
        assert!(indices.iter().all(|&i| usize::from(i) < tree.palette().len()));
    }

    #[test]
    fn single_row_or_column_has_no_error_to_spread() {
        let colors = test_data_1024();
        let (tree, indexer) = setup(&colors);
        let remapped = tree.remap(indexer, &colors).unwrap();

        assert_eq!(dither(&tree, indexer, &colors, 1024, 1).unwrap(), remapped);
        assert_eq!(dither(&tree, indexer, &colors, 1, 1024).unwrap(), remapped);
    }

    #[test]
    fn first_pixel_is_not_adjusted() {
        let colors = gradient(300, 300);
        let (tree, indexer) = setup(&colors);
        let remapped = tree.remap(indexer, &colors).unwrap();
        let dithered = dither(&tree, indexer, &colors, 300, 300).unwrap();
        assert_eq!(dithered[0], remapped[0]);
        assert_ne!(dithered, remapped);
    }

    #[test]
    fn empty() {
        let (tree, indexer) = setup(&test_data_1024());
        assert!(dither(&tree, indexer, &[], 0, 0).unwrap().is_empty());
    }

    #[test]
    fn deterministic() {
        let colors = gradient(256, 256);
        let (tree, indexer) = setup(&colors);
        assert_eq!(
            dither(&tree, indexer, &colors, 256, 256).unwrap(),
            dither(&tree, indexer, &colors, 256, 256).unwrap(),
        );
    }
}

//! Contains the lossless path for images with few enough distinct colors.

use crate::{error::try_vec, QuantizeError, QuantizeOutput};
use bitvec::{order::Lsb0, vec::BitVec};
use palette::Srgb;
use std::collections::HashMap;

/// The number of distinct 24-bit RGB colors.
const NUM_RGB: usize = 1 << 24;

/// Packs a color into a 24-bit integer.
#[inline]
fn pack(color: Srgb<u8>) -> u32 {
    (u32::from(color.red) << 16) | (u32::from(color.green) << 8) | u32::from(color.blue)
}

/// Returns the distinct colors in `colors` in order of first appearance,
/// or `None` if there are more than `limit` distinct colors.
///
/// This stops scanning as soon as the limit is exceeded.
pub(crate) fn distinct_colors(
    colors: &[Srgb<u8>],
    limit: usize,
) -> Result<Option<Vec<Srgb<u8>>>, QuantizeError> {
    let words = try_vec(0usize, NUM_RGB / usize::BITS as usize, "color bitset")?;
    let mut seen = BitVec::<usize, Lsb0>::from_vec(words);
    let mut distinct = Vec::new();

    for &color in colors {
        let i = pack(color) as usize;
        if !seen[i] {
            if distinct.len() == limit {
                return Ok(None);
            }
            seen.set(i, true);
            distinct.push(color);
        }
    }

    Ok(Some(distinct))
}

/// Indexes the image exactly if it has at most `limit` (at most `256`) distinct colors.
///
/// The palette lists the distinct colors in order of first appearance,
/// and each pixel is mapped to the index of its own color.
/// Returns `None` if there are too many distinct colors.
pub(crate) fn exact_indexed_palette(
    colors: &[Srgb<u8>],
    limit: usize,
) -> Result<Option<QuantizeOutput<Srgb<u8>>>, QuantizeError> {
    let limit = limit.min(crate::MAX_K);
    let Some(palette) = distinct_colors(colors, limit)? else {
        return Ok(None);
    };

    #[allow(clippy::cast_possible_truncation)]
    let lookup = palette
        .iter()
        .enumerate()
        .map(|(i, &color)| (pack(color), i as u8))
        .collect::<HashMap<_, _>>();

    let mut indices = try_vec(0, colors.len(), "index map")?;
    for (index, &color) in indices.iter_mut().zip(colors) {
        *index = lookup[&pack(color)];
    }

    Ok(Some(QuantizeOutput::new(palette, indices)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tests::*;

    #[test]
    fn empty_input() {
        let output = exact_indexed_palette(&[], 256).unwrap().unwrap();
        assert_eq!(output, QuantizeOutput::default());
    }

    #[test]
    fn first_seen_order() {
        let a = Srgb::new(9, 9, 9);
        let b = Srgb::new(0, 0, 0);
        let c = Srgb::new(255, 0, 128);
        let colors = [a, b, a, c, b, c, c];

        let output = exact_indexed_palette(&colors, 256).unwrap().unwrap();
        assert_eq!(output.palette, vec![a, b, c]);
        assert_eq!(output.indices, vec![0, 1, 0, 2, 1, 2, 2]);
        assert_eq!(output.counts, vec![2, 2, 3]);
    }

    #[test]
    fn exactly_256_colors() {
        let colors = test_data_256();
        let output = exact_indexed_palette(&colors, 256).unwrap().unwrap();
        assert_eq!(output.palette.len(), 256);
        assert_eq!(output.materialize(), colors);
    }

    #[test]
    fn too_many_colors() {
        let colors = test_data_1024();
        assert!(exact_indexed_palette(&colors, 256).unwrap().is_none());
        assert!(distinct_colors(&colors[..257], 256).unwrap().is_none());
        assert_eq!(distinct_colors(&colors[..256], 256).unwrap().unwrap().len(), 256);
    }
}

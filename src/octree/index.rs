//! Maps colors to octree addresses and octree cells back to colors.
//!
//! An address at depth `d` has `3 * d` bits made of `d` triples of
//! red, green, and blue bits (in that order), one triple per bit plane,
//! starting with the most significant bit of each channel.
//! The address of a cell at a coarser level `l` is the address shifted right by `3 * (d - l)`.

use crate::{OctreeDepth, MAX_DEPTH};
use palette::Srgb;

/// Per channel lookup tables for one octree depth.
struct IndexTables {
    /// The address bits contributed by each red value.
    red: [u32; 256],
    /// The address bits contributed by each green value.
    green: [u32; 256],
    /// The address bits contributed by each blue value.
    blue: [u32; 256],
}

/// Spreads the top `depth` bits of `value` into every third bit of an address,
/// starting at bit position `offset` for the least significant triple.
const fn spread(value: u8, depth: u8, offset: u32) -> u32 {
    let mut address = 0;
    let mut plane = 0;
    while plane < depth {
        let bit = ((value >> (7 - plane)) & 1) as u32;
        address |= bit << (3 * (depth - 1 - plane) as u32 + offset);
        plane += 1;
    }
    address
}

/// Builds the lookup tables for the given depth.
const fn index_tables(depth: u8) -> IndexTables {
    let mut tables = IndexTables {
        red: [0; 256],
        green: [0; 256],
        blue: [0; 256],
    };
    let mut i = 0;
    while i < 256 {
        #[allow(clippy::cast_possible_truncation)]
        let value = i as u8;
        tables.red[i] = spread(value, depth, 2);
        tables.green[i] = spread(value, depth, 1);
        tables.blue[i] = spread(value, depth, 0);
        i += 1;
    }
    tables
}

/// The lookup tables for each supported depth (the table at index `i` is for depth `i + 1`).
static TABLES: [IndexTables; MAX_DEPTH as usize] = [
    index_tables(1),
    index_tables(2),
    index_tables(3),
    index_tables(4),
    index_tables(5),
    index_tables(6),
];

/// Computes the full depth octree address of colors.
#[derive(Clone, Copy)]
pub(crate) struct ColorIndexer {
    /// The tables for the configured depth.
    tables: &'static IndexTables,
}

impl ColorIndexer {
    /// Creates a [`ColorIndexer`] for addresses with `3 * depth` bits.
    pub(crate) fn new(depth: OctreeDepth) -> Self {
        Self {
            tables: &TABLES[usize::from(depth.get() - 1)],
        }
    }

    /// Returns the octree address of the given color.
    #[inline]
    pub(crate) fn address(self, color: Srgb<u8>) -> u32 {
        let Self { tables } = self;
        tables.red[usize::from(color.red)]
            | tables.green[usize::from(color.green)]
            | tables.blue[usize::from(color.blue)]
    }
}

/// Returns the color at the center of the sub-cube with the given address at the given level.
///
/// Each channel keeps the `level` bits from the address and then sets the next bit,
/// which is the midpoint of the range covered by the sub-cube.
pub(crate) fn cube_center(address: u32, level: u8) -> Srgb<u8> {
    debug_assert!(level <= MAX_DEPTH);
    let channel = |offset: u32| {
        let mut value = 0u32;
        for plane in 0..u32::from(level) {
            let bit = (address >> (3 * (u32::from(level) - 1 - plane) + offset)) & 1;
            value |= bit << (7 - plane);
        }
        value |= 1 << (7 - u32::from(level));
        #[allow(clippy::cast_possible_truncation)]
        {
            value as u8
        }
    };
    Srgb::new(channel(2), channel(1), channel(0))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn indexer(depth: u8) -> ColorIndexer {
        ColorIndexer::new(OctreeDepth::try_from(depth).unwrap())
    }

    /// Interleaves bits one at a time without any tables.
    fn naive_address(color: Srgb<u8>, depth: u8) -> u32 {
        let mut address = 0;
        for plane in 0..depth {
            let shift = 7 - plane;
            let r = u32::from(color.red >> shift) & 1;
            let g = u32::from(color.green >> shift) & 1;
            let b = u32::from(color.blue >> shift) & 1;
            address = (address << 3) | (r << 2) | (g << 1) | b;
        }
        address
    }

    #[test]
    fn depth_one_uses_top_bits() {
        let indexer = indexer(1);
        assert_eq!(indexer.address(Srgb::new(0x80, 0, 0)), 0b100);
        assert_eq!(indexer.address(Srgb::new(0, 0x80, 0)), 0b010);
        assert_eq!(indexer.address(Srgb::new(0, 0, 0x80)), 0b001);
        assert_eq!(indexer.address(Srgb::new(0x7f, 0x7f, 0x7f)), 0);
    }

    #[test]
    fn depth_five_bit_layout() {
        let indexer = indexer(5);
        for i in 0..=255u8 {
            let v = u32::from(i);
            let red = ((v << 7) & 0x4000)
                | ((v << 5) & 0x0800)
                | ((v << 3) & 0x0100)
                | ((v << 1) & 0x0020)
                | ((v >> 1) & 0x0004);
            let blue = ((v << 5) & 0x1000)
                | ((v << 3) & 0x0200)
                | ((v << 1) & 0x0040)
                | ((v >> 1) & 0x0008)
                | ((v >> 3) & 0x0001);
            assert_eq!(indexer.address(Srgb::new(i, 0, 0)), red);
            assert_eq!(indexer.address(Srgb::new(0, 0, i)), blue);
        }
    }

    #[test]
    fn naive_interleave_oracle() {
        let colors = crate::tests::test_data_1024();
        for depth in 1..=MAX_DEPTH {
            let indexer = indexer(depth);
            for &color in &colors {
                let address = indexer.address(color);
                assert_eq!(address, naive_address(color, depth));
                assert!(address < 1 << (3 * u32::from(depth)));
            }
        }
    }

    #[test]
    fn centers() {
        assert_eq!(cube_center(0, 0), Srgb::new(128, 128, 128));
        assert_eq!(cube_center(0b111, 1), Srgb::new(192, 192, 192));
        assert_eq!(cube_center(0b100, 1), Srgb::new(192, 64, 64));
        assert_eq!(cube_center(0, 6), Srgb::new(2, 2, 2));
    }

    #[test]
    fn center_lies_in_its_cube() {
        let colors = crate::tests::test_data_1024();
        for depth in 1..=MAX_DEPTH {
            let indexer = indexer(depth);
            for &color in &colors {
                let address = indexer.address(color);
                for level in 0..=depth {
                    let cube = address >> (3 * u32::from(depth - level));
                    let center = cube_center(cube, level);
                    assert_eq!(indexer.address(center) >> (3 * u32::from(depth - level)), cube);
                }
            }
        }
    }
}

//! The pruned, depth adaptive color octree.
//!
//! Every level `l` of the tree is a flat array of `8^l` [`ColorCell`]s, and the
//! children of the cell at index `i` are the cells at indices `8 * i..8 * i + 8` on the next level.
//! An image is first accumulated into the finest level, one sample per pixel.
//! The tree is then pruned from the bottom up: a child cell that holds enough samples
//! according to the current pixel-per-cell budget becomes a leaf with its own palette color,
//! and a parent with at least one leaf child becomes a leaf as well,
//! taking the leftover samples of its other children under a residual palette color.
//! Parents without leaf children pass all of their children's samples up a level instead.
//! Dense regions of color space therefore end up with small cells and accurate colors,
//! while sparse regions share a few large cells.

pub(crate) mod index;
pub(crate) mod color_list;

use crate::{error::try_vec, OctreeDepth, PaletteFull, PaletteOverflow, QuantizeError, MAX_DEPTH};
use color_list::Palette;
use index::{cube_center, ColorIndexer};
use palette::Srgb;
#[cfg(feature = "threads")]
use rayon::prelude::*;

/// The number of palette colors kept out of the pixel-per-cell budget to avoid running out.
const EXTRA_RESERVED_COLORS: i64 = 25;

/// The density threshold of each level's children, as a factor of the pixel-per-cell budget.
const THRESHOLD_FACTOR: [f32; MAX_DEPTH as usize] = [0.01, 0.01, 1.0, 1.0, 1.0, 1.0];

/// The coarsest level that gets pruned. All of its cells become leaves.
const COARSEST_PRUNED_LEVEL: u8 = 2;

/// A sub-cube of the RGB color space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ColorCell {
    /// The color of the cell, set once the cell is given a palette index.
    pub(crate) center: Srgb<u8>,
    /// The number of pixels counted towards this cell.
    pub(crate) samples: u32,
    /// The palette index of the cell.
    pub(crate) palette_index: Option<u8>,
    /// The number of children that are leaves.
    pub(crate) leaf_children: u8,
    /// Whether or not the cell was promoted to a leaf.
    pub(crate) is_leaf: bool,
}

impl ColorCell {
    /// An empty cell.
    const EMPTY: Self = Self {
        center: Srgb::new(0, 0, 0),
        samples: 0,
        palette_index: None,
        leaf_children: 0,
        is_leaf: false,
    };

    /// Returns the palette index of the cell.
    ///
    /// Every leaf reachable by [`Octree::find`] owns a palette index.
    #[inline]
    pub(crate) fn index(&self) -> u8 {
        debug_assert!(self.palette_index.is_some());
        self.palette_index.unwrap_or_default()
    }
}

/// The parameters for pruning an [`Octree`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct PruneOptions {
    /// The maximum number of palette colors.
    pub(crate) palette_size: u16,
    /// The number of palette colors held back for residual cells.
    pub(crate) reserved_colors: u16,
    /// What to do once the palette is full.
    pub(crate) overflow: PaletteOverflow,
}

/// Tracks the remaining pixels and palette colors during pruning.
struct CellBudget {
    /// The number of pixels not yet assigned to a leaf.
    pixels: i64,
    /// The number of palette colors left in the budget.
    colors: i64,
    /// The number of reserved palette colors.
    reserved: i64,
    /// The average number of remaining pixels per remaining palette color.
    per_cell: f32,
}

impl CellBudget {
    /// Creates a new [`CellBudget`] for the given number of pixels.
    fn new(pixels: u64, options: &PruneOptions) -> Self {
        let pixels = i64::try_from(pixels).unwrap_or(i64::MAX);
        let reserved = i64::from(options.reserved_colors);
        let colors = i64::from(options.palette_size) - reserved - EXTRA_RESERVED_COLORS;
        Self {
            pixels,
            colors,
            reserved,
            per_cell: Self::pixels_per_cell(pixels, colors, reserved),
        }
    }

    /// Computes the pixel-per-cell budget, dipping into the reserved colors once the budget runs out.
    #[allow(clippy::cast_precision_loss)]
    fn pixels_per_cell(pixels: i64, colors: i64, reserved: i64) -> f32 {
        if colors > 0 {
            (pixels / colors) as f32
        } else if colors + reserved > 0 {
            (pixels / (colors + reserved)) as f32
        } else {
            f32::INFINITY
        }
    }

    /// Whether a cell with the given number of samples is dense enough to become a leaf.
    #[allow(clippy::cast_precision_loss)]
    fn admits(&self, samples: u32, factor: f32) -> bool {
        samples as f32 >= factor * self.per_cell
    }

    /// Removes a new leaf and its samples from the budget.
    fn spend(&mut self, samples: u32) {
        self.pixels = (self.pixels - i64::from(samples)).max(0);
        self.colors -= 1;
        self.per_cell = Self::pixels_per_cell(self.pixels, self.colors, self.reserved);
    }
}

/// Hands out palette colors to new leaves, applying the [`PaletteOverflow`] policy.
struct PaletteAssigner {
    /// The palette being built.
    palette: Palette,
    /// What to do once the palette is full.
    overflow: PaletteOverflow,
    /// The maximum palette size.
    palette_size: u16,
    /// The number of cells that did not get a palette color of their own.
    overflowed: u32,
}

impl PaletteAssigner {
    /// Gives `cell` the color at the center of its sub-cube.
    fn assign(&mut self, cell: &mut ColorCell, cube: usize, level: u8) -> Result<(), QuantizeError> {
        #[allow(clippy::cast_possible_truncation)]
        let center = cube_center(cube as u32, level);
        let (index, color) = match self.palette.try_assign_palette_color(center) {
            Ok(index) => (index, center),
            Err(PaletteFull) => {
                self.overflowed += 1;
                match self.overflow {
                    PaletteOverflow::NearestColor => self
                        .palette
                        .nearest(center)
                        .ok_or(QuantizeError::PaletteOverflow(self.palette_size))?,
                    PaletteOverflow::Error => {
                        return Err(QuantizeError::PaletteOverflow(self.palette_size))
                    }
                }
            }
        };
        cell.palette_index = Some(index);
        cell.center = color;
        Ok(())
    }
}

/// A color octree stored as one flat array of cells per level.
#[derive(Debug, Clone)]
pub(crate) struct Octree {
    /// The number of levels below the root.
    depth: OctreeDepth,
    /// The cells of each level, from the root (level `0`) to level `depth`.
    levels: Vec<Vec<ColorCell>>,
    /// The palette colors handed out during pruning.
    palette: Palette,
}

impl Octree {
    /// Allocates an empty [`Octree`] with the given depth.
    pub(crate) fn new(depth: OctreeDepth) -> Result<Self, QuantizeError> {
        let levels = (0..=depth.get())
            .map(|level| try_vec(ColorCell::EMPTY, 1 << (3 * level), "octree level"))
            .collect::<Result<_, _>>()?;

        Ok(Self {
            depth,
            levels,
            palette: Palette::default(),
        })
    }

    /// Builds an [`Octree`] for the given colors.
    pub(crate) fn build(
        colors: &[Srgb<u8>],
        depth: OctreeDepth,
        options: &PruneOptions,
    ) -> Result<Self, QuantizeError> {
        let mut tree = Self::new(depth)?;
        tree.accumulate(ColorIndexer::new(depth), colors);
        tree.prune(options)?;
        Ok(tree)
    }

    /// The finest level, which is addressed directly by [`ColorIndexer`] addresses.
    fn leaves_mut(&mut self) -> &mut [ColorCell] {
        let depth = usize::from(self.depth.get());
        &mut self.levels[depth]
    }

    /// The coarsest level visited by pruning and lookups.
    fn coarsest_level(&self) -> u8 {
        COARSEST_PRUNED_LEVEL.min(self.depth.get() - 1)
    }

    /// Counts each color as a sample of its finest level cell.
    pub(crate) fn accumulate(&mut self, indexer: ColorIndexer, colors: &[Srgb<u8>]) {
        let leaves = self.leaves_mut();
        for &color in colors {
            leaves[indexer.address(color) as usize].samples += 1;
        }
    }

    /// Prunes the tree from the bottom up and fills the palette.
    ///
    /// This must be called exactly once, after all colors have been accumulated.
    pub(crate) fn prune(&mut self, options: &PruneOptions) -> Result<(), QuantizeError> {
        let depth = self.depth.get();
        let coarsest = self.coarsest_level();

        let total = self.leaves_mut().iter().map(|cell| u64::from(cell.samples)).sum();
        let mut budget = CellBudget::new(total, options);
        let mut assigner = PaletteAssigner {
            palette: Palette::new(options.palette_size),
            overflow: options.overflow,
            palette_size: options.palette_size,
            overflowed: 0,
        };

        for level in (coarsest..depth).rev() {
            let factor = THRESHOLD_FACTOR[usize::from(level)];
            let (coarse, fine) = self.levels.split_at_mut(usize::from(level) + 1);
            let parents = &mut coarse[usize::from(level)];
            let children = &mut fine[0];

            for (i, (parent, children)) in parents
                .iter_mut()
                .zip(children.chunks_exact_mut(8))
                .enumerate()
            {
                for (j, child) in children.iter_mut().enumerate() {
                    if child.is_leaf {
                        parent.leaf_children += 1;
                    } else if budget.admits(child.samples, factor) {
                        child.is_leaf = true;
                        assigner.assign(child, 8 * i + j, level + 1)?;
                        parent.leaf_children += 1;
                        budget.spend(child.samples);
                    }
                }

                if parent.leaf_children > 0 || level == coarsest {
                    parent.is_leaf = true;
                    if parent.leaf_children < 8 {
                        parent.samples += children
                            .iter()
                            .filter(|child| !child.is_leaf)
                            .map(|child| child.samples)
                            .sum::<u32>();

                        assigner.assign(parent, i, level)?;
                        budget.spend(parent.samples);
                    }
                } else {
                    parent.samples += children.iter().map(|child| child.samples).sum::<u32>();
                }
            }
        }

        if assigner.overflowed > 0 {
            tracing::warn!(
                cells = assigner.overflowed,
                palette_size = options.palette_size,
                "palette overflowed, reusing the nearest palette colors"
            );
        }

        self.palette = assigner.palette;
        Ok(())
    }

    /// Returns the leaf that owns the color with the given full depth address.
    ///
    /// This is the finest leaf along the path from the coarsest pruned level to the address's cell.
    pub(crate) fn find(&self, address: u32) -> &ColorCell {
        let depth = self.depth.get();
        let levels = self.levels.as_slice();
        let cell = move |level: u8| {
            let i = address >> (3 * u32::from(depth - level));
            &levels[usize::from(level)][i as usize]
        };

        let coarsest = self.coarsest_level();
        let mut node = cell(coarsest);
        for level in (coarsest + 1)..=depth {
            let sub = cell(level);
            if !sub.is_leaf {
                break;
            }
            node = sub;
        }
        node
    }

    /// Maps each color to the palette index of its leaf.
    pub(crate) fn remap(
        &self,
        indexer: ColorIndexer,
        colors: &[Srgb<u8>],
    ) -> Result<Vec<u8>, QuantizeError> {
        let mut indices = try_vec(0, colors.len(), "index map")?;
        for (index, &color) in indices.iter_mut().zip(colors) {
            *index = self.find(indexer.address(color)).index();
        }
        Ok(indices)
    }

    /// The palette colors.
    pub(crate) fn palette(&self) -> &[Srgb<u8>] {
        self.palette.colors()
    }

    /// Unwraps the palette colors.
    pub(crate) fn into_palette(self) -> Vec<Srgb<u8>> {
        self.palette.into_colors()
    }
}

#[cfg(feature = "threads")]
impl Octree {
    /// Builds an [`Octree`] for the given colors, accumulating the colors in parallel.
    pub(crate) fn build_par(
        colors: &[Srgb<u8>],
        depth: OctreeDepth,
        options: &PruneOptions,
    ) -> Result<Self, QuantizeError> {
        let mut tree = Self::new(depth)?;
        tree.accumulate_par(ColorIndexer::new(depth), colors)?;
        tree.prune(options)?;
        Ok(tree)
    }

    /// Counts each color as a sample of its finest level cell in parallel.
    pub(crate) fn accumulate_par(
        &mut self,
        indexer: ColorIndexer,
        colors: &[Srgb<u8>],
    ) -> Result<(), QuantizeError> {
        let leaves = self.leaves_mut();
        let len = leaves.len();
        let chunk_size = colors.len().div_ceil(rayon::current_num_threads()).max(1);

        let counts = colors
            .par_chunks(chunk_size)
            .map(|chunk| {
                let mut counts = try_vec(0u32, len, "octree histogram")?;
                for &color in chunk {
                    counts[indexer.address(color) as usize] += 1;
                }
                Ok::<_, QuantizeError>(counts)
            })
            .try_reduce(Vec::new, |mut a, b| {
                if a.is_empty() {
                    return Ok(b);
                }
                for (a, b) in a.iter_mut().zip(b) {
                    *a += b;
                }
                Ok(a)
            })?;

        for (cell, count) in leaves.iter_mut().zip(counts) {
            cell.samples += count;
        }

        Ok(())
    }

    /// Maps each color to the palette index of its leaf in parallel.
    pub(crate) fn remap_par(
        &self,
        indexer: ColorIndexer,
        colors: &[Srgb<u8>],
    ) -> Result<Vec<u8>, QuantizeError> {
        let mut indices = try_vec(0, colors.len(), "index map")?;
        indices
            .par_iter_mut()
            .zip(colors.par_iter())
            .for_each(|(index, &color)| *index = self.find(indexer.address(color)).index());
        Ok(indices)
    }
}

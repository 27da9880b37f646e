//! The append-only palette filled while pruning the octree.

use crate::PaletteFull;
use palette::Srgb;

/// An ordered list of colors where insertion order is the palette index.
#[derive(Debug, Clone, Default)]
pub(crate) struct Palette {
    /// The palette colors.
    colors: Vec<Srgb<u8>>,
    /// The maximum number of colors.
    capacity: usize,
}

impl Palette {
    /// Creates an empty [`Palette`] that can hold at most `capacity` colors.
    pub(crate) fn new(capacity: u16) -> Self {
        let capacity = usize::from(capacity).min(crate::MAX_K);
        Self {
            colors: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `color` and returns its index, or [`PaletteFull`] if there is no room left.
    pub(crate) fn try_assign_palette_color(&mut self, color: Srgb<u8>) -> Result<u8, PaletteFull> {
        if self.colors.len() >= self.capacity {
            return Err(PaletteFull);
        }
        let index = u8::try_from(self.colors.len()).map_err(|_| PaletteFull)?;
        self.colors.push(color);
        Ok(index)
    }

    /// Returns the index and color of the palette entry closest to `color`.
    ///
    /// Ties go to the lowest index. Returns `None` if the palette is empty.
    pub(crate) fn nearest(&self, color: Srgb<u8>) -> Option<(u8, Srgb<u8>)> {
        let distance = |other: &Srgb<u8>| {
            let d = |a: u8, b: u8| {
                let d = i32::from(a) - i32::from(b);
                d * d
            };
            d(color.red, other.red) + d(color.green, other.green) + d(color.blue, other.blue)
        };

        self.colors
            .iter()
            .enumerate()
            .min_by_key(|(_, other)| distance(other))
            .and_then(|(i, &other)| u8::try_from(i).ok().map(|i| (i, other)))
    }

    /// The palette colors as a slice.
    pub(crate) fn colors(&self) -> &[Srgb<u8>] {
        &self.colors
    }

    /// Unwraps the palette colors.
    pub(crate) fn into_colors(self) -> Vec<Srgb<u8>> {
        self.colors
    }
}

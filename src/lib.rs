//! A library for reducing full color images to at most 256 colors using an adaptive color octree.
//!
//! `octquant` counts the pixels of an image in an octree over RGB space and then prunes the tree
//! from the bottom up, giving densely populated regions of color space small cells
//! (and thus accurate colors) and sparse regions a few large cells.
//! Optionally, the quantization error can be diffused to neighboring pixels (dithering).
//! Images that already have at most [`MAX_COLORS`] distinct colors are indexed exactly instead.
//!
//! The output is a palette and a list of indices into it,
//! which is what 8-bit palette based image formats need.
//!
//! # Features
//! `octquant` has several `cargo` features that can be turned off or on:
//! - `threads`: exposes parallel versions of most functions via [`rayon`].
//! - `image`: enables integration with the [`image`] crate.
//!
//! # Examples
//! To get started with the high-level API, see [`ImagePipeline`].
//! There are also free functions for one off calls:
//! ```
//! # use octquant::{quantized, Dithering, QuantizeError};
//! # use palette::Srgb;
//! # fn main() -> Result<(), QuantizeError> {
//! let pixels = vec![Srgb::new(255, 0, 0); 100];
//! let output = quantized(&pixels, 10, 10, Dithering::On, 5)?;
//! assert_eq!(output.palette, vec![Srgb::new(255, 0, 0)]);
//! assert!(output.indices.iter().all(|&i| i == 0));
//! # Ok(())
//! # }
//! ```
//!
//! Or, with an image from the [`image`] crate:
//! ```no_run
//! # use octquant::{ImagePipeline, OctreeDepth};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = image::open("some image")?.into_rgb8();
//!
//! let quantized = ImagePipeline::try_from(&img)?
//!     .depth(OctreeDepth::SIX) // use smaller cells for more accurate colors
//!     .dither(false) // turn dithering off
//!     .quantized_rgbimage()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//! `octquant` emits [`tracing`] events: the path taken for each image at the `debug` level
//! and palette overflows at the `warn` level. No subscriber is installed by the library.

#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::pedantic,
    clippy::cargo,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::unwrap_in_result,
    clippy::expect_used,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice,
    missing_docs,
    clippy::missing_docs_in_private_items,
    rustdoc::all,
    clippy::float_cmp_const,
    clippy::lossy_float_literal
)]
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::many_single_char_names,
    clippy::missing_panics_doc,
    clippy::unreadable_literal,
    clippy::wildcard_imports
)]

mod api;
mod color_counts;
mod dither;
mod error;
mod octree;
mod types;


pub use api::*;
pub use error::{PaletteFull, QuantizeError};
pub use types::*;

/// The maximum supported image size in number of pixels is `u32::MAX`.
pub const MAX_PIXELS: u32 = u32::MAX;

/// The maximum supported number of palette colors is `256`.
pub const MAX_COLORS: u16 = u8::MAX as u16 + 1;

/// `MAX_COLORS` as a `usize` for array and `Vec` lengths.
pub(crate) const MAX_K: usize = MAX_COLORS as usize;

/// The maximum supported octree depth is `6`.
pub const MAX_DEPTH: u8 = 6;

/// Dithering is only applied to images at least this many pixels wide or tall.
pub const DITHER_MIN_DIMENSION: u32 = 250;

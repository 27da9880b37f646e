#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice
)]

use std::{error::Error, path::PathBuf};

use clap::Parser;
use octquant::{ImagePipeline, OctreeDepth, PaletteOverflow};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
pub struct Options {
    /// The octree depth, between 1 and 6.
    #[arg(short, long, default_value_t = OctreeDepth::default(), value_parser = parse_depth)]
    depth: OctreeDepth,

    /// Map each pixel straight to its octree cell.
    #[arg(long)]
    no_dither: bool,

    /// Fail instead of reusing palette colors if the palette overflows.
    #[arg(long)]
    strict: bool,

    /// The number of threads to use, `0` uses all cores and `1` runs sequentially.
    #[arg(short, long, default_value_t = 0)]
    threads: u8,

    #[arg(long)]
    verbose: bool,

    input: PathBuf,

    output: PathBuf,
}

fn parse_depth(s: &str) -> Result<OctreeDepth, String> {
    let value: u8 = s.parse().map_err(|e| format!("{e}"))?;
    value.try_into().map_err(|e| format!("{e}"))
}

fn main() -> Result<(), Box<dyn Error>> {
    let Options {
        depth,
        no_dither,
        strict,
        threads,
        verbose,
        input,
        output,
    } = Options::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "octquant=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    macro_rules! log {
        ($name: literal, $val: expr) => {
            if verbose {
                let time = std::time::Instant::now();
                let value = $val;
                println!("{} took {}ms", $name, time.elapsed().as_millis());
                value
            } else {
                $val
            }
        };
    }

    let image = log!("read image", image::open(input)?.into_rgb8());

    let overflow = if strict {
        PaletteOverflow::Error
    } else {
        PaletteOverflow::NearestColor
    };

    let mut pipeline = ImagePipeline::try_from(&image)?;
    pipeline
        .depth(depth)
        .dither(!no_dither)
        .palette_overflow(overflow);

    let quantized = log!(
        "quantization and remapping",
        match threads {
            0 => pipeline.quantized_rgbimage_par()?,
            1 => pipeline.quantized_rgbimage()?,
            t => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(t.into())
                    .build()?;

                pool.install(|| pipeline.quantized_rgbimage_par())?
            }
        }
    );

    log!("write image", quantized.save(output)?);
    Ok(())
}

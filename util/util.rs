#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use image::RgbImage;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoroshiro128PlusPlus;

pub fn load_images(images: &[PathBuf]) -> Vec<(String, RgbImage)> {
    images
        .iter()
        .map(|path| {
            image::open(path).map(|image| {
                (
                    path.file_name().unwrap().to_owned().into_string().unwrap(),
                    image.into_rgb8(),
                )
            })
        })
        .collect::<Result<_, _>>()
        .expect("loaded each image")
}

pub fn load_image_dir(dir: impl AsRef<Path>) -> Vec<(String, RgbImage)> {
    let mut paths = std::fs::read_dir(dir)
        .expect("read img directory")
        .collect::<Result<Vec<_>, _>>()
        .expect("read each file")
        .iter()
        .map(std::fs::DirEntry::path)
        .collect::<Vec<_>>();

    paths.sort();

    load_images(&paths)
}

/// A smooth gradient over all three channels.
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / (width - 1)) as u8;
        let g = (y * 255 / (height - 1)) as u8;
        let b = ((x + y) * 255 / (width + height - 2)) as u8;
        image::Rgb([r, g, b])
    })
}

/// Uniformly random pixels, the worst case for the octree.
pub fn noise(width: u32, height: u32, seed: u64) -> RgbImage {
    let mut rng = Xoroshiro128PlusPlus::seed_from_u64(seed);
    RgbImage::from_fn(width, height, |_, _| image::Rgb(rng.gen()))
}

/// A few flat colors with soft edges, like a rendered illustration.
pub fn bands(width: u32, height: u32) -> RgbImage {
    const COLORS: [[u8; 3]; 6] = [
        [230, 57, 70],
        [241, 250, 238],
        [168, 218, 220],
        [69, 123, 157],
        [29, 53, 87],
        [255, 183, 3],
    ];

    RgbImage::from_fn(width, height, |x, y| {
        let t = (x + y / 2) % (width / 3);
        let band = ((x + y / 2) / (width / 3)) as usize;
        let [a, b] = [COLORS[band % 6], COLORS[(band + 1) % 6]];
        let edge = (t * 255 / (width / 3)) as u16;
        image::Rgb([0, 1, 2].map(|c| {
            ((u16::from(a[c]) * (255 - edge) + u16::from(b[c]) * edge) / 255) as u8
        }))
    })
}

pub const IMAGE_DIR_VAR: &str = "OCTQUANT_BENCH_IMAGES";

static BENCHMARK_IMAGES: OnceLock<Vec<(String, RgbImage)>> = OnceLock::new();

/// The synthetic images, plus the images in the directory given by `OCTQUANT_BENCH_IMAGES` if set.
pub fn load_benchmark_images() -> Vec<(String, RgbImage)> {
    let mut images = vec![
        ("gradient".to_owned(), gradient(1024, 768)),
        ("noise".to_owned(), noise(1024, 768, 0)),
        ("bands".to_owned(), bands(1024, 768)),
    ];

    if let Some(dir) = std::env::var_os(IMAGE_DIR_VAR) {
        images.extend(load_image_dir(dir));
    }

    images
}

pub fn benchmark_images() -> &'static [(String, RgbImage)] {
    BENCHMARK_IMAGES.get_or_init(load_benchmark_images)
}

use std::collections::HashSet;

use octquant::{
    quantize, quantized, quantized_pixels, Dithering, ImagePipeline, OctreeDepth, QuantizeError,
    QuantizeOutput,
};
use palette::Srgb;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoroshiro128PlusPlus;

fn gradient(width: u32, height: u32) -> Vec<Srgb<u8>> {
    let mut pixels = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let r = (x * 255 / (width - 1)) as u8;
            let g = (y * 255 / (height - 1)) as u8;
            let b = ((x + y) * 255 / (width + height - 2)) as u8;
            pixels.push(Srgb::new(r, g, b));
        }
    }
    pixels
}

fn distinct_random_colors(n: usize, seed: u64) -> Vec<Srgb<u8>> {
    let mut rng = Xoroshiro128PlusPlus::seed_from_u64(seed);
    let mut seen = HashSet::new();
    let mut colors = Vec::with_capacity(n);
    while colors.len() < n {
        let [r, g, b] = rng.gen::<[u8; 3]>();
        if seen.insert([r, g, b]) {
            colors.push(Srgb::new(r, g, b));
        }
    }
    colors
}

fn assert_valid(output: &QuantizeOutput<Srgb<u8>>, len: usize) {
    assert!(!output.palette.is_empty());
    assert!(output.palette.len() <= 256);
    assert_eq!(output.indices.len(), len);
    assert_eq!(output.counts.len(), output.palette.len());
    for &i in &output.indices {
        assert!(usize::from(i) < output.palette.len());
    }
}

#[test]
fn uniform_image_is_indexed_exactly() {
    let red = Srgb::new(255, 0, 0);
    let pixels = vec![red; 100];

    let output = quantized(&pixels, 10, 10, Dithering::On, 5).unwrap();
    assert_eq!(output.palette, vec![red]);
    assert_eq!(output.indices, vec![0; 100]);
    assert_eq!(output.counts, vec![100]);
}

#[test]
fn many_random_colors_use_the_octree() {
    let mut pixels = distinct_random_colors(300, 7);
    pixels.extend_from_within(..20);
    assert_eq!(pixels.len(), 16 * 20);

    let output = quantized(&pixels, 16, 20, Dithering::On, 5).unwrap();
    assert_valid(&output, pixels.len());
    assert!(output.palette.len() < 300);
}

#[test]
fn dithering_changes_large_gradients() {
    let pixels = gradient(300, 300);

    let dithered = quantized(&pixels, 300, 300, Dithering::On, 5).unwrap();
    let direct = quantized(&pixels, 300, 300, Dithering::Off, 5).unwrap();

    assert_valid(&dithered, pixels.len());
    assert_valid(&direct, pixels.len());
    assert_eq!(dithered.palette, direct.palette);
    assert_ne!(dithered.indices, direct.indices);
}

#[test]
fn dithering_is_skipped_for_small_images() {
    let pixels = gradient(249, 249);
    for depth in [4, 5, 6] {
        assert_eq!(
            quantized(&pixels, 249, 249, Dithering::On, depth).unwrap(),
            quantized(&pixels, 249, 249, Dithering::Off, depth).unwrap(),
        );
    }
}

#[test]
fn dithering_applies_if_either_dimension_is_large() {
    let pixels = gradient(250, 40);
    assert_ne!(
        quantized(&pixels, 250, 40, Dithering::On, 5).unwrap(),
        quantized(&pixels, 250, 40, Dithering::Off, 5).unwrap(),
    );
}

#[test]
fn invalid_depth_is_rejected() {
    let pixels = gradient(10, 10);
    for depth in [0, 7, u8::MAX] {
        assert_eq!(
            quantized(&pixels, 10, 10, Dithering::Off, depth),
            Err(QuantizeError::InvalidDepth(depth)),
        );
    }

    // before the image is even looked at
    assert_eq!(
        quantized(&pixels, 3, 3, Dithering::Off, 0),
        Err(QuantizeError::InvalidDepth(0)),
    );
}

#[test]
fn dimension_mismatch_is_rejected() {
    let pixels = gradient(10, 10);
    assert_eq!(
        quantized(&pixels, 10, 9, Dithering::Off, 5),
        Err(QuantizeError::DimensionMismatch { len: 100, width: 10, height: 9 }),
    );
}

#[test]
fn few_colors_round_trip() {
    let palette = distinct_random_colors(256, 3);
    let mut rng = Xoroshiro128PlusPlus::seed_from_u64(4);
    let pixels = (0..300 * 300)
        .map(|_| palette[rng.gen_range(0..palette.len())])
        .collect::<Vec<_>>();

    let output = quantized(&pixels, 300, 300, Dithering::On, 4).unwrap();
    assert_eq!(output.palette.len(), 256);
    assert_eq!(output.materialize(), pixels);
    assert_eq!(output.palette[0], pixels[0]);
}

#[test]
fn every_depth_gives_valid_output() {
    let pixels = gradient(260, 100);
    for depth in 1..=6 {
        for dither in [Dithering::On, Dithering::Off] {
            let output = quantized(&pixels, 260, 100, dither, depth).unwrap();
            assert_valid(&output, pixels.len());
        }
    }
}

#[test]
fn deterministic() {
    let mut pixels = gradient(300, 260);
    pixels.extend(distinct_random_colors(300 * 40, 11));
    assert_eq!(
        quantized(&pixels, 300, 300, Dithering::On, 6).unwrap(),
        quantized(&pixels, 300, 300, Dithering::On, 6).unwrap(),
    );
}

#[test]
fn in_place_matches_materialized() {
    let pixels = gradient(280, 200);
    let expected = quantized_pixels(&pixels, 280, 200, Dithering::On, 5).unwrap();

    let mut image = pixels.clone();
    quantize(&mut image, 280, 200, Dithering::On, 5).unwrap();
    assert_eq!(image, expected);
    assert_eq!(
        expected,
        quantized(&pixels, 280, 200, Dithering::On, 5)
            .unwrap()
            .materialize()
    );
}

#[test]
fn in_place_leaves_input_on_error() {
    let mut pixels = gradient(20, 20);
    let original = pixels.clone();
    assert!(quantize(&mut pixels, 20, 20, Dithering::On, 9).is_err());
    assert_eq!(pixels, original);
}

#[test]
fn pipeline_matches_free_function() {
    let pixels = gradient(300, 300);
    let mut pipeline = ImagePipeline::new(pixels.as_slice().try_into().unwrap(), 300, 300).unwrap();
    pipeline.depth(OctreeDepth::SIX).dither(false);

    assert_eq!(
        pipeline.indexed_palette().unwrap(),
        quantized(&pixels, 300, 300, Dithering::Off, 6).unwrap(),
    );
}

#[cfg(feature = "threads")]
#[test]
fn parallel_matches_sequential() {
    let pixels = gradient(300, 300);
    for dither in [Dithering::On, Dithering::Off] {
        assert_eq!(
            quantized(&pixels, 300, 300, dither, 5).unwrap(),
            octquant::quantized_par(&pixels, 300, 300, dither, 5).unwrap(),
        );
    }
}

#[cfg(feature = "image")]
mod image_integration {
    use super::*;
    use image::{Rgba, RgbaImage};
    use octquant::{quantize_rgbaimage, quantized_rgbaimage, quantized_rgbimage};
    use palette::cast::IntoComponents;

    #[test]
    fn rgbimage_matches_slice() {
        let pixels = gradient(260, 120);
        let image = image::RgbImage::from_vec(260, 120, pixels.clone().into_components()).unwrap();

        let quantized = quantized_rgbimage(&image, Dithering::On, 5).unwrap();
        let expected: Vec<u8> = quantized_pixels(&pixels, 260, 120, Dithering::On, 5)
            .unwrap()
            .into_components();
        assert_eq!(quantized.into_raw(), expected);
    }

    #[test]
    fn alpha_is_dropped() {
        let pixels = gradient(64, 64);
        let mut image = RgbaImage::from_fn(64, 64, |x, y| {
            let [r, g, b] = palette::cast::into_array(pixels[(y * 64 + x) as usize]);
            Rgba([r, g, b, (x * 4) as u8])
        });

        let quantized = quantized_rgbaimage(&image, Dithering::Off, 5).unwrap();
        assert!(quantized.pixels().all(|p| p.0[3] == u8::MAX));

        let expected = quantized_pixels(&pixels, 64, 64, Dithering::Off, 5).unwrap();
        for (p, &e) in quantized.pixels().zip(&expected) {
            assert_eq!(&p.0[..3], &palette::cast::into_array(e)[..]);
        }

        quantize_rgbaimage(&mut image, Dithering::Off, 5).unwrap();
        assert_eq!(image, quantized);
    }
}

use image::{Rgb, RgbImage};
use statrs::statistics::Statistics;

/// Samples a `divisions` x `divisions` grid, column by column.
pub fn sample_grid(image: &RgbImage, divisions: u32) -> Vec<[u8; 3]> {
    let (width, height) = image.dimensions();
    let step_x = (width / divisions.max(1)).max(1);
    let step_y = (height / divisions.max(1)).max(1);

    let mut samples = Vec::new();
    for x in (0..width).step_by(step_x as usize) {
        for y in (0..height).step_by(step_y as usize) {
            samples.push(image.get_pixel(x, y).0);
        }
    }

    samples
}

pub fn pixel_at(image: &RgbImage, x: u32, y: u32) -> Option<[u8; 3]> {
    if x < image.width() && y < image.height() {
        Some(image.get_pixel(x, y).0)
    } else {
        None
    }
}

/// Sum of absolute per-channel differences, in `0..=765`.
pub fn channel_delta(a: &[u8; 3], b: &[u8; 3]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&p, &q)| (p as i32 - q as i32).unsigned_abs())
        .sum()
}

pub fn channel(samples: &[[u8; 3]], index: usize) -> Vec<f64> {
    samples.iter().map(|p| p[index] as f64).collect()
}

pub fn channel_range(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    hi - lo
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.mean()
}

pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.population_variance()
}

/// Synthetic fixture used by tests and benchmarks.
pub fn uniform_image(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(color))
}

/// Deterministic high-variance RGB content with distinct channel means.
pub fn textured_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let h = (x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663))
            .wrapping_mul(2_654_435_761);
        Rgb([
            100 + ((h >> 8) % 100) as u8,
            40 + ((h >> 16) % 100) as u8,
            10 + ((h >> 24) % 100) as u8,
        ])
    })
}

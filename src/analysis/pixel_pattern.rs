use std::collections::HashSet;

use crate::{
    CheckName, CheckOutcome,
    analysis::{Check, Sample},
    error::Result,
    image_utils::{channel, pixel_at, population_variance},
    learning::PatternSnapshot,
};

const EDGE_DIVISIONS: u32 = 50;
const CENTER_RADIUS: i64 = 5;
const SMOOTH_CENTER_VARIANCE: f64 = 100.0;

pub struct PixelPatternCheck;

impl PixelPatternCheck {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PixelPatternCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl Check for PixelPatternCheck {
    fn name(&self) -> CheckName {
        CheckName::PixelPattern
    }

    fn run(&self, sample: &Sample<'_>, _patterns: &PatternSnapshot) -> Result<CheckOutcome> {
        let rgb = &sample.image()?.rgb;
        let (width, height) = rgb.dimensions();
        let mut score = 0.0;
        let mut notes = Vec::new();

        let corners = [
            rgb.get_pixel(0, 0).0,
            rgb.get_pixel(width - 1, 0).0,
            rgb.get_pixel(0, height - 1).0,
            rgb.get_pixel(width - 1, height - 1).0,
        ];
        match corners.iter().collect::<HashSet<_>>().len() {
            1 => {
                score += 0.4;
                notes.push("Identical corner pixels (AI artifact)".to_owned());
            }
            2 => {
                score += 0.2;
                notes.push("Similar corner pixels".to_owned());
            }
            _ => {}
        }

        let step = (width / EDGE_DIVISIONS).max(1) as usize;
        let mut edge_pixels = Vec::new();
        for x in (0..width).step_by(step) {
            edge_pixels.push(rgb.get_pixel(x, 0).0);
            edge_pixels.push(rgb.get_pixel(x, height - 1).0);
        }
        let unique = edge_pixels.iter().collect::<HashSet<_>>().len();
        let edge_uniformity = 1.0 - unique as f64 / edge_pixels.len().max(1) as f64;
        if edge_uniformity > 0.8 {
            score += 0.3;
            notes.push("Highly uniform edge pixels".to_owned());
        } else if edge_uniformity > 0.5 {
            score += 0.1;
            notes.push("Moderately uniform edges".to_owned());
        }

        let (cx, cy) = ((width / 2) as i64, (height / 2) as i64);
        let center = (-CENTER_RADIUS..=CENTER_RADIUS)
            .flat_map(|dx| (-CENTER_RADIUS..=CENTER_RADIUS).map(move |dy| (cx + dx, cy + dy)))
            .filter(|&(x, y)| x >= 0 && y >= 0)
            .filter_map(|(x, y)| pixel_at(rgb, x as u32, y as u32))
            .collect::<Vec<_>>();
        if !center.is_empty() {
            let total_variance = (0..3)
                .map(|i| population_variance(&channel(&center, i)))
                .sum::<f64>();
            if total_variance < SMOOTH_CENTER_VARIANCE {
                score += 0.2;
                notes.push("Very smooth center region".to_owned());
            }
        }

        if notes.is_empty() {
            notes.push("Normal pixel patterns".to_owned());
        }

        Ok(CheckOutcome::new(score, notes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{ImageInput, tests::image_sample},
        image_utils::{textured_image, uniform_image},
        metadata::ImageMetadata,
    };
    use image::Rgb;

    fn run(rgb: image::RgbImage) -> CheckOutcome {
        let input = ImageInput::from_rgb(rgb, ImageMetadata::default());
        PixelPatternCheck::new()
            .run(&image_sample("x.png", &input), &PatternSnapshot::default())
            .unwrap()
    }

    #[test]
    fn test_textured_content_has_no_signal() {
        let outcome = run(textured_image(120, 90));
        assert_eq!(outcome.score, 0.0);
    }

    #[test]
    fn test_flat_image_hits_every_signal() {
        let outcome = run(uniform_image(100, 100, [200, 10, 10]));
        assert!((outcome.score - 0.9).abs() < 1e-9);
        assert_eq!(outcome.notes.len(), 3);
    }

    #[test]
    fn test_identical_corners_only() {
        let mut rgb = textured_image(120, 90);
        for (x, y) in [(0, 0), (119, 0), (0, 89), (119, 89)] {
            rgb.put_pixel(x, y, Rgb([7, 7, 7]));
        }
        let outcome = run(rgb);
        assert!((outcome.score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_single_pixel_image() {
        let outcome = run(uniform_image(1, 1, [0, 0, 0]));
        assert!(outcome.score > 0.0);
    }
}

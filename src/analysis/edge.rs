use crate::{
    CheckName, CheckOutcome,
    analysis::{Check, Sample},
    error::Result,
    image_utils::{channel_delta, mean},
    learning::PatternSnapshot,
};

const SCAN_LENGTH: u32 = 100;
const SHARP_DELTA: u32 = 100;
const MIN_SCAN_FOR_SHARPNESS: usize = 50;

/// Horizontal intensity scan through the middle row.
pub struct EdgeCheck;

impl EdgeCheck {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EdgeCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl Check for EdgeCheck {
    fn name(&self) -> CheckName {
        CheckName::Edge
    }

    fn run(&self, sample: &Sample<'_>, _patterns: &PatternSnapshot) -> Result<CheckOutcome> {
        let rgb = &sample.image()?.rgb;
        let (width, height) = rgb.dimensions();
        let row = height / 2;
        let mut score = 0.0;
        let mut notes = Vec::new();

        let deltas = (1..width.min(SCAN_LENGTH))
            .map(|x| channel_delta(&rgb.get_pixel(x - 1, row).0, &rgb.get_pixel(x, row).0))
            .collect::<Vec<_>>();

        if !deltas.is_empty() {
            let avg = mean(&deltas.iter().map(|&d| d as f64).collect::<Vec<_>>());

            if avg < 10.0 {
                score += 0.3;
                notes.push("Very smooth pixel transitions".to_owned());
            } else if avg < 20.0 {
                score += 0.1;
                notes.push("Smooth pixel transitions".to_owned());
            }

            let sharp = deltas.iter().filter(|&&d| d > SHARP_DELTA).count();
            if sharp == 0 && deltas.len() > MIN_SCAN_FOR_SHARPNESS {
                score += 0.2;
                notes.push("No sharp edges detected".to_owned());
            }
        }

        if notes.is_empty() {
            notes.push("Normal edge patterns".to_owned());
        }

        Ok(CheckOutcome::new(score, notes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{ImageInput, tests::image_sample},
        image_utils::uniform_image,
        metadata::ImageMetadata,
    };
    use image::{Rgb, RgbImage};

    fn run(rgb: RgbImage) -> CheckOutcome {
        let input = ImageInput::from_rgb(rgb, ImageMetadata::default());
        EdgeCheck::new()
            .run(&image_sample("x.png", &input), &PatternSnapshot::default())
            .unwrap()
    }

    #[test]
    fn test_flat_row_is_smooth_and_soft() {
        let outcome = run(uniform_image(120, 10, [50, 60, 70]));
        assert!((outcome.score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_stripes_are_normal() {
        let stripes = RgbImage::from_fn(120, 10, |x, _| {
            if x % 2 == 0 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
        });
        let outcome = run(stripes);
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.notes, vec!["Normal edge patterns".to_string()]);
    }

    #[test]
    fn test_short_scan_skips_sharpness_rule() {
        let outcome = run(uniform_image(30, 5, [1, 1, 1]));
        assert!((outcome.score - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_single_column_has_no_deltas() {
        let outcome = run(uniform_image(1, 8, [9, 9, 9]));
        assert_eq!(outcome.score, 0.0);
    }
}

use crate::{
    CheckName, CheckOutcome,
    analysis::{Check, Sample},
    error::Result,
    image_utils::{channel, channel_delta, channel_range, mean, sample_grid},
    learning::PatternSnapshot,
};

const GRID_DIVISIONS: u32 = 20;
const MIN_SAMPLES: usize = 10;
const INSUFFICIENT_SAMPLES_SCORE: f64 = 0.5;

pub struct ColorCheck;

impl ColorCheck {
    pub fn new() -> Self {
        Self
    }

    fn score_samples(&self, pixels: &[[u8; 3]]) -> CheckOutcome {
        if pixels.len() < MIN_SAMPLES {
            return CheckOutcome::new(
                INSUFFICIENT_SAMPLES_SCORE,
                vec!["Insufficient pixels for analysis".into()],
            );
        }

        let mut score = 0.0;
        let mut notes = Vec::new();

        let r = channel(pixels, 0);
        let g = channel(pixels, 1);
        let b = channel(pixels, 2);

        let avg_range = (channel_range(&r) + channel_range(&g) + channel_range(&b)) / 3.0;
        if avg_range < 50.0 {
            score += 0.3;
            notes.push("Very uniform color distribution".to_owned());
        } else if avg_range > 200.0 {
            notes.push("High color variation (natural)".to_owned());
        }

        let (r_avg, g_avg, b_avg) = (mean(&r), mean(&g), mean(&b));
        let balance = channel_balance(r_avg, g_avg, b_avg);
        if balance < 30.0 {
            score += 0.2;
            notes.push("Unusually balanced color channels".to_owned());
        }

        let saturated = pixels
            .iter()
            .filter(|p| p.iter().any(|&c| c > 250) || p.iter().any(|&c| c < 5))
            .count();
        if saturated as f64 / pixels.len() as f64 > 0.3 {
            score += 0.2;
            notes.push("High saturation levels detected".to_owned());
        }

        let gradient = gradient_smoothness(pixels);
        score += gradient * 0.1;
        if gradient > 0.5 {
            notes.push("Unnatural color gradients detected".to_owned());
        }

        let palette = palette_score(r_avg, g_avg, b_avg);
        score += palette * 0.1;
        if palette > 0.5 {
            notes.push("AI-typical color palette detected".to_owned());
        }

        if notes.is_empty() {
            notes.push("Normal color distribution".to_owned());
        }

        CheckOutcome::new(score, notes)
    }
}

impl Default for ColorCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl Check for ColorCheck {
    fn name(&self) -> CheckName {
        CheckName::Color
    }

    fn run(&self, sample: &Sample<'_>, _patterns: &PatternSnapshot) -> Result<CheckOutcome> {
        let pixels = sample_grid(&sample.image()?.rgb, GRID_DIVISIONS);
        Ok(self.score_samples(&pixels))
    }
}

fn channel_balance(r: f64, g: f64, b: f64) -> f64 {
    (r - g).abs() + (g - b).abs() + (r - b).abs()
}

/// Smoothness of consecutive samples along the scan order.
fn gradient_smoothness(pixels: &[[u8; 3]]) -> f64 {
    if pixels.len() < 4 {
        return 0.0;
    }

    let differences = pixels
        .windows(2)
        .map(|w| channel_delta(&w[0], &w[1]) as f64)
        .collect::<Vec<_>>();

    let avg_diff = mean(&differences);
    let max_diff = differences.iter().copied().fold(0.0, f64::max);

    if avg_diff < 15.0 && max_diff < 50.0 {
        0.7
    } else if avg_diff < 25.0 {
        0.3
    } else {
        0.0
    }
}

fn palette_score(r: f64, g: f64, b: f64) -> f64 {
    let mid = |c: f64| c > 100.0 && c < 180.0;

    if channel_balance(r, g, b) < 20.0 {
        0.6
    } else if mid(r) && mid(g) && mid(b) {
        0.3
    } else if r.max(g).max(b) > 220.0 && r.min(g).min(b) < 50.0 {
        0.4
    } else {
        0.0
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

    fn run(rgb: image::RgbImage) -> CheckOutcome {
        let input = ImageInput::from_rgb(rgb, ImageMetadata::default());
        ColorCheck::new()
            .run(&image_sample("x.png", &input), &PatternSnapshot::default())
            .unwrap()
    }

    #[test]
    fn test_textured_content_is_unremarkable() {
        let outcome = run(textured_image(200, 150));
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.notes, vec!["Normal color distribution".to_string()]);
    }

    #[test]
    fn test_flat_gray_is_flagged() {
        let outcome = run(uniform_image(64, 64, [128, 128, 128]));
        // uniform + balanced + smooth gradient + balanced palette
        assert!((outcome.score - (0.3 + 0.2 + 0.07 + 0.06)).abs() < 1e-9);
        assert!(outcome.notes.iter().any(|n| n.contains("uniform")));
    }

    #[test]
    fn test_tiny_image_has_too_few_samples() {
        let outcome = run(uniform_image(3, 3, [1, 2, 3]));
        assert_eq!(outcome.score, INSUFFICIENT_SAMPLES_SCORE);
    }

    #[test]
    fn test_palette_bands() {
        assert_eq!(palette_score(128.0, 128.0, 128.0), 0.6);
        assert_eq!(palette_score(110.0, 150.0, 170.0), 0.3);
        assert_eq!(palette_score(240.0, 120.0, 20.0), 0.4);
        assert_eq!(palette_score(150.0, 90.0, 60.0), 0.0);
    }
}

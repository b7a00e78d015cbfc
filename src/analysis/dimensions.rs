use crate::{
    CheckName, CheckOutcome,
    analysis::{Check, Sample},
    error::Result,
    learning::PatternSnapshot,
};

pub const NON_MATCH_SCORE: f64 = 0.2;
pub const EXACT_MATCH_SCORE: f64 = 0.9;
const SQUARE_BONUS: f64 = 0.3;
const POWER_OF_TWO_BONUS: f64 = 0.2;
const DIVISIBLE_BY_64_BONUS: f64 = 0.25;

/// Default output sizes of common diffusion front-ends.
const GENERATOR_SIZES: [(u32, u32); 15] = [
    (512, 512),
    (768, 768),
    (1024, 1024),
    (2048, 2048),
    (512, 768),
    (768, 512),
    (768, 1024),
    (1024, 768),
    (896, 1152),
    (1152, 896),
    (1024, 1536),
    (1536, 1024),
    (640, 640),
    (832, 1216),
    (1216, 832),
];

pub struct DimensionsCheck;

impl DimensionsCheck {
    pub fn new() -> Self {
        Self
    }

    pub fn score_size(width: u32, height: u32) -> CheckOutcome {
        let mut score = NON_MATCH_SCORE;
        let mut notes = Vec::new();

        if GENERATOR_SIZES.contains(&(width, height)) {
            score = EXACT_MATCH_SCORE;
            notes.push(format!("Exact AI-typical dimensions: {width}x{height}"));
        }

        if width == height {
            score += SQUARE_BONUS;
            notes.push("Perfect square aspect ratio (common in AI)".to_owned());
        }

        if width.is_power_of_two() || height.is_power_of_two() {
            score += POWER_OF_TWO_BONUS;
            notes.push("Power-of-2 dimension detected (AI typical)".to_owned());
        }

        if width % 64 == 0 && height % 64 == 0 {
            score += DIVISIBLE_BY_64_BONUS;
            notes.push("Dimensions divisible by 64 (diffusion model typical)".to_owned());
        }

        if notes.is_empty() {
            notes.push(format!("Dimensions: {width}x{height}"));
        }

        CheckOutcome::new(score, notes)
    }
}

impl Default for DimensionsCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl Check for DimensionsCheck {
    fn name(&self) -> CheckName {
        CheckName::Dimensions
    }

    fn run(&self, sample: &Sample<'_>, _patterns: &PatternSnapshot) -> Result<CheckOutcome> {
        let (width, height) = sample.image()?.dimensions();
        Ok(Self::score_size(width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_generator_size() {
        let outcome = DimensionsCheck::score_size(512, 512);
        assert!(outcome.score >= EXACT_MATCH_SCORE);
        assert_eq!(outcome.score, 1.0);
    }

    #[test]
    fn test_irregular_size_stays_at_baseline() {
        let outcome = DimensionsCheck::score_size(613, 481);
        assert!(outcome.score <= NON_MATCH_SCORE);
        assert_eq!(outcome.notes, vec!["Dimensions: 613x481".to_string()]);
    }

    #[test]
    fn test_camera_sensor_size() {
        let outcome = DimensionsCheck::score_size(4032, 3024);
        assert_eq!(outcome.score, NON_MATCH_SCORE);
    }

    #[test]
    fn test_bonuses_accumulate() {
        // 1280x640: divisible by 64, no power of two, not square
        let outcome = DimensionsCheck::score_size(1280, 640);
        assert!((outcome.score - (NON_MATCH_SCORE + DIVISIBLE_BY_64_BONUS)).abs() < 1e-9);

        let square = DimensionsCheck::score_size(300, 300);
        assert!((square.score - (NON_MATCH_SCORE + SQUARE_BONUS)).abs() < 1e-9);
    }
}

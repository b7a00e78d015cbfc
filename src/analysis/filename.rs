use std::path::Path;

use regex::Regex;

use crate::{
    CheckName, CheckOutcome, MediaKind,
    analysis::{Check, Sample},
    config::LearningConfig,
    error::{FalsifyError, Result},
    learning::PatternSnapshot,
};

#[derive(Debug, Clone, Copy)]
pub(crate) enum Needle {
    /// Anywhere in the lowercased name.
    Substring(&'static str),
    /// A whole token after splitting on `_`, `-`, `.` and whitespace.
    Token(&'static str),
}

impl Needle {
    pub(crate) fn matches(&self, lower: &str, tokens: &[&str]) -> bool {
        match self {
            Needle::Substring(s) => lower.contains(s),
            Needle::Token(t) => tokens.contains(t),
        }
    }

    fn text(&self) -> &'static str {
        match self {
            Needle::Substring(s) | Needle::Token(s) => *s,
        }
    }
}

/// Splits a lowercased filename into the tokens `Needle::Token` is matched against.
pub(crate) fn name_tokens(lower: &str) -> Vec<&str> {
    lower
        .split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Tool and keyword indicators. Every match counts once; a substring nested in a
/// longer matched one ("fake" in "deepfake") is skipped.
const INDICATORS: [(Needle, f64, &str); 14] = [
    (Needle::Substring("dalle"), 0.7, "DALL-E reference in filename"),
    (Needle::Substring("dall-e"), 0.7, "DALL-E reference in filename"),
    (Needle::Substring("midjourney"), 0.7, "Midjourney reference in filename"),
    (Needle::Substring("stable_diffusion"), 0.7, "Stable Diffusion reference"),
    (Needle::Substring("stablediffusion"), 0.7, "Stable Diffusion reference"),
    (Needle::Substring("deepfake"), 0.7, "Deepfake keyword"),
    (Needle::Substring("stylegan"), 0.6, "StyleGAN reference"),
    (Needle::Substring("comfy"), 0.6, "ComfyUI reference"),
    (Needle::Substring("synthetic"), 0.6, "Synthetic keyword"),
    (Needle::Substring("fake"), 0.6, "Fake keyword"),
    (Needle::Substring("generated"), 0.5, "Generated keyword"),
    (Needle::Token("sd"), 0.5, "SD prefix (Stable Diffusion)"),
    (Needle::Token("ai"), 0.5, "AI token"),
    (Needle::Token("gan"), 0.5, "GAN reference"),
];

const PARAMETER_PATTERNS: [(&str, f64, &str); 4] = [
    (r"seed[_-]?\d+", 0.4, "Seed parameter in filename"),
    (r"cfg[_-]?\d+", 0.4, "CFG scale in filename"),
    (r"steps[_-]?\d+", 0.4, "Steps parameter in filename"),
    (r"\d{13,}", 0.2, "Timestamp pattern (AI tool output)"),
];

const UUID_PATTERN: &str = r"[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}";
const UUID_SCORE: f64 = 0.3;

const PLACEHOLDER_PATTERN: &str =
    r"^(?:output|untitled|image|download|result|sample|generated_image)[\s_\-()\d]*$";
const PLACEHOLDER_SCORE: f64 = 0.25;

const AUDIO_INDICATORS: [&str; 9] = [
    "tts",
    "text_to_speech",
    "voice_clone",
    "elevenlabs",
    "bark",
    "tortoise",
    "ai_voice",
    "generated",
    "synthetic",
];
const AUDIO_INDICATOR_SCORE: f64 = 0.6;

pub struct FilenameCheck {
    learning: LearningConfig,
    parameters: Vec<(Regex, f64, &'static str)>,
    uuid: Regex,
    placeholder: Regex,
}

impl FilenameCheck {
    pub fn new(learning: LearningConfig) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| FalsifyError::InvalidParameter(e.to_string()))
        };

        let parameters = PARAMETER_PATTERNS
            .iter()
            .map(|&(pattern, score, note)| Ok((compile(pattern)?, score, note)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            learning,
            parameters,
            uuid: compile(UUID_PATTERN)?,
            placeholder: compile(PLACEHOLDER_PATTERN)?,
        })
    }

    pub fn score_name(
        &self,
        filename: &str,
        kind: MediaKind,
        patterns: &PatternSnapshot,
    ) -> CheckOutcome {
        let lower = filename.to_lowercase();
        let tokens = name_tokens(&lower);
        // Contributions combine as 1 - Π(1 - s), so each one raises the score and
        // the total stays below 1.
        let mut miss = 1.0;
        let mut notes = Vec::new();

        let learned = patterns.learned_filename_score(filename, &self.learning);
        if learned > 0.0 {
            miss *= 1.0 - learned * self.learning.learned_token_factor;
            notes.push(format!("Learning system contribution: {learned:.2}"));
        }

        let hits = INDICATORS
            .iter()
            .filter(|(needle, _, _)| needle.matches(&lower, &tokens))
            .collect::<Vec<_>>();
        let mut seen_notes = Vec::new();
        for (needle, indicator_score, note) in &hits {
            let nested = matches!(needle, Needle::Substring(_))
                && hits.iter().any(|(other, _, _)| {
                    other.text() != needle.text() && other.text().contains(needle.text())
                });
            if nested || seen_notes.contains(note) {
                continue;
            }
            seen_notes.push(*note);
            miss *= 1.0 - indicator_score;
            notes.push((*note).to_owned());
        }

        for (pattern, pattern_score, note) in &self.parameters {
            if pattern.is_match(&lower) {
                miss *= 1.0 - pattern_score;
                notes.push((*note).to_owned());
            }
        }

        if self.uuid.is_match(&lower) {
            miss *= 1.0 - UUID_SCORE;
            notes.push("UUID pattern in filename".to_owned());
        }

        let stem = Path::new(&lower)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.placeholder.is_match(&stem) {
            miss *= 1.0 - PLACEHOLDER_SCORE;
            notes.push("Generic placeholder filename".to_owned());
        }

        if kind == MediaKind::Audio {
            for indicator in AUDIO_INDICATORS {
                if lower.contains(indicator) {
                    miss *= 1.0 - AUDIO_INDICATOR_SCORE;
                    notes.push(format!("Audio AI indicator: {indicator}"));
                }
            }
        }

        if notes.is_empty() {
            notes.push("No AI indicators in filename".to_owned());
        }

        CheckOutcome::new(1.0 - miss, notes)
    }
}

impl Check for FilenameCheck {
    fn name(&self) -> CheckName {
        CheckName::Filename
    }

    fn run(&self, sample: &Sample<'_>, patterns: &PatternSnapshot) -> Result<CheckOutcome> {
        Ok(self.score_name(sample.filename, sample.kind, patterns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(name: &str) -> f64 {
        FilenameCheck::new(LearningConfig::default())
            .unwrap()
            .score_name(name, MediaKind::Image, &PatternSnapshot::default())
            .score
    }

    #[test]
    fn test_plain_names_score_zero() {
        assert_eq!(score("IMG_20230101_142233.jpg"), 0.0);
        assert_eq!(score("holiday beach.png"), 0.0);
        assert_eq!(score("organic_elegant.png"), 0.0);
    }

    #[test]
    fn test_tool_token_strictly_raises_score() {
        for (with_tool, without) in [
            ("midjourney_cat.png", "cat.png"),
            ("cat_dalle.png", "cat.png"),
            ("portrait_fake.png", "portrait.png"),
            ("sd_landscape.png", "landscape.png"),
            ("stylegan-face.jpg", "face.jpg"),
        ] {
            assert!(score(with_tool) > score(without), "{with_tool} vs {without}");
        }
    }

    #[test]
    fn test_nested_keyword_counts_once() {
        assert!((score("deepfake.png") - 0.7).abs() < 1e-9);
        assert!((score("deepfake_fake.png") - 0.7).abs() < 1e-9);
        assert!((score("dalle_dall-e.png") - 0.7).abs() < 1e-9);
        // 1 - 0.3 * 0.4
        assert!((score("midjourney_fake.png") - 0.88).abs() < 1e-9);
    }

    #[test]
    fn test_parameter_and_uuid_patterns() {
        assert!((score("seed_1234_cfg7.png") - 0.64).abs() < 1e-9);
        assert!((score("1700000000000.png") - 0.2).abs() < 1e-9);
        assert!(
            (score("3f2504e0-4f89-11d3-9a0c-0305e82c3301.png") - UUID_SCORE).abs() < 1e-9
        );
    }

    #[test]
    fn test_placeholder_names() {
        assert!((score("output_0003.png") - PLACEHOLDER_SCORE).abs() < 1e-9);
        assert!((score("image (2).jpg") - PLACEHOLDER_SCORE).abs() < 1e-9);
        assert_eq!(score("image_of_my_dog.jpg"), 0.0);
    }

    #[test]
    fn test_audio_indicators_only_apply_to_audio() {
        let check = FilenameCheck::new(LearningConfig::default()).unwrap();
        let patterns = PatternSnapshot::default();
        let audio = check.score_name("elevenlabs_clip.mp3", MediaKind::Audio, &patterns);
        let image = check.score_name("elevenlabs_clip.mp3", MediaKind::Image, &patterns);
        assert!((audio.score - AUDIO_INDICATOR_SCORE).abs() < 1e-9);
        assert_eq!(image.score, 0.0);
    }

    #[test]
    fn test_busy_names_still_rise_with_tool_tokens() {
        let bases = [
            "seed1_cfg2_steps3.png",
            "seed42_cfg7_steps30_1700000000000.png",
            "3f2504e0-4f89-11d3-9a0c-0305e82c3301_seed9_cfg3.png",
            "ai_portrait_seed5_steps20.png",
            "synthetic_generated_seed1_cfg1_steps1.png",
        ];
        let tools = ["midjourney", "dalle", "stylegan", "comfy", "deepfake", "sd", "gan"];

        for base in bases {
            let without = score(base);
            assert!(without < 1.0, "{base} saturated at {without}");
            for tool in tools {
                let name = format!("{tool}_{base}");
                let with = score(&name);
                assert!(with > without, "{name}: {with} <= {without}");
                assert!(with < 1.0, "{name} saturated");
            }
        }
    }

    #[test]
    fn test_audio_score_stays_below_one() {
        let check = FilenameCheck::new(LearningConfig::default()).unwrap();
        let outcome = check.score_name(
            "elevenlabs_tts_bark_tortoise_voice_clone_ai_voice_seed1.wav",
            MediaKind::Audio,
            &PatternSnapshot::default(),
        );
        assert!(outcome.score > 0.99 && outcome.score < 1.0);
    }
}

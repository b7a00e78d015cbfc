pub mod scorer;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    CheckName, CheckOutcome, MediaKind,
    analysis::filename::{Needle, name_tokens},
    config::VerdictThresholds,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    MediumHigh,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    LikelyAiGenerated,
    PossiblyAiGenerated,
    Suspicious,
    LikelyAuthentic,
    Inconclusive,
}

impl Verdict {
    pub fn from_score(score: f64, thresholds: &VerdictThresholds) -> (Self, ConfidenceLevel) {
        match score {
            s if s > thresholds.likely_ai => (Verdict::LikelyAiGenerated, ConfidenceLevel::High),
            s if s >= thresholds.possibly_ai => {
                (Verdict::PossiblyAiGenerated, ConfidenceLevel::MediumHigh)
            }
            s if s >= thresholds.suspicious => (Verdict::Suspicious, ConfidenceLevel::Medium),
            s if s < thresholds.suspicious - thresholds.authentic_margin => {
                (Verdict::LikelyAuthentic, ConfidenceLevel::High)
            }
            _ => (Verdict::LikelyAuthentic, ConfidenceLevel::Low),
        }
    }

    /// Binary reading of the verdict used when grading user feedback.
    pub fn is_ai(&self) -> bool {
        matches!(
            self,
            Verdict::LikelyAiGenerated | Verdict::PossiblyAiGenerated
        )
    }

    pub fn recommendation(&self, kind: MediaKind) -> &'static str {
        match (self, kind) {
            (Verdict::Inconclusive, _) => {
                "Could not analyze this file. Treat it as suspicious and verify the source manually."
            }
            (Verdict::LikelyAiGenerated, MediaKind::Image) => {
                "HIGH PROBABILITY of AI generation. This image shows strong signs of being artificially created. Exercise caution."
            }
            (Verdict::PossiblyAiGenerated, MediaKind::Image) => {
                "MODERATE PROBABILITY of AI generation. Some characteristics suggest this may be AI-generated. Verify the source."
            }
            (Verdict::Suspicious, MediaKind::Image) => {
                "UNCERTAIN - Image shows some AI-like characteristics but is inconclusive. Manual review recommended."
            }
            (Verdict::LikelyAuthentic, MediaKind::Image) => {
                "LOW PROBABILITY of AI generation. This image appears to be authentic based on our analysis."
            }
            (Verdict::LikelyAiGenerated | Verdict::PossiblyAiGenerated, MediaKind::Video) => {
                "HIGH PROBABILITY of AI-generated content. Video files are commonly manipulated or AI-generated."
            }
            (Verdict::LikelyAiGenerated | Verdict::PossiblyAiGenerated, MediaKind::Audio) => {
                "HIGH PROBABILITY of AI-generated audio. Voice cloning and TTS are very common."
            }
            (Verdict::Suspicious, MediaKind::Video) => {
                "SUSPICIOUS - Only filename and container analysis was performed. Verify frame content independently."
            }
            (Verdict::Suspicious, MediaKind::Audio) => {
                "SUSPICIOUS - Audio content should be verified with full spectral analysis."
            }
            (Verdict::LikelyAuthentic, _) => {
                "LOW PROBABILITY of AI generation based on filename and container analysis."
            }
        }
    }
}

/// Matched the same way as the filename check's indicators, so short names
/// like `gan` and `sd` only label whole tokens.
const FILENAME_METHODS: [(Needle, &str); 9] = [
    (Needle::Substring("dalle"), "DALL-E"),
    (Needle::Substring("dall-e"), "DALL-E"),
    (Needle::Substring("midjourney"), "Midjourney"),
    (Needle::Substring("stable_diffusion"), "Stable Diffusion"),
    (Needle::Substring("stablediffusion"), "Stable Diffusion"),
    (Needle::Token("sd"), "Stable Diffusion"),
    (Needle::Substring("stylegan"), "StyleGAN"),
    (Needle::Substring("deepfake"), "Deepfake"),
    (Needle::Token("gan"), "GAN"),
];

const METADATA_METHODS: [(&str, &str); 5] = [
    ("Stable Diffusion", "Stable Diffusion"),
    ("Midjourney", "Midjourney"),
    ("DALL-E", "DALL-E"),
    ("ComfyUI", "Stable Diffusion (ComfyUI)"),
    ("NovelAI", "NovelAI"),
];

/// Best-effort label for the tool that produced the content.
pub fn generation_method(
    filename: &str,
    score: f64,
    breakdown: &BTreeMap<CheckName, CheckOutcome>,
    thresholds: &VerdictThresholds,
) -> String {
    let lower = filename.to_lowercase();
    let tokens = name_tokens(&lower);
    if let Some((_, method)) = FILENAME_METHODS
        .iter()
        .find(|(needle, _)| needle.matches(&lower, &tokens))
    {
        return (*method).to_owned();
    }

    if let Some(metadata) = breakdown.get(&CheckName::Metadata) {
        for note in &metadata.notes {
            if let Some((_, method)) = METADATA_METHODS
                .iter()
                .find(|(needle, _)| note.contains(needle))
            {
                return (*method).to_owned();
            }
        }
    }

    if score > thresholds.likely_ai {
        "AI-Generated (Method Unknown)".into()
    } else if score >= thresholds.possibly_ai {
        "Possibly AI-Generated".into()
    } else {
        "Not Detected".into()
    }
}

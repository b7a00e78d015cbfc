use crate::{
    CheckName, CheckOutcome,
    analysis::{Check, Sample},
    error::Result,
    learning::PatternSnapshot,
    metadata::exif::ExifStatus,
};

const NO_EXIF_SCORE: f64 = 0.9;
const UNREADABLE_EXIF_SCORE: f64 = 0.8;
const NO_CAMERA_SCORE: f64 = 0.7;
const CAMERA_SCORE: f64 = 0.15;

/// (needle, score, note). First match wins and overrides the EXIF score.
const AI_SIGNATURES: [(&str, f64, &str); 11] = [
    ("stable diffusion", 1.0, "Stable Diffusion signature detected"),
    ("midjourney", 1.0, "Midjourney signature detected"),
    ("dall-e", 1.0, "DALL-E signature detected"),
    ("comfyui", 0.95, "ComfyUI signature detected"),
    ("automatic1111", 0.95, "Automatic1111 signature detected"),
    ("novelai", 0.95, "NovelAI signature detected"),
    ("parameters", 0.9, "Generation parameters found"),
    ("prompt", 0.85, "Prompt data found in metadata"),
    ("cfg scale", 0.9, "CFG scale parameter found"),
    ("sampler", 0.85, "Sampler information found"),
    ("steps", 0.8, "Generation steps found"),
];

pub struct MetadataCheck;

impl MetadataCheck {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MetadataCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl Check for MetadataCheck {
    fn name(&self) -> CheckName {
        CheckName::Metadata
    }

    fn run(&self, sample: &Sample<'_>, _patterns: &PatternSnapshot) -> Result<CheckOutcome> {
        let metadata = &sample.image()?.metadata;
        let mut notes = Vec::new();

        let mut score = match metadata.exif {
            ExifStatus::Missing => {
                notes.push("No EXIF metadata (strong indicator of AI generation)".to_owned());
                NO_EXIF_SCORE
            }
            ExifStatus::Unreadable(ref reason) => {
                notes.push(format!("Could not read EXIF data ({reason})"));
                UNREADABLE_EXIF_SCORE
            }
            ExifStatus::Present if metadata.camera.has_any() => {
                notes.push("Camera metadata found (likely real photo)".to_owned());
                CAMERA_SCORE
            }
            ExifStatus::Present => {
                notes.push("EXIF present but no camera information (suspicious)".to_owned());
                NO_CAMERA_SCORE
            }
        };

        let text = metadata.auxiliary_text();
        if !text.is_empty() {
            if let Some((_, sig_score, note)) = AI_SIGNATURES
                .iter()
                .find(|(needle, _, _)| text.contains(needle))
            {
                score = *sig_score;
                notes.push((*note).to_owned());
            }
        }

        Ok(CheckOutcome::new(score, notes))
    }
}

use std::path::Path;

use crate::{
    CheckName, CheckOutcome,
    analysis::{Check, Sample},
    error::Result,
    learning::PatternSnapshot,
};

const BASE_SCORE: f64 = 0.3;
const UNRECOGNISED_BONUS: f64 = 0.3;
const MISMATCH_BONUS: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    IsoBmff,
    Matroska,
    Avi,
    Wave,
    Ogg,
    Flac,
    Mpeg,
}

impl Container {
    /// Magic-byte sniffing of the first few bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
            return Some(Container::IsoBmff);
        }
        if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
            return Some(Container::Matroska);
        }
        if bytes.len() >= 12 && bytes.starts_with(b"RIFF") {
            return match &bytes[8..12] {
                b"AVI " => Some(Container::Avi),
                b"WAVE" => Some(Container::Wave),
                _ => None,
            };
        }
        if bytes.starts_with(b"OggS") {
            return Some(Container::Ogg);
        }
        if bytes.starts_with(b"fLaC") {
            return Some(Container::Flac);
        }
        if bytes.starts_with(b"ID3")
            || (bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0)
        {
            return Some(Container::Mpeg);
        }
        None
    }

    pub fn for_extension(extension: &str) -> Option<Self> {
        match extension {
            "mp4" | "mov" | "m4a" => Some(Container::IsoBmff),
            "webm" | "mkv" => Some(Container::Matroska),
            "avi" => Some(Container::Avi),
            "wav" => Some(Container::Wave),
            "ogg" => Some(Container::Ogg),
            "flac" => Some(Container::Flac),
            "mp3" => Some(Container::Mpeg),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Container::IsoBmff => "MP4/QuickTime",
            Container::Matroska => "Matroska/WebM",
            Container::Avi => "AVI",
            Container::Wave => "WAV",
            Container::Ogg => "Ogg",
            Container::Flac => "FLAC",
            Container::Mpeg => "MPEG audio",
        }
    }
}

/// Container-versus-extension consistency for uploads that are not decoded.
pub struct FormatCheck;

impl FormatCheck {
    pub fn new() -> Self {
        Self
    }

    pub fn score_container(filename: &str, bytes: &[u8]) -> CheckOutcome {
        let mut score = BASE_SCORE;
        let mut notes = Vec::new();

        let extension = Path::new(filename)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let expected = Container::for_extension(&extension);

        match Container::sniff(bytes) {
            None => {
                score += UNRECOGNISED_BONUS;
                notes.push("Unrecognised container format".to_owned());
            }
            Some(found) => {
                notes.push(format!("Container: {}", found.label()));
                if expected.is_some_and(|e| e != found) {
                    score += MISMATCH_BONUS;
                    notes.push(format!(
                        "Container does not match .{extension} extension"
                    ));
                }
            }
        }

        CheckOutcome::new(score, notes)
    }
}

impl Default for FormatCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl Check for FormatCheck {
    fn name(&self) -> CheckName {
        CheckName::Format
    }

    fn run(&self, sample: &Sample<'_>, _patterns: &PatternSnapshot) -> Result<CheckOutcome> {
        Ok(Self::score_container(sample.filename, sample.bytes))
    }
}

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    CheckName, MediaKind,
    error::{FalsifyError, Result},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckWeights {
    pub metadata: f64,
    pub dimensions: f64,
    pub color: f64,
    pub pixel_pattern: f64,
    pub filename: f64,
    pub edge: f64,
    pub format: f64,
}

impl CheckWeights {
    pub fn image() -> Self {
        Self {
            metadata: 0.30,
            dimensions: 0.25,
            color: 0.15,
            pixel_pattern: 0.08,
            filename: 0.10,
            edge: 0.02,
            format: 0.0,
        }
    }

    pub fn media() -> Self {
        Self {
            metadata: 0.0,
            dimensions: 0.0,
            color: 0.0,
            pixel_pattern: 0.0,
            filename: 0.35,
            edge: 0.0,
            format: 0.15,
        }
    }

    pub fn weight(&self, check: CheckName) -> f64 {
        match check {
            CheckName::Metadata => self.metadata,
            CheckName::Dimensions => self.dimensions,
            CheckName::Color => self.color,
            CheckName::PixelPattern => self.pixel_pattern,
            CheckName::Filename => self.filename,
            CheckName::Edge => self.edge,
            CheckName::Format => self.format,
        }
    }

    pub fn total(&self) -> f64 {
        CheckName::ALL.iter().map(|&c| self.weight(c)).sum()
    }
}

/// Lower bounds of each verdict band; scores below `suspicious` read as authentic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictThresholds {
    pub likely_ai: f64,
    pub possibly_ai: f64,
    pub suspicious: f64,
    pub authentic_margin: f64,
}

impl VerdictThresholds {
    pub fn image() -> Self {
        Self {
            likely_ai: 0.85,
            possibly_ai: 0.65,
            suspicious: 0.45,
            authentic_margin: 0.15,
        }
    }

    pub fn media() -> Self {
        Self {
            likely_ai: 0.75,
            possibly_ai: 0.60,
            suspicious: 0.45,
            authentic_margin: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaProfile {
    pub baseline_bias: f64,
    pub weights: CheckWeights,
    pub thresholds: VerdictThresholds,
}

impl MediaProfile {
    pub fn image() -> Self {
        Self {
            baseline_bias: 0.30,
            weights: CheckWeights::image(),
            thresholds: VerdictThresholds::image(),
        }
    }

    pub fn media() -> Self {
        Self {
            baseline_bias: 0.50,
            weights: CheckWeights::media(),
            thresholds: VerdictThresholds::media(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub min_samples: f64,
    pub adjustment_factor: f64,
    pub token_min_len: usize,
    pub token_delimiter: char,
    pub learned_token_factor: f64,
    pub unsupervised_weight: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            min_samples: 10.0,
            adjustment_factor: 0.1,
            token_min_len: 3,
            token_delimiter: '_',
            learned_token_factor: 0.3,
            unsupervised_weight: 0.5,
        }
    }
}

impl LearningConfig {
    /// Lowercased tokens eligible for pattern statistics.
    pub fn tokens(&self, filename: &str) -> Vec<String> {
        filename
            .to_lowercase()
            .split(self.token_delimiter)
            .filter(|word| word.chars().count() >= self.token_min_len)
            .map(str::to_owned)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub image: MediaProfile,
    pub video: MediaProfile,
    pub audio: MediaProfile,
    pub learning: LearningConfig,
    pub failed_check_score: f64,
    pub fallback_score: f64,
    pub artifact_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            image: MediaProfile::image(),
            video: MediaProfile::media(),
            audio: MediaProfile::media(),
            learning: LearningConfig::default(),
            failed_check_score: 0.5,
            fallback_score: 0.5,
            artifact_threshold: 0.3,
        }
    }
}

impl EngineConfig {
    /// Reads a partial override. Every field left out keeps the default of the
    /// profile it belongs to, so a `video` table only has to name what it changes.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;
        overlay(&mut merged, serde_json::from_str(json)?);
        let config: Self = serde_json::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn profile(&self, kind: MediaKind) -> &MediaProfile {
        match kind {
            MediaKind::Image => &self.image,
            MediaKind::Video => &self.video,
            MediaKind::Audio => &self.audio,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for kind in [MediaKind::Image, MediaKind::Video, MediaKind::Audio] {
            let profile = self.profile(kind);
            unit_interval(&format!("{kind} baseline_bias"), profile.baseline_bias)?;

            for check in CheckName::ALL {
                unit_interval(
                    &format!("{kind} weight for {check}"),
                    profile.weights.weight(check),
                )?;
            }

            let total = profile.weights.total();
            if total > 1.0 + 1e-9 {
                return Err(FalsifyError::InvalidParameter(format!(
                    "{kind} weights sum to {total:.3}, must not exceed 1.0"
                )));
            }

            let t = &profile.thresholds;
            unit_interval(&format!("{kind} likely_ai threshold"), t.likely_ai)?;
            unit_interval(&format!("{kind} suspicious threshold"), t.suspicious)?;
            unit_interval(&format!("{kind} authentic_margin"), t.authentic_margin)?;
            if !(t.likely_ai > t.possibly_ai && t.possibly_ai > t.suspicious) {
                return Err(FalsifyError::InvalidParameter(format!(
                    "{kind} thresholds must be strictly decreasing (likely_ai > possibly_ai > suspicious)"
                )));
            }
        }

        unit_interval("failed_check_score", self.failed_check_score)?;
        unit_interval("fallback_score", self.fallback_score)?;
        unit_interval("artifact_threshold", self.artifact_threshold)?;
        unit_interval("unsupervised_weight", self.learning.unsupervised_weight)?;
        unit_interval("learned_token_factor", self.learning.learned_token_factor)?;

        if !(0.0..=0.5).contains(&self.learning.adjustment_factor) {
            return Err(FalsifyError::InvalidParameter(
                "adjustment_factor must be within [0, 0.5]".into(),
            ));
        }
        if self.learning.token_min_len == 0 {
            return Err(FalsifyError::InvalidParameter(
                "token_min_len must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

fn overlay(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn unit_interval(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(FalsifyError::InvalidParameter(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.image.weights.total() - 0.90).abs() < 1e-9);
        assert!(config.video.baseline_bias > config.image.baseline_bias);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "fallback_score": 0.7 }"#).unwrap();
        assert_eq!(config.fallback_score, 0.7);
        assert_eq!(config.learning.min_samples, 10.0);
        assert_eq!(config.image.thresholds.likely_ai, 0.85);
    }

    #[test]
    fn test_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(&path, r#"{ "video": { "baseline_bias": 0.6, "weights": {}, "thresholds": {} } }"#)
            .unwrap();

        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.video.baseline_bias, 0.6);
        assert_eq!(config.video.weights.metadata, 0.0);
        assert_eq!(config.video.weights.format, 0.15);
        assert_eq!(config.video.thresholds.likely_ai, 0.75);

        assert!(EngineConfig::from_json_file(dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn test_media_override_keeps_its_own_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "video": { "baseline_bias": 0.55 } }"#).unwrap();
        assert_eq!(config.video.baseline_bias, 0.55);
        assert_eq!(config.video.weights.filename, 0.35);
        assert_eq!(config.video.weights.format, 0.15);
        assert_eq!(config.video.thresholds.likely_ai, 0.75);
        assert_eq!(config.audio.baseline_bias, 0.50);

        let config =
            EngineConfig::from_json_str(r#"{ "audio": { "weights": { "filename": 0.4 } } }"#).unwrap();
        assert_eq!(config.audio.weights.filename, 0.4);
        assert!((config.audio.weights.total() - 0.55).abs() < 1e-9);
        assert_eq!(config.image.weights.filename, 0.10);

        let config = EngineConfig::from_json_str(
            r#"{ "image": { "thresholds": { "likely_ai": 0.9 } }, "learning": { "min_samples": 4 } }"#,
        )
        .unwrap();
        assert_eq!(config.image.thresholds.likely_ai, 0.9);
        assert_eq!(config.image.thresholds.possibly_ai, 0.65);
        assert_eq!(config.learning.min_samples, 4.0);
        assert_eq!(config.learning.token_delimiter, '_');
    }

    #[test]
    fn test_override_still_validated() {
        let err = EngineConfig::from_json_str(r#"{ "video": { "weights": { "metadata": 0.6 } } }"#)
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_rejects_overweight_profile() {
        let mut config = EngineConfig::default();
        config.image.weights.metadata = 0.9;
        assert!(matches!(
            config.validate(),
            Err(FalsifyError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_rejects_unordered_thresholds() {
        let mut config = EngineConfig::default();
        config.audio.thresholds.possibly_ai = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tokenizer_drops_short_words() {
        let learning = LearningConfig::default();
        assert_eq!(
            learning.tokens("My_XYZ_ab_portrait.png"),
            vec!["xyz".to_string(), "portrait.png".to_string()]
        );
    }
}

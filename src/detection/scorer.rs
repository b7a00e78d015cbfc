use std::{
    collections::BTreeMap,
    panic::{self, AssertUnwindSafe},
};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    CheckName, CheckOutcome, MediaKind,
    analysis::{self, Check, ImageInput, Sample, format::Container},
    config::{EngineConfig, MediaProfile},
    detection::{ConfidenceLevel, Verdict, generation_method},
    error::Result,
    learning::PatternSnapshot,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub aggregate_score: f64,
    pub verdict: Verdict,
    pub confidence_level: ConfidenceLevel,
    pub check_breakdown: BTreeMap<CheckName, CheckOutcome>,
    pub artifacts: Vec<String>,
    pub generation_method: String,
    pub image_size: Option<(u32, u32)>,
    pub format: Option<String>,
    pub fallback_reason: Option<String>,
}

/// Produces the score report for one upload. `Scorer` is the stock implementation.
pub trait Scoring: Send + Sync {
    fn score(
        &self,
        bytes: &[u8],
        filename: &str,
        kind: MediaKind,
        patterns: &PatternSnapshot,
    ) -> ScoreReport;
}

/// Suspicious-by-default result used when analysis cannot complete.
pub fn inconclusive_report(config: &EngineConfig, kind: MediaKind, reason: String) -> ScoreReport {
    ScoreReport {
        aggregate_score: config.fallback_score,
        verdict: Verdict::Inconclusive,
        confidence_level: ConfidenceLevel::Low,
        check_breakdown: BTreeMap::new(),
        artifacts: vec![format!("Analysis incomplete for {kind} upload")],
        generation_method: "Unknown".into(),
        image_size: None,
        format: None,
        fallback_reason: Some(reason),
    }
}

/// Runs the check set for a media kind and folds the results into one score.
pub struct Scorer {
    config: EngineConfig,
    image_checks: Vec<Box<dyn Check>>,
    media_checks: Vec<Box<dyn Check>>,
}

impl Scorer {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let image_checks = analysis::image_checks(&config)?;
        let media_checks = analysis::media_checks(&config)?;
        Ok(Self::with_checks(config, image_checks, media_checks))
    }

    pub fn with_checks(
        config: EngineConfig,
        image_checks: Vec<Box<dyn Check>>,
        media_checks: Vec<Box<dyn Check>>,
    ) -> Self {
        Self {
            config,
            image_checks,
            media_checks,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn score(
        &self,
        bytes: &[u8],
        filename: &str,
        kind: MediaKind,
        patterns: &PatternSnapshot,
    ) -> ScoreReport {
        match kind {
            MediaKind::Image => match ImageInput::decode(bytes) {
                Ok(input) => self.score_image(&input, filename, patterns),
                Err(err) => {
                    warn!("Falling back to inconclusive result for {filename}: {err}");
                    inconclusive_report(
                        &self.config,
                        kind,
                        format!("Image could not be decoded: {err}"),
                    )
                }
            },
            MediaKind::Video | MediaKind::Audio => {
                self.score_media(bytes, filename, kind, patterns)
            }
        }
    }

    pub fn score_image(
        &self,
        input: &ImageInput,
        filename: &str,
        patterns: &PatternSnapshot,
    ) -> ScoreReport {
        let sample = Sample {
            filename,
            kind: MediaKind::Image,
            bytes: &[],
            image: Some(input),
        };
        let mut report = self.aggregate(&self.image_checks, &sample, patterns);
        report.image_size = Some(input.dimensions());
        report.format = input.format.clone();
        report
    }

    /// Filename and container checks only; no frames or samples are decoded.
    pub fn score_media(
        &self,
        bytes: &[u8],
        filename: &str,
        kind: MediaKind,
        patterns: &PatternSnapshot,
    ) -> ScoreReport {
        let sample = Sample {
            filename,
            kind,
            bytes,
            image: None,
        };
        let mut report = self.aggregate(&self.media_checks, &sample, patterns);
        report.format = Container::sniff(bytes).map(|c| c.label().to_owned());
        report
    }

    fn aggregate(
        &self,
        checks: &[Box<dyn Check>],
        sample: &Sample<'_>,
        patterns: &PatternSnapshot,
    ) -> ScoreReport {
        let profile: &MediaProfile = self.config.profile(sample.kind);
        let mut breakdown = BTreeMap::new();
        let mut weighted = 0.0;

        for check in checks {
            let name = check.name();
            let mut outcome = self.run_isolated(check.as_ref(), sample, patterns);

            let (adjusted, note) =
                patterns.enhance_score(outcome.score, name, &self.config.learning);
            if let Some(note) = note {
                debug!(
                    "{name} for {}: {:.3} -> {adjusted:.3} after learning",
                    sample.filename, outcome.score
                );
                outcome.notes.push(note);
            }
            outcome.score = adjusted;

            debug!("{name} for {}: {:.3}", sample.filename, outcome.score);
            weighted += outcome.score * profile.weights.weight(name);
            breakdown.insert(name, outcome);
        }

        let aggregate_score = (profile.baseline_bias + weighted).clamp(0.0, 1.0);
        let (verdict, confidence_level) = Verdict::from_score(aggregate_score, &profile.thresholds);

        let artifacts = breakdown
            .iter()
            .filter(|(_, outcome)| outcome.score > self.config.artifact_threshold)
            .map(|(name, _)| name.artifact().to_owned())
            .collect();

        let generation_method = generation_method(
            sample.filename,
            aggregate_score,
            &breakdown,
            &profile.thresholds,
        );

        ScoreReport {
            aggregate_score,
            verdict,
            confidence_level,
            check_breakdown: breakdown,
            artifacts,
            generation_method,
            image_size: None,
            format: None,
            fallback_reason: None,
        }
    }

    fn run_isolated(
        &self,
        check: &dyn Check,
        sample: &Sample<'_>,
        patterns: &PatternSnapshot,
    ) -> CheckOutcome {
        let name = check.name();
        let failure = match panic::catch_unwind(AssertUnwindSafe(|| check.run(sample, patterns))) {
            Ok(Ok(outcome)) => return outcome,
            Ok(Err(err)) => err.to_string(),
            Err(_) => "internal panic".to_owned(),
        };

        warn!("{name} check failed for {}: {failure}", sample.filename);
        CheckOutcome::new(
            self.config.failed_check_score,
            vec![format!("{name} check failed: {failure}")],
        )
    }
}

impl Scoring for Scorer {
    fn score(
        &self,
        bytes: &[u8],
        filename: &str,
        kind: MediaKind,
        patterns: &PatternSnapshot,
    ) -> ScoreReport {
        Scorer::score(self, bytes, filename, kind, patterns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::format::tests::mp4_header,
        error::FalsifyError,
        image_utils::textured_image,
        learning::PatternTables,
        metadata::ImageMetadata,
    };

    struct Exploding;

    impl Check for Exploding {
        fn name(&self) -> CheckName {
            CheckName::Color
        }

        fn run(&self, _sample: &Sample<'_>, _patterns: &PatternSnapshot) -> Result<CheckOutcome> {
            panic!("boom")
        }
    }

    struct Refusing;

    impl Check for Refusing {
        fn name(&self) -> CheckName {
            CheckName::Edge
        }

        fn run(&self, _sample: &Sample<'_>, _patterns: &PatternSnapshot) -> Result<CheckOutcome> {
            Err(FalsifyError::AnalysisFailed("no row".into()))
        }
    }

    fn camera_input() -> ImageInput {
        ImageInput::from_rgb(
            textured_image(613, 481),
            ImageMetadata::with_camera("Canon", "EOS R5"),
        )
    }

    fn scorer() -> Scorer {
        Scorer::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let scorer = scorer();
        let input = camera_input();
        let patterns = PatternSnapshot::default();

        let first = scorer.score_image(&input, "holiday.png", &patterns);
        let second = scorer.score_image(&input, "holiday.png", &patterns);
        assert_eq!(first, second);
        assert_eq!(first.check_breakdown.len(), 6);
        assert_eq!(first.image_size, Some((613, 481)));
    }

    #[test]
    fn test_filename_signal_moves_only_filename_check() {
        let scorer = scorer();
        let input = camera_input();
        let patterns = PatternSnapshot::default();

        let plain = scorer.score_image(&input, "holiday.png", &patterns);
        let tool = scorer.score_image(&input, "midjourney_holiday.png", &patterns);

        for check in plain.check_breakdown.keys() {
            if *check == CheckName::Filename {
                assert!(tool.check_breakdown[check].score > plain.check_breakdown[check].score);
            } else {
                assert_eq!(tool.check_breakdown[check], plain.check_breakdown[check]);
            }
        }
        assert!(tool.aggregate_score > plain.aggregate_score);
        assert_eq!(tool.generation_method, "Midjourney");
    }

    #[test]
    fn test_metadata_signal_moves_only_metadata_check() {
        let scorer = scorer();
        let patterns = PatternSnapshot::default();
        let with_camera = camera_input();
        let bare = ImageInput::from_rgb(textured_image(613, 481), ImageMetadata::default());

        let a = scorer.score_image(&with_camera, "holiday.png", &patterns);
        let b = scorer.score_image(&bare, "holiday.png", &patterns);
        for check in a.check_breakdown.keys() {
            if *check != CheckName::Metadata {
                assert_eq!(a.check_breakdown[check], b.check_breakdown[check]);
            }
        }
        assert!(
            b.check_breakdown[&CheckName::Metadata].score
                > a.check_breakdown[&CheckName::Metadata].score
        );
    }

    #[test]
    fn test_failing_checks_degrade_alone() {
        let config = EngineConfig::default();
        let mut checks = analysis::image_checks(&config).unwrap();
        checks.retain(|c| c.name() != CheckName::Color && c.name() != CheckName::Edge);
        checks.push(Box::new(Exploding));
        checks.push(Box::new(Refusing));
        let scorer = Scorer::with_checks(config, checks, vec![]);

        let report =
            scorer.score_image(&camera_input(), "holiday.png", &PatternSnapshot::default());
        let color = &report.check_breakdown[&CheckName::Color];
        assert_eq!(color.score, 0.5);
        assert!(color.notes[0].starts_with("color check failed"));
        assert!(report.check_breakdown[&CheckName::Edge].notes[0].contains("no row"));
        assert_eq!(report.check_breakdown[&CheckName::Metadata].score, 0.15);
    }

    #[test]
    fn test_undecodable_image_is_inconclusive() {
        let report = scorer().score(
            b"not an image",
            "x.png",
            MediaKind::Image,
            &PatternSnapshot::default(),
        );
        assert_eq!(report.verdict, Verdict::Inconclusive);
        assert_eq!(report.aggregate_score, 0.5);
        assert!(report.check_breakdown.is_empty());
        assert!(report.fallback_reason.unwrap().contains("decoded"));
    }

    #[test]
    fn test_media_path_uses_filename_and_format() {
        let report = scorer().score(
            &mp4_header(),
            "clip.mp4",
            MediaKind::Video,
            &PatternSnapshot::default(),
        );
        let checks = report.check_breakdown.keys().copied().collect::<Vec<_>>();
        assert_eq!(checks, vec![CheckName::Filename, CheckName::Format]);
        assert!((report.aggregate_score - (0.5 + 0.3 * 0.15)).abs() < 1e-9);
        assert_eq!(report.verdict, Verdict::Suspicious);
        assert_eq!(report.format.as_deref(), Some("MP4/QuickTime"));
    }

    #[test]
    fn test_learning_adjustment_shows_in_notes() {
        let mut tables = PatternTables::default();
        let stat = tables.checks.entry(CheckName::Dimensions).or_default();
        for _ in 0..12 {
            stat.record(true, 1.0);
        }

        let report = scorer().score_image(&camera_input(), "holiday.png", &tables);
        let dims = &report.check_breakdown[&CheckName::Dimensions];
        assert!((dims.score - 0.25).abs() < 1e-9);
        assert!(dims.notes.iter().any(|n| n.contains("learning system")));
    }
}

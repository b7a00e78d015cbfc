use std::{
    collections::BTreeMap,
    fmt,
    panic::{self, AssertUnwindSafe},
    path::Path,
    sync::Arc,
};

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    config::EngineConfig,
    detection::{
        ConfidenceLevel, Verdict,
        scorer::{Scorer, Scoring, inconclusive_report},
    },
    error::{FalsifyError, Result},
    learning::{
        LearningStats,
        learner::FeedbackLearner,
        request::{BatchFeedbackOutcome, FeedbackRequest},
    },
    report::ResultsPayload,
    store::{AnalysisStore, MemoryAnalysisStore, MemoryPatternStore, PatternStore},
};

pub mod analysis;
pub mod config;
pub mod detection;
pub mod error;
pub mod image_utils;
pub mod learning;
pub mod metadata;
pub mod report;
pub mod store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    const IMAGE_EXTENSIONS: [&'static str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];
    const VIDEO_EXTENSIONS: [&'static str; 4] = ["mp4", "avi", "mov", "webm"];
    const AUDIO_EXTENSIONS: [&'static str; 4] = ["mp3", "wav", "ogg", "m4a"];

    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = Path::new(filename)
            .extension()?
            .to_string_lossy()
            .to_lowercase();

        if Self::IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            Some(MediaKind::Image)
        } else if Self::VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            Some(MediaKind::Video)
        } else if Self::AUDIO_EXTENSIONS.contains(&extension.as_str()) {
            Some(MediaKind::Audio)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckName {
    Metadata,
    Dimensions,
    Color,
    PixelPattern,
    Filename,
    Edge,
    Format,
}

impl CheckName {
    pub const ALL: [CheckName; 7] = [
        CheckName::Metadata,
        CheckName::Dimensions,
        CheckName::Color,
        CheckName::PixelPattern,
        CheckName::Filename,
        CheckName::Edge,
        CheckName::Format,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckName::Metadata => "metadata",
            CheckName::Dimensions => "dimensions",
            CheckName::Color => "color",
            CheckName::PixelPattern => "pixel_pattern",
            CheckName::Filename => "filename",
            CheckName::Edge => "edge",
            CheckName::Format => "format",
        }
    }

    /// Artifact line reported when the check's score crosses the artifact threshold.
    pub fn artifact(&self) -> &'static str {
        match self {
            CheckName::Metadata => "Suspicious or missing metadata",
            CheckName::Dimensions => "AI-typical image dimensions",
            CheckName::Color => "Unusual color distribution patterns",
            CheckName::PixelPattern => "Synthetic pixel patterns detected",
            CheckName::Filename => "Filename suggests AI generation",
            CheckName::Edge => "Unusual edge patterns",
            CheckName::Format => "Container format inconsistent with file type",
        }
    }
}

impl fmt::Display for CheckName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub score: f64,
    pub notes: Vec<String>,
}

impl CheckOutcome {
    pub fn new(score: f64, notes: Vec<String>) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
            notes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub user_says_ai: bool,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub analysis_id: String,
    pub filename: String,
    pub file_fingerprint: String,
    pub media_kind: MediaKind,
    pub check_breakdown: BTreeMap<CheckName, CheckOutcome>,
    pub aggregate_score: f64,
    pub verdict: Verdict,
    pub confidence_level: ConfidenceLevel,
    pub generation_method: String,
    pub artifacts: Vec<String>,
    pub image_size: Option<(u32, u32)>,
    pub format: Option<String>,
    pub fallback_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub prior_correction: Option<Feedback>,
    pub feedback: Option<Feedback>,
}

impl AnalysisRecord {
    pub fn is_ai_generated(&self) -> bool {
        self.verdict.is_ai()
    }

    pub fn content_key(&self) -> String {
        content_key(&self.file_fingerprint, self.media_kind)
    }
}

/// Composite key used to recognise re-uploads of identical content.
pub fn content_key(fingerprint: &str, kind: MediaKind) -> String {
    format!("{fingerprint}_{kind}")
}

pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackOutcome {
    pub was_correct: bool,
    pub original_score: f64,
    pub learning_updated: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Upload<'a> {
    pub bytes: &'a [u8],
    pub filename: &'a str,
    pub kind: MediaKind,
}

pub struct AuthenticityAnalyzer {
    config: EngineConfig,
    scorer: Box<dyn Scoring>,
    learner: FeedbackLearner,
    records: Arc<dyn AnalysisStore>,
}

impl AuthenticityAnalyzer {
    pub fn new() -> Result<Self> {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Result<Self> {
        Self::with_stores(
            config,
            Arc::new(MemoryAnalysisStore::new()),
            Arc::new(MemoryPatternStore::new()),
        )
    }

    pub fn with_stores(
        config: EngineConfig,
        records: Arc<dyn AnalysisStore>,
        patterns: Arc<dyn PatternStore>,
    ) -> Result<Self> {
        config.validate()?;
        let scorer = Scorer::new(config.clone())?;
        Self::with_scorer(config, Box::new(scorer), records, patterns)
    }

    /// Uses a caller-supplied scoring stage in place of the stock check set.
    pub fn with_scorer(
        config: EngineConfig,
        scorer: Box<dyn Scoring>,
        records: Arc<dyn AnalysisStore>,
        patterns: Arc<dyn PatternStore>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            scorer,
            learner: FeedbackLearner::new(patterns, config.learning.clone()),
            records,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn learner(&self) -> &FeedbackLearner {
        &self.learner
    }

    /// Scores one upload and stores the result. Never fails: decode errors and
    /// internal faults degrade into an inconclusive, suspicious-by-default record.
    pub fn analyze(&self, media_bytes: &[u8], filename: &str, media_kind: MediaKind) -> AnalysisRecord {
        let file_fingerprint = fingerprint(media_bytes);
        let patterns = self.learner.snapshot();

        let report = panic::catch_unwind(AssertUnwindSafe(|| {
            self.scorer.score(media_bytes, filename, media_kind, &patterns)
        }))
        .unwrap_or_else(|_| {
            error!("Scoring panicked for {filename} ({media_kind}), using fallback result");
            inconclusive_report(
                &self.config,
                media_kind,
                "Internal error during analysis".into(),
            )
        });

        let prior_correction = self
            .records
            .latest_for_content(&file_fingerprint, media_kind)
            .and_then(|previous| previous.feedback);

        let record = AnalysisRecord {
            analysis_id: uuid::Uuid::new_v4().to_string(),
            filename: filename.to_owned(),
            file_fingerprint,
            media_kind,
            check_breakdown: report.check_breakdown,
            aggregate_score: report.aggregate_score,
            verdict: report.verdict,
            confidence_level: report.confidence_level,
            generation_method: report.generation_method,
            artifacts: report.artifacts,
            image_size: report.image_size,
            format: report.format,
            fallback_reason: report.fallback_reason,
            created_at: Utc::now(),
            prior_correction,
            feedback: None,
        };

        if let Err(err) = self.records.put(record.clone()) {
            error!(
                "Failed to persist analysis {} for {}: {err}",
                record.analysis_id, record.filename
            );
        }
        self.learner.observe(&record);

        info!(
            "Stored analysis {} for {} ({}): {:?} at {:.3}",
            record.analysis_id, record.filename, media_kind, record.verdict, record.aggregate_score
        );

        record
    }

    pub fn analyze_batch(&self, uploads: &[Upload<'_>]) -> Vec<AnalysisRecord> {
        uploads
            .par_iter()
            .map(|upload| self.analyze(upload.bytes, upload.filename, upload.kind))
            .collect()
    }

    pub fn record_feedback(
        &self,
        analysis_id: &str,
        user_says_ai: bool,
        confidence: f64,
    ) -> Result<FeedbackOutcome> {
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(FalsifyError::Validation(format!(
                "confidence must be within [0, 1], got {confidence}"
            )));
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.apply_feedback(analysis_id, user_says_ai, confidence)
        }))
        .unwrap_or_else(|_| {
            Err(FalsifyError::Internal(format!(
                "feedback processing panicked for analysis {analysis_id}"
            )))
        });

        if let Err(ref err) = outcome {
            if err.is_client_error() {
                warn!("Rejected feedback for {analysis_id}: {err}");
            } else {
                error!("Feedback for {analysis_id} failed [{}]: {err}", err.code());
            }
        }

        outcome
    }

    fn apply_feedback(
        &self,
        analysis_id: &str,
        user_says_ai: bool,
        confidence: f64,
    ) -> Result<FeedbackOutcome> {
        let record = self
            .records
            .get(analysis_id)
            .ok_or_else(|| FalsifyError::UnknownAnalysis(analysis_id.to_owned()))?;

        let feedback = Feedback {
            user_says_ai,
            confidence,
            timestamp: Utc::now(),
        };
        self.records.update(analysis_id, &mut |stored| {
            stored.feedback = Some(feedback.clone());
        })?;

        let was_correct = match self.learner.apply_feedback(&record, user_says_ai, confidence) {
            Ok(was_correct) => was_correct,
            Err(err) => {
                let previous = record.feedback.clone();
                if let Err(restore) = self.records.update(analysis_id, &mut |stored| {
                    stored.feedback = previous.clone();
                }) {
                    error!("Could not restore feedback on {analysis_id}: {restore}");
                }
                return Err(err);
            }
        };

        info!(
            "Feedback applied to {analysis_id} ({}): user_says_ai={user_says_ai}, was_correct={was_correct}",
            record.filename
        );

        Ok(FeedbackOutcome {
            was_correct,
            original_score: record.aggregate_score,
            learning_updated: true,
        })
    }

    pub fn submit_feedback(&self, request: &FeedbackRequest) -> Result<FeedbackOutcome> {
        self.record_feedback(&request.analysis_id, request.user_says_ai, request.confidence)
    }

    pub fn record_feedback_batch(&self, requests: &[FeedbackRequest]) -> BatchFeedbackOutcome {
        let mut outcome = BatchFeedbackOutcome::default();

        for request in requests {
            match self.submit_feedback(request) {
                Ok(_) => outcome.updated += 1,
                Err(err) => outcome.record_failure(&request.analysis_id, &err),
            }
        }

        outcome
    }

    pub fn record(&self, analysis_id: &str) -> Option<AnalysisRecord> {
        self.records.get(analysis_id)
    }

    pub fn report(&self, analysis_id: &str) -> Option<ResultsPayload> {
        self.records
            .get(analysis_id)
            .map(|record| ResultsPayload::from(&record))
    }

    pub fn learning_stats(&self) -> LearningStats {
        self.learner
            .stats(self.records.len(), self.records.feedback_count())
    }
}

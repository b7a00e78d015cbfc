use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    AnalysisRecord, CheckName, CheckOutcome, Feedback, MediaKind,
    detection::{ConfidenceLevel, Verdict},
    error::Result,
};

/// Response body handed to the HTTP layer for one analysis.
#[derive(Debug, Clone, Serialize)]
pub struct ResultsPayload {
    pub analysis_id: String,
    pub results: Vec<ResultItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResultItem {
    Detection(DetectionItem),
    Summary(SummaryItem),
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectionItem {
    #[serde(rename = "type")]
    pub item_type: &'static str,
    pub is_ai_generated: bool,
    pub is_fake: bool,
    pub confidence: f64,
    pub generation_method: String,
    pub artifacts_found: Vec<String>,
    pub detection_breakdown: BTreeMap<CheckName, CheckOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub enum SummaryItem {
    #[serde(rename = "image_summary")]
    Image(Summary),
    #[serde(rename = "video_summary")]
    Video(Summary),
    #[serde(rename = "audio_summary")]
    Audio(Summary),
}

impl SummaryItem {
    pub fn summary(&self) -> &Summary {
        match self {
            SummaryItem::Image(s) | SummaryItem::Video(s) | SummaryItem::Audio(s) => s,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_size: Option<String>,
    pub format: String,
    pub ai_generated_likelihood: f64,
    pub detected_generation_method: String,
    pub overall_authenticity: Verdict,
    pub confidence_level: ConfidenceLevel,
    pub artifacts_detected: usize,
    pub recommendation: &'static str,
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_correction: Option<Feedback>,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

impl ResultsPayload {
    pub fn detection(&self) -> Option<&DetectionItem> {
        self.results.iter().find_map(|item| match item {
            ResultItem::Detection(d) => Some(d),
            ResultItem::Summary(_) => None,
        })
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.results.iter().find_map(|item| match item {
            ResultItem::Summary(s) => Some(s.summary()),
            ResultItem::Detection(_) => None,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<&AnalysisRecord> for ResultsPayload {
    fn from(record: &AnalysisRecord) -> Self {
        let is_ai = record.is_ai_generated();
        let confidence = round3(record.aggregate_score);

        let item_type = match (&record.fallback_reason, record.media_kind) {
            (Some(_), _) => "error",
            (None, MediaKind::Image) => "ai_detection",
            (None, MediaKind::Video) => "video_analysis",
            (None, MediaKind::Audio) => "audio_analysis",
        };

        let detection = DetectionItem {
            item_type,
            is_ai_generated: is_ai,
            is_fake: is_ai,
            confidence,
            generation_method: record.generation_method.clone(),
            artifacts_found: record.artifacts.clone(),
            detection_breakdown: record.check_breakdown.clone(),
            error: record.fallback_reason.clone(),
        };

        let mut notes = record
            .check_breakdown
            .values()
            .flat_map(|outcome| outcome.notes.iter().cloned())
            .collect::<Vec<_>>();
        if let Some(reason) = &record.fallback_reason {
            notes.push(reason.clone());
        }
        match record.media_kind {
            MediaKind::Video => {
                notes.push("Video content requires deep analysis - treat with caution".into())
            }
            MediaKind::Audio => {
                notes.push("Audio content is commonly synthesized - treat with caution".into())
            }
            MediaKind::Image => {}
        }

        let summary = Summary {
            filename: record.filename.clone(),
            image_size: record.image_size.map(|(w, h)| format!("{w}x{h}")),
            format: record.format.clone().unwrap_or_else(|| "Unknown".into()),
            ai_generated_likelihood: confidence,
            detected_generation_method: record.generation_method.clone(),
            overall_authenticity: record.verdict,
            confidence_level: record.confidence_level,
            artifacts_detected: record.artifacts.len(),
            recommendation: record.verdict.recommendation(record.media_kind),
            notes,
            previous_correction: record.prior_correction.clone(),
        };

        let summary = match record.media_kind {
            MediaKind::Image => SummaryItem::Image(summary),
            MediaKind::Video => SummaryItem::Video(summary),
            MediaKind::Audio => SummaryItem::Audio(summary),
        };

        Self {
            analysis_id: record.analysis_id.clone(),
            results: vec![ResultItem::Detection(detection), ResultItem::Summary(summary)],
        }
    }
}

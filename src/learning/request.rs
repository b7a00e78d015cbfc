use serde::{Deserialize, Serialize};

use crate::error::{FalsifyError, Result};

/// A validated correction, ready to hand to the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackRequest {
    pub analysis_id: String,
    pub user_says_ai: bool,
    pub confidence: f64,
}

#[derive(Debug, Default, Deserialize)]
struct UserFeedbackPayload {
    #[serde(rename = "actualResult")]
    actual_result: Option<bool>,
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FeedbackPayload {
    #[serde(alias = "analysisId")]
    analysis_id: Option<String>,
    #[serde(rename = "userFeedback", default)]
    user_feedback: Option<UserFeedbackPayload>,
    user_correction: Option<String>,
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BatchUpdatePayload {
    #[serde(alias = "analysisId")]
    analysis_id: Option<String>,
    correction: Option<String>,
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BatchPayload {
    batch_updates: Vec<BatchUpdatePayload>,
}

fn correction_is_ai(field: &str, value: Option<&str>) -> Result<bool> {
    match value {
        Some("ai") => Ok(true),
        Some("real") => Ok(false),
        Some(other) => Err(FalsifyError::Validation(format!(
            "{field} must be \"ai\" or \"real\", got {other:?}"
        ))),
        None => Err(FalsifyError::Validation(format!("Missing {field}"))),
    }
}

impl FeedbackRequest {
    pub fn new(analysis_id: impl Into<String>, user_says_ai: bool, confidence: f64) -> Result<Self> {
        let analysis_id = analysis_id.into();
        if analysis_id.trim().is_empty() {
            return Err(FalsifyError::Validation("Missing analysis_id".into()));
        }
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(FalsifyError::Validation(format!(
                "confidence must be within [0, 1], got {confidence}"
            )));
        }

        Ok(Self {
            analysis_id,
            user_says_ai,
            confidence,
        })
    }

    /// Accepts both client payload shapes: `userFeedback.actualResult` or `user_correction`.
    pub fn from_json(json: &str) -> Result<Self> {
        let payload: FeedbackPayload = serde_json::from_str(json)
            .map_err(|e| FalsifyError::Validation(format!("Malformed feedback payload: {e}")))?;

        let analysis_id = payload
            .analysis_id
            .ok_or_else(|| FalsifyError::Validation("Missing analysis_id".into()))?;

        let user_feedback = payload.user_feedback.unwrap_or_default();

        let user_says_ai = match user_feedback.actual_result {
            Some(actual) => actual,
            None => correction_is_ai("user_correction", payload.user_correction.as_deref())?,
        };

        let confidence = user_feedback
            .confidence
            .or(payload.confidence)
            .unwrap_or(1.0);

        Self::new(analysis_id, user_says_ai, confidence)
    }

    /// Parses `{"batch_updates": [{"analysis_id", "correction", "confidence"?}]}`.
    /// Any invalid entry rejects the whole batch, naming its position.
    pub fn batch_from_json(json: &str) -> Result<Vec<Self>> {
        let payload: BatchPayload = serde_json::from_str(json)
            .map_err(|e| FalsifyError::Validation(format!("Malformed batch payload: {e}")))?;

        payload
            .batch_updates
            .into_iter()
            .enumerate()
            .map(|(index, update)| {
                let parsed = update
                    .analysis_id
                    .ok_or_else(|| FalsifyError::Validation("Missing analysis_id".into()))
                    .and_then(|analysis_id| {
                        let user_says_ai =
                            correction_is_ai("correction", update.correction.as_deref())?;
                        Self::new(analysis_id, user_says_ai, update.confidence.unwrap_or(1.0))
                    });
                parsed.map_err(|err| match err {
                    FalsifyError::Validation(message) => {
                        FalsifyError::Validation(format!("batch_updates[{index}]: {message}"))
                    }
                    other => other,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub analysis_id: String,
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchFeedbackOutcome {
    pub updated: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchFeedbackOutcome {
    pub fn record_failure(&mut self, analysis_id: &str, err: &FalsifyError) {
        self.failures.push(BatchFailure {
            analysis_id: analysis_id.to_owned(),
            code: err.code(),
            message: err.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frontend_payload_shape() {
        let request = FeedbackRequest::from_json(
            r#"{"analysisId": "42", "userFeedback": {"isCorrect": false, "actualResult": true, "confidence": 0.8}}"#,
        )
        .unwrap();
        assert_eq!(request, FeedbackRequest::new("42", true, 0.8).unwrap());
    }

    #[test]
    fn test_correction_string_shape_defaults_confidence() {
        let request =
            FeedbackRequest::from_json(r#"{"analysis_id": "7", "user_correction": "real"}"#).unwrap();
        assert!(!request.user_says_ai);
        assert_eq!(request.confidence, 1.0);
    }

    #[test]
    fn test_missing_fields_are_validation_errors() {
        for json in [
            r#"{"user_correction": "ai"}"#,
            r#"{"analysis_id": "7"}"#,
            r#"{"analysis_id": "7", "user_correction": "maybe"}"#,
            r#"{"analysis_id": "7", "user_correction": "ai", "confidence": 3.0}"#,
            r#"not json"#,
        ] {
            let err = FeedbackRequest::from_json(json).unwrap_err();
            assert_eq!(err.code(), "VALIDATION", "{json}");
        }
    }

    #[test]
    fn test_batch_updates_payload() {
        let requests = FeedbackRequest::batch_from_json(
            r#"{"batch_updates": [
                {"analysis_id": "a", "correction": "ai", "confidence": 0.7},
                {"analysisId": "b", "correction": "real"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(
            requests,
            vec![
                FeedbackRequest::new("a", true, 0.7).unwrap(),
                FeedbackRequest::new("b", false, 1.0).unwrap(),
            ]
        );
        assert!(FeedbackRequest::batch_from_json(r#"{"batch_updates": []}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_bad_batch_entry_names_its_position() {
        let err = FeedbackRequest::batch_from_json(
            r#"{"batch_updates": [{"analysis_id": "a", "correction": "ai"}, {"analysis_id": "b", "correction": "maybe"}]}"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), "VALIDATION");
        assert!(err.to_string().contains("batch_updates[1]"));

        for json in [
            r#"{"updates": []}"#,
            r#"{"batch_updates": [{"correction": "ai"}]}"#,
            r#"{"batch_updates": [{"analysis_id": "a"}]}"#,
            r#"{"batch_updates": [{"analysis_id": "a", "correction": "ai", "confidence": -1}]}"#,
        ] {
            assert_eq!(
                FeedbackRequest::batch_from_json(json).unwrap_err().code(),
                "VALIDATION",
                "{json}"
            );
        }
    }
}

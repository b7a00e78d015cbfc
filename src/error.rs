use thiserror::Error;

#[derive(Error, Debug)]
pub enum FalsifyError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("Unknown analysis: {0}")]
    UnknownAnalysis(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FalsifyError {
    /// Stable code surfaced to callers alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            FalsifyError::ImageDecode(_) => "IMAGE_DECODE",
            FalsifyError::UnknownAnalysis(_) => "UNKNOWN_ANALYSIS",
            FalsifyError::Validation(_) => "VALIDATION",
            FalsifyError::InvalidParameter(_) => "INVALID_CONFIG",
            FalsifyError::Io(_) | FalsifyError::Serialization(_) => "STORAGE",
            FalsifyError::AnalysisFailed(_) | FalsifyError::Internal(_) => "INTERNAL",
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FalsifyError::UnknownAnalysis(_) | FalsifyError::Validation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FalsifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(FalsifyError::UnknownAnalysis("x".into()).code(), "UNKNOWN_ANALYSIS");
        assert_eq!(FalsifyError::Validation("x".into()).code(), "VALIDATION");
        assert_eq!(FalsifyError::ImageDecode("x".into()).code(), "IMAGE_DECODE");
        assert_eq!(FalsifyError::Internal("x".into()).code(), "INTERNAL");
    }

    #[test]
    fn test_client_errors() {
        assert!(FalsifyError::UnknownAnalysis("id".into()).is_client_error());
        assert!(FalsifyError::Validation("missing".into()).is_client_error());
        assert!(!FalsifyError::AnalysisFailed("boom".into()).is_client_error());
    }
}

use thiserror::Error;

/// Failure taxonomy of one overlay pipeline run.
///
/// Halting variants leave the overlay empty; `TranslationFailed` is only
/// ever produced per fragment and is recovered by keeping the source text.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("screen capture was cancelled")]
    AcquisitionCancelled,
    #[error("no text recognizer is available")]
    RecognitionUnavailable,
    #[error("text recognition failed: {0}")]
    RecognitionFailed(String),
    #[error("recognized text carries no position data")]
    NoGeometry,
    #[error("no translation engine is configured")]
    TranslationUnavailable,
    #[error("translation of fragment {index} failed: {reason}")]
    TranslationFailed { index: usize, reason: String },
    #[error("operation cancelled")]
    OperationCancelled,
    #[error("an overlay run is already in progress")]
    Busy,
}

impl OverlayError {
    /// Message for the single user notification, or `None` when the
    /// condition is silent.
    pub fn user_notice(&self) -> Option<String> {
        match self {
            OverlayError::AcquisitionCancelled
            | OverlayError::OperationCancelled
            | OverlayError::TranslationFailed { .. } => None,
            other => Some(other.to_string()),
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            OverlayError::AcquisitionCancelled | OverlayError::OperationCancelled
        )
    }
}

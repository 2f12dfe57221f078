use thiserror::Error;

pub type Result<T> = std::result::Result<T, FxError>;

/// Failures raised by the host or the graph builder.
///
/// None of these are fatal: the session logs them and leaves the element
/// eligible for a later pass.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FxError {
    #[error("Web Audio API is not available in this environment")]
    AudioUnsupported,

    #[error("element cannot capture a media stream")]
    CaptureUnavailable,

    #[error("stream capture failed: {0}")]
    CaptureFailed(String),

    #[error("graph construction failed: {0}")]
    GraphConstruction(String),

    #[error("impulse response unavailable: {0}")]
    ImpulseUnavailable(String),

    #[error("processing context error: {0}")]
    Context(String),

    #[error("traversal failed: {0}")]
    Traversal(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl FxError {
    /// Transient failures leave no trace and may succeed on the next pass.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FxError::CaptureFailed(_)
                | FxError::GraphConstruction(_)
                | FxError::ImpulseUnavailable(_)
                | FxError::Context(_)
        )
    }
}

impl From<serde_json::Error> for FxError {
    fn from(err: serde_json::Error) -> Self {
        FxError::Config(err.to_string())
    }
}

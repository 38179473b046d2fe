use thiserror::Error;

/// Every failure the capture core can report.
///
/// None of these are fatal: the C boundary turns each one into `-1` or a
/// null/zero-length frame and logs the message.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("index {index} out of range ({count} sources available)")]
    OutOfRange { index: usize, count: usize },

    #[error("unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    #[error("no source is open")]
    NotOpened,

    #[error("no video decoder available for {0}")]
    DecoderBindFailed(String),

    #[error("failed to open source: {0}")]
    OpenFailed(String),

    #[error("decode error: {0}")]
    DecodeFailed(String),

    #[error("conversion error: {0}")]
    ConversionFailed(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("device backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptureError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Numeric status used at the C boundary.
    pub fn status_code(&self) -> i32 {
        -1
    }
}

impl From<config::ConfigError> for CaptureError {
    fn from(error: config::ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

impl From<image::ImageError> for CaptureError {
    fn from(error: image::ImageError) -> Self {
        Self::DecodeFailed(error.to_string())
    }
}

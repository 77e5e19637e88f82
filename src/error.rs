use thiserror::Error;

/// Errors raised when a drawing style receives an unusable value
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum StyleError {
    #[error("Stroke width must be a positive number, got {0}")]
    InvalidWidth(f32),

    #[error("Opacity must be a number, got {0}")]
    InvalidOpacity(f32),
}

/// Errors delivered through a capture callback
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    /// The surface has no pixels to capture
    #[error("Cannot capture a surface with zero area ({width}x{height})")]
    ZeroArea { width: u32, height: u32 },

    /// The platform reported a failure while producing pixels
    #[error("Bitmap generation failed: {0}")]
    Rasterization(String),

    /// The surface went away before the capture could complete
    #[error("Surface was detached before the capture completed")]
    Detached,
}

/// Errors that can occur while saving or loading canvas data
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to serialize document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to access storage: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

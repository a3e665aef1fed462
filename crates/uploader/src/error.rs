//! Upload error types.

/// Errors produced while driving an upload attempt.
///
/// Nothing here is retried automatically: every error is terminal for the
/// attempt and the caller restarts from the top if desired.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Api(#[from] medialift_api::ApiError),

    #[error("transfer error: {0}")]
    Transfer(#[from] medialift_transfer::TransferError),

    #[error("compression error: {0}")]
    Compress(#[from] medialift_compress::CompressError),

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("cancelled")]
    Cancelled,
}

//! Asynchronous video transcoding with sampled progress and cancellation.
//!
//! The [`Transcoder`] trait is the capability seam: [`FfmpegTranscoder`]
//! drives the `ffmpeg` binary for real work, while tests plug in fakes.
//! [`CompressionJob`] wraps a running transcode, sampling its monotone
//! progress value on a fixed cadence and reporting a terminal event
//! exactly once.

mod job;
mod preset;
mod transcoder;

pub use job::{CompressEvent, CompressionJob};
pub use preset::QualityPreset;
pub use transcoder::{FfmpegTranscoder, TranscodeOp, TranscodeProgress, Transcoder};

/// Errors produced while compressing a video.
#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    /// The transcoder could not be initialized (unreadable source,
    /// unsupported preset, missing binary). Raised before any
    /// asynchronous work starts.
    #[error("failed to initialize transcoder: {0}")]
    Init(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transcode failed: {0}")]
    Transcode(String),

    #[error("cancelled")]
    Cancelled,
}

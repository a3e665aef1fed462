//! Upload pipeline: compression, strategy dispatch, chunked HTTP
//! transfer, and batch cleanup.
//!
//! This crate implements the **business logic** for moving a local video
//! to the remote hosting service. It is a library crate with no UI — the
//! presentation layer consumes the event stream and renders progress.
//!
//! # Pipeline
//!
//! 1. **Create** — register the video resource, obtain its upload target
//! 2. **Compress** — transcode to the selected quality preset, if any
//! 3. **Chunk** — split the payload, pick single vs chunked transfer
//! 4. **Transfer** — drive the strictly sequential upload
//! 5. **Complete** — surface the playable HLS URL

mod cleanup;
mod error;
mod pipeline;
mod types;
mod uploader;

// Re-export primary types for convenience.
pub use cleanup::cleanup;
pub use error::UploadError;
pub use pipeline::UploadPipeline;
pub use types::{CleanupReport, MediaAsset, UploadEvent, UploadedVideo};
pub use uploader::Uploader;

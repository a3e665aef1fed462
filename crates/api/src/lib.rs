//! Thin authenticated HTTP client for the video hosting API.
//!
//! Covers the resource operations around an upload: exchanging an API key
//! for a bearer token, creating the upload target for a new video, and
//! listing/deleting videos for cleanup. The actual payload transfer lives
//! in the uploader crate.

mod activity;
mod client;
mod types;

pub use activity::{ActivityGuard, NetworkActivity};
pub use client::{ApiClient, DEFAULT_BASE_URL, server_error};
pub use types::UploadTarget;

/// Errors from the API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Network or connectivity failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP response. The message comes from the body's
    /// `title` field when present.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Success response missing an expected field.
    #[error("corrupt response: missing {0}")]
    CorruptResponse(&'static str),
}

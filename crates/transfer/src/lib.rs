//! Payload chunking, transfer strategy selection, and upload session state.
//!
//! Everything in this crate is pure and in-memory: no network, no
//! filesystem. The uploader crate drives the actual HTTP transfer.

mod chunker;
mod session;
mod strategy;

pub use chunker::{Chunk, split};
pub use session::{SessionSnapshot, UploadSession, UploadStatus};
pub use strategy::{Strategy, select_strategy};

/// Default chunk size: 10 MB.
///
/// Doubles as the payload-size threshold for the single-request path:
/// payloads at or below this size fit in exactly one chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000_000;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("empty payload")]
    EmptyPayload,
}

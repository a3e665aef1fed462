use std::sync::RwLock;

/// Lifecycle of one upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

/// Tracks the state of one upload attempt (thread-safe).
///
/// The session only ever moves forward: `NotStarted → InProgress →
/// Completed | Failed`. While in progress it records the index of the chunk
/// currently being sent and the bytes the server has acknowledged so far.
/// The chunk index advances only after a success response; any failure is
/// terminal — there is no retry or resume.
pub struct UploadSession {
    inner: RwLock<SessionInner>,
}

struct SessionInner {
    status: UploadStatus,
    total_chunks: usize,
    total_bytes: u64,
    current_chunk_index: usize,
    bytes_confirmed: u64,
    error: String,
}

/// Point-in-time view of a session, for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub status: UploadStatus,
    pub total_chunks: usize,
    pub total_bytes: u64,
    pub current_chunk_index: usize,
    pub bytes_confirmed: u64,
    /// Completed fraction in `[0, 1]`, one step per acknowledged chunk.
    pub fraction: f64,
    pub error: String,
}

impl UploadSession {
    /// Creates a new session for a payload split into `total_chunks` chunks.
    pub fn new(total_chunks: usize, total_bytes: u64) -> Self {
        Self {
            inner: RwLock::new(SessionInner {
                status: UploadStatus::NotStarted,
                total_chunks,
                total_bytes,
                current_chunk_index: 0,
                bytes_confirmed: 0,
                error: String::new(),
            }),
        }
    }

    /// Marks the session as in-progress.
    pub fn start(&self) {
        let mut s = self.inner.write().unwrap();
        s.status = UploadStatus::InProgress;
    }

    /// Records a server acknowledgement for the current chunk.
    ///
    /// Adds `bytes` to the confirmed total and advances the chunk index.
    pub fn advance_chunk(&self, bytes: u64) {
        let mut s = self.inner.write().unwrap();
        s.bytes_confirmed += bytes;
        s.current_chunk_index += 1;
    }

    /// Marks the session as completed.
    pub fn complete(&self) {
        let mut s = self.inner.write().unwrap();
        s.status = UploadStatus::Completed;
    }

    /// Marks the session as failed with an error message.
    pub fn fail(&self, err: &str) {
        let mut s = self.inner.write().unwrap();
        s.status = UploadStatus::Failed;
        s.error = err.to_string();
    }

    /// Returns the current status.
    pub fn status(&self) -> UploadStatus {
        self.inner.read().unwrap().status
    }

    /// Returns bytes acknowledged by the server so far.
    pub fn bytes_confirmed(&self) -> u64 {
        self.inner.read().unwrap().bytes_confirmed
    }

    /// Returns the index of the chunk currently being sent.
    pub fn current_chunk_index(&self) -> usize {
        self.inner.read().unwrap().current_chunk_index
    }

    /// Returns a point-in-time view of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        let s = self.inner.read().unwrap();
        let fraction = match s.status {
            UploadStatus::Completed => 1.0,
            _ if s.total_chunks == 0 => 0.0,
            _ => s.current_chunk_index as f64 / s.total_chunks as f64,
        };
        SessionSnapshot {
            status: s.status,
            total_chunks: s.total_chunks,
            total_bytes: s.total_bytes,
            current_chunk_index: s.current_chunk_index,
            bytes_confirmed: s.bytes_confirmed,
            fraction,
            error: s.error.clone(),
        }
    }
}

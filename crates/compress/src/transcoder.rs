//! Transcoder capability seam and the ffmpeg-backed implementation.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{CompressError, QualityPreset};

/// Shared monotone transcode progress in `[0, 1]`.
///
/// Writers may only move it forward; the sampler relies on monotonicity to
/// know when to stop.
#[derive(Clone, Debug, Default)]
pub struct TranscodeProgress(Arc<AtomicU32>);

impl TranscodeProgress {
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Advances the progress value. Values below the current one, or
    /// outside `[0, 1]`, are clamped.
    pub fn set(&self, value: f32) {
        let clamped = value.clamp(0.0, 1.0);
        if clamped > self.get() {
            self.0.store(clamped.to_bits(), Ordering::Relaxed);
        }
    }
}

/// A running transcode operation.
pub struct TranscodeOp {
    /// Shared monotone progress written by the transcoder.
    pub progress: TranscodeProgress,
    /// Cancels the underlying transcode when triggered.
    pub cancel: CancellationToken,
    /// Resolves once the transcode finishes, successfully or not.
    pub completion: Pin<Box<dyn Future<Output = Result<(), CompressError>> + Send>>,
}

impl std::fmt::Debug for TranscodeOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscodeOp")
            .field("progress", &self.progress)
            .field("cancel", &self.cancel)
            .field("completion", &"<future>")
            .finish()
    }
}

/// Capability seam for producing a transcoded rendition of a source video.
///
/// Implemented by [`FfmpegTranscoder`] for real work and by in-memory
/// fakes in tests, keeping the compression job logic process-free.
pub trait Transcoder: Send + Sync {
    /// Starts transcoding `source` into `output` at `preset`.
    ///
    /// Fails before any asynchronous transcode work begins if the source
    /// is unreadable or the transcoder cannot be initialized.
    fn start(
        &self,
        source: &Path,
        preset: QualityPreset,
        output: &Path,
    ) -> Pin<Box<dyn Future<Output = Result<TranscodeOp, CompressError>> + Send + '_>>;
}

/// Transcoder backed by the `ffmpeg` binary.
///
/// Progress comes from ffmpeg's `-progress pipe:1` key/value stream,
/// scaled against the source duration probed up front with `ffprobe`.
pub struct FfmpegTranscoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegTranscoder {
    /// Uses `ffmpeg`/`ffprobe` from `PATH`.
    pub fn new() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }

    /// Uses explicit binary locations.
    pub fn with_binaries(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Probes the source duration in seconds.
    async fn probe_duration(&self, source: &Path) -> Result<f64, CompressError> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(source)
            .output()
            .await
            .map_err(|e| CompressError::Init(format!("ffprobe: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CompressError::Init(format!(
                "ffprobe failed: {}",
                stderr.trim()
            )));
        }

        let secs: f64 = String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse()
            .map_err(|_| CompressError::Init("unparseable source duration".into()))?;
        if secs <= 0.0 {
            return Err(CompressError::Init("source has no duration".into()));
        }
        Ok(secs)
    }
}

/// Parses one `-progress pipe:1` key/value line into elapsed output seconds.
fn parse_out_time_secs(line: &str) -> Option<f64> {
    let us: f64 = line.strip_prefix("out_time_us=")?.trim().parse().ok()?;
    Some(us / 1_000_000.0)
}

impl Transcoder for FfmpegTranscoder {
    fn start(
        &self,
        source: &Path,
        preset: QualityPreset,
        output: &Path,
    ) -> Pin<Box<dyn Future<Output = Result<TranscodeOp, CompressError>> + Send + '_>> {
        let source = source.to_path_buf();
        let output = output.to_path_buf();

        Box::pin(async move {
            // An unreadable source is an initialization failure, caught
            // before ffmpeg is spawned.
            tokio::fs::metadata(&source).await.map_err(|e| {
                CompressError::Init(format!("unreadable source {}: {e}", source.display()))
            })?;

            let duration = self.probe_duration(&source).await?;
            let (width, height) = preset.dimensions();

            debug!(
                source = %source.display(),
                %preset,
                duration_secs = duration,
                "starting ffmpeg transcode"
            );

            let mut child = Command::new(&self.ffmpeg)
                .args(["-y", "-nostats", "-loglevel", "error"])
                .arg("-i")
                .arg(&source)
                .arg("-vf")
                .arg(format!("scale={width}:{height}"))
                .args(["-movflags", "+faststart", "-progress", "pipe:1"])
                .arg(&output)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .spawn()
                .map_err(|e| CompressError::Init(format!("ffmpeg: {e}")))?;

            let progress = TranscodeProgress::default();
            let cancel = CancellationToken::new();

            if let Some(stdout) = child.stdout.take() {
                let reporter = progress.clone();
                tokio::spawn(async move {
                    let mut lines = BufReader::new(stdout).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        if let Some(secs) = parse_out_time_secs(&line) {
                            reporter.set((secs / duration) as f32);
                        } else if line.trim() == "progress=end" {
                            reporter.set(1.0);
                        }
                    }
                });
            }

            let token = cancel.clone();
            let completion = async move {
                tokio::select! {
                    _ = token.cancelled() => {
                        child.start_kill().ok();
                        let _ = child.wait().await;
                        Err(CompressError::Cancelled)
                    }
                    status = child.wait() => {
                        let status = status?;
                        if status.success() {
                            Ok(())
                        } else {
                            Err(CompressError::Transcode(format!(
                                "ffmpeg exited with status {status}"
                            )))
                        }
                    }
                }
            };

            Ok(TranscodeOp {
                progress,
                cancel,
                completion: Box::pin(completion),
            })
        })
    }
}

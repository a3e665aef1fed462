use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::{CompressError, QualityPreset, TranscodeOp, Transcoder};

/// Interval between progress samples.
const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Events emitted by a running [`CompressionJob`].
#[derive(Debug, Clone, PartialEq)]
pub enum CompressEvent {
    /// Sampled transcode progress in `[0, 1]`.
    Progress(f32),
    /// Terminal: the output file is ready.
    Completed { output: PathBuf },
    /// Terminal: the transcode failed or was cancelled.
    Failed { error: String },
}

/// A running compression.
///
/// Owns the transcode operation, samples its progress every 100 ms, and
/// reports a terminal event exactly once. Sampling stops as soon as the
/// progress value reaches 1 or the operation finishes.
#[derive(Debug)]
pub struct CompressionJob {
    events: mpsc::Receiver<CompressEvent>,
    cancel: CancellationToken,
    output: PathBuf,
    handle: tokio::task::JoinHandle<Result<PathBuf, CompressError>>,
}

impl CompressionJob {
    /// Starts compressing `source` at `preset`.
    ///
    /// The output goes to a freshly named file in the OS temporary
    /// directory, so concurrent or repeated compressions never collide.
    /// Initialization failures surface here, before any progress events.
    pub async fn spawn(
        transcoder: &dyn Transcoder,
        source: &Path,
        preset: QualityPreset,
        cancel: CancellationToken,
    ) -> Result<Self, CompressError> {
        let output = std::env::temp_dir().join(format!("{}.mp4", Uuid::new_v4()));
        let op = transcoder.start(source, preset, &output).await?;

        debug!(source = %source.display(), output = %output.display(), %preset, "compression started");

        let (events_tx, events_rx) = mpsc::channel(64);
        let handle = tokio::spawn(drive(op, cancel.clone(), output.clone(), events_tx));

        Ok(Self {
            events: events_rx,
            cancel,
            output,
            handle,
        })
    }

    /// Receives the next event; `None` once the job has finished and all
    /// events were drained.
    pub async fn next_event(&mut self) -> Option<CompressEvent> {
        self.events.recv().await
    }

    /// Requests cancellation of the underlying transcode.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Where the transcoded file will be written.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Waits for the job to finish and returns the output file path.
    pub async fn finish(self) -> Result<PathBuf, CompressError> {
        self.handle
            .await
            .map_err(|e| CompressError::Transcode(format!("compression task failed: {e}")))?
    }
}

/// Samples progress on a fixed cadence until the operation completes.
async fn drive(
    op: TranscodeOp,
    cancel: CancellationToken,
    output: PathBuf,
    events_tx: mpsc::Sender<CompressEvent>,
) -> Result<PathBuf, CompressError> {
    let TranscodeOp {
        progress,
        cancel: op_cancel,
        mut completion,
    } = op;

    let mut ticker = tokio::time::interval(SAMPLE_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sampling = true;
    let mut cancel_requested = false;

    let result = loop {
        tokio::select! {
            _ = cancel.cancelled(), if !cancel_requested => {
                cancel_requested = true;
                op_cancel.cancel();
            }
            _ = ticker.tick(), if sampling => {
                let sampled = progress.get();
                let _ = events_tx.send(CompressEvent::Progress(sampled)).await;
                if sampled >= 1.0 {
                    sampling = false;
                }
            }
            result = &mut completion => break result,
        }
    };

    match &result {
        Ok(()) => {
            debug!(output = %output.display(), "compression finished");
            let _ = events_tx
                .send(CompressEvent::Completed {
                    output: output.clone(),
                })
                .await;
        }
        Err(e) => {
            let _ = events_tx
                .send(CompressEvent::Failed {
                    error: e.to_string(),
                })
                .await;
        }
    }
    result.map(|()| output)
}

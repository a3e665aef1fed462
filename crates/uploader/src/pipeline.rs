//! End-to-end upload pipeline.
//!
//! Coordinates resource creation, optional compression, and the payload
//! transfer, aggregating progress events and supporting cancellation.

use std::sync::Arc;

use medialift_api::ApiClient;
use medialift_compress::{CompressEvent, CompressionJob, Transcoder};
use medialift_transfer::TransferError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::UploadError;
use crate::types::{MediaAsset, UploadEvent, UploadedVideo};
use crate::uploader::Uploader;

/// Orchestrates one upload attempt end to end.
///
/// The presentation layer takes the event receiver once and renders
/// whatever arrives; no callback captures any controller state, so
/// nothing here can outlive or dereference a dead driver.
pub struct UploadPipeline {
    api: ApiClient,
    uploader: Uploader,
    transcoder: Arc<dyn Transcoder>,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
    cancel: CancellationToken,
}

impl UploadPipeline {
    /// Creates a new pipeline.
    pub fn new(api: ApiClient, uploader: Uploader, transcoder: Arc<dyn Transcoder>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            api,
            uploader,
            transcoder,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Returns a cancellation token for this attempt.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs one upload attempt: create the resource, compress if a preset
    /// was selected, then transfer the payload.
    ///
    /// Always finishes with a terminal [`UploadEvent::Completed`] or
    /// [`UploadEvent::Failed`] on the event stream, mirroring the return
    /// value. Failures require restarting from the top; no stage is
    /// retried.
    pub async fn run(
        &self,
        asset: &MediaAsset,
        title: &str,
        description: &str,
        token: &str,
    ) -> Result<UploadedVideo, UploadError> {
        let result = self.run_inner(asset, title, description, token).await;

        match &result {
            Ok(video) => {
                info!(hls = %video.hls_url, "upload completed");
                let _ = self
                    .events_tx
                    .send(UploadEvent::Completed {
                        hls_url: video.hls_url.clone(),
                    })
                    .await;
            }
            Err(e) => {
                error!(error = %e, "upload failed");
                let _ = self
                    .events_tx
                    .send(UploadEvent::Failed {
                        error: e.to_string(),
                    })
                    .await;
            }
        }
        result
    }

    async fn run_inner(
        &self,
        asset: &MediaAsset,
        title: &str,
        description: &str,
        token: &str,
    ) -> Result<UploadedVideo, UploadError> {
        self.check_cancelled()?;

        let target = self.api.create_video(title, description, token).await?;

        // A selected preset forces a transcode; otherwise the source file
        // is uploaded as-is.
        let payload_path = match asset.preset {
            Some(preset) => {
                debug!(%preset, source = %asset.path.display(), "compressing before upload");
                let mut job = CompressionJob::spawn(
                    self.transcoder.as_ref(),
                    &asset.path,
                    preset,
                    self.cancel.child_token(),
                )
                .await?;

                while let Some(event) = job.next_event().await {
                    if let CompressEvent::Progress(progress) = event {
                        let _ = self
                            .events_tx
                            .send(UploadEvent::Compressing { progress })
                            .await;
                    }
                }
                job.finish().await?
            }
            None => asset.path.clone(),
        };

        self.check_cancelled()?;
        let payload = tokio::fs::read(&payload_path)
            .await
            .map_err(TransferError::Io)?;

        let hls_url = self
            .uploader
            .upload(&payload, token, &target, &self.events_tx, &self.cancel)
            .await?;

        Ok(UploadedVideo { hls_url })
    }

    fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            Err(UploadError::Cancelled)
        } else {
            Ok(())
        }
    }
}

//! Batch cleanup: delete every video associated with the account.

use futures_util::future::join_all;
use medialift_api::ApiClient;
use tracing::{info, warn};

use crate::error::UploadError;
use crate::types::CleanupReport;

/// Deletes every video listed for the account.
///
/// Deletes fire concurrently and complete in whatever order the server
/// answers, but the call returns only once every delete has responded —
/// "cleanup complete" can never race an in-flight delete. Per-id failures
/// are collected in the report instead of aborting the batch.
pub async fn cleanup(client: &ApiClient, token: &str) -> Result<CleanupReport, UploadError> {
    let ids = client.list_video_ids(token).await?;
    if ids.is_empty() {
        return Ok(CleanupReport::default());
    }

    let deletes = ids.into_iter().map(|id| async move {
        let result = client.delete_video(&id, token).await;
        (id, result)
    });

    let mut report = CleanupReport::default();
    for (id, result) in join_all(deletes).await {
        match result {
            Ok(()) => report.deleted.push(id),
            Err(e) => {
                warn!(%id, error = %e, "delete failed");
                report.failed.push((id, e.to_string()));
            }
        }
    }

    info!(
        deleted = report.deleted.len(),
        failed = report.failed.len(),
        "cleanup finished"
    );
    Ok(report)
}

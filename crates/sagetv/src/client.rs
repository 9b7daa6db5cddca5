use sageplex_core::SyncError;

use crate::RecorderRecord;

/// Viewing-state access to the recorder.
///
/// Implementations serialize their requests: at most one call is in
/// flight at a time per client.
#[async_trait::async_trait]
pub trait RecorderClient: Send + Sync {
    fn name(&self) -> &str;

    /// Look up a recording by base filename. `Ok(None)` means the
    /// recorder answered and does not know the file.
    async fn find_by_filename(&self, filename: &str) -> Result<Option<RecorderRecord>, SyncError>;

    /// Remove all watched information from an airing.
    async fn clear_watched(&self, airing_id: &str) -> Result<(), SyncError>;

    /// Mark an airing as watched start to finish.
    async fn set_watched(&self, airing_id: &str) -> Result<(), SyncError>;

    /// Record a partial view. `watched_end_ms` is an absolute airing time
    /// (airing start plus resume offset); `real_start_ms` is the wall-clock
    /// time the view began.
    async fn set_watched_window(
        &self,
        airing_id: &str,
        watched_end_ms: i64,
        real_start_ms: i64,
    ) -> Result<(), SyncError>;
}

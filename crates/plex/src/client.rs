use futures::stream::BoxStream;
use sageplex_core::SyncError;

use crate::{MediaVideo, SectionInfo, WalkRoot};

/// Lazily produced videos of a library walk. Finite, and not restartable
/// once partially consumed.
pub type VideoStream<'a> = BoxStream<'a, Result<MediaVideo, SyncError>>;

/// Library and viewing-state access to the media server.
#[async_trait::async_trait]
pub trait MediaServerClient: Send + Sync {
    fn name(&self) -> &str;

    /// Library sections in server order.
    async fn list_sections(&self) -> Result<Vec<SectionInfo>, SyncError>;

    /// Visit every video below `root`, depth first (show, season, episode).
    /// A failing container or malformed node yields an `Err` item and the
    /// walk continues with its siblings.
    fn walk(&self, root: &WalkRoot) -> VideoStream<'_>;

    /// Mark a video watched or unwatched. Marking watched also resets the
    /// server's stored resume position.
    async fn set_watched(&self, video_id: &str, watched: bool) -> Result<(), SyncError>;

    async fn set_progress(&self, video_id: &str, position_ms: i64) -> Result<(), SyncError>;

    /// Ask the server to rescan a section.
    async fn refresh_section(&self, section_id: &str) -> Result<(), SyncError>;

    async fn delete_section(&self, section_id: &str) -> Result<(), SyncError>;
}

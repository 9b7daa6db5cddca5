//! Batch driver: expand a selection into walk roots, reconcile every
//! video below them in order, and accumulate the run summary.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use sageplex_core::SyncError;
use sageplex_plex::{MediaServerClient, MediaVideo, WalkRoot};

use crate::context::SyncContext;
use crate::engine::{SyncOutcome, override_position, sync_video};
use crate::summary::Summary;

/// What the operator asked to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Media-server rating keys; shows and seasons expand to episodes.
    Media(Vec<String>),
    /// Section ids or section titles.
    Sections(Vec<String>),
    All,
}

impl Selection {
    /// Interpret positional ids. A literal `all` among section ids selects
    /// every section.
    pub fn from_ids(ids: Vec<String>, media: bool) -> Self {
        if media {
            Self::Media(ids)
        } else if ids.iter().any(|id| id == "all") {
            Self::All
        } else {
            Self::Sections(ids)
        }
    }
}

/// Walk roots for a selection, plus the ids that could not be used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSelection {
    pub roots: Vec<WalkRoot>,
    pub rejected: Vec<String>,
}

fn is_numeric(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// Turn a selection into walk roots. Sections are listed only when a
/// title has to be resolved or every section was asked for.
pub async fn resolve_roots(
    media: &dyn MediaServerClient,
    selection: &Selection,
) -> Result<ResolvedSelection, SyncError> {
    let mut resolved = ResolvedSelection::default();
    match selection {
        Selection::Media(ids) => {
            for id in ids {
                if is_numeric(id) {
                    resolved.roots.push(WalkRoot::Media(id.clone()));
                } else {
                    warn!(id = %id, "media id is not a number");
                    resolved
                        .rejected
                        .push(format!("must be a PLEX media-id number: {id}"));
                }
            }
        }
        Selection::All => {
            let sections = media.list_sections().await?;
            resolved.roots = sections
                .into_iter()
                .map(|s| WalkRoot::Section(s.id))
                .collect();
        }
        Selection::Sections(ids) => {
            let sections = if ids.iter().all(|id| is_numeric(id)) {
                Vec::new()
            } else {
                media.list_sections().await?
            };
            for id in ids {
                if is_numeric(id) {
                    resolved.roots.push(WalkRoot::Section(id.clone()));
                } else if let Some(section) = sections.iter().find(|s| s.title == *id) {
                    resolved.roots.push(WalkRoot::Section(section.id.clone()));
                } else {
                    warn!(name = %id, "section not found");
                    resolved.rejected.push(format!("section not found: {id}"));
                }
            }
        }
    }
    Ok(resolved)
}

/// Per-video work done by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Reconcile,
    /// Force the media-server resume position to this many milliseconds.
    SetPosition(i64),
}

/// A video (or a walk branch) that could not be processed.
#[derive(Debug)]
pub struct VideoFailure {
    /// `None` when the walk itself failed before a video was decoded.
    pub video_id: Option<String>,
    pub title: String,
    pub error: SyncError,
}

pub type VideoResult = Result<SyncOutcome, VideoFailure>;

async fn process(ctx: &SyncContext, media: MediaVideo, action: Action) -> VideoResult {
    let video_id = media.rating_key().to_string();
    let title = media.state.title.clone();
    let result = match action {
        Action::Reconcile => sync_video(ctx, media).await,
        Action::SetPosition(position_ms) => override_position(ctx, media, position_ms).await,
    };
    result.map_err(|error| VideoFailure {
        video_id: Some(video_id),
        title,
        error,
    })
}

fn log_failure(failure: &VideoFailure) {
    if failure.error.is_invariant_violation() {
        error!(
            invariant = true,
            video_id = ?failure.video_id,
            title = %failure.title,
            error = %failure.error,
            "reconciliation policy violated"
        );
    } else {
        error!(
            video_id = ?failure.video_id,
            title = %failure.title,
            code = failure.error.code(),
            error = %failure.error,
            "video failed"
        );
    }
}

/// Process every video below `roots`, one at a time, in walk order.
///
/// `on_video` sees each result as soon as it is final. Failures are
/// recorded and the run moves on. Cancellation is checked between
/// videos: the in-flight video completes, then the run stops with
/// `Summary::cancelled` set.
pub async fn run_batch<F>(
    ctx: &SyncContext,
    roots: &[WalkRoot],
    action: Action,
    cancel: &CancellationToken,
    mut on_video: F,
) -> Summary
where
    F: FnMut(&VideoResult),
{
    let run_id = Uuid::new_v4();
    let span = info_span!("sync_run", run_id = %run_id, mode = ?ctx.mode);

    async move {
        let mut summary = Summary::default();
        info!(roots = roots.len(), ?action, "run started");

        'roots: for root in roots {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            info!(root = %root, path = %root.path(), "walking");

            let mut videos = ctx.media.walk(root);
            while let Some(item) = videos.next().await {
                let result = match item {
                    Ok(media) => process(ctx, media, action).await,
                    Err(error) => Err(VideoFailure {
                        video_id: None,
                        title: root.to_string(),
                        error,
                    }),
                };

                match &result {
                    Ok(outcome) => summary.record(outcome),
                    Err(failure) => {
                        log_failure(failure);
                        summary.record_failure(failure);
                    }
                }
                on_video(&result);

                if cancel.is_cancelled() {
                    warn!("cancelled, stopping after the current video");
                    summary.cancelled = true;
                    break 'roots;
                }
            }
        }

        info!(
            processed = summary.processed,
            in_sync = summary.in_sync,
            updated = summary.updated,
            failed = summary.failed.len(),
            cancelled = summary.cancelled,
            "run finished"
        );
        summary
    }
    .instrument(span)
    .await
}

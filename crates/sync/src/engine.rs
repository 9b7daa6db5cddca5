//! Reconciliation of one video's viewing state across both systems.
//!
//! [`reconcile`] is pure: it classifies a media-server video against its
//! recorder counterpart and plans the correction, if any. [`sync_video`]
//! adds the recorder lookup, confirmation and the mutating calls.

use std::time::Duration;

use tracing::{debug, info, warn};

use sageplex_core::{OutcomeKind, Side, SyncError, Thresholds};
use sageplex_plex::MediaVideo;
use sageplex_sagetv::RecorderRecord;

use crate::context::{Proposal, RunMode, SyncContext, SyncPolicy};

const LOOKUP_RETRY_DELAY: Duration = Duration::from_millis(120);

/// A planned mutation on the stale side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// Mark the media-server video watched. The server resets its resume
    /// point as a side effect.
    MediaWatched,
    /// Mark the media-server video unwatched, dropping its view count and
    /// resume point.
    MediaUnwatched,
    MediaProgress { position_ms: i64 },
    RecorderWatched,
    /// Drop the recorder's watched flag and resume point.
    RecorderCleared,
    /// Write a partial view to the recorder, clearing a watched flag
    /// first when `clear_first` is set.
    RecorderWindow {
        clear_first: bool,
        watched_end_ms: i64,
        real_start_ms: i64,
    },
}

impl Correction {
    pub fn target(self) -> Side {
        match self {
            Self::MediaWatched | Self::MediaUnwatched | Self::MediaProgress { .. } => {
                Side::MediaServer
            }
            Self::RecorderWatched | Self::RecorderCleared | Self::RecorderWindow { .. } => {
                Side::Recorder
            }
        }
    }

    pub fn describe(self) -> String {
        match self {
            Self::MediaWatched | Self::RecorderWatched => "watched".to_string(),
            Self::MediaProgress { position_ms } => format!("pos {position_ms}ms"),
            Self::MediaUnwatched | Self::RecorderCleared => "- watched".to_string(),
            Self::RecorderWindow {
                clear_first,
                watched_end_ms,
                real_start_ms,
            } => {
                let clear = if clear_first { "- watched, " } else { "" };
                format!("{clear}window end={watched_end_ms} real_start={real_start_ms}")
            }
        }
    }
}

/// Result of comparing the two viewing states of one video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub kind: OutcomeKind,
    pub correction: Option<Correction>,
    pub watched_in_sync: bool,
    pub pos_in_sync: bool,
    pub media_normalized_ms: i64,
    pub recorder_normalized_ms: Option<i64>,
}

impl Decision {
    fn new(kind: OutcomeKind, correction: Option<Correction>) -> Self {
        Self {
            kind,
            correction,
            watched_in_sync: true,
            pos_in_sync: true,
            media_normalized_ms: 0,
            recorder_normalized_ms: None,
        }
    }
}

/// What became of a video's correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Nothing to correct.
    Unchanged,
    /// Out of sync, but the run only reports status.
    Reported,
    /// The operator declined the correction.
    Declined,
    /// Decided but not issued (simulate mode).
    Simulated,
    Applied,
}

/// Per-video result of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    pub kind: OutcomeKind,
    pub media: MediaVideo,
    pub recorder: Option<RecorderRecord>,
    pub decision: Decision,
    pub resolution: Resolution,
}

impl SyncOutcome {
    pub fn correction(&self) -> Option<Correction> {
        self.decision.correction
    }

    pub fn is_updated(&self) -> bool {
        self.resolution == Resolution::Applied
    }
}

/// Classify one video and plan the correction of its stale side.
///
/// Returns `InvariantViolation` if the watched flags are reported as
/// differing while being equal, which means the policy itself is broken.
pub fn reconcile(
    media: &MediaVideo,
    recorder: Option<&RecorderRecord>,
    policy: &SyncPolicy,
) -> Result<Decision, SyncError> {
    let thresholds = &policy.thresholds;
    let m = &media.state;
    let media_norm = m.normalized_resume(thresholds);

    let Some(record) = recorder else {
        let mut decision = Decision::new(OutcomeKind::NotFoundOnRecorder, None);
        decision.media_normalized_ms = media_norm;
        return Ok(decision);
    };
    let r = &record.state;
    let recorder_norm = r.normalized_resume(thresholds);

    let mut watched_in_sync = m.watched == r.watched;
    let pos_in_sync = (media_norm - recorder_norm).abs() <= policy.tolerance_ms;

    // A rewatch in progress: the media server counted the completed view
    // before the resume point caught up.
    if pos_in_sync && recorder_norm > 0 && !r.watched && m.watched {
        watched_in_sync = true;
    }

    let (kind, correction) = if watched_in_sync && pos_in_sync {
        (OutcomeKind::InSync, None)
    } else if !pos_in_sync {
        if m.last_watched_secs() > r.last_watched_secs() {
            let correction = recorder_correction(media, record, thresholds);
            (OutcomeKind::RecorderOutOfSync, Some(correction))
        } else {
            // The media server ignores progress below the start-ignore
            // threshold, so "not started" is written as unwatched.
            let correction = if r.watched {
                Correction::MediaWatched
            } else if recorder_norm == 0 {
                Correction::MediaUnwatched
            } else {
                Correction::MediaProgress {
                    position_ms: r.resume_ms,
                }
            };
            (OutcomeKind::MediaOutOfSync, Some(correction))
        }
    } else if r.watched && !m.watched {
        (OutcomeKind::MediaOutOfSync, Some(Correction::MediaWatched))
    } else if m.watched && !r.watched {
        (OutcomeKind::RecorderOutOfSync, Some(Correction::RecorderWatched))
    } else {
        return Err(SyncError::InvariantViolation(format!(
            "{}: watched flags equal ({}) but reported out of sync",
            m.filename, m.watched
        )));
    };

    Ok(Decision {
        kind,
        correction,
        watched_in_sync,
        pos_in_sync,
        media_normalized_ms: media_norm,
        recorder_normalized_ms: Some(recorder_norm),
    })
}

/// Bring the recorder in line with the media server's state.
fn recorder_correction(
    media: &MediaVideo,
    record: &RecorderRecord,
    thresholds: &Thresholds,
) -> Correction {
    let m = &media.state;
    if m.normalized_resume(thresholds) == 0 {
        // Nothing to resume: either finished or never really started.
        if m.watched || m.is_near_end(thresholds) {
            return Correction::RecorderWatched;
        }
        return Correction::RecorderCleared;
    }
    Correction::RecorderWindow {
        clear_first: record.state.watched,
        watched_end_ms: record.airing_start_ms + m.resume_ms,
        real_start_ms: m.last_watched_ms - m.resume_ms,
    }
}

/// Issue the mutating calls for a correction.
pub async fn apply(
    ctx: &SyncContext,
    correction: Correction,
    media: &MediaVideo,
    recorder: Option<&RecorderRecord>,
) -> Result<(), SyncError> {
    let video_id = media.rating_key();
    let airing_id = || {
        recorder.map(|r| r.airing_id.as_str()).ok_or_else(|| {
            SyncError::InvariantViolation(format!(
                "{video_id}: recorder correction without a recorder record"
            ))
        })
    };

    match correction {
        Correction::MediaWatched => ctx.media.set_watched(video_id, true).await,
        Correction::MediaUnwatched => ctx.media.set_watched(video_id, false).await,
        Correction::MediaProgress { position_ms } => {
            ctx.media.set_progress(video_id, position_ms).await
        }
        Correction::RecorderWatched => ctx.recorder.set_watched(airing_id()?).await,
        Correction::RecorderCleared => ctx.recorder.clear_watched(airing_id()?).await,
        Correction::RecorderWindow {
            clear_first,
            watched_end_ms,
            real_start_ms,
        } => {
            let airing_id = airing_id()?;
            if clear_first {
                ctx.recorder.clear_watched(airing_id).await?;
            }
            ctx.recorder
                .set_watched_window(airing_id, watched_end_ms, real_start_ms)
                .await
        }
    }
}

/// Recorder lookup, retried only while the failure is transient.
pub async fn lookup_with_retry(
    ctx: &SyncContext,
    filename: &str,
) -> Result<Option<RecorderRecord>, SyncError> {
    let mut attempt = 0;
    loop {
        match ctx.recorder.find_by_filename(filename).await {
            Ok(record) => return Ok(record),
            Err(e) if e.is_transient() && attempt < ctx.policy.lookup_retries => {
                attempt += 1;
                warn!(filename, attempt, error = %e, "recorder lookup failed, retrying");
                tokio::time::sleep(LOOKUP_RETRY_DELAY * attempt).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Decide what to do with a planned correction under the run mode, and
/// apply it when confirmed.
async fn resolve(ctx: &SyncContext, proposal: Proposal<'_>) -> Result<Resolution, SyncError> {
    let simulate = match ctx.mode {
        RunMode::Status => return Ok(Resolution::Reported),
        RunMode::Sync { simulate } => simulate,
    };
    if !ctx.confirm.confirm(&proposal) {
        info!(video_id = proposal.media.rating_key(), "correction declined");
        return Ok(Resolution::Declined);
    }
    if simulate {
        return Ok(Resolution::Simulated);
    }
    apply(ctx, *proposal.correction, proposal.media, proposal.recorder).await?;
    info!(
        video_id = proposal.media.rating_key(),
        target = proposal.correction.target().as_str(),
        correction = %proposal.correction.describe(),
        "correction applied"
    );
    Ok(Resolution::Applied)
}

/// Look up, classify and (depending on the run mode) correct one video.
pub async fn sync_video(ctx: &SyncContext, media: MediaVideo) -> Result<SyncOutcome, SyncError> {
    let recorder = lookup_with_retry(ctx, &media.state.filename).await?;
    let decision = reconcile(&media, recorder.as_ref(), &ctx.policy)?;
    debug!(
        video_id = media.rating_key(),
        filename = %media.state.filename,
        kind = decision.kind.as_str(),
        watched_in_sync = decision.watched_in_sync,
        pos_in_sync = decision.pos_in_sync,
        "reconciled"
    );

    let resolution = match &decision.correction {
        None => Resolution::Unchanged,
        Some(correction) => {
            let proposal = Proposal {
                kind: decision.kind,
                media: &media,
                recorder: recorder.as_ref(),
                correction,
            };
            resolve(ctx, proposal).await?
        }
    };

    Ok(SyncOutcome {
        kind: decision.kind,
        media,
        recorder,
        decision,
        resolution,
    })
}

/// Set an explicit media-server resume position, bypassing the recorder.
/// A video already at `position_ms` is left alone.
pub async fn override_position(
    ctx: &SyncContext,
    media: MediaVideo,
    position_ms: i64,
) -> Result<SyncOutcome, SyncError> {
    let mut decision = Decision::new(OutcomeKind::InSync, None);
    decision.media_normalized_ms = media.state.normalized_resume(&ctx.policy.thresholds);

    if media.state.resume_ms != position_ms {
        let correction = Correction::MediaProgress { position_ms };
        decision.kind = OutcomeKind::MediaOutOfSync;
        decision.correction = Some(correction);
        decision.pos_in_sync = false;
    }

    let resolution = match &decision.correction {
        None => Resolution::Unchanged,
        Some(correction) => {
            let proposal = Proposal {
                kind: decision.kind,
                media: &media,
                recorder: None,
                correction,
            };
            resolve(ctx, proposal).await?
        }
    };

    Ok(SyncOutcome {
        kind: decision.kind,
        media,
        recorder: None,
        decision,
        resolution,
    })
}

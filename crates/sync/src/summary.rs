use std::fmt;

use serde::Serialize;

use sageplex_core::OutcomeKind;

use crate::driver::VideoFailure;
use crate::engine::SyncOutcome;

/// One out-of-sync or unmatched video, kept for the end-of-run listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketEntry {
    pub video_id: String,
    pub title: String,
    pub media_watched: bool,
    pub media_resume_ms: i64,
    pub recorder_watched: Option<bool>,
    pub recorder_resume_ms: Option<i64>,
}

impl BucketEntry {
    fn from_outcome(outcome: &SyncOutcome) -> Self {
        let recorder = outcome.recorder.as_ref().map(|r| &r.state);
        Self {
            video_id: outcome.media.rating_key().to_string(),
            title: outcome.media.state.title.clone(),
            media_watched: outcome.media.state.watched,
            media_resume_ms: outcome.media.state.resume_ms,
            recorder_watched: recorder.map(|s| s.watched),
            recorder_resume_ms: recorder.map(|s| s.resume_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEntry {
    pub video_id: Option<String>,
    pub title: String,
    pub code: &'static str,
    pub message: String,
}

/// Run-wide counters and per-bucket listings, owned by the driver.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub processed: usize,
    pub in_sync: usize,
    pub media_out_of_sync: Vec<BucketEntry>,
    pub recorder_out_of_sync: Vec<BucketEntry>,
    pub not_on_recorder: Vec<BucketEntry>,
    pub failed: Vec<FailureEntry>,
    pub updated: usize,
    /// Stopped early on request; counts cover the videos finished so far.
    pub cancelled: bool,
}

impl Summary {
    pub fn record(&mut self, outcome: &SyncOutcome) {
        self.processed += 1;
        if outcome.is_updated() {
            self.updated += 1;
        }
        match outcome.kind {
            OutcomeKind::InSync => self.in_sync += 1,
            OutcomeKind::MediaOutOfSync => {
                self.media_out_of_sync.push(BucketEntry::from_outcome(outcome))
            }
            OutcomeKind::RecorderOutOfSync => {
                self.recorder_out_of_sync.push(BucketEntry::from_outcome(outcome))
            }
            OutcomeKind::NotFoundOnRecorder => {
                self.not_on_recorder.push(BucketEntry::from_outcome(outcome))
            }
        }
    }

    pub fn record_failure(&mut self, failure: &VideoFailure) {
        self.processed += 1;
        self.failed.push(FailureEntry {
            video_id: failure.video_id.clone(),
            title: failure.title.clone(),
            code: failure.error.code(),
            message: failure.error.to_string(),
        });
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} videos", self.processed)?;
        let counts = [
            (self.in_sync, "in-sync"),
            (self.media_out_of_sync.len(), "PLEX out-of-sync"),
            (self.recorder_out_of_sync.len(), "SageTV out-of-sync"),
            (self.not_on_recorder.len(), "not in SageTV"),
            (self.failed.len(), "failed"),
            (self.updated, "updated"),
        ];
        for (count, label) in counts {
            if count > 0 {
                write!(f, ", {count} {label}")?;
            }
        }
        Ok(())
    }
}

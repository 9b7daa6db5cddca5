//! Viewing-state snapshot shared by both systems, and resume-position
//! normalization.
//!
//! The two systems disagree on what "finished" looks like. The media
//! server rewinds the resume point to the start after a complete view
//! and keeps a view counter, so a rewatch in progress is "watched" with
//! a resume point. The recorder leaves the resume point at (or near) the
//! end and clears its watched flag on rewatch. Normalization folds these
//! representations into one comparable value.

use serde::{Deserialize, Serialize};

use crate::types::Side;

/// Resume points closer than this to the start count as "not started".
pub const DEFAULT_START_IGNORE_MS: i64 = 60_000;

/// Resume points within `duration / divisor` of the end count as finished.
pub const DEFAULT_END_IGNORE_DIVISOR: i64 = 20;

/// Largest normalized difference still considered in sync.
pub const DEFAULT_TOLERANCE_MS: i64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub start_ignore_ms: i64,
    /// `0` disables the near-end rule.
    pub end_ignore_divisor: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            start_ignore_ms: DEFAULT_START_IGNORE_MS,
            end_ignore_divisor: DEFAULT_END_IGNORE_DIVISOR,
        }
    }
}

impl Thresholds {
    pub fn with_start_ignore_secs(mut self, secs: u32) -> Self {
        self.start_ignore_ms = i64::from(secs) * 1000;
        self
    }
}

/// Collapse a raw resume position into its comparison value.
///
/// Returns `0` when the video is fully watched on the recorder, when the
/// position is inside the start-ignore window, or (media server only)
/// when the position is within the end fraction of a known duration.
/// Otherwise the raw position is returned unchanged, which makes the
/// function idempotent.
pub fn normalize_resume(
    side: Side,
    watched: bool,
    resume_ms: i64,
    duration_ms: i64,
    thresholds: &Thresholds,
) -> i64 {
    let resume = resume_ms.max(0);
    if resume == 0 {
        return 0;
    }
    if side == Side::Recorder && watched {
        return 0;
    }
    if resume < thresholds.start_ignore_ms {
        return 0;
    }
    if side == Side::MediaServer && is_near_end(resume, duration_ms, thresholds) {
        return 0;
    }
    resume
}

/// Whether `resume_ms` lies in the final `1/divisor` of `duration_ms`.
///
/// An unknown (zero) duration never counts; a position at or past a known
/// duration always does.
pub fn is_near_end(resume_ms: i64, duration_ms: i64, thresholds: &Thresholds) -> bool {
    if duration_ms <= 0 || thresholds.end_ignore_divisor <= 0 || resume_ms <= 0 {
        return false;
    }
    if resume_ms >= duration_ms {
        return true;
    }
    duration_ms - resume_ms <= duration_ms / thresholds.end_ignore_divisor
}

/// Watched/resume snapshot of one video on one system.
///
/// All times are milliseconds. The normalized resume position is derived
/// on demand from the raw fields and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewingState {
    pub side: Side,
    /// Rating key on the media server, airing id on the recorder.
    pub identity: String,
    pub title: String,
    /// Base filename; the join key between the two systems.
    pub filename: String,
    pub watched: bool,
    pub resume_ms: i64,
    pub duration_ms: i64,
    /// Epoch milliseconds of the most recent view or update, `0` if never.
    pub last_watched_ms: i64,
}

impl ViewingState {
    pub fn normalized_resume(&self, thresholds: &Thresholds) -> i64 {
        normalize_resume(
            self.side,
            self.watched,
            self.resume_ms,
            self.duration_ms,
            thresholds,
        )
    }

    /// Last-watched time at whole-second resolution, the precision the
    /// media server stores.
    pub fn last_watched_secs(&self) -> i64 {
        self.last_watched_ms.div_euclid(1000)
    }

    pub fn is_near_end(&self, thresholds: &Thresholds) -> bool {
        is_near_end(self.resume_ms, self.duration_ms, thresholds)
    }
}

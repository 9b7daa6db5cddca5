pub mod client;
pub mod media_file;
pub mod sagex;

pub use client::RecorderClient;
pub use sagex::SagexClient;

use sageplex_core::ViewingState;

/// A recording as known by the recorder, matched by filename.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderRecord {
    pub media_file_id: Option<i64>,
    pub airing_id: String,
    /// Absolute start of the airing; watched windows are written relative to it.
    pub airing_start_ms: i64,
    pub state: ViewingState,
    pub watched_window: Option<WatchWindow>,
    /// Wall-clock span the user actually spent watching, which may cover months.
    pub real_watched_window: Option<WatchWindow>,
    /// Payload as returned by the recorder, kept for diagnostics.
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl WatchWindow {
    pub fn from_bounds(start_ms: Option<i64>, end_ms: Option<i64>) -> Option<Self> {
        match (start_ms, end_ms) {
            (Some(start_ms), Some(end_ms)) if start_ms > 0 && end_ms > 0 => {
                Some(Self { start_ms, end_ms })
            }
            _ => None,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.end_ms - self.start_ms).max(0)
    }
}

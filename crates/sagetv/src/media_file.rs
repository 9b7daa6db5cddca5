//! Typed decode of the recorder's `MediaFile` payload.
//!
//! Only the `Airing` block matters for viewing state. Missing required
//! fields fail here with `MalformedResponse` instead of surfacing later
//! as zeroes inside the reconciliation logic.

use serde::Deserialize;
use serde_json::Value;

use sageplex_core::{Side, SyncError, ViewingState};

use crate::{RecorderRecord, WatchWindow};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MediaFileDto {
    #[serde(rename = "MediaFileID")]
    media_file_id: Option<i64>,
    airing: Option<AiringDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AiringDto {
    #[serde(rename = "AiringID")]
    airing_id: Option<AiringId>,
    airing_start_time: Option<i64>,
    airing_duration: Option<i64>,
    is_watched: Option<bool>,
    latest_watched_time: Option<i64>,
    watched_duration: Option<i64>,
    watched_start_time: Option<i64>,
    watched_end_time: Option<i64>,
    real_watched_start_time: Option<i64>,
    real_watched_end_time: Option<i64>,
    show: Option<ShowDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ShowDto {
    show_title: Option<String>,
    show_episode: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AiringId {
    Number(i64),
    Text(String),
}

impl AiringId {
    fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

/// Decode a `GetMediaFileForName` response body.
///
/// The recorder answers `false` (or omits the key) when no recording
/// matches, which decodes to `Ok(None)`.
pub fn decode_media_file(
    filename: &str,
    body: Value,
) -> Result<Option<RecorderRecord>, SyncError> {
    let Value::Object(mut envelope) = body else {
        return Err(SyncError::MalformedResponse(format!(
            "expected a JSON object for {filename}"
        )));
    };

    let raw = match envelope.remove("MediaFile") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => return Ok(None),
        Some(v) => v,
    };

    let dto: MediaFileDto = serde_json::from_value(raw.clone())
        .map_err(|e| SyncError::MalformedResponse(format!("MediaFile for {filename}: {e}")))?;

    let missing = |what: &str| SyncError::MalformedResponse(format!("{filename}: no {what}"));

    let airing = dto.airing.ok_or_else(|| missing("MediaFile.Airing"))?;
    let airing_id = airing
        .airing_id
        .map(AiringId::into_string)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| missing("Airing.AiringID"))?;
    let airing_start_ms = airing
        .airing_start_time
        .ok_or_else(|| missing("Airing.AiringStartTime"))?;

    let watched_window =
        WatchWindow::from_bounds(airing.watched_start_time, airing.watched_end_time);
    let real_watched_window =
        WatchWindow::from_bounds(airing.real_watched_start_time, airing.real_watched_end_time);

    // LatestWatchedTime tracks the airing-relative end of the watched
    // window rather than when the user last watched, so the real end
    // time wins when it is later.
    let mut last_watched_ms = airing.latest_watched_time.unwrap_or(0).max(0);
    if let Some(real) = real_watched_window {
        last_watched_ms = last_watched_ms.max(real.end_ms);
    }

    let title = airing
        .show
        .as_ref()
        .and_then(|show| {
            let title = show.show_title.as_deref().filter(|t| !t.is_empty())?;
            Some(match show.show_episode.as_deref().filter(|e| !e.is_empty()) {
                Some(episode) => format!("{title} - {episode}"),
                None => title.to_string(),
            })
        })
        .unwrap_or_else(|| filename.to_string());

    let state = ViewingState {
        side: Side::Recorder,
        identity: airing_id.clone(),
        title,
        filename: filename.to_string(),
        watched: airing.is_watched.unwrap_or(false),
        resume_ms: airing.watched_duration.unwrap_or(0).max(0),
        duration_ms: airing.airing_duration.unwrap_or(0).max(0),
        last_watched_ms,
    };

    Ok(Some(RecorderRecord {
        media_file_id: dto.media_file_id,
        airing_id,
        airing_start_ms,
        state,
        watched_window,
        real_watched_window,
        raw,
    }))
}

//! In-memory stand-ins for both systems. Mutations change the stored
//! state the way the real servers do, and every call is recorded.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use futures::StreamExt;
use sageplex_core::{Side, SyncError, ViewingState};
use sageplex_plex::{MediaServerClient, MediaVideo, SectionInfo, VideoStream, WalkRoot};
use sageplex_sagetv::{RecorderClient, RecorderRecord};

pub const DURATION: i64 = 1_800_000;
pub const T1: i64 = 1_428_000_000_000;
pub const T2: i64 = 1_428_900_000_000;
/// Later than any fixture timestamp; mutations stamp from here on.
pub const NOW: i64 = 1_430_000_000_000;
pub const AIRING_START: i64 = 1_427_000_000_000;
/// Plex keeps no resume point below one minute.
pub const MIN_STORED_PROGRESS_MS: i64 = 60_000;

pub fn media_video(key: &str, watched: bool, resume_ms: i64, last_watched_ms: i64) -> MediaVideo {
    MediaVideo {
        state: ViewingState {
            side: Side::MediaServer,
            identity: key.to_string(),
            title: format!("Episode {key}"),
            filename: format!("Show-{key}.mpg"),
            watched,
            resume_ms,
            duration_ms: DURATION,
            last_watched_ms,
        },
        view_count: i64::from(watched),
        file_path: format!("/tv/Show-{key}.mpg"),
    }
}

pub fn recorder_record(
    key: &str,
    watched: bool,
    resume_ms: i64,
    last_watched_ms: i64,
) -> RecorderRecord {
    let airing_id = format!("9{key}");
    RecorderRecord {
        media_file_id: Some(1),
        airing_id: airing_id.clone(),
        airing_start_ms: AIRING_START,
        state: ViewingState {
            side: Side::Recorder,
            identity: airing_id,
            title: format!("Show - Episode {key}"),
            filename: format!("Show-{key}.mpg"),
            watched,
            resume_ms,
            duration_ms: DURATION,
            last_watched_ms,
        },
        watched_window: None,
        real_watched_window: None,
        raw: serde_json::json!({ "MediaFile": { "MediaFileID": 1 } }),
    }
}

#[derive(Default)]
struct Clock(AtomicI64);

impl Clock {
    fn tick(&self) -> i64 {
        NOW + self.0.fetch_add(1, Ordering::SeqCst) * 1000
    }
}

#[derive(Default)]
pub struct FakeMedia {
    sections: Vec<SectionInfo>,
    videos: Mutex<Vec<(String, MediaVideo)>>,
    calls: Mutex<Vec<String>>,
    clock: Clock,
}

impl FakeMedia {
    pub fn with_section(mut self, id: &str, title: &str) -> Self {
        self.sections.push(SectionInfo {
            id: id.to_string(),
            title: title.to_string(),
            kind: "show".to_string(),
        });
        self
    }

    pub fn with_video(self, section: &str, video: MediaVideo) -> Self {
        self.videos
            .lock()
            .unwrap()
            .push((section.to_string(), video));
        self
    }

    pub fn video(&self, key: &str) -> MediaVideo {
        self.videos
            .lock()
            .unwrap()
            .iter()
            .find(|(_, v)| v.rating_key() == key)
            .map(|(_, v)| v.clone())
            .unwrap()
    }

    /// Mutating calls only.
    pub fn mutations(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| !c.starts_with("walk") && !c.starts_with("list"))
            .cloned()
            .collect()
    }

    fn update(&self, key: &str, f: impl FnOnce(&mut MediaVideo, i64)) -> Result<(), SyncError> {
        let now = self.clock.tick();
        let mut videos = self.videos.lock().unwrap();
        let (_, video) = videos
            .iter_mut()
            .find(|(_, v)| v.rating_key() == key)
            .ok_or_else(|| SyncError::NotFound(key.to_string()))?;
        f(video, now);
        Ok(())
    }
}

#[async_trait::async_trait]
impl MediaServerClient for FakeMedia {
    fn name(&self) -> &str {
        "fake-plex"
    }

    async fn list_sections(&self) -> Result<Vec<SectionInfo>, SyncError> {
        self.calls.lock().unwrap().push("list".to_string());
        Ok(self.sections.clone())
    }

    fn walk(&self, root: &WalkRoot) -> VideoStream<'_> {
        self.calls.lock().unwrap().push(format!("walk {root}"));
        let videos = self.videos.lock().unwrap();
        let items: Vec<Result<MediaVideo, SyncError>> = match root {
            WalkRoot::Section(id) if self.sections.iter().any(|s| s.id == *id) => videos
                .iter()
                .filter(|(section, _)| section == id)
                .map(|(_, v)| Ok(v.clone()))
                .collect(),
            WalkRoot::Media(key) => match videos.iter().find(|(_, v)| v.rating_key() == *key) {
                Some((_, v)) => vec![Ok(v.clone())],
                None => vec![Err(SyncError::NotFound(root.path()))],
            },
            WalkRoot::Section(_) => vec![Err(SyncError::NotFound(root.path()))],
        };
        futures::stream::iter(items).boxed()
    }

    async fn set_watched(&self, video_id: &str, watched: bool) -> Result<(), SyncError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("set_watched {video_id} {watched}"));
        self.update(video_id, |v, now| {
            v.state.watched = watched;
            v.state.resume_ms = 0;
            v.view_count = if watched { v.view_count + 1 } else { 0 };
            v.state.last_watched_ms = now;
        })
    }

    async fn set_progress(&self, video_id: &str, position_ms: i64) -> Result<(), SyncError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("set_progress {video_id} {position_ms}"));
        if position_ms < MIN_STORED_PROGRESS_MS {
            return Ok(());
        }
        self.update(video_id, |v, now| {
            v.state.resume_ms = position_ms;
            v.state.last_watched_ms = now;
        })
    }

    async fn refresh_section(&self, section_id: &str) -> Result<(), SyncError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("refresh {section_id}"));
        Ok(())
    }

    async fn delete_section(&self, section_id: &str) -> Result<(), SyncError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("delete {section_id}"));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRecorder {
    records: Mutex<HashMap<String, RecorderRecord>>,
    /// Filename to the error returned on every lookup.
    broken: Mutex<HashMap<String, fn() -> SyncError>>,
    /// Filename to the number of lookups that still fail transiently.
    flaky: Mutex<HashMap<String, u32>>,
    lookups: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
    clock: Clock,
}

impl FakeRecorder {
    pub fn with_record(self, record: RecorderRecord) -> Self {
        self.records
            .lock()
            .unwrap()
            .insert(record.state.filename.clone(), record);
        self
    }

    pub fn with_broken(self, filename: &str, error: fn() -> SyncError) -> Self {
        self.broken
            .lock()
            .unwrap()
            .insert(filename.to_string(), error);
        self
    }

    pub fn with_flaky(self, filename: &str, failures: u32) -> Self {
        self.flaky
            .lock()
            .unwrap()
            .insert(filename.to_string(), failures);
        self
    }

    pub fn record(&self, filename: &str) -> RecorderRecord {
        self.records.lock().unwrap()[filename].clone()
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn update(
        &self,
        airing_id: &str,
        f: impl FnOnce(&mut RecorderRecord, i64),
    ) -> Result<(), SyncError> {
        let now = self.clock.tick();
        let mut records = self.records.lock().unwrap();
        let record = records
            .values_mut()
            .find(|r| r.airing_id == airing_id)
            .ok_or_else(|| SyncError::NotFound(airing_id.to_string()))?;
        f(record, now);
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecorderClient for FakeRecorder {
    fn name(&self) -> &str {
        "fake-sagex"
    }

    async fn find_by_filename(&self, filename: &str) -> Result<Option<RecorderRecord>, SyncError> {
        self.lookups.lock().unwrap().push(filename.to_string());
        if let Some(error) = self.broken.lock().unwrap().get(filename) {
            return Err(error());
        }
        if let Some(remaining) = self.flaky.lock().unwrap().get_mut(filename) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SyncError::Transport("connection reset".into()));
            }
        }
        Ok(self.records.lock().unwrap().get(filename).cloned())
    }

    async fn clear_watched(&self, airing_id: &str) -> Result<(), SyncError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("clear_watched {airing_id}"));
        self.update(airing_id, |r, now| {
            r.state.watched = false;
            r.state.resume_ms = 0;
            r.state.last_watched_ms = now;
        })
    }

    async fn set_watched(&self, airing_id: &str) -> Result<(), SyncError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("set_watched {airing_id}"));
        self.update(airing_id, |r, now| {
            r.state.watched = true;
            r.state.resume_ms = r.state.duration_ms;
            r.state.last_watched_ms = now;
        })
    }

    async fn set_watched_window(
        &self,
        airing_id: &str,
        watched_end_ms: i64,
        real_start_ms: i64,
    ) -> Result<(), SyncError> {
        self.calls.lock().unwrap().push(format!(
            "set_watched_window {airing_id} {watched_end_ms} {real_start_ms}"
        ));
        self.update(airing_id, |r, _now| {
            let resume = watched_end_ms - r.airing_start_ms;
            r.state.resume_ms = resume;
            r.state.last_watched_ms = real_start_ms + resume;
        })
    }
}

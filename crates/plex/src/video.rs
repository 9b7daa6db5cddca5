//! Typed decode of the media server's `MediaContainer` JSON payloads.

use serde::Deserialize;

use sageplex_core::{Side, SyncError, ViewingState};

use crate::{MediaVideo, SectionInfo};

const VIDEO_TYPES: [&str; 4] = ["movie", "episode", "clip", "video"];

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "MediaContainer")]
    container: Container,
}

/// One level of the library tree.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Container {
    pub size: Option<i64>,
    #[serde(rename = "Directory", default)]
    pub directories: Vec<Node>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<Node>,
}

impl Container {
    pub fn parse(body: &str) -> Result<Self, SyncError> {
        serde_json::from_str::<Envelope>(body)
            .map(|e| e.container)
            .map_err(|e| SyncError::MalformedResponse(format!("MediaContainer: {e}")))
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_some_and(|s| s < 1)
    }

    /// Children in server order, directories first.
    pub fn into_children(self) -> Vec<Node> {
        let mut children = self.directories;
        children.extend(self.metadata);
        children
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub rating_key: Option<String>,
    pub key: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub view_offset: Option<i64>,
    pub duration: Option<i64>,
    pub view_count: Option<i64>,
    /// Epoch seconds.
    pub last_viewed_at: Option<i64>,
    #[serde(rename = "Media", default)]
    pub media: Vec<MediaDto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaDto {
    #[serde(rename = "Part", default)]
    pub parts: Vec<PartDto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartDto {
    pub file: Option<String>,
}

impl Node {
    pub fn is_video(&self) -> bool {
        !self.media.is_empty() || self.kind.as_deref().is_some_and(|k| VIDEO_TYPES.contains(&k))
    }

    /// The "All episodes" pseudo-entry that duplicates every season.
    pub fn is_all_episodes(&self) -> bool {
        self.title.as_deref() == Some("All episodes")
            || self.key.as_deref().is_some_and(|k| k.ends_with("/allLeaves"))
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    fn first_part_file(&self) -> Option<&str> {
        self.media
            .first()
            .and_then(|m| m.parts.first())
            .and_then(|p| p.file.as_deref())
            .filter(|f| !f.is_empty())
    }
}

/// Base filename of a server-side path, which may use either separator.
pub fn base_filename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

pub fn decode_video(node: &Node) -> Result<MediaVideo, SyncError> {
    let rating_key = node
        .rating_key
        .clone()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            let title = node.display_title();
            SyncError::MalformedResponse(format!("video '{title}' has no ratingKey"))
        })?;
    let file_path = node.first_part_file().ok_or_else(|| {
        SyncError::MalformedResponse(format!("video {rating_key} has no Media/Part file"))
    })?;

    let view_count = node.view_count.unwrap_or(0).max(0);
    let state = ViewingState {
        side: Side::MediaServer,
        identity: rating_key,
        title: node.display_title().to_string(),
        filename: base_filename(file_path).to_string(),
        watched: view_count > 0,
        resume_ms: node.view_offset.unwrap_or(0).max(0),
        duration_ms: node.duration.unwrap_or(0).max(0),
        last_watched_ms: node.last_viewed_at.unwrap_or(0).max(0).saturating_mul(1000),
    };

    Ok(MediaVideo {
        state,
        view_count,
        file_path: file_path.to_string(),
    })
}

pub fn decode_sections(container: Container) -> Result<Vec<SectionInfo>, SyncError> {
    container
        .into_children()
        .into_iter()
        .map(|node| {
            let id = node
                .key
                .filter(|k| !k.is_empty())
                .ok_or_else(|| SyncError::MalformedResponse("section without key".into()))?;
            Ok(SectionInfo {
                id,
                title: node.title.unwrap_or_default(),
                kind: node.kind.unwrap_or_default(),
            })
        })
        .collect()
}

pub mod api;
pub mod client;
pub mod video;
pub mod walk;

pub use api::PlexClient;
pub use client::{MediaServerClient, VideoStream};

use sageplex_core::ViewingState;

/// A library section on the media server.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SectionInfo {
    pub id: String,
    pub title: String,
    /// Section type as reported by the server, e.g. `show` or `movie`.
    pub kind: String,
}

/// Where a library walk starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkRoot {
    /// Every video in a library section.
    Section(String),
    /// One item by rating key; shows and seasons expand to their episodes.
    Media(String),
}

impl WalkRoot {
    pub fn path(&self) -> String {
        match self {
            Self::Section(id) => format!("/library/sections/{id}/all"),
            Self::Media(id) => format!("/library/metadata/{id}"),
        }
    }
}

impl std::fmt::Display for WalkRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Section(id) => write!(f, "section {id}"),
            Self::Media(id) => write!(f, "media-id {id}"),
        }
    }
}

/// A video node from the media server with its viewing state.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaVideo {
    pub state: ViewingState,
    /// Completed views; the server keeps counting on rewatch.
    pub view_count: i64,
    /// Full path of the first media part as the server sees it.
    pub file_path: String,
}

impl MediaVideo {
    pub fn rating_key(&self) -> &str {
        &self.state.identity
    }
}

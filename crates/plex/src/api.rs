//! Plex Media Server HTTP client.
//!
//! Library reads request JSON (`Accept: application/json`). Watched state
//! goes through the `/:/scrobble`, `/:/unscrobble` and `/:/progress`
//! endpoints, all keyed by rating key.

use reqwest::{Method, StatusCode};
use tracing::debug;

use sageplex_core::SyncError;

use crate::client::{MediaServerClient, VideoStream};
use crate::video::{Container, decode_sections};
use crate::walk::{ContainerSource, walk_videos};
use crate::{SectionInfo, WalkRoot};

const LIBRARY_IDENTIFIER: &str = "com.plexapp.plugins.library";
const TOKEN_HEADER: &str = "X-Plex-Token";

pub struct PlexClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl PlexClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            token: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then_some(token);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<String, SyncError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, url = %url, ?query, "plex request");

        let mut req = self
            .client
            .request(method, &url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query);
        if let Some(token) = &self.token {
            req = req.header(TOKEN_HEADER, token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| SyncError::Transport(format!("plex {path}: {e}")))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SyncError::NotFound(format!("plex {path}")));
        }
        if !status.is_success() {
            return Err(SyncError::Remote {
                status: status.as_u16(),
                message: format!("plex {path} returned {status}"),
            });
        }

        resp.text()
            .await
            .map_err(|e| SyncError::Transport(format!("plex {path}: {e}")))
    }

    pub async fn get_container(&self, path: &str) -> Result<Container, SyncError> {
        let body = self.request(Method::GET, path, &[]).await?;
        Container::parse(&body)
    }

    fn library_query(video_id: &str) -> Vec<(&'static str, String)> {
        vec![
            ("key", video_id.to_string()),
            ("identifier", LIBRARY_IDENTIFIER.to_string()),
        ]
    }
}

#[async_trait::async_trait]
impl ContainerSource for PlexClient {
    async fn fetch_container(&self, path: &str) -> Result<Container, SyncError> {
        self.get_container(path).await
    }
}

#[async_trait::async_trait]
impl MediaServerClient for PlexClient {
    fn name(&self) -> &str {
        "plex"
    }

    async fn list_sections(&self) -> Result<Vec<SectionInfo>, SyncError> {
        let container = self.get_container("/library/sections").await?;
        decode_sections(container)
    }

    fn walk(&self, root: &WalkRoot) -> VideoStream<'_> {
        walk_videos(self, root.path())
    }

    async fn set_watched(&self, video_id: &str, watched: bool) -> Result<(), SyncError> {
        let path = if watched { "/:/scrobble" } else { "/:/unscrobble" };
        self.request(Method::GET, path, &Self::library_query(video_id))
            .await?;
        Ok(())
    }

    async fn set_progress(&self, video_id: &str, position_ms: i64) -> Result<(), SyncError> {
        let mut query = Self::library_query(video_id);
        query.push(("time", position_ms.max(0).to_string()));
        self.request(Method::GET, "/:/progress", &query).await?;
        Ok(())
    }

    async fn refresh_section(&self, section_id: &str) -> Result<(), SyncError> {
        let path = format!("/library/sections/{section_id}/refresh");
        self.request(Method::GET, &path, &[]).await?;
        Ok(())
    }

    async fn delete_section(&self, section_id: &str) -> Result<(), SyncError> {
        let path = format!("/library/sections/{section_id}");
        self.request(Method::DELETE, &path, &[]).await?;
        Ok(())
    }
}

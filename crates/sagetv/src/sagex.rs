//! sagex HTTP API client.
//!
//! Calls look like `/sagex/api?c=plex:GetMediaFileForName&1=<file>&encoder=json`.
//! `GetMediaFileForName` is a custom `plex` service installed on the
//! recorder; the mutations are stock sagex functions taking an
//! `airing:<id>` reference.

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use sageplex_core::SyncError;

use crate::RecorderClient;
use crate::RecorderRecord;
use crate::media_file::decode_media_file;

const LOOKUP_SERVICE: &str = "plex";

pub struct SagexClient {
    base_url: String,
    credentials: Option<(String, String)>,
    client: reqwest::Client,
    // Concurrent sagex requests were observed to corrupt fan-art downloads,
    // so every call on this client is serialized.
    lock: Mutex<()>,
}

impl SagexClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            credentials: None,
            client: reqwest::Client::new(),
            lock: Mutex::new(()),
        }
    }

    pub fn with_credentials(
        mut self,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((user.into(), password.into()));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Invoke a sagex function with positional parameters and decode the
    /// JSON result. An empty body decodes to `Value::Null`.
    pub async fn call(&self, function: &str, params: &[String]) -> Result<Value, SyncError> {
        let mut query = Vec::with_capacity(params.len() + 2);
        query.push(("c".to_string(), function.to_string()));
        for (i, p) in params.iter().enumerate() {
            query.push(((i + 1).to_string(), p.clone()));
        }
        query.push(("encoder".to_string(), "json".to_string()));

        let url = format!("{}/sagex/api", self.base_url);

        let _guard = self.lock.lock().await;
        debug!(url = %url, function, ?params, "sagex request");

        let mut req = self.client.get(&url).query(&query);
        if let Some((user, password)) = &self.credentials {
            req = req.basic_auth(user, Some(password));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| SyncError::Transport(format!("sagex {function}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::Remote {
                status: status.as_u16(),
                message: format!("sagex {function} returned {status}"),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| SyncError::Transport(format!("sagex {function}: {e}")))?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body)
            .map_err(|e| SyncError::MalformedResponse(format!("sagex {function}: parse JSON: {e}")))
    }
}

fn airing_ref(airing_id: &str) -> String {
    format!("airing:{airing_id}")
}

#[async_trait::async_trait]
impl RecorderClient for SagexClient {
    fn name(&self) -> &str {
        "sagex"
    }

    async fn find_by_filename(&self, filename: &str) -> Result<Option<RecorderRecord>, SyncError> {
        let body = self
            .call(
                &format!("{LOOKUP_SERVICE}:GetMediaFileForName"),
                &[filename.to_string()],
            )
            .await?;
        let record = decode_media_file(filename, body)?;
        debug!(filename, found = record.is_some(), "GetMediaFileForName");
        Ok(record)
    }

    async fn clear_watched(&self, airing_id: &str) -> Result<(), SyncError> {
        self.call("ClearWatched", &[airing_ref(airing_id)]).await?;
        Ok(())
    }

    async fn set_watched(&self, airing_id: &str) -> Result<(), SyncError> {
        self.call("SetWatched", &[airing_ref(airing_id)]).await?;
        Ok(())
    }

    async fn set_watched_window(
        &self,
        airing_id: &str,
        watched_end_ms: i64,
        real_start_ms: i64,
    ) -> Result<(), SyncError> {
        self.call(
            "SetWatchedTimes",
            &[
                airing_ref(airing_id),
                watched_end_ms.to_string(),
                real_start_ms.to_string(),
            ],
        )
        .await?;
        Ok(())
    }
}

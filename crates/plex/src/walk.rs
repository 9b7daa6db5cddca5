//! Depth-first library walk exposed as a lazy stream.
//!
//! Containers are fetched only as the consumer pulls videos, so stopping
//! early stops issuing requests.

use std::collections::VecDeque;

use tracing::{debug, warn};

use sageplex_core::SyncError;

use crate::client::VideoStream;
use crate::video::{Container, Node, decode_video};

/// Deepest container level followed below the walk root.
pub const MAX_DEPTH: usize = 7;

/// Something that can fetch one level of the library tree by path.
#[async_trait::async_trait]
pub trait ContainerSource: Send + Sync {
    async fn fetch_container(&self, path: &str) -> Result<Container, SyncError>;
}

struct Frame {
    path: String,
    /// Key that led to this container; a child with the same key is a leaf.
    key: Option<String>,
    level: usize,
    children: VecDeque<Node>,
}

/// Join a child key onto the current path. Absolute keys replace the path.
pub fn join_path(path: &str, key: &str) -> String {
    if key.starts_with('/') {
        key.to_string()
    } else if path.ends_with('/') {
        format!("{path}{key}")
    } else {
        format!("{path}/{key}")
    }
}

async fn load_frame<S: ContainerSource + ?Sized>(
    source: &S,
    path: String,
    key: Option<String>,
    level: usize,
) -> Result<Option<Frame>, SyncError> {
    if level > MAX_DEPTH {
        debug!(level, path = %path, "walk depth limit reached");
        return Ok(None);
    }
    let container = source.fetch_container(&path).await?;
    if container.is_empty() {
        warn!(path = %path, "empty container, skipping");
        return Ok(None);
    }
    Ok(Some(Frame {
        path,
        key,
        level,
        children: container.into_children().into(),
    }))
}

/// Stream every video below `root_path`.
pub fn walk_videos<'a, S: ContainerSource + ?Sized>(
    source: &'a S,
    root_path: String,
) -> VideoStream<'a> {
    Box::pin(async_stream::stream! {
        let mut stack: Vec<Frame> = Vec::new();
        match load_frame(source, root_path, None, 1).await {
            Ok(Some(frame)) => stack.push(frame),
            Ok(None) => {}
            Err(e) => yield Err(e),
        }

        loop {
            let Some(frame) = stack.last_mut() else {
                break;
            };
            let Some(node) = frame.children.pop_front() else {
                stack.pop();
                continue;
            };
            let parent_path = frame.path.clone();
            let parent_key = frame.key.clone();
            let level = frame.level;

            let child_key = node.key.clone().unwrap_or_default();
            debug!(level, title = node.display_title(), key = %child_key, "walk");

            if node.is_video() || parent_key.as_deref() == Some(child_key.as_str()) {
                yield decode_video(&node);
                continue;
            }
            if node.is_all_episodes() {
                continue;
            }
            if child_key.is_empty() {
                warn!(title = node.display_title(), "directory without key, skipping");
                continue;
            }

            let path = join_path(&parent_path, &child_key);
            match load_frame(source, path, Some(child_key), level + 1).await {
                Ok(Some(child)) => stack.push(child),
                Ok(None) => {}
                Err(e) => yield Err(e),
            }
        }
    })
}

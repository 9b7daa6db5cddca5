use serde::{Deserialize, Serialize};

/// Which system a viewing state was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The personal video recorder (SageTV).
    Recorder,
    /// The media server (Plex).
    MediaServer,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recorder => "recorder",
            Self::MediaServer => "media_server",
        }
    }

    /// Name used in operator-facing output.
    pub fn label(self) -> &'static str {
        match self {
            Self::Recorder => "SageTV",
            Self::MediaServer => "PLEX",
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::Recorder => Self::MediaServer,
            Self::MediaServer => Self::Recorder,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of one reconciled video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    InSync,
    /// The media-server side is stale and is the one to correct.
    MediaOutOfSync,
    /// The recorder side is stale and is the one to correct.
    RecorderOutOfSync,
    NotFoundOnRecorder,
}

impl OutcomeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InSync => "in_sync",
            Self::MediaOutOfSync => "media_out_of_sync",
            Self::RecorderOutOfSync => "recorder_out_of_sync",
            Self::NotFoundOnRecorder => "not_found_on_recorder",
        }
    }

    /// The side that needs correcting, if any.
    pub fn stale_side(self) -> Option<Side> {
        match self {
            Self::MediaOutOfSync => Some(Side::MediaServer),
            Self::RecorderOutOfSync => Some(Side::Recorder),
            Self::InSync | Self::NotFoundOnRecorder => None,
        }
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

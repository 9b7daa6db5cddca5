use std::sync::Arc;

use sageplex_core::state::DEFAULT_TOLERANCE_MS;
use sageplex_core::{OutcomeKind, Thresholds};
use sageplex_plex::{MediaServerClient, MediaVideo};
use sageplex_sagetv::{RecorderClient, RecorderRecord};

use crate::engine::Correction;

/// Comparison knobs for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    pub thresholds: Thresholds,
    /// Largest normalized resume difference still treated as in sync.
    pub tolerance_ms: i64,
    /// Extra attempts for a recorder lookup that failed transiently.
    pub lookup_retries: u32,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            tolerance_ms: DEFAULT_TOLERANCE_MS,
            lookup_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Classify and report; never correct.
    Status,
    /// Classify and correct. With `simulate`, corrections are decided and
    /// reported but no mutating call is issued.
    Sync { simulate: bool },
}

impl RunMode {
    pub fn is_simulate(self) -> bool {
        matches!(self, Self::Sync { simulate: true })
    }
}

/// A correction about to be applied, offered for confirmation.
#[derive(Debug, Clone, Copy)]
pub struct Proposal<'a> {
    pub kind: OutcomeKind,
    pub media: &'a MediaVideo,
    pub recorder: Option<&'a RecorderRecord>,
    pub correction: &'a Correction,
}

/// Asked before each corrective mutation.
pub trait Confirm: Send + Sync {
    fn confirm(&self, proposal: &Proposal<'_>) -> bool;
}

/// Confirms every correction.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

impl Confirm for AutoConfirm {
    fn confirm(&self, _proposal: &Proposal<'_>) -> bool {
        true
    }
}

/// Everything a run needs, built once and passed down by reference.
#[derive(Clone)]
pub struct SyncContext {
    pub recorder: Arc<dyn RecorderClient>,
    pub media: Arc<dyn MediaServerClient>,
    pub policy: SyncPolicy,
    pub mode: RunMode,
    pub confirm: Arc<dyn Confirm>,
}

impl SyncContext {
    pub fn new(
        recorder: Arc<dyn RecorderClient>,
        media: Arc<dyn MediaServerClient>,
        mode: RunMode,
    ) -> Self {
        Self {
            recorder,
            media,
            policy: SyncPolicy::default(),
            mode,
            confirm: Arc::new(AutoConfirm),
        }
    }

    pub fn with_policy(mut self, policy: SyncPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_confirm(mut self, confirm: Arc<dyn Confirm>) -> Self {
        self.confirm = confirm;
        self
    }
}

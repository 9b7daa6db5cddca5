pub mod context;
pub mod driver;
pub mod engine;
pub mod summary;

pub use context::{AutoConfirm, Confirm, Proposal, RunMode, SyncContext, SyncPolicy};
pub use driver::{Action, Selection, VideoFailure, VideoResult, resolve_roots, run_batch};
pub use engine::{Correction, Decision, Resolution, SyncOutcome, reconcile};
pub use summary::Summary;

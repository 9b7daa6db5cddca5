pub mod error;
pub mod state;
pub mod types;

pub use error::SyncError;
pub use state::{Thresholds, ViewingState, normalize_resume};
pub use types::{OutcomeKind, Side};

use tracing::warn;

use sageplex_sync::{Confirm, Proposal};

/// Yes/no question on stderr, defaulting to "no". A prompt that
/// cannot be shown (no terminal) counts as "no".
///
/// Blocks on terminal input. Other tasks, such as the Ctrl-C watcher,
/// move to another worker while it waits, so this needs the
/// multi-threaded runtime.
pub fn ask(question: &str) -> bool {
    let answer = tokio::task::block_in_place(|| {
        dialoguer::Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()
    });
    match answer {
        Ok(answer) => answer,
        Err(e) => {
            warn!(error = %e, "prompt failed, treating as no");
            false
        }
    }
}

/// Asks before every corrective mutation.
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, proposal: &Proposal<'_>) -> bool {
        ask(&question(proposal))
    }
}

fn question(proposal: &Proposal<'_>) -> String {
    format!(
        "Update {} media [{}]: {} ({})?",
        proposal.correction.target().label(),
        proposal.media.rating_key(),
        proposal.media.state.title,
        proposal.correction.describe()
    )
}

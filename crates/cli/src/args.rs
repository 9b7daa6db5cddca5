use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sageplex-sync",
    version,
    about = "Synchronize watched status and resume positions between SageTV and Plex"
)]
pub struct Cli {
    /// Path to sageplex_cfg.json (defaults to SAGEPLEX_CFG, then the Plex data directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List Plex library sections
    List,
    /// Show sync status without changing anything
    Status(Selector),
    /// Synchronize watched status and resume positions
    Sync(SyncArgs),
    /// Dump the SageTV record for media ids
    Inspect {
        /// Plex media ids
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Ask Plex to rescan a library section
    Refresh {
        /// Section id
        section: String,
    },
    /// Delete a Plex library section (always asks first)
    Delete {
        /// Section id
        section: String,
    },
}

#[derive(Args)]
pub struct Selector {
    /// Section ids or names, or `all`; media ids with --media
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Treat ids as Plex media ids instead of sections
    #[arg(short, long)]
    pub media: bool,

    /// Treat resume positions within the first N seconds as not started
    #[arg(short = 'x', long = "ignore-secs", value_name = "N")]
    pub ignore_secs: Option<u32>,
}

#[derive(Args)]
pub struct SyncArgs {
    #[command(flatten)]
    pub selector: Selector,

    /// Decide and report corrections without applying them
    #[arg(short = 'n', long = "simulate", visible_alias = "dry-run")]
    pub simulate: bool,

    /// Confirm each correction
    #[arg(short, long)]
    pub prompt: bool,

    /// Set an explicit Plex resume position (s, m:s or h:m:s); requires --media
    #[arg(long, value_name = "H:M:S", requires = "media", value_parser = parse_position)]
    pub position: Option<i64>,
}

/// Parse `s`, `m:s` or `h:m:s` into milliseconds.
pub fn parse_position(value: &str) -> Result<i64, String> {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() > 3 {
        return Err(format!("format error: {value}"));
    }
    let mut secs: i64 = 0;
    for part in &parts {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("non digit: {value}"));
        }
        let n: i64 = part.parse().map_err(|_| format!("out of range: {value}"))?;
        secs = secs
            .checked_mul(60)
            .and_then(|s| s.checked_add(n))
            .ok_or_else(|| format!("out of range: {value}"))?;
    }
    secs.checked_mul(1000).ok_or_else(|| format!("out of range: {value}"))
}

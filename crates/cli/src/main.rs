mod args;
mod config;
mod prompt;
mod report;

use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sageplex_plex::{MediaServerClient, PlexClient, WalkRoot};
use sageplex_sagetv::{RecorderClient, SagexClient};
use sageplex_sync::{
    Action, RunMode, Selection, SyncContext, VideoResult, resolve_roots, run_batch,
};

use crate::args::{Cli, Command, Selector, SyncArgs};
use crate::config::Config;
use crate::prompt::TerminalConfirm;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = config::locate_and_load(cli.config.as_deref())
        .context("failed to load configuration")?;

    let failed = match cli.command {
        Command::List => list_sections(&config).await?,
        Command::Status(selector) => {
            run(&config, selector, RunMode::Status, false, None).await?
        }
        Command::Sync(SyncArgs {
            selector,
            simulate,
            prompt,
            position,
        }) => run(&config, selector, RunMode::Sync { simulate }, prompt, position).await?,
        Command::Inspect { ids } => inspect(&config, ids).await?,
        Command::Refresh { section } => refresh(&config, &section).await?,
        Command::Delete { section } => delete(&config, &section).await?,
    };

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn plex_client(config: &Config) -> anyhow::Result<PlexClient> {
    let plex = config.plex()?;
    let mut client = PlexClient::new(plex.base_url());
    if let Some(token) = &plex.token {
        client = client.with_token(token.clone());
    }
    info!(url = %client.base_url(), "plex server");
    Ok(client)
}

fn sagex_client(config: &Config) -> anyhow::Result<SagexClient> {
    let sagex = config.sagex()?;
    let mut client = SagexClient::new(sagex.base_url());
    if let (Some(user), Some(password)) = (&sagex.user, &sagex.password) {
        client = client.with_credentials(user.clone(), password.clone());
    }
    info!(url = %client.base_url(), "sagex server");
    Ok(client)
}

async fn list_sections(config: &Config) -> anyhow::Result<bool> {
    let plex = plex_client(config)?;
    let sections = plex
        .list_sections()
        .await
        .context("failed to list library sections")?;
    for section in sections {
        println!("{:>3}: {} ({})", section.id, section.title, section.kind);
    }
    Ok(false)
}

/// `status` and `sync`. Returns whether any video failed.
async fn run(
    config: &Config,
    selector: Selector,
    mode: RunMode,
    prompt: bool,
    position: Option<i64>,
) -> anyhow::Result<bool> {
    let plex = Arc::new(plex_client(config)?);
    let sagex = Arc::new(sagex_client(config)?);

    let detailed = selector.media;
    let selection = Selection::from_ids(selector.ids, selector.media);
    let resolved = resolve_roots(plex.as_ref(), &selection)
        .await
        .context("failed to resolve selection")?;
    for rejected in &resolved.rejected {
        println!("{rejected}");
    }
    if resolved.roots.is_empty() {
        println!("Nothing to do.");
        return Ok(false);
    }

    let action = match position {
        Some(position_ms) => {
            let question = format!(
                "Set PLEX resume position to {} for {} media ids?",
                report::duration_str(position_ms),
                resolved.roots.len()
            );
            if !prompt::ask(&question) {
                println!("Cancelled.");
                return Ok(false);
            }
            Action::SetPosition(position_ms)
        }
        None => Action::Reconcile,
    };

    let mut ctx = SyncContext::new(sagex, plex, mode)
        .with_policy(config.sync.policy(selector.ignore_secs));
    if prompt {
        ctx = ctx.with_confirm(Arc::new(TerminalConfirm));
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping after the current video");
                cancel.cancel();
            }
        });
    }

    let summary = run_batch(&ctx, &resolved.roots, action, &cancel, |result: &VideoResult| {
        report::print_result(result, detailed)
    })
    .await;

    println!("{}", report::summary_text(&summary));
    Ok(summary.has_failures())
}

async fn inspect(config: &Config, ids: Vec<String>) -> anyhow::Result<bool> {
    let plex = plex_client(config)?;
    let sagex = sagex_client(config)?;
    let mut failed = false;

    for id in ids {
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            println!("must be a PLEX media-id number: {id}");
            continue;
        }
        let root = WalkRoot::Media(id);
        let mut videos = plex.walk(&root);
        while let Some(item) = videos.next().await {
            let video = match item {
                Ok(video) => video,
                Err(e) => {
                    println!("{root}: {e}");
                    failed = true;
                    continue;
                }
            };
            println!("{}: {}", video.rating_key(), video.state.title);
            println!("\tPLEX: {}", report::media_info(&video));
            println!("\tfile: {}", video.file_path);
            match sagex.find_by_filename(&video.state.filename).await {
                Ok(Some(record)) => {
                    println!("\tSageTV: {}", report::recorder_info(&record, true));
                    let raw = serde_json::to_string_pretty(&record.raw)
                        .context("failed to format recorder payload")?;
                    println!("{raw}");
                }
                Ok(None) => println!("\tnot in SageTV"),
                Err(e) => {
                    println!("\tSageTV lookup failed: {e}");
                    failed = true;
                }
            }
        }
    }
    Ok(failed)
}

/// Title of `section_id`, or an error if the server has no such section.
async fn section_title(plex: &PlexClient, section_id: &str) -> anyhow::Result<String> {
    let sections = plex
        .list_sections()
        .await
        .context("failed to list library sections")?;
    match sections.into_iter().find(|s| s.id == section_id) {
        Some(section) => Ok(section.title),
        None => bail!("section not found: {section_id}"),
    }
}

async fn refresh(config: &Config, section_id: &str) -> anyhow::Result<bool> {
    let plex = plex_client(config)?;
    let title = section_title(&plex, section_id).await?;
    plex.refresh_section(section_id)
        .await
        .with_context(|| format!("failed to refresh section {section_id}"))?;
    println!("Refreshing section {section_id}: {title}");
    Ok(false)
}

async fn delete(config: &Config, section_id: &str) -> anyhow::Result<bool> {
    let plex = plex_client(config)?;
    let title = section_title(&plex, section_id).await?;
    if !prompt::ask(&format!("Delete section {section_id}: {title}?")) {
        println!("Cancelled.");
        return Ok(false);
    }
    plex.delete_section(section_id)
        .await
        .with_context(|| format!("failed to delete section {section_id}"))?;
    println!("Deleted section {section_id}: {title}");
    Ok(false)
}

//! Operator-facing output on stdout.

use chrono::{Local, TimeZone};

use sageplex_core::{OutcomeKind, Side};
use sageplex_plex::MediaVideo;
use sageplex_sagetv::{RecorderRecord, WatchWindow};
use sageplex_sync::summary::BucketEntry;
use sageplex_sync::{Resolution, Summary, SyncOutcome, VideoResult};

/// `h:mm:ss`.
pub fn duration_str(ms: i64) -> String {
    let secs = ms.max(0) / 1000;
    format!("{}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

/// Local wall-clock time, or an empty string for "never".
pub fn time_str(epoch_ms: i64) -> String {
    if epoch_ms <= 0 {
        return String::new();
    }
    match Local.timestamp_millis_opt(epoch_ms).single() {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => epoch_ms.to_string(),
    }
}

fn watched_str(watched: bool) -> &'static str {
    if watched { "watched" } else { "not watched" }
}

pub fn media_info(video: &MediaVideo) -> String {
    let state = &video.state;
    let mut s = String::new();
    if state.last_watched_ms > 0 || state.resume_ms > 0 {
        s.push_str(&format!(
            "{} / {}",
            time_str(state.last_watched_ms),
            duration_str(state.resume_ms)
        ));
    }
    if state.watched {
        s.push_str(&format!(" [watched {}]", video.view_count));
    } else {
        s.push_str(" [not watched]");
    }
    s
}

fn window_line(window: &WatchWindow, label: &str) -> String {
    format!(
        "\n\t\t{} to {} [{}] ({label})",
        time_str(window.start_ms),
        time_str(window.end_ms),
        duration_str(window.duration_ms())
    )
}

pub fn recorder_info(record: &RecorderRecord, detailed: bool) -> String {
    let state = &record.state;
    let mut s = format!(
        "{} / {} [{}]",
        time_str(state.last_watched_ms),
        duration_str(state.resume_ms),
        watched_str(state.watched)
    );
    if detailed {
        if let Some(w) = &record.watched_window {
            s.push_str(&window_line(w, "Watched Time"));
        }
        if let Some(w) = &record.real_watched_window {
            s.push_str(&window_line(w, "Real Watched Time"));
        }
    }
    s
}

fn status_tag(outcome: &SyncOutcome) -> &'static str {
    match outcome.kind {
        OutcomeKind::InSync => "[OK]",
        OutcomeKind::MediaOutOfSync => "[PLEX out of sync]",
        OutcomeKind::RecorderOutOfSync => "[SageTV out of sync]",
        OutcomeKind::NotFoundOnRecorder => "[not in SageTV]",
    }
}

fn resolution_tag(resolution: Resolution) -> Option<&'static str> {
    match resolution {
        Resolution::Applied => Some("[done]"),
        Resolution::Simulated => Some("[simulate]"),
        Resolution::Declined => Some("[skipped]"),
        Resolution::Unchanged | Resolution::Reported => None,
    }
}

/// One video as it finishes. `detailed` also prints both sides for
/// in-sync videos, with the recorder's watch windows.
pub fn print_result(result: &VideoResult, detailed: bool) {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(failure) => {
            println!(
                "  {}: {} [failed: {}]",
                failure.video_id.as_deref().unwrap_or("-"),
                failure.title,
                failure.error
            );
            return;
        }
    };

    println!(
        "  {}: {} {}",
        outcome.media.rating_key(),
        outcome.media.state.title,
        status_tag(outcome)
    );

    let show_sides = match outcome.kind {
        OutcomeKind::InSync => detailed,
        OutcomeKind::MediaOutOfSync | OutcomeKind::RecorderOutOfSync => true,
        OutcomeKind::NotFoundOnRecorder => false,
    };
    if show_sides {
        let sage = outcome
            .recorder
            .as_ref()
            .map(|r| format!("\t  SageTV: {}", recorder_info(r, detailed)));
        let plex = format!("\t  PLEX: {}", media_info(&outcome.media));
        // Stale side first.
        if outcome.kind == OutcomeKind::RecorderOutOfSync {
            sage.iter().for_each(|l| println!("{l}"));
            println!("{plex}");
        } else {
            println!("{plex}");
            sage.iter().for_each(|l| println!("{l}"));
        }
    }

    let correction = outcome.correction();
    if let (Some(correction), Some(tag)) = (correction, resolution_tag(outcome.resolution)) {
        println!(
            "\t  Updating {} [{}] {tag}",
            correction.target().label(),
            correction.describe()
        );
    }
}

fn bucket_line(entry: &BucketEntry, stale: Option<Side>) -> String {
    let media = format!(
        "{} [{}]",
        duration_str(entry.media_resume_ms),
        watched_str(entry.media_watched)
    );
    let recorder = match (entry.recorder_resume_ms, entry.recorder_watched) {
        (Some(resume), Some(watched)) => {
            format!("{} [{}]", duration_str(resume), watched_str(watched))
        }
        _ => return format!("[{}] {} ({media})", entry.video_id, entry.title),
    };
    let (first, second) = match stale {
        Some(Side::Recorder) => (recorder, media),
        _ => (media, recorder),
    };
    format!("[{}] {} ({first} vs {second})", entry.video_id, entry.title)
}

pub fn summary_text(summary: &Summary) -> String {
    let mut out = String::new();
    let buckets = [
        ("PLEX out of sync", &summary.media_out_of_sync, Some(Side::MediaServer)),
        ("SageTV out of sync", &summary.recorder_out_of_sync, Some(Side::Recorder)),
        ("Not in SageTV", &summary.not_on_recorder, None),
    ];
    for (title, entries, stale) in buckets {
        if entries.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{title}:\n"));
        for entry in entries {
            out.push_str(&format!("\t{}\n", bucket_line(entry, stale)));
        }
    }
    if !summary.failed.is_empty() {
        out.push_str("\nFailed:\n");
        for f in &summary.failed {
            out.push_str(&format!(
                "\t[{}] {}: {}\n",
                f.video_id.as_deref().unwrap_or("-"),
                f.title,
                f.message
            ));
        }
    }
    if summary.cancelled {
        out.push_str("\nInterrupted; totals cover the videos processed so far.\n");
    }
    out.push_str(&format!("\nTotal: {summary}."));
    out
}

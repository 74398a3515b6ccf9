//! Transcript text rendering.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::types::{GongCall, TranscriptSegment};

/// Render a call transcript as readable text.
///
/// A header block when call metadata is available, then one
/// `[HH:MM:SS] Speaker: text` line per sentence, with a blank line after
/// each speaker segment. Timestamps show the sentence start offset as a
/// time of day.
pub fn format_transcript(call: Option<&GongCall>, segments: &[TranscriptSegment]) -> String {
    let mut out = String::new();

    if let Some(call) = call {
        let meta = &call.meta_data;
        let minutes = (meta.duration as f64 / 60.0).round() as i64;
        out.push_str(&format!("Call: {}\n", meta.title));
        out.push_str(&format!("Date: {}\n", human_datetime(&meta.started)));
        out.push_str(&format!("Duration: {minutes} minutes\n\n"));
        out.push_str("--- TRANSCRIPT ---\n\n");
    }

    let speakers: HashMap<&str, &str> = call
        .map(|call| {
            call.parties
                .iter()
                .map(|party| (party.id.as_str(), party.display_name()))
                .collect()
        })
        .unwrap_or_default();

    for segment in segments {
        let speaker = speakers
            .get(segment.speaker_id.as_str())
            .map(|name| (*name).to_string())
            .unwrap_or_else(|| format!("Speaker {}", segment.speaker_id));
        for sentence in &segment.sentences {
            out.push_str(&format!(
                "[{}] {}: {}\n",
                clock_timestamp(sentence.start),
                speaker,
                sentence.text
            ));
        }
        out.push('\n');
    }

    out
}

/// RFC 3339 timestamp rendered for the header, normalized to UTC. An
/// unparseable value is shown as-is.
fn human_datetime(started: &str) -> String {
    match DateTime::parse_from_rfc3339(started) {
        Ok(dt) => dt
            .with_timezone(&Utc)
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        Err(_) => started.to_string(),
    }
}

/// Seconds offset rendered as `HH:MM:SS`, wrapping at 24 hours.
fn clock_timestamp(start_seconds: f64) -> String {
    let total = (start_seconds.max(0.0).floor() as i64) % 86_400;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

use std::time::Duration;

use crate::types::VideoOutcome;

/// Format seconds as an ASS timestamp, `H:MM:SS.cc`
pub fn format_ass_timestamp(seconds: f64) -> String {
    let centis = (seconds.max(0.0) * 100.0).round() as u64;
    let hours = centis / 360_000;
    let mins = (centis / 6_000) % 60;
    let secs = (centis / 100) % 60;
    let cs = centis % 100;
    format!("{}:{:02}:{:02}.{:02}", hours, mins, secs, cs)
}

/// Format an elapsed duration for progress output
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let total = secs.round() as u64;
        format!("{}m {}s", total / 60, total % 60)
    }
}

pub fn format_outcome_readable(outcome: &VideoOutcome) -> String {
    let mut output = String::new();
    output.push_str(&format!("# {}\n\n", outcome.video_path.display()));

    let plural = if outcome.attempts == 1 { "" } else { "s" };
    output.push_str(&format!(
        "**Rendered in:** {} attempt{}",
        outcome.attempts, plural
    ));
    if let Some(subtitles) = &outcome.subtitle_path {
        output.push_str(&format!(" | **Subtitles:** {}", subtitles.display()));
    }
    output.push_str("\n\n");

    output.push_str("## Narration\n\n");
    if outcome.narration.trim().is_empty() {
        output.push_str("No narration was generated.");
    } else {
        output.push_str(outcome.narration.trim());
    }
    output.push('\n');

    output
}

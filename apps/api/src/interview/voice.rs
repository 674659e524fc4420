//! Voice-mode text cleanup and the post-playback echo cooldown.

use chrono::{DateTime, Utc};

use crate::interview::stages::Stage;
use crate::strategy::roadmap::truncate;

pub const MAX_CONCLUSION_CHARS: usize = 150;

/// Makes generated text safe to synthesize: no speaker labels, no markdown
/// emphasis, and a bounded closing line.
pub fn post_process(text: &str, stage: Stage) -> String {
    let mut out = text
        .replace("Interviewer:", "")
        .replace("Interviewer :", "")
        .trim()
        .to_string();
    if stage == Stage::Conclusion && out.chars().count() > MAX_CONCLUSION_CHARS {
        out = format!("{}...", truncate(&out, MAX_CONCLUSION_CHARS));
    }
    out.replace("**", "").replace('*', "").replace('_', "")
}

/// Audio that arrives within `cooldown_secs` of the last playback is assumed
/// to be the interviewer's own voice and must be discarded.
pub fn within_cooldown(
    last_sent: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown_secs: f64,
) -> bool {
    let Some(last_sent) = last_sent else {
        return false;
    };
    let elapsed = (now - last_sent).num_milliseconds() as f64 / 1000.0;
    (0.0..cooldown_secs).contains(&elapsed)
}

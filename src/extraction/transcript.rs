// SRT/VTT subtitle parser
//
// Turns raw subtitle text into timed segments. Consecutive cues with identical
// text (rolling auto-captions) collapse into one segment.

use regex::Regex;

use super::models::TranscriptSegment;

lazy_static::lazy_static! {
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref VTT_TIMESTAMP_TAG: Regex = Regex::new(r"<\d{2}:\d{2}:\d{2}\.\d{3}>").unwrap();
    static ref SEQUENCE_NUMBER: Regex = Regex::new(r"^\d+\s*$").unwrap();
    static ref TIMESTAMP_LINE: Regex = Regex::new(
        r"((?:\d{1,2}:)?\d{2}:\d{2}[.,]\d{3})\s*-->\s*((?:\d{1,2}:)?\d{2}:\d{2}[.,]\d{3})"
    )
    .unwrap();
}

/// "HH:MM:SS.mmm", "MM:SS.mmm" (comma or dot) to seconds
fn parse_timestamp(ts: &str) -> f64 {
    let normalized = ts.trim().replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();

    let int = |s: &str| s.parse::<u64>().unwrap_or(0) as f64;
    let secs = |s: &str| s.parse::<f64>().unwrap_or(0.0);

    match parts.as_slice() {
        [h, m, s] => int(*h) * 3600.0 + int(*m) * 60.0 + secs(*s),
        [m, s] => int(*m) * 60.0 + secs(*s),
        _ => 0.0,
    }
}

fn clean_text(text: &str) -> String {
    let text = VTT_TIMESTAMP_TAG.replace_all(text, "");
    let text = HTML_TAG.replace_all(&text, "");
    text.trim().to_string()
}

fn is_cue_boundary(line: &str) -> bool {
    line.is_empty() || TIMESTAMP_LINE.is_match(line) || SEQUENCE_NUMBER.is_match(line)
}

/// Parse SRT or VTT text into segments. Unparseable input yields no segments.
pub fn parse_subtitles(raw: &str) -> Vec<TranscriptSegment> {
    let lines: Vec<&str> = raw.lines().map(str::trim).collect();
    let mut segments: Vec<TranscriptSegment> = Vec::new();
    let mut i = 0;

    // WEBVTT header block runs until the first blank line
    if lines.first().map_or(false, |l| l.starts_with("WEBVTT")) {
        i = 1;
        while i < lines.len() && !lines[i].is_empty() {
            i += 1;
        }
    }

    while i < lines.len() {
        let line = lines[i];
        i += 1;

        if line.is_empty() || SEQUENCE_NUMBER.is_match(line) {
            continue;
        }
        let Some(caps) = TIMESTAMP_LINE.captures(line) else {
            continue;
        };

        let start = parse_timestamp(&caps[1]);
        let end = parse_timestamp(&caps[2]);

        let mut parts: Vec<String> = Vec::new();
        while i < lines.len() && !is_cue_boundary(lines[i]) {
            let cleaned = clean_text(lines[i]);
            if !cleaned.is_empty() {
                parts.push(cleaned);
            }
            i += 1;
        }

        let text = parts.join(" ");
        if text.is_empty() || end < start {
            continue;
        }

        // Merged segments only ever grow
        match segments.last_mut() {
            Some(prev) if prev.text == text => prev.end = prev.end.max(end),
            _ => segments.push(TranscriptSegment { start, end, text }),
        }
    }

    segments
}

/// Concatenate segment texts, skipping empty ones
pub fn segments_to_text(segments: &[TranscriptSegment], separator: &str) -> String {
    segments
        .iter()
        .filter(|s| !s.text.is_empty())
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

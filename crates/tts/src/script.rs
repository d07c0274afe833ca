//! Subtitle-style script parsing
//!
//! Scripts are SRT-like: blank-line separated blocks of a sequence number,
//! a `start --> end` timing line and one or more lines of text. Files in
//! which no block parses as a cue are read as plain text, one cue per line.

use std::fmt::Write as _;

use crate::error::{Result, TtsError};

/// Start and end of a cue, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CueTiming {
    pub start: f64,
    pub end: f64,
}

/// One unit of speech
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub sequence: u32,
    pub text: String,
    /// `None` for plain-text scripts
    pub timing: Option<CueTiming>,
}

/// Parsed script, cues in file order
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub cues: Vec<Cue>,
}

impl Script {
    /// Parse script text
    ///
    /// # Errors
    ///
    /// Returns [`TtsError::InvalidScript`] when nothing speakable is found
    pub fn parse(content: &str) -> Result<Self> {
        let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");

        let cues: Vec<Cue> = if content.contains("-->") {
            blocks(&content).filter_map(|block| parse_block(&block)).collect()
        } else {
            Vec::new()
        };

        if cues.is_empty() {
            return Self::parse_plain(&content);
        }

        Ok(Self { cues })
    }

    fn parse_plain(content: &str) -> Result<Self> {
        let cues: Vec<Cue> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .zip(1..)
            .map(|(line, sequence)| Cue {
                sequence,
                text: line.to_string(),
                timing: None,
            })
            .collect();

        if cues.is_empty() {
            return Err(TtsError::InvalidScript("script is empty".to_string()));
        }

        Ok(Self { cues })
    }

    /// Whether cues carry timestamps
    pub fn is_timed(&self) -> bool {
        self.cues.iter().all(|cue| cue.timing.is_some())
    }
}

/// Split content into blocks of non-blank lines
fn blocks(content: &str) -> impl Iterator<Item = Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line.trim());
        }
    }

    if !current.is_empty() {
        blocks.push(current);
    }

    blocks.into_iter()
}

fn parse_block(lines: &[&str]) -> Option<Cue> {
    let [sequence, timing, text @ ..] = lines else {
        return None;
    };

    if text.is_empty() {
        return None;
    }

    let Ok(sequence) = sequence.parse::<u32>() else {
        tracing::warn!("skipping subtitle block with invalid sequence number: {sequence}");
        return None;
    };

    let Some((start, end)) = timing.split_once("-->") else {
        tracing::warn!("skipping subtitle block {sequence}: missing timing line");
        return None;
    };

    let timing = match (timestamp_to_seconds(start), timestamp_to_seconds(end)) {
        (Ok(start), Ok(end)) => CueTiming { start, end },
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!("skipping subtitle block {sequence}: {e}");
            return None;
        }
    };

    Some(Cue {
        sequence,
        text: text.join(" "),
        timing: Some(timing),
    })
}

/// Timestamp as whole milliseconds, overflowing fields already carried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Timestamp(u64);

impl Timestamp {
    fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let invalid = || TtsError::InvalidScript(format!("cannot parse timestamp: {raw}"));

        let fields = raw
            .split([':', ',', '.'])
            .map(|field| field.trim().parse::<u64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>>>()?;

        let (hours, minutes, seconds, millis) = match fields[..] {
            [minutes, seconds, millis] => (0, minutes, seconds, millis),
            [hours, minutes, seconds, millis] => (hours, minutes, seconds, millis),
            _ => return Err(invalid()),
        };

        [(hours, 3_600_000), (minutes, 60_000), (seconds, 1000), (millis, 1)]
            .into_iter()
            .try_fold(0_u64, |total, (value, scale)| value.checked_mul(scale)?.checked_add(total))
            .map(Self)
            .ok_or_else(|| TtsError::InvalidScript(format!("timestamp out of range: {raw}")))
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_seconds(self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (hours, rest) = (self.0 / 3_600_000, self.0 % 3_600_000);
        let (minutes, rest) = (rest / 60_000, rest % 60_000);
        let (seconds, millis) = (rest / 1000, rest % 1000);

        write!(f, "{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
    }
}

/// Rewrite a possibly malformed timestamp as `HH:MM:SS,mmm`
///
/// Accepts `.` or `:` in place of `,`, omits hours when only three fields
/// are present, and carries overflowing fields (`00:00:75,000` becomes
/// `00:01:15,000`).
///
/// # Errors
///
/// Returns [`TtsError::InvalidScript`] if the fields are not numeric,
/// there are not three or four of them, or the total overflows
pub fn normalize_timestamp(raw: &str) -> Result<String> {
    Timestamp::parse(raw).map(|ts| ts.to_string())
}

/// Convert a subtitle timestamp to seconds
///
/// # Errors
///
/// Returns [`TtsError::InvalidScript`] if the timestamp cannot be parsed
pub fn timestamp_to_seconds(raw: &str) -> Result<f64> {
    Timestamp::parse(raw).map(Timestamp::as_seconds)
}

/// Format seconds as `HH:MM:SS,mmm`, truncating below a millisecond
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn seconds_to_timestamp(seconds: f64) -> String {
    Timestamp((seconds.max(0.0) * 1000.0).floor() as u64).to_string()
}

/// Split text into pieces of at most `max_chars` characters
///
/// Prefers sentence boundaries, then whitespace, and cuts inside a word
/// only when a single word is longer than the limit.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let text = text.trim();
    let max_chars = max_chars.max(1);

    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for piece in sentences(text).into_iter().flat_map(|s| split_oversized(s, max_chars)) {
        let current_len = current.chars().count();
        let piece_len = piece.chars().count();

        if current.is_empty() {
            current = piece;
        } else if current_len + 1 + piece_len <= max_chars {
            let _ = write!(current, " {piece}");
        } else {
            chunks.push(std::mem::replace(&mut current, piece));
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        let terminal = matches!(ch, '.' | '!' | '?' | '。' | '！' | '？');
        let at_break = chars.peek().is_none_or(|(_, next)| next.is_whitespace());

        if terminal && at_break {
            let end = idx + ch.len_utf8();
            sentences.push(text[start..end].trim());
            start = end;
        }
    }

    sentences.push(text[start..].trim());
    sentences.retain(|s| !s.is_empty());
    sentences
}

fn split_oversized(sentence: &str, max_chars: usize) -> Vec<String> {
    if sentence.chars().count() <= max_chars {
        return vec![sentence.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();

    for word in sentence.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = word.chars().collect();
            pieces.extend(chars.chunks(max_chars).map(|c| c.iter().collect::<String>()));
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            pieces.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}

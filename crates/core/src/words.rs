//! Word-timing normalization for subtitle overlays.
//!
//! Speech synthesis reports per-word timestamps nested inside clip
//! segments. Before they are handed to the render service the timings
//! are flattened, rounded to millisecond precision, and repaired:
//! zero-length words get a minimal duration, and very short words that
//! directly follow a sentence boundary are merged into their successor
//! so the overlay does not flash.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A word whose duration falls below this threshold right after a
/// sentence-ending word is merged into the following word.
const MIN_WORD_SECS: f64 = 0.11;

/// One displayed word with its start/end offsets in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// Round a timestamp to millisecond precision.
fn round_ms(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}

/// Flatten and normalize raw per-segment word timings.
///
/// Rules, applied in order per word:
/// - start/end are rounded to 3 decimal places;
/// - a zero-length word is extended by 1 ms;
/// - a word whose start is after its end is rejected as invalid input;
/// - a word shorter than 110 ms that follows a word ending in `.` is
///   merged with the next word (text concatenated, span widened), and
///   the next word is skipped.
pub fn normalize_words(
    segments: impl IntoIterator<Item = Vec<WordTiming>>,
) -> Result<Vec<WordTiming>, CoreError> {
    let words: Vec<WordTiming> = segments
        .into_iter()
        .flatten()
        .map(|w| WordTiming {
            word: w.word,
            start: round_ms(w.start),
            end: round_ms(w.end),
        })
        .collect();

    let mut normalized: Vec<WordTiming> = Vec::with_capacity(words.len());
    let mut i = 0;
    while i < words.len() {
        let mut word = words[i].clone();

        if word.start == word.end {
            word.end += 0.001;
        }
        if word.start >= word.end {
            return Err(CoreError::Validation(format!(
                "Invalid word timing: \"{}\" starts at {} but ends at {}",
                word.word, word.start, word.end
            )));
        }

        let follows_sentence_end = i > 0 && words[i - 1].word.ends_with('.');
        if follows_sentence_end && (word.end - word.start) < MIN_WORD_SECS {
            tracing::debug!(index = i, word = %word.word, "Merging short word after sentence end");
            if let Some(next) = words.get(i + 1) {
                word = WordTiming {
                    word: format!("{} {}", word.word, next.word),
                    start: word.start,
                    end: next.end,
                };
                i += 1; // the next word is consumed by the merge
            }
        }

        normalized.push(word);
        i += 1;
    }

    Ok(normalized)
}

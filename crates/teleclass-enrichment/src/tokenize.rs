//! Tokenization helpers shared by scoring and phrase extraction.

use std::ops::Range;

/// Byte ranges of the words in `text`.
///
/// A word is a run of alphanumerics and `_`. A `.` or `,` between two
/// digits stays inside the word so decimals like `2.5` survive; every other
/// character separates words. Quotes, colons and braces therefore never end
/// up in a token, which matters for documents stored as JSON text.
pub fn word_spans(text: &str) -> Vec<Range<usize>> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let digit_at = |i: usize| chars.get(i).is_some_and(|(_, c)| c.is_ascii_digit());
    let in_word = |i: usize, c: char| {
        c.is_alphanumeric()
            || c == '_'
            || ((c == '.' || c == ',') && i > 0 && digit_at(i - 1) && digit_at(i + 1))
    };

    let mut spans = Vec::new();
    let mut start = None;
    for (i, &(offset, c)) in chars.iter().enumerate() {
        match (in_word(i, c), start) {
            (true, None) => start = Some(offset),
            (false, Some(from)) => {
                spans.push(from..offset);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(from) = start {
        spans.push(from..text.len());
    }
    spans
}

/// Lowercase words of `text`, split as in [`word_spans`].
///
/// Underscores are kept so that folded phrases (`air_quality`) survive as
/// single tokens.
pub fn words(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    word_spans(&lower)
        .into_iter()
        .map(|span| lower[span].to_string())
        .collect()
}

/// `text` reduced to its lowercase words joined by single spaces.
pub fn normalize(text: &str) -> String {
    words(text).join(" ")
}

/// Tokenize text into lowercase content words.
///
/// Filters out:
/// - Stop words (common English words)
/// - Single character tokens
/// - Numbers
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .filter(|s| s.len() > 1)
        .filter(|s| !is_stop_word(s))
        .filter(|s| !is_numeric(s))
        .map(String::from)
        .collect()
}

pub fn is_numeric(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| c.is_numeric() || c == '.' || c == ',')
}

/// Check if a (lowercase) word is a stop word.
pub fn is_stop_word(word: &str) -> bool {
    const STOP_WORDS: &[&str] = &[
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is",
        "it", "its", "of", "on", "or", "that", "the", "to", "was", "were", "will", "with", "this",
        "they", "but", "have", "had", "what", "when", "where", "who", "which", "why", "how", "all",
        "each", "every", "both", "few", "more", "most", "other", "some", "such", "no", "nor",
        "not", "only", "own", "same", "so", "than", "too", "very", "can", "just", "should", "now",
        "also", "been", "being", "do", "does", "did", "doing", "would", "could", "might", "must",
        "shall", "about", "above", "after", "again", "against", "am", "any", "before", "below",
        "between", "into", "through", "during", "out", "over", "under", "up", "down", "then",
        "once", "here", "there", "if", "else", "while", "because", "until", "we", "you", "your",
        "our", "their", "him", "her", "them", "me", "my", "myself", "itself", "those", "these",
        "his", "she", "i", "us", "via", "per",
    ];

    STOP_WORDS.contains(&word)
}

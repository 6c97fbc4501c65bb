//! Article summaries.
//!
//! [`Summarizer`] is the seam where a model-backed summarizer plugs in. The crate ships
//! [`LeadSummarizer`], an extractive summarizer that keeps the leading sentences of an
//! article, drops repeated sentences and tidies capitalisation.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::error::SummaryError;

/// Summaries shorter than this are treated as failures.
pub const MIN_SUMMARY_CHARS: usize = 10;

static SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+(?:[.!?]+|$)").expect("sentence pattern is valid"));

/// Produces a short summary of an article's text.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, text: &str) -> Result<String, SummaryError>;
}

/// Extractive summarizer: the first `sentence_count` distinct sentences, capped at
/// `max_chars` characters (the first sentence is always kept).
#[derive(Debug, Clone)]
pub struct LeadSummarizer {
    pub sentence_count: usize,
    pub max_chars: usize,
}

impl LeadSummarizer {
    pub fn new(sentence_count: usize, max_chars: usize) -> Self {
        Self {
            sentence_count,
            max_chars,
        }
    }
}

impl Summarizer for LeadSummarizer {
    fn summarize(&self, text: &str) -> Result<String, SummaryError> {
        if text.trim().is_empty() {
            return Err(SummaryError::Empty);
        }

        let mut summary = String::new();
        for sentence in distinct_sentences(text).take(self.sentence_count) {
            let sentence = capitalize(&sentence);
            let added = if summary.is_empty() {
                sentence.chars().count()
            } else {
                sentence.chars().count() + 1
            };
            if !summary.is_empty() && summary.chars().count() + added > self.max_chars {
                break;
            }
            if !summary.is_empty() {
                summary.push(' ');
            }
            summary.push_str(&sentence);
        }

        if summary.chars().count() < MIN_SUMMARY_CHARS {
            return Err(SummaryError::TooShort(MIN_SUMMARY_CHARS));
        }
        Ok(summary)
    }
}

/// Sentences of `text` in order, whitespace-collapsed, without repeats.
pub fn distinct_sentences(text: &str) -> impl Iterator<Item = String> + '_ {
    let mut seen = HashSet::new();
    SENTENCE
        .find_iter(text)
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
        .filter(move |s| seen.insert(s.clone()))
}

fn capitalize(sentence: &str) -> String {
    let mut chars = sentence.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

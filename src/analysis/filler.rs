//! # Filler Analyzer
//!
//! Scans a transcript for speech fillers and produces the analysis record
//! returned by the `/analyze` endpoint.
//!
//! ## Matching Rules:
//! - Matching is case-insensitive: the text is lower-cased once, and the
//!   surface forms recorded in the result are the lower-cased matches.
//! - Every matcher uses word boundaries, so "ah" never matches inside "that".
//! - Each matcher is searched independently over the whole text and every
//!   non-overlapping occurrence is counted. If the pattern list were ever
//!   extended with overlapping classes, a word recognized by two matchers
//!   would count twice — that is intentional, not a bug to "fix" with
//!   mutually-exclusive classification, since it changes observable totals.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

/// The fixed filler pattern list, one matcher per filler class.
///
/// Order is insertion order; it does not affect counts, only the order in
/// which matchers are walked during aggregation. Compiled once at first use.
static FILLER_MATCHERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b(um|uh|er|ah)\b",
        r"\b(like|you know|so|actually)\b",
        r"\b(basically|literally|obviously)\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("filler pattern must compile"))
    .collect()
});

/// The result of analyzing one transcript.
///
/// Constructed once per request by [`analyze`], immutable afterwards, and
/// serialized directly into the `/analyze` response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// Count of whitespace-delimited tokens in the transcript.
    pub total_words: usize,

    /// Total filler occurrences across all matchers.
    pub filler_count: usize,

    /// Fillers per 100 words (a percentage), rounded to 2 decimal places.
    /// Defined as 0 when the transcript has no words.
    pub filler_rate: f64,

    /// Occurrence count per matched surface form (lower-cased), e.g.
    /// {"um": 2, "like": 1}. Keys are the forms actually found, not the
    /// names of the filler classes that matched them.
    pub filler_details: HashMap<String, usize>,

    /// The original transcript, echoed back with casing preserved.
    pub transcript: String,
}

/// Analyze a transcript for fillers and basic metrics.
///
/// Pure and total over all string input: empty text, text with no fillers,
/// and text made entirely of fillers all produce a well-formed result, and
/// the same text always produces the same result.
pub fn analyze(text: &str) -> AnalysisResult {
    let total_words = text.split_whitespace().count();

    let lowered = text.to_lowercase();
    let mut filler_count = 0;
    let mut filler_details: HashMap<String, usize> = HashMap::new();

    for matcher in FILLER_MATCHERS.iter() {
        for hit in matcher.find_iter(&lowered) {
            *filler_details.entry(hit.as_str().to_string()).or_insert(0) += 1;
            filler_count += 1;
        }
    }

    let filler_rate = if total_words > 0 {
        let rate = filler_count as f64 / total_words as f64 * 100.0;
        // Half-way cases round to the even digit: 3.125 becomes 3.12.
        (rate * 100.0).round_ties_even() / 100.0
    } else {
        0.0
    };

    AnalysisResult {
        total_words,
        filler_count,
        filler_rate,
        filler_details,
        transcript: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let result = analyze("");
        assert_eq!(result.total_words, 0);
        assert_eq!(result.filler_count, 0);
        assert_eq!(result.filler_rate, 0.0);
        assert!(result.filler_details.is_empty());
        assert_eq!(result.transcript, "");
    }

    #[test]
    fn test_whitespace_only_input() {
        let result = analyze("   \t\n  ");
        assert_eq!(result.total_words, 0);
        assert_eq!(result.filler_rate, 0.0);
        assert!(result.filler_details.is_empty());
    }

    #[test]
    fn test_word_count_splits_on_whitespace_runs() {
        let result = analyze("one  two\tthree\nfour");
        assert_eq!(result.total_words, 4);
    }

    #[test]
    fn test_case_insensitive_matching() {
        let result = analyze("UM um Um");
        assert_eq!(result.total_words, 3);
        assert_eq!(result.filler_count, 3);
        assert_eq!(result.filler_details.get("um"), Some(&3));
        assert_eq!(result.filler_rate, 100.0);
        // Transcript keeps its original casing
        assert_eq!(result.transcript, "UM um Um");
    }

    #[test]
    fn test_word_boundaries() {
        // "ah" must match as a word, never as a substring of "that" or "path"
        let result = analyze("that ah path");
        assert_eq!(result.filler_count, 1);
        assert_eq!(result.filler_details.get("ah"), Some(&1));

        let result = analyze("path");
        assert_eq!(result.filler_count, 0);
        assert!(result.filler_details.is_empty());
    }

    #[test]
    fn test_multi_word_filler_phrase() {
        let result = analyze("You know, it could work");
        assert_eq!(result.filler_details.get("you know"), Some(&1));
        assert_eq!(result.filler_count, 1);
    }

    #[test]
    fn test_typical_transcript() {
        let result = analyze("So, um, I think we should, like, basically just go.");
        assert_eq!(result.total_words, 10);
        assert_eq!(result.filler_count, 4);
        assert_eq!(result.filler_details.get("so"), Some(&1));
        assert_eq!(result.filler_details.get("um"), Some(&1));
        assert_eq!(result.filler_details.get("like"), Some(&1));
        assert_eq!(result.filler_details.get("basically"), Some(&1));
        // 4 / 10 * 100
        assert_eq!(result.filler_rate, 40.0);
    }

    #[test]
    fn test_rate_rounding() {
        // 1 filler in 3 words: 33.333... rounds to 33.33
        let result = analyze("um one two");
        assert_eq!(result.total_words, 3);
        assert_eq!(result.filler_count, 1);
        assert_eq!(result.filler_rate, 33.33);
    }

    #[test]
    fn test_rate_rounding_ties_go_to_even() {
        // 1 filler in 32 words is exactly 3.125; the tie rounds down to 3.12,
        // not away from zero to 3.13.
        let transcript = format!("um {}", "word ".repeat(31).trim_end());
        let result = analyze(&transcript);
        assert_eq!(result.total_words, 32);
        assert_eq!(result.filler_count, 1);
        assert_eq!(result.filler_rate, 3.12);
    }

    #[test]
    fn test_repeated_fillers_accumulate() {
        let result = analyze("like like like uh uh");
        assert_eq!(result.filler_count, 5);
        assert_eq!(result.filler_details.get("like"), Some(&3));
        assert_eq!(result.filler_details.get("uh"), Some(&2));
    }

    #[test]
    fn test_idempotence() {
        let text = "Well, um, you know, it was literally fine.";
        assert_eq!(analyze(text), analyze(text));
    }

    #[test]
    fn test_serialization_shape() {
        let result = analyze("um");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["total_words"], 1);
        assert_eq!(json["filler_count"], 1);
        assert_eq!(json["filler_rate"], 100.0);
        assert_eq!(json["filler_details"]["um"], 1);
        assert_eq!(json["transcript"], "um");
    }
}

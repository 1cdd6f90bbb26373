//! Life Phrase strength validation.
//!
//! A phrase is valid only when every hard requirement passes. The score is
//! advisory and is computed for invalid phrases too, so a UI can show progress.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

pub const MIN_CHARS: usize = 50;
pub const MIN_WORDS: usize = 6;
pub const MIN_ENTROPY_BITS: f64 = 64.0;
pub const RECOMMENDED_CHARS: usize = 60;
pub const RECOMMENDED_WORDS: usize = 8;

/// Substrings that mark a phrase as guessable, matched case-insensitively.
const WEAK_SUBSTRINGS: &[&str] = &[
    "password",
    "123456",
    "qwerty",
    "abc",
    "the quick brown fox",
    "lorem ipsum",
];

/// A hard requirement the phrase failed.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StrengthError {
    #[error("Too short: {chars}/{min} characters minimum")]
    TooShort { chars: usize, min: usize },

    #[error("Too few words: {words}/{min} words minimum")]
    TooFewWords { words: usize, min: usize },

    #[error("Insufficient entropy: {bits:.1}/{min} bits minimum")]
    LowEntropy { bits: f64, min: f64 },

    #[error("Must include at least one number")]
    MissingDigit,

    #[error("Contains a common pattern: {0}")]
    WeakPattern(WeakPattern),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "pattern", content = "value", rename_all = "kebab-case")]
pub enum WeakPattern {
    CommonSubstring(&'static str),
    RepeatedWord(String),
}

impl fmt::Display for WeakPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeakPattern::CommonSubstring(s) => write!(f, "\"{s}\""),
            WeakPattern::RepeatedWord(w) => write!(f, "repeated word \"{w}\""),
        }
    }
}

/// A recommendation that does not affect validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrengthWarning {
    BelowRecommendedLength,
    BelowRecommendedWords,
}

impl fmt::Display for StrengthWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrengthWarning::BelowRecommendedLength => {
                write!(f, "Recommended: {RECOMMENDED_CHARS}+ characters")
            }
            StrengthWarning::BelowRecommendedWords => {
                write!(f, "Recommended: {RECOMMENDED_WORDS}+ words")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrengthLabel {
    Weak,
    Fair,
    Good,
    Strong,
    Excellent,
}

impl StrengthLabel {
    fn from_score(score: f64) -> Self {
        if score < 40.0 {
            StrengthLabel::Weak
        } else if score < 60.0 {
            StrengthLabel::Fair
        } else if score < 75.0 {
            StrengthLabel::Good
        } else if score < 90.0 {
            StrengthLabel::Strong
        } else {
            StrengthLabel::Excellent
        }
    }
}

impl fmt::Display for StrengthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrengthLabel::Weak => "weak",
            StrengthLabel::Fair => "fair",
            StrengthLabel::Good => "good",
            StrengthLabel::Strong => "strong",
            StrengthLabel::Excellent => "excellent",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrengthReport {
    pub valid: bool,
    /// 0..=100
    pub score: u8,
    pub label: StrengthLabel,
    pub errors: Vec<StrengthError>,
    pub warnings: Vec<StrengthWarning>,
    /// Total Shannon entropy in bits (per-character entropy times length).
    pub entropy_bits: f64,
    pub chars: usize,
    pub words: usize,
}

/// Shannon entropy of the character distribution, scaled by length.
pub fn shannon_entropy_bits(phrase: &str) -> f64 {
    let mut freq: HashMap<char, usize> = HashMap::new();
    let mut len = 0usize;
    for c in phrase.chars() {
        *freq.entry(c).or_default() += 1;
        len += 1;
    }
    if len == 0 {
        return 0.0;
    }

    let n = len as f64;
    let per_char: f64 = freq
        .values()
        .map(|&count| {
            let p = count as f64 / n;
            -p * p.log2()
        })
        .sum();
    per_char * n
}

/// Find the first weak pattern in `phrase`, if any.
pub fn find_weak_pattern(phrase: &str) -> Option<WeakPattern> {
    let lower = phrase.to_lowercase();

    if let Some(s) = WEAK_SUBSTRINGS.iter().copied().find(|s| lower.contains(s)) {
        return Some(WeakPattern::CommonSubstring(s));
    }

    // Adjacent identical words separated only by whitespace
    let mut prev: Option<&str> = None;
    let mut gap_is_whitespace = true;
    let mut rest = lower.as_str();
    while !rest.is_empty() {
        let word_len = rest
            .find(|c: char| !is_word_char(c))
            .unwrap_or(rest.len());
        if word_len > 0 {
            let word = &rest[..word_len];
            if gap_is_whitespace && prev == Some(word) {
                return Some(WeakPattern::RepeatedWord(word.to_string()));
            }
            prev = Some(word);
            rest = &rest[word_len..];
            gap_is_whitespace = true;
        } else {
            let gap_len = rest.find(is_word_char).unwrap_or(rest.len());
            let gap = &rest[..gap_len];
            gap_is_whitespace &= gap.chars().all(char::is_whitespace);
            rest = &rest[gap_len..];
        }
    }
    None
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Validate a Life Phrase against the hard requirements and score it.
pub fn validate_strength(phrase: &str) -> StrengthReport {
    let chars = phrase.chars().count();
    let words = phrase.split_whitespace().count();
    let entropy_bits = shannon_entropy_bits(phrase);
    let has_digit = phrase.chars().any(|c| c.is_ascii_digit());
    let weak = find_weak_pattern(phrase);

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if chars < MIN_CHARS {
        errors.push(StrengthError::TooShort {
            chars,
            min: MIN_CHARS,
        });
    }
    if words < MIN_WORDS {
        errors.push(StrengthError::TooFewWords {
            words,
            min: MIN_WORDS,
        });
    }
    if entropy_bits < MIN_ENTROPY_BITS {
        errors.push(StrengthError::LowEntropy {
            bits: entropy_bits,
            min: MIN_ENTROPY_BITS,
        });
    }
    if !has_digit {
        errors.push(StrengthError::MissingDigit);
    }
    if let Some(pattern) = weak.clone() {
        errors.push(StrengthError::WeakPattern(pattern));
    }

    if chars < RECOMMENDED_CHARS {
        warnings.push(StrengthWarning::BelowRecommendedLength);
    }
    if words < RECOMMENDED_WORDS {
        warnings.push(StrengthWarning::BelowRecommendedWords);
    }

    let mut score = (chars as f64 / 80.0 * 30.0).min(30.0)
        + (words as f64 / 10.0 * 20.0).min(20.0)
        + (entropy_bits / 100.0 * 35.0).min(35.0);
    if has_digit {
        score += 15.0;
    }
    if weak.is_some() {
        score -= 30.0;
    }
    let score = score.clamp(0.0, 100.0);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rounded = score.round() as u8;

    StrengthReport {
        valid: errors.is_empty(),
        score: rounded,
        label: StrengthLabel::from_score(score),
        errors,
        warnings,
        entropy_bits,
        chars,
        words,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRONG: &str = "Grandmother garden purple flowers 42 sunset evening over Enugu";

    #[test]
    fn test_strong_phrase_is_valid() {
        let report = validate_strength(STRONG);
        assert!(report.valid, "{:?}", report.errors);
        assert!(report.errors.is_empty());
        assert_eq!(report.score, 91);
        assert_eq!(report.label, StrengthLabel::Excellent);
    }

    #[test]
    fn test_short_phrase_with_digit_is_invalid_but_scored() {
        let report = validate_strength("My dog Max was born in Lagos on Christmas 2015");
        assert!(!report.valid);
        assert!(
            report
                .errors
                .contains(&StrengthError::TooShort { chars: 46, min: 50 })
        );
        assert!(report.score > 0);
        assert_eq!(report.words, 10);
    }

    #[test]
    fn test_length_and_word_errors_listed_together() {
        let phrase = "Sunflowers bloomed grandma1987 kitchens";
        assert_eq!(phrase.len(), 39);

        let report = validate_strength(phrase);
        assert!(!report.valid);
        assert!(
            report
                .errors
                .contains(&StrengthError::TooShort { chars: 39, min: 50 })
        );
        assert!(
            report
                .errors
                .contains(&StrengthError::TooFewWords { words: 4, min: 6 })
        );
    }

    #[test]
    fn test_weak_substring_rejected_regardless_of_length() {
        let phrase = "Our family password123456 lives under the old mango tree in 2003";
        let report = validate_strength(phrase);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| matches!(
            e,
            StrengthError::WeakPattern(WeakPattern::CommonSubstring("password"))
        )));
    }

    #[test]
    fn test_repeated_adjacent_words() {
        assert_eq!(
            find_weak_pattern("We went to the The market 1999"),
            Some(WeakPattern::RepeatedWord("the".to_string()))
        );
        assert_eq!(find_weak_pattern("the cat, the dog 1999"), None);
        assert_eq!(find_weak_pattern("the, the dog"), None);
    }

    #[test]
    fn test_missing_digit_is_hard_error() {
        let phrase = "Grandmother garden purple flowers sunset evening over Enugu town";
        let report = validate_strength(phrase);
        assert!(!report.valid);
        assert_eq!(report.errors, vec![StrengthError::MissingDigit]);
    }

    #[test]
    fn test_entropy() {
        assert!(shannon_entropy_bits("").abs() < f64::EPSILON);
        assert!(shannon_entropy_bits("aaaa").abs() < f64::EPSILON);
        // two symbols, equal frequency: 1 bit per char
        assert!((shannon_entropy_bits("abab") - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_bounds() {
        let long = "x9 ".repeat(200);
        for phrase in ["", "password", "abc abc abc", STRONG, long.as_str()] {
            let report = validate_strength(phrase);
            assert!(report.score <= 100);
        }
        assert_eq!(validate_strength("").score, 0);
    }

    #[test]
    fn test_warnings() {
        let report = validate_strength("Sunflowers bloomed grandma1987 kitchens");
        assert!(
            report
                .warnings
                .contains(&StrengthWarning::BelowRecommendedLength)
        );
        assert!(
            report
                .warnings
                .contains(&StrengthWarning::BelowRecommendedWords)
        );
        assert!(validate_strength(STRONG).warnings.is_empty());
    }
}

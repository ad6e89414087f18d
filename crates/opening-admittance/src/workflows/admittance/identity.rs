//! Exact identity and fuzzy similarity for registrants.
//!
//! Equality on [`Person`] is exact on the normalized name and email. Similarity
//! is a separate, non-transitive relation computed by [`SimilarityMatcher`];
//! callers compare pairs and never derive clusters from it.

use std::collections::HashMap;
use std::fmt;

use itertools::Itertools;
use serde::Serialize;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.9;

/// Single given names are too common to count as a match on their own.
const MIN_NAME_GROUP: usize = 2;

/// Permutation count grows factorially; longer names are compared on their
/// leading tokens only.
const MAX_NAME_TOKENS: usize = 7;

/// Identity of a registrant as submitted through the form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Person {
    name: String,
    email: String,
}

impl Person {
    pub fn new(name: impl AsRef<str>, email: impl AsRef<str>) -> Self {
        Self {
            name: normalize_field(name.as_ref()),
            email: normalize_field(email.as_ref()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

pub(crate) fn normalize_field(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned.trim().to_lowercase()
}

/// Fuzzy matcher comparing name/email pairs against a ratio threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityMatcher {
    threshold: f64,
}

impl Default for SimilarityMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl SimilarityMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// True when either the emails or some ordering of the names exceed the
    /// threshold. Both directions are evaluated so the relation is symmetric.
    pub fn similar(&self, a: &Person, b: &Person) -> bool {
        if self.email_similarity(a, b) > self.threshold {
            return true;
        }

        best_name_ratio(a.name(), b.name(), Some(self.threshold)) > self.threshold
            || best_name_ratio(b.name(), a.name(), Some(self.threshold)) > self.threshold
    }

    /// Ratio between the two emails; blank emails never match.
    pub fn email_similarity(&self, a: &Person, b: &Person) -> f64 {
        if a.email().is_empty() || b.email().is_empty() {
            return 0.0;
        }
        similarity_ratio(a.email(), b.email())
    }

    /// Best ratio over every token ordering, in both directions.
    pub fn name_similarity(&self, a: &Person, b: &Person) -> f64 {
        best_name_ratio(a.name(), b.name(), None).max(best_name_ratio(b.name(), a.name(), None))
    }
}

/// Compares `subject` against permutations of `other`'s tokens, in groups the
/// size of `subject`'s token count down to pairs. With a threshold the scan
/// stops at the first ordering above it and skips orderings whose character
/// overlap cannot reach it.
fn best_name_ratio(subject: &str, other: &str, threshold: Option<f64>) -> f64 {
    let subject_chars = comparable_chars(subject);
    if subject_chars.is_empty() {
        return 0.0;
    }

    let tokens: Vec<&str> = other.split_whitespace().take(MAX_NAME_TOKENS).collect();
    let widest = subject.split_whitespace().count().min(tokens.len());

    let mut best = 0.0;
    for size in (MIN_NAME_GROUP..=widest).rev() {
        for group in tokens.iter().copied().permutations(size) {
            let candidate: Vec<char> = group.iter().flat_map(|token| token.chars()).collect();

            if let Some(threshold) = threshold {
                if quick_ratio(&subject_chars, &candidate) <= threshold {
                    continue;
                }
            }

            let ratio = ratio_of(&subject_chars, &candidate);
            if ratio > best {
                best = ratio;
                if threshold.is_some_and(|threshold| best > threshold) {
                    return best;
                }
            }
        }
    }

    best
}

/// Longest-common-subsequence ratio `2 * lcs / (len(a) + len(b))`, ignoring
/// whitespace. Two empty strings are identical.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    ratio_of(&comparable_chars(a), &comparable_chars(b))
}

fn comparable_chars(value: &str) -> Vec<char> {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

fn ratio_of(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    (2 * lcs_len(a, b)) as f64 / total as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];

    for &left in a {
        for (j, &right) in b.iter().enumerate() {
            current[j + 1] = if left == right {
                previous[j] + 1
            } else {
                current[j].max(previous[j + 1])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Upper bound on [`ratio_of`] from shared character counts.
fn quick_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let mut available: HashMap<char, usize> = HashMap::new();
    for &c in a {
        *available.entry(c).or_default() += 1;
    }

    let mut matches = 0;
    for c in b {
        if let Some(count) = available.get_mut(c) {
            if *count > 0 {
                *count -= 1;
                matches += 1;
            }
        }
    }

    (2 * matches) as f64 / total as f64
}

//! Filename similarity metrics for disambiguating duplicate-content groups.
//!
//! Both metrics are symmetric, return 1.0 for identical inputs, and stay
//! within [0, 1], which the greedy assignment in the matcher relies on.

/// Pluggable fuzzy-match function over filenames
pub trait SimilarityMetric: Send + Sync {
    /// Score the similarity of two strings in [0, 1]
    fn score(&self, a: &str, b: &str) -> f64;
}

/// Normalized Levenshtein similarity: 1 - distance / max_len.
///
/// The default metric. Works well for the counter-and-suffix renames
/// photo tools produce (IMG001 vs IMG1, photo.jpg vs photo (2).jpg).
pub struct NormalizedLevenshtein;

impl SimilarityMetric for NormalizedLevenshtein {
    fn score(&self, a: &str, b: &str) -> f64 {
        let a_chars: Vec<char> = a.chars().collect();
        let b_chars: Vec<char> = b.chars().collect();

        let max_len = a_chars.len().max(b_chars.len());
        if max_len == 0 {
            return 1.0;
        }

        let distance = levenshtein(&a_chars, &b_chars);
        1.0 - distance as f64 / max_len as f64
    }
}

/// Two-row dynamic-programming edit distance
fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Jaccard overlap of character bigrams.
///
/// An alternative metric that is insensitive to token order, useful
/// when collections mix "2024-06 beach" and "beach 2024-06" styles.
pub struct TokenOverlap;

impl SimilarityMetric for TokenOverlap {
    fn score(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 1.0;
        }

        let a_grams = bigrams(a);
        let b_grams = bigrams(b);

        if a_grams.is_empty() && b_grams.is_empty() {
            return 1.0;
        }

        let intersection = a_grams.intersection(&b_grams).count();
        let union = a_grams.union(&b_grams).count();
        if union == 0 {
            return 0.0;
        }

        intersection as f64 / union as f64
    }
}

fn bigrams(s: &str) -> std::collections::HashSet<(char, char)> {
    let chars: Vec<char> = s.chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

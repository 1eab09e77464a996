//! Fuzzy matching of free-text decisions onto option labels.
//!
//! Similarity is the Ratcliff/Obershelp ratio `2*M/T`, where `M` counts
//! characters in matching blocks found by recursively taking the longest
//! common substring, and `T` is the combined length.

use super::options::VotingOptions;

/// Result of matching one raw decision.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDecision {
    /// The option label when matched, otherwise the uppercased raw text.
    pub label: String,
    /// Best score seen, bonus included.
    pub score: f64,
    pub matched: bool,
}

/// Ratcliff/Obershelp similarity in `[0.0, 1.0]`. Two empty strings score 1.0.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, k) = longest_match(a, b);
    if k == 0 {
        return 0;
    }
    k + matching_chars(&a[..i], &b[..j]) + matching_chars(&a[i + k..], &b[j + k..])
}

/// Longest common substring as `(start_a, start_b, len)`.
///
/// Ties go to the block starting earliest in `a`, then earliest in `b`.
fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    let mut row = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            row[j + 1] = if ca == cb { prev[j] + 1 } else { 0 };
            let len = row[j + 1];
            if len > best.2 {
                best = (i + 1 - len, j + 1 - len, len);
            }
        }
        std::mem::swap(&mut prev, &mut row);
    }
    best
}

/// Match `raw` to the closest option.
///
/// Comparison is case-insensitive. A raw decision contained in an option
/// earns `substring_bonus`. The highest score wins (earlier options win
/// ties) and is accepted only when it exceeds `threshold`.
pub fn normalize_decision(
    raw: &str,
    options: &VotingOptions,
    threshold: f64,
    substring_bonus: f64,
) -> NormalizedDecision {
    let decision = raw.trim().to_uppercase();
    let mut best_score = 0.0;
    let mut best: Option<&String> = None;

    for option in options.labels() {
        let upper = option.to_uppercase();
        let mut score = similarity_ratio(&decision, &upper);
        if upper.contains(&decision) {
            score += substring_bonus;
        }
        if score > best_score {
            best_score = score;
            best = Some(option);
        }
    }

    match best {
        Some(option) if best_score > threshold => NormalizedDecision {
            label: option.clone(),
            score: best_score,
            matched: true,
        },
        _ => NormalizedDecision {
            label: decision,
            score: best_score,
            matched: false,
        },
    }
}

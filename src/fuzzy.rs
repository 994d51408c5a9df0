//! Layered similarity between a typed query and a candidate name.
//!
//! Tiers are checked in order and the first that applies decides the score:
//! exact (1.0), prefix (0.9), substring (0.7 up to 0.8 for tight matches),
//! then Levenshtein similarity scaled into `[0, EDIT_CEILING]`. Because each
//! tier's range sits strictly below the one above, a higher tier always wins
//! regardless of string lengths.

pub const EXACT_SCORE: f64 = 1.0;
pub const PREFIX_SCORE: f64 = 0.9;
pub const SUBSTRING_SCORE: f64 = 0.7;
const SUBSTRING_BOOST: f64 = 0.1;
pub const EDIT_CEILING: f64 = 0.6;

/// Case-insensitive similarity in `[0, 1]`. Pure and deterministic.
pub fn score(query: &str, candidate: &str) -> f64 {
    let q = query.trim().to_lowercase();
    let c = candidate.trim().to_lowercase();
    if q.is_empty() || c.is_empty() {
        return 0.0;
    }

    if q == c {
        return EXACT_SCORE;
    }
    if c.starts_with(&q) {
        return PREFIX_SCORE;
    }
    if c.contains(&q) {
        let ratio = q.chars().count() as f64 / c.chars().count() as f64;
        return SUBSTRING_SCORE + SUBSTRING_BOOST * ratio.min(1.0);
    }
    edit_similarity(&q, &c)
}

fn edit_similarity(q: &str, c: &str) -> f64 {
    let longest = q.chars().count().max(c.chars().count());
    if longest == 0 {
        return 0.0;
    }
    let distance = levenshtein(q, c);
    // More than half the longer string rewritten is noise, not a typo.
    if distance * 2 > longest {
        return 0.0;
    }
    EDIT_CEILING * (1.0 - distance as f64 / longest as f64)
}

/// Unit-cost insert/delete/substitute distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let b_chars: Vec<char> = b.chars().collect();
    let m = b_chars.len();
    if a.is_empty() {
        return m;
    }
    if m == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=m).collect();
    let mut curr = vec![0; m + 1];
    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = if ca == *cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[m]
}

use std::cmp::Ordering;

use crate::config::RefDataConfig;
use crate::fuzzy;
use crate::model::{CharacterRecord, ItemRecord};

pub const DEFAULT_LIMIT: usize = 10;
pub const DEFAULT_MIN_SCORE: f64 = 0.3;
pub const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub limit: usize,
    pub min_score: f64,
    pub min_query_chars: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            min_score: DEFAULT_MIN_SCORE,
            min_query_chars: MIN_QUERY_CHARS,
        }
    }
}

impl SearchOptions {
    pub fn from_config(cfg: &RefDataConfig) -> Self {
        Self {
            limit: cfg.search_limit,
            min_score: cfg.search_min_score,
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Anything that can be ranked: a list of `(text, weight)` fields.
pub trait Searchable {
    fn search_fields(&self) -> Vec<(&str, f64)>;
}

impl Searchable for CharacterRecord {
    fn search_fields(&self) -> Vec<(&str, f64)> {
        let mut fields = vec![(self.name.as_str(), 1.0), (self.id.as_str(), 1.0)];
        if !self.title.is_empty() {
            fields.push((self.title.as_str(), 0.5));
        }
        fields
    }
}

impl Searchable for ItemRecord {
    fn search_fields(&self) -> Vec<(&str, f64)> {
        vec![(self.name.as_str(), 1.0)]
    }
}

impl Searchable for &str {
    fn search_fields(&self) -> Vec<(&str, f64)> {
        vec![(*self, 1.0)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchQuality {
    Exact,
    Good,
    Partial,
}

impl MatchQuality {
    pub fn from_score(score: f64) -> Self {
        if score >= fuzzy::PREFIX_SCORE {
            Self::Exact
        } else if score >= fuzzy::SUBSTRING_SCORE {
            Self::Good
        } else {
            Self::Partial
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Good => "good",
            Self::Partial => "partial",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<T> {
    pub item: T,
    /// Position in the candidate list; the tie-breaker for equal scores.
    pub index: usize,
    pub score: f64,
    pub quality: MatchQuality,
}

impl<T: Clone> SearchHit<&T> {
    pub fn cloned(&self) -> SearchHit<T> {
        SearchHit {
            item: self.item.clone(),
            index: self.index,
            score: self.score,
            quality: self.quality,
        }
    }
}

/// Best weighted field score for one candidate.
pub fn score_candidate<T: Searchable>(query: &str, candidate: &T) -> f64 {
    candidate
        .search_fields()
        .into_iter()
        .map(|(text, weight)| fuzzy::score(query, text) * weight)
        .fold(0.0, f64::max)
}

/// Scores every candidate, drops those under `min_score`, and returns the best
/// `limit` in descending score order. Equal scores keep candidate order.
pub fn search<'a, T: Searchable>(
    query: &str,
    candidates: &'a [T],
    opts: &SearchOptions,
) -> Vec<SearchHit<&'a T>> {
    let query = query.trim();
    if query.chars().count() < opts.min_query_chars.max(1) || opts.limit == 0 {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit<&'a T>> = candidates
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let score = score_candidate(query, item);
            if score <= 0.0 || score < opts.min_score {
                return None;
            }
            Some(SearchHit {
                item,
                index,
                score,
                quality: MatchQuality::from_score(score),
            })
        })
        .collect();

    // sort_by is stable, so ties stay in enumeration order.
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    hits.truncate(opts.limit);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_bands() {
        assert_eq!(MatchQuality::from_score(1.0), MatchQuality::Exact);
        assert_eq!(MatchQuality::from_score(0.9), MatchQuality::Exact);
        assert_eq!(MatchQuality::from_score(0.75), MatchQuality::Good);
        assert_eq!(MatchQuality::from_score(0.4), MatchQuality::Partial);
    }

    #[test]
    fn title_counts_at_half_weight() {
        let rec = CharacterRecord {
            id: "Ahri".to_string(),
            key: Some(103),
            name: "Ahri".to_string(),
            title: "the Nine-Tailed Fox".to_string(),
            image: "Ahri.png".to_string(),
            tags: Default::default(),
        };
        let s = score_candidate("the nine-tailed fox", &rec);
        assert!((s - 0.5).abs() < 1e-9);
    }
}

//! Ranks sitemap URLs as replacements for a broken link.
//!
//! Each candidate gets `0.4 * similarity(full URLs) + 0.6 * similarity(slugs)`,
//! where the slug is the last path segment. Pages that move between
//! directories usually keep their file name, so the slug term dominates.

use crate::result::Suggestion;
use crate::sitemap::{SitemapIndex, normalize_url};
use std::collections::HashMap;

pub const URL_WEIGHT: f64 = 0.4;
pub const SLUG_WEIGHT: f64 = 0.6;
pub const DEFAULT_THRESHOLD: f64 = 0.15;
pub const DEFAULT_LIMIT: usize = 5;

/// A symmetric string similarity in [0, 1], 1.0 only for equal inputs.
pub trait Similarity: Send + Sync {
    fn score(&self, a: &str, b: &str) -> f64;
}

/// Sørensen-Dice coefficient over character bigrams, whitespace ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiceCoefficient;

impl Similarity for DiceCoefficient {
    fn score(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().filter(|c| !c.is_whitespace()).collect();
        let b: Vec<char> = b.chars().filter(|c| !c.is_whitespace()).collect();

        if a == b {
            return 1.0;
        }
        if a.len() < 2 || b.len() < 2 {
            return 0.0;
        }

        let mut bigrams: HashMap<(char, char), usize> = HashMap::new();
        for pair in a.windows(2) {
            *bigrams.entry((pair[0], pair[1])).or_insert(0) += 1;
        }

        let mut shared = 0usize;
        for pair in b.windows(2) {
            if let Some(count) = bigrams.get_mut(&(pair[0], pair[1]))
                && *count > 0
            {
                *count -= 1;
                shared += 1;
            }
        }

        (2.0 * shared as f64) / (a.len() + b.len() - 2) as f64
    }
}

/// Last path segment of a normalized URL.
pub fn slug(url: &str) -> &str {
    normalize_url(url).rsplit('/').next().unwrap_or("")
}

#[derive(Debug, Clone)]
pub struct SuggestionEngine<S = DiceCoefficient> {
    metric: S,
    threshold: f64,
    limit: usize,
}

impl SuggestionEngine<DiceCoefficient> {
    pub fn new() -> Self {
        Self::with_metric(DiceCoefficient)
    }
}

impl Default for SuggestionEngine<DiceCoefficient> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Similarity> SuggestionEngine<S> {
    pub fn with_metric(metric: S) -> Self {
        Self {
            metric,
            threshold: DEFAULT_THRESHOLD,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Minimum confidence a candidate must exceed to appear in `suggest_top`.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Weighted confidence that `candidate` replaces `broken`.
    pub fn score(&self, broken: &str, candidate: &str) -> f64 {
        let broken = normalize_url(broken);
        let url_score = self.metric.score(broken, candidate);
        let slug_score = self.metric.score(slug(broken), slug(candidate));
        (URL_WEIGHT * url_score + SLUG_WEIGHT * slug_score).clamp(0.0, 1.0)
    }

    fn scored<'a>(
        &'a self,
        broken: &'a str,
        index: &'a SitemapIndex,
    ) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        index
            .iter()
            .map(move |candidate| (candidate, self.score(broken, candidate)))
    }

    /// Highest-confidence candidate, however weak. `None` only when the index
    /// is empty. Ties go to the candidate listed first in the sitemap.
    pub fn suggest_best(&self, broken: &str, index: &SitemapIndex) -> Option<Suggestion> {
        let mut best: Option<(&str, f64)> = None;
        for (candidate, confidence) in self.scored(broken, index) {
            match best {
                Some((_, top)) if confidence <= top => {}
                _ => best = Some((candidate, confidence)),
            }
        }
        best.map(|(url, confidence)| Suggestion::new(url.to_string(), confidence))
    }

    /// Up to `limit` candidates above the threshold, best first. Equal scores
    /// keep sitemap order.
    pub fn suggest_top(&self, broken: &str, index: &SitemapIndex) -> Vec<Suggestion> {
        let mut matches: Vec<(&str, f64)> = self
            .scored(broken, index)
            .filter(|(_, confidence)| *confidence > self.threshold)
            .collect();

        matches.sort_by(|a, b| b.1.total_cmp(&a.1));
        matches.truncate(self.limit);

        matches
            .into_iter()
            .map(|(url, confidence)| Suggestion::new(url.to_string(), confidence))
            .collect()
    }
}

//! TF-IDF retrieval over the example corpus.
//!
//! Documents are lowercased, split on whitespace and stripped of English stop
//! words. Term weights are raw counts scaled by the smoothed inverse document
//! frequency `ln((1 + n) / (1 + df)) + 1`, and every row is L2-normalized, so
//! the cosine of two rows is their dot product.
//!
//! The vector space is fitted per call and never cached.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::corpus::{Corpus, CorpusEntry};
use crate::stop_words::is_stop_word;

/// Default cosine threshold for [`group_by_threshold`].
pub const DEFAULT_GROUP_THRESHOLD: f64 = 0.7;

/// A sparse, L2-normalized row. Entries are sorted by term index.
#[derive(Debug, Clone, Default, PartialEq)]
struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a, x) = self.entries[i];
            let (b, y) = other.entries[j];
            match a.cmp(&b) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    sum += x * y;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

fn analyze(document: &str) -> Vec<String> {
    document
        .to_lowercase()
        .split_whitespace()
        .filter(|term| !is_stop_word(term))
        .map(str::to_string)
        .collect()
}

/// Fit a vocabulary over `documents` and return one row per document.
fn fit_transform<S: AsRef<str>>(documents: &[S]) -> Vec<SparseVector> {
    let analyzed: Vec<Vec<String>> = documents.iter().map(|d| analyze(d.as_ref())).collect();

    let vocabulary: BTreeMap<&str, usize> = analyzed
        .iter()
        .flatten()
        .map(String::as_str)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .enumerate()
        .map(|(index, term)| (term, index))
        .collect();

    let mut document_frequency = vec![0usize; vocabulary.len()];
    let counts: Vec<BTreeMap<usize, usize>> = analyzed
        .iter()
        .map(|terms| {
            let mut counts = BTreeMap::new();
            for term in terms {
                *counts.entry(vocabulary[term.as_str()]).or_insert(0) += 1;
            }
            for index in counts.keys() {
                document_frequency[*index] += 1;
            }
            counts
        })
        .collect();

    let n = documents.len() as f64;
    let idf: Vec<f64> = document_frequency
        .iter()
        .map(|df| ((1.0 + n) / (1.0 + *df as f64)).ln() + 1.0)
        .collect();

    counts
        .into_iter()
        .map(|counts| {
            let mut entries: Vec<(usize, f64)> = counts
                .into_iter()
                .map(|(index, count)| (index, count as f64 * idf[index]))
                .collect();
            let norm = entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                for (_, weight) in &mut entries {
                    *weight /= norm;
                }
            }
            SparseVector { entries }
        })
        .collect()
}

fn cosine(a: &SparseVector, b: &SparseVector) -> f64 {
    a.dot(b).clamp(0.0, 1.0)
}

/// Cosine similarity of two queries in a vocabulary fitted over just the two.
///
/// Scores from calls with different partners are not comparable.
pub fn similarity(q1: &str, q2: &str) -> f64 {
    let rows = fit_transform(&[q1, q2]);
    cosine(&rows[0], &rows[1])
}

/// Greedy single-link grouping.
///
/// Each unlabeled query in input order becomes a representative; every query
/// scoring at least `threshold` against it (itself included) joins a new
/// group when there is more than one. A query matching a later
/// representative is moved into that later group. Unmatched queries stay
/// `None`.
pub fn group_by_threshold<S: AsRef<str>>(queries: &[S], threshold: f64) -> Vec<Option<usize>> {
    let rows = fit_transform(queries);
    let mut labels: Vec<Option<usize>> = vec![None; queries.len()];
    let mut next_group = 0;

    for i in 0..rows.len() {
        if labels[i].is_some() {
            continue;
        }
        let members: Vec<usize> = (0..rows.len())
            .filter(|&j| j == i || cosine(&rows[i], &rows[j]) >= threshold)
            .collect();
        if members.len() > 1 {
            for j in members {
                labels[j] = Some(next_group);
            }
            next_group += 1;
        }
    }

    tracing::debug!(queries = queries.len(), groups = next_group, "grouped queries");
    labels
}

/// Ranks corpus entries against a query.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    corpus: Corpus,
}

impl SimilarityIndex {
    pub fn new(corpus: Corpus) -> Self {
        Self { corpus }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Every corpus entry with its score, best first. Equal scores keep
    /// corpus order.
    pub fn scored(&self, query: &str) -> Vec<(&CorpusEntry, f64)> {
        if self.corpus.is_empty() {
            return Vec::new();
        }

        let documents: Vec<&str> = std::iter::once(query)
            .chain(self.corpus.iter().map(|e| e.source_query.as_str()))
            .collect();
        let rows = fit_transform(&documents);
        let (query_row, corpus_rows) = rows.split_at(1);

        let mut scored: Vec<(&CorpusEntry, f64)> = self
            .corpus
            .iter()
            .zip(corpus_rows)
            .map(|(entry, row)| (entry, cosine(&query_row[0], row)))
            .collect();
        // sort_by is stable
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored
    }

    /// The `k` entries most similar to `query`.
    pub fn top_k(&self, query: &str, k: usize) -> Vec<&CorpusEntry> {
        if k == 0 {
            return Vec::new();
        }
        let top: Vec<&CorpusEntry> = self
            .scored(query)
            .into_iter()
            .take(k)
            .map(|(entry, _)| entry)
            .collect();
        tracing::debug!(k, returned = top.len(), "retrieved examples");
        top
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kql: &str) -> CorpusEntry {
        CorpusEntry::new(kql, format!("-- {kql}"))
    }

    #[test]
    fn test_identical_documents() {
        let score = similarity("FunctionOrTable1 | take 10", "FunctionOrTable1 | take 10");
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_documents() {
        assert_eq!(similarity("alpha beta", "gamma delta"), 0.0);
    }

    #[test]
    fn test_stop_words_only_scores_zero() {
        assert_eq!(similarity("the of and", "the of and"), 0.0);
    }

    #[test]
    fn test_case_insensitive_terms() {
        let score = similarity("WHERE Variable1", "where variable1");
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_k_ordering() {
        let index = SimilarityIndex::new(Corpus::new(vec![
            entry("summarize count by Variable1"),
            entry("FunctionOrTable1 | summarize count by Variable1"),
            entry("render timechart"),
        ]));
        let top = index.top_k("FunctionOrTable1 | summarize count by Variable1", 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].source_query, "FunctionOrTable1 | summarize count by Variable1");
        assert_eq!(top[1].source_query, "summarize count by Variable1");
    }

    #[test]
    fn test_ties_keep_corpus_order() {
        let index = SimilarityIndex::new(Corpus::new(vec![
            CorpusEntry::new("alpha beta", "first"),
            CorpusEntry::new("alpha beta", "second"),
        ]));
        let top = index.top_k("alpha beta", 2);
        assert_eq!(top[0].target_query, "first");
        assert_eq!(top[1].target_query, "second");
    }

    #[test]
    fn test_top_k_edge_cases() {
        let empty = SimilarityIndex::new(Corpus::default());
        assert!(empty.top_k("anything", 3).is_empty());

        let index = SimilarityIndex::new(Corpus::new(vec![entry("a b"), entry("c d")]));
        assert!(index.top_k("a b", 0).is_empty());
        assert_eq!(index.top_k("a b", 10).len(), 2);
    }

    #[test]
    fn test_grouping() {
        let labels = group_by_threshold(
            &[
                "FunctionOrTable1 | where Variable1 > 1",
                "FunctionOrTable1 | where Variable1 > 1",
                "render piechart",
            ],
            DEFAULT_GROUP_THRESHOLD,
        );
        assert_eq!(labels, vec![Some(0), Some(0), None]);
    }

    #[test]
    fn test_grouping_empty() {
        assert!(group_by_threshold::<&str>(&[], 0.5).is_empty());
    }
}

//! BM25 relevance ranking over a [`CorpusIndex`].
//!
//! The tunables are fixed so that scores from different vendor plugins are
//! produced by the same function. They are still only strictly comparable
//! within one corpus, since IDF and average length are per-corpus.

use super::index::CorpusIndex;
use super::tokenize::tokenize;
use crate::types::Document;

/// Term-frequency saturation.
pub const K1: f64 = 1.5;
/// Document-length normalization strength.
pub const B: f64 = 0.75;

/// A document paired with its relevance score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDocument<'a> {
    pub document: &'a Document,
    pub score: f64,
}

/// The ordered outcome of ranking one query against one index.
///
/// Finite and restartable: iterate it as many times as needed, the order never
/// changes. Sorted by descending score; ties keep index order.
#[derive(Debug, Clone, Default)]
pub struct Ranking<'a> {
    hits: Vec<ScoredDocument<'a>>,
}

impl<'a> Ranking<'a> {
    pub fn iter(&self) -> std::slice::Iter<'_, ScoredDocument<'a>> {
        self.hits.iter()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

impl<'a> IntoIterator for Ranking<'a> {
    type Item = ScoredDocument<'a>;
    type IntoIter = std::vec::IntoIter<ScoredDocument<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}

impl<'r, 'a> IntoIterator for &'r Ranking<'a> {
    type Item = &'r ScoredDocument<'a>;
    type IntoIter = std::slice::Iter<'r, ScoredDocument<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}

/// BM25 inverse document frequency: `ln((N - df + 0.5) / (df + 0.5) + 1)`.
pub fn idf(doc_count: usize, doc_freq: u32) -> f64 {
    let n = doc_count as f64;
    let df = f64::from(doc_freq);
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// Contribution of one query term to one document's score.
pub fn term_score(idf: f64, tf: u32, doc_len: u32, avg_doc_len: f64) -> f64 {
    if tf == 0 {
        return 0.0;
    }
    let tf = f64::from(tf);
    let length_ratio = if avg_doc_len > 0.0 {
        f64::from(doc_len) / avg_doc_len
    } else {
        0.0
    };
    idf * (tf * (K1 + 1.0)) / (tf + K1 * (1.0 - B + B * length_ratio))
}

/// Ranks every document in `index` against `query`.
///
/// Query terms absent from the corpus contribute nothing; documents sharing no
/// term with the query are left out. A query with no usable tokens yields an
/// empty ranking.
pub fn rank<'a>(index: &'a CorpusIndex, query: &str) -> Ranking<'a> {
    let terms = tokenize(query);
    if terms.is_empty() || index.document_count() == 0 {
        return Ranking::default();
    }

    let stats = index.stats();
    let doc_count = index.document_count();

    // IDF per query term, in query order; None for terms the corpus never uses
    let term_idfs: Vec<Option<(&str, f64)>> = terms
        .iter()
        .map(|term| {
            let df = index.document_frequency(term);
            (df > 0).then(|| (term.as_str(), idf(doc_count, df)))
        })
        .collect();

    if term_idfs.iter().all(Option::is_none) {
        return Ranking::default();
    }

    let mut hits: Vec<ScoredDocument<'a>> = index
        .documents()
        .iter()
        .enumerate()
        .filter_map(|(idx, document)| {
            let doc_terms = &stats.doc_terms[idx];
            let doc_len = stats.doc_lengths[idx];
            let score: f64 = term_idfs
                .iter()
                .flatten()
                .map(|&(term, idf)| {
                    let tf = doc_terms.get(term).copied().unwrap_or(0);
                    term_score(idf, tf, doc_len, stats.avg_doc_len)
                })
                .sum();
            (score > 0.0).then_some(ScoredDocument { document, score })
        })
        .collect();

    // Stable sort keeps index order for equal scores
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));

    Ranking { hits }
}

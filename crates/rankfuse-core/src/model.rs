//! Ranked-list data model shared by retrievers, fusion and run files.
//!
//! # Invariants
//!
//! - Docids are unique within one [`RankedList`].
//! - Scores are non-increasing along the list; rank is the 1-based index.
//! - Lists built with [`RankedList::new`] break score ties by docid ascending.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// One retrieved document and its retriever-specific score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub docid: String,
    pub score: f64,
}

impl ScoredDocument {
    pub fn new(docid: impl Into<String>, score: f64) -> Self {
        Self {
            docid: docid.into(),
            score,
        }
    }
}

/// Canonical ranking order: score descending, then docid ascending.
///
/// Uses `total_cmp` so NaN scores still produce a total, repeatable order.
pub fn ranking_order(a: &ScoredDocument, b: &ScoredDocument) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.docid.cmp(&b.docid))
}

/// Ordered `(docid, score)` sequence produced by exactly one retrieval call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankedList {
    docs: Vec<ScoredDocument>,
}

/// A ranked list produced by fusing two or more input lists.
pub type FusedResult = RankedList;

impl RankedList {
    /// Build a list from unordered documents.
    ///
    /// Sorts into [`ranking_order`] and keeps only the best-scored entry for
    /// each docid.
    pub fn new(docs: impl IntoIterator<Item = ScoredDocument>) -> Self {
        let mut docs: Vec<ScoredDocument> = docs.into_iter().collect();
        docs.sort_by(ranking_order);

        let mut seen = HashSet::with_capacity(docs.len());
        docs.retain(|doc| seen.insert(doc.docid.clone()));

        Self { docs }
    }

    /// Wrap documents that are already in rank order.
    ///
    /// Retrievers hand back their own ordering; this keeps it untouched.
    #[must_use]
    pub const fn from_ranked(docs: Vec<ScoredDocument>) -> Self {
        Self { docs }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredDocument> {
        self.docs.iter()
    }

    #[must_use]
    pub fn docs(&self) -> &[ScoredDocument] {
        &self.docs
    }

    /// The first `depth` entries (or all of them when the list is shorter).
    #[must_use]
    pub fn head(&self, depth: usize) -> &[ScoredDocument] {
        &self.docs[..depth.min(self.docs.len())]
    }

    /// Keep at most `len` entries.
    pub fn truncate(&mut self, len: usize) {
        self.docs.truncate(len);
    }

    /// Look up a document by id.
    #[must_use]
    pub fn get(&self, docid: &str) -> Option<&ScoredDocument> {
        self.docs.iter().find(|doc| doc.docid == docid)
    }

    /// 1-based rank of `docid`, if present.
    #[must_use]
    pub fn rank_of(&self, docid: &str) -> Option<usize> {
        self.docs
            .iter()
            .position(|doc| doc.docid == docid)
            .map(|idx| idx + 1)
    }

    pub fn docids(&self) -> impl Iterator<Item = &str> {
        self.docs.iter().map(|doc| doc.docid.as_str())
    }

    /// True when scores never increase along the list.
    #[must_use]
    pub fn is_ranked(&self) -> bool {
        self.docs.windows(2).all(|w| w[0].score >= w[1].score)
    }
}

impl AsRef<Self> for RankedList {
    fn as_ref(&self) -> &Self {
        self
    }
}

impl FromIterator<ScoredDocument> for RankedList {
    fn from_iter<I: IntoIterator<Item = ScoredDocument>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'a> IntoIterator for &'a RankedList {
    type Item = &'a ScoredDocument;
    type IntoIter = std::slice::Iter<'a, ScoredDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.docs.iter()
    }
}

impl IntoIterator for RankedList {
    type Item = ScoredDocument;
    type IntoIter = std::vec::IntoIter<ScoredDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.docs.into_iter()
    }
}

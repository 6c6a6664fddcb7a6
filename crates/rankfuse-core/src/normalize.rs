//! Score normalization applied to a ranked list before fusion.
//!
//! Sparse and dense retrievers score on unrelated scales, so interpolating raw
//! scores lets whichever scale is larger dominate. Min-max-centered
//! normalization maps each list onto a unit-width interval centered on 0:
//!
//! ```text
//! s' = (s - (min + max) / 2) / (max - min)
//! ```
//!
//! Output lies in `[-0.5, 0.5]` and the midpoint of the observed range maps
//! to 0. When every score is equal (`max == min`) the list is returned
//! unchanged instead of dividing by zero.

use crate::model::{RankedList, ScoredDocument};

/// How scores are rescaled before combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizeMode {
    /// Leave scores untouched.
    #[default]
    None,
    /// `(s - mid) / (max - min)`, output in `[-0.5, 0.5]`.
    MinMaxCentered,
}

/// Observed score range of one list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

impl ScoreRange {
    /// Range over `docs`, or `None` for an empty slice.
    #[must_use]
    pub fn of(docs: &[ScoredDocument]) -> Option<Self> {
        let first = docs.first()?.score;
        let (min, max) = docs.iter().fold((first, first), |(lo, hi), doc| {
            (lo.min(doc.score), hi.max(doc.score))
        });
        Some(Self { min, max })
    }

    /// Every score in the range is identical.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }

    /// Rescale one score from this range under `mode`.
    ///
    /// Degenerate ranges leave the score unchanged.
    #[must_use]
    pub fn apply(&self, score: f64, mode: NormalizeMode) -> f64 {
        if self.is_degenerate() {
            return score;
        }
        match mode {
            NormalizeMode::None => score,
            NormalizeMode::MinMaxCentered => {
                (score - (self.min + self.max) / 2.0) / (self.max - self.min)
            }
        }
    }
}

/// Rescale `list` under `mode`, keeping docids and order.
#[must_use]
pub fn normalize(list: &RankedList, mode: NormalizeMode) -> RankedList {
    let Some(range) = ScoreRange::of(list.docs()) else {
        return list.clone();
    };
    if mode == NormalizeMode::None || range.is_degenerate() {
        return list.clone();
    }

    RankedList::from_ranked(
        list.iter()
            .map(|doc| ScoredDocument::new(doc.docid.clone(), range.apply(doc.score, mode)))
            .collect(),
    )
}

//! Retrieved hits and the ranked lists that carry them.
//!
//! A [`RankedList`] is the unit the fusion engine consumes: hits in source
//! order, `rank == index + 1`, at most one hit per line id.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Which retrieval method produced a ranked list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalSource {
    /// Boosted phrase/term matching.
    Lexical,
    /// Learned sparse term expansion.
    SparseSemantic,
    /// Dense embedding similarity.
    DenseSemantic,
}

impl RetrievalSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::SparseSemantic => "sparse_semantic",
            Self::DenseSemantic => "dense_semantic",
        }
    }
}

impl fmt::Display for RetrievalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrieved play line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Corpus line id; unique and stable.
    pub line_id: u64,
    /// 1-based position in the source ranking.
    pub rank: usize,
    /// Engine score. Not comparable across sources.
    pub source_score: f64,
    pub play_name: String,
    pub speaker: String,
    pub text_entry: String,
    /// Document type (`line`, `act`, `scene`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Highlighted excerpts; falls back to the raw text when the engine
    /// returned none.
    pub highlight: Vec<String>,
}

/// Hits from a single retrieval method, best first.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedList {
    source: RetrievalSource,
    hits: Vec<Hit>,
}

impl RankedList {
    /// Empty list for `source`.
    #[must_use]
    pub const fn empty(source: RetrievalSource) -> Self {
        Self {
            source,
            hits: Vec::new(),
        }
    }

    /// Build a list from hits in ranking order.
    ///
    /// Ranks are renumbered from 1. If a line id repeats, only its first
    /// (best-ranked) occurrence is kept.
    #[must_use]
    pub fn from_hits(source: RetrievalSource, hits: Vec<Hit>) -> Self {
        let mut seen = HashSet::with_capacity(hits.len());
        let mut kept = Vec::with_capacity(hits.len());

        for mut hit in hits {
            if !seen.insert(hit.line_id) {
                debug!(
                    source = %source,
                    line_id = hit.line_id,
                    "dropping duplicate hit from ranked list"
                );
                continue;
            }
            hit.rank = kept.len() + 1;
            kept.push(hit);
        }

        Self { source, hits: kept }
    }

    #[must_use]
    pub const fn source(&self) -> RetrievalSource {
        self.source
    }

    #[must_use]
    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Hit> {
        self.hits.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// 1-based rank of `line_id`, if present.
    #[must_use]
    pub fn rank_of(&self, line_id: u64) -> Option<usize> {
        self.hits
            .iter()
            .position(|hit| hit.line_id == line_id)
            .map(|idx| idx + 1)
    }

    /// Hit carrying `line_id`, if present.
    #[must_use]
    pub fn get(&self, line_id: u64) -> Option<&Hit> {
        self.hits.iter().find(|hit| hit.line_id == line_id)
    }
}

impl<'a> IntoIterator for &'a RankedList {
    type Item = &'a Hit;
    type IntoIter = std::slice::Iter<'a, Hit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}

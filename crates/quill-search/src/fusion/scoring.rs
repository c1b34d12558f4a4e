//! Reciprocal Rank Fusion (RRF) over a lexical and a dense-semantic ranking.
//!
//! # Algorithm Overview
//!
//! Each hit contributes to its line id's fused score based on its position in
//! each list:
//!
//! ```text
//! RRF score = sum over all lists of: 1 / (k + rank_in_list)
//! ```
//!
//! Where:
//! - `k` is the rank constant (default 60) that damps the lead of top ranks.
//! - Ranks are 1-based; a line id absent from a list contributes 0 for it.
//! - Only the first `candidate_depth` hits of each list take part.
//!
//! # Ordering
//!
//! Results are sorted by the composite key
//!
//! ```text
//! (score desc, lexical_rank asc, semantic_rank asc, line_id asc)
//! ```
//!
//! with an absent rank sorting after every present one, so equal inputs
//! always produce the same order and pages never overlap.
//!
//! # Example
//!
//! ```
//! use quill_core::model::{Hit, RankedList, RetrievalSource};
//! use quill_search::fusion::scoring::{FusionConfig, fuse};
//!
//! let hit = |line_id| Hit {
//!     line_id,
//!     rank: 0,
//!     source_score: 0.0,
//!     play_name: "Hamlet".into(),
//!     speaker: "HAMLET".into(),
//!     text_entry: String::new(),
//!     kind: "line".into(),
//!     highlight: vec![],
//! };
//!
//! let lexical = RankedList::from_hits(RetrievalSource::Lexical, vec![hit(1), hit(2)]);
//! let dense = RankedList::from_hits(RetrievalSource::DenseSemantic, vec![hit(2)]);
//!
//! let fused = fuse(&lexical, Some(&dense), &FusionConfig::default()).unwrap();
//! assert_eq!(fused.hits[0].hit.line_id, 2);
//! assert_eq!(fused.total, 2);
//! ```

use quill_core::SearchError;
use quill_core::config::FusionSettings;
use quill_core::model::{DEFAULT_PAGE_SIZE, Hit, HitView, RankedList};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Parameters for one fusion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// RRF constant `k`; must be positive and finite.
    pub rank_constant: f64,
    /// Hits taken from the top of each list before fusing.
    pub candidate_depth: usize,
    /// First fused position returned.
    pub page_offset: usize,
    /// Number of fused positions returned.
    pub page_size: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self::from_settings(&FusionSettings::default(), 0, DEFAULT_PAGE_SIZE)
    }
}

impl FusionConfig {
    /// Combine configured fusion settings with a requested page.
    #[must_use]
    pub const fn from_settings(
        settings: &FusionSettings,
        page_offset: usize,
        page_size: usize,
    ) -> Self {
        Self {
            rank_constant: settings.rank_constant,
            candidate_depth: settings.candidate_depth,
            page_offset,
            page_size,
        }
    }

    /// Check every parameter is in range.
    ///
    /// # Errors
    ///
    /// [`SearchError::InvalidConfig`] when `rank_constant <= 0` or is not
    /// finite, or when `candidate_depth` or `page_size` is zero.
    pub fn validate(&self) -> Result<(), SearchError> {
        if !self.rank_constant.is_finite() || self.rank_constant <= 0.0 {
            return Err(SearchError::InvalidConfig(format!(
                "rank_constant must be a positive number, got {}",
                self.rank_constant
            )));
        }
        if self.candidate_depth == 0 {
            return Err(SearchError::InvalidConfig(
                "candidate_depth must be > 0".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(SearchError::InvalidConfig(
                "page_size must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Score contributed by a hit at 1-based `rank`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rrf_contribution(rank: usize, rank_constant: f64) -> f64 {
    1.0 / (rank as f64 + rank_constant)
}

/// One line id's fused score with its per-source ranks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusedEntry {
    pub line_id: u64,
    pub score: f64,
    pub lexical_rank: Option<usize>,
    pub semantic_rank: Option<usize>,
}

/// A fused result row: the display payload plus its scoring breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
    /// Payload from the lexical hit when present, else the semantic hit.
    pub hit: Hit,
    pub score: f64,
    pub lexical_rank: Option<usize>,
    pub semantic_rank: Option<usize>,
}

impl From<&FusedHit> for HitView {
    fn from(fused: &FusedHit) -> Self {
        Self {
            score: Some(fused.score),
            lexical_rank: fused.lexical_rank,
            semantic_rank: fused.semantic_rank,
            ..Self::from(&fused.hit)
        }
    }
}

/// A page of fused results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FusedResult {
    /// Distinct line ids across both lists (within candidate depth).
    pub total: usize,
    /// The requested page in display order.
    pub hits: Vec<FusedHit>,
}

impl FusedResult {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Full fused order, unpaginated.
///
/// # Errors
///
/// [`SearchError::InvalidConfig`] if `config` fails validation.
pub fn fused_order(
    lexical: &RankedList,
    semantic: Option<&RankedList>,
    config: &FusionConfig,
) -> Result<Vec<FusedEntry>, SearchError> {
    config.validate()?;

    let mut scores: BTreeMap<u64, FusedEntry> = BTreeMap::new();

    for hit in lexical.iter().take(config.candidate_depth) {
        let contribution = rrf_contribution(hit.rank, config.rank_constant);
        let entry = scores.entry(hit.line_id).or_insert_with(|| empty_entry(hit.line_id));
        entry.score += contribution;
        entry.lexical_rank = Some(hit.rank);
    }

    if let Some(semantic) = semantic {
        for hit in semantic.iter().take(config.candidate_depth) {
            let contribution = rrf_contribution(hit.rank, config.rank_constant);
            let entry = scores.entry(hit.line_id).or_insert_with(|| empty_entry(hit.line_id));
            entry.score += contribution;
            entry.semantic_rank = Some(hit.rank);
        }
    }

    let mut order: Vec<FusedEntry> = scores.into_values().collect();
    order.sort_by(compare_entries);
    Ok(order)
}

/// Fuse a lexical and an optional dense-semantic ranking into one page.
///
/// A missing semantic list behaves exactly like an empty one.
///
/// # Errors
///
/// [`SearchError::InvalidConfig`] if `config` fails validation.
pub fn fuse(
    lexical: &RankedList,
    semantic: Option<&RankedList>,
    config: &FusionConfig,
) -> Result<FusedResult, SearchError> {
    let order = fused_order(lexical, semantic, config)?;
    let total = order.len();

    let lexical_hits = payload_index(lexical, config.candidate_depth);
    let semantic_hits = semantic
        .map(|list| payload_index(list, config.candidate_depth))
        .unwrap_or_default();

    let hits = order
        .into_iter()
        .skip(config.page_offset)
        .take(config.page_size)
        .filter_map(|entry| {
            let hit = lexical_hits
                .get(&entry.line_id)
                .or_else(|| semantic_hits.get(&entry.line_id))?;
            Some(FusedHit {
                hit: (*hit).clone(),
                score: entry.score,
                lexical_rank: entry.lexical_rank,
                semantic_rank: entry.semantic_rank,
            })
        })
        .collect();

    Ok(FusedResult { total, hits })
}

const fn empty_entry(line_id: u64) -> FusedEntry {
    FusedEntry {
        line_id,
        score: 0.0,
        lexical_rank: None,
        semantic_rank: None,
    }
}

fn payload_index(list: &RankedList, depth: usize) -> HashMap<u64, &Hit> {
    list.iter().take(depth).map(|hit| (hit.line_id, hit)).collect()
}

fn compare_entries(a: &FusedEntry, b: &FusedEntry) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| rank_key(a.lexical_rank).cmp(&rank_key(b.lexical_rank)))
        .then_with(|| rank_key(a.semantic_rank).cmp(&rank_key(b.semantic_rank)))
        .then_with(|| a.line_id.cmp(&b.line_id))
}

fn rank_key(rank: Option<usize>) -> usize {
    rank.unwrap_or(usize::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

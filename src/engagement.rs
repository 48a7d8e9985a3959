//! Chunked engagement analysis: the map-reduce driver over the core.

use std::io::BufRead;

use indexmap::IndexMap;

use crate::{
    aggregate::{Aggregate, AggregateError, PartialState},
    chunk::{self, LoadError},
    collection::Collection,
    value::GroupKey,
};

/// Errors raised by the chunked engagement computation.
#[derive(Debug)]
pub enum EngagementError {
    Load(LoadError),
    Aggregate(AggregateError),
}

impl std::fmt::Display for EngagementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngagementError::Load(e) => write!(f, "load failed: {}", e),
            EngagementError::Aggregate(e) => write!(f, "aggregation failed: {}", e),
        }
    }
}

impl std::error::Error for EngagementError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngagementError::Load(e) => Some(e),
            EngagementError::Aggregate(e) => Some(e),
        }
    }
}

impl From<LoadError> for EngagementError {
    fn from(e: LoadError) -> Self {
        EngagementError::Load(e)
    }
}

impl From<AggregateError> for EngagementError {
    fn from(e: AggregateError) -> Self {
        EngagementError::Aggregate(e)
    }
}

/// Per-group engagement totals.
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementStats {
    /// Documents seen in the group
    pub total_count: i64,
    /// Sum of the interaction counters divided by the count; 0 when the
    /// count is 0
    pub average_ratio: f64,
}

/// Computes a grouped engagement ratio across arbitrarily many chunks.
///
/// Per chunk this runs one grouped count and one grouped sum per
/// interaction field, then folds each into a running accumulator with the
/// partial-aggregate merge operators. Only the accumulators are retained
/// between chunks, so the result is identical (up to floating-point
/// rounding) for any chunk size.
#[derive(Debug, Clone)]
pub struct EngagementAnalyzer {
    group_field: String,
    interaction_fields: Vec<String>,
    chunk_size: usize,
}

impl EngagementAnalyzer {
    /// Analyzer over the default dataset fields, grouped by `ip_location`
    /// with `reposts_count`, `comments_count` and `attitudes_count` as the
    /// interaction counters.
    pub fn new(chunk_size: usize) -> Self {
        EngagementAnalyzer {
            group_field: "ip_location".to_string(),
            interaction_fields: vec![
                "reposts_count".to_string(),
                "comments_count".to_string(),
                "attitudes_count".to_string(),
            ],
            chunk_size,
        }
    }

    /// Override the grouping field.
    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.group_field = field.into();
        self
    }

    /// Override the interaction counter fields.
    pub fn interactions(mut self, fields: Vec<String>) -> Self {
        self.interaction_fields = fields;
        self
    }

    /// Stream `reader`, fold per-chunk aggregates, and derive the final
    /// ratios.
    ///
    /// A failure on any chunk aborts the whole computation; nothing is
    /// skipped.
    pub fn analyze<R: BufRead>(
        &self,
        reader: R,
    ) -> Result<IndexMap<GroupKey, EngagementStats>, EngagementError> {
        let count_agg = Aggregate::Count;
        let sum_aggs: Vec<Aggregate> = self
            .interaction_fields
            .iter()
            .map(|f| Aggregate::Sum(f.clone()))
            .collect();

        let mut counts: IndexMap<GroupKey, PartialState> = IndexMap::new();
        let mut sums: Vec<IndexMap<GroupKey, PartialState>> =
            vec![IndexMap::new(); sum_aggs.len()];

        for chunk in chunk::load_chunks(reader, self.chunk_size)? {
            let coll = Collection::from_documents(chunk?);

            merge_into(&mut counts, coll.aggregate_partial(&self.group_field, &count_agg)?)?;
            for (acc, agg) in sums.iter_mut().zip(&sum_aggs) {
                merge_into(acc, coll.aggregate_partial(&self.group_field, agg)?)?;
            }
        }

        let mut report = IndexMap::new();
        for (key, state) in counts {
            let PartialState::Count(total_count) = state else {
                continue;
            };
            let mut interactions = 0.0;
            for acc in &sums {
                if let Some(PartialState::Sum(sum)) = acc.get(&key)
                    && let Some(x) = sum.value().as_f64()
                {
                    interactions += x;
                }
            }
            let average_ratio = if total_count > 0 {
                interactions / total_count as f64
            } else {
                0.0
            };
            report.insert(
                key,
                EngagementStats {
                    total_count,
                    average_ratio,
                },
            );
        }
        Ok(report)
    }
}

/// Fold one chunk's grouped partial states into the running accumulator.
fn merge_into(
    acc: &mut IndexMap<GroupKey, PartialState>,
    chunk_states: IndexMap<GroupKey, PartialState>,
) -> Result<(), AggregateError> {
    for (key, state) in chunk_states {
        if let Some(existing) = acc.get_mut(&key) {
            let merged = existing.clone().merge(state)?;
            *existing = merged;
        } else {
            acc.insert(key, state);
        }
    }
    Ok(())
}

/// Grouped engagement ratios with the default field set.
///
/// See [`EngagementAnalyzer`] for the per-chunk fold this performs.
pub fn compute_engagement_by_location<R: BufRead>(
    reader: R,
    chunk_size: usize,
) -> Result<IndexMap<GroupKey, EngagementStats>, EngagementError> {
    EngagementAnalyzer::new(chunk_size).analyze(reader)
}

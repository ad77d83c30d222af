use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::resolver::{LocalityQuery, MatchSource};

/// Per-strategy slice of the batch outcome.
#[derive(Debug, Clone, Serialize)]
pub struct SourceBreakdown {
    pub source: &'static str,
    pub count: usize,
    pub percent: f64,
}

/// Batch-level summary of a resolution run: totals, per-strategy counts in
/// cascade order, and the records that need manual follow-up. A read over
/// already-resolved queries; performs no matching itself.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReport {
    pub total: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub by_source: Vec<SourceBreakdown>,
    pub unresolved_records: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl ResolutionReport {
    pub fn from_queries(queries: &[LocalityQuery]) -> Self {
        let total = queries.len();
        let mut by_source = Vec::with_capacity(MatchSource::CASCADE.len());
        for source in MatchSource::CASCADE {
            let count = queries.iter().filter(|q| q.match_source == source).count();
            by_source.push(SourceBreakdown {
                source: source.as_tag(),
                count,
                percent: percent_of(count, total),
            });
        }

        let unresolved_records: Vec<String> = queries
            .iter()
            .filter(|q| q.match_source == MatchSource::Unresolved)
            .map(|q| q.record_id.clone())
            .collect();
        let unresolved = unresolved_records.len();

        Self {
            total,
            resolved: total - unresolved,
            unresolved,
            by_source,
            unresolved_records,
            generated_at: Utc::now(),
        }
    }

    pub fn resolved_percent(&self) -> f64 {
        percent_of(self.resolved, self.total)
    }
}

fn percent_of(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

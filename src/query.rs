//! Query pipeline: filter a record set, then order it.
//!
//! `compute_results` holds no state of its own. Callers own the query and
//! filter state and re-run the pipeline whenever any of it changes; equal
//! inputs always give the same sequence.

use crate::predicate::{record_matches, RemarkFilter, StatusFilters};
use crate::record::FileRecord;
use crate::sort::{sort_records, SortOrder};

/// Filter `records` by query, status and remark, then sort them.
pub fn compute_results<'a>(
    records: &'a [FileRecord],
    query: &str,
    status_filters: &StatusFilters,
    remark_filter: RemarkFilter,
    sort_order: SortOrder,
) -> Vec<&'a FileRecord> {
    let mut results: Vec<&FileRecord> = records
        .iter()
        .filter(|r| record_matches(r, query, status_filters, remark_filter))
        .collect();
    sort_records(&mut results, sort_order);
    results
}

/// The caller-owned search state fed to `compute_results`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    pub query: String,
    pub status: StatusFilters,
    pub remark: RemarkFilter,
    pub order: SortOrder,
}

impl QueryState {
    pub fn apply<'a>(&self, records: &'a [FileRecord]) -> Vec<&'a FileRecord> {
        compute_results(records, &self.query, &self.status, self.remark, self.order)
    }

    /// Active status keys plus one for a non-`All` remark filter.
    pub fn active_filter_count(&self) -> usize {
        self.status.active_count() + usize::from(self.remark != RemarkFilter::All)
    }

    /// Reset status and remark filters; the query and sort order are kept.
    pub fn clear_filters(&mut self) {
        self.status = StatusFilters::default();
        self.remark = RemarkFilter::All;
    }
}

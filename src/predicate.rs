//! Record predicates: query match, status presence and remark classification.
//!
//! A record is kept by the query pipeline iff all three predicates hold.
//! Sub-files are never filtered on their own; a hit on any sub-file keeps
//! the whole parent.

use crate::record::{FileRecord, StatusKey};
use std::fmt;
use std::str::FromStr;

/// True if `value` is non-empty after trimming.
pub fn is_set(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Case-insensitive substring test. `needle_lower` must already be lowercase.
pub fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// True if the query is empty, or if `file_no`, `file_name` or any sub-file
/// name contains it, ignoring case.
pub fn matches_query(record: &FileRecord, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    contains_ci(&record.file_no, &needle)
        || contains_ci(&record.file_name, &needle)
        || record.sub_file_names().any(|name| contains_ci(name, &needle))
}

/// True if the parent or any sub-file has the given status set.
pub fn has_status(record: &FileRecord, key: StatusKey) -> bool {
    is_set(record.status(key)) || record.sub_files.iter().any(|s| is_set(s.status(key)))
}

/// Status checkboxes. Active keys are combined with AND: a record must show
/// every selected status somewhere in its hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StatusFilters {
    pub current: bool,
    pub record: bool,
    pub completed: bool,
}

impl StatusFilters {
    pub fn is_active(&self, key: StatusKey) -> bool {
        match key {
            StatusKey::Current => self.current,
            StatusKey::Record => self.record,
            StatusKey::Completed => self.completed,
        }
    }

    pub fn toggle(&mut self, key: StatusKey) {
        match key {
            StatusKey::Current => self.current = !self.current,
            StatusKey::Record => self.record = !self.record,
            StatusKey::Completed => self.completed = !self.completed,
        }
    }

    pub fn active(&self) -> impl Iterator<Item = StatusKey> + '_ {
        StatusKey::ALL.into_iter().filter(|k| self.is_active(*k))
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    /// No active key passes every record.
    pub fn matches(&self, record: &FileRecord) -> bool {
        self.active().all(|key| has_status(record, key))
    }
}

/// Classification of the remark (and cancellation marker) of a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum RemarkFilter {
    #[default]
    All,
    /// Parent or any sub-file has a remark.
    Has,
    /// Nothing in the hierarchy has a remark.
    None,
    /// "cancel" appears in a remark or completed field.
    Cancel,
}

impl RemarkFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            RemarkFilter::All => "all",
            RemarkFilter::Has => "has",
            RemarkFilter::None => "none",
            RemarkFilter::Cancel => "cancel",
        }
    }
}

impl fmt::Display for RemarkFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemarkFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(RemarkFilter::All),
            "has" => Ok(RemarkFilter::Has),
            "none" => Ok(RemarkFilter::None),
            "cancel" => Ok(RemarkFilter::Cancel),
            other => Err(anyhow::anyhow!("Unknown remark filter '{}'", other)),
        }
    }
}

const CANCEL_MARKER: &str = "cancel";

fn has_any_remark(record: &FileRecord) -> bool {
    is_set(&record.remark) || record.sub_files.iter().any(|s| is_set(&s.remark))
}

fn is_cancelled(record: &FileRecord) -> bool {
    let cancelled = |remark: &str, completed: &str| {
        contains_ci(remark, CANCEL_MARKER) || contains_ci(completed, CANCEL_MARKER)
    };

    cancelled(&record.remark, &record.completed)
        || record
            .sub_files
            .iter()
            .any(|s| cancelled(&s.remark, &s.completed))
}

pub fn remark_matches(record: &FileRecord, filter: RemarkFilter) -> bool {
    match filter {
        RemarkFilter::All => true,
        RemarkFilter::Has => has_any_remark(record),
        RemarkFilter::None => !has_any_remark(record),
        RemarkFilter::Cancel => is_cancelled(record),
    }
}

/// All three predicates combined.
pub fn record_matches(
    record: &FileRecord,
    query: &str,
    status: &StatusFilters,
    remark: RemarkFilter,
) -> bool {
    matches_query(record, query) && status.matches(record) && remark_matches(record, remark)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SubFile;

    fn sample() -> FileRecord {
        let mut record = FileRecord::new("A-101", "Roof Plan");
        record.sub_files = vec![
            SubFile {
                name: "North Elevation".to_string(),
                record: "R2".to_string(),
                ..SubFile::default()
            },
            SubFile {
                name: "Drainage".to_string(),
                completed: "CANCELLED by client".to_string(),
                ..SubFile::default()
            },
        ];
        record
    }

    #[test]
    fn test_matches_query_sources() {
        let record = sample();
        assert!(matches_query(&record, ""));
        assert!(matches_query(&record, "   "));
        assert!(matches_query(&record, "a-10"));
        assert!(matches_query(&record, "ROOF"));
        assert!(matches_query(&record, "elevation"));
        assert!(matches_query(&record, "  drain "));
        assert!(!matches_query(&record, "basement"));
    }

    #[test]
    fn test_has_status_checks_sub_files() {
        let mut record = sample();
        record.current = "  ".to_string();

        assert!(!has_status(&record, StatusKey::Current));
        assert!(has_status(&record, StatusKey::Record));
        assert!(has_status(&record, StatusKey::Completed));

        record.current = "yes".to_string();
        assert!(has_status(&record, StatusKey::Current));
    }

    #[test]
    fn test_status_filters_and_policy() {
        let record = sample();

        let none = StatusFilters::default();
        assert!(none.matches(&record));
        assert_eq!(none.active_count(), 0);

        let mut filters = StatusFilters::default();
        filters.toggle(StatusKey::Record);
        filters.toggle(StatusKey::Completed);
        assert!(filters.matches(&record));
        assert_eq!(filters.active_count(), 2);

        filters.toggle(StatusKey::Current);
        assert!(!filters.matches(&record), "every active key must be present");

        filters.toggle(StatusKey::Current);
        assert!(!filters.current);
        assert!(filters.matches(&record));
    }

    #[test]
    fn test_remark_classification() {
        let plain = FileRecord::new("B1", "Plain");
        assert!(remark_matches(&plain, RemarkFilter::All));
        assert!(!remark_matches(&plain, RemarkFilter::Has));
        assert!(remark_matches(&plain, RemarkFilter::None));
        assert!(!remark_matches(&plain, RemarkFilter::Cancel));

        let mut sub_remark = FileRecord::new("B2", "Sub remark");
        sub_remark.sub_files.push(SubFile {
            name: "Sheet".to_string(),
            remark: "check dims".to_string(),
            ..SubFile::default()
        });
        assert!(remark_matches(&sub_remark, RemarkFilter::Has));
        assert!(!remark_matches(&sub_remark, RemarkFilter::None));

        assert!(remark_matches(&sample(), RemarkFilter::Cancel));

        let mut parent_cancel = FileRecord::new("B3", "");
        parent_cancel.remark = "Cancel pending".to_string();
        assert!(remark_matches(&parent_cancel, RemarkFilter::Cancel));
    }

    #[test]
    fn test_has_is_negation_of_none() {
        let mut blank_remark = FileRecord::new("C1", "x");
        blank_remark.remark = "   ".to_string();

        for record in [sample(), blank_remark, FileRecord::default()] {
            assert_eq!(
                remark_matches(&record, RemarkFilter::Has),
                !remark_matches(&record, RemarkFilter::None)
            );
        }
    }

    #[test]
    fn test_remark_filter_parse() {
        assert_eq!("has".parse::<RemarkFilter>().unwrap(), RemarkFilter::Has);
        assert_eq!(" Cancel ".parse::<RemarkFilter>().unwrap(), RemarkFilter::Cancel);
        assert!("maybe".parse::<RemarkFilter>().is_err());
        assert_eq!(RemarkFilter::None.to_string(), "none");
    }

    #[test]
    fn test_record_matches_combines_all() {
        let record = sample();
        let mut status = StatusFilters::default();
        status.record = true;

        assert!(record_matches(&record, "roof", &status, RemarkFilter::Cancel));
        assert!(!record_matches(&record, "roof", &status, RemarkFilter::Has));
        assert!(!record_matches(&record, "missing", &status, RemarkFilter::All));
    }
}

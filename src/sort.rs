//! Result ordering: by file name, then file number.

use crate::record::FileRecord;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Direction of the file-name axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(anyhow::anyhow!("Unknown sort order '{}'", other)),
        }
    }
}

/// Compare two records for display.
///
/// Names compare case-insensitively in the given direction. A blank name is
/// always placed at the far end of the name axis: after every named record
/// when ascending, before them when descending. Ties fall back to `file_no`,
/// case-insensitive and always ascending.
pub fn compare_records(a: &FileRecord, b: &FileRecord, order: SortOrder) -> Ordering {
    let an = a.file_name.trim().to_lowercase();
    let bn = b.file_name.trim().to_lowercase();

    let by_name = match (an.is_empty(), bn.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => an.cmp(&bn),
    };
    let by_name = match order {
        SortOrder::Asc => by_name,
        SortOrder::Desc => by_name.reverse(),
    };

    by_name.then_with(|| a.file_no.to_lowercase().cmp(&b.file_no.to_lowercase()))
}

/// Stable in-place sort; records with equal keys keep their input order.
pub fn sort_records(records: &mut [&FileRecord], order: SortOrder) {
    records.sort_by(|a, b| compare_records(a, b, order));
}

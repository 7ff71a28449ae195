//! File Registry
//!
//! A searchable registry of hierarchical file records: a parent file with
//! zero or more named sub-files, each carrying `current`/`record`/`completed`
//! status markers and a free-text remark.
//!
//! This library provides:
//! - `record`: File Record and Sub-File types, natural key, boundary normalization
//! - `predicate`: query, status and remark filters
//! - `sort`: the name/number ordering used for result lists
//! - `query`: the filter -> sort pipeline over a full record set
//! - `import`: bulk-import reconciliation of flat tabular rows
//! - `store`, `sqlite`: storage collaborator trait and its implementations
//! - `pipeline`: CSV import/export for programmatic use by the CLI
//!
//! Binaries:
//! - `file-registry`: search, import, export and edit records in a SQLite registry

pub mod import;
pub mod pipeline;
pub mod predicate;
pub mod query;
pub mod record;
pub mod sort;
pub mod sqlite;
pub mod store;

pub use import::{import_rows, ImportError, ImportOutcome, ImportReport, ImportRow};
pub use predicate::{RemarkFilter, StatusFilters};
pub use query::{compute_results, QueryState};
pub use record::{FileKey, FileRecord, StatusKey, SubFile};
pub use sort::SortOrder;
pub use sqlite::SqliteStore;
pub use store::{FileStore, MemoryStore};

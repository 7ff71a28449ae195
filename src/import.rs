//! Bulk-import reconciliation of flat tabular rows.
//!
//! A feed lists parents and their sub-files as consecutive rows: a row with a
//! `file_no` opens a parent, and following rows with only a `file_name` are
//! its sub-files. Import runs in two phases:
//!
//! 1. [`plan_import`] groups the rows and checks every parent against storage
//!    for an existing `(file_no, file_name)` pair.
//! 2. [`ImportPlan::persist`] inserts each new parent on its own; a failed
//!    insert is recorded and the rest still go through.
//!
//! Running two imports against the same storage at once is not supported:
//! the duplicate check of one run does not see the other run's inserts.

use crate::record::{FileKey, FileRecord, SubFile};
use crate::store::FileStore;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;

/// One row of the tabular feed, keyed by normalized column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportRow {
    pub file_no: Option<String>,
    pub file_name: Option<String>,
    pub current: Option<String>,
    pub record: Option<String>,
    pub completed: Option<String>,
    pub remark: Option<String>,
}

impl ImportRow {
    /// Row that opens a parent.
    pub fn parent(file_no: &str, file_name: Option<&str>) -> Self {
        Self {
            file_no: Some(file_no.to_string()),
            file_name: file_name.map(str::to_string),
            ..Self::default()
        }
    }

    /// Row that names a sub-file of the open parent.
    pub fn sub_file(name: &str) -> Self {
        Self {
            file_name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn with_remark(mut self, remark: &str) -> Self {
        self.remark = Some(remark.to_string());
        self
    }
}

/// Trimmed value, or `None` when missing or blank.
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn field(value: &Option<String>) -> String {
    non_blank(value).unwrap_or_default().to_string()
}

/// Result of phase 1: the parents to insert plus the grouping tallies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportPlan {
    pub candidates: Vec<FileRecord>,
    pub skipped_duplicate_parents: usize,
    pub orphan_subfile_rows: usize,
    pub accepted_subfile_rows: usize,
}

/// Group `rows` into new parent records, skipping parents already in `store`.
///
/// Sub-file rows following a skipped duplicate are counted as orphans rather
/// than attached to an earlier parent. Rows with neither `file_no` nor
/// `file_name` are ignored. A failing storage lookup aborts the whole import.
pub fn plan_import<S: FileStore + ?Sized>(rows: &[ImportRow], store: &S) -> Result<ImportPlan> {
    let mut plan = ImportPlan::default();
    let mut open_parent: Option<usize> = None;

    for row in rows {
        if let Some(file_no) = non_blank(&row.file_no) {
            let key = FileKey::new(file_no, non_blank(&row.file_name));
            let existing = store
                .find_by_key(&key)
                .with_context(|| format!("Duplicate check failed for {}", key))?;

            if existing.is_some() {
                log::warn!("Skipping duplicate record: {}", key);
                plan.skipped_duplicate_parents += 1;
                open_parent = None;
                continue;
            }

            plan.candidates.push(FileRecord {
                id: None,
                file_no: key.file_no,
                file_name: key.file_name.unwrap_or_default(),
                current: field(&row.current),
                record: field(&row.record),
                completed: field(&row.completed),
                remark: field(&row.remark),
                sub_files: Vec::new(),
            });
            open_parent = Some(plan.candidates.len() - 1);
        } else if let Some(name) = non_blank(&row.file_name) {
            let Some(idx) = open_parent else {
                log::warn!(
                    "Skipping orphan sub-file (no valid parent found recently): {}",
                    name
                );
                plan.orphan_subfile_rows += 1;
                continue;
            };

            let sub = SubFile {
                name: name.to_string(),
                current: field(&row.current),
                record: field(&row.record),
                completed: field(&row.completed),
                remark: field(&row.remark),
            };
            if sub.is_valid() {
                plan.candidates[idx].sub_files.push(sub);
                plan.accepted_subfile_rows += 1;
            } else {
                log::warn!("Skipping empty sub-file row: {:?}", row);
            }
        }
    }

    Ok(plan)
}

/// A failed insert of one parent candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportError {
    pub file_no: String,
    pub message: String,
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File No {}: {}", self.file_no, self.message)
    }
}

/// Overall classification of an import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// No insert failed.
    Success,
    /// Some inserts failed, at least one succeeded.
    PartialSuccess,
    /// Some inserts failed and none succeeded.
    Failure,
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImportOutcome::Success => "success",
            ImportOutcome::PartialSuccess => "partial success",
            ImportOutcome::Failure => "failure",
        })
    }
}

/// Tallies of both phases plus the per-parent insert errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// New parent candidates found in phase 1.
    pub accepted_parents: usize,
    /// Candidates actually stored in phase 2.
    pub inserted: usize,
    pub skipped_duplicate_parents: usize,
    pub orphan_subfile_rows: usize,
    pub accepted_subfile_rows: usize,
    pub errors: Vec<ImportError>,
}

impl ImportReport {
    pub fn outcome(&self) -> ImportOutcome {
        if self.errors.is_empty() {
            ImportOutcome::Success
        } else if self.inserted > 0 {
            ImportOutcome::PartialSuccess
        } else {
            ImportOutcome::Failure
        }
    }

    /// Human-readable tally, rendered in full whatever the outcome.
    pub fn summary(&self) -> String {
        format!(
            "Import processed ({}):\n  New parent records added: {} of {}\n  Sub-file rows attached: {}\n  Skipped existing parent records: {}\n  Skipped orphan sub-file rows: {}\n  Insertion errors: {}",
            self.outcome(),
            self.inserted,
            self.accepted_parents,
            self.accepted_subfile_rows,
            self.skipped_duplicate_parents,
            self.orphan_subfile_rows,
            self.errors.len()
        )
    }
}

impl ImportPlan {
    /// Insert every candidate. Failures are collected, never fatal.
    pub fn persist<S: FileStore + ?Sized>(self, store: &mut S) -> ImportReport {
        log::info!(
            "Attempting to insert {} new parent records...",
            self.candidates.len()
        );

        let mut report = ImportReport {
            accepted_parents: self.candidates.len(),
            skipped_duplicate_parents: self.skipped_duplicate_parents,
            orphan_subfile_rows: self.orphan_subfile_rows,
            accepted_subfile_rows: self.accepted_subfile_rows,
            ..ImportReport::default()
        };

        for parent in &self.candidates {
            match store.insert(parent) {
                Ok(_) => report.inserted += 1,
                Err(e) => {
                    log::error!("Error inserting new parent file_no {}: {:#}", parent.file_no, e);
                    report.errors.push(ImportError {
                        file_no: parent.file_no.clone(),
                        message: format!("{:#}", e),
                    });
                }
            }
        }

        log::info!(
            "Import finished. Inserted: {}, Skipped Existing Parents: {}, Skipped Orphan Sub-files: {}, Processed Sub-files: {}",
            report.inserted,
            report.skipped_duplicate_parents,
            report.orphan_subfile_rows,
            report.accepted_subfile_rows
        );
        report
    }
}

/// Run both import phases against `store`.
pub fn import_rows<S: FileStore + ?Sized>(rows: &[ImportRow], store: &mut S) -> Result<ImportReport> {
    log::info!("Processing {} rows for import...", rows.len());
    let plan = plan_import(rows, store)?;
    Ok(plan.persist(store))
}

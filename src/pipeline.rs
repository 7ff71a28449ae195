//! Pipeline functions for programmatic use by the CLI.
//!
//! CSV is the registry's exchange format. Exports write one row per parent
//! followed by one row per sub-file with a blank `FILE NO`, which is exactly
//! the layout the importer groups back into parents.

use crate::import::{import_rows, ImportReport, ImportRow};
use crate::record::FileRecord;
use crate::store::FileStore;
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use lazy_static::lazy_static;
use regex::Regex;
use std::io::{Read, Write};
use std::path::Path;

/// Column headers written by exports, in order.
pub const EXPORT_HEADERS: [&str; 6] = [
    "FILE NO",
    "FILE NAME",
    "CURRENT",
    "RECORD",
    "COMPLETED",
    "REMARK",
];

// ============================================================================
// Import
// ============================================================================

/// Normalize a CSV header: `" File  No "` becomes `file_no`.
pub fn normalize_header(header: &str) -> String {
    lazy_static! {
        static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    }

    let lower = header.trim_start_matches('\u{feff}').trim().to_lowercase();
    WHITESPACE.replace_all(&lower, "_").into_owned()
}

/// Parse CSV text into import rows.
///
/// Headers are normalized with [`normalize_header`]; unknown columns are
/// ignored and missing ones read as `None`. At least one of `file_no` and
/// `file_name` must be present.
pub fn read_import_rows<R: Read>(input: R) -> Result<Vec<ImportRow>> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(input);
    let headers: Vec<String> = reader
        .byte_headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| normalize_header(&String::from_utf8_lossy(h)))
        .collect();

    let find_col = |name: &str| headers.iter().position(|h| h == name);
    let file_no_col = find_col("file_no");
    let file_name_col = find_col("file_name");
    let current_col = find_col("current");
    let record_col = find_col("record");
    let completed_col = find_col("completed");
    let remark_col = find_col("remark");

    if file_no_col.is_none() && file_name_col.is_none() {
        return Err(anyhow::anyhow!(
            "CSV has neither a 'FILE NO' nor a 'FILE NAME' column"
        ));
    }

    let mut rows = Vec::new();
    // Cells are decoded lossily so one badly-encoded value cannot sink the batch.
    for (row_num, result) in reader.byte_records().enumerate() {
        let record = result.with_context(|| format!("Failed to read CSV row {}", row_num + 1))?;
        let get = |col: Option<usize>| {
            col.and_then(|i| record.get(i))
                .map(|cell| String::from_utf8_lossy(cell).into_owned())
        };

        rows.push(ImportRow {
            file_no: get(file_no_col),
            file_name: get(file_name_col),
            current: get(current_col),
            record: get(record_col),
            completed: get(completed_col),
            remark: get(remark_col),
        });
    }

    Ok(rows)
}

/// Import a CSV file into `store` and return the full report.
pub fn import_csv_file<S: FileStore + ?Sized>(input: &Path, store: &mut S) -> Result<ImportReport> {
    let file = std::fs::File::open(input)
        .with_context(|| format!("Failed to open input CSV: {}", input.display()))?;
    let rows = read_import_rows(file)?;
    log::info!("CSV parsed: {} rows from {}", rows.len(), input.display());
    import_rows(&rows, store)
}

// ============================================================================
// Export
// ============================================================================

/// Write `records` in the flat parent/sub-file layout, ordered by `file_no`
/// (case-insensitive) then id. Returns the number of data rows written.
pub fn write_export_rows<W: Write>(records: &[FileRecord], output: W) -> Result<usize> {
    let mut ordered: Vec<&FileRecord> = records.iter().collect();
    ordered.sort_by_cached_key(|r| (r.file_no.to_lowercase(), r.id));

    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(EXPORT_HEADERS)?;

    let mut rows = 0usize;
    for record in ordered {
        writer.write_record([
            record.file_no.as_str(),
            record.file_name.as_str(),
            record.current.as_str(),
            record.record.as_str(),
            record.completed.as_str(),
            record.remark.as_str(),
        ])?;
        rows += 1;

        for sub in &record.sub_files {
            writer.write_record([
                "",
                sub.name.as_str(),
                sub.current.as_str(),
                sub.record.as_str(),
                sub.completed.as_str(),
                sub.remark.as_str(),
            ])?;
            rows += 1;
        }
    }

    writer.flush().context("Failed to flush CSV output")?;
    Ok(rows)
}

/// Export every record in `store` to a CSV file. Returns a summary string.
pub fn export_csv_file<S: FileStore + ?Sized>(store: &S, output: &Path) -> Result<String> {
    let records = store.list()?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(output)
        .with_context(|| format!("Failed to create output CSV: {}", output.display()))?;
    let rows = write_export_rows(&records, file)?;

    Ok(format!(
        "Export complete: {}\n  Parent records: {}\n  CSV rows: {}",
        output.display(),
        records.len(),
        rows
    ))
}

/// Default export file name, stamped with the current time in milliseconds.
pub fn default_export_name() -> String {
    format!("file_data_export_{}.csv", chrono::Utc::now().timestamp_millis())
}

// ============================================================================
// Display
// ============================================================================

const NO_WIDTH: usize = 10;
const NAME_WIDTH: usize = 36;
const STATUS_WIDTH: usize = 14;

/// Render search results as a text table: each parent row followed by its
/// sub-files, `-` for unset cells, and a result count footer.
pub fn render_results(results: &[&FileRecord]) -> String {
    let mut out = format!(
        "{:<nw$} {:<mw$} {:<sw$} {:<sw$} {:<sw$} {}\n",
        "File No",
        "File Name",
        "Current",
        "Record",
        "Completed",
        "Remark",
        nw = NO_WIDTH,
        mw = NAME_WIDTH,
        sw = STATUS_WIDTH
    );

    if results.is_empty() {
        out.push_str("No files found. Adjust search or filters.\n");
    }

    for record in results {
        out.push_str(&table_row(
            &record.file_no,
            &record.file_name,
            [record.current.as_str(), record.record.as_str(), record.completed.as_str()],
            &record.remark,
        ));
        for sub in &record.sub_files {
            out.push_str(&table_row(
                "",
                &format!("  ↳ {}", sub.name),
                [sub.current.as_str(), sub.record.as_str(), sub.completed.as_str()],
                &sub.remark,
            ));
        }
    }

    let noun = if results.len() == 1 { "file" } else { "files" };
    out.push_str(&format!("Showing {} {}\n", results.len(), noun));
    out
}

fn table_row(file_no: &str, name: &str, statuses: [&str; 3], remark: &str) -> String {
    format!(
        "{:<nw$} {:<mw$} {:<sw$} {:<sw$} {:<sw$} {}\n",
        truncate_name(file_no, NO_WIDTH),
        truncate_name(name, NAME_WIDTH),
        truncate_name(cell(statuses[0]), STATUS_WIDTH),
        truncate_name(cell(statuses[1]), STATUS_WIDTH),
        truncate_name(cell(statuses[2]), STATUS_WIDTH),
        cell(remark),
        nw = NO_WIDTH,
        mw = NAME_WIDTH,
        sw = STATUS_WIDTH
    )
}

fn cell(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

/// Truncate a name to fit in a column.
fn truncate_name(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        name.to_string()
    } else {
        let kept: String = name.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SubFile;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("FILE NO"), "file_no");
        assert_eq!(normalize_header("  File   Name "), "file_name");
        assert_eq!(normalize_header("\u{feff}FILE NO"), "file_no");
        assert_eq!(normalize_header("Remark"), "remark");
    }

    #[test]
    fn test_read_import_rows() {
        let csv_text = "FILE NO,FILE NAME,CURRENT,Extra,REMARK\n\
                        A1,Roof Plan,Shelf 1,ignored,x\n\
                        ,Sheet 1,,,\n";
        let rows = read_import_rows(csv_text.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].file_no.as_deref(), Some("A1"));
        assert_eq!(rows[0].current.as_deref(), Some("Shelf 1"));
        assert_eq!(rows[0].remark.as_deref(), Some("x"));
        assert_eq!(rows[0].record, None);
        assert_eq!(rows[1].file_no.as_deref(), Some(""));
        assert_eq!(rows[1].file_name.as_deref(), Some("Sheet 1"));
    }

    #[test]
    fn test_read_import_rows_decodes_invalid_utf8_lossily() {
        let csv_bytes: &[u8] = b"FILE NO,FILE NAME\nA1,Roof Plan\n,Caf\xE9\nB2,Site Plan\n";
        let rows = read_import_rows(csv_bytes).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].file_name.as_deref(), Some("Roof Plan"));
        assert_eq!(rows[1].file_name.as_deref(), Some("Caf\u{fffd}"));
        assert_eq!(rows[2].file_no.as_deref(), Some("B2"));

        let mut store = crate::store::MemoryStore::new();
        let report = import_rows(&rows, &mut store).unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.accepted_subfile_rows, 1);
    }

    #[test]
    fn test_read_import_rows_lossy_header() {
        let csv_bytes: &[u8] = b"FILE NO,FILE NAME,Not\xFFes\nA1,Roof Plan,x\n";
        let rows = read_import_rows(csv_bytes).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].file_no.as_deref(), Some("A1"));
    }

    #[test]
    fn test_read_import_rows_requires_key_column() {
        let err = read_import_rows("CURRENT,REMARK\nyes,no\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("FILE NO"));
    }

    #[test]
    fn test_write_export_rows_layout() {
        let mut b = FileRecord::new("B1", "Second");
        b.id = Some(2);
        b.sub_files = vec![
            SubFile {
                name: "Sub1".to_string(),
                remark: "late, again".to_string(),
                ..SubFile::default()
            },
            SubFile::named("Sub2"),
        ];
        let mut a = FileRecord::new("A1", "First");
        a.id = Some(5);
        a.completed = "Yes".to_string();

        let mut out: Vec<u8> = Vec::new();
        let rows = write_export_rows(&[b, a], &mut out).unwrap();
        assert_eq!(rows, 4);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "FILE NO,FILE NAME,CURRENT,RECORD,COMPLETED,REMARK");
        assert_eq!(lines[1], "A1,First,,,Yes,");
        assert_eq!(lines[2], "B1,Second,,,,");
        assert_eq!(lines[3], ",Sub1,,,,\"late, again\"");
        assert_eq!(lines[4], ",Sub2,,,,");
    }

    #[test]
    fn test_write_export_rows_orders_file_no_case_insensitively() {
        let mut upper = FileRecord::new("B1", "Upper");
        upper.id = Some(1);
        let mut lower = FileRecord::new("a10", "Lower");
        lower.id = Some(2);
        let mut twin = FileRecord::new("A10", "Twin");
        twin.id = Some(3);

        let mut out: Vec<u8> = Vec::new();
        write_export_rows(&[upper, twin, lower], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let firsts: Vec<&str> = text
            .lines()
            .skip(1)
            .map(|line| line.split(',').next().unwrap_or(""))
            .collect();
        assert_eq!(firsts, vec!["a10", "A10", "B1"]);
    }

    #[test]
    fn test_render_results() {
        let mut record = FileRecord::new("A1", "Roof Plan");
        record.current = "Shelf 1".to_string();
        record.sub_files.push(SubFile::named("Sheet 1"));

        let text = render_results(&[&record]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("A1"));
        assert!(lines[1].contains("Shelf 1"));
        assert!(lines[2].contains("↳ Sheet 1"));
        assert_eq!(lines[3], "Showing 1 file");

        let empty = render_results(&[]);
        assert!(empty.contains("No files found"));
        assert!(empty.ends_with("Showing 0 files\n"));
    }

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("short", 10), "short");
        assert_eq!(truncate_name("a much longer name", 10), "a much ...");
        assert_eq!(truncate_name("ééééééé", 5), "éé...");
    }
}

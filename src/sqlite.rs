//! SQLite-backed [`FileStore`].
//!
//! One `files` table keyed by an autoincrement id. Empty text fields are
//! stored as `NULL` and sub-files are kept as a JSON array in `sub_files`
//! (`NULL` when there are none).

use crate::record::{sub_files_from_json, FileKey, FileRecord, SubFile};
use crate::store::{prepare_for_write, FileStore};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_no TEXT NOT NULL,
    file_name TEXT,
    "current" TEXT,
    record TEXT,
    completed TEXT,
    remark TEXT,
    sub_files TEXT
);
CREATE INDEX IF NOT EXISTS idx_files_key ON files (file_no, file_name);
"#;

const SELECT_FILES: &str =
    r#"SELECT id, file_no, file_name, "current", record, completed, remark, sub_files FROM files"#;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the registry database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create files table")?;
        Ok(Self { conn })
    }
}

fn nullable(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn encode_sub_files(sub_files: &[SubFile]) -> Result<Option<String>> {
    if sub_files.is_empty() {
        return Ok(None);
    }
    let text = serde_json::to_string(sub_files).context("Failed to encode sub_files")?;
    Ok(Some(text))
}

fn text(row: &Row, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

fn row_to_record(row: &Row) -> rusqlite::Result<FileRecord> {
    let sub_files: Option<String> = row.get(7)?;
    Ok(FileRecord {
        id: Some(row.get(0)?),
        file_no: text(row, 1)?,
        file_name: text(row, 2)?,
        current: text(row, 3)?,
        record: text(row, 4)?,
        completed: text(row, 5)?,
        remark: text(row, 6)?,
        sub_files: sub_files
            .as_deref()
            .map(sub_files_from_json)
            .unwrap_or_default(),
    })
}

impl FileStore for SqliteStore {
    fn find_by_key(&self, key: &FileKey) -> Result<Option<FileRecord>> {
        let found = match &key.file_name {
            Some(name) => self
                .conn
                .query_row(
                    &format!("{SELECT_FILES} WHERE file_no = ?1 AND file_name = ?2 LIMIT 1"),
                    params![key.file_no, name],
                    row_to_record,
                )
                .optional(),
            None => self
                .conn
                .query_row(
                    &format!("{SELECT_FILES} WHERE file_no = ?1 AND file_name IS NULL LIMIT 1"),
                    params![key.file_no],
                    row_to_record,
                )
                .optional(),
        };
        found.with_context(|| format!("Failed to look up {}", key))
    }

    fn insert(&mut self, record: &FileRecord) -> Result<i64> {
        let record = prepare_for_write(record)?;
        self.conn
            .execute(
                r#"INSERT INTO files (file_no, file_name, "current", record, completed, remark, sub_files)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                params![
                    record.file_no,
                    nullable(&record.file_name),
                    nullable(&record.current),
                    nullable(&record.record),
                    nullable(&record.completed),
                    nullable(&record.remark),
                    encode_sub_files(&record.sub_files)?,
                ],
            )
            .with_context(|| format!("Failed to insert file_no {}", record.file_no))?;
        let id = self.conn.last_insert_rowid();
        log::debug!("Inserted file_no {} as id {}", record.file_no, id);
        Ok(id)
    }

    fn get(&self, id: i64) -> Result<Option<FileRecord>> {
        self.conn
            .query_row(
                &format!("{SELECT_FILES} WHERE id = ?1"),
                params![id],
                row_to_record,
            )
            .optional()
            .with_context(|| format!("Failed to fetch file id {}", id))
    }

    fn list(&self) -> Result<Vec<FileRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_FILES} ORDER BY id"))
            .context("Failed to prepare file listing")?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read files")?;
        Ok(records)
    }

    fn update(&mut self, id: i64, record: &FileRecord) -> Result<()> {
        let record = prepare_for_write(record)?;
        let changed = self
            .conn
            .execute(
                r#"UPDATE files SET
                       file_no = ?1, file_name = ?2, "current" = ?3, record = ?4,
                       completed = ?5, remark = ?6, sub_files = ?7
                   WHERE id = ?8"#,
                params![
                    record.file_no,
                    nullable(&record.file_name),
                    nullable(&record.current),
                    nullable(&record.record),
                    nullable(&record.completed),
                    nullable(&record.remark),
                    encode_sub_files(&record.sub_files)?,
                    id,
                ],
            )
            .with_context(|| format!("Failed to update file id {}", id))?;
        if changed == 0 {
            return Err(anyhow::anyhow!("File id {} not found", id));
        }
        Ok(())
    }

    fn delete(&mut self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM files WHERE id = ?1", params![id])
            .with_context(|| format!("Failed to delete file id {}", id))?;
        if changed == 0 {
            return Err(anyhow::anyhow!("File id {} not found", id));
        }
        Ok(())
    }
}

//! File Record and Sub-File types.
//!
//! Records enter the system from loosely-typed sources (JSON bodies, database
//! rows, CSV feeds). They are normalized at those boundaries so that every
//! other module can assume string fields are present and `sub_files` is a
//! plain sequence. An empty string means "not set" for every text field.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// One of the three independent status markers carried by records and sub-files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKey {
    Current,
    Record,
    Completed,
}

impl StatusKey {
    pub const ALL: [StatusKey; 3] = [StatusKey::Current, StatusKey::Record, StatusKey::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            StatusKey::Current => "current",
            StatusKey::Record => "record",
            StatusKey::Completed => "completed",
        }
    }
}

impl fmt::Display for StatusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named child entry of a File Record.
///
/// Sub-files have no identity of their own beyond their position in the
/// parent's sequence. Empty fields are left out when serialized; decoding
/// always goes through [`SubFile::from_value`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubFile {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub current: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub record: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub completed: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub remark: String,
}

impl SubFile {
    /// Create a sub-file with only a name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Coerce a loosely-typed object into a sub-file. Non-objects yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            name: coerce_string(obj.get("name")),
            current: coerce_string(obj.get("current")),
            record: coerce_string(obj.get("record")),
            completed: coerce_string(obj.get("completed")),
            remark: coerce_string(obj.get("remark")),
        })
    }

    pub fn status(&self, key: StatusKey) -> &str {
        match key {
            StatusKey::Current => &self.current,
            StatusKey::Record => &self.record,
            StatusKey::Completed => &self.completed,
        }
    }

    /// A sub-file without a non-blank name is not a valid sub-file.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// A top-level tracked entity with an ordered list of sub-files.
///
/// Only serialized. Loosely-typed input is read with [`FileRecord::from_value`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// Storage-assigned surrogate id; `None` until inserted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub file_no: String,
    /// Display name; empty means absent.
    pub file_name: String,
    pub current: String,
    pub record: String,
    pub completed: String,
    pub remark: String,
    pub sub_files: Vec<SubFile>,
}

impl FileRecord {
    /// Create a record with only its natural key set.
    pub fn new(file_no: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            file_no: file_no.into(),
            file_name: file_name.into(),
            ..Self::default()
        }
    }

    /// Normalize a loosely-typed input object into a record.
    ///
    /// Every scalar field comes out as a string (`null`, missing and
    /// non-scalar values become `""`, numbers and booleans are rendered).
    /// `sub_files` may be an array or a string holding a JSON array, as
    /// relational JSON columns often come back; anything else becomes empty.
    pub fn from_value(value: &Value) -> Self {
        let id = value.get("id").and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        });

        Self {
            id,
            file_no: coerce_string(value.get("file_no")),
            file_name: coerce_string(value.get("file_name")),
            current: coerce_string(value.get("current")),
            record: coerce_string(value.get("record")),
            completed: coerce_string(value.get("completed")),
            remark: coerce_string(value.get("remark")),
            sub_files: coerce_sub_files(value.get("sub_files")),
        }
    }

    /// Prepare a record for saving: trim the key fields and discard
    /// sub-files without a name.
    pub fn sanitized(mut self) -> Self {
        self.file_no = self.file_no.trim().to_string();
        self.file_name = self.file_name.trim().to_string();

        let before = self.sub_files.len();
        self.sub_files.retain(SubFile::is_valid);
        for sub in &mut self.sub_files {
            sub.name = sub.name.trim().to_string();
        }
        if self.sub_files.len() < before {
            log::debug!(
                "Dropped {} unnamed sub-file(s) from file_no {}",
                before - self.sub_files.len(),
                self.file_no
            );
        }
        self
    }

    pub fn key(&self) -> FileKey {
        FileKey::new(&self.file_no, Some(self.file_name.as_str()))
    }

    pub fn status(&self, key: StatusKey) -> &str {
        match key {
            StatusKey::Current => &self.current,
            StatusKey::Record => &self.record,
            StatusKey::Completed => &self.completed,
        }
    }

    pub fn sub_file_names(&self) -> impl Iterator<Item = &str> {
        self.sub_files.iter().map(|s| s.name.as_str())
    }
}

/// Natural key of a File Record.
///
/// An absent name is distinct from every present name, and two absent names
/// are equal, so the derived equality is the duplicate check used on import.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileKey {
    pub file_no: String,
    pub file_name: Option<String>,
}

impl FileKey {
    pub fn new(file_no: &str, file_name: Option<&str>) -> Self {
        Self {
            file_no: file_no.trim().to_string(),
            file_name: file_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        }
    }

    pub fn matches(&self, record: &FileRecord) -> bool {
        *self == record.key()
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "file_no={}, file_name={}",
            self.file_no,
            self.file_name.as_deref().unwrap_or("NULL")
        )
    }
}

fn coerce_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn coerce_sub_files(value: Option<&Value>) -> Vec<SubFile> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(SubFile::from_value).collect(),
        Some(Value::String(text)) => sub_files_from_json(text),
        _ => Vec::new(),
    }
}

/// Decode a stored sub-file blob. Anything other than a JSON array yields
/// an empty sequence.
pub fn sub_files_from_json(text: &str) -> Vec<SubFile> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => items.iter().filter_map(SubFile::from_value).collect(),
        Ok(_) => Vec::new(),
        Err(e) => {
            log::warn!("Ignoring malformed sub_files blob: {}", e);
            Vec::new()
        }
    }
}

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::FailureKind;

/// Field name carried by every line of an unstructured source.
pub const TEXT_FIELD: &str = "text";

/// Reader families a format hint can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Spreadsheet,
    Pdf,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Format::Csv => "csv",
            Format::Spreadsheet => "spreadsheet",
            Format::Pdf => "pdf",
        };
        f.write_str(s)
    }
}

/// A cell value as the reader found it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

/// One unit of data produced by a reader, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Header-keyed row, fields in source column order.
    Tabular(Vec<(String, RawValue)>),
    /// One line of extracted text.
    TextLine(String),
}

/// Record whose values are all in canonical string form, field order kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRecord {
    fields: Vec<(String, String)>,
}

impl NormalizedRecord {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

/// Normalized records of one successfully read file.
#[derive(Debug, Clone)]
pub struct FileDataset {
    /// File name (or remote id when no name is known).
    pub provenance: String,
    pub format: Format,
    pub records: Vec<NormalizedRecord>,
    /// blake3 hex digest of the raw bytes.
    pub digest: String,
    pub ingested_at: i64,
}

/// Entry returned by a remote folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Bytes pulled from a byte source plus whatever it declared about them.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// A file a batch rebuild could not ingest.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub file_id: String,
    pub file_name: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of rebuilding the corpus from a remote folder.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// The datasets now installed, in listing order.
    pub datasets: Arc<Vec<FileDataset>>,
    pub failures: Vec<BatchFailure>,
    pub listed: usize,
}

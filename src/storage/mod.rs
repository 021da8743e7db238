use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::{Document, FileFormat, UNCATEGORIZED};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("unsupported file extension: {0} (expected .txt or .json)")]
    UnsupportedFormat(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One element of the persisted JSON array. Category and tags are optional on
/// input; text defaults to empty so blank entries can be skipped instead of
/// failing the whole load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemarkRecord {
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_category() -> String {
    UNCATEGORIZED.to_string()
}

pub fn format_for_path(path: &Path) -> Result<FileFormat, StorageError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("txt") => Ok(FileFormat::Text),
        Some("json") => Ok(FileFormat::Json),
        _ => Err(StorageError::UnsupportedFormat(path.to_path_buf())),
    }
}

pub fn load(path: &Path) -> Result<Document, StorageError> {
    match format_for_path(path)? {
        FileFormat::Text => read_text(path),
        FileFormat::Json => read_json(path),
        FileFormat::Unsaved => Err(StorageError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Each non-blank line becomes one uncategorized, tagless remark.
pub fn read_text(path: &Path) -> Result<Document, StorageError> {
    let raw = read_file(path)?;
    let mut document = Document::new();
    for line in raw.lines() {
        document.add_remark(line, UNCATEGORIZED, &[]);
    }
    document.set_location(path.to_path_buf(), FileFormat::Text);
    document.mark_clean();
    tracing::info!(
        path = %path.display(),
        remarks = document.remark_count(),
        "loaded text document"
    );
    Ok(document)
}

/// Reads a JSON array of `{category, text, tags}` records. Records sharing a
/// category merge into one list in encounter order; blank-text records are
/// skipped.
pub fn read_json(path: &Path) -> Result<Document, StorageError> {
    let raw = read_file(path)?;
    let records: Vec<RemarkRecord> = serde_json::from_str(&raw).map_err(|source| {
        tracing::warn!(path = %path.display(), error = %source, "malformed json document");
        StorageError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let mut document = Document::new();
    for record in records {
        document.add_remark(&record.text, &record.category, &record.tags);
    }
    document.set_location(path.to_path_buf(), FileFormat::Json);
    document.mark_clean();
    tracing::info!(
        path = %path.display(),
        remarks = document.remark_count(),
        "loaded json document"
    );
    Ok(document)
}

pub fn write(path: &Path, format: FileFormat, document: &Document) -> Result<(), StorageError> {
    match format {
        FileFormat::Text => write_text(path, document),
        FileFormat::Json => write_json(path, document),
        FileFormat::Unsaved => Err(StorageError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Lossy projection: one remark per line in aggregate order; categories and
/// tags are dropped. Callers are expected to confirm with the user first when
/// the document carries either (see `Document::is_lossy_as_text`).
pub fn write_text(path: &Path, document: &Document) -> Result<(), StorageError> {
    let mut out = String::new();
    for remark in document.remarks_in(crate::document::ALL_CATEGORY) {
        out.push_str(&remark.text);
        out.push('\n');
    }
    fs::write(path, out)?;
    tracing::info!(
        path = %path.display(),
        remarks = document.remark_count(),
        "wrote text document"
    );
    Ok(())
}

/// Format-preserving save: a flat array of records in category order then
/// in-category order, 4-space indent, non-ASCII left unescaped.
pub fn write_json(path: &Path, document: &Document) -> Result<(), StorageError> {
    let records: Vec<RemarkRecord> = document
        .remarks_by_category()
        .into_iter()
        .map(|remark| RemarkRecord {
            category: remark.category.clone(),
            text: remark.text.clone(),
            tags: remark.tags.iter().cloned().collect(),
        })
        .collect();

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records
        .serialize(&mut serializer)
        .map_err(|source| StorageError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    fs::write(path, buf)?;
    tracing::info!(
        path = %path.display(),
        remarks = records.len(),
        "wrote json document"
    );
    Ok(())
}

fn read_file(path: &Path) -> Result<String, StorageError> {
    if !path.exists() {
        return Err(StorageError::NotFound(path.to_path_buf()));
    }
    Ok(fs::read_to_string(path)?)
}

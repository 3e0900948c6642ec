//! JSON/CSV exporters for the enriched inventory.
//!
//! Both writers produce the same fixed column set; the schema is the
//! contract consumers of the output files rely on, so it never varies with
//! which facets happened to come back.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use common::drive::FileDetail;

pub const JSON_FILE_NAME: &str = "drive_analysis.json";
pub const CSV_FILE_NAME: &str = "drive_analysis.csv";

const CSV_COLUMNS: [&str; 10] = [
    "id",
    "name",
    "path",
    "size",
    "isLeaf",
    "contentHash",
    "labelId",
    "labelName",
    "createdAt",
    "modifiedAt",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write export file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode export: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub id: String,
    pub name: String,
    pub path: String,
    pub size: i64,
    pub is_leaf: bool,
    pub content_hash: Option<String>,
    pub label_id: Option<String>,
    pub label_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl From<&FileDetail> for ExportRecord {
    fn from(detail: &FileDetail) -> Self {
        Self {
            id: detail.id.clone(),
            name: detail.name.clone(),
            path: detail.path.clone(),
            size: detail.size,
            is_leaf: true,
            content_hash: detail.content_hash.clone(),
            label_id: detail.label_id.clone(),
            label_name: detail.label_name.clone(),
            created_at: detail.created_at,
            modified_at: detail.modified_at,
        }
    }
}

pub fn write_json(dir: &Path, details: &[FileDetail]) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(JSON_FILE_NAME);

    let records: Vec<ExportRecord> = details.iter().map(ExportRecord::from).collect();
    let mut writer = BufWriter::new(fs::File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, &records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    Ok(path)
}

pub fn write_csv(dir: &Path, details: &[FileDetail]) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(CSV_FILE_NAME);

    let mut writer = BufWriter::new(fs::File::create(&path)?);
    writeln!(writer, "{}", CSV_COLUMNS.join(","))?;
    for detail in details {
        let record = ExportRecord::from(detail);
        let row = [
            csv_field(&record.id),
            csv_field(&record.name),
            csv_field(&record.path),
            record.size.to_string(),
            record.is_leaf.to_string(),
            csv_field(record.content_hash.as_deref().unwrap_or_default()),
            csv_field(record.label_id.as_deref().unwrap_or_default()),
            csv_field(record.label_name.as_deref().unwrap_or_default()),
            record.created_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            record.modified_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        ];
        writeln!(writer, "{}", row.join(","))?;
    }
    writer.flush()?;

    Ok(path)
}

/// RFC 4180 quoting: only fields containing a delimiter, quote or newline
/// are wrapped, with embedded quotes doubled.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}

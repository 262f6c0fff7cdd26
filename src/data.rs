//! Tabular input: one record per CSV row, keyed by header name

use std::fmt;
use std::fs;
use std::path::Path;

use encoding_rs::Encoding;
use tracing::{debug, info, warn};

use crate::error::DataLoadError;

/// Cell text treated as a missing value
const MISSING_MARKERS: &[&str] = &["nan", "na", "n/a", "null", "none", "<na>"];

/// Scalar value of one cell
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    /// Numeric cell, kept as written so leading zeros and precision survive
    Number(String),
    /// Empty cell or a conventional missing marker
    Empty,
}

impl FieldValue {
    pub fn parse(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() || MISSING_MARKERS.contains(&trimmed.to_lowercase().as_str()) {
            FieldValue::Empty
        } else if trimmed.parse::<f64>().is_ok() {
            FieldValue::Number(cell.to_string())
        } else {
            FieldValue::Text(cell.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }

    /// Text to type for this value
    pub fn as_text(&self) -> &str {
        match self {
            FieldValue::Text(s) | FieldValue::Number(s) => s,
            FieldValue::Empty => "",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_text())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::parse(s)
    }
}

/// One row of input, field name to value, in column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a field, replacing an earlier value with the same name in place
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Loaded input table
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    /// Header row, in file order
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

impl DataSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Load a CSV file decoded with the given encoding label.
///
/// Rows shorter than the header get `Empty` for the missing columns; extra
/// cells are ignored.
pub fn load_records(path: &Path, encoding: &str) -> Result<DataSet, DataLoadError> {
    if !path.exists() {
        return Err(DataLoadError::NotFound(path.to_path_buf()));
    }

    let bytes = fs::read(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let encoding = Encoding::for_label(encoding.as_bytes())
        .ok_or_else(|| DataLoadError::UnknownEncoding(encoding.to_string()))?;
    let (text, used, had_errors) = encoding.decode(&bytes);
    if had_errors {
        return Err(DataLoadError::Decode {
            encoding: used.name(),
        });
    }
    debug!("Decoded {} bytes as {}", bytes.len(), used.name());

    if text.trim().is_empty() {
        return Err(DataLoadError::Empty(path.to_path_buf()));
    }

    let data = parse_records(text.as_bytes())?;
    if data.headers.is_empty() {
        return Err(DataLoadError::Empty(path.to_path_buf()));
    }

    info!("Loaded {} records from {}", data.len(), path.display());
    Ok(data)
}

/// Parse CSV text with a header row
pub fn parse_records<R: std::io::Read>(reader: R) -> Result<DataSet, DataLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = unique_headers(reader.headers()?.iter());

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut record = Record::new();
        for (i, name) in headers.iter().enumerate() {
            let value = row.get(i).map(FieldValue::parse).unwrap_or(FieldValue::Empty);
            record.insert(name.as_str(), value);
        }
        records.push(record);
    }

    Ok(DataSet { headers, records })
}

/// Rename repeated header names to `name.1`, `name.2`, ... so no column is
/// shadowed by a later one with the same name
fn unique_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let raw: Vec<&str> = raw.collect();
    let mut headers: Vec<String> = Vec::with_capacity(raw.len());
    for name in &raw {
        if !headers.iter().any(|h| h == name) {
            headers.push(name.to_string());
            continue;
        }
        let renamed = (1..)
            .map(|n| format!("{name}.{n}"))
            .find(|candidate| !headers.contains(candidate) && !raw.contains(&candidate.as_str()))
            .unwrap_or_default();
        warn!("Duplicate column '{}' renamed to '{}'", name, renamed);
        headers.push(renamed);
    }
    headers
}

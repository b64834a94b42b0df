// JSONL store file format

use crate::error::{Error, Result};
use crate::record::{FieldValue, Record, RecordKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::{debug, info};

/// Version written in the header line
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Header {
    yardbook: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredValue {
    Text(String),
    Number(f64),
    Date { date: NaiveDate },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredRecord {
    kind: RecordKind,
    id: String,
    #[serde(default)]
    fields: BTreeMap<String, StoredValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    raw: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated: Option<NaiveDate>,
}

impl From<&FieldValue> for StoredValue {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Text(s) => StoredValue::Text(s.clone()),
            FieldValue::Number(n) => StoredValue::Number(*n),
            FieldValue::Date(d) => StoredValue::Date { date: *d },
        }
    }
}

impl From<StoredValue> for FieldValue {
    fn from(value: StoredValue) -> Self {
        match value {
            StoredValue::Text(s) => FieldValue::Text(s),
            StoredValue::Number(n) => FieldValue::Number(n),
            StoredValue::Date { date } => FieldValue::Date(date),
        }
    }
}

/// Write the header and every record, one JSON object per line
pub fn write_records<'a, W, I>(writer: &mut W, records: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a Record>,
{
    let header = serde_json::to_string(&Header {
        yardbook: FORMAT_VERSION,
    })?;
    writeln!(writer, "{}", header)?;

    let mut count = 0;
    for record in records {
        let stored = StoredRecord {
            kind: record.kind(),
            id: record.id().to_string(),
            fields: record
                .fields()
                .iter()
                .map(|(k, v)| (k.clone(), StoredValue::from(v)))
                .collect(),
            raw: record.raw_cells().clone(),
            created: record.created(),
            updated: record.updated(),
        };
        writeln!(writer, "{}", serde_json::to_string(&stored)?)?;
        count += 1;
    }
    Ok(count)
}

/// Read every record from a store file, in file order
///
/// A missing file is an empty store. Any unreadable line, bad header or
/// duplicate identifier fails the whole read with `CorruptData`.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    if !path.exists() {
        debug!(file = ?path, "Store file does not exist, starting empty");
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let corrupt = |line: usize, reason: String| Error::CorruptData {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut records = Vec::new();
    let mut seen: HashSet<(RecordKind, String)> = HashSet::new();
    let mut header_seen = false;

    for (line_num, line) in reader.lines().enumerate() {
        let line_no = line_num + 1;
        let line = line.map_err(|e| corrupt(line_no, e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }

        if !header_seen {
            let header: Header =
                serde_json::from_str(&line).map_err(|e| corrupt(line_no, format!("bad header: {}", e)))?;
            if header.yardbook != FORMAT_VERSION {
                return Err(corrupt(
                    line_no,
                    format!("unsupported format version {}", header.yardbook),
                ));
            }
            header_seen = true;
            continue;
        }

        let stored: StoredRecord = serde_json::from_str(&line).map_err(|e| corrupt(line_no, e.to_string()))?;
        if !seen.insert((stored.kind, stored.id.clone())) {
            return Err(corrupt(
                line_no,
                format!("duplicate {} identifier '{}'", stored.kind, stored.id),
            ));
        }

        let mut record = Record::new(stored.kind, stored.id).map_err(|e| corrupt(line_no, e.to_string()))?;
        let mut raw = stored.raw;
        for (name, value) in stored.fields {
            let value = FieldValue::from(value);
            let set = match raw.remove(&name) {
                Some(text) => record.set_cell(&name, value, &text),
                None => record.set(&name, value),
            };
            set.map_err(|e| corrupt(line_no, e.to_string()))?;
        }
        if let Some(name) = raw.keys().next() {
            return Err(corrupt(line_no, format!("cell text for unknown field '{}'", name)));
        }
        record.set_stamps(stored.created, stored.updated);
        records.push(record);
    }

    info!(file = ?path, count = records.len(), "Loaded records from store file");
    Ok(records)
}

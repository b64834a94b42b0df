// CSV import and export

use crate::error::{Error, Result};
use crate::record::{ID_FIELD, Record, RecordKind};
use crate::schema;
use crate::store::RecordStore;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// How imported rows treat identifiers already in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Colliding identifiers fail the import with `DuplicateIdentifier`
    #[default]
    Create,
    /// Colliding identifiers replace the stored record
    Upsert,
}

/// Import a CSV file into a fresh store
pub fn import<P: AsRef<Path>>(path: P, kind: RecordKind) -> Result<RecordStore> {
    let mut store = RecordStore::new();
    import_into(&mut store, path, kind, ImportMode::Create)?;
    Ok(store)
}

/// Import a CSV file into an existing store
///
/// Rows are staged first; on any error the store is left untouched.
/// Returns the number of rows imported.
pub fn import_into<P: AsRef<Path>>(
    store: &mut RecordStore,
    path: P,
    kind: RecordKind,
    mode: ImportMode,
) -> Result<usize> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let rows = read_rows(file, kind)?;

    if mode == ImportMode::Create {
        if let Some(dup) = rows.iter().find(|r| store.contains(kind, r.id())) {
            return Err(Error::DuplicateIdentifier {
                kind,
                id: dup.id().to_string(),
            });
        }
    }

    let count = rows.len();
    let mut replaced = 0;
    for record in rows {
        if store.upsert(record).is_some() {
            replaced += 1;
        }
    }

    info!(file = ?path, %kind, count, replaced, "Imported rows");
    Ok(count)
}

/// Parse CSV rows into records of one kind
pub fn read_rows<R: Read>(reader: R, kind: RecordKind) -> Result<Vec<Record>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let missing = schema::missing_required(kind, &headers);
    if !missing.is_empty() {
        return Err(Error::SchemaMismatch { kind, missing });
    }

    let id_col = headers.iter().position(|h| h == ID_FIELD).unwrap_or(0);
    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::new();

    for (line_num, result) in reader.records().enumerate() {
        let cells = result?;
        // Physical line the row starts on; quoted cells may span lines
        let row = cells
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(line_num + 2);

        let id = cells.get(id_col).unwrap_or("");
        let bad_id = |reason: String| Error::InvalidValue {
            row,
            column: ID_FIELD.to_string(),
            value: id.to_string(),
            reason,
        };
        if id.trim() != id {
            return Err(bad_id("identifier has leading or trailing whitespace".to_string()));
        }
        let mut record = Record::new(kind, id).map_err(|e| bad_id(e.to_string()))?;

        if !seen.insert(id.to_string()) {
            return Err(Error::DuplicateIdentifier {
                kind,
                id: id.to_string(),
            });
        }

        for (col, name) in headers.iter().enumerate() {
            if col == id_col {
                continue;
            }
            let raw = cells.get(col).unwrap_or("");
            if raw.is_empty() {
                continue;
            }
            let invalid = |reason: String| Error::InvalidValue {
                row,
                column: name.clone(),
                value: raw.to_string(),
                reason,
            };
            let value = schema::parse_cell(kind, name, raw).map_err(invalid)?;
            record
                .set_cell(name, value, raw)
                .map_err(|e| invalid(e.to_string()))?;
        }

        records.push(record);
    }

    debug!(%kind, count = records.len(), "Parsed CSV rows");
    Ok(records)
}

/// Export one kind's records to a CSV file, in store order
///
/// Returns the number of rows written.
pub fn export<P: AsRef<Path>>(store: &RecordStore, kind: RecordKind, path: P) -> Result<usize> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let count = write_rows(store, kind, file)?;
    info!(file = ?path, %kind, count, "Exported rows");
    Ok(count)
}

/// Columns for exporting `kind`: the schema, then extra fields sorted by name
pub fn export_columns(store: &RecordStore, kind: RecordKind) -> Vec<String> {
    let fixed: Vec<String> = schema::columns(kind).iter().map(|c| c.name.to_string()).collect();
    let extra: BTreeSet<&str> = store
        .records()
        .filter(|r| r.kind() == kind)
        .flat_map(|r| r.fields().keys().map(String::as_str))
        .filter(|name| !fixed.iter().any(|f| f.as_str() == *name))
        .collect();

    fixed
        .iter()
        .cloned()
        .chain(extra.into_iter().map(str::to_string))
        .collect()
}

pub fn write_rows<W: Write>(store: &RecordStore, kind: RecordKind, writer: W) -> Result<usize> {
    let columns = export_columns(store, kind);
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(&columns)?;

    let mut count = 0;
    for record in store.records().filter(|r| r.kind() == kind) {
        let row: Vec<String> = columns
            .iter()
            .map(|c| record.cell(c).unwrap_or_default())
            .collect();
        writer.write_record(&row)?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

// Record store backed by a single JSONL file

use crate::config::DeletePolicy;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::jsonl;
use crate::record::{FieldValue, ID_FIELD, Record, RecordKind, today};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Wraps the temp file in the writer the records are written through
type WrapFn = for<'a> fn(&'a mut File) -> Box<dyn Write + 'a>;

/// Ordered, in-memory collection of records keyed by (kind, id)
///
/// Insertion order is preserved; replacing a record keeps its position.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<Record>,
    index: HashMap<(RecordKind, String), usize>,
    delete_policy: DeletePolicy,
}

impl PartialEq for RecordStore {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records
    }
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    pub fn set_delete_policy(&mut self, policy: DeletePolicy) {
        self.delete_policy = policy;
    }

    /// Load a store from disk; a missing file gives an empty store
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut store = Self::new();
        for record in jsonl::read_records(path)? {
            // read_records already rejects duplicates; stamps are kept as stored
            store.place(record);
        }
        Ok(store)
    }

    /// Atomically replace the file at `path` with the current contents
    ///
    /// Writes a sibling temp file, syncs it and renames it over the target
    /// while holding an exclusive lock on `<path>.lock`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_with(path.as_ref(), plain)
    }

    fn save_with(&self, path: &Path, wrap: WrapFn) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path(path))?;
        lock_file.lock_exclusive()?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "store".to_string());
        let temp_path = dir.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::now_v7()));

        let result = self.write_temp(&temp_path, wrap).and_then(|count| {
            fs::rename(&temp_path, path)?;
            sync_dir(&dir);
            Ok(count)
        });

        match result {
            Ok(count) => {
                info!(file = ?path, count, "Saved store");
                // Lock is released when lock_file is dropped
                Ok(())
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&temp_path) {
                    debug!(file = ?temp_path, error = ?cleanup, "Temp file cleanup failed");
                }
                Err(e)
            }
        }
    }

    fn write_temp(&self, temp_path: &Path, wrap: WrapFn) -> Result<usize> {
        let mut file = File::create(temp_path)?;
        let count = {
            let mut writer = BufWriter::new(wrap(&mut file));
            let count = jsonl::write_records(&mut writer, &self.records)?;
            writer.flush()?;
            count
        };
        file.sync_all()?;
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records of one kind
    pub fn count(&self, kind: RecordKind) -> usize {
        self.records.iter().filter(|r| r.kind() == kind).count()
    }

    /// All records in store order
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn contains(&self, kind: RecordKind, id: &str) -> bool {
        self.index.contains_key(&(kind, id.to_string()))
    }

    pub fn get(&self, kind: RecordKind, id: &str) -> Result<&Record> {
        self.index
            .get(&(kind, id.to_string()))
            .map(|&pos| &self.records[pos])
            .ok_or_else(|| not_found(kind, id))
    }

    /// Insert a new record or replace the one with the same (kind, id)
    ///
    /// Stamps `updated` with today's date; `created` is carried over from the
    /// replaced record. Returns the replaced record, if any.
    pub fn upsert(&mut self, mut record: Record) -> Option<Record> {
        let today = today();
        let created = self
            .get(record.kind(), record.id())
            .ok()
            .and_then(Record::created)
            .or(record.created())
            .unwrap_or(today);
        record.set_stamps(Some(created), Some(today));
        self.place(record)
    }

    fn place(&mut self, record: Record) -> Option<Record> {
        let key = (record.kind(), record.id().to_string());
        match self.index.get(&key) {
            Some(&pos) => Some(std::mem::replace(&mut self.records[pos], record)),
            None => {
                self.index.insert(key, self.records.len());
                self.records.push(record);
                None
            }
        }
    }

    /// Insert a record that must not exist yet
    pub fn insert(&mut self, record: Record) -> Result<()> {
        if self.contains(record.kind(), record.id()) {
            return Err(Error::DuplicateIdentifier {
                kind: record.kind(),
                id: record.id().to_string(),
            });
        }
        self.upsert(record);
        Ok(())
    }

    /// Set one field on an existing record, returning the previous value
    pub fn set_field(
        &mut self,
        kind: RecordKind,
        id: &str,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<Option<FieldValue>> {
        let record = self.get_mut(kind, id)?;
        let previous = record.set(field, value)?;
        record.set_stamps(record.created(), Some(today()));
        Ok(previous)
    }

    /// Remove one field from an existing record, returning the removed value
    pub fn remove_field(&mut self, kind: RecordKind, id: &str, field: &str) -> Result<Option<FieldValue>> {
        let record = self.get_mut(kind, id)?;
        let removed = record.remove(field);
        if removed.is_some() {
            record.set_stamps(record.created(), Some(today()));
        }
        Ok(removed)
    }

    fn get_mut(&mut self, kind: RecordKind, id: &str) -> Result<&mut Record> {
        match self.index.get(&(kind, id.to_string())) {
            Some(&pos) => Ok(&mut self.records[pos]),
            None => Err(not_found(kind, id)),
        }
    }

    /// Delete a record
    ///
    /// Returns whether a record was removed. Under `DeletePolicy::Strict` an
    /// absent record is `NotFound`; otherwise it is a no-op.
    pub fn delete(&mut self, kind: RecordKind, id: &str) -> Result<bool> {
        let Some(pos) = self.index.remove(&(kind, id.to_string())) else {
            return match self.delete_policy {
                DeletePolicy::Strict => Err(not_found(kind, id)),
                DeletePolicy::Lenient => {
                    debug!(%kind, id, "Delete of absent record ignored");
                    Ok(false)
                }
            };
        };

        self.records.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Ok(true)
    }

    /// Records of one kind matching every filter, in store order
    pub fn list(&self, kind: RecordKind, filters: &[Filter]) -> Vec<&Record> {
        for filter in filters {
            if filter.field != ID_FIELD
                && !self.records.iter().any(|r| r.kind() == kind && r.get(&filter.field).is_some())
            {
                warn!(%kind, field = %filter.field, "Filter field is not set on any record");
            }
        }

        self.records
            .iter()
            .filter(|r| r.kind() == kind)
            .filter(|r| filters.iter().all(|f| f.matches(r)))
            .collect()
    }
}

fn plain(file: &mut File) -> Box<dyn Write + '_> {
    Box::new(file)
}

fn not_found(kind: RecordKind, id: &str) -> Error {
    Error::NotFound {
        kind,
        id: id.to_string(),
    }
}

/// Advisory lock file guarding saves to `path`
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

// Make the rename durable (Unix only)
fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    {
        if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
            warn!(dir = ?dir, error = ?e, "Directory sync failed, rename may not survive a crash");
        }
    }
    #[cfg(not(unix))]
    let _ = dir;
}

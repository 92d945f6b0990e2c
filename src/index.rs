//! # Entity Index
//!
//! A directory-backed keyed collection of records sharing one
//! [`RecordKind`]. Records are constructed lazily on first access by a
//! factory closure supplied at index construction, so the record shape per
//! index stays pluggable without any reflection.
//!
//! The cache is a [`DashMap`], giving atomic get-or-insert: two threads
//! racing to first-access the same key produce exactly one constructed
//! instance, and the loser reuses the winner's.

use crate::container::Container;
use crate::document::{Document, FILE_EXT};
use crate::error::{Result, StashError};
use crate::model::RecordKind;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type Factory<R> = Box<dyn Fn(&str) -> Result<R> + Send + Sync>;

pub struct EntityIndex<R> {
    kind: RecordKind,
    directory: PathBuf,
    map: DashMap<String, Arc<R>>,
    factory: Factory<R>,
}

impl<R: Container> EntityIndex<R> {
    /// Create an index over `directory`. The factory builds-and-loads the
    /// record for a key; returning `Err` reports the key as absent.
    pub fn new<F>(kind: RecordKind, directory: impl Into<PathBuf>, factory: F) -> Self
    where
        F: Fn(&str) -> Result<R> + Send + Sync + 'static,
    {
        Self {
            kind,
            directory: directory.into(),
            map: DashMap::new(),
            factory: Box::new(factory),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Get the record for `key`, constructing it on first access.
    ///
    /// Construction happens at most once per key even under concurrent
    /// first access. A factory failure is logged and surfaces as `None`;
    /// nothing is cached, so a later call retries.
    pub fn get(&self, key: &str) -> Option<Arc<R>> {
        if let Some(record) = self.map.get(key) {
            return Some(record.clone());
        }
        match self.map.entry(key.to_string()) {
            Entry::Occupied(entry) => Some(entry.get().clone()),
            Entry::Vacant(entry) => match (self.factory)(key) {
                Ok(record) => {
                    let record = Arc::new(record);
                    entry.insert(record.clone());
                    Some(record)
                }
                Err(e) => {
                    warn!(
                        "failed to construct {} record for key {}: {}",
                        self.kind, key, e
                    );
                    None
                }
            },
        }
    }

    /// Insert a record, replacing any cached instance for the key.
    pub fn insert(&self, key: impl Into<String>, record: Arc<R>) {
        self.map.insert(key.into(), record);
    }

    pub fn remove(&self, key: &str) -> Option<Arc<R>> {
        self.map.remove(key).map(|(_, record)| record)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Snapshot of the cached keys.
    pub fn keys(&self) -> Vec<String> {
        self.map.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Snapshot of the cached records.
    pub fn values(&self) -> Vec<Arc<R>> {
        self.map.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&self) {
        self.map.clear();
    }

    /// Scan the backing directory and lazily populate every key that has a
    /// file but no cached record yet. Idempotent; never reloads a cached
    /// key's content.
    pub fn load_all(&self) {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        let suffix = format!(".{}", FILE_EXT);
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(&suffix) else {
                continue;
            };
            if !self.map.contains_key(stem) {
                let _ = self.get(stem);
            }
        }
    }
}

impl<R: Container> Container for EntityIndex<R> {
    fn kind(&self) -> &RecordKind {
        &self.kind
    }

    /// Export every cached record from a snapshot; unloaded files are left
    /// alone. One record's failed export cannot block the rest.
    fn export_data(&self) {
        for record in self.values() {
            record.export_data();
        }
    }

    /// Always an error: a keyed collection has no single document to
    /// import into. Calling this is a programming mistake, not a runtime
    /// condition to recover from.
    fn import_data(&self, _doc: &Document) -> Result<()> {
        Err(StashError::Unsupported(
            "import_data is not supported for EntityIndex".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record_index(dir: &tempfile::TempDir) -> EntityIndex<Record> {
        let root = dir.path().to_path_buf();
        let kind = RecordKind::Custom("guilds".into());
        let directory = root.join(kind.dir_name());
        let factory_kind = kind.clone();
        EntityIndex::new(kind, directory, move |key| {
            Ok(Record::open(&root, factory_kind.clone(), key))
        })
    }

    #[test]
    fn test_lazy_construction_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let index = record_index(&dir);

        let first = index.get("alpha").unwrap();
        let second = index.get("alpha").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(index.len(), 1);
        assert!(index.contains_key("alpha"));
    }

    #[test]
    fn test_factory_failure_reports_absent() {
        let dir = tempfile::tempdir().unwrap();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let index: EntityIndex<Record> = EntityIndex::new(
            RecordKind::Custom("broken".into()),
            dir.path().join("broken"),
            move |key| {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(StashError::Construction(format!("bad key: {}", key)))
            },
        );

        assert!(index.get("x").is_none());
        assert!(index.is_empty());
        // Nothing was cached, so the next access retries the factory.
        assert!(index.get("x").is_none());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_load_all_scans_directory_once() {
        let dir = tempfile::tempdir().unwrap();
        let index = record_index(&dir);

        let guilds = dir.path().join("guilds");
        std::fs::create_dir_all(&guilds).unwrap();
        std::fs::write(guilds.join("red.json"), r#"{"points": 3}"#).unwrap();
        std::fs::write(guilds.join("blue.json"), r#"{"points": 5}"#).unwrap();
        std::fs::write(guilds.join("notes.txt"), "ignored").unwrap();

        index.load_all();
        let mut keys = index.keys();
        keys.sort();
        assert_eq!(keys, vec!["blue", "red"]);
        assert_eq!(index.get("red").unwrap().get("points", 0i64), 3);

        // A cached key keeps its in-memory content on rescan.
        index.get("red").unwrap().set_deferred("points", 9i64, false);
        index.load_all();
        assert_eq!(index.get("red").unwrap().get("points", 0i64), 9);

        // New files are picked up.
        std::fs::write(guilds.join("green.json"), "{}").unwrap();
        index.load_all();
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_load_all_missing_directory_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let index = record_index(&dir);
        index.load_all();
        assert!(index.is_empty());
    }

    #[test]
    fn test_remove_then_get_constructs_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let index = record_index(&dir);

        let first = index.get("alpha").unwrap();
        first.set("points", 4i64);
        let removed = index.remove("alpha").unwrap();
        assert!(Arc::ptr_eq(&first, &removed));

        let fresh = index.get("alpha").unwrap();
        assert!(!Arc::ptr_eq(&first, &fresh));
        // Fresh instance loaded the exported state.
        assert_eq!(fresh.get("points", 0i64), 4);
    }

    #[test]
    fn test_collection_export_writes_cached_records() {
        let dir = tempfile::tempdir().unwrap();
        let index = record_index(&dir);
        index.get("alpha").unwrap().set_deferred("a", 1i64, false);
        index.get("beta").unwrap().set_deferred("b", 2i64, false);

        Container::export_data(&index);
        assert!(dir.path().join("guilds/alpha.json").exists());
        assert!(dir.path().join("guilds/beta.json").exists());
    }

    #[test]
    fn test_import_data_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let index = record_index(&dir);
        let err = index.import_data(&Document::new()).unwrap_err();
        assert!(matches!(err, StashError::Unsupported(_)));
    }
}

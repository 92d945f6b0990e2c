//! # Record
//!
//! A [`Record`] binds one named [`Document`] to a file location derived from
//! its [`RecordKind`] and logical name: `<root>/<kind-dir>/<name>.json`.
//!
//! ## Failure posture
//!
//! Loading and exporting fail soft. A missing or unparseable file degrades
//! to a template or an empty document with a log line; a failed write is
//! logged and retried naturally on the next mutation or manager sweep.
//! Callers therefore never handle I/O errors at this layer.
//!
//! ## Concurrency
//!
//! The in-memory document is a snapshot behind an [`ArcSwap`]: readers grab
//! the current tree without locking and can never observe a half-applied
//! mutation. Writers (`set`, `import_data`, `load_data`) clone, update, and
//! swap the snapshot under the record's own export lock, and exports
//! serialize on that same lock so two exports of one record never interleave
//! their file writes. Records never share locks with each other.

use crate::container::Container;
use crate::document::{Document, FromValue, FILE_EXT};
use crate::error::Result;
use crate::model::RecordKind;
use crate::template::TemplateSet;
use arc_swap::ArcSwap;
use log::{debug, warn};
use parking_lot::Mutex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

pub struct Record {
    root: PathBuf,
    kind: RecordKind,
    name: String,
    templates: Arc<TemplateSet>,
    doc: ArcSwap<Document>,
    export_lock: Mutex<()>,
}

impl Record {
    /// Create a record with an empty document. No I/O happens until
    /// [`load_data`](Self::load_data) or the first export.
    pub fn new(root: impl Into<PathBuf>, kind: RecordKind, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            kind,
            name: name.into(),
            templates: Arc::new(TemplateSet::default()),
            doc: ArcSwap::from_pointee(Document::new()),
            export_lock: Mutex::new(()),
        }
    }

    /// Attach a template registry consulted when the backing file is absent.
    pub fn with_templates(mut self, templates: Arc<TemplateSet>) -> Self {
        self.templates = templates;
        self
    }

    /// Create and immediately load from disk.
    pub fn open(root: impl Into<PathBuf>, kind: RecordKind, name: impl Into<String>) -> Self {
        let record = Self::new(root, kind, name);
        record.load_data();
        record
    }

    pub fn kind(&self) -> &RecordKind {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved backing file: `<root>/<kind-dir>/<name>.json`.
    pub fn file_path(&self) -> PathBuf {
        self.root
            .join(self.kind.dir_name())
            .join(format!("{}.{}", self.name, FILE_EXT))
    }

    fn template_name(&self) -> String {
        format!("{}/{}", self.kind.dir_name(), self.name)
    }

    /// (Re)populate the in-memory document from disk.
    ///
    /// Resolution order: backing file, then bundled template (materialized
    /// to disk on first use), then an empty document. Never fails; the
    /// document is always left in a complete state.
    pub fn load_data(&self) {
        let path = self.file_path();
        let doc = if path.exists() {
            match Document::load_file(&path) {
                Ok(doc) => {
                    debug!("loaded {} record from {}", self.kind, path.display());
                    doc
                }
                Err(e) => {
                    warn!(
                        "failed to parse {} record at {}: {}; starting empty",
                        self.kind,
                        path.display(),
                        e
                    );
                    Document::new()
                }
            }
        } else if let Some(text) = self.templates.get(&self.template_name()) {
            match Document::parse(text) {
                Ok(doc) => {
                    // Write-through so later loads find a real file.
                    if let Err(e) = doc.save_file(&path) {
                        warn!(
                            "failed to materialize template {} to {}: {}",
                            self.template_name(),
                            path.display(),
                            e
                        );
                    }
                    doc
                }
                Err(e) => {
                    warn!(
                        "malformed bundled template {}: {}; starting empty",
                        self.template_name(),
                        e
                    );
                    Document::new()
                }
            }
        } else {
            debug!(
                "no backing file for {} record {}; starting empty",
                self.kind, self.name
            );
            Document::new()
        };

        let _guard = self.export_lock.lock();
        self.doc.store(Arc::new(doc));
    }

    /// Fallible export used internally and by tests that need to observe
    /// write failures directly.
    pub fn try_export(&self) -> Result<()> {
        let _guard = self.export_lock.lock();
        let snapshot = self.doc.load_full();
        snapshot.save_file(self.file_path())
    }

    /// Persist the current document to its backing file. Best-effort: a
    /// failed write is logged and the call returns normally.
    pub fn export_data(&self) {
        if let Err(e) = self.try_export() {
            warn!(
                "failed to export {} record {} to {}: {}",
                self.kind,
                self.name,
                self.file_path().display(),
                e
            );
        }
    }

    /// Replace the in-memory document with a deep copy of `doc`, then
    /// export. The swap is atomic: concurrent readers see either the old
    /// tree or the new one, never a mix.
    pub fn import_data(&self, doc: &Document) {
        let copy = doc.clone();
        {
            let _guard = self.export_lock.lock();
            self.doc.store(Arc::new(copy));
        }
        self.export_data();
    }

    /// Current document snapshot.
    pub fn document(&self) -> Arc<Document> {
        self.doc.load_full()
    }

    /// Typed read with fallback: returns `default` when the path is absent,
    /// and also when the stored value is not a `T` (logged, never an error).
    pub fn get<T: FromValue>(&self, path: &str, default: T) -> T {
        match self.get_opt(path) {
            Some(value) => value,
            None => default,
        }
    }

    /// Typed read without a fallback value. Wrong-type values read as
    /// `None`, with a warning naming the expected type.
    pub fn get_opt<T: FromValue>(&self, path: &str) -> Option<T> {
        let snapshot = self.doc.load();
        let value = snapshot.get(path)?;
        match T::from_value(value) {
            Some(typed) => Some(typed),
            None => {
                warn!(
                    "invalid type at {} in {} record {}: expected {}",
                    path,
                    self.kind,
                    self.name,
                    T::EXPECTED
                );
                None
            }
        }
    }

    /// List read: absent path or non-list value yields an empty vec, and
    /// elements that are not `T` are filtered out rather than failing the
    /// whole call.
    pub fn get_list<T: FromValue>(&self, path: &str) -> Vec<T> {
        self.get(path, Vec::new())
    }

    /// Keys directly under `path`; empty when the path is not a sub-tree.
    pub fn get_keys(&self, path: &str) -> Vec<String> {
        self.doc.load().keys(path, false)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.doc.load().contains(path)
    }

    /// Set a value and synchronously export.
    pub fn set(&self, path: &str, value: impl Into<Value>) {
        self.set_deferred(path, value, true);
    }

    /// Set a value, optionally deferring the export so several writes can
    /// batch into one file write (finish with `export_data`).
    pub fn set_deferred(&self, path: &str, value: impl Into<Value>, save: bool) {
        let value = value.into();
        self.update_deferred(|doc| doc.set(path, value), save);
    }

    /// Apply a mutation to the document and export.
    ///
    /// The clone-mutate-swap happens in one critical section under the
    /// export lock, so read-modify-write updates (counters, list edits)
    /// cannot lose concurrent writes to the same record. The closure sees
    /// the latest document, not a possibly stale snapshot read earlier.
    pub fn update(&self, mutate: impl FnOnce(&mut Document)) {
        self.update_deferred(mutate, true);
    }

    /// Like [`update`](Self::update), optionally deferring the export.
    pub fn update_deferred(&self, mutate: impl FnOnce(&mut Document), save: bool) {
        {
            let _guard = self.export_lock.lock();
            let mut doc = (*self.doc.load_full()).clone();
            mutate(&mut doc);
            self.doc.store(Arc::new(doc));
        }
        if save {
            self.export_data();
        }
    }

    /// Remove the value at `path` and export.
    pub fn remove(&self, path: &str) {
        self.update(|doc| {
            doc.remove(path);
        });
    }

    /// Append a value to the list at `path` (creating it) and export.
    pub fn add_to_list(&self, path: &str, value: impl Into<Value>) {
        let value = value.into();
        self.update(|doc| {
            let mut items = doc
                .get(path)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            items.push(value);
            doc.set(path, Value::Array(items));
        });
    }

    /// Remove the first matching value from the list at `path`. Returns
    /// whether anything was removed; exports only on change.
    pub fn remove_from_list(&self, path: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let removed = {
            let _guard = self.export_lock.lock();
            let mut doc = (*self.doc.load_full()).clone();
            let Some(mut items) = doc.get(path).and_then(Value::as_array).cloned() else {
                return false;
            };
            match items.iter().position(|item| item == &value) {
                Some(index) => {
                    items.remove(index);
                    doc.set(path, Value::Array(items));
                    self.doc.store(Arc::new(doc));
                    true
                }
                None => false,
            }
        };
        if removed {
            self.export_data();
        }
        removed
    }
}

impl Container for Record {
    fn kind(&self) -> &RecordKind {
        Record::kind(self)
    }

    fn export_data(&self) {
        Record::export_data(self)
    }

    fn import_data(&self, doc: &Document) -> Result<()> {
        Record::import_data(self, doc);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_record(dir: &tempfile::TempDir, name: &str) -> Record {
        Record::open(dir.path(), RecordKind::Config, name)
    }

    #[test]
    fn test_load_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let record = temp_record(&dir, "config");
        assert!(record.document().is_empty());
    }

    #[test]
    fn test_load_malformed_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("config.json"), "{ broken").unwrap();

        let record = temp_record(&dir, "config");
        assert!(record.document().is_empty());
    }

    #[test]
    fn test_template_materializes_on_first_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut templates = TemplateSet::new();
        templates.register("config/config", r#"{"debug": true, "max-slots": 8}"#);

        let record = Record::new(dir.path(), RecordKind::Config, "config")
            .with_templates(Arc::new(templates));
        record.load_data();

        assert!(record.get("debug", false));
        assert_eq!(record.get("max-slots", 0i64), 8);
        // Write-through happened.
        assert!(record.file_path().exists());

        // A later plain load reads the materialized file.
        let reopened = temp_record(&dir, "config");
        assert!(reopened.get("debug", false));
    }

    #[test]
    fn test_set_then_reload_roundtrips_all_types() {
        let dir = tempfile::tempdir().unwrap();
        let record = temp_record(&dir, "config");
        record.set_deferred("title", "hello", false);
        record.set_deferred("count", 7i64, false);
        record.set_deferred("ratio", 0.25f64, false);
        record.set_deferred("enabled", true, false);
        record.set_deferred("tags", vec!["a", "b"], false);
        record.export_data();

        let reopened = temp_record(&dir, "config");
        assert_eq!(reopened.get("title", String::new()), "hello");
        assert_eq!(reopened.get("count", 0i64), 7);
        assert_eq!(reopened.get("ratio", 0.0f64), 0.25);
        assert!(reopened.get("enabled", false));
        assert_eq!(reopened.get_list::<String>("tags"), vec!["a", "b"]);
    }

    #[test]
    fn test_get_falls_back_on_absent_and_wrong_type() {
        let dir = tempfile::tempdir().unwrap();
        let record = temp_record(&dir, "config");
        record.set_deferred("greeting", "hi", false);

        assert_eq!(record.get("missing", 3i64), 3);
        // String stored where a boolean is requested.
        assert!(record.get("greeting", true));
        assert_eq!(record.get_opt::<bool>("greeting"), None);
        assert_eq!(record.get("greeting", String::from("x")), "hi");
    }

    #[test]
    fn test_get_list_filters_mixed_types() {
        let dir = tempfile::tempdir().unwrap();
        let record = temp_record(&dir, "config");
        record.set_deferred("mixed", json!(["a", 1, "b"]), false);

        assert_eq!(record.get_list::<String>("mixed"), vec!["a", "b"]);
        assert_eq!(record.get_list::<i64>("mixed"), vec![1]);
        assert!(record.get_list::<String>("missing").is_empty());
    }

    #[test]
    fn test_get_keys_of_section() {
        let dir = tempfile::tempdir().unwrap();
        let record = temp_record(&dir, "config");
        record.set_deferred("settings.fly", false, false);
        record.set_deferred("settings.god", false, false);

        let mut keys = record.get_keys("settings");
        keys.sort();
        assert_eq!(keys, vec!["fly", "god"]);
        assert!(record.get_keys("settings.fly").is_empty());
    }

    #[test]
    fn test_set_deferred_batches_writes() {
        let dir = tempfile::tempdir().unwrap();
        let record = temp_record(&dir, "config");

        record.set_deferred("a", 1i64, false);
        assert!(!record.file_path().exists());

        record.set("b", 2i64);
        assert!(record.file_path().exists());

        let reopened = temp_record(&dir, "config");
        assert_eq!(reopened.get("a", 0i64), 1);
        assert_eq!(reopened.get("b", 0i64), 2);
    }

    #[test]
    fn test_import_data_replaces_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let record = temp_record(&dir, "config");
        record.set("old", 1i64);

        let mut incoming = Document::new();
        incoming.set("new", json!(2));
        record.import_data(&incoming);

        assert!(!record.contains("old"));
        assert_eq!(record.get("new", 0i64), 2);

        // Import exported immediately.
        let reopened = temp_record(&dir, "config");
        assert!(!reopened.contains("old"));
        assert_eq!(reopened.get("new", 0i64), 2);
    }

    #[test]
    fn test_update_reads_latest_document() {
        let dir = tempfile::tempdir().unwrap();
        let record = temp_record(&dir, "config");
        record.set_deferred("counter", 1i64, false);

        record.update(|doc| {
            let current = doc.get("counter").and_then(Value::as_i64).unwrap_or(0);
            doc.set("counter", json!(current + 1));
        });
        assert_eq!(record.get("counter", 0i64), 2);

        let reopened = temp_record(&dir, "config");
        assert_eq!(reopened.get("counter", 0i64), 2);
    }

    #[test]
    fn test_list_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let record = temp_record(&dir, "config");

        record.add_to_list("homes", "base");
        record.add_to_list("homes", "farm");
        assert_eq!(record.get_list::<String>("homes"), vec!["base", "farm"]);

        assert!(record.remove_from_list("homes", "base"));
        assert!(!record.remove_from_list("homes", "base"));
        assert_eq!(record.get_list::<String>("homes"), vec!["farm"]);
    }

    #[test]
    fn test_remove_persists() {
        let dir = tempfile::tempdir().unwrap();
        let record = temp_record(&dir, "config");
        record.set("transient", "yes");
        record.remove("transient");

        let reopened = temp_record(&dir, "config");
        assert!(!reopened.contains("transient"));
    }
}

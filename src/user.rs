//! Per-identity records.
//!
//! A [`UserRecord`] wraps a plain [`Record`] keyed by a stable [`Uuid`],
//! stored at `userdata/<uuid>.json`. On first load a record with no `name`
//! field is seeded with the default profile schema and exported once;
//! records that already carry a `name` are never reseeded, so the seed is
//! idempotent across restarts and concurrent first access.

use crate::container::Container;
use crate::document::{Document, FromValue};
use crate::error::Result;
use crate::model::RecordKind;
use crate::record::Record;
use crate::template::TemplateSet;
use chrono::Utc;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Display name used when the host supplies none.
pub const DEFAULT_DISPLAY_NAME: &str = "Steve";

pub struct UserRecord {
    id: Uuid,
    display_name: String,
    record: Record,
}

impl UserRecord {
    /// Construct and load the record for `id`, seeding defaults when the
    /// backing file is new.
    pub fn open(
        root: impl AsRef<Path>,
        templates: Arc<TemplateSet>,
        id: Uuid,
        display_name: Option<&str>,
    ) -> Self {
        let record = Record::new(root.as_ref(), RecordKind::UserData, id.to_string())
            .with_templates(templates);
        record.load_data();
        let user = Self {
            id,
            display_name: display_name.unwrap_or(DEFAULT_DISPLAY_NAME).to_string(),
            record,
        };
        user.seed_defaults();
        user
    }

    /// Write the default profile schema and export, but only when the
    /// document has never been seeded (no `name` field yet).
    fn seed_defaults(&self) {
        if self.record.contains("name") {
            return;
        }
        let now = Utc::now().timestamp_millis();
        let r = &self.record;
        r.set_deferred("name", self.display_name.as_str(), false);
        r.set_deferred("id", self.id.to_string(), false);
        r.set_deferred("first-seen", now, false);
        r.set_deferred("last-seen", now, false);
        r.set_deferred("playtime", 0i64, false);
        r.set_deferred("last-location.world", "world", false);
        r.set_deferred("last-location.x", 0.0f64, false);
        r.set_deferred("last-location.y", 100.0f64, false);
        r.set_deferred("last-location.z", 0.0f64, false);
        r.set_deferred("last-location.yaw", 0.0f64, false);
        r.set_deferred("last-location.pitch", 0.0f64, false);
        r.set_deferred("settings.fly", false, false);
        r.set_deferred("settings.god", false, false);
        r.set_deferred("settings.vanished", false, false);
        r.export_data();
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Display name supplied at construction. The authoritative name lives
    /// in the document; see [`name`](Self::name).
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Authoritative name from the document, falling back to the cached
    /// display name.
    pub fn name(&self) -> String {
        self.record.get("name", self.display_name.clone())
    }

    pub fn first_seen(&self) -> i64 {
        self.record.get("first-seen", 0i64)
    }

    pub fn last_seen(&self) -> i64 {
        self.record.get("last-seen", 0i64)
    }

    /// Stamp `last-seen` with the current time and export.
    pub fn touch_last_seen(&self) {
        self.record.set("last-seen", Utc::now().timestamp_millis());
    }

    pub fn playtime(&self) -> i64 {
        self.record.get("playtime", 0i64)
    }

    /// Add to the accumulated playtime counter and export. The increment
    /// reads and writes inside one critical section, so concurrent calls
    /// on the same record all land.
    pub fn add_playtime(&self, millis: i64) {
        self.record.update(|doc| {
            let current = doc
                .get("playtime")
                .and_then(serde_json::Value::as_i64)
                .unwrap_or(0);
            doc.set("playtime", serde_json::Value::from(current + millis));
        });
    }

    /// Reload from disk, reseeding if the file was removed out from under
    /// us.
    pub fn load_data(&self) {
        self.record.load_data();
        self.seed_defaults();
    }

    pub fn file_path(&self) -> PathBuf {
        self.record.file_path()
    }

    pub fn document(&self) -> Arc<Document> {
        self.record.document()
    }

    pub fn get<T: FromValue>(&self, path: &str, default: T) -> T {
        self.record.get(path, default)
    }

    pub fn get_opt<T: FromValue>(&self, path: &str) -> Option<T> {
        self.record.get_opt(path)
    }

    pub fn get_list<T: FromValue>(&self, path: &str) -> Vec<T> {
        self.record.get_list(path)
    }

    pub fn get_keys(&self, path: &str) -> Vec<String> {
        self.record.get_keys(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.record.contains(path)
    }

    pub fn set(&self, path: &str, value: impl Into<Value>) {
        self.record.set(path, value);
    }

    pub fn set_deferred(&self, path: &str, value: impl Into<Value>, save: bool) {
        self.record.set_deferred(path, value, save);
    }

    /// Atomic read-modify-write against the document; see
    /// [`Record::update`].
    pub fn update(&self, mutate: impl FnOnce(&mut Document)) {
        self.record.update(mutate);
    }

    pub fn remove(&self, path: &str) {
        self.record.remove(path);
    }

    pub fn add_to_list(&self, path: &str, value: impl Into<Value>) {
        self.record.add_to_list(path, value);
    }

    pub fn remove_from_list(&self, path: &str, value: impl Into<Value>) -> bool {
        self.record.remove_from_list(path, value)
    }

    pub fn export_data(&self) {
        self.record.export_data();
    }

    pub fn try_export(&self) -> Result<()> {
        self.record.try_export()
    }
}

impl Container for UserRecord {
    fn kind(&self) -> &RecordKind {
        Container::kind(&self.record)
    }

    fn export_data(&self) {
        UserRecord::export_data(self)
    }

    fn import_data(&self, doc: &Document) -> Result<()> {
        Container::import_data(&self.record, doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_user(dir: &tempfile::TempDir, id: Uuid, name: Option<&str>) -> UserRecord {
        UserRecord::open(dir.path(), Arc::new(TemplateSet::default()), id, name)
    }

    #[test]
    fn test_fresh_record_is_seeded() {
        let dir = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4();
        let user = open_user(&dir, id, None);

        assert_eq!(user.name(), "Steve");
        assert_eq!(user.get("id", String::new()), id.to_string());
        assert_eq!(user.playtime(), 0);
        assert!(user.first_seen() > 0);
        assert_eq!(user.get("last-location.world", String::new()), "world");
        assert_eq!(user.get("last-location.y", 0.0f64), 100.0);
        assert_eq!(user.get("last-location.x", 1.0f64), 0.0);
        assert!(!user.get("settings.fly", true));
        assert!(!user.get("settings.god", true));
        assert!(!user.get("settings.vanished", true));

        // Seed exported to userdata/<uuid>.json.
        let expected = dir
            .path()
            .join("userdata")
            .join(format!("{}.json", id));
        assert!(expected.exists());
    }

    #[test]
    fn test_seeding_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4();

        let first = open_user(&dir, id, Some("Alex"));
        first.set("playtime", 1234i64);
        drop(first);

        // Reopening must not reset the existing schema.
        let second = open_user(&dir, id, Some("SomeoneElse"));
        assert_eq!(second.name(), "Alex");
        assert_eq!(second.playtime(), 1234);
    }

    #[test]
    fn test_already_seeded_record_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4();
        let path = open_user(&dir, id, Some("Alex")).file_path();

        // Plant compact JSON on disk: any export pretty-prints and would
        // change the bytes, so unchanged content proves the second open
        // wrote nothing.
        let raw = r#"{"name":"Alex","playtime":7}"#;
        std::fs::write(&path, raw).unwrap();

        let reopened = open_user(&dir, id, Some("SomeoneElse"));
        assert_eq!(reopened.playtime(), 7);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), raw);
    }

    #[test]
    fn test_name_prefers_document_over_cache() {
        let dir = tempfile::tempdir().unwrap();
        let user = open_user(&dir, Uuid::new_v4(), Some("Alex"));
        assert_eq!(user.display_name(), "Alex");

        user.set("name", "Renamed");
        assert_eq!(user.name(), "Renamed");
        assert_eq!(user.display_name(), "Alex");
    }

    #[test]
    fn test_touch_and_playtime() {
        let dir = tempfile::tempdir().unwrap();
        let user = open_user(&dir, Uuid::new_v4(), None);

        let before = user.last_seen();
        user.touch_last_seen();
        assert!(user.last_seen() >= before);

        user.add_playtime(500);
        user.add_playtime(250);
        assert_eq!(user.playtime(), 750);
    }

    #[test]
    fn test_settings_keys_enumerate() {
        let dir = tempfile::tempdir().unwrap();
        let user = open_user(&dir, Uuid::new_v4(), None);
        let mut keys = user.get_keys("settings");
        keys.sort();
        assert_eq!(keys, vec!["fly", "god", "vanished"]);
    }
}

//! # Container Manager
//!
//! The [`ContainerManager`] is the entry point to the store. It owns the
//! well-known singleton records (config, active language) and a concurrent
//! cache of per-identity user records, all constructed lazily on first
//! request.
//!
//! The controlling invariant for the user cache is at-most-one live record
//! per identity: population goes through [`DashMap`]'s atomic entry API, so
//! racing first accesses converge on a single constructed-and-loaded
//! instance. Eviction exports the removed instance itself, never a fresh
//! lookup, which would re-trigger lazy construction.
//!
//! Fan-out operations (`save_all`, `unload_all_user_data`, `reload_all`)
//! iterate an independent snapshot of the cache; a slow or failing export
//! of one record cannot starve the others.

use crate::config::StashOptions;
use crate::document::{Document, FILE_EXT};
use crate::lang::LangRecord;
use crate::model::RecordKind;
use crate::record::Record;
use crate::template::TemplateSet;
use crate::user::UserRecord;
use dashmap::DashMap;
use log::warn;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

pub struct ContainerManager {
    options: StashOptions,
    templates: Arc<TemplateSet>,
    config_slot: OnceCell<Arc<Record>>,
    lang_slot: RwLock<Option<Arc<LangRecord>>>,
    users: DashMap<Uuid, Arc<UserRecord>>,
}

impl ContainerManager {
    pub fn new(options: StashOptions) -> Self {
        Self {
            options,
            templates: Arc::new(TemplateSet::default()),
            config_slot: OnceCell::new(),
            lang_slot: RwLock::new(None),
            users: DashMap::new(),
        }
    }

    /// Manager rooted at an explicit directory, default options otherwise.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self::new(StashOptions::with_root(root))
    }

    /// Attach bundled default templates; consulted whenever a record's
    /// backing file is absent.
    pub fn with_templates(mut self, templates: TemplateSet) -> Self {
        self.templates = Arc::new(templates);
        self
    }

    pub fn options(&self) -> &StashOptions {
        &self.options
    }

    pub fn root(&self) -> &Path {
        &self.options.root
    }

    /// The config singleton, constructed and loaded on first request.
    pub fn config(&self) -> Arc<Record> {
        self.config_slot
            .get_or_init(|| {
                let record = Record::new(&self.options.root, RecordKind::Config, "config")
                    .with_templates(self.templates.clone());
                record.load_data();
                Arc::new(record)
            })
            .clone()
    }

    /// The active language record, loading the configured default language
    /// on first request.
    pub fn lang(&self) -> Arc<LangRecord> {
        if let Some(lang) = self.lang_slot.read().as_ref() {
            return lang.clone();
        }
        let mut slot = self.lang_slot.write();
        // Another thread may have won the construction race.
        if let Some(lang) = slot.as_ref() {
            return lang.clone();
        }
        let lang = Arc::new(LangRecord::open(
            &self.options.root,
            self.templates.clone(),
            &self.options.default_language,
        ));
        *slot = Some(lang.clone());
        lang
    }

    /// Switch the active language, loading it fresh from disk. The old
    /// record is discarded without export: language files are read-mostly
    /// reference data, not caller state.
    pub fn set_lang(&self, code: &str) {
        let lang = Arc::new(LangRecord::open(
            &self.options.root,
            self.templates.clone(),
            code,
        ));
        *self.lang_slot.write() = Some(lang);
    }

    /// The user record for `identity`, constructed-and-loaded on first
    /// access. At most one live instance per identity exists at any time.
    pub fn user_data(&self, identity: Uuid) -> Arc<UserRecord> {
        self.user_data_named(identity, None)
    }

    /// Like [`user_data`](Self::user_data), with a display name used when
    /// seeding a brand-new record.
    pub fn user_data_named(&self, identity: Uuid, display_name: Option<&str>) -> Arc<UserRecord> {
        self.users
            .entry(identity)
            .or_insert_with(|| {
                Arc::new(UserRecord::open(
                    &self.options.root,
                    self.templates.clone(),
                    identity,
                    display_name,
                ))
            })
            .value()
            .clone()
    }

    pub fn is_user_cached(&self, identity: Uuid) -> bool {
        self.users.contains_key(&identity)
    }

    pub fn cached_user_count(&self) -> usize {
        self.users.len()
    }

    /// Evict one user record, exporting the evicted instance. Removal
    /// happens first so the export cannot race a concurrent `user_data`
    /// into constructing a second live instance.
    pub fn unload_user_data(&self, identity: Uuid) {
        if let Some((_, user)) = self.users.remove(&identity) {
            user.export_data();
        }
    }

    /// Export and evict every cached user record.
    pub fn unload_all_user_data(&self) {
        let snapshot: Vec<Arc<UserRecord>> =
            self.users.iter().map(|entry| entry.value().clone()).collect();
        self.users.clear();
        for user in snapshot {
            user.export_data();
        }
    }

    /// Export every live container: the config and language singletons (if
    /// constructed) plus all cached user records. Unloaded identities on
    /// disk are not touched.
    pub fn save_all(&self) {
        if let Some(config) = self.config_slot.get() {
            config.export_data();
        }
        let lang = self.lang_slot.read().clone();
        if let Some(lang) = lang {
            lang.export_data();
        }
        let users: Vec<Arc<UserRecord>> =
            self.users.iter().map(|entry| entry.value().clone()).collect();
        for user in users {
            user.export_data();
        }
    }

    /// Reload the config and language singletons from disk. Cached user
    /// records are reloaded only when `options.reload_user_records` is
    /// set; by default live per-user state stays authoritative in memory.
    pub fn reload_all(&self) {
        if let Some(config) = self.config_slot.get() {
            config.load_data();
        }
        let lang = self.lang_slot.read().clone();
        if let Some(lang) = lang {
            lang.load_data();
        }
        if self.options.reload_user_records {
            let users: Vec<Arc<UserRecord>> =
                self.users.iter().map(|entry| entry.value().clone()).collect();
            for user in users {
                user.load_data();
            }
        }
    }

    /// All document files on disk for a kind, sorted for determinism.
    pub fn data_files(&self, kind: &RecordKind) -> Vec<PathBuf> {
        let dir = self.options.root.join(kind.dir_name());
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        let suffix = format!(".{}", FILE_EXT);
        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with(&suffix))
            })
            .collect();
        files.sort();
        files
    }

    pub fn user_data_files(&self) -> Vec<PathBuf> {
        self.data_files(&RecordKind::UserData)
    }

    /// Parse every user file on disk into a document, without caching any
    /// records. Malformed files are skipped with a warning.
    pub fn load_all_user_data(&self) -> Vec<Document> {
        self.user_data_files()
            .into_iter()
            .filter_map(|path| match Document::load_file(&path) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    warn!("skipping unreadable user file {}: {}", path.display(), e);
                    None
                }
            })
            .collect()
    }

    /// Seed the backing file for an identity without caching a record. If
    /// the identity is already cached, the live document is returned
    /// instead.
    pub fn init_user_data(&self, identity: Uuid) -> Arc<Document> {
        if let Some(user) = self.users.get(&identity) {
            return user.document();
        }
        let user = UserRecord::open(&self.options.root, self.templates.clone(), identity, None);
        user.document()
    }
}

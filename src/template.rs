//! Bundled default templates, registered by the host at startup.
//!
//! A record whose backing file is missing materializes its first document
//! from the template registered under `<kind-dir>/<file-stem>` (e.g.
//! `lang/en_US`), writing it through to disk so later loads hit the file.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    by_name: HashMap<String, String>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template under its logical name. Re-registering a name
    /// replaces the previous text.
    pub fn register(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.by_name.insert(name.into(), text.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Logical names of all registered templates.
    pub fn names(&self) -> Vec<&str> {
        self.by_name.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

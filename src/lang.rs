//! Localized message records.
//!
//! A [`LangRecord`] is a read-mostly record at `lang/<code>.json` holding
//! message strings. Lookups substitute `{0}`-indexed placeholders and fall
//! back to a visible marker when a path is missing, so a hole in a language
//! file shows up in output instead of failing the call.

use crate::container::Container;
use crate::document::Document;
use crate::error::Result;
use crate::model::RecordKind;
use crate::record::Record;
use crate::template::TemplateSet;
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

pub struct LangRecord {
    language: String,
    record: Record,
}

impl LangRecord {
    /// Construct and load the record for a language code (e.g. `en_US`).
    pub fn open(root: impl AsRef<Path>, templates: Arc<TemplateSet>, language: &str) -> Self {
        let record =
            Record::new(root.as_ref(), RecordKind::Lang, language).with_templates(templates);
        record.load_data();
        Self {
            language: language.to_string(),
            record,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Message prefix, read from the document's `prefix` key on each call so
    /// a reload picks up edits.
    pub fn prefix(&self) -> String {
        self.record.get("prefix", String::new())
    }

    pub fn has_message(&self, path: &str) -> bool {
        self.record.contains(path)
    }

    /// Look up a message and substitute `{0}`, `{1}`, ... placeholders.
    pub fn message(&self, path: &str, args: &[&dyn Display]) -> String {
        match self.record.get_opt::<String>(path) {
            Some(text) => format_message(&text, args),
            None => format!("missing message: {}", path),
        }
    }

    pub fn prefixed_message(&self, path: &str, args: &[&dyn Display]) -> String {
        format!("{}{}", self.prefix(), self.message(path, args))
    }

    /// Look up a message list, formatting each line. A missing or empty
    /// list yields a single marker line.
    pub fn message_list(&self, path: &str, args: &[&dyn Display]) -> Vec<String> {
        let lines: Vec<String> = self.record.get_list(path);
        if lines.is_empty() {
            return vec![format!("missing message list: {}", path)];
        }
        lines
            .iter()
            .map(|line| format_message(line, args))
            .collect()
    }

    /// Reload the language file from disk.
    pub fn load_data(&self) {
        self.record.load_data();
    }

    pub fn export_data(&self) {
        self.record.export_data();
    }
}

fn format_message(text: &str, args: &[&dyn Display]) -> String {
    let mut formatted = text.to_string();
    for (i, arg) in args.iter().enumerate() {
        formatted = formatted.replace(&format!("{{{}}}", i), &arg.to_string());
    }
    formatted
}

impl Container for LangRecord {
    fn kind(&self) -> &RecordKind {
        Container::kind(&self.record)
    }

    fn export_data(&self) {
        LangRecord::export_data(self)
    }

    fn import_data(&self, doc: &Document) -> Result<()> {
        Container::import_data(&self.record, doc)
    }
}

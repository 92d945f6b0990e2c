//! # Document Model
//!
//! A [`Document`] is the loosely-typed tree every record stores in memory: a
//! JSON object addressed by dotted paths (`settings.fly`, `last-location.x`).
//! On disk it is pretty-printed JSON so files stay human-editable.
//!
//! Typed extraction goes through [`FromValue`], one impl per supported
//! primitive. A stored value that is present but of the wrong shape extracts
//! as `None`, which the record layer turns into "return the caller's default".

use crate::error::Result;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// File extension used for every document written by this crate.
pub const FILE_EXT: &str = "json";

/// A structured key/value tree with dotted-path access.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    tree: Map<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from raw JSON text. The root must be an object.
    pub fn parse(text: &str) -> Result<Self> {
        let tree: Map<String, Value> = serde_json::from_str(text)?;
        Ok(Self { tree })
    }

    /// Read and parse a document from disk.
    ///
    /// Missing file and malformed content are both errors here; callers
    /// decide whether to fall back to a template or an empty document.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Serialize to pretty JSON at the given path, creating parent
    /// directories as needed.
    ///
    /// The write goes through a temp file plus rename, so a reader opening
    /// the path never sees a half-written document.
    pub fn save_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&self.tree)?;

        let tmp_file = parent.join(format!(".doc-{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&tmp_file, text)?;
        if let Err(e) = fs::rename(&tmp_file, path) {
            // Don't strand the temp file in the data directory.
            let _ = fs::remove_file(&tmp_file);
            return Err(e.into());
        }
        Ok(())
    }

    /// Get the raw value at a dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return None;
        }
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.tree.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Set the value at a dotted path, creating intermediate objects.
    ///
    /// An intermediate that holds a non-object value is overwritten by an
    /// object. Setting `Value::Null` removes the leaf instead.
    pub fn set(&mut self, path: &str, value: Value) {
        if path.is_empty() {
            return;
        }
        if value.is_null() {
            self.remove(path);
            return;
        }
        let segments: Vec<&str> = path.split('.').collect();
        let (leaf, parents) = segments.split_last().unwrap();
        let mut current = &mut self.tree;
        for segment in parents {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = entry.as_object_mut().unwrap();
        }
        current.insert(leaf.to_string(), value);
    }

    /// Remove the value at a dotted path, returning it if present.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        if path.is_empty() {
            return None;
        }
        let segments: Vec<&str> = path.split('.').collect();
        let (leaf, parents) = segments.split_last().unwrap();
        let mut current = &mut self.tree;
        for segment in parents {
            current = current.get_mut(*segment)?.as_object_mut()?;
        }
        current.remove(*leaf)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Keys under `path` (the whole root when `path` is empty). Returns an
    /// empty list when the path does not resolve to an object.
    ///
    /// With `deep`, nested keys are returned in dotted form
    /// (`settings.fly`), parents included.
    pub fn keys(&self, path: &str, deep: bool) -> Vec<String> {
        let section = if path.is_empty() {
            Some(&self.tree)
        } else {
            self.get(path).and_then(Value::as_object)
        };
        let Some(section) = section else {
            return Vec::new();
        };
        let mut keys = Vec::new();
        collect_keys(section, "", deep, &mut keys);
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

fn collect_keys(map: &Map<String, Value>, prefix: &str, deep: bool, out: &mut Vec<String>) {
    for (key, value) in map {
        let dotted = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        out.push(dotted.clone());
        if deep {
            if let Some(nested) = value.as_object() {
                collect_keys(nested, &dotted, deep, out);
            }
        }
    }
}

/// Typed extraction from a stored [`Value`].
///
/// Each impl accepts only values of its own shape so that type mismatches
/// fall back to the caller's default instead of coercing silently.
pub trait FromValue: Sized {
    /// Human-readable type name used in mismatch warnings.
    const EXPECTED: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "float";

    // Any JSON number reads as a float; integers widen losslessly enough
    // for the document use case.
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const EXPECTED: &'static str = "list";

    /// Lists filter element-wise: anything not of type `T` is dropped,
    /// order preserved.
    fn from_value(value: &Value) -> Option<Self> {
        value
            .as_array()
            .map(|items| items.iter().filter_map(T::from_value).collect())
    }
}

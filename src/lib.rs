//! # docstash
//!
//! A typed, file-backed record store for per-entity structured data:
//! configuration, localized strings, and per-user profiles, each kept as a
//! human-editable JSON document on disk.
//!
//! ## Layered design
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  ContainerManager (manager.rs)                           │
//! │  - Entry point: singleton config/lang + per-user cache   │
//! │  - Lazy construction, explicit eviction, bulk sweeps     │
//! └──────────────────────────────────────────────────────────┘
//!                             │
//!                             ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  Records (record.rs, user.rs, lang.rs, index.rs)         │
//! │  - One named document bound to a file location           │
//! │  - Typed accessors with absent-or-wrong-type fallback    │
//! │  - Per-record export lock, lock-free snapshot reads      │
//! └──────────────────────────────────────────────────────────┘
//!                             │
//!                             ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  Document (document.rs)                                  │
//! │  - Dotted-path JSON tree, pretty-printed on disk         │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure posture
//!
//! Nothing in this crate terminates the host. Loads fall back to bundled
//! templates or empty documents, typed reads fall back to caller defaults,
//! and exports are best-effort with a warning on failure. The only hard
//! errors are programmer mistakes, like importing a single document into a
//! keyed [`EntityIndex`].
//!
//! ## Concurrency
//!
//! The crate schedules nothing and does no async I/O; every call blocks its
//! caller. Caches populate through atomic get-or-insert so racing first
//! accesses of the same key converge on one instance, and each record
//! serializes its own exports on its own lock. Reads take no lock at all:
//! documents are immutable snapshots swapped wholesale on mutation.
//!
//! ## Module overview
//!
//! - [`manager`]: the [`ContainerManager`] entry point
//! - [`record`]: [`Record`], one document + typed accessors
//! - [`user`]: [`UserRecord`], identity-keyed records with seeded defaults
//! - [`lang`]: [`LangRecord`], localized message lookup
//! - [`index`]: [`EntityIndex`], directory-backed keyed collections
//! - [`document`]: the dotted-path [`Document`] tree
//! - [`template`]: bundled default documents
//! - [`config`]: [`StashOptions`]
//! - [`error`]: error types

pub mod config;
pub mod container;
pub mod document;
pub mod error;
pub mod index;
pub mod lang;
pub mod manager;
pub mod model;
pub mod record;
pub mod template;
pub mod user;

pub use config::StashOptions;
pub use container::Container;
pub use document::{Document, FromValue};
pub use error::{Result, StashError};
pub use index::EntityIndex;
pub use lang::LangRecord;
pub use manager::ContainerManager;
pub use model::RecordKind;
pub use record::Record;
pub use template::TemplateSet;
pub use user::UserRecord;

use crate::document::Document;
use crate::error::Result;
use crate::model::RecordKind;

/// Uniform contract shared by every data container: single records, the
/// per-user specialization, and directory-backed indexes.
///
/// `export_data` is best-effort: failures are logged by the implementation
/// and never propagated, so a manager sweep over many containers cannot be
/// derailed by one bad disk write. `import_data` stays fallible because not
/// every container supports it (an [`EntityIndex`](crate::EntityIndex) has
/// no single document to import into).
pub trait Container {
    fn kind(&self) -> &RecordKind;

    /// Persist the container's current state to its backing location.
    fn export_data(&self);

    /// Replace the container's state with a copy of `doc` and persist it.
    fn import_data(&self, doc: &Document) -> Result<()>;
}

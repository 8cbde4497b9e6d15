//! Record capability and insert policy.

use crate::error::Result;
use native_db::transaction::RwTransaction;
use native_db::ToInput;

/// Rule applied when an inserted record's primary key already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Reject the whole batch if any primary key already exists.
    Error,
    /// Overwrite the existing record's fields.
    Modified,
    /// Overwrite the existing record's fields.
    ///
    /// The engine does not distinguish between `Modified` and `All`; both
    /// upsert. The split exists for callers that carry the policy through
    /// from APIs where it controls change-notification granularity.
    All,
}

/// Capability for types persisted through
/// [`StoreManager`](crate::StoreManager).
///
/// Implement on any `#[native_db]` model registered in the
/// [`Schema`](crate::Schema). The default implementation declares no owned
/// records, so cascading deletes touch only the record itself.
pub trait Record: ToInput {
    /// Remove records reachable only through this record.
    ///
    /// Runs inside the caller's write transaction when a cascading delete or
    /// a replace-by-type removes this record, before the record itself is
    /// removed. Implementations for owning types typically look up their
    /// children by key and remove them here, recursing through the
    /// children's own hooks where ownership nests.
    fn delete_owned(&self, rw: &RwTransaction<'_>) -> Result<()> {
        let _ = rw;
        Ok(())
    }
}

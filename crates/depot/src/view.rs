//! Live, re-evaluated views over the records of one type.

use crate::error::Result;
use crate::record::Record;
use native_db::*;

/// A live view over all records of `R`, optionally filtered.
///
/// Nothing is read when the view is created; each accessor opens a fresh
/// read transaction, so every access reflects the store at the moment of the
/// call. The view is finite and restartable, never a frozen snapshot held by
/// the facade. Accessors are read-only and never block writers at this
/// layer.
pub struct Objects<'a, R: Record> {
    db: &'a Database<'static>,
    predicate: Option<Box<dyn Fn(&R) -> bool + 'a>>,
}

impl<'a, R: Record> Objects<'a, R> {
    pub(crate) fn new(db: &'a Database<'static>) -> Self {
        Self {
            db,
            predicate: None,
        }
    }

    /// Restrict the view to records matching `predicate`.
    pub fn filtered(mut self, predicate: impl Fn(&R) -> bool + 'a) -> Self {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// All records currently in the view, in primary-key order.
    pub fn fetch(&self) -> Result<Vec<R>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<R>()?;
        let mut records = Vec::new();
        for item in scan.all()? {
            let record = item?;
            if self.matches(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// First matching record in primary-key order, if any.
    pub fn first(&self) -> Result<Option<R>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<R>()?;
        for item in scan.all()? {
            let record = item?;
            if self.matches(&record) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Number of records currently in the view.
    pub fn count(&self) -> Result<usize> {
        Ok(self.fetch()?.len())
    }

    /// Whether the view currently has no records.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.first()?.is_none())
    }

    fn matches(&self, record: &R) -> bool {
        self.predicate.as_ref().map_or(true, |p| p(record))
    }
}

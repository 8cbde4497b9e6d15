//! Schema registry: model definitions plus per-type wipe hooks.

use crate::error::Result;
use crate::record::Record;
use native_db::transaction::RwTransaction;
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

/// Model id reserved for the internal schema stamp. User models must use
/// smaller ids.
pub const RESERVED_STAMP_MODEL_ID: u32 = 65535;

const STAMP_KEY: &str = "schema";

/// Single-row record holding the store's schema version.
///
/// Written on first open and compared against
/// [`StoreConfig::schema_version`](crate::StoreConfig) on every subsequent
/// open. Survives [`StoreManager::delete_all`](crate::StoreManager::delete_all).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 65535, version = 1)]
#[native_db]
pub(crate) struct SchemaStamp {
    /// Always "schema" - single row.
    #[primary_key]
    pub id: String,
    /// Version declared by the configuration that wrote the stamp.
    pub version: u32,
}

impl SchemaStamp {
    pub fn new(version: u32) -> Self {
        Self {
            id: STAMP_KEY.to_string(),
            version,
        }
    }

    pub fn key() -> String {
        STAMP_KEY.to_string()
    }
}

pub(crate) type WipeFn = for<'a, 'b> fn(&'a RwTransaction<'b>) -> Result<usize>;

/// Registry of persistable record types.
///
/// The engine borrows the model definitions for the lifetime of the database
/// handle, so a `Schema` is built once and kept in a `'static` (typically a
/// `LazyLock`). Registering a type both defines its model and records how to
/// wipe it for [`StoreManager::delete_all`](crate::StoreManager::delete_all).
pub struct Schema {
    models: Models,
    wipers: Vec<WipeFn>,
}

impl Schema {
    /// Create an empty schema. The internal version stamp is always defined.
    pub fn new() -> Self {
        let mut models = Models::new();
        // Cannot collide: the stamp id is reserved and the registry is fresh.
        models
            .define::<SchemaStamp>()
            .expect("stamp model id is reserved");
        Self {
            models,
            wipers: Vec::new(),
        }
    }

    /// Register a record type. Fails if the model is already defined or its
    /// model id collides with another registration.
    pub fn define<R: Record>(&mut self) -> Result<()> {
        self.models.define::<R>()?;
        self.wipers.push(wipe_records::<R>);
        Ok(())
    }

    pub(crate) fn models(&self) -> &Models {
        &self.models
    }

    pub(crate) fn wipers(&self) -> &[WipeFn] {
        &self.wipers
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

/// Remove every record of `R` within the given transaction.
fn wipe_records<R: Record>(rw: &RwTransaction<'_>) -> Result<usize> {
    let victims: Vec<R> = {
        let scan = rw.scan().primary::<R>()?;
        let iter = scan.all()?;
        iter.collect::<std::result::Result<_, _>>()?
    };
    let count = victims.len();
    for record in victims {
        rw.remove(record)?;
    }
    Ok(count)
}

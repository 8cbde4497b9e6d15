//! The store facade: lifecycle, transactional mutation, primary-key lookup.

use crate::config::{Location, RecoveryPolicy, StoreConfig};
use crate::error::{Error, Result};
use crate::record::{Record, UpdatePolicy};
use crate::schema::{Schema, SchemaStamp};
use crate::view::Objects;
use native_db::*;
use std::path::Path;
use std::process;
use tracing::{debug, error, warn};

/// Facade over the underlying object store.
///
/// Holds one database handle for its lifetime. The handle is internally
/// thread-safe for reads and the engine serializes write transactions, so a
/// `StoreManager` can be shared across threads. Every mutating call runs in
/// a single write transaction; a second write transaction is never opened
/// while one is in flight within a call.
pub struct StoreManager {
    db: Database<'static>,
    schema: &'static Schema,
    location: Location,
}

impl StoreManager {
    /// Open the store, or terminate the process if it cannot be opened.
    ///
    /// `None` falls back to [`StoreConfig::default`], which discards and
    /// recreates the store when the on-disk schema is incompatible. A
    /// process without its store cannot do useful work, so this is the one
    /// call that treats failure as fatal; use [`StoreManager::open`] to
    /// handle the error yourself.
    pub fn setup(schema: &'static Schema, config: Option<StoreConfig>) -> Self {
        let config = config.unwrap_or_default();
        match Self::open(schema, config) {
            Ok(store) => store,
            Err(err) => {
                error!("cannot open store: {err}");
                eprintln!("fatal: cannot open store: {err}");
                process::exit(1);
            }
        }
    }

    /// Open (creating if absent) the store described by `config`.
    ///
    /// Validates the persisted schema stamp against
    /// `config.schema_version`. A fresh store gets the stamp written; a
    /// mismatch is resolved according to `config.recovery`. Reopening with
    /// the same effective configuration never loses data.
    pub fn open(schema: &'static Schema, config: StoreConfig) -> Result<Self> {
        let mut db = create_database(schema, &config)?;
        let stamp: Option<SchemaStamp> = {
            let r = db.r_transaction()?;
            r.get().primary(SchemaStamp::key())?
        };
        match stamp {
            Some(stamp) if stamp.version == config.schema_version => {}
            Some(stamp) => match config.recovery {
                RecoveryPolicy::Strict => {
                    return Err(Error::IncompatibleSchema {
                        on_disk: stamp.version,
                        expected: config.schema_version,
                    });
                }
                RecoveryPolicy::DiscardIfIncompatible => {
                    warn!(
                        on_disk = stamp.version,
                        expected = config.schema_version,
                        "schema version changed, discarding store"
                    );
                    db = recreate_database(schema, &config, db)?;
                    write_stamp(&db, config.schema_version)?;
                }
            },
            None => write_stamp(&db, config.schema_version)?,
        }
        debug!(version = config.schema_version, "store open");
        Ok(Self {
            db,
            schema,
            location: config.location,
        })
    }

    /// Resolved on-disk location of the store, for diagnostics and backup
    /// tooling. `None` for in-memory stores.
    pub fn store_file_location(&self) -> Option<&Path> {
        match &self.location {
            Location::OnDisk(path) => Some(path),
            Location::InMemory => None,
        }
    }

    /// Insert one record. Sugar for [`StoreManager::add_all`] with a batch
    /// of one.
    pub fn add<R: Record>(&self, record: R, policy: UpdatePolicy) -> Result<()> {
        self.add_all([record], policy)
    }

    /// Insert a batch of records in one write transaction.
    ///
    /// Under [`UpdatePolicy::Error`] an existing primary key rejects the
    /// whole batch and nothing is persisted; the other policies overwrite.
    /// Records are queryable as soon as this returns.
    pub fn add_all<R: Record>(
        &self,
        records: impl IntoIterator<Item = R>,
        policy: UpdatePolicy,
    ) -> Result<()> {
        let rw = self.db.rw_transaction()?;
        for record in records {
            match policy {
                UpdatePolicy::Error => {
                    rw.insert(record)?;
                }
                UpdatePolicy::Modified | UpdatePolicy::All => {
                    rw.upsert(record)?;
                }
            }
        }
        rw.commit()?;
        Ok(())
    }

    /// Direct primary-key lookup. Absence is `Ok(None)`, not an error.
    pub fn object<R: Record>(&self, key: impl ToKey) -> Result<Option<R>> {
        let r = self.db.r_transaction()?;
        Ok(r.get().primary(key)?)
    }

    /// Live view over all records of `R`, optionally filtered via
    /// [`Objects::filtered`].
    pub fn objects<R: Record>(&self) -> Objects<'_, R> {
        Objects::new(&self.db)
    }

    /// Delete one record. Sugar for [`StoreManager::delete_batch`].
    pub fn delete<R: Record>(&self, record: R, cascading: bool) -> Result<()> {
        self.delete_batch([record], cascading)
    }

    /// Delete a batch of records in one write transaction.
    ///
    /// With `cascading`, each record's [`Record::delete_owned`] hook runs
    /// first, removing records reachable only through it; types with no
    /// declared ownership are unaffected by the flag.
    pub fn delete_batch<R: Record>(
        &self,
        records: impl IntoIterator<Item = R>,
        cascading: bool,
    ) -> Result<()> {
        let rw = self.db.rw_transaction()?;
        for record in records {
            if cascading {
                record.delete_owned(&rw)?;
            }
            rw.remove(record)?;
        }
        rw.commit()?;
        Ok(())
    }

    /// Remove every record of every registered type in one transaction.
    ///
    /// Destructive and irreversible; meant for test and reset paths. The
    /// internal schema stamp survives, so the store reopens cleanly.
    pub fn delete_all(&self) -> Result<()> {
        let rw = self.db.rw_transaction()?;
        let mut removed = 0;
        for wipe in self.schema.wipers() {
            removed += wipe(&rw)?;
        }
        rw.commit()?;
        debug!(removed, "cleared store");
        Ok(())
    }

    /// Atomically replace every record of `R` with exactly this one.
    ///
    /// Existing records of the type are cascade-deleted and the new record
    /// inserted in a single transaction. Failure at any point leaves the
    /// previous records in place; the type never ends up with zero records
    /// unless it had zero and the insert failed too.
    pub fn replace_object<R: Record>(&self, record: R) -> Result<()> {
        let rw = self.db.rw_transaction()?;
        let existing: Vec<R> = {
            let scan = rw.scan().primary::<R>()?;
            let iter = scan.all()?;
            iter.collect::<std::result::Result<_, _>>()?
        };
        for old in existing {
            old.delete_owned(&rw)?;
            rw.remove(old)?;
        }
        rw.insert(record)?;
        rw.commit()?;
        Ok(())
    }
}

/// Open the database at the configured location, creating it if absent.
///
/// An existing on-disk store the engine refuses to open is treated as
/// incompatible: under the discard policy it is removed and recreated once,
/// under the strict policy the engine error propagates.
fn create_database(schema: &'static Schema, config: &StoreConfig) -> Result<Database<'static>> {
    match &config.location {
        Location::InMemory => Ok(Builder::new().create_in_memory(schema.models())?),
        Location::OnDisk(path) => match Builder::new().create(schema.models(), path) {
            Ok(db) => Ok(db),
            Err(err)
                if config.recovery == RecoveryPolicy::DiscardIfIncompatible
                    && path.exists() =>
            {
                warn!(
                    "store at {} cannot be opened ({err}), discarding",
                    path.display()
                );
                std::fs::remove_file(path)?;
                Ok(Builder::new().create(schema.models(), path)?)
            }
            Err(err) => Err(err.into()),
        },
    }
}

/// Drop the handle, destroy the on-disk store, and open a fresh one.
fn recreate_database(
    schema: &'static Schema,
    config: &StoreConfig,
    db: Database<'static>,
) -> Result<Database<'static>> {
    drop(db);
    if let Location::OnDisk(path) = &config.location {
        std::fs::remove_file(path)?;
    }
    create_database(schema, config)
}

fn write_stamp(db: &Database<'static>, version: u32) -> Result<()> {
    let rw = db.rw_transaction()?;
    rw.upsert(SchemaStamp::new(version))?;
    rw.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use native_db::transaction::RwTransaction;
    use native_model::{native_model, Model};
    use serde::{Deserialize, Serialize};
    use std::sync::LazyLock;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[native_model(id = 1, version = 1)]
    #[native_db]
    struct Account {
        #[primary_key]
        id: u64,
        name: String,
        balance: i64,
    }

    impl Record for Account {}

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[native_model(id = 2, version = 1)]
    #[native_db]
    struct Ledger {
        #[primary_key]
        id: u64,
        entry_ids: Vec<u64>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[native_model(id = 3, version = 1)]
    #[native_db]
    struct Entry {
        #[primary_key]
        id: u64,
        amount: i64,
    }

    impl Record for Entry {}

    impl Record for Ledger {
        fn delete_owned(&self, rw: &RwTransaction<'_>) -> Result<()> {
            for id in &self.entry_ids {
                if let Some(entry) = rw.get().primary::<Entry>(*id)? {
                    rw.remove(entry)?;
                }
            }
            Ok(())
        }
    }

    static SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
        let mut schema = Schema::new();
        schema.define::<Account>().unwrap();
        schema.define::<Ledger>().unwrap();
        schema.define::<Entry>().unwrap();
        schema
    });

    fn memory_store() -> StoreManager {
        StoreManager::open(&SCHEMA, StoreConfig::in_memory()).unwrap()
    }

    fn account(id: u64, balance: i64) -> Account {
        Account {
            id,
            name: format!("account-{id}"),
            balance,
        }
    }

    #[test]
    fn test_round_trip() {
        let store = memory_store();
        let original = account(1, 100);
        store.add(original.clone(), UpdatePolicy::Error).unwrap();
        let loaded: Option<Account> = store.object(1u64).unwrap();
        assert_eq!(loaded, Some(original));
    }

    #[test]
    fn test_missing_key_is_none() {
        let store = memory_store();
        let loaded: Option<Account> = store.object(42u64).unwrap();
        assert_eq!(loaded, None);
    }

    #[test]
    fn test_failed_batch_persists_nothing() {
        let store = memory_store();
        store.add(account(1, 100), UpdatePolicy::Error).unwrap();

        // Second element collides with the pre-existing key; the whole
        // batch must roll back, including the valid first element.
        let result = store.add_all([account(2, 50), account(1, 0)], UpdatePolicy::Error);
        assert!(result.is_err());

        let loaded: Option<Account> = store.object(2u64).unwrap();
        assert_eq!(loaded, None);
        let survivor: Option<Account> = store.object(1u64).unwrap();
        assert_eq!(survivor.unwrap().balance, 100);
        assert_eq!(store.objects::<Account>().count().unwrap(), 1);
    }

    #[test]
    fn test_upsert_overwrites_existing() {
        let store = memory_store();
        store.add(account(1, 100), UpdatePolicy::Error).unwrap();
        store.add(account(1, 250), UpdatePolicy::Modified).unwrap();
        let loaded: Option<Account> = store.object(1u64).unwrap();
        assert_eq!(loaded.unwrap().balance, 250);

        store.add(account(1, 300), UpdatePolicy::All).unwrap();
        let loaded: Option<Account> = store.object(1u64).unwrap();
        assert_eq!(loaded.unwrap().balance, 300);
    }

    #[test]
    fn test_predicate_filter() {
        let store = memory_store();
        store
            .add_all([account(1, 100), account(2, -20)], UpdatePolicy::Error)
            .unwrap();

        let overdrawn = store
            .objects::<Account>()
            .filtered(|a| a.balance < 0)
            .fetch()
            .unwrap();
        assert_eq!(overdrawn, vec![account(2, -20)]);
    }

    #[test]
    fn test_cascading_delete_removes_owned() {
        let store = memory_store();
        store.add(Entry { id: 10, amount: 5 }, UpdatePolicy::Error).unwrap();
        store
            .add(
                Ledger {
                    id: 1,
                    entry_ids: vec![10],
                },
                UpdatePolicy::Error,
            )
            .unwrap();

        let ledger: Ledger = store.object(1u64).unwrap().unwrap();
        store.delete(ledger, true).unwrap();

        let ledger: Option<Ledger> = store.object(1u64).unwrap();
        assert_eq!(ledger, None);
        let entry: Option<Entry> = store.object(10u64).unwrap();
        assert_eq!(entry, None);
    }

    #[test]
    fn test_detached_delete_leaves_owned() {
        let store = memory_store();
        store.add(Entry { id: 10, amount: 5 }, UpdatePolicy::Error).unwrap();
        store
            .add(
                Ledger {
                    id: 1,
                    entry_ids: vec![10],
                },
                UpdatePolicy::Error,
            )
            .unwrap();

        let ledger: Ledger = store.object(1u64).unwrap().unwrap();
        store.delete(ledger, false).unwrap();

        // The entry is orphaned but still present.
        let entry: Option<Entry> = store.object(10u64).unwrap();
        assert_eq!(entry, Some(Entry { id: 10, amount: 5 }));
    }

    #[test]
    fn test_cascading_is_noop_without_ownership() {
        let store = memory_store();
        store.add(account(1, 100), UpdatePolicy::Error).unwrap();
        store.add(account(2, 200), UpdatePolicy::Error).unwrap();

        let first: Account = store.object(1u64).unwrap().unwrap();
        store.delete(first, true).unwrap();

        assert_eq!(store.objects::<Account>().count().unwrap(), 1);
    }

    #[test]
    fn test_delete_all_empties_every_type() {
        let store = memory_store();
        store
            .add_all([account(1, 1), account(2, 2)], UpdatePolicy::Error)
            .unwrap();
        store.add(Entry { id: 10, amount: 5 }, UpdatePolicy::Error).unwrap();
        store
            .add(
                Ledger {
                    id: 1,
                    entry_ids: vec![10],
                },
                UpdatePolicy::Error,
            )
            .unwrap();

        store.delete_all().unwrap();

        assert!(store.objects::<Account>().is_empty().unwrap());
        assert!(store.objects::<Ledger>().is_empty().unwrap());
        assert!(store.objects::<Entry>().is_empty().unwrap());

        // The store stays usable after a wipe.
        store.add(account(3, 30), UpdatePolicy::Error).unwrap();
        assert_eq!(store.objects::<Account>().count().unwrap(), 1);
    }

    #[test]
    fn test_replace_object_leaves_exactly_one() {
        let store = memory_store();
        store
            .add_all([account(1, 1), account(2, 2)], UpdatePolicy::Error)
            .unwrap();

        store.replace_object(account(3, 3)).unwrap();

        let remaining = store.objects::<Account>().fetch().unwrap();
        assert_eq!(remaining, vec![account(3, 3)]);
    }

    #[test]
    fn test_replace_object_on_empty_type() {
        let store = memory_store();
        store.replace_object(account(1, 10)).unwrap();
        assert_eq!(store.objects::<Account>().count().unwrap(), 1);
    }

    #[test]
    fn test_idempotent_open_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        let config = StoreConfig::on_disk(&path);

        {
            let store = StoreManager::open(&SCHEMA, config.clone()).unwrap();
            store.add(account(1, 100), UpdatePolicy::Error).unwrap();
        }

        let store = StoreManager::open(&SCHEMA, config).unwrap();
        let loaded: Option<Account> = store.object(1u64).unwrap();
        assert_eq!(loaded, Some(account(1, 100)));
    }

    #[test]
    fn test_version_bump_discards_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");

        {
            let store =
                StoreManager::open(&SCHEMA, StoreConfig::on_disk(&path).schema_version(1))
                    .unwrap();
            store.add(account(1, 100), UpdatePolicy::Error).unwrap();
        }

        let store =
            StoreManager::open(&SCHEMA, StoreConfig::on_disk(&path).schema_version(2)).unwrap();
        assert!(store.objects::<Account>().is_empty().unwrap());
        // Recreated store is writable and re-stamped with the new version.
        store.add(account(1, 5), UpdatePolicy::Error).unwrap();
        drop(store);

        let store =
            StoreManager::open(&SCHEMA, StoreConfig::on_disk(&path).schema_version(2)).unwrap();
        assert_eq!(store.objects::<Account>().count().unwrap(), 1);
    }

    #[test]
    fn test_strict_policy_refuses_version_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");

        {
            StoreManager::open(&SCHEMA, StoreConfig::on_disk(&path).schema_version(1)).unwrap();
        }

        let result = StoreManager::open(
            &SCHEMA,
            StoreConfig::on_disk(&path)
                .schema_version(2)
                .recovery(RecoveryPolicy::Strict),
        );
        match result.err() {
            Some(Error::IncompatibleSchema { on_disk, expected }) => {
                assert_eq!(on_disk, 1);
                assert_eq!(expected, 2);
            }
            other => panic!("expected IncompatibleSchema, got {other:?}"),
        }

        // The data survives a strict refusal.
        let store =
            StoreManager::open(&SCHEMA, StoreConfig::on_disk(&path).schema_version(1)).unwrap();
        assert!(store.store_file_location().is_some());
    }

    #[test]
    fn test_store_file_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        let store = StoreManager::open(&SCHEMA, StoreConfig::on_disk(&path)).unwrap();
        assert_eq!(store.store_file_location(), Some(path.as_path()));
        drop(store);

        let store = memory_store();
        assert_eq!(store.store_file_location(), None);
    }
}

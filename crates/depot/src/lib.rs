//! Depot - Transactional facade over a schema-typed object store
//!
//! Provides a uniform access layer on top of `native_db`:
//! - Store lifecycle with a version-stamped schema and
//!   discard-on-incompatible recovery
//! - Atomic batched inserts with reject-or-overwrite policies
//! - Live predicate queries and primary-key lookup
//! - Cascading delete, whole-store clear, and replace-by-type
//!
//! The engine itself (file format, indexing, low-level migration) is
//! `native_db`'s concern; depot only standardizes how callers reach it.
//! Every mutating call runs inside a single write transaction: either the
//! whole batch commits or none of it does.

mod config;
mod error;
mod record;
mod schema;
mod store;
mod view;

pub use config::{Location, RecoveryPolicy, StoreConfig, DEFAULT_STORE_FILE};
pub use error::{Error, Result};
pub use record::{Record, UpdatePolicy};
pub use schema::{Schema, RESERVED_STAMP_MODEL_ID};
pub use store::StoreManager;
pub use view::Objects;

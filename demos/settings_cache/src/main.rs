//! Settings Cache Demo
//!
//! Walks through the depot facade with a settings-style schema: a singleton
//! preferences record maintained with replace-by-type, plus profiles that own
//! their sessions and disappear together through cascading delete.

use chrono::Utc;
use depot::{Record, RecoveryPolicy, StoreConfig, StoreManager, UpdatePolicy};
use native_db::transaction::RwTransaction;
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Singleton record: the current application preferences. Maintained with
/// `replace_object`, so the type always holds exactly one row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db]
struct Preferences {
    /// Always "current" - single row.
    #[primary_key]
    id: String,
    theme: String,
    refresh_minutes: u32,
    updated_at: String,
}

impl Record for Preferences {}

impl Preferences {
    fn current(theme: &str, refresh_minutes: u32) -> Self {
        Self {
            id: "current".to_string(),
            theme: theme.to_string(),
            refresh_minutes,
            updated_at: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 2, version = 1)]
#[native_db]
struct Profile {
    #[primary_key]
    id: u64,
    name: String,
    session_ids: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 3, version = 1)]
#[native_db]
struct Session {
    #[primary_key]
    id: u64,
    token: String,
    opened_at: String,
}

impl Record for Session {}

impl Record for Profile {
    fn delete_owned(&self, rw: &RwTransaction<'_>) -> depot::Result<()> {
        for id in &self.session_ids {
            if let Some(session) = rw.get().primary::<Session>(*id)? {
                rw.remove(session)?;
            }
        }
        Ok(())
    }
}

static SCHEMA: LazyLock<depot::Schema> = LazyLock::new(|| {
    let mut schema = depot::Schema::new();
    schema.define::<Preferences>().unwrap();
    schema.define::<Profile>().unwrap();
    schema.define::<Session>().unwrap();
    schema
});

fn session(id: u64, token: &str) -> Session {
    Session {
        id,
        token: token.to_string(),
        opened_at: Utc::now().to_rfc3339(),
    }
}

fn main() -> depot::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Depot Settings Cache Demo ===\n");

    let config = StoreConfig::on_disk("settings_cache.db")
        .schema_version(1)
        .recovery(RecoveryPolicy::DiscardIfIncompatible);
    let store = StoreManager::setup(&SCHEMA, Some(config));
    if let Some(path) = store.store_file_location() {
        println!("Store file: {}\n", path.display());
    }

    // Start from a clean slate so repeated runs behave the same.
    store.delete_all()?;

    // Two profiles, each owning its sessions.
    store.add_all(
        [session(10, "alice-desktop"), session(11, "alice-phone")],
        UpdatePolicy::Error,
    )?;
    store.add(session(20, "bob-desktop"), UpdatePolicy::Error)?;
    store.add_all(
        [
            Profile {
                id: 1,
                name: "alice".to_string(),
                session_ids: vec![10, 11],
            },
            Profile {
                id: 2,
                name: "bob".to_string(),
                session_ids: vec![20],
            },
        ],
        UpdatePolicy::Error,
    )?;
    println!(
        "Seeded {} profiles and {} sessions",
        store.objects::<Profile>().count()?,
        store.objects::<Session>().count()?
    );

    // Singleton preferences via replace-by-type: no matter how many rows the
    // type held before, it ends with exactly this one.
    store.replace_object(Preferences::current("dark", 15))?;
    store.replace_object(Preferences::current("light", 5))?;
    let prefs: Preferences = store
        .object("current".to_string())?
        .expect("preferences were just replaced");
    println!(
        "Preferences: theme={} refresh={}min (updated {})",
        prefs.theme, prefs.refresh_minutes, prefs.updated_at
    );

    // Predicate query: profiles with more than one session.
    let multi = store
        .objects::<Profile>()
        .filtered(|p| p.session_ids.len() > 1)
        .fetch()?;
    for profile in &multi {
        println!("Multi-device profile: {}", profile.name);
    }

    // Cascading delete: alice's sessions go away with her profile.
    let alice: Profile = store.object(1u64)?.expect("alice was seeded");
    store.delete(alice, true)?;
    println!(
        "After deleting alice: {} profiles, {} sessions",
        store.objects::<Profile>().count()?,
        store.objects::<Session>().count()?
    );

    Ok(())
}

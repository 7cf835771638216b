// Copyright 2023 Remi Bernotavicius

use diesel::connection::SimpleConnection as _;
use diesel::prelude::Connection as _;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::path::Path;

pub mod models;
pub mod schema;

pub type Connection = diesel::sqlite::SqliteConnection;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// How long a connection waits on another writer before SQLite reports the database as locked.
const BUSY_TIMEOUT_MS: u32 = 5_000;

type SetupError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn configure(connection: &mut Connection) -> Result<(), SetupError> {
    connection.batch_execute(&format!(
        "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"
    ))?;
    let applied = connection.run_pending_migrations(MIGRATIONS)?;
    for version in applied {
        log::info!("applied migration {version}");
    }
    Ok(())
}

pub fn establish_connection(path: impl AsRef<Path>) -> Result<Connection, SetupError> {
    let path = path.as_ref();
    let url = path
        .to_str()
        .ok_or_else(|| format!("database path {path:?} is not valid UTF-8"))?;
    let mut connection = Connection::establish(url)?;
    configure(&mut connection)?;
    Ok(connection)
}

/// A private, migrated database that disappears with the connection.
pub fn establish_in_memory() -> Result<Connection, SetupError> {
    let mut connection = Connection::establish(":memory:")?;
    configure(&mut connection)?;
    Ok(connection)
}

#[test]
fn migrations() {
    let mut conn = establish_in_memory().unwrap();
    assert!(!conn.has_pending_migration(MIGRATIONS).unwrap());

    conn.revert_all_migrations(MIGRATIONS).unwrap();
    assert!(conn.has_pending_migration(MIGRATIONS).unwrap());

    conn.run_pending_migrations(MIGRATIONS).unwrap();
    assert!(!conn.has_pending_migration(MIGRATIONS).unwrap());
}

#[test]
fn on_disk_database_is_reopened() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.sqlite");

    establish_connection(&path).unwrap();
    let mut conn = establish_connection(&path).unwrap();
    assert!(!conn.has_pending_migration(MIGRATIONS).unwrap());
}

pub mod credentials;
pub mod error;
pub mod migrations;
pub mod models;
pub mod queries;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, Transaction};
use tracing::{info, warn};

pub use error::{IntegrityKind, StoreError};
pub use models::{MessageRow, NewMessage, NewUser, UserRow};

/// SQLite-backed store. A single connection guarded by a mutex; every unit
/// of work runs inside a transaction opened by [`Database::with_session`].
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file and bring the schema up to date.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        // WAL for concurrent readers; foreign keys are off by default in
        // SQLite and the schema depends on them.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory store with the same schema and pragmas. Used by
    /// tests; nothing persists past the value.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run one unit of work. A transaction is opened before `f` runs and
    /// ends with it: commit when `f` returns Ok, rollback when it returns
    /// Err. A rolled-back session leaves no trace and the store stays
    /// usable for the next one.
    pub fn with_session<T>(
        &self,
        f: impl FnOnce(&Session<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let tx = conn.transaction()?;
        let session = Session { tx };
        match f(&session) {
            Ok(value) => {
                session.tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rb) = session.tx.rollback() {
                    warn!("rollback after failed session also failed: {rb}");
                }
                Err(err)
            }
        }
    }
}

/// One transactional unit of work. The entity operations live in
/// [`queries`]; commit and rollback happen exactly once, on the way out of
/// [`Database::with_session`].
pub struct Session<'conn> {
    pub(crate) tx: Transaction<'conn>,
}

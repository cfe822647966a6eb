use std::fmt;

use rusqlite::{ErrorCode, ffi};
use thiserror::Error;

/// Which constraint class a write broke, derived from SQLite's extended
/// result codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityKind {
    /// UNIQUE or PRIMARY KEY collision: duplicate username or email,
    /// duplicate follow edge, pinned id already taken.
    Unique,
    /// A write referenced a row that does not exist.
    ForeignKey,
    /// A NOT NULL column was written as NULL.
    NotNull,
    /// A CHECK failed, e.g. message text over the length bound.
    Check,
    /// Any other constraint class.
    Other,
}

impl fmt::Display for IntegrityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unique => "unique",
            Self::ForeignKey => "foreign key",
            Self::NotNull => "not null",
            Self::Check => "check",
            Self::Other => "constraint",
        })
    }
}

/// Errors surfaced by the store.
///
/// Integrity is the one variant callers branch on; the web layer maps it to
/// 409 and everything else to 500. Absent rows are not errors: lookups
/// return `Option`, and authenticate returns `Ok(None)` for unknown user
/// and wrong password alike.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} constraint violated: {detail}")]
    Integrity {
        kind: IntegrityKind,
        detail: String,
    },

    #[error("password hashing failed: {0}")]
    Credentials(argon2::password_hash::Error),

    #[error("store lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Sqlite(rusqlite::Error),
}

impl StoreError {
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity { .. })
    }

    pub fn integrity_kind(&self) -> Option<IntegrityKind> {
        match self {
            Self::Integrity { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg) if e.code == ErrorCode::ConstraintViolation => {
                let kind = match e.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        IntegrityKind::Unique
                    }
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => IntegrityKind::ForeignKey,
                    ffi::SQLITE_CONSTRAINT_NOTNULL => IntegrityKind::NotNull,
                    ffi::SQLITE_CONSTRAINT_CHECK => IntegrityKind::Check,
                    _ => IntegrityKind::Other,
                };
                let detail = msg.clone().unwrap_or_else(|| e.to_string());
                Self::Integrity { kind, detail }
            }
            _ => Self::Sqlite(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::*;

    fn scratch() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        conn.execute_batch(
            "CREATE TABLE parent (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE);
             CREATE TABLE child (
                 id INTEGER PRIMARY KEY,
                 parent_id INTEGER NOT NULL REFERENCES parent(id),
                 n INTEGER CHECK (n < 10)
             );",
        )
        .unwrap();
        conn
    }

    fn classify(result: Result<usize, rusqlite::Error>) -> StoreError {
        StoreError::from(result.unwrap_err())
    }

    #[test]
    fn unique_violations_classify_as_unique() {
        let conn = scratch();
        conn.execute("INSERT INTO parent (name) VALUES ('a')", [])
            .unwrap();
        let err = classify(conn.execute("INSERT INTO parent (name) VALUES ('a')", []));
        assert_eq!(err.integrity_kind(), Some(IntegrityKind::Unique));
    }

    #[test]
    fn primary_key_violations_classify_as_unique() {
        let conn = scratch();
        conn.execute("INSERT INTO parent (id, name) VALUES (1, 'a')", [])
            .unwrap();
        let err = classify(conn.execute("INSERT INTO parent (id, name) VALUES (1, 'b')", []));
        assert_eq!(err.integrity_kind(), Some(IntegrityKind::Unique));
    }

    #[test]
    fn foreign_key_violations_classify_as_foreign_key() {
        let conn = scratch();
        let err = classify(conn.execute("INSERT INTO child (parent_id) VALUES (42)", []));
        assert_eq!(err.integrity_kind(), Some(IntegrityKind::ForeignKey));
    }

    #[test]
    fn not_null_violations_classify_as_not_null() {
        let conn = scratch();
        let err = classify(conn.execute("INSERT INTO parent (name) VALUES (NULL)", []));
        assert_eq!(err.integrity_kind(), Some(IntegrityKind::NotNull));
    }

    #[test]
    fn check_violations_classify_as_check() {
        let conn = scratch();
        conn.execute("INSERT INTO parent (name) VALUES ('a')", [])
            .unwrap();
        let err = classify(conn.execute("INSERT INTO child (parent_id, n) VALUES (1, 99)", []));
        assert_eq!(err.integrity_kind(), Some(IntegrityKind::Check));
    }

    #[test]
    fn non_constraint_errors_pass_through_as_sqlite() {
        let conn = scratch();
        let err = StoreError::from(
            conn.execute("INSERT INTO no_such_table (x) VALUES (1)", [])
                .unwrap_err(),
        );
        assert!(!err.is_integrity());
        assert!(matches!(err, StoreError::Sqlite(_)));
    }
}

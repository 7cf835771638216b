// Copyright 2023 Remi Bernotavicius

use diesel::result::{DatabaseErrorKind, Error as DieselError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    /// Bad credentials. Deliberately says nothing about which part was wrong.
    #[error("invalid username or password")]
    AuthFailure,

    #[error("database error: {0}")]
    Database(#[source] DieselError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// True when SQLite refused a write because another connection holds the lock.
    pub fn is_lock_contention(&self) -> bool {
        match self {
            Self::Database(DieselError::DatabaseError(_, info)) => {
                let message = info.message();
                message.contains("locked") || message.contains("busy")
            }
            _ => false,
        }
    }
}

/// Replaces the raw constraint message of a unique violation with one naming the duplicate.
pub(crate) fn conflict_or(message: impl FnOnce() -> String) -> impl FnOnce(DieselError) -> Error {
    move |e| match Error::from(e) {
        Error::Conflict(_) => Error::Conflict(message()),
        e => e,
    }
}

impl From<DieselError> for Error {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::Conflict(info.message().to_owned())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                Self::Conflict(info.message().to_owned())
            }
            DieselError::NotFound => Self::NotFound {
                entity: "row",
                key: "requested".into(),
            },
            e => Self::Database(e),
        }
    }
}

#[test]
fn unique_violation_is_conflict() {
    #[derive(Debug)]
    struct Info;

    impl diesel::result::DatabaseErrorInformation for Info {
        fn message(&self) -> &str {
            "UNIQUE constraint failed: users.name"
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            None
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            None
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    let e = Error::from(DieselError::DatabaseError(
        DatabaseErrorKind::UniqueViolation,
        Box::new(Info),
    ));
    assert!(matches!(e, Error::Conflict(_)));
    assert!(!e.is_lock_contention());
    assert_eq!(
        e.to_string(),
        "conflict: UNIQUE constraint failed: users.name"
    );
}

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the document store. Nothing is retried internally.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid category: {0}")]
    InvalidCategory(String),

    #[error("failed to write {}: {source}", .path.display())]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", .path.display())]
    StorageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("metadata file {} is corrupt: {source}", .path.display())]
    MetadataCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::StorageWrite {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::StorageRead {
            path: path.into(),
            source,
        }
    }
}

/// Errors from admin login, session checks and password changes.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("unauthorized")]
    Unauthorized,

    #[error("password must be at least {0} characters")]
    WeakPassword(usize),

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("password task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("password file {} is corrupt: {source}", .path.display())]
    PasswordFileCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("password file {} is unavailable: {source}", .path.display())]
    PasswordFileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type AuthResult<T> = Result<T, AuthError>;

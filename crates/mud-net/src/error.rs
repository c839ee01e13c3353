//! Error types for `mud-net`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("envelope encode error: {0}")]
    Encode(#[from] bincode::Error),

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("unknown connection id {0}")]
    UnknownConnection(u64),

    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    #[error("content load error: {0}")]
    ContentLoad(String),
}

pub type NetResult<T> = Result<T, NetError>;

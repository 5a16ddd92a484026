use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Anything the storage backend raised: constraint violations, busy
    /// timeouts, I/O failures. Passed through unchanged.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// The background worker failed to deliver a result (task panic or
    /// runtime shutdown). The submitted call is never retried.
    #[error("worker failure: {0}")]
    Worker(String),

    #[error("invalid connection url: {0}")]
    InvalidUrl(String),

    /// Session-lifecycle misuse: operating on a closed session or outside
    /// an active transaction.
    #[error("session error: {0}")]
    Session(String),

    #[error("lock error: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}

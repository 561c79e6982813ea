use thiserror::Error;

/// Local persistence failures.
///
/// `Unavailable` (the store cannot be opened or migrated) is fatal to the
/// session: no offline capability exists without it. `Io` is a single
/// read/write failure and is retryable.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("local store unavailable: {0}")]
    Unavailable(String),

    #[error("local store I/O error: {0}")]
    Io(String),
}

impl StoreError {
    pub fn unavailable(msg: impl ToString) -> Self {
        Self::Unavailable(msg.to_string())
    }

    pub fn io(msg: impl ToString) -> Self {
        Self::Io(msg.to_string())
    }

    /// Whether retrying the same operation can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Io(err.to_string())
    }
}

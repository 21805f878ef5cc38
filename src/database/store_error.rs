use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be opened or the schema could not be created.
    #[error("score store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
    #[error("score store operation failed: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

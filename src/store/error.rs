use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to replace store file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

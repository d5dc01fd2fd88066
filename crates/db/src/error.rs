#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] rusqlite::Error),
    #[error("value {value} does not fit column {column}")]
    ValueOutOfRange { column: &'static str, value: u64 },
}

pub type Result<T> = std::result::Result<T, DbError>;

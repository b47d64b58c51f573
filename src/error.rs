use thiserror::Error;

/// Error taxonomy shared by every component of the storage engine.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid column type, duplicate column/table name, or a non-nullable
    /// column missing on insert with no default.
    #[error("schema error: {0}")]
    Schema(String),

    /// A table or database directory was looked up and does not exist.
    /// Per-id lookups use `Option`/`bool` sentinels instead of this variant.
    #[error("not found: {0}")]
    NotFound(String),

    /// A row block failed to decode: bad status byte, wrong block size,
    /// or invalid UTF-8 in a Text column.
    #[error("corrupt row: {0}")]
    CorruptRow(String),

    /// Underlying file operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A Text/Buffer value exceeded its column capacity while strict mode
    /// (truncation disabled) was in effect.
    #[error("buffer overflow: {0}")]
    BufferOverflow(String),

    /// Metadata or schema JSON failed to (de)serialize.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

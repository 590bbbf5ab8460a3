//! Storage error types.

/// Errors that can occur while reading or writing the user table.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to read the store file.
    #[error("failed to read store: {0}")]
    ReadError(#[source] std::io::Error),

    /// Failed to write the store file.
    #[error("failed to write store: {0}")]
    WriteError(#[source] std::io::Error),

    /// The store file is not valid RON.
    #[error("failed to parse store: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    /// The table could not be serialized.
    #[error("failed to serialize store: {0}")]
    SerializeError(#[source] ron::Error),

    /// Another thread panicked while holding the table lock.
    #[error("store lock poisoned")]
    Poisoned,

    /// No user has this id.
    #[error("unknown user id {0}")]
    UnknownUser(u64),
}

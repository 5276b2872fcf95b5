use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("build error: {0}")]
    Build(#[from] BuildError),
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("query error: {0}")]
    Query(#[from] QueryError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid index variant {short_id}: {reason}")]
    InvalidCombination { short_id: String, reason: &'static str },
    #[error("unknown index identifier {0:?}")]
    UnknownIdentifier(String),
    #[error("invalid config file: {0}")]
    File(String),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("document {0:?} already indexed")]
    DuplicateDocument(String),
    #[error("document {0:?} is not in the index")]
    UnknownDocument(String),
    #[error("build cancelled")]
    Cancelled,
    #[error("another build or update is in progress")]
    Busy,
    #[error("index is not ready")]
    NotReady,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("no persisted index named {0}")]
    IndexNotFound(String),
    #[error("persisted index {short_id} is corrupt: {reason}")]
    CorruptIndex { short_id: String, reason: String },
    #[error("persisted index belongs to {found}, expected {expected}")]
    DescriptorMismatch { expected: String, found: String },
    #[error("storage backend: {0}")]
    Backend(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("malformed query at {position}: {message}")]
    Parse { position: usize, message: String },
    #[error("no index loaded")]
    IndexNotLoaded,
}

/// Failure reported by a tokenizer for a single document. The builder counts and skips these.
#[derive(Debug, Error)]
#[error("tokenizer rejected content: {0}")]
pub struct TokenizeError(pub String);

impl PersistenceError {
    pub(crate) fn corrupt(short_id: &str, reason: impl ToString) -> Self {
        PersistenceError::CorruptIndex { short_id: short_id.to_string(), reason: reason.to_string() }
    }
}

impl From<sled::Error> for PersistenceError {
    fn from(e: sled::Error) -> Self {
        match e {
            sled::Error::Io(io) => PersistenceError::Io(io),
            other => PersistenceError::Backend(other.to_string()),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Persistence(PersistenceError::Io(e))
    }
}

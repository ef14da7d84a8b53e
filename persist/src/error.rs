use std::io;
use std::path::PathBuf;

use hwdb_core::StoreError;
use hwdb_types::{CoordinateError, UnknownVariant};

/// Failures of loading or saving a database file.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The text is not valid YAML, or a document does not have the expected
    /// shape.
    #[error("document {document}: {source}")]
    Parse {
        document: usize,
        #[source]
        source: serde_yaml::Error,
    },
    /// A well-formed document with values the database cannot hold.
    #[error("document {document}: {message}")]
    Invalid { document: usize, message: String },
    #[error("document {document}: {source}")]
    Store {
        document: usize,
        #[source]
        source: StoreError,
    },
    #[error("failed to serialize database: {0}")]
    Serialize(#[source] serde_yaml::Error),
    #[error("refusing to load into a non-empty database")]
    NotEmpty,
}

impl PersistError {
    pub(crate) fn in_document(document: usize, error: DocumentError) -> Self {
        match error {
            DocumentError::Parse(source) => Self::Parse { document, source },
            DocumentError::Store(source) => Self::Store { document, source },
            DocumentError::Invalid(message) => Self::Invalid { document, message },
        }
    }
}

/// Failure inside one document; the caller attaches the document index.
#[derive(Debug, thiserror::Error)]
pub(crate) enum DocumentError {
    #[error(transparent)]
    Parse(#[from] serde_yaml::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Invalid(String),
}

impl From<CoordinateError> for DocumentError {
    fn from(error: CoordinateError) -> Self {
        Self::Invalid(error.to_string())
    }
}

impl From<UnknownVariant> for DocumentError {
    fn from(error: UnknownVariant) -> Self {
        Self::Invalid(error.to_string())
    }
}

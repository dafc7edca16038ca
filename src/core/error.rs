use thiserror::Error as ThisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Parse,
    Corrupted,
    /// No index is persisted at the location.
    IndexNotFound,
    /// Unknown or deleted document or frame id.
    DocumentNotFound,
    SettingNotFound,
    /// No plugin instance stored under the given type and settings, or id.
    PluginNotFound,
    /// Persisted storage or schema version differs and cannot be migrated.
    SchemaMismatch,
    /// A migration step failed; the index stays at the last completed version.
    Migration,
    IndexWriteLocked,
    /// A field value has the wrong type for its field.
    Type,
    InvalidArgument,
    /// Term absent from a field's vocabulary.
    KeyNotFound,
    UnknownField,
    NonIndexedField,
    UnsupportedOperator,
    InvalidState,
}

#[derive(Debug, ThisError)]
#[error("{kind:?}: {context}")]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: impl Into<String>) -> Self {
        Error { kind, context: context.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub(crate) fn invalid_state(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidState, context)
    }

    pub(crate) fn invalid_argument(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidArgument, context)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: err.to_string(),
        }
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: format!("atomic replace failed: {}", err.error),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

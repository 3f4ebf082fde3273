use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Parse,
    NotFound,
    InvalidArgument,
    Internal,
    InvalidState,
    /// Model descriptor or analyzer setup is wrong (caller bug, never retried)
    Config,
    /// An entity instance lacks an attribute its model declares searchable
    DataShape,
    /// Failure reported by the text-index engine
    Index,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context }
    }

    pub fn config(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Config, context.into())
    }

    pub fn data_shape(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::DataShape, context.into())
    }

    pub fn invalid_argument(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidArgument, context.into())
    }

    pub fn not_found(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::NotFound, context.into())
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: err.to_string(),
        }
    }
}

impl From<tantivy::TantivyError> for Error {
    fn from(err: tantivy::TantivyError) -> Self {
        Error {
            kind: ErrorKind::Index,
            context: err.to_string(),
        }
    }
}

impl From<tantivy::query::QueryParserError> for Error {
    fn from(err: tantivy::query::QueryParserError) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: format!("Query parse error: {}", err),
        }
    }
}

impl From<tantivy::directory::error::OpenDirectoryError> for Error {
    fn from(err: tantivy::directory::error::OpenDirectoryError) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: format!("Index directory error: {}", err),
        }
    }
}

impl From<tantivy::directory::error::OpenReadError> for Error {
    fn from(err: tantivy::directory::error::OpenReadError) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: format!("Index read error: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

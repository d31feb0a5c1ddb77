use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for mesh construction and transform operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which raw import array an index refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Position,
    Texcoord,
    Normal,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Position => f.write_str("position"),
            IndexKind::Texcoord => f.write_str("texcoord"),
            IndexKind::Normal => f.write_str("normal"),
        }
    }
}

/// Errors raised while setting up the scene or computing transforms
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// `index` is the 1-based value as written in the source
    #[error("Face references {kind} index {index}, but only {len} are defined")]
    Index {
        kind: IndexKind,
        index: i64,
        len: usize,
    },

    #[error("Degenerate transform: linear part of the model matrix is singular")]
    DegenerateTransform,

    #[error("Resource not found: {}", .0.display())]
    ResourceMissing(PathBuf),

    #[error("Graphics backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}

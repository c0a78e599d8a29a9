use crate::models::Algorithm;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, HashError>;

/// Numeric codes carried by backend failures.
pub mod codes {
    /// The backend rejected the requested output size.
    pub const INVALID_OUTPUT_SIZE: i32 = -1;
    /// The output buffer did not match the digest length.
    pub const BUFFER_SIZE_MISMATCH: i32 = -2;
    /// The message grew past the algorithm's length limit.
    pub const MESSAGE_TOO_LONG: i32 = -3;
}

/// Misuse of a [`crate::hashers::Hasher`]. Never expected from a correct caller.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicError {
    #[error("cannot update a hash after it has been finalized")]
    UpdateAfterFinalize,

    #[error("cannot finalize a hash twice")]
    FinalizeTwice,

    #[error("hash must be finalized before reading the digest")]
    DigestBeforeFinalize,
}

#[derive(Error, Debug)]
pub enum HashError {
    #[error(transparent)]
    Logic(#[from] LogicError),

    #[error("failed to initialize {algorithm} hash (code {code})")]
    Initialization { algorithm: Algorithm, code: i32 },

    #[error("failed to update {algorithm} hash (code {code})")]
    Update { algorithm: Algorithm, code: i32 },

    #[error("failed to finalize {algorithm} hash (code {code})")]
    Finalization { algorithm: Algorithm, code: i32 },

    #[error("no algorithms requested")]
    NoAlgorithms,

    #[error("I/O error while {operation} {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    pub fn io(path: impl Into<PathBuf>, operation: &'static str, source: std::io::Error) -> Self {
        HashError::Io { path: path.into(), operation, source }
    }

    /// Backend code, for the three backend failure kinds.
    pub fn code(&self) -> Option<i32> {
        match self {
            HashError::Initialization { code, .. }
            | HashError::Update { code, .. }
            | HashError::Finalization { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn algorithm(&self) -> Option<Algorithm> {
        match self {
            HashError::Initialization { algorithm, .. }
            | HashError::Update { algorithm, .. }
            | HashError::Finalization { algorithm, .. } => Some(*algorithm),
            _ => None,
        }
    }

    pub fn is_backend_failure(&self) -> bool {
        self.code().is_some()
    }
}

/// Rejections of the input file, reported before any hashing starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("No file passed")]
    NoFile,

    #[error("File passed doesn't exist")]
    Missing(PathBuf),

    #[error("File passed is not a regular file")]
    NotAFile(PathBuf),

    #[error("File passed is empty")]
    Empty(PathBuf),
}

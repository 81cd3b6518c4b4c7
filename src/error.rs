//! Error type shared by every stage of compression and decompression.

use std::{fmt, io, path::PathBuf};

use crate::compression::header::MAX_PASSWORD_LEN;

/// Where a stream corruption was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    CodeTable,
    Body,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::CodeTable => write!(f, "code table"),
            Section::Body => write!(f, "body"),
        }
    }
}

/// Errors produced while building or reading an archive.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// A root input named on the command line does not exist.
    #[error("{0}: file does not exist")]
    InputNotFound(PathBuf),

    /// The password is empty or too long.
    #[error("password must be 1 to {} bytes long, got {0}", MAX_PASSWORD_LEN)]
    PasswordInvalid(usize),

    /// Internal consistency failure while emitting codes.
    #[error("stream corruption in {section}: {detail}")]
    StreamCorruption { section: Section, detail: String },

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A file or directory name does not fit in the one byte length field.
    #[error("{0}: name is longer than 255 bytes")]
    NameTooLong(PathBuf),

    /// A directory (or the root list) does not fit in the two byte count field.
    #[error("{0}: more than 65535 entries")]
    TooManyEntries(PathBuf),

    /// The archive does not follow the expected grammar.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// The archive ended before the grammar was complete.
    #[error("unexpected end of archive")]
    UnexpectedEof,

    /// Refusing to overwrite an existing output.
    #[error("{0}: output already exists (use --force to overwrite)")]
    OutputExists(PathBuf),

    /// The requested layout cannot hold the given inputs.
    #[error("layout error: {0}")]
    Layout(String),

    /// The worker pool could not be created.
    #[error("worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl ArchiveError {
    /// Process exit status for this error. Corruption keeps the historical 1 (table) and 2 (body).
    pub fn exit_code(&self) -> i32 {
        match self {
            ArchiveError::StreamCorruption {
                section: Section::CodeTable,
                ..
            } => 1,
            ArchiveError::StreamCorruption {
                section: Section::Body,
                ..
            } => 2,
            ArchiveError::InputNotFound(_) => 3,
            ArchiveError::PasswordInvalid(_) => 4,
            ArchiveError::Io(_) => 5,
            ArchiveError::NameTooLong(_) | ArchiveError::TooManyEntries(_) => 6,
            ArchiveError::InvalidArchive(_) | ArchiveError::UnexpectedEof => 7,
            ArchiveError::OutputExists(_) => 8,
            ArchiveError::Layout(_) => 9,
            ArchiveError::WorkerPool(_) => 10,
        }
    }

    pub(crate) fn corrupt(section: Section, detail: impl Into<String>) -> Self {
        ArchiveError::StreamCorruption {
            section,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

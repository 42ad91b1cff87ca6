//! VFS Error Types

use std::io;
use std::path::Path;
use thiserror::Error;

/// Result type for VFS operations
pub type VfsResult<T> = Result<T, VfsError>;

/// Error type for VFS operations
///
/// Errors carry owned strings so they can be cloned and compared; a filter
/// that rejects a call hands its error to the caller untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VfsError {
    /// File or directory not found
    #[error("Path not found: {path}")]
    NotFound { path: String },

    /// Permission denied
    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    /// Path already exists
    #[error("Path already exists: {path}")]
    AlreadyExists { path: String },

    /// A path component that should be a directory is a file
    #[error("Not a directory: {path}")]
    NotADirectory { path: String },

    /// A file operation was attempted on a directory
    #[error("Is a directory: {path}")]
    IsADirectory { path: String },

    /// Directory still has children
    #[error("Directory not empty: {path}")]
    DirectoryNotEmpty { path: String },

    /// Invalid path
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// IO error
    #[error("IO error: {message}")]
    Io { message: String },

    /// Custom error message
    #[error("{message}")]
    Custom { message: String },
}

impl VfsError {
    pub fn not_found(path: impl Into<String>) -> Self {
        VfsError::NotFound { path: path.into() }
    }

    pub fn permission_denied(path: impl Into<String>) -> Self {
        VfsError::PermissionDenied { path: path.into() }
    }

    pub fn custom(message: impl Into<String>) -> Self {
        VfsError::Custom {
            message: message.into(),
        }
    }

    /// Map an `io::Error` raised while operating on `path`.
    pub fn from_io(err: io::Error, path: &Path) -> Self {
        let path = path.to_string_lossy().to_string();
        match err.kind() {
            io::ErrorKind::NotFound => VfsError::NotFound { path },
            io::ErrorKind::PermissionDenied => VfsError::PermissionDenied { path },
            io::ErrorKind::AlreadyExists => VfsError::AlreadyExists { path },
            io::ErrorKind::NotADirectory => VfsError::NotADirectory { path },
            io::ErrorKind::IsADirectory => VfsError::IsADirectory { path },
            io::ErrorKind::DirectoryNotEmpty => VfsError::DirectoryNotEmpty { path },
            _ => err.into(),
        }
    }
}

impl From<io::Error> for VfsError {
    fn from(err: io::Error) -> Self {
        VfsError::Io {
            message: err.to_string(),
        }
    }
}

impl From<VfsError> for io::Error {
    fn from(err: VfsError) -> Self {
        let kind = match &err {
            VfsError::NotFound { .. } => io::ErrorKind::NotFound,
            VfsError::PermissionDenied { .. } => io::ErrorKind::PermissionDenied,
            VfsError::AlreadyExists { .. } => io::ErrorKind::AlreadyExists,
            VfsError::NotADirectory { .. } => io::ErrorKind::NotADirectory,
            VfsError::IsADirectory { .. } => io::ErrorKind::IsADirectory,
            VfsError::DirectoryNotEmpty { .. } => io::ErrorKind::DirectoryNotEmpty,
            VfsError::InvalidPath { .. } => io::ErrorKind::InvalidInput,
            VfsError::Io { .. } | VfsError::Custom { .. } => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

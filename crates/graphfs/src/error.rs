//! Error types for graphfs operations.
//!
//! All fallible operations return [`Result<T>`]. The filesystem kinds
//! ([`GraphError::AlreadyExists`], [`GraphError::DoesNotExist`],
//! [`GraphError::IsAFile`], [`GraphError::IsAFolder`],
//! [`GraphError::NotPermitted`]) are raised at the point a precondition fails; [`GraphError::io_kind`] maps every variant onto
//! [`std::io::ErrorKind`] for the syscall binding layer.

use thiserror::Error;

/// Result type alias for graphfs operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Error type for path resolution, node operations and backend access.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Create was requested where the match already resolves
    #[error("Already exists: {path}")]
    AlreadyExists {
        /// Filesystem path of the match
        path: String,
    },

    /// Operation on a match that does not resolve
    #[error("Does not exist: {path}")]
    DoesNotExist {
        /// Filesystem path of the match
        path: String,
    },

    /// Folder operation on a file
    #[error("Is a file: {path}")]
    IsAFile {
        /// Filesystem path of the match
        path: String,
    },

    /// File operation on a folder
    #[error("Is a folder: {path}")]
    IsAFolder {
        /// Filesystem path of the match
        path: String,
    },

    /// The entry exists but the operation may not change it
    #[error("Operation not permitted: {path}")]
    NotPermitted {
        /// Filesystem path of the match
        path: String,
    },

    /// Backend or key/value storage failure
    #[error("Storage error: {message}")]
    Storage {
        /// Detailed error message
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error details
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The stored graph violates a structural invariant (e.g. a hierarchy cycle)
    #[error("Consistency error: {message}")]
    Consistency {
        /// Description of the violated invariant
        message: String,
    },

    /// Template text could not be compiled
    #[error("Template error: {message}")]
    Template {
        /// What was wrong and where
        message: String,
    },

    /// Configuration could not be loaded or compiled
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// What was wrong
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl GraphError {
    /// Create a storage error from a message and optional source.
    pub fn storage<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Create a serialization error from a message and optional source.
    pub fn serialization<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Serialization {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Create a configuration error from a message and optional source.
    pub fn config<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::InvalidConfig {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Shorthand for [`GraphError::DoesNotExist`].
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::DoesNotExist { path: path.into() }
    }

    /// Shorthand for [`GraphError::AlreadyExists`].
    pub fn exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists { path: path.into() }
    }

    /// The standard I/O error kind a filesystem binding should report.
    pub fn io_kind(&self) -> std::io::ErrorKind {
        use std::io::ErrorKind;
        match self {
            GraphError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            GraphError::DoesNotExist { .. } => ErrorKind::NotFound,
            GraphError::IsAFile { .. } => ErrorKind::NotADirectory,
            GraphError::IsAFolder { .. } => ErrorKind::IsADirectory,
            GraphError::NotPermitted { .. } => ErrorKind::PermissionDenied,
            GraphError::Storage { .. } | GraphError::Consistency { .. } => ErrorKind::Other,
            GraphError::Serialization { .. } | GraphError::Template { .. } => ErrorKind::InvalidData,
            GraphError::InvalidConfig { .. } => ErrorKind::InvalidInput,
        }
    }

    /// Shorthand for [`GraphError::NotPermitted`].
    pub fn not_permitted(path: impl Into<String>) -> Self {
        Self::NotPermitted { path: path.into() }
    }

    /// True for the filesystem precondition kinds.
    pub fn is_filesystem_kind(&self) -> bool {
        matches!(
            self,
            GraphError::AlreadyExists { .. }
                | GraphError::DoesNotExist { .. }
                | GraphError::IsAFile { .. }
                | GraphError::IsAFolder { .. }
                | GraphError::NotPermitted { .. }
        )
    }
}

//! Error types for Dud
//!
//! All modules use `DudResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Dud operations
pub type DudResult<T> = Result<T, DudError>;

/// All errors that can occur in Dud
#[derive(Error, Debug)]
pub enum DudError {
    // Workspace errors
    #[error("No dud workspace found: no .dud directory at or above {0}")]
    NotAWorkspace(PathBuf),

    #[error("Workspace already initialized at {0}")]
    WorkspaceExists(PathBuf),

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // Stage and index errors
    #[error("Invalid stage file {path}: {reason}")]
    StageInvalid { path: PathBuf, reason: String },

    #[error("Stage {0} is not in the index")]
    UnknownStage(String),

    #[error("Stage already in the index: {0}")]
    StageExists(String),

    #[error("Output {artifact} is declared by both {first} and {second}")]
    IndexConflict {
        artifact: String,
        first: String,
        second: String,
    },

    // Run errors
    #[error("Dependency cycle detected at stage {stage}")]
    CycleDetected { stage: String },

    #[error("Stage {stage} command failed: `{command}`: {reason}")]
    CommandFailed {
        stage: String,
        command: String,
        reason: String,
    },

    // Cache errors
    #[error("Cache object {checksum} is missing")]
    ObjectMissing { checksum: String },

    #[error("Artifact {path} has no checksum")]
    MissingChecksum { path: String },

    #[error("Invalid checksum: {0}")]
    InvalidChecksum(String),

    #[error("Cache {op} failed for {path}: {source}")]
    CacheIo {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Run-cache table errors
    #[error("Run cache error at {path}: {reason}")]
    TableIo { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl DudError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a cache IO error for a sub-operation on a path
    pub fn cache_io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheIo {
            op,
            path: path.into(),
            source,
        }
    }

    /// Create a table IO error
    pub fn table_io(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::TableIo {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NotAWorkspace(_) => Some("Run: dud init"),
            Self::WorkspaceExists(_) => Some("Pass --force to reinitialize"),
            Self::UnknownStage(_) => Some("Register it with: dud stage add <file>"),
            _ => None,
        }
    }
}

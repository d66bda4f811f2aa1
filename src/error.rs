//! Error types for the viewer core
//!
//! Asset loading failures are kept distinct from "nothing was hit" (which is
//! not an error at all, see [`crate::gfx::picking`]) and from placement
//! rejections.

use std::time::Duration;
use thiserror::Error;

/// Errors produced while fetching or decoding a mesh asset
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("asset not found: {path}")]
    NotFound { path: String },

    #[error("failed to fetch {path}: {source}")]
    Fetch {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed mesh data in {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("mesh {path} contains no triangles")]
    Empty { path: String },

    #[error("loading {path} timed out after {after:?}")]
    TimedOut { path: String, after: Duration },

    #[error("loading {path} was abandoned before completing")]
    Cancelled { path: String },
}

impl AssetError {
    /// Path of the asset the error refers to
    pub fn path(&self) -> &str {
        match self {
            AssetError::NotFound { path }
            | AssetError::Fetch { path, .. }
            | AssetError::Malformed { path, .. }
            | AssetError::Empty { path }
            | AssetError::TimedOut { path, .. }
            | AssetError::Cancelled { path } => path,
        }
    }
}

/// Errors surfaced by the session-level operations
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("asset load failed: {0}")]
    AssetLoadFailure(#[from] AssetError),

    #[error("a movable object has already been placed in this session")]
    AlreadyPlaced,

    #[error("the socketable mesh registry is closed")]
    RegistryClosed,
}

/// Errors raised while reading configuration overrides
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },

    #[error("{key} must be positive, got {value}")]
    OutOfRange { key: String, value: f32 },
}

/// Result type alias for viewer operations
pub type Result<T> = std::result::Result<T, ViewerError>;

/// Error types for loading, importing, aligning and configuring
///
/// Freeze failures have no variant here: the freezer recovers from them per
/// resource and only reports counts (see [`crate::freeze::FreezeReport`]).
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure of an asynchronous model load.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file extension is neither `.stl` nor `.obj`.
    #[error("Unsupported model format: {extension}")]
    UnsupportedFormat { extension: String },

    /// The parser for a recognized format rejected the file.
    #[error("Failed to import {}: {source}", path.display())]
    Import {
        path: PathBuf,
        #[source]
        source: ImportError,
    },

    #[error("Load was cancelled before the worker started")]
    Cancelled,

    #[error("Load worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("Load worker exited without reporting a result")]
    WorkerLost,

    #[error("Failed to start load worker: {0}")]
    Spawn(#[source] io::Error),
}

/// Parser-level failure for a recognized format.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid STL data: {0}")]
    Stl(String),

    #[error("Invalid OBJ data: {0}")]
    Obj(#[from] tobj::LoadError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignmentError {
    #[error("Load a model first.")]
    NoActiveModel,

    /// Numeric failure, e.g. non-finite or empty bounds.
    #[error("Alignment failed: {0}")]
    Failure(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

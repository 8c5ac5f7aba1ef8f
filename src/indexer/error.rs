//! Error types for indexing passes.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Cannot run '{program}' in {dir}: {source}")]
    Spawn {
        program: String,
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' failed in {dir} ({status}): {output}")]
    CommandFailed {
        program: String,
        dir: PathBuf,
        status: String,
        output: String,
    },

    #[error("Cannot combine tag files into {target}: {source}")]
    Concat {
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No tag files to combine into {target}")]
    NothingToConcat { target: PathBuf },

    #[error("Cannot determine gemset path for {root}: {reason}")]
    Gemset { root: PathBuf, reason: String },
}

pub type IndexResult<T> = Result<T, IndexError>;

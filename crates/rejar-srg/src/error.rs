//! Importer errors.

use std::path::PathBuf;

use thiserror::Error;

pub type SrgResult<T> = Result<T, SrgError>;

#[derive(Debug, Error)]
pub enum SrgError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}:{line}: {message}")]
    Parse {
        file: PathBuf,
        line: usize,
        message: String,
    },

    #[error(transparent)]
    Descriptor(#[from] rejar_classfile::ClassFileError),
}

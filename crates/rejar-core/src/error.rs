//! Engine errors.

use std::path::PathBuf;

use rejar_classfile::ClassFileError;
use thiserror::Error;

pub type RemapResult<T> = Result<T, RemapError>;

#[derive(Debug, Error)]
pub enum RemapError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive error in {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("malformed class `{name}`: {source}")]
    MalformedClass {
        name: String,
        #[source]
        source: ClassFileError,
    },

    #[error("malformed classpath class `{name}`: {source}")]
    MalformedClasspathClass {
        name: String,
        #[source]
        source: ClassFileError,
    },

    #[error("classpath lookup for `{class}` failed: {source}")]
    ClasspathIo {
        class: String,
        #[source]
        source: std::io::Error,
    },

    #[error("mapping line {line}: {message}")]
    MappingParse { line: usize, message: String },

    #[error(transparent)]
    ClassFile(#[from] ClassFileError),
}

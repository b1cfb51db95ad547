//! Codec errors.

use thiserror::Error;

pub type ClassFileResult<T> = Result<T, ClassFileError>;

#[derive(Debug, Error)]
pub enum ClassFileError {
    #[error("unexpected end of class file at offset {0}")]
    UnexpectedEof(usize),

    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),

    #[error("unknown constant pool tag {tag} in entry {index}")]
    BadConstantTag { index: u16, tag: u8 },

    #[error("constant pool index {0} is out of range or refers to the wrong entry kind")]
    BadPoolIndex(u16),

    #[error("constant pool entry {0} is not valid UTF-8")]
    BadUtf8(u16),

    #[error("constant pool cannot hold more than 65535 entries")]
    PoolOverflow,

    #[error("attribute `{name}` body is malformed")]
    BadAttribute { name: String },

    #[error("malformed descriptor `{0}`")]
    BadDescriptor(String),

    #[error("malformed signature `{0}`")]
    BadSignature(String),

    #[error("{0} trailing bytes after end of class structure")]
    TrailingBytes(usize),
}

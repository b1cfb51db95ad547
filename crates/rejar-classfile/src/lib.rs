//! # rejar-classfile
//!
//! Structural model and byte codec for JVM class files, as consumed by the
//! rejar remapping engine:
//!
//! - **Constant pool**: every pool tag, raw UTF-8 payloads, append-only
//!   mutation (existing entries are re-pointed, never edited in place)
//! - **Class structure**: fields, methods, interfaces, attributes
//! - **Attributes**: typed where the rewrite needs structure (`Code`,
//!   local-variable tables, `MethodParameters`, `InnerClasses`,
//!   `EnclosingMethod`, `Signature`), raw passthrough otherwise
//! - **Descriptors and signatures**: parsing and class-name substitution
//!
//! Bytecode payloads are never re-encoded. Because pool mutation is
//! append-only, pool indices embedded in raw payloads (instruction streams,
//! `StackMapTable`, `BootstrapMethods`) remain valid across a rewrite, and
//! an untouched class re-serializes byte-for-byte.

pub mod attr;
pub mod class;
pub mod desc;
pub mod error;
pub mod pool;
pub mod reader;
pub mod sig;

pub use attr::{Attribute, CodeAttribute, ExceptionHandler, InnerClassEntry, LocalVariableEntry, LocalVariableTypeEntry, ParameterEntry};
pub use class::{ClassFile, MemberInfo};
pub use desc::MethodDescriptor;
pub use error::{ClassFileError, ClassFileResult};
pub use pool::{ConstantPool, Entry};

/// Access flag bits.
pub mod access {
    pub const PUBLIC: u16 = 0x0001;
    pub const PRIVATE: u16 = 0x0002;
    pub const PROTECTED: u16 = 0x0004;
    pub const STATIC: u16 = 0x0008;
    pub const FINAL: u16 = 0x0010;
    pub const INTERFACE: u16 = 0x0200;
    pub const ABSTRACT: u16 = 0x0400;
    pub const SYNTHETIC: u16 = 0x1000;
    pub const ANNOTATION: u16 = 0x2000;
    pub const ENUM: u16 = 0x4000;
}

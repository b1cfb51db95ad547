//! # rejar-core
//!
//! Inheritance-aware symbol remapping for compiled class archives:
//!
//! - **`mapping`**: the five-table old-name to new-name dictionary and its
//!   JAM text codec
//! - **`hierarchy`**: class hierarchy index with memoized ancestor closure
//!   and lazy auxiliary-classpath resolution
//! - **`synthesis`**: fresh-name generation that refuses inherited,
//!   overriding and platform-mandated symbols
//! - **`remap`**: occurrence-time resolution through the inheritance chain,
//!   with inconsistency diagnostics returned as values
//! - **`rewrite`**: per-class metadata reconciliation and reference
//!   application
//! - **`jar`**: the two-pass whole-archive driver
//!
//! # Example
//!
//! ```ignore
//! use rejar_core::jar::JarRemapper;
//! use rejar_core::mapping::Mapping;
//!
//! let mapping = Mapping::parse_file("names.jam")?;
//! let outcome = JarRemapper::new(mapping).remap("in.jar".as_ref(), "out.jar".as_ref())?;
//! for warning in &outcome.diagnostics {
//!     eprintln!("warning: {warning}");
//! }
//! ```

pub mod error;
pub mod hierarchy;
pub mod jar;
pub mod mapping;
pub mod member;
pub mod remap;
pub mod rewrite;
pub mod synthesis;

#[cfg(test)]
mod testutil;

pub use error::{RemapError, RemapResult};
pub use hierarchy::{ClassResolver, Classpath, Hierarchy, InheritPolicy, NoClasspath};
pub use jar::{JarRemapper, RemapOutcome};
pub use mapping::Mapping;
pub use member::MemberRef;
pub use remap::{Diagnostic, Renamer};
pub use rewrite::rewrite_class;
pub use synthesis::Namer;

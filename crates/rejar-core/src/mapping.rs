//! The five-table symbol dictionary and its JAM text codec.
//!
//! Format (line oriented, space separated, `//` starts a comment):
//! ```text
//! CL <oldClass> <newClass>
//! FD <oldClass> <oldField> <fieldDescriptor> <newField>
//! MD <oldClass> <oldMethod> <methodDescriptor> <newMethod>
//! MP <oldClass> <oldMethod> <methodDescriptor> <paramIndex> <newParamName>
//! LV <oldClass> <oldMethod> <methodDescriptor> <localIndex> <newLocalName>
//! ```
//! The writer groups records by kind (CL, FD, MD, MP, LV), each group in
//! insertion order. The reader accepts any ordering and ignores unknown
//! record tags.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{RemapError, RemapResult};

/// Key for the field and method tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberKey {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

impl MemberKey {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

/// Key for the parameter and local tables: a member plus a position.
/// Parameter indices are declaration positions; local indices are frame
/// slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarKey {
    pub owner: String,
    pub method: String,
    pub descriptor: String,
    pub index: u16,
}

impl VarKey {
    pub fn new(
        owner: impl Into<String>,
        method: impl Into<String>,
        descriptor: impl Into<String>,
        index: u16,
    ) -> Self {
        Self {
            owner: owner.into(),
            method: method.into(),
            descriptor: descriptor.into(),
            index,
        }
    }
}

/// Wildcard descriptor accepted in field records: matches any descriptor for
/// that owner and name, consulted when no exact entry exists.
pub const WILDCARD_DESCRIPTOR: &str = "*";

/// Old-name to new-name associations for five symbol kinds.
///
/// A missing entry is not an error; it means "keep the original name".
/// Entries are write-once (the first association for a key wins) and each
/// table preserves insertion order for deterministic serialization.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    pub classes: IndexMap<String, String>,
    pub fields: IndexMap<MemberKey, String>,
    pub methods: IndexMap<MemberKey, String>,
    pub parameters: IndexMap<VarKey, String>,
    pub locals: IndexMap<VarKey, String>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
            && self.fields.is_empty()
            && self.methods.is_empty()
            && self.parameters.is_empty()
            && self.locals.is_empty()
    }

    // ------------------------------------------------------------------
    // Insertion (first writer wins)
    // ------------------------------------------------------------------

    pub fn add_class(&mut self, old: impl Into<String>, new: impl Into<String>) {
        self.classes.entry(old.into()).or_insert_with(|| new.into());
    }

    pub fn add_field(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        new: impl Into<String>,
    ) {
        self.fields
            .entry(MemberKey::new(owner, name, descriptor))
            .or_insert_with(|| new.into());
    }

    pub fn add_method(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        new: impl Into<String>,
    ) {
        self.methods
            .entry(MemberKey::new(owner, name, descriptor))
            .or_insert_with(|| new.into());
    }

    pub fn add_parameter(
        &mut self,
        owner: impl Into<String>,
        method: impl Into<String>,
        descriptor: impl Into<String>,
        index: u16,
        new: impl Into<String>,
    ) {
        self.parameters
            .entry(VarKey::new(owner, method, descriptor, index))
            .or_insert_with(|| new.into());
    }

    pub fn add_local(
        &mut self,
        owner: impl Into<String>,
        method: impl Into<String>,
        descriptor: impl Into<String>,
        index: u16,
        new: impl Into<String>,
    ) {
        self.locals
            .entry(VarKey::new(owner, method, descriptor, index))
            .or_insert_with(|| new.into());
    }

    // ------------------------------------------------------------------
    // Lookup (`None` means "no rename")
    // ------------------------------------------------------------------

    pub fn get_class(&self, class: &str) -> Option<&str> {
        self.classes.get(class).map(String::as_str)
    }

    /// Exact lookup first, then the `*` wildcard for this owner and name.
    pub fn get_field(&self, owner: &str, name: &str, descriptor: &str) -> Option<&str> {
        if let Some(new) = self.fields.get(&MemberKey::new(owner, name, descriptor)) {
            return Some(new);
        }
        self.fields
            .get(&MemberKey::new(owner, name, WILDCARD_DESCRIPTOR))
            .map(String::as_str)
    }

    pub fn get_method(&self, owner: &str, name: &str, descriptor: &str) -> Option<&str> {
        self.methods
            .get(&MemberKey::new(owner, name, descriptor))
            .map(String::as_str)
    }

    pub fn get_parameter(
        &self,
        owner: &str,
        method: &str,
        descriptor: &str,
        index: u16,
    ) -> Option<&str> {
        self.parameters
            .get(&VarKey::new(owner, method, descriptor, index))
            .map(String::as_str)
    }

    pub fn get_local(
        &self,
        owner: &str,
        method: &str,
        descriptor: &str,
        index: u16,
    ) -> Option<&str> {
        self.locals
            .get(&VarKey::new(owner, method, descriptor, index))
            .map(String::as_str)
    }

    // ------------------------------------------------------------------
    // Lookup with fallback
    // ------------------------------------------------------------------

    pub fn map_class(&self, class: &str) -> String {
        self.get_class(class).unwrap_or(class).to_string()
    }

    pub fn map_field(&self, owner: &str, name: &str, descriptor: &str) -> String {
        self.get_field(owner, name, descriptor).unwrap_or(name).to_string()
    }

    pub fn map_method(&self, owner: &str, name: &str, descriptor: &str) -> String {
        self.get_method(owner, name, descriptor).unwrap_or(name).to_string()
    }

    /// Falls back to the positional default `parN`.
    pub fn map_parameter(&self, owner: &str, method: &str, descriptor: &str, index: u16) -> String {
        match self.get_parameter(owner, method, descriptor, index) {
            Some(new) => new.to_string(),
            None => format!("par{index}"),
        }
    }

    /// Falls back to the positional default `varN`.
    pub fn map_local(&self, owner: &str, method: &str, descriptor: &str, index: u16) -> String {
        match self.get_local(owner, method, descriptor, index) {
            Some(new) => new.to_string(),
            None => format!("var{index}"),
        }
    }

    // ------------------------------------------------------------------
    // JAM codec
    // ------------------------------------------------------------------

    /// Parses JAM content. Unknown record tags are ignored; a malformed
    /// known-tag record aborts with its line number.
    pub fn parse_jam(content: &str) -> RemapResult<Self> {
        let mut mapping = Mapping::new();

        for (line_num, raw) in content.lines().enumerate() {
            let line_num = line_num + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            let record = |expected: usize| -> RemapResult<()> {
                if fields.len() == expected {
                    Ok(())
                } else {
                    Err(RemapError::MappingParse {
                        line: line_num,
                        message: format!(
                            "expected {} fields for {} record, got {}",
                            expected,
                            fields[0],
                            fields.len()
                        ),
                    })
                }
            };

            match fields[0] {
                "CL" => {
                    record(3)?;
                    mapping.add_class(fields[1], fields[2]);
                }
                "FD" => {
                    record(5)?;
                    mapping.add_field(fields[1], fields[2], fields[3], fields[4]);
                }
                "MD" => {
                    record(5)?;
                    mapping.add_method(fields[1], fields[2], fields[3], fields[4]);
                }
                "MP" => {
                    record(6)?;
                    let index = parse_index(fields[4], line_num)?;
                    mapping.add_parameter(fields[1], fields[2], fields[3], index, fields[5]);
                }
                "LV" => {
                    record(6)?;
                    let index = parse_index(fields[4], line_num)?;
                    mapping.add_local(fields[1], fields[2], fields[3], index, fields[5]);
                }
                _ => {} // Unknown tag: skip.
            }
        }

        Ok(mapping)
    }

    /// Serializes to JAM, grouped by record kind in insertion order.
    pub fn to_jam(&self) -> String {
        let mut out = String::new();
        for (old, new) in &self.classes {
            let _ = writeln!(out, "CL {old} {new}");
        }
        for (key, new) in &self.fields {
            let _ = writeln!(out, "FD {} {} {} {new}", key.owner, key.name, key.descriptor);
        }
        for (key, new) in &self.methods {
            let _ = writeln!(out, "MD {} {} {} {new}", key.owner, key.name, key.descriptor);
        }
        for (key, new) in &self.parameters {
            let _ = writeln!(
                out,
                "MP {} {} {} {} {new}",
                key.owner, key.method, key.descriptor, key.index
            );
        }
        for (key, new) in &self.locals {
            let _ = writeln!(
                out,
                "LV {} {} {} {} {new}",
                key.owner, key.method, key.descriptor, key.index
            );
        }
        out
    }

    pub fn parse_file<P: AsRef<Path>>(path: P) -> RemapResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| RemapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_jam(&content)
    }

    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> RemapResult<()> {
        let path = path.as_ref();
        fs::write(path, self.to_jam()).map_err(|source| RemapError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn parse_index(field: &str, line: usize) -> RemapResult<u16> {
    field.parse().map_err(|_| RemapError::MappingParse {
        line,
        message: format!("invalid index `{field}`"),
    })
}

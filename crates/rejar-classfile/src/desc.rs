//! Field and method descriptor utilities.

use crate::error::{ClassFileError, ClassFileResult};

/// A parsed method descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// One field descriptor per declared parameter.
    pub params: Vec<String>,
    /// Return descriptor, `V` for void.
    pub ret: String,
}

impl MethodDescriptor {
    pub fn parse(desc: &str) -> ClassFileResult<Self> {
        let bytes = desc.as_bytes();
        if bytes.first() != Some(&b'(') {
            return Err(ClassFileError::BadDescriptor(desc.to_string()));
        }
        let mut pos = 1;
        let mut params = Vec::new();
        while bytes.get(pos).is_some_and(|&b| b != b')') {
            let start = pos;
            pos = skip_field_type(desc, pos)?;
            params.push(desc[start..pos].to_string());
        }
        if bytes.get(pos) != Some(&b')') {
            return Err(ClassFileError::BadDescriptor(desc.to_string()));
        }
        pos += 1;
        let ret = if bytes.get(pos) == Some(&b'V') {
            pos += 1;
            "V".to_string()
        } else {
            let start = pos;
            pos = skip_field_type(desc, pos)?;
            desc[start..pos].to_string()
        };
        if pos != bytes.len() {
            return Err(ClassFileError::BadDescriptor(desc.to_string()));
        }
        Ok(Self { params, ret })
    }

    /// Total frame slots the parameters occupy (excluding any receiver).
    pub fn param_slots(&self) -> u16 {
        self.params.iter().map(|p| slot_width(p)).sum()
    }
}

fn skip_field_type(desc: &str, mut pos: usize) -> ClassFileResult<usize> {
    let bytes = desc.as_bytes();
    while bytes.get(pos) == Some(&b'[') {
        pos += 1;
    }
    match bytes.get(pos) {
        Some(b'L') => match desc[pos..].find(';') {
            Some(semi) => Ok(pos + semi + 1),
            None => Err(ClassFileError::BadDescriptor(desc.to_string())),
        },
        Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z') => Ok(pos + 1),
        _ => Err(ClassFileError::BadDescriptor(desc.to_string())),
    }
}

/// Frame slots occupied by a value of this type (long and double take two).
#[inline]
pub fn slot_width(desc: &str) -> u16 {
    if desc == "J" || desc == "D" {
        2
    } else {
        1
    }
}

/// Internal class name of a plain object descriptor (`Lfoo/Bar;` -> `foo/Bar`).
pub fn object_type(desc: &str) -> Option<&str> {
    desc.strip_prefix('L').and_then(|s| s.strip_suffix(';'))
}

/// Rewrites every class name embedded in a field or method descriptor.
///
/// A lexical walk is exact here: in a descriptor `L` always begins a class
/// name in type position and class names never contain `;`.
pub fn remap_descriptor<F: FnMut(&str) -> String>(desc: &str, mut map: F) -> String {
    let mut out = String::with_capacity(desc.len());
    let mut rest = desc;
    loop {
        match rest.find('L') {
            None => {
                out.push_str(rest);
                return out;
            }
            Some(i) => {
                out.push_str(&rest[..=i]);
                rest = &rest[i + 1..];
                match rest.find(';') {
                    None => {
                        // Malformed tail; carry it through unchanged.
                        out.push_str(rest);
                        return out;
                    }
                    Some(j) => {
                        out.push_str(&map(&rest[..j]));
                        out.push(';');
                        rest = &rest[j + 1..];
                    }
                }
            }
        }
    }
}

//! Attribute model.
//!
//! Attributes the rewrite integration manipulates are parsed into typed
//! structures; every other attribute is carried as raw bytes. Raw bodies may
//! embed constant pool indices, which stay valid because pool mutation is
//! append-only.

use crate::error::{ClassFileError, ClassFileResult};
use crate::pool::ConstantPool;
use crate::reader::ByteReader;

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionHandler {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// `Class` entry of the caught type, or 0 for catch-all.
    pub catch_type: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeAttribute {
    pub name_index: u16,
    pub max_stack: u16,
    pub max_locals: u16,
    /// Raw instruction stream; never re-encoded.
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionHandler>,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVariableEntry {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    /// Frame slot.
    pub index: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVariableTypeEntry {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub signature_index: u16,
    /// Frame slot.
    pub index: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterEntry {
    /// UTF-8 entry of the parameter name, or 0 if unnamed.
    pub name_index: u16,
    pub access: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InnerClassEntry {
    /// `Class` entry of the nested class.
    pub inner_class: u16,
    /// `Class` entry of the enclosing class, or 0.
    pub outer_class: u16,
    /// UTF-8 entry of the simple name, or 0 for anonymous classes.
    pub inner_name: u16,
    pub access: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Code(CodeAttribute),
    LocalVariableTable {
        name_index: u16,
        entries: Vec<LocalVariableEntry>,
    },
    LocalVariableTypeTable {
        name_index: u16,
        entries: Vec<LocalVariableTypeEntry>,
    },
    MethodParameters {
        name_index: u16,
        parameters: Vec<ParameterEntry>,
    },
    InnerClasses {
        name_index: u16,
        classes: Vec<InnerClassEntry>,
    },
    EnclosingMethod {
        name_index: u16,
        /// `Class` entry of the enclosing class.
        class_index: u16,
        /// `NameAndType` entry of the enclosing method, or 0.
        method_index: u16,
    },
    Signature {
        name_index: u16,
        signature: u16,
    },
    Raw {
        name_index: u16,
        data: Vec<u8>,
    },
}

impl Attribute {
    pub fn name_index(&self) -> u16 {
        match self {
            Attribute::Code(code) => code.name_index,
            Attribute::LocalVariableTable { name_index, .. }
            | Attribute::LocalVariableTypeTable { name_index, .. }
            | Attribute::MethodParameters { name_index, .. }
            | Attribute::InnerClasses { name_index, .. }
            | Attribute::EnclosingMethod { name_index, .. }
            | Attribute::Signature { name_index, .. }
            | Attribute::Raw { name_index, .. } => *name_index,
        }
    }

    fn body(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Attribute::Code(code) => {
                out.extend_from_slice(&code.max_stack.to_be_bytes());
                out.extend_from_slice(&code.max_locals.to_be_bytes());
                out.extend_from_slice(&(code.code.len() as u32).to_be_bytes());
                out.extend_from_slice(&code.code);
                out.extend_from_slice(&(code.exception_table.len() as u16).to_be_bytes());
                for h in &code.exception_table {
                    out.extend_from_slice(&h.start_pc.to_be_bytes());
                    out.extend_from_slice(&h.end_pc.to_be_bytes());
                    out.extend_from_slice(&h.handler_pc.to_be_bytes());
                    out.extend_from_slice(&h.catch_type.to_be_bytes());
                }
                write_attributes(&code.attributes, &mut out);
            }
            Attribute::LocalVariableTable { entries, .. } => {
                out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
                for e in entries {
                    out.extend_from_slice(&e.start_pc.to_be_bytes());
                    out.extend_from_slice(&e.length.to_be_bytes());
                    out.extend_from_slice(&e.name_index.to_be_bytes());
                    out.extend_from_slice(&e.descriptor_index.to_be_bytes());
                    out.extend_from_slice(&e.index.to_be_bytes());
                }
            }
            Attribute::LocalVariableTypeTable { entries, .. } => {
                out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
                for e in entries {
                    out.extend_from_slice(&e.start_pc.to_be_bytes());
                    out.extend_from_slice(&e.length.to_be_bytes());
                    out.extend_from_slice(&e.name_index.to_be_bytes());
                    out.extend_from_slice(&e.signature_index.to_be_bytes());
                    out.extend_from_slice(&e.index.to_be_bytes());
                }
            }
            Attribute::MethodParameters { parameters, .. } => {
                out.push(parameters.len() as u8);
                for p in parameters {
                    out.extend_from_slice(&p.name_index.to_be_bytes());
                    out.extend_from_slice(&p.access.to_be_bytes());
                }
            }
            Attribute::InnerClasses { classes, .. } => {
                out.extend_from_slice(&(classes.len() as u16).to_be_bytes());
                for c in classes {
                    out.extend_from_slice(&c.inner_class.to_be_bytes());
                    out.extend_from_slice(&c.outer_class.to_be_bytes());
                    out.extend_from_slice(&c.inner_name.to_be_bytes());
                    out.extend_from_slice(&c.access.to_be_bytes());
                }
            }
            Attribute::EnclosingMethod { class_index, method_index, .. } => {
                out.extend_from_slice(&class_index.to_be_bytes());
                out.extend_from_slice(&method_index.to_be_bytes());
            }
            Attribute::Signature { signature, .. } => {
                out.extend_from_slice(&signature.to_be_bytes());
            }
            Attribute::Raw { data, .. } => out.extend_from_slice(data),
        }
        out
    }
}

/// Parses an attribute list (`u16` count followed by the attributes).
pub fn parse_attributes(
    r: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> ClassFileResult<Vec<Attribute>> {
    let count = r.read_u16()?;
    let mut attrs = Vec::with_capacity(count as usize);
    for _ in 0..count {
        attrs.push(parse_attribute(r, pool)?);
    }
    Ok(attrs)
}

fn parse_attribute(r: &mut ByteReader<'_>, pool: &ConstantPool) -> ClassFileResult<Attribute> {
    let name_index = r.read_u16()?;
    let length = r.read_u32()? as usize;
    let body = r.read_bytes(length)?;
    let name = pool.utf8(name_index)?;

    let mut br = ByteReader::new(body);
    let attr = match name {
        "Code" => {
            let max_stack = br.read_u16()?;
            let max_locals = br.read_u16()?;
            let code_len = br.read_u32()? as usize;
            let code = br.read_bytes(code_len)?.to_vec();
            let handler_count = br.read_u16()?;
            let mut exception_table = Vec::with_capacity(handler_count as usize);
            for _ in 0..handler_count {
                exception_table.push(ExceptionHandler {
                    start_pc: br.read_u16()?,
                    end_pc: br.read_u16()?,
                    handler_pc: br.read_u16()?,
                    catch_type: br.read_u16()?,
                });
            }
            let attributes = parse_attributes(&mut br, pool)?;
            Attribute::Code(CodeAttribute {
                name_index,
                max_stack,
                max_locals,
                code,
                exception_table,
                attributes,
            })
        }
        "LocalVariableTable" => {
            let count = br.read_u16()?;
            let mut entries = Vec::with_capacity(count as usize);
            for _ in 0..count {
                entries.push(LocalVariableEntry {
                    start_pc: br.read_u16()?,
                    length: br.read_u16()?,
                    name_index: br.read_u16()?,
                    descriptor_index: br.read_u16()?,
                    index: br.read_u16()?,
                });
            }
            Attribute::LocalVariableTable { name_index, entries }
        }
        "LocalVariableTypeTable" => {
            let count = br.read_u16()?;
            let mut entries = Vec::with_capacity(count as usize);
            for _ in 0..count {
                entries.push(LocalVariableTypeEntry {
                    start_pc: br.read_u16()?,
                    length: br.read_u16()?,
                    name_index: br.read_u16()?,
                    signature_index: br.read_u16()?,
                    index: br.read_u16()?,
                });
            }
            Attribute::LocalVariableTypeTable { name_index, entries }
        }
        "MethodParameters" => {
            let count = br.read_u8()?;
            let mut parameters = Vec::with_capacity(count as usize);
            for _ in 0..count {
                parameters.push(ParameterEntry {
                    name_index: br.read_u16()?,
                    access: br.read_u16()?,
                });
            }
            Attribute::MethodParameters { name_index, parameters }
        }
        "InnerClasses" => {
            let count = br.read_u16()?;
            let mut classes = Vec::with_capacity(count as usize);
            for _ in 0..count {
                classes.push(InnerClassEntry {
                    inner_class: br.read_u16()?,
                    outer_class: br.read_u16()?,
                    inner_name: br.read_u16()?,
                    access: br.read_u16()?,
                });
            }
            Attribute::InnerClasses { name_index, classes }
        }
        "EnclosingMethod" => Attribute::EnclosingMethod {
            name_index,
            class_index: br.read_u16()?,
            method_index: br.read_u16()?,
        },
        "Signature" => Attribute::Signature {
            name_index,
            signature: br.read_u16()?,
        },
        _ => return Ok(Attribute::Raw { name_index, data: body.to_vec() }),
    };

    if br.remaining() != 0 {
        return Err(ClassFileError::BadAttribute { name: name.to_string() });
    }
    Ok(attr)
}

/// Writes an attribute list (`u16` count followed by the attributes).
pub fn write_attributes(attrs: &[Attribute], out: &mut Vec<u8>) {
    out.extend_from_slice(&(attrs.len() as u16).to_be_bytes());
    for attr in attrs {
        let body = attr.body();
        out.extend_from_slice(&attr.name_index().to_be_bytes());
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(&body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with(names: &[&str]) -> ConstantPool {
        let mut pool = ConstantPool::new();
        for name in names {
            pool.add_utf8(name).unwrap();
        }
        pool
    }

    #[test]
    fn test_raw_attribute_round_trip() {
        let mut pool = pool_with(&["Deprecated"]);
        let name_index = pool.add_utf8("Deprecated").unwrap();
        let attrs = vec![Attribute::Raw { name_index, data: vec![] }];

        let mut bytes = Vec::new();
        write_attributes(&attrs, &mut bytes);
        let parsed = parse_attributes(&mut ByteReader::new(&bytes), &pool).unwrap();
        assert_eq!(parsed, attrs);
    }

    #[test]
    fn test_code_attribute_round_trip() {
        let mut pool = pool_with(&["Code", "LocalVariableTable", "this", "LFoo;"]);
        let code_name = pool.add_utf8("Code").unwrap();
        let lvt_name = pool.add_utf8("LocalVariableTable").unwrap();
        let this_name = pool.add_utf8("this").unwrap();
        let this_desc = pool.add_utf8("LFoo;").unwrap();

        let attrs = vec![Attribute::Code(CodeAttribute {
            name_index: code_name,
            max_stack: 2,
            max_locals: 1,
            code: vec![0xb1], // return
            exception_table: vec![ExceptionHandler {
                start_pc: 0,
                end_pc: 1,
                handler_pc: 1,
                catch_type: 0,
            }],
            attributes: vec![Attribute::LocalVariableTable {
                name_index: lvt_name,
                entries: vec![LocalVariableEntry {
                    start_pc: 0,
                    length: 1,
                    name_index: this_name,
                    descriptor_index: this_desc,
                    index: 0,
                }],
            }],
        })];

        let mut bytes = Vec::new();
        write_attributes(&attrs, &mut bytes);
        let parsed = parse_attributes(&mut ByteReader::new(&bytes), &pool).unwrap();
        assert_eq!(parsed, attrs);
    }

    #[test]
    fn test_truncated_typed_attribute_rejected() {
        let mut pool = ConstantPool::new();
        let sig_name = pool.add_utf8("Signature").unwrap();
        // Signature body must be exactly 2 bytes; give it 3.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&sig_name.to_be_bytes());
        bytes.extend_from_slice(&3u32.to_be_bytes());
        bytes.extend_from_slice(&[0, 1, 2]);
        let result = parse_attributes(&mut ByteReader::new(&bytes), &pool);
        assert!(matches!(result, Err(ClassFileError::BadAttribute { .. })));
    }
}

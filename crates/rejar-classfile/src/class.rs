//! Class structure: the top-level class-file model.

use crate::attr::{parse_attributes, write_attributes, Attribute, CodeAttribute};
use crate::error::{ClassFileError, ClassFileResult};
use crate::pool::ConstantPool;
use crate::reader::ByteReader;
use crate::access;

const MAGIC: u32 = 0xCAFE_BABE;

/// A field or method declaration (the two share their on-disk layout).
#[derive(Debug, Clone)]
pub struct MemberInfo {
    pub access: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<Attribute>,
}

impl MemberInfo {
    pub fn name<'p>(&self, pool: &'p ConstantPool) -> ClassFileResult<&'p str> {
        pool.utf8(self.name_index)
    }

    pub fn descriptor<'p>(&self, pool: &'p ConstantPool) -> ClassFileResult<&'p str> {
        pool.utf8(self.descriptor_index)
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.access & access::STATIC != 0
    }

    pub fn code(&self) -> Option<&CodeAttribute> {
        self.attributes.iter().find_map(|a| match a {
            Attribute::Code(code) => Some(code),
            _ => None,
        })
    }

    pub fn code_mut(&mut self) -> Option<&mut CodeAttribute> {
        self.attributes.iter_mut().find_map(|a| match a {
            Attribute::Code(code) => Some(code),
            _ => None,
        })
    }
}

/// A parsed class file.
#[derive(Debug)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub pool: ConstantPool,
    pub access: u16,
    pub this_class: u16,
    /// 0 only for the root object type.
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<MemberInfo>,
    pub methods: Vec<MemberInfo>,
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> ClassFileResult<Self> {
        let mut r = ByteReader::new(bytes);
        let magic = r.read_u32()?;
        if magic != MAGIC {
            return Err(ClassFileError::BadMagic(magic));
        }
        let minor_version = r.read_u16()?;
        let major_version = r.read_u16()?;
        let pool = ConstantPool::parse(&mut r)?;
        let access = r.read_u16()?;
        let this_class = r.read_u16()?;
        let super_class = r.read_u16()?;

        let interface_count = r.read_u16()?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(r.read_u16()?);
        }

        let fields = Self::parse_members(&mut r, &pool)?;
        let methods = Self::parse_members(&mut r, &pool)?;
        let attributes = parse_attributes(&mut r, &pool)?;

        if r.remaining() != 0 {
            return Err(ClassFileError::TrailingBytes(r.remaining()));
        }

        Ok(Self {
            minor_version,
            major_version,
            pool,
            access,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    fn parse_members(
        r: &mut ByteReader<'_>,
        pool: &ConstantPool,
    ) -> ClassFileResult<Vec<MemberInfo>> {
        let count = r.read_u16()?;
        let mut members = Vec::with_capacity(count as usize);
        for _ in 0..count {
            members.push(MemberInfo {
                access: r.read_u16()?,
                name_index: r.read_u16()?,
                descriptor_index: r.read_u16()?,
                attributes: parse_attributes(r, pool)?,
            });
        }
        Ok(members)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC.to_be_bytes());
        out.extend_from_slice(&self.minor_version.to_be_bytes());
        out.extend_from_slice(&self.major_version.to_be_bytes());
        self.pool.write(&mut out);
        out.extend_from_slice(&self.access.to_be_bytes());
        out.extend_from_slice(&self.this_class.to_be_bytes());
        out.extend_from_slice(&self.super_class.to_be_bytes());
        out.extend_from_slice(&(self.interfaces.len() as u16).to_be_bytes());
        for iface in &self.interfaces {
            out.extend_from_slice(&iface.to_be_bytes());
        }
        Self::write_members(&self.fields, &mut out);
        Self::write_members(&self.methods, &mut out);
        write_attributes(&self.attributes, &mut out);
        out
    }

    fn write_members(members: &[MemberInfo], out: &mut Vec<u8>) {
        out.extend_from_slice(&(members.len() as u16).to_be_bytes());
        for m in members {
            out.extend_from_slice(&m.access.to_be_bytes());
            out.extend_from_slice(&m.name_index.to_be_bytes());
            out.extend_from_slice(&m.descriptor_index.to_be_bytes());
            write_attributes(&m.attributes, out);
        }
    }

    /// Internal name of this class.
    pub fn name(&self) -> ClassFileResult<&str> {
        self.pool.class_name(self.this_class)
    }

    /// Internal name of the superclass; `None` for the root object type.
    pub fn super_name(&self) -> ClassFileResult<Option<&str>> {
        if self.super_class == 0 {
            return Ok(None);
        }
        self.pool.class_name(self.super_class).map(Some)
    }

    pub fn interface_names(&self) -> ClassFileResult<Vec<&str>> {
        self.interfaces
            .iter()
            .map(|&i| self.pool.class_name(i))
            .collect()
    }

    #[inline]
    pub fn is_enum(&self) -> bool {
        self.access & access::ENUM != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_class(name: &str, super_name: &str) -> ClassFile {
        let mut pool = ConstantPool::new();
        let this_class = pool.add_class(name).unwrap();
        let super_class = pool.add_class(super_name).unwrap();
        ClassFile {
            minor_version: 0,
            major_version: 52,
            pool,
            access: access::PUBLIC,
            this_class,
            super_class,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    #[test]
    fn test_minimal_round_trip() {
        let class = minimal_class("com/example/Foo", "java/lang/Object");
        let bytes = class.to_bytes();
        let parsed = ClassFile::parse(&bytes).unwrap();
        assert_eq!(parsed.name().unwrap(), "com/example/Foo");
        assert_eq!(parsed.super_name().unwrap(), Some("java/lang/Object"));
        assert_eq!(parsed.to_bytes(), bytes);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = minimal_class("A", "java/lang/Object").to_bytes();
        bytes[0] = 0xDE;
        assert!(matches!(
            ClassFile::parse(&bytes),
            Err(ClassFileError::BadMagic(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = minimal_class("A", "java/lang/Object").to_bytes();
        bytes.push(0);
        assert!(matches!(
            ClassFile::parse(&bytes),
            Err(ClassFileError::TrailingBytes(1))
        ));
    }

    #[test]
    fn test_member_with_field() {
        let mut class = minimal_class("A", "java/lang/Object");
        let name = class.pool.add_utf8("count").unwrap();
        let desc = class.pool.add_utf8("I").unwrap();
        class.fields.push(MemberInfo {
            access: access::PRIVATE,
            name_index: name,
            descriptor_index: desc,
            attributes: Vec::new(),
        });

        let parsed = ClassFile::parse(&class.to_bytes()).unwrap();
        assert_eq!(parsed.fields.len(), 1);
        assert_eq!(parsed.fields[0].name(&parsed.pool).unwrap(), "count");
        assert_eq!(parsed.fields[0].descriptor(&parsed.pool).unwrap(), "I");
    }
}

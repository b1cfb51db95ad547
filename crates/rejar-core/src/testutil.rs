//! Shared helpers for unit tests: build small synthetic classes in memory.

use rejar_classfile::{ClassFile, ConstantPool, MemberInfo};

pub(crate) fn class_with(
    name: &str,
    super_name: Option<&str>,
    interfaces: &[&str],
    access_flags: u16,
) -> ClassFile {
    let mut pool = ConstantPool::new();
    let this_class = pool.add_class(name).unwrap();
    let super_class = match super_name {
        Some(s) => pool.add_class(s).unwrap(),
        None => 0,
    };
    let interfaces = interfaces
        .iter()
        .map(|i| pool.add_class(i).unwrap())
        .collect();
    ClassFile {
        minor_version: 0,
        major_version: 52,
        pool,
        access: access_flags,
        this_class,
        super_class,
        interfaces,
        fields: Vec::new(),
        methods: Vec::new(),
        attributes: Vec::new(),
    }
}

pub(crate) fn add_field(class: &mut ClassFile, name: &str, descriptor: &str, access_flags: u16) {
    let name_index = class.pool.add_utf8(name).unwrap();
    let descriptor_index = class.pool.add_utf8(descriptor).unwrap();
    class.fields.push(MemberInfo {
        access: access_flags,
        name_index,
        descriptor_index,
        attributes: Vec::new(),
    });
}

pub(crate) fn add_method(class: &mut ClassFile, name: &str, descriptor: &str, access_flags: u16) {
    let name_index = class.pool.add_utf8(name).unwrap();
    let descriptor_index = class.pool.add_utf8(descriptor).unwrap();
    class.methods.push(MemberInfo {
        access: access_flags,
        name_index,
        descriptor_index,
        attributes: Vec::new(),
    });
}

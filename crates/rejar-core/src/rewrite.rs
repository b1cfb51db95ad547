//! Per-class rewrite integration.
//!
//! For one class, in order: method metadata reconciliation (parameter name
//! lists, local-variable tables), inner-class simple-name recomputation,
//! then application of the renamer to every symbol reference. Renaming
//! flows entirely through the constant pool: changed names live in freshly
//! appended `Utf8`/`NameAndType` entries and referring indices are
//! re-pointed, so the untouched instruction stream stays valid.

use rustc_hash::FxHashMap;

use rejar_classfile::attr::{Attribute, LocalVariableEntry, ParameterEntry};
use rejar_classfile::desc::{self, MethodDescriptor};
use rejar_classfile::pool::{ConstantPool, Entry};
use rejar_classfile::{ClassFile, MemberInfo};

use crate::error::RemapResult;
use crate::mapping::Mapping;
use crate::remap::Renamer;

/// Rewrites one class in place and returns its new internal name, which
/// decides the output archive entry name.
pub fn rewrite_class(class: &mut ClassFile, renamer: &mut Renamer) -> RemapResult<String> {
    let owner = class.name()?.to_string();
    reconcile_method_metadata(class, &owner, renamer.mapping())?;
    rewrite_inner_names(class, renamer)?;
    apply_references(class, &owner, renamer)?;
    Ok(renamer.map_class(&owner))
}

// ----------------------------------------------------------------------
// Method metadata: parameter names and local-variable tables
// ----------------------------------------------------------------------

fn reconcile_method_metadata(
    class: &mut ClassFile,
    owner: &str,
    mapping: &Mapping,
) -> RemapResult<()> {
    let ClassFile { pool, methods, .. } = class;
    for method in methods.iter_mut() {
        let method_name = pool.utf8(method.name_index)?.to_string();
        let method_desc = pool.utf8(method.descriptor_index)?.to_string();
        let descriptor = MethodDescriptor::parse(&method_desc)?;

        let param_names = resolve_parameter_names(
            pool,
            method,
            owner,
            &method_name,
            &method_desc,
            &descriptor,
            mapping,
        )?;
        reconcile_locals(
            pool,
            method,
            owner,
            &method_name,
            &method_desc,
            &descriptor,
            &param_names,
            mapping,
        )?;
    }
    Ok(())
}

/// One resolved name per declared parameter. A present `MethodParameters`
/// attribute is authoritative and left untouched; otherwise the attribute is
/// synthesized from the symbol table with the positional `parN` default.
fn resolve_parameter_names(
    pool: &mut ConstantPool,
    method: &mut MemberInfo,
    owner: &str,
    method_name: &str,
    method_desc: &str,
    descriptor: &MethodDescriptor,
    mapping: &Mapping,
) -> RemapResult<Vec<String>> {
    let existing: Option<Vec<ParameterEntry>> = method.attributes.iter().find_map(|a| match a {
        Attribute::MethodParameters { parameters, .. } => Some(parameters.clone()),
        _ => None,
    });

    let mut names = Vec::with_capacity(descriptor.params.len());
    match existing {
        Some(parameters) => {
            for (i, parameter) in parameters.iter().enumerate() {
                if parameter.name_index != 0 {
                    names.push(pool.utf8(parameter.name_index)?.to_string());
                } else {
                    names.push(mapping.map_parameter(owner, method_name, method_desc, i as u16));
                }
            }
            for i in parameters.len()..descriptor.params.len() {
                names.push(mapping.map_parameter(owner, method_name, method_desc, i as u16));
            }
        }
        None => {
            for i in 0..descriptor.params.len() {
                names.push(mapping.map_parameter(owner, method_name, method_desc, i as u16));
            }
            if !descriptor.params.is_empty() {
                let name_index = pool.add_utf8("MethodParameters")?;
                let mut parameters = Vec::with_capacity(names.len());
                for name in &names {
                    parameters.push(ParameterEntry {
                        name_index: pool.add_utf8(name)?,
                        access: 0,
                    });
                }
                method
                    .attributes
                    .push(Attribute::MethodParameters { name_index, parameters });
            }
        }
    }
    Ok(names)
}

#[allow(clippy::too_many_arguments)]
fn reconcile_locals(
    pool: &mut ConstantPool,
    method: &mut MemberInfo,
    owner: &str,
    method_name: &str,
    method_desc: &str,
    descriptor: &MethodDescriptor,
    param_names: &[String],
    mapping: &Mapping,
) -> RemapResult<()> {
    let is_static = method.is_static();
    let Some(code) = method.code_mut() else {
        return Ok(());
    };
    let code_len = code.code.len() as u16;

    // Frame slots covered by declared parameters (category-2 types widen).
    let mut slot_to_param: FxHashMap<u16, usize> = FxHashMap::default();
    let mut slot: u16 = u16::from(!is_static);
    for (i, param) in descriptor.params.iter().enumerate() {
        let width = desc::slot_width(param);
        for offset in 0..width {
            slot_to_param.insert(slot + offset, i);
        }
        slot += width;
    }

    let has_table = code
        .attributes
        .iter()
        .any(|a| matches!(a, Attribute::LocalVariableTable { .. }));
    if !has_table {
        // Some downstream consumers reject methods that declare parameters
        // but carry no table; synthesize receiver and parameter entries
        // spanning the whole body.
        let mut entries = Vec::new();
        if !is_static {
            entries.push(LocalVariableEntry {
                start_pc: 0,
                length: code_len,
                name_index: pool.add_utf8("this")?,
                descriptor_index: pool.add_utf8(&format!("L{owner};"))?,
                index: 0,
            });
        }
        let mut slot: u16 = u16::from(!is_static);
        for (i, param) in descriptor.params.iter().enumerate() {
            entries.push(LocalVariableEntry {
                start_pc: 0,
                length: code_len,
                name_index: pool.add_utf8(&param_names[i])?,
                descriptor_index: pool.add_utf8(param)?,
                index: slot,
            });
            slot += desc::slot_width(param);
        }
        if !entries.is_empty() {
            let name_index = pool.add_utf8("LocalVariableTable")?;
            code.attributes
                .push(Attribute::LocalVariableTable { name_index, entries });
        }
        return Ok(());
    }

    // Generic signatures participate in local identity, keyed by
    // (start_pc, slot) to join the two tables.
    let mut generics: FxHashMap<(u16, u16), String> = FxHashMap::default();
    for attr in &code.attributes {
        if let Attribute::LocalVariableTypeTable { entries, .. } = attr {
            for entry in entries {
                generics.insert(
                    (entry.start_pc, entry.index),
                    pool.utf8(entry.signature_index)?.to_string(),
                );
            }
        }
    }

    // Assigned names keyed by the entry's pre-repair identity, so the type
    // table can be kept in step afterwards.
    let mut assigned: FxHashMap<(u16, u16, u16), u16> = FxHashMap::default();
    let mut dedup: FxHashMap<(u16, String, Option<String>), String> = FxHashMap::default();
    let mut var_suffix: u32 = 0;

    for attr in code.attributes.iter_mut() {
        let Attribute::LocalVariableTable { entries, .. } = attr else {
            continue;
        };
        for entry in entries.iter_mut() {
            let slot = entry.index;
            let new_name = if !is_static && slot == 0 {
                "this".to_string()
            } else if let Some(&param) = slot_to_param.get(&slot) {
                param_names[param].clone()
            } else {
                let local_desc = pool.utf8(entry.descriptor_index)?.to_string();
                let generic = generics.get(&(entry.start_pc, slot)).cloned();
                let identity = (slot, local_desc, generic);
                match mapping.get_local(owner, method_name, method_desc, slot) {
                    Some(mapped) => {
                        let mapped = mapped.to_string();
                        dedup.insert(identity, mapped.clone());
                        mapped
                    }
                    // Structurally identical locals share one name.
                    None => match dedup.get(&identity) {
                        Some(previous) => previous.clone(),
                        None => {
                            let fresh = format!("var{var_suffix}");
                            var_suffix += 1;
                            dedup.insert(identity, fresh.clone());
                            fresh
                        }
                    },
                }
            };
            let name_index = pool.add_utf8(&new_name)?;
            entry.name_index = name_index;
            assigned.insert((entry.start_pc, entry.length, slot), name_index);

            // A degenerate range (start equals end) is re-pointed at the
            // method's first instruction rather than dropped.
            if entry.length == 0 {
                entry.start_pc = 0;
            }
        }
    }

    for attr in code.attributes.iter_mut() {
        let Attribute::LocalVariableTypeTable { entries, .. } = attr else {
            continue;
        };
        for entry in entries.iter_mut() {
            if let Some(&name_index) = assigned.get(&(entry.start_pc, entry.length, entry.index)) {
                entry.name_index = name_index;
            }
            if entry.length == 0 {
                entry.start_pc = 0;
            }
        }
    }

    Ok(())
}

// ----------------------------------------------------------------------
// Inner-class simple names
// ----------------------------------------------------------------------

/// Recomputes recorded simple names from the mapped qualified name, keeping
/// nested-class metadata consistent with a renamed outer/inner pair.
fn rewrite_inner_names(class: &mut ClassFile, renamer: &mut Renamer) -> RemapResult<()> {
    let ClassFile { pool, attributes, .. } = class;
    for attr in attributes.iter_mut() {
        let Attribute::InnerClasses { classes, .. } = attr else {
            continue;
        };
        for entry in classes.iter_mut() {
            if entry.inner_name == 0 {
                continue;
            }
            let qualified = pool.class_name(entry.inner_class)?.to_string();
            let mapped = renamer.map_class(&qualified);
            let simple = simple_name(&mapped);
            if pool.utf8(entry.inner_name)? != simple {
                entry.inner_name = pool.add_utf8(simple)?;
            }
        }
    }
    Ok(())
}

/// The segment after the last scope separator of a qualified name.
fn simple_name(name: &str) -> &str {
    name.rsplit(['$', '/']).next().unwrap_or(name)
}

// ----------------------------------------------------------------------
// Reference application
// ----------------------------------------------------------------------

enum RefKind {
    Field,
    Method,
}

struct RefSite {
    index: u16,
    kind: RefKind,
    owner: String,
    name: String,
    descriptor: String,
}

fn apply_references(class: &mut ClassFile, owner: &str, renamer: &mut Renamer) -> RemapResult<()> {
    let ClassFile {
        pool,
        fields,
        methods,
        attributes,
        ..
    } = class;

    // Snapshot referring structure first: original owner names must survive
    // the Class-entry re-pointing at the end.
    let mut ref_sites = Vec::new();
    let mut dynamic_sites = Vec::new();
    let mut method_types = Vec::new();
    let mut class_sites = Vec::new();
    let indices: Vec<u16> = pool.indices().collect();
    for index in indices {
        match pool.entry(index)? {
            Entry::Fieldref {
                class_index,
                name_and_type,
            } => {
                let ref_owner = pool.class_name(*class_index)?.to_string();
                let (name, descriptor) = pool.name_and_type(*name_and_type)?;
                ref_sites.push(RefSite {
                    index,
                    kind: RefKind::Field,
                    owner: ref_owner,
                    name: name.to_string(),
                    descriptor: descriptor.to_string(),
                });
            }
            Entry::Methodref {
                class_index,
                name_and_type,
            }
            | Entry::InterfaceMethodref {
                class_index,
                name_and_type,
            } => {
                let ref_owner = pool.class_name(*class_index)?.to_string();
                let (name, descriptor) = pool.name_and_type(*name_and_type)?;
                ref_sites.push(RefSite {
                    index,
                    kind: RefKind::Method,
                    owner: ref_owner,
                    name: name.to_string(),
                    descriptor: descriptor.to_string(),
                });
            }
            Entry::Dynamic { name_and_type, .. } | Entry::InvokeDynamic { name_and_type, .. } => {
                let (name, descriptor) = pool.name_and_type(*name_and_type)?;
                dynamic_sites.push((index, name.to_string(), descriptor.to_string()));
            }
            Entry::MethodType { descriptor } => {
                method_types.push((index, pool.utf8(*descriptor)?.to_string()));
            }
            Entry::Class { name } => {
                class_sites.push((index, pool.utf8(*name)?.to_string()));
            }
            _ => {}
        }
    }

    // Declared members.
    for field in fields.iter_mut() {
        let name = pool.utf8(field.name_index)?.to_string();
        let descriptor = pool.utf8(field.descriptor_index)?.to_string();
        let new_name = renamer.map_field(owner, &name, &descriptor)?;
        if new_name != name {
            field.name_index = pool.add_utf8(&new_name)?;
        }
        let new_descriptor = renamer.map_descriptor(&descriptor);
        if new_descriptor != descriptor {
            field.descriptor_index = pool.add_utf8(&new_descriptor)?;
        }
        rewrite_member_attributes(pool, &mut field.attributes, renamer)?;
    }
    for method in methods.iter_mut() {
        let name = pool.utf8(method.name_index)?.to_string();
        let descriptor = pool.utf8(method.descriptor_index)?.to_string();
        let new_name = renamer.map_method(owner, &name, &descriptor)?;
        if new_name != name {
            method.name_index = pool.add_utf8(&new_name)?;
        }
        let new_descriptor = renamer.map_descriptor(&descriptor);
        if new_descriptor != descriptor {
            method.descriptor_index = pool.add_utf8(&new_descriptor)?;
        }
        rewrite_member_attributes(pool, &mut method.attributes, renamer)?;
    }

    // Class-level attributes. EnclosingMethod reads its Class entry, so this
    // must precede the Class-entry re-pointing.
    for attr in attributes.iter_mut() {
        match attr {
            Attribute::Signature { signature, .. } => {
                let text = pool.utf8(*signature)?.to_string();
                let mapped = renamer.map_signature(&text)?;
                if mapped != text {
                    *signature = pool.add_utf8(&mapped)?;
                }
            }
            Attribute::EnclosingMethod {
                class_index,
                method_index,
                ..
            } if *method_index != 0 => {
                let enclosing_owner = pool.class_name(*class_index)?.to_string();
                let (name, descriptor) = {
                    let (n, d) = pool.name_and_type(*method_index)?;
                    (n.to_string(), d.to_string())
                };
                let new_name = renamer.map_method(&enclosing_owner, &name, &descriptor)?;
                let new_descriptor = renamer.map_descriptor(&descriptor);
                if new_name != name || new_descriptor != descriptor {
                    let n = pool.add_utf8(&new_name)?;
                    let d = pool.add_utf8(&new_descriptor)?;
                    *method_index = pool.add_name_and_type(n, d)?;
                }
            }
            _ => {}
        }
    }

    // Field and method references get fresh NameAndType entries when their
    // mapped name or descriptor changes; a NameAndType may be shared by refs
    // whose owners rename differently, so it is never edited in place.
    for site in ref_sites {
        let new_name = match site.kind {
            RefKind::Field => renamer.map_field(&site.owner, &site.name, &site.descriptor)?,
            RefKind::Method => renamer.map_method(&site.owner, &site.name, &site.descriptor)?,
        };
        let new_descriptor = renamer.map_descriptor(&site.descriptor);
        if new_name != site.name || new_descriptor != site.descriptor {
            let name = pool.add_utf8(&new_name)?;
            let descriptor = pool.add_utf8(&new_descriptor)?;
            let nat = pool.add_name_and_type(name, descriptor)?;
            if let Entry::Fieldref { name_and_type, .. }
            | Entry::Methodref { name_and_type, .. }
            | Entry::InterfaceMethodref { name_and_type, .. } = pool.entry_mut(site.index)?
            {
                *name_and_type = nat;
            }
        }
    }

    // Dynamic call sites keep their protocol name; only the descriptor
    // carries class names.
    for (index, name, descriptor) in dynamic_sites {
        let new_descriptor = renamer.map_descriptor(&descriptor);
        if new_descriptor != descriptor {
            let name = pool.add_utf8(&name)?;
            let descriptor = pool.add_utf8(&new_descriptor)?;
            let nat = pool.add_name_and_type(name, descriptor)?;
            if let Entry::Dynamic { name_and_type, .. }
            | Entry::InvokeDynamic { name_and_type, .. } = pool.entry_mut(index)?
            {
                *name_and_type = nat;
            }
        }
    }

    for (index, descriptor) in method_types {
        let new_descriptor = renamer.map_descriptor(&descriptor);
        if new_descriptor != descriptor {
            let utf8 = pool.add_utf8(&new_descriptor)?;
            if let Entry::MethodType { descriptor } = pool.entry_mut(index)? {
                *descriptor = utf8;
            }
        }
    }

    // Class entries last: this re-points every class reference in the file,
    // including the class's own name, catch types, and instruction operands.
    for (index, name) in class_sites {
        let mapped = renamer.map_class_ref(&name);
        if mapped != name {
            let utf8 = pool.add_utf8(&mapped)?;
            if let Entry::Class { name } = pool.entry_mut(index)? {
                *name = utf8;
            }
        }
    }

    Ok(())
}

/// Signature attributes and local-variable type metadata on one member.
fn rewrite_member_attributes(
    pool: &mut ConstantPool,
    attributes: &mut [Attribute],
    renamer: &mut Renamer,
) -> RemapResult<()> {
    for attr in attributes.iter_mut() {
        match attr {
            Attribute::Signature { signature, .. } => {
                let text = pool.utf8(*signature)?.to_string();
                let mapped = renamer.map_signature(&text)?;
                if mapped != text {
                    *signature = pool.add_utf8(&mapped)?;
                }
            }
            Attribute::Code(code) => {
                for code_attr in code.attributes.iter_mut() {
                    match code_attr {
                        Attribute::LocalVariableTable { entries, .. } => {
                            for entry in entries.iter_mut() {
                                let text = pool.utf8(entry.descriptor_index)?.to_string();
                                let mapped = renamer.map_descriptor(&text);
                                if mapped != text {
                                    entry.descriptor_index = pool.add_utf8(&mapped)?;
                                }
                            }
                        }
                        Attribute::LocalVariableTypeTable { entries, .. } => {
                            for entry in entries.iter_mut() {
                                let text = pool.utf8(entry.signature_index)?.to_string();
                                let mapped = renamer.map_signature(&text)?;
                                if mapped != text {
                                    entry.signature_index = pool.add_utf8(&mapped)?;
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

//! Name synthesis: a `Mapping` paired with an optional generation policy.
//!
//! In generating mode, the first lookup of an eligible symbol invents a
//! fresh unique name and records it; later lookups of the same key return
//! the recorded name. Symbols are refused a fresh name when their class is
//! outside the generation scope, when the member is inherited from an
//! ancestor (its name belongs to the ancestor's own mapping decision), or
//! when the method name is platform-mandated or compiler-synthesized.

use rustc_hash::FxHashSet;

use crate::error::RemapResult;
use crate::hierarchy::{method_descriptor_overrides, Hierarchy};
use crate::mapping::Mapping;
use crate::member::MemberRef;

/// Generation policy: the eligible class set plus the fresh-name counters.
/// Counters only ever move forward, so no two keys share a synthesized name
/// within one run.
#[derive(Debug)]
pub struct Synthesis {
    scope: FxHashSet<String>,
    class_index: u32,
    field_index: u32,
    method_index: u32,
}

impl Synthesis {
    pub fn new(scope: FxHashSet<String>) -> Self {
        Self {
            scope,
            class_index: 0,
            field_index: 0,
            method_index: 0,
        }
    }
}

/// Method names that must keep their original spelling: the initializer
/// pair, enum support methods, and compiler-generated accessors.
fn is_reserved_method(name: &str) -> bool {
    matches!(name, "<init>" | "<clinit>" | "values" | "valueOf") || name.starts_with("access$")
}

/// A `Mapping` with an optional synthesis policy attached. Lookups check the
/// table first and only invent a name when a policy is present and permits.
#[derive(Debug)]
pub struct Namer {
    mapping: Mapping,
    synthesis: Option<Synthesis>,
}

impl Namer {
    /// Fixed mode: the table alone decides, misses mean "no rename".
    pub fn new(mapping: Mapping) -> Self {
        Self {
            mapping,
            synthesis: None,
        }
    }

    /// Generating mode over the given class scope.
    pub fn generating(mapping: Mapping, scope: FxHashSet<String>) -> Self {
        Self {
            mapping,
            synthesis: Some(Synthesis::new(scope)),
        }
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn into_mapping(self) -> Mapping {
        self.mapping
    }

    /// New name for a class, or `None` for "no rename".
    pub fn class_name(&mut self, class: &str) -> Option<String> {
        let synth = match &mut self.synthesis {
            None => return self.mapping.get_class(class).map(str::to_string),
            Some(synth) => synth,
        };
        if !synth.scope.contains(class) {
            return None;
        }
        if let Some(existing) = self.mapping.get_class(class) {
            return Some(existing.to_string());
        }
        let fresh = format!("Class{}", synth.class_index);
        synth.class_index += 1;
        self.mapping.add_class(class, fresh.clone());
        Some(fresh)
    }

    /// New name for a field, or `None` for "no rename".
    pub fn field_name(
        &mut self,
        hierarchy: &mut Hierarchy,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> RemapResult<Option<String>> {
        let synth = match &mut self.synthesis {
            None => {
                return Ok(self
                    .mapping
                    .get_field(owner, name, descriptor)
                    .map(str::to_string))
            }
            Some(synth) => synth,
        };
        if !synth.scope.contains(owner) {
            return Ok(None);
        }

        // An inherited field keeps whatever name the ancestor's mapping
        // decides; inventing one here would split a single slot.
        let member = MemberRef::new(name, descriptor);
        let ancestors = hierarchy.all_ancestors(owner)?;
        for ancestor in ancestors.iter() {
            if hierarchy.inheritable_fields(ancestor)?.contains(&member) {
                return Ok(None);
            }
        }

        if let Some(existing) = self.mapping.get_field(owner, name, descriptor) {
            return Ok(Some(existing.to_string()));
        }
        let fresh = format!("field{}", synth.field_index);
        synth.field_index += 1;
        self.mapping.add_field(owner, name, descriptor, fresh.clone());
        Ok(Some(fresh))
    }

    /// New name for a method, or `None` for "no rename".
    pub fn method_name(
        &mut self,
        hierarchy: &mut Hierarchy,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> RemapResult<Option<String>> {
        let synth = match &mut self.synthesis {
            None => {
                return Ok(self
                    .mapping
                    .get_method(owner, name, descriptor)
                    .map(str::to_string))
            }
            Some(synth) => synth,
        };
        if !synth.scope.contains(owner) {
            return Ok(None);
        }
        if is_reserved_method(name) {
            return Ok(None);
        }

        let ancestors = hierarchy.all_ancestors(owner)?;
        for ancestor in ancestors.iter() {
            let candidates: Vec<MemberRef> = hierarchy
                .inheritable_methods(ancestor)?
                .iter()
                .filter(|m| m.name == name)
                .cloned()
                .collect();
            for candidate in candidates {
                if method_descriptor_overrides(hierarchy, descriptor, &candidate.descriptor)? {
                    return Ok(None);
                }
            }
        }

        if let Some(existing) = self.mapping.get_method(owner, name, descriptor) {
            return Ok(Some(existing.to_string()));
        }
        let fresh = format!("method{}", synth.method_index);
        synth.method_index += 1;
        self.mapping.add_method(owner, name, descriptor, fresh.clone());
        Ok(Some(fresh))
    }
}

//! Occurrence-time name resolution.
//!
//! The `Renamer` is consulted once per symbol occurrence while a class is
//! rewritten. Field and method references resolve through the inheritance
//! chain: when the owner has no mapping of its own, the first ancestor that
//! declares the member (for methods, one whose declaration the occurrence
//! overrides) supplies the name. When a direct mapping and an inherited one
//! disagree, the direct mapping wins and a diagnostic is recorded; detection
//! is decoupled from reporting, which is the driver's job.

use std::fmt;

use rejar_classfile::{desc, sig, ClassFileResult};

use crate::error::RemapResult;
use crate::hierarchy::{method_descriptor_overrides, Hierarchy};
use crate::mapping::Mapping;
use crate::member::MemberRef;
use crate::synthesis::Namer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Method,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Field => write!(f, "field"),
            MemberKind::Method => write!(f, "method"),
        }
    }
}

/// A mapping inconsistency: the occurrence's owner and one of its ancestors
/// assign different new names to what the hierarchy model considers one
/// inherited slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: MemberKind,
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub ancestor: String,
    pub direct: String,
    pub inherited: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{} {} inherits {}.{} but is mapped to `{}` there and `{}` here; keeping `{}`",
            self.kind,
            self.owner,
            self.name,
            self.descriptor,
            self.ancestor,
            self.name,
            self.inherited,
            self.direct,
            self.direct,
        )
    }
}

/// The authoritative name-resolution service for one archive operation.
/// Owns the symbol table (possibly generating) and the hierarchy index, and
/// aggregates inconsistency diagnostics as it goes.
pub struct Renamer {
    namer: Namer,
    hierarchy: Hierarchy,
    diagnostics: Vec<Diagnostic>,
}

impl Renamer {
    pub fn new(namer: Namer, hierarchy: Hierarchy) -> Self {
        Self {
            namer,
            hierarchy,
            diagnostics: Vec::new(),
        }
    }

    /// The symbol table, for parameter/local lookups which have no
    /// inheritance semantics.
    pub fn mapping(&self) -> &Mapping {
        self.namer.mapping()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Recovers the table and the aggregated diagnostics after the run.
    pub fn into_parts(self) -> (Namer, Vec<Diagnostic>) {
        (self.namer, self.diagnostics)
    }

    /// New name for a plain class reference; unmapped classes pass through.
    pub fn map_class(&mut self, name: &str) -> String {
        self.namer
            .class_name(name)
            .unwrap_or_else(|| name.to_string())
    }

    /// New name for a class reference that may be an array descriptor (as
    /// they appear in `Class` constants).
    pub fn map_class_ref(&mut self, name: &str) -> String {
        if name.starts_with('[') {
            desc::remap_descriptor(name, |n| self.map_class(n))
        } else {
            self.map_class(name)
        }
    }

    /// Rewrites every class name in a field or method descriptor.
    pub fn map_descriptor(&mut self, descriptor: &str) -> String {
        desc::remap_descriptor(descriptor, |n| self.map_class(n))
    }

    /// Rewrites every class name in a generic signature.
    pub fn map_signature(&mut self, signature: &str) -> ClassFileResult<String> {
        sig::remap_signature(signature, |n| self.map_class(n))
    }

    /// Resolves a field occurrence to the name to emit.
    pub fn map_field(&mut self, owner: &str, name: &str, descriptor: &str) -> RemapResult<String> {
        let direct = self
            .namer
            .field_name(&mut self.hierarchy, owner, name, descriptor)?;

        let member = MemberRef::new(name, descriptor);
        let ancestors = self.hierarchy.all_ancestors(owner)?;
        for ancestor in ancestors.iter() {
            if !self.hierarchy.inheritable_fields(ancestor)?.contains(&member) {
                continue;
            }
            if let Some(inherited) =
                self.namer
                    .field_name(&mut self.hierarchy, ancestor, name, descriptor)?
            {
                return Ok(self.resolve_conflict(
                    MemberKind::Field,
                    owner,
                    name,
                    descriptor,
                    ancestor,
                    direct,
                    inherited,
                ));
            }
        }

        Ok(direct.unwrap_or_else(|| name.to_string()))
    }

    /// Resolves a method occurrence to the name to emit. Ancestor candidates
    /// are filtered by override compatibility rather than exact signature
    /// equality, since an override may narrow the return type.
    pub fn map_method(&mut self, owner: &str, name: &str, descriptor: &str) -> RemapResult<String> {
        let direct = self
            .namer
            .method_name(&mut self.hierarchy, owner, name, descriptor)?;

        let ancestors = self.hierarchy.all_ancestors(owner)?;
        for ancestor in ancestors.iter() {
            let candidates: Vec<MemberRef> = self
                .hierarchy
                .inheritable_methods(ancestor)?
                .iter()
                .filter(|m| m.name == name)
                .cloned()
                .collect();
            let mut overridden = false;
            for candidate in candidates {
                if method_descriptor_overrides(&mut self.hierarchy, descriptor, &candidate.descriptor)? {
                    overridden = true;
                    break;
                }
            }
            if !overridden {
                continue;
            }
            if let Some(inherited) =
                self.namer
                    .method_name(&mut self.hierarchy, ancestor, name, descriptor)?
            {
                return Ok(self.resolve_conflict(
                    MemberKind::Method,
                    owner,
                    name,
                    descriptor,
                    ancestor,
                    direct,
                    inherited,
                ));
            }
        }

        Ok(direct.unwrap_or_else(|| name.to_string()))
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_conflict(
        &mut self,
        kind: MemberKind,
        owner: &str,
        name: &str,
        descriptor: &str,
        ancestor: &str,
        direct: Option<String>,
        inherited: String,
    ) -> String {
        match direct {
            None => inherited,
            Some(direct) => {
                if direct != inherited {
                    self.diagnostics.push(Diagnostic {
                        kind,
                        owner: owner.to_string(),
                        name: name.to_string(),
                        descriptor: descriptor.to_string(),
                        ancestor: ancestor.to_string(),
                        direct: direct.clone(),
                        inherited,
                    });
                }
                direct
            }
        }
    }
}

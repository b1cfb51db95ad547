//! Class hierarchy index with lazy classpath resolution.
//!
//! Two-tier store: entries for classes in the primary archive are recorded
//! by the scan pass (`add_class`); any other class queried is resolved once
//! from the auxiliary classpath and cached, including the "not found" case,
//! which is cached as an empty entry and never retried. Ancestor sets are
//! memoized per class for the life of the index.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use rejar_classfile::desc::{self, MethodDescriptor};
use rejar_classfile::{access, ClassFile, ClassFileResult};

use crate::error::{RemapError, RemapResult};
use crate::member::MemberRef;

/// Recorded as a supertype of every class carrying the enum flag.
const ENUM_BASE: &str = "java/lang/Enum";

/// Which declared members count as visible to subclasses.
///
/// Renames must stay consistent across any visibility boundary the rewriter
/// cannot fully verify, so the broad policy is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InheritPolicy {
    /// Everything except private members.
    #[default]
    NonPrivate,
    /// Only public and protected members.
    PublicProtected,
}

impl InheritPolicy {
    fn admits(self, access_flags: u16) -> bool {
        match self {
            InheritPolicy::NonPrivate => access_flags & access::PRIVATE == 0,
            InheritPolicy::PublicProtected => {
                access_flags & (access::PUBLIC | access::PROTECTED) != 0
            }
        }
    }
}

/// Looks up class bytes outside the primary archive.
pub trait ClassResolver {
    /// Returns the raw class-file bytes for `name`, or `None` when the class
    /// is not on this resolver's search path.
    fn find_class(&mut self, name: &str) -> io::Result<Option<Vec<u8>>>;
}

/// A resolver with an empty search path.
#[derive(Debug, Default)]
pub struct NoClasspath;

impl ClassResolver for NoClasspath {
    fn find_class(&mut self, _name: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

enum Root {
    Dir(PathBuf),
    Jar(Box<zip::ZipArchive<File>>),
}

/// Resolver over a list of directories and jar files, searched in order.
pub struct Classpath {
    roots: Vec<Root>,
}

impl Classpath {
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> RemapResult<Self> {
        let mut roots = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            if path.is_dir() {
                roots.push(Root::Dir(path.to_path_buf()));
            } else {
                let file = File::open(path).map_err(|source| RemapError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                let archive = zip::ZipArchive::new(file).map_err(|source| RemapError::Archive {
                    path: path.to_path_buf(),
                    source,
                })?;
                roots.push(Root::Jar(Box::new(archive)));
            }
        }
        Ok(Self { roots })
    }
}

impl ClassResolver for Classpath {
    fn find_class(&mut self, name: &str) -> io::Result<Option<Vec<u8>>> {
        let file_name = format!("{name}.class");
        for root in &mut self.roots {
            match root {
                Root::Dir(dir) => {
                    let path = dir.join(&file_name);
                    if path.is_file() {
                        return std::fs::read(path).map(Some);
                    }
                }
                Root::Jar(archive) => match archive.by_name(&file_name) {
                    Ok(mut entry) => {
                        let mut bytes = Vec::with_capacity(entry.size() as usize);
                        entry.read_to_end(&mut bytes)?;
                        return Ok(Some(bytes));
                    }
                    Err(zip::result::ZipError::FileNotFound) => {}
                    Err(e) => return Err(io::Error::new(io::ErrorKind::Other, e)),
                },
            }
        }
        Ok(None)
    }
}

#[derive(Debug, Default)]
struct ClassEntry {
    /// Declared superclass, then interfaces, in declaration order.
    supertypes: Vec<String>,
    fields: FxHashSet<MemberRef>,
    methods: FxHashSet<MemberRef>,
}

/// The hierarchy index and query service.
pub struct Hierarchy {
    policy: InheritPolicy,
    resolver: Box<dyn ClassResolver>,
    classes: FxHashMap<String, ClassEntry>,
    ancestors: FxHashMap<String, Rc<Vec<String>>>,
}

impl Hierarchy {
    pub fn new(policy: InheritPolicy, resolver: Box<dyn ClassResolver>) -> Self {
        Self {
            policy,
            resolver,
            classes: FxHashMap::default(),
            ancestors: FxHashMap::default(),
        }
    }

    /// Records a class scanned from the primary archive.
    pub fn add_class(&mut self, class: &ClassFile) -> ClassFileResult<()> {
        let name = class.name()?.to_string();
        let entry = build_entry(self.policy, class)?;
        self.classes.entry(name).or_insert(entry);
        Ok(())
    }

    fn entry(&mut self, name: &str) -> RemapResult<&ClassEntry> {
        if !self.classes.contains_key(name) {
            let resolved = self.resolve(name)?;
            self.classes.insert(name.to_string(), resolved);
        }
        Ok(self.classes.get(name).expect("entry inserted above"))
    }

    fn resolve(&mut self, name: &str) -> RemapResult<ClassEntry> {
        let bytes = self
            .resolver
            .find_class(name)
            .map_err(|source| RemapError::ClasspathIo {
                class: name.to_string(),
                source,
            })?;
        match bytes {
            // Cached as "no information"; the lookup is never retried.
            None => Ok(ClassEntry::default()),
            Some(bytes) => {
                let class = ClassFile::parse(&bytes).map_err(|source| {
                    RemapError::MalformedClasspathClass {
                        name: name.to_string(),
                        source,
                    }
                })?;
                build_entry(self.policy, &class).map_err(|source| {
                    RemapError::MalformedClasspathClass {
                        name: name.to_string(),
                        source,
                    }
                })
            }
        }
    }

    /// Declared superclass and interfaces; empty for the root object type
    /// and for unresolvable classes.
    pub fn direct_supertypes(&mut self, name: &str) -> RemapResult<Vec<String>> {
        Ok(self.entry(name)?.supertypes.clone())
    }

    /// Transitive closure of `direct_supertypes`, memoized. Worklist
    /// traversal with an explicit visited set: duplicate paths and cycles
    /// terminate, and depth costs no stack.
    pub fn all_ancestors(&mut self, name: &str) -> RemapResult<Rc<Vec<String>>> {
        if let Some(cached) = self.ancestors.get(name) {
            return Ok(Rc::clone(cached));
        }

        let mut result = Vec::new();
        let mut seen = FxHashSet::default();
        let mut worklist = self.entry(name)?.supertypes.clone();
        while let Some(current) = worklist.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            worklist.extend(self.entry(&current)?.supertypes.iter().cloned());
            result.push(current);
        }

        let result = Rc::new(result);
        self.ancestors.insert(name.to_string(), Rc::clone(&result));
        Ok(result)
    }

    /// Fields declared directly on `name` that a subclass can see.
    pub fn inheritable_fields(&mut self, name: &str) -> RemapResult<&FxHashSet<MemberRef>> {
        Ok(&self.entry(name)?.fields)
    }

    /// Methods declared directly on `name` that a subclass can see.
    pub fn inheritable_methods(&mut self, name: &str) -> RemapResult<&FxHashSet<MemberRef>> {
        Ok(&self.entry(name)?.methods)
    }
}

impl std::fmt::Debug for Hierarchy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hierarchy")
            .field("classes", &self.classes.len())
            .field("memoized", &self.ancestors.len())
            .finish()
    }
}

fn build_entry(policy: InheritPolicy, class: &ClassFile) -> ClassFileResult<ClassEntry> {
    let mut supertypes = Vec::new();
    if let Some(super_name) = class.super_name()? {
        supertypes.push(super_name.to_string());
    }
    for interface in class.interface_names()? {
        if !supertypes.iter().any(|s| s == interface) {
            supertypes.push(interface.to_string());
        }
    }
    if class.is_enum() && !supertypes.iter().any(|s| s == ENUM_BASE) {
        supertypes.push(ENUM_BASE.to_string());
    }

    let mut fields = FxHashSet::default();
    for field in &class.fields {
        if policy.admits(field.access) {
            fields.insert(MemberRef::new(
                field.name(&class.pool)?,
                field.descriptor(&class.pool)?,
            ));
        }
    }
    let mut methods = FxHashSet::default();
    for method in &class.methods {
        if policy.admits(method.access) {
            methods.insert(MemberRef::new(
                method.name(&class.pool)?,
                method.descriptor(&class.pool)?,
            ));
        }
    }

    Ok(ClassEntry {
        supertypes,
        fields,
        methods,
    })
}

/// Whether a method with `descriptor` in a subtype occupies the same virtual
/// slot as a same-named ancestor method with `candidate`: parameter types
/// must be identical position by position, the return type identical or a
/// transitive subtype of the candidate's (object types only).
pub fn method_descriptor_overrides(
    hierarchy: &mut Hierarchy,
    descriptor: &str,
    candidate: &str,
) -> RemapResult<bool> {
    let own = MethodDescriptor::parse(descriptor)?;
    let other = MethodDescriptor::parse(candidate)?;

    if own.params.len() != other.params.len() {
        return Ok(false);
    }
    if own.params.iter().zip(&other.params).any(|(a, b)| a != b) {
        return Ok(false);
    }

    if own.ret == other.ret {
        return Ok(true);
    }
    match (desc::object_type(&own.ret), desc::object_type(&other.ret)) {
        (Some(own_ret), Some(other_ret)) => {
            Ok(hierarchy.all_ancestors(own_ret)?.iter().any(|a| a == other_ret))
        }
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{add_field, add_method, class_with};

    fn hierarchy() -> Hierarchy {
        Hierarchy::new(InheritPolicy::default(), Box::new(NoClasspath))
    }

    #[test]
    fn test_transitive_ancestors() {
        let mut h = hierarchy();
        h.add_class(&class_with("a/C", Some("a/B"), &["a/I"], 0)).unwrap();
        h.add_class(&class_with("a/B", Some("java/lang/Object"), &[], 0)).unwrap();
        h.add_class(&class_with("a/I", Some("java/lang/Object"), &[], access::INTERFACE)).unwrap();
        h.add_class(&class_with("java/lang/Object", None, &[], 0)).unwrap();

        let ancestors = h.all_ancestors("a/C").unwrap();
        for expected in ["a/B", "a/I", "java/lang/Object"] {
            assert!(ancestors.iter().any(|a| a == expected), "missing {expected}");
        }
        // Closure property: every ancestor's direct supertypes are ancestors.
        for a in ancestors.iter() {
            for s in h.direct_supertypes(a).unwrap() {
                assert!(h.all_ancestors("a/C").unwrap().iter().any(|x| *x == s));
            }
        }
    }

    #[test]
    fn test_root_has_no_ancestors() {
        let mut h = hierarchy();
        h.add_class(&class_with("java/lang/Object", None, &[], 0)).unwrap();
        assert!(h.all_ancestors("java/lang/Object").unwrap().is_empty());
    }

    #[test]
    fn test_cyclic_graph_terminates() {
        let mut h = hierarchy();
        h.add_class(&class_with("a/A", Some("a/B"), &[], 0)).unwrap();
        h.add_class(&class_with("a/B", Some("a/A"), &[], 0)).unwrap();
        let ancestors = h.all_ancestors("a/A").unwrap();
        assert!(ancestors.iter().any(|a| a == "a/B"));
    }

    #[test]
    fn test_unknown_class_is_cached_empty() {
        let mut h = hierarchy();
        assert!(h.all_ancestors("no/Such").unwrap().is_empty());
        assert!(h.inheritable_fields("no/Such").unwrap().is_empty());
    }

    #[test]
    fn test_memoization_returns_same_rc() {
        let mut h = hierarchy();
        h.add_class(&class_with("a/B", Some("java/lang/Object"), &[], 0)).unwrap();
        let first = h.all_ancestors("a/B").unwrap();
        let second = h.all_ancestors("a/B").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_enum_gains_enum_base() {
        let mut h = hierarchy();
        h.add_class(&class_with("a/Color", Some("java/lang/Enum"), &[], access::ENUM)).unwrap();
        let supers = h.direct_supertypes("a/Color").unwrap();
        assert_eq!(supers.iter().filter(|s| *s == "java/lang/Enum").count(), 1);
    }

    #[test]
    fn test_inherit_policy() {
        let mut class = class_with("a/B", Some("java/lang/Object"), &[], 0);
        add_field(&mut class, "pub", "I", access::PUBLIC);
        add_field(&mut class, "pkg", "I", 0);
        add_field(&mut class, "priv", "I", access::PRIVATE);

        let mut broad = hierarchy();
        broad.add_class(&class).unwrap();
        let fields = broad.inheritable_fields("a/B").unwrap();
        assert!(fields.contains(&MemberRef::new("pub", "I")));
        assert!(fields.contains(&MemberRef::new("pkg", "I")));
        assert!(!fields.contains(&MemberRef::new("priv", "I")));

        let mut narrow = Hierarchy::new(InheritPolicy::PublicProtected, Box::new(NoClasspath));
        narrow.add_class(&class).unwrap();
        let fields = narrow.inheritable_fields("a/B").unwrap();
        assert!(fields.contains(&MemberRef::new("pub", "I")));
        assert!(!fields.contains(&MemberRef::new("pkg", "I")));
    }

    #[test]
    fn test_override_identical_descriptors() {
        let mut h = hierarchy();
        assert!(method_descriptor_overrides(&mut h, "(I)V", "(I)V").unwrap());
    }

    #[test]
    fn test_override_rejects_different_params() {
        let mut h = hierarchy();
        // Different erased parameter types never override each other.
        assert!(!method_descriptor_overrides(&mut h, "(I)V", "(Ljava/lang/Object;)V").unwrap());
        assert!(!method_descriptor_overrides(&mut h, "(II)V", "(I)V").unwrap());
    }

    #[test]
    fn test_override_covariant_return() {
        let mut h = hierarchy();
        h.add_class(&class_with("a/Sub", Some("a/Base"), &[], 0)).unwrap();
        h.add_class(&class_with("a/Base", Some("java/lang/Object"), &[], 0)).unwrap();

        assert!(method_descriptor_overrides(&mut h, "()La/Sub;", "()La/Base;").unwrap());
        // Transitive covariance.
        assert!(method_descriptor_overrides(&mut h, "()La/Sub;", "()Ljava/lang/Object;").unwrap());
        // Not the other direction.
        assert!(!method_descriptor_overrides(&mut h, "()La/Base;", "()La/Sub;").unwrap());
        // Primitive returns must match exactly.
        assert!(!method_descriptor_overrides(&mut h, "()I", "()J").unwrap());
    }

    #[test]
    fn test_methods_respect_policy() {
        let mut class = class_with("a/B", Some("java/lang/Object"), &[], 0);
        add_method(&mut class, "visible", "()V", access::PROTECTED);
        add_method(&mut class, "hidden", "()V", access::PRIVATE);

        let mut h = hierarchy();
        h.add_class(&class).unwrap();
        let methods = h.inheritable_methods("a/B").unwrap();
        assert!(methods.contains(&MemberRef::new("visible", "()V")));
        assert!(!methods.contains(&MemberRef::new("hidden", "()V")));
    }
}

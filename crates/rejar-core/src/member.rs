//! Member references.

/// A field or method identified by name and type descriptor, independent of
/// its owner. Used as a set element when asking whether a class declares an
/// inheritable member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub name: String,
    pub descriptor: String,
}

impl MemberRef {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

impl std::fmt::Display for MemberRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.descriptor)
    }
}

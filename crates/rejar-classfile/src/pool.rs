//! Constant pool model.
//!
//! The pool is parsed in full and mutated append-only: a rewrite appends new
//! `Utf8`/`NameAndType` entries and re-points the indices of referring
//! entries, but never edits a payload in place. Raw attribute bodies and the
//! instruction stream embed pool indices; append-only mutation keeps those
//! indices valid without re-encoding anything.

use rustc_hash::FxHashMap;

use crate::error::{ClassFileError, ClassFileResult};
use crate::reader::ByteReader;

/// A single constant pool entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// Payload kept as raw bytes; entries used as names or descriptors must
    /// additionally decode as UTF-8.
    Utf8(Vec<u8>),
    Integer(i32),
    /// IEEE-754 bit pattern, kept raw so unusual payloads round-trip.
    Float(u32),
    Long(i64),
    /// IEEE-754 bit pattern.
    Double(u64),
    Class { name: u16 },
    String { utf8: u16 },
    Fieldref { class_index: u16, name_and_type: u16 },
    Methodref { class_index: u16, name_and_type: u16 },
    InterfaceMethodref { class_index: u16, name_and_type: u16 },
    NameAndType { name: u16, descriptor: u16 },
    MethodHandle { kind: u8, reference: u16 },
    MethodType { descriptor: u16 },
    Dynamic { bootstrap_method: u16, name_and_type: u16 },
    InvokeDynamic { bootstrap_method: u16, name_and_type: u16 },
    Module { name: u16 },
    Package { name: u16 },
}

impl Entry {
    pub fn tag(&self) -> u8 {
        match self {
            Entry::Utf8(_) => 1,
            Entry::Integer(_) => 3,
            Entry::Float(_) => 4,
            Entry::Long(_) => 5,
            Entry::Double(_) => 6,
            Entry::Class { .. } => 7,
            Entry::String { .. } => 8,
            Entry::Fieldref { .. } => 9,
            Entry::Methodref { .. } => 10,
            Entry::InterfaceMethodref { .. } => 11,
            Entry::NameAndType { .. } => 12,
            Entry::MethodHandle { .. } => 15,
            Entry::MethodType { .. } => 16,
            Entry::Dynamic { .. } => 17,
            Entry::InvokeDynamic { .. } => 18,
            Entry::Module { .. } => 19,
            Entry::Package { .. } => 20,
        }
    }

    /// Long and Double occupy two pool slots.
    #[inline]
    pub fn is_wide(&self) -> bool {
        matches!(self, Entry::Long(_) | Entry::Double(_))
    }
}

/// The constant pool of one class file.
///
/// Slot 0 is unused and wide entries are followed by an empty slot, exactly
/// as in the on-disk numbering.
pub struct ConstantPool {
    entries: Vec<Option<Entry>>,
    utf8_lookup: FxHashMap<String, u16>,
    nat_lookup: FxHashMap<(u16, u16), u16>,
}

impl ConstantPool {
    /// Creates an empty pool (used by tests and synthetic class builders).
    pub fn new() -> Self {
        Self {
            entries: vec![None],
            utf8_lookup: FxHashMap::default(),
            nat_lookup: FxHashMap::default(),
        }
    }

    pub fn parse(r: &mut ByteReader<'_>) -> ClassFileResult<Self> {
        let count = r.read_u16()? as usize;
        let mut entries: Vec<Option<Entry>> = Vec::with_capacity(count.max(1));
        entries.push(None);

        while entries.len() < count {
            let index = entries.len() as u16;
            let tag = r.read_u8()?;
            let entry = match tag {
                1 => {
                    let len = r.read_u16()? as usize;
                    Entry::Utf8(r.read_bytes(len)?.to_vec())
                }
                3 => Entry::Integer(r.read_u32()? as i32),
                4 => Entry::Float(r.read_u32()?),
                5 => Entry::Long(r.read_u64()? as i64),
                6 => Entry::Double(r.read_u64()?),
                7 => Entry::Class { name: r.read_u16()? },
                8 => Entry::String { utf8: r.read_u16()? },
                9 => Entry::Fieldref {
                    class_index: r.read_u16()?,
                    name_and_type: r.read_u16()?,
                },
                10 => Entry::Methodref {
                    class_index: r.read_u16()?,
                    name_and_type: r.read_u16()?,
                },
                11 => Entry::InterfaceMethodref {
                    class_index: r.read_u16()?,
                    name_and_type: r.read_u16()?,
                },
                12 => Entry::NameAndType {
                    name: r.read_u16()?,
                    descriptor: r.read_u16()?,
                },
                15 => Entry::MethodHandle {
                    kind: r.read_u8()?,
                    reference: r.read_u16()?,
                },
                16 => Entry::MethodType {
                    descriptor: r.read_u16()?,
                },
                17 => Entry::Dynamic {
                    bootstrap_method: r.read_u16()?,
                    name_and_type: r.read_u16()?,
                },
                18 => Entry::InvokeDynamic {
                    bootstrap_method: r.read_u16()?,
                    name_and_type: r.read_u16()?,
                },
                19 => Entry::Module { name: r.read_u16()? },
                20 => Entry::Package { name: r.read_u16()? },
                _ => return Err(ClassFileError::BadConstantTag { index, tag }),
            };
            let wide = entry.is_wide();
            entries.push(Some(entry));
            if wide {
                entries.push(None);
            }
        }
        // A wide entry in the last slot would run past the declared count.
        if entries.len() != count {
            return Err(ClassFileError::BadPoolIndex(count as u16));
        }

        let mut pool = Self {
            entries,
            utf8_lookup: FxHashMap::default(),
            nat_lookup: FxHashMap::default(),
        };
        pool.rebuild_lookups();
        Ok(pool)
    }

    fn rebuild_lookups(&mut self) {
        for index in 1..self.entries.len() {
            match &self.entries[index] {
                Some(Entry::Utf8(bytes)) => {
                    if let Ok(s) = std::str::from_utf8(bytes) {
                        self.utf8_lookup.entry(s.to_string()).or_insert(index as u16);
                    }
                }
                Some(Entry::NameAndType { name, descriptor }) => {
                    self.nat_lookup.entry((*name, *descriptor)).or_insert(index as u16);
                }
                _ => {}
            }
        }
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.entries.len() as u16).to_be_bytes());
        for entry in self.entries.iter().flatten() {
            out.push(entry.tag());
            match entry {
                Entry::Utf8(bytes) => {
                    out.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
                    out.extend_from_slice(bytes);
                }
                Entry::Integer(v) => out.extend_from_slice(&v.to_be_bytes()),
                Entry::Float(bits) => out.extend_from_slice(&bits.to_be_bytes()),
                Entry::Long(v) => out.extend_from_slice(&v.to_be_bytes()),
                Entry::Double(bits) => out.extend_from_slice(&bits.to_be_bytes()),
                Entry::Class { name }
                | Entry::Module { name }
                | Entry::Package { name } => out.extend_from_slice(&name.to_be_bytes()),
                Entry::String { utf8 } => out.extend_from_slice(&utf8.to_be_bytes()),
                Entry::Fieldref { class_index, name_and_type }
                | Entry::Methodref { class_index, name_and_type }
                | Entry::InterfaceMethodref { class_index, name_and_type } => {
                    out.extend_from_slice(&class_index.to_be_bytes());
                    out.extend_from_slice(&name_and_type.to_be_bytes());
                }
                Entry::NameAndType { name, descriptor } => {
                    out.extend_from_slice(&name.to_be_bytes());
                    out.extend_from_slice(&descriptor.to_be_bytes());
                }
                Entry::MethodHandle { kind, reference } => {
                    out.push(*kind);
                    out.extend_from_slice(&reference.to_be_bytes());
                }
                Entry::MethodType { descriptor } => {
                    out.extend_from_slice(&descriptor.to_be_bytes())
                }
                Entry::Dynamic { bootstrap_method, name_and_type }
                | Entry::InvokeDynamic { bootstrap_method, name_and_type } => {
                    out.extend_from_slice(&bootstrap_method.to_be_bytes());
                    out.extend_from_slice(&name_and_type.to_be_bytes());
                }
            }
        }
    }

    /// Number of pool slots, including slot 0 and wide padding slots.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over the indices of populated entries.
    pub fn indices(&self) -> impl Iterator<Item = u16> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|_| i as u16))
    }

    pub fn entry(&self, index: u16) -> ClassFileResult<&Entry> {
        self.entries
            .get(index as usize)
            .and_then(|e| e.as_ref())
            .ok_or(ClassFileError::BadPoolIndex(index))
    }

    pub fn entry_mut(&mut self, index: u16) -> ClassFileResult<&mut Entry> {
        self.entries
            .get_mut(index as usize)
            .and_then(|e| e.as_mut())
            .ok_or(ClassFileError::BadPoolIndex(index))
    }

    pub fn utf8(&self, index: u16) -> ClassFileResult<&str> {
        match self.entry(index)? {
            Entry::Utf8(bytes) => {
                std::str::from_utf8(bytes).map_err(|_| ClassFileError::BadUtf8(index))
            }
            _ => Err(ClassFileError::BadPoolIndex(index)),
        }
    }

    /// Resolves a `Class` entry to its internal name (or array descriptor).
    pub fn class_name(&self, index: u16) -> ClassFileResult<&str> {
        match self.entry(index)? {
            Entry::Class { name } => self.utf8(*name),
            _ => Err(ClassFileError::BadPoolIndex(index)),
        }
    }

    /// Resolves a `NameAndType` entry to its (name, descriptor) strings.
    pub fn name_and_type(&self, index: u16) -> ClassFileResult<(&str, &str)> {
        match self.entry(index)? {
            Entry::NameAndType { name, descriptor } => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => Err(ClassFileError::BadPoolIndex(index)),
        }
    }

    /// Appends an entry and returns its index.
    pub fn add_entry(&mut self, entry: Entry) -> ClassFileResult<u16> {
        let index = self.entries.len();
        let width = if entry.is_wide() { 2 } else { 1 };
        // The slot count itself is serialized as a u16.
        if index + width > u16::MAX as usize {
            return Err(ClassFileError::PoolOverflow);
        }
        let wide = entry.is_wide();
        match &entry {
            Entry::Utf8(bytes) => {
                if let Ok(s) = std::str::from_utf8(bytes) {
                    self.utf8_lookup.entry(s.to_string()).or_insert(index as u16);
                }
            }
            Entry::NameAndType { name, descriptor } => {
                self.nat_lookup.entry((*name, *descriptor)).or_insert(index as u16);
            }
            _ => {}
        }
        self.entries.push(Some(entry));
        if wide {
            self.entries.push(None);
        }
        Ok(index as u16)
    }

    /// Returns the index of a UTF-8 entry with this content, appending one
    /// if the pool does not already contain it.
    pub fn add_utf8(&mut self, value: &str) -> ClassFileResult<u16> {
        if let Some(&index) = self.utf8_lookup.get(value) {
            return Ok(index);
        }
        self.add_entry(Entry::Utf8(value.as_bytes().to_vec()))
    }

    /// Returns the index of a `NameAndType` entry with these components,
    /// appending one if needed.
    pub fn add_name_and_type(&mut self, name: u16, descriptor: u16) -> ClassFileResult<u16> {
        if let Some(&index) = self.nat_lookup.get(&(name, descriptor)) {
            return Ok(index);
        }
        self.add_entry(Entry::NameAndType { name, descriptor })
    }

    /// Appends a `Class` entry naming `name` (used by synthetic builders).
    pub fn add_class(&mut self, name: &str) -> ClassFileResult<u16> {
        let utf8 = self.add_utf8(name)?;
        self.add_entry(Entry::Class { name: utf8 })
    }
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConstantPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstantPool")
            .field("slots", &self.entries.len())
            .finish()
    }
}

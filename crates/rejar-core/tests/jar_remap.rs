//! Integration tests: build a jar in memory, remap it, inspect the output.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use rejar_classfile::pool::Entry;
use rejar_classfile::{access, ClassFile, ConstantPool, MemberInfo};
use rejar_core::jar::JarRemapper;
use rejar_core::mapping::Mapping;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

fn class_bytes(build: impl FnOnce(&mut ClassFile)) -> Vec<u8> {
    let mut pool = ConstantPool::new();
    let this_class = pool.add_class("placeholder").unwrap();
    let super_class = pool.add_class("java/lang/Object").unwrap();
    let mut class = ClassFile {
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
    };
    build(&mut class);
    class.to_bytes()
}

fn named_class(name: &str, super_name: &str, build: impl FnOnce(&mut ClassFile)) -> Vec<u8> {
    class_bytes(|class| {
        class.this_class = class.pool.add_class(name).unwrap();
        class.super_class = class.pool.add_class(super_name).unwrap();
        build(class);
    })
}

fn add_method(class: &mut ClassFile, name: &str, descriptor: &str, access_flags: u16) {
    let name_index = class.pool.add_utf8(name).unwrap();
    let descriptor_index = class.pool.add_utf8(descriptor).unwrap();
    class.methods.push(MemberInfo {
        access: access_flags,
        name_index,
        descriptor_index,
        attributes: Vec::new(),
    });
}

fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    for (name, bytes) in entries {
        writer
            .start_file(name.to_string(), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap();
}

fn read_jar(path: &Path) -> Vec<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let name = entry.name().to_string();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).unwrap();
        entries.push((name, bytes));
    }
    entries
}

fn entry<'a>(entries: &'a [(String, Vec<u8>)], name: &str) -> &'a [u8] {
    &entries
        .iter()
        .find(|(n, _)| n == name)
        .unwrap_or_else(|| panic!("missing entry {name}, have {:?}",
            entries.iter().map(|(n, _)| n).collect::<Vec<_>>()))
        .1
}

#[test]
fn test_remap_with_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jar");
    let output = dir.path().join("out.jar");

    let base = named_class("a/Base", "java/lang/Object", |class| {
        add_method(class, "m", "()V", access::PUBLIC);
    });
    // Derived declares no m but its pool references Base.m through itself.
    let derived = named_class("a/Derived", "a/Base", |class| {
        let owner = class.this_class;
        let n = class.pool.add_utf8("m").unwrap();
        let d = class.pool.add_utf8("()V").unwrap();
        let nat = class.pool.add_name_and_type(n, d).unwrap();
        class
            .pool
            .add_entry(Entry::Methodref {
                class_index: owner,
                name_and_type: nat,
            })
            .unwrap();
    });

    write_jar(
        &input,
        &[
            ("a/Base.class", &base),
            ("a/Derived.class", &derived),
            ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n"),
            ("META-INF/CERT.SF", b"signature"),
            ("data/config.txt", b"hello"),
        ],
    );

    let mut mapping = Mapping::new();
    mapping.add_class("a/Base", "x/Core");
    mapping.add_method("a/Base", "m", "()V", "run");

    let outcome = JarRemapper::new(mapping).remap(&input, &output).unwrap();
    assert_eq!(outcome.classes_rewritten, 2);
    assert_eq!(outcome.resources_copied, 2);
    assert_eq!(outcome.signatures_dropped, 1);
    assert!(outcome.diagnostics.is_empty());

    let entries = read_jar(&output);
    assert!(entries.iter().all(|(n, _)| !n.ends_with(".SF")));
    assert_eq!(entry(&entries, "data/config.txt"), b"hello");

    let renamed_base = ClassFile::parse(entry(&entries, "x/Core.class")).unwrap();
    assert_eq!(renamed_base.name().unwrap(), "x/Core");
    assert_eq!(
        renamed_base.methods[0].name(&renamed_base.pool).unwrap(),
        "run"
    );

    let derived = ClassFile::parse(entry(&entries, "a/Derived.class")).unwrap();
    assert_eq!(derived.super_name().unwrap(), Some("x/Core"));
    // The inherited call site renames with the base declaration.
    let mut found = false;
    for index in derived.pool.indices() {
        if let Entry::Methodref { name_and_type, .. } = derived.pool.entry(index).unwrap() {
            let (name, descriptor) = derived.pool.name_and_type(*name_and_type).unwrap();
            assert_eq!((name, descriptor), ("run", "()V"));
            found = true;
        }
    }
    assert!(found, "method ref survived");
}

#[test]
fn test_generate_mode_synthesizes_and_reports_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jar");
    let output = dir.path().join("out.jar");

    let base = named_class("a/Base", "java/lang/Object", |class| {
        add_method(class, "<init>", "()V", access::PUBLIC);
        add_method(class, "doWork", "()V", access::PUBLIC);
    });
    let derived = named_class("a/Derived", "a/Base", |class| {
        // Overrides doWork: must share the base name, not get its own.
        add_method(class, "doWork", "()V", access::PUBLIC);
    });

    write_jar(
        &input,
        &[("a/Base.class", &base), ("a/Derived.class", &derived)],
    );

    let outcome = JarRemapper::generating(Mapping::new())
        .remap(&input, &output)
        .unwrap();

    let mapping = &outcome.mapping;
    assert_eq!(mapping.classes.len(), 2);
    assert!(mapping.get_class("a/Base").is_some());
    assert!(mapping.get_class("a/Derived").is_some());
    // Initializers keep their names; doWork is renamed once, on the base.
    assert!(mapping.get_method("a/Base", "<init>", "()V").is_none());
    let base_new = mapping.get_method("a/Base", "doWork", "()V").unwrap();
    assert!(mapping.get_method("a/Derived", "doWork", "()V").is_none());

    let entries = read_jar(&output);
    let base_entry = format!("{}.class", mapping.get_class("a/Base").unwrap());
    let renamed = ClassFile::parse(entry(&entries, &base_entry)).unwrap();
    let names: Vec<&str> = renamed
        .methods
        .iter()
        .map(|m| m.name(&renamed.pool).unwrap())
        .collect();
    assert!(names.contains(&"<init>"));
    assert!(names.contains(&base_new));

    // The override resolves through the hierarchy to the same new name.
    let derived_entry = format!("{}.class", mapping.get_class("a/Derived").unwrap());
    let renamed = ClassFile::parse(entry(&entries, &derived_entry)).unwrap();
    assert_eq!(renamed.methods[0].name(&renamed.pool).unwrap(), base_new);
}

#[test]
fn test_malformed_class_is_fatal_and_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jar");
    let output = dir.path().join("out.jar");

    write_jar(&input, &[("a/Bad.class", b"\xCA\xFE\xBA\xBEgarbage")]);

    let result = JarRemapper::new(Mapping::new()).remap(&input, &output);
    assert!(result.is_err());
    assert!(!output.exists());
    assert!(!dir.path().join("out.jar.tmp").exists());
}

#[test]
fn test_identity_remap_round_trips_classes() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.jar");
    let mid = dir.path().join("mid.jar");
    let output = dir.path().join("out.jar");

    let class = named_class("a/B", "java/lang/Object", |class| {
        add_method(class, "m", "(I)V", access::PUBLIC);
    });
    write_jar(&input, &[("a/B.class", &class)]);

    // First rewrite may repair/synthesize metadata; the second must be a
    // byte-for-byte fixed point.
    JarRemapper::new(Mapping::new()).remap(&input, &mid).unwrap();
    JarRemapper::new(Mapping::new()).remap(&mid, &output).unwrap();

    let first = read_jar(&mid);
    let second = read_jar(&output);
    assert_eq!(
        entry(&first, "a/B.class"),
        entry(&second, "a/B.class")
    );
}

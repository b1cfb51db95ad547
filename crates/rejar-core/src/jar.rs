//! Two-pass jar archive driver.
//!
//! Pass one parses every class entry to build the hierarchy index and the
//! archive class set; pass two rewrites classes in archive order and streams
//! the output. The hierarchy must be fully known before any rewrite begins.
//! Output goes to a sibling temp file that is atomically renamed on success
//! and removed on failure, so a failed run never leaves a usable-looking
//! archive behind.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use rejar_classfile::ClassFile;

use crate::error::{RemapError, RemapResult};
use crate::hierarchy::{ClassResolver, Hierarchy, InheritPolicy, NoClasspath};
use crate::mapping::Mapping;
use crate::remap::{Diagnostic, Renamer};
use crate::rewrite::rewrite_class;
use crate::synthesis::Namer;

/// Entries with these suffixes are cryptographic signature files; rewriting
/// invalidates them, so they are dropped from the output.
const SIGNATURE_SUFFIXES: [&str; 4] = [".SF", ".DSA", ".RSA", ".EC"];

const CLASS_SUFFIX: &str = ".class";

/// Result of one archive operation.
#[derive(Debug)]
pub struct RemapOutcome {
    /// The symbol table after the run; in generating mode it holds every
    /// synthesized name.
    pub mapping: Mapping,
    /// Inherited-rename inconsistencies collected during the rewrite.
    pub diagnostics: Vec<Diagnostic>,
    pub classes_rewritten: usize,
    pub resources_copied: usize,
    pub signatures_dropped: usize,
}

/// Configures and runs one whole-archive remap.
pub struct JarRemapper {
    mapping: Mapping,
    generate: bool,
    policy: InheritPolicy,
    resolver: Box<dyn ClassResolver>,
}

impl JarRemapper {
    /// Applies an existing mapping.
    pub fn new(mapping: Mapping) -> Self {
        Self {
            mapping,
            generate: false,
            policy: InheritPolicy::default(),
            resolver: Box::new(NoClasspath),
        }
    }

    /// Generating mode: synthesize fresh names for every eligible symbol of
    /// the archive's own classes, on top of `mapping`.
    pub fn generating(mapping: Mapping) -> Self {
        Self {
            generate: true,
            ..Self::new(mapping)
        }
    }

    /// Auxiliary classpath used to resolve ancestors outside the archive.
    pub fn with_resolver(mut self, resolver: Box<dyn ClassResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_policy(mut self, policy: InheritPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Remaps `input` into `output`, running both passes to completion.
    pub fn remap(self, input: &Path, output: &Path) -> RemapResult<RemapOutcome> {
        let file = File::open(input).map_err(|source| RemapError::Io {
            path: input.to_path_buf(),
            source,
        })?;
        let mut archive = ZipArchive::new(file).map_err(|source| RemapError::Archive {
            path: input.to_path_buf(),
            source,
        })?;

        // Pass one: hierarchy construction over the whole archive.
        let mut hierarchy = Hierarchy::new(self.policy, self.resolver);
        let mut archive_classes: FxHashSet<String> = FxHashSet::default();
        for i in 0..archive.len() {
            let (entry_name, bytes) = read_entry(&mut archive, i, input)?;
            if !entry_name.ends_with(CLASS_SUFFIX) {
                continue;
            }
            let class = ClassFile::parse(&bytes).map_err(|source| RemapError::MalformedClass {
                name: entry_name.clone(),
                source,
            })?;
            archive_classes.insert(
                class
                    .name()
                    .map_err(|source| RemapError::MalformedClass {
                        name: entry_name.clone(),
                        source,
                    })?
                    .to_string(),
            );
            hierarchy
                .add_class(&class)
                .map_err(|source| RemapError::MalformedClass {
                    name: entry_name,
                    source,
                })?;
        }

        let namer = if self.generate {
            Namer::generating(self.mapping, archive_classes)
        } else {
            Namer::new(self.mapping)
        };
        let mut renamer = Renamer::new(namer, hierarchy);

        // Pass two: rewrite into a temp file, publish atomically.
        let tmp_path = sibling_tmp(output);
        let tmp_file = File::create(&tmp_path).map_err(|source| RemapError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        let mut writer = ZipWriter::new(tmp_file);

        let counts = match copy_entries(&mut archive, &mut writer, &mut renamer, input, output) {
            Ok(counts) => counts,
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                return Err(e);
            }
        };
        if let Err(source) = writer.finish() {
            let _ = fs::remove_file(&tmp_path);
            return Err(RemapError::Archive {
                path: output.to_path_buf(),
                source,
            });
        }
        if let Err(source) = fs::rename(&tmp_path, output) {
            let _ = fs::remove_file(&tmp_path);
            return Err(RemapError::Io {
                path: output.to_path_buf(),
                source,
            });
        }

        let (namer, diagnostics) = renamer.into_parts();
        Ok(RemapOutcome {
            mapping: namer.into_mapping(),
            diagnostics,
            classes_rewritten: counts.0,
            resources_copied: counts.1,
            signatures_dropped: counts.2,
        })
    }
}

fn read_entry(
    archive: &mut ZipArchive<File>,
    index: usize,
    input: &Path,
) -> RemapResult<(String, Vec<u8>)> {
    let mut entry = archive
        .by_index(index)
        .map_err(|source| RemapError::Archive {
            path: input.to_path_buf(),
            source,
        })?;
    let name = entry.name().to_string();
    if entry.is_dir() {
        return Ok((name, Vec::new()));
    }
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut bytes)
        .map_err(|source| RemapError::Io {
            path: input.to_path_buf(),
            source,
        })?;
    Ok((name, bytes))
}

fn copy_entries(
    archive: &mut ZipArchive<File>,
    writer: &mut ZipWriter<File>,
    renamer: &mut Renamer,
    input: &Path,
    output: &Path,
) -> RemapResult<(usize, usize, usize)> {
    let archive_err = |source| RemapError::Archive {
        path: output.to_path_buf(),
        source,
    };
    let options = SimpleFileOptions::default();
    let mut classes = 0usize;
    let mut resources = 0usize;
    let mut signatures = 0usize;

    for i in 0..archive.len() {
        let is_dir = {
            let entry = archive
                .by_index(i)
                .map_err(|source| RemapError::Archive {
                    path: input.to_path_buf(),
                    source,
                })?;
            entry.is_dir()
        };
        let (name, bytes) = read_entry(archive, i, input)?;

        if SIGNATURE_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            signatures += 1;
            continue;
        }
        if is_dir {
            writer.add_directory(name, options).map_err(archive_err)?;
            continue;
        }

        if name.ends_with(CLASS_SUFFIX) {
            let mut class = ClassFile::parse(&bytes).map_err(|source| {
                RemapError::MalformedClass {
                    name: name.clone(),
                    source,
                }
            })?;
            let new_name = rewrite_class(&mut class, renamer)?;
            writer
                .start_file(format!("{new_name}{CLASS_SUFFIX}"), options)
                .map_err(archive_err)?;
            writer
                .write_all(&class.to_bytes())
                .map_err(|source| RemapError::Io {
                    path: output.to_path_buf(),
                    source,
                })?;
            classes += 1;
        } else {
            writer.start_file(name, options).map_err(archive_err)?;
            writer.write_all(&bytes).map_err(|source| RemapError::Io {
                path: output.to_path_buf(),
                source,
            })?;
            resources += 1;
        }
    }

    Ok((classes, resources, signatures))
}

/// `out.jar` -> `out.jar.tmp`, in the same directory so the final rename is
/// atomic.
fn sibling_tmp(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_tmp() {
        assert_eq!(
            sibling_tmp(Path::new("/x/out.jar")),
            PathBuf::from("/x/out.jar.tmp")
        );
    }

    #[test]
    fn test_signature_suffixes() {
        for name in ["META-INF/CERT.SF", "META-INF/CERT.DSA", "a/k.RSA", "m.EC"] {
            assert!(SIGNATURE_SUFFIXES.iter().any(|s| name.ends_with(s)));
        }
        assert!(!SIGNATURE_SUFFIXES.iter().any(|s| "a/B.class".ends_with(s)));
    }
}

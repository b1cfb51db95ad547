//! # rejar-srg
//!
//! Imports an MCP config folder into `rejar` mappings. The folder layout:
//!
//! - `fields.csv`, `methods.csv`, `params.csv` — SRG-name to readable-name
//!   tables (header line, comma separated)
//! - `static_methods.txt` — SRG names of static methods, one per line
//! - `joined.srg` — obfuscated-to-SRG records (`PK:`, `CL:`, `FD:`, `MD:`)
//! - `joined.exc` — constructor parameter lists, keyed by deobfuscated names
//!
//! `convert` produces two mappings: obfuscated-to-SRG and
//! obfuscated-to-readable (MCP). Field records carry the `*` wildcard
//! descriptor since SRG field records are untyped. Where to write the
//! resulting JAM files is the caller's decision.

pub mod error;

use std::fs;
use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};

use rejar_classfile::desc::{self, MethodDescriptor};
use rejar_core::mapping::Mapping;

pub use error::{SrgError, SrgResult};

/// The two mappings an MCP folder describes.
#[derive(Debug, Default)]
pub struct McpMappings {
    /// Obfuscated names to SRG intermediate names.
    pub srg: Mapping,
    /// Obfuscated names to readable MCP names.
    pub mcp: Mapping,
}

/// Converts an MCP config folder.
pub fn convert(mcp_dir: &Path) -> SrgResult<McpMappings> {
    let field_names = read_csv(&mcp_dir.join("fields.csv"))?;
    let method_names = read_csv(&mcp_dir.join("methods.csv"))?;
    let param_names = read_csv(&mcp_dir.join("params.csv"))?;
    let static_methods = read_lines(&mcp_dir.join("static_methods.txt"))?;

    let mut out = McpMappings::default();
    // Deobfuscated-to-obfuscated class names, needed to translate joined.exc
    // records back into the obfuscated namespace.
    let mut reverse_classes: FxHashMap<String, String> = FxHashMap::default();

    read_joined_srg(
        &mcp_dir.join("joined.srg"),
        &field_names,
        &method_names,
        &param_names,
        &static_methods,
        &mut out,
        &mut reverse_classes,
    )?;
    read_joined_exc(
        &mcp_dir.join("joined.exc"),
        &param_names,
        &reverse_classes,
        &mut out,
    )?;

    Ok(out)
}

fn read_file(path: &Path) -> SrgResult<String> {
    fs::read_to_string(path).map_err(|source| SrgError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_error(path: &Path, line: usize, message: impl Into<String>) -> SrgError {
    SrgError::Parse {
        file: path.to_path_buf(),
        line,
        message: message.into(),
    }
}

/// CSV with a header line; only the first two columns matter.
fn read_csv(path: &Path) -> SrgResult<FxHashMap<String, String>> {
    let content = read_file(path)?;
    let mut names = FxHashMap::default();
    for (line_num, line) in content.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let mut columns = line.split(',');
        let (Some(from), Some(to)) = (columns.next(), columns.next()) else {
            return Err(parse_error(path, line_num + 1, "expected at least two columns"));
        };
        names.insert(from.to_string(), to.to_string());
    }
    Ok(names)
}

fn read_lines(path: &Path) -> SrgResult<FxHashSet<String>> {
    let content = read_file(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

#[allow(clippy::too_many_arguments)]
fn read_joined_srg(
    path: &Path,
    field_names: &FxHashMap<String, String>,
    method_names: &FxHashMap<String, String>,
    param_names: &FxHashMap<String, String>,
    static_methods: &FxHashSet<String>,
    out: &mut McpMappings,
    reverse_classes: &mut FxHashMap<String, String>,
) -> SrgResult<()> {
    let content = read_file(path)?;
    for (line_num, line) in content.lines().enumerate() {
        let line_num = line_num + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.first() {
            None | Some(&"PK:") => {}
            Some(&"CL:") => {
                if fields.len() != 3 {
                    return Err(parse_error(path, line_num, "CL: expects 2 operands"));
                }
                out.srg.add_class(fields[1], fields[2]);
                out.mcp.add_class(fields[1], fields[2]);
                reverse_classes.insert(fields[2].to_string(), fields[1].to_string());
            }
            Some(&"FD:") => {
                if fields.len() < 3 {
                    return Err(parse_error(path, line_num, "FD: expects 2 operands"));
                }
                let (class_name, field_name) = split_member(fields[1])
                    .ok_or_else(|| parse_error(path, line_num, "unqualified FD: member"))?;
                let srg_name = simple_of(fields[2]);
                let mcp_name = field_names.get(srg_name).map_or(srg_name, String::as_str);
                out.srg.add_field(class_name, field_name, "*", srg_name);
                out.mcp.add_field(class_name, field_name, "*", mcp_name);
            }
            Some(&"MD:") => {
                if fields.len() < 5 {
                    return Err(parse_error(path, line_num, "MD: expects 4 operands"));
                }
                let (class_name, method_name) = split_member(fields[1])
                    .ok_or_else(|| parse_error(path, line_num, "unqualified MD: member"))?;
                let descriptor = fields[2];
                let srg_name = simple_of(fields[3]);
                let mcp_name = method_names.get(srg_name).map_or(srg_name, String::as_str);
                out.srg.add_method(class_name, method_name, descriptor, srg_name);
                out.mcp.add_method(class_name, method_name, descriptor, mcp_name);

                // SRG ids carry synthetic parameter names p_<id>_<slot>_.
                let Some(id) = srg_name.strip_prefix("func_").and_then(|r| r.split('_').next())
                else {
                    continue;
                };
                let is_static = static_methods.contains(srg_name);
                for (index, slot) in parameter_slots(descriptor, is_static)?.into_iter().enumerate()
                {
                    let srg_param = format!("p_{id}_{slot}_");
                    let mcp_param = param_names
                        .get(&srg_param)
                        .map_or(srg_param.as_str(), String::as_str);
                    out.srg.add_parameter(
                        class_name,
                        method_name,
                        descriptor,
                        index as u16,
                        srg_param.as_str(),
                    );
                    out.mcp.add_parameter(
                        class_name,
                        method_name,
                        descriptor,
                        index as u16,
                        mcp_param,
                    );
                }
            }
            Some(_) => {} // Unknown record: skip.
        }
    }
    Ok(())
}

/// `joined.exc` supplies constructor parameter names, keyed by the
/// deobfuscated class name and a deobfuscated descriptor.
fn read_joined_exc(
    path: &Path,
    param_names: &FxHashMap<String, String>,
    reverse_classes: &FxHashMap<String, String>,
    out: &mut McpMappings,
) -> SrgResult<()> {
    let content = read_file(path)?;
    for (line_num, line) in content.lines().enumerate() {
        let line_num = line_num + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("max_constructor_index") {
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| parse_error(path, line_num, "expected key=value"))?;
        let (class_part, member_part) = key
            .split_once('.')
            .ok_or_else(|| parse_error(path, line_num, "expected class.member key"))?;
        let Some(paren) = member_part.find('(') else {
            return Err(parse_error(path, line_num, "member key lacks a descriptor"));
        };
        if &member_part[..paren] != "<init>" {
            continue;
        }

        let class_name = reverse_classes
            .get(class_part)
            .map_or(class_part, String::as_str);
        let descriptor = desc::remap_descriptor(&member_part[paren..], |name| {
            reverse_classes.get(name).cloned().unwrap_or_else(|| name.to_string())
        });

        let Some((_, params)) = value.split_once('|') else {
            return Err(parse_error(path, line_num, "value lacks a parameter list"));
        };
        for (index, srg_param) in params.split(',').filter(|p| !p.is_empty()).enumerate() {
            let mcp_param = param_names.get(srg_param).map_or(srg_param, String::as_str);
            out.srg
                .add_parameter(class_name, "<init>", descriptor.as_str(), index as u16, srg_param);
            out.mcp
                .add_parameter(class_name, "<init>", descriptor.as_str(), index as u16, mcp_param);
        }
    }
    Ok(())
}

/// Splits `pkg/Class/member` into (`pkg/Class`, `member`).
fn split_member(qualified: &str) -> Option<(&str, &str)> {
    qualified.rsplit_once('/')
}

/// The segment after the last `/`.
fn simple_of(qualified: &str) -> &str {
    qualified.rsplit('/').next().unwrap_or(qualified)
}

/// Frame slot of each declared parameter (receiver takes slot 0 of instance
/// methods; long and double widen by two).
fn parameter_slots(descriptor: &str, is_static: bool) -> SrgResult<Vec<u16>> {
    let parsed = MethodDescriptor::parse(descriptor)?;
    let mut slots = Vec::with_capacity(parsed.params.len());
    let mut slot: u16 = u16::from(!is_static);
    for param in &parsed.params {
        slots.push(slot);
        slot += desc::slot_width(param);
    }
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn mcp_fixture(dir: &Path) {
        write(
            dir,
            "fields.csv",
            "searge,name,side,desc\nfield_1000_a,maxHealth,0,\n",
        );
        write(
            dir,
            "methods.csv",
            "searge,name,side,desc\nfunc_2000_b,tick,0,ticks the entity\n",
        );
        write(
            dir,
            "params.csv",
            "param,name,side\np_2000_1_,amount,0\np_9001_1_,owner,0\n",
        );
        write(dir, "static_methods.txt", "func_3000_c\n");
        write(
            dir,
            "joined.srg",
            "PK: ./ net/minecraft\n\
             CL: aa net/minecraft/Entity\n\
             FD: aa/a net/minecraft/Entity/field_1000_a\n\
             MD: aa/b (I)V net/minecraft/Entity/func_2000_b (I)V\n\
             MD: aa/c (J)V net/minecraft/Entity/func_3000_c (J)V\n",
        );
        write(
            dir,
            "joined.exc",
            "# constructor metadata\n\
             max_constructor_index=1000\n\
             net/minecraft/Entity.<init>(Lnet/minecraft/Entity;)V=|p_9001_1_\n",
        );
    }

    #[test]
    fn test_convert_fixture() {
        let dir = tempfile::tempdir().unwrap();
        mcp_fixture(dir.path());
        let converted = convert(dir.path()).unwrap();

        assert_eq!(converted.srg.get_class("aa"), Some("net/minecraft/Entity"));
        assert_eq!(converted.mcp.get_class("aa"), Some("net/minecraft/Entity"));

        // Field records are untyped: the wildcard matches any descriptor.
        assert_eq!(converted.srg.get_field("aa", "a", "I"), Some("field_1000_a"));
        assert_eq!(converted.mcp.get_field("aa", "a", "I"), Some("maxHealth"));

        assert_eq!(converted.srg.get_method("aa", "b", "(I)V"), Some("func_2000_b"));
        assert_eq!(converted.mcp.get_method("aa", "b", "(I)V"), Some("tick"));

        // Instance method: first parameter sits in slot 1.
        assert_eq!(converted.srg.get_parameter("aa", "b", "(I)V", 0), Some("p_2000_1_"));
        assert_eq!(converted.mcp.get_parameter("aa", "b", "(I)V", 0), Some("amount"));

        // Static method: first parameter sits in slot 0, and an unmapped
        // SRG parameter name passes through.
        assert_eq!(converted.srg.get_parameter("aa", "c", "(J)V", 0), Some("p_3000_0_"));
        assert_eq!(converted.mcp.get_parameter("aa", "c", "(J)V", 0), Some("p_3000_0_"));
    }

    #[test]
    fn test_exc_constructor_params_translated_back() {
        let dir = tempfile::tempdir().unwrap();
        mcp_fixture(dir.path());
        let converted = convert(dir.path()).unwrap();

        // The deobfuscated descriptor is translated back to the obfuscated
        // namespace through the reversed class map.
        assert_eq!(
            converted.srg.get_parameter("aa", "<init>", "(Laa;)V", 0),
            Some("p_9001_1_")
        );
        assert_eq!(
            converted.mcp.get_parameter("aa", "<init>", "(Laa;)V", 0),
            Some("owner")
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(convert(dir.path()), Err(SrgError::Io { .. })));
    }

    #[test]
    fn test_malformed_exc_line_rejected() {
        let dir = tempfile::tempdir().unwrap();
        mcp_fixture(dir.path());
        write(dir.path(), "joined.exc", "net/minecraft/Entity.<init>(I)V=nopipe\n");
        assert!(matches!(convert(dir.path()), Err(SrgError::Parse { .. })));
    }
}

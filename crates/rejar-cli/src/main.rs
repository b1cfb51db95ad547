//! rejar command-line tool.
//!
//! Commands:
//! - `rejar remap <input> <output> <mappings>` - remap a jar using a JAM
//!   mapping file
//! - `rejar rename <input> <output> <mappings>` - generate unique names for
//!   everything and write the mapping
//! - `rejar srg2jam <mcp-dir>` - convert an MCP config folder to JAM files

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use rejar_core::{Classpath, InheritPolicy, JarRemapper, Mapping, RemapOutcome};

#[derive(Parser)]
#[command(name = "rejar")]
#[command(about = "Remaps symbol names across jar archives", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remap a jar using a JAM mapping file
    Remap {
        /// Input jar
        input: PathBuf,
        /// Output jar
        output: PathBuf,
        /// JAM mapping file to apply
        mappings: PathBuf,
        /// Classpath roots (directories or jars) used to resolve ancestors
        /// outside the input archive
        #[arg(long = "classpath", value_name = "PATH")]
        classpath: Vec<PathBuf>,
        /// Treat only public and protected members as inheritable
        #[arg(long)]
        narrow_inheritance: bool,
    },

    /// Generate unique names for everything in a jar and write the mapping
    Rename {
        /// Input jar
        input: PathBuf,
        /// Output jar
        output: PathBuf,
        /// Where to write the generated JAM mapping
        mappings: PathBuf,
        #[arg(long = "classpath", value_name = "PATH")]
        classpath: Vec<PathBuf>,
        #[arg(long)]
        narrow_inheritance: bool,
    },

    /// Convert an MCP config folder to JAM mapping files
    Srg2jam {
        /// MCP config folder (fields.csv, joined.srg, joined.exc, ...)
        mcp_dir: PathBuf,
        /// Output for the obfuscated-to-SRG mapping
        #[arg(long, default_value = "notch-srg.jam")]
        srg_out: PathBuf,
        /// Output for the obfuscated-to-MCP mapping
        #[arg(long, default_value = "notch-mcp.jam")]
        mcp_out: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Remap {
            input,
            output,
            mappings,
            classpath,
            narrow_inheritance,
        } => cmd_remap(&input, &output, &mappings, &classpath, narrow_inheritance),
        Commands::Rename {
            input,
            output,
            mappings,
            classpath,
            narrow_inheritance,
        } => cmd_rename(&input, &output, &mappings, &classpath, narrow_inheritance),
        Commands::Srg2jam {
            mcp_dir,
            srg_out,
            mcp_out,
        } => cmd_srg2jam(&mcp_dir, &srg_out, &mcp_out),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn build_remapper(
    mapping: Mapping,
    generate: bool,
    classpath: &[PathBuf],
    narrow_inheritance: bool,
) -> Result<JarRemapper, Box<dyn std::error::Error>> {
    let mut remapper = if generate {
        JarRemapper::generating(mapping)
    } else {
        JarRemapper::new(mapping)
    };
    if narrow_inheritance {
        remapper = remapper.with_policy(InheritPolicy::PublicProtected);
    }
    if !classpath.is_empty() {
        remapper = remapper.with_resolver(Box::new(Classpath::open(classpath)?));
    }
    Ok(remapper)
}

fn report(outcome: &RemapOutcome) {
    for diagnostic in &outcome.diagnostics {
        eprintln!("warning: {diagnostic}");
    }
    if outcome.signatures_dropped > 0 {
        println!(
            "Dropped {} signature entries invalidated by rewriting",
            outcome.signatures_dropped
        );
    }
}

/// Remap a jar with an existing mapping.
fn cmd_remap(
    input: &Path,
    output: &Path,
    mappings: &Path,
    classpath: &[PathBuf],
    narrow_inheritance: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mapping = Mapping::parse_file(mappings)?;
    let outcome =
        build_remapper(mapping, false, classpath, narrow_inheritance)?.remap(input, output)?;
    report(&outcome);
    println!(
        "Remapped {} classes ({} resources copied) into {}",
        outcome.classes_rewritten,
        outcome.resources_copied,
        output.display()
    );
    Ok(())
}

/// Generate fresh names for a whole jar and persist the mapping.
fn cmd_rename(
    input: &Path,
    output: &Path,
    mappings: &Path,
    classpath: &[PathBuf],
    narrow_inheritance: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = build_remapper(Mapping::new(), true, classpath, narrow_inheritance)?
        .remap(input, output)?;
    report(&outcome);
    outcome.mapping.write_file(mappings)?;
    println!(
        "Renamed {} classes into {}; mapping written to {}",
        outcome.classes_rewritten,
        output.display(),
        mappings.display()
    );
    Ok(())
}

/// Convert an MCP config folder to a pair of JAM files.
fn cmd_srg2jam(
    mcp_dir: &Path,
    srg_out: &Path,
    mcp_out: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let converted = rejar_srg::convert(mcp_dir)?;
    converted.srg.write_file(srg_out)?;
    converted.mcp.write_file(mcp_out)?;
    println!("Wrote {} and {}", srg_out.display(), mcp_out.display());
    Ok(())
}

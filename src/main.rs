//! Verbin CLI - Command-line tool for version-information record trees.
//!
//! This is the main entry point for the verbin command-line application.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use memmap2::Mmap;
use tracing_subscriber::EnvFilter;

use verbin::prelude::*;

/// Verbin - version-information record inspection tool
#[derive(Parser)]
#[command(name = "verbin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the record tree of a file
    Inspect {
        /// Input file
        #[arg(env = "VERBIN_INPUT")]
        input: PathBuf,

        /// Byte offset of the root record
        #[arg(short, long, default_value_t = 0)]
        offset: u64,

        /// Expected key of the root record
        #[arg(short, long, env = "VERBIN_SIGNATURE")]
        signature: Option<String>,

        /// How many levels of children to parse
        #[arg(short, long, default_value_t = 8)]
        depth: usize,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse files and verify every declared length
    Check {
        /// Glob patterns of files to check
        #[arg(required = true)]
        patterns: Vec<String>,

        /// Expected key of each root record
        #[arg(short, long, env = "VERBIN_SIGNATURE")]
        signature: Option<String>,

        /// How many levels of children to parse
        #[arg(short, long, default_value_t = 8)]
        depth: usize,
    },

    /// Parse a file, write it back out and compare the bytes
    Roundtrip {
        /// Input file
        #[arg(env = "VERBIN_INPUT")]
        input: PathBuf,

        /// Output file
        output: PathBuf,

        /// Expected key of the root record
        #[arg(short, long, env = "VERBIN_SIGNATURE")]
        signature: Option<String>,

        /// How many levels of children to parse
        #[arg(short, long, default_value_t = 8)]
        depth: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect {
            input,
            offset,
            signature,
            depth,
            json,
        } => {
            cmd_inspect(&input, offset, signature.as_deref(), depth, json)?;
        }
        Commands::Check {
            patterns,
            signature,
            depth,
        } => {
            cmd_check(&patterns, signature.as_deref(), depth)?;
        }
        Commands::Roundtrip {
            input,
            output,
            signature,
            depth,
        } => {
            cmd_roundtrip(&input, &output, signature.as_deref(), depth)?;
        }
    }

    Ok(())
}

/// Builds generic records, nesting until the depth runs out.
#[derive(Debug, Clone, Copy)]
struct GenericChildren {
    depth: usize,
}

impl ChildFactory<()> for GenericChildren {
    fn create_child(&self, index: usize) -> VersionRecord {
        generic_record(format!("child{index}"), self.depth)
    }
}

/// At depth zero everything after the header is kept as opaque bytes.
fn generic_record(name: String, depth: usize) -> VersionRecord {
    let record = VersionRecord::new(name);
    if depth == 0 {
        record.with_opaque_body()
    } else {
        record.with_factory(GenericChildren { depth: depth - 1 })
    }
}

/// Parse one record tree from `data`, which starts at absolute offset `base`.
fn parse_tree(data: &[u8], base: u64, signature: Option<&str>, depth: usize) -> Result<VersionRecord> {
    let mut root = generic_record("root".to_string(), depth);
    if let Some(signature) = signature {
        root = root.expect_signature(signature);
    }

    let mut reader = OffsetReader::with_offset(data, base);
    root.read(&mut reader).context("Failed to parse record tree")?;
    Ok(root)
}

fn cmd_inspect(
    input: &Path,
    offset: u64,
    signature: Option<&str>,
    depth: usize,
    json: bool,
) -> Result<()> {
    let file = File::open(input).with_context(|| format!("Failed to open {}", input.display()))?;
    let mmap = unsafe { Mmap::map(&file)? };

    let data = usize::try_from(offset)
        .ok()
        .and_then(|start| mmap.get(start..))
        .with_context(|| format!("Offset {offset} is past the end of {}", input.display()))?;

    let start = Instant::now();
    let root = parse_tree(data, offset, signature, depth)?;
    tracing::info!(records = root.count(), elapsed = ?start.elapsed(), "parsed {}", input.display());

    if json {
        println!("{}", serde_json::to_string_pretty(&root)?);
    } else {
        print_tree(&root, 0);
        println!("\nTotal: {} records, depth {}", root.count(), root.depth());
    }

    Ok(())
}

fn print_tree(record: &VersionRecord, level: usize) {
    println!(
        "{:indent$}{} [wLength={}, wValueLength={}, wType={}] @ {:#x}{}",
        "",
        record.key(),
        record.total_length(),
        record.value_length(),
        record.type_tag(),
        record.start_offset().unwrap_or_default(),
        if record.body().is_empty() {
            String::new()
        } else {
            format!(" (+{} unparsed bytes)", record.body().len())
        },
        indent = level * 2
    );
    for child in record.children() {
        print_tree(child, level + 1);
    }
}

/// Parse a whole file and verify its lengths.
fn check_file(path: &Path, signature: Option<&str>, depth: usize) -> Result<VersionRecord> {
    let data = fs::read(path).context("Failed to read input file")?;
    let root = parse_tree(&data, 0, signature, depth)?;
    root.check_lengths().context("Length check failed")?;
    Ok(root)
}

fn cmd_check(patterns: &[String], signature: Option<&str>, depth: usize) -> Result<()> {
    let mut paths = Vec::new();
    for pattern in patterns {
        for entry in glob::glob(pattern).with_context(|| format!("Invalid pattern {pattern}"))? {
            paths.push(entry?);
        }
    }

    println!("Checking {} files...", paths.len());

    let pb = ProgressBar::new(paths.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let mut passed = 0;
    let mut failed = 0;

    for path in &paths {
        match check_file(path, signature, depth) {
            Ok(root) => {
                tracing::debug!(records = root.count(), "{} ok", path.display());
                passed += 1;
            }
            Err(e) => {
                pb.println(format!("{}: {:#}", path.display(), e));
                failed += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_with_message("Done");
    println!(
        "Checked {} files in {:?} ({} passed, {} failed)",
        paths.len(),
        start.elapsed(),
        passed,
        failed
    );

    if failed > 0 {
        anyhow::bail!("{failed} files failed the check");
    }

    Ok(())
}

fn cmd_roundtrip(input: &Path, output: &Path, signature: Option<&str>, depth: usize) -> Result<()> {
    println!("Round-tripping: {} -> {}", input.display(), output.display());

    let data = fs::read(input).context("Failed to read input file")?;
    let root = parse_tree(&data, 0, signature, depth)?;

    let mut writer = BufWriter::new(File::create(output).context("Failed to create output file")?);
    root.write(&mut writer).context("Failed to write record tree")?;
    writer.flush()?;
    drop(writer);

    let written = fs::read(output).context("Failed to read back output file")?;
    let original = &data[..written.len().min(data.len())];
    if written != original {
        let at = written
            .iter()
            .zip(original)
            .position(|(a, b)| a != b)
            .unwrap_or(original.len());
        anyhow::bail!("Output differs from input at byte {at}");
    }

    if written.len() < data.len() {
        println!("Note: {} trailing bytes after the root record were not copied", data.len() - written.len());
    }
    println!("Round trip complete: {} bytes, {} records", written.len(), root.count());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut root = VersionRecord::<()>::new("root").with_key("VS_VERSION_INFO").unwrap();
        let mut group = VersionRecord::new("group").with_key("StringFileInfo").unwrap();
        group.add_child(VersionRecord::new("table").with_key("040904b0").unwrap());
        root.add_child(group);
        root.fix_lengths().unwrap();
        root.to_bytes().unwrap()
    }

    #[test]
    fn test_parse_tree_depth() {
        let data = sample();

        let full = parse_tree(&data, 0, Some("VS_VERSION_INFO"), 8).unwrap();
        assert_eq!(full.count(), 3);
        let keys: Vec<_> = full.iter().map(|r| r.key()).collect();
        assert_eq!(keys, ["VS_VERSION_INFO", "StringFileInfo", "040904b0"]);

        let shallow = parse_tree(&data, 0, None, 0).unwrap();
        assert_eq!(shallow.count(), 1);
        assert_eq!(shallow.body().len(), 64);
        assert_eq!(shallow.to_bytes().unwrap(), data);

        // Grandchildren stay inside their parent when the depth runs out.
        let partial = parse_tree(&data, 0, None, 1).unwrap();
        assert_eq!(partial.children().len(), 1);
        assert_eq!(partial.children()[0].key(), "StringFileInfo");
        assert_eq!(partial.children()[0].body().len(), 24);
        assert_eq!(partial.to_bytes().unwrap(), data);

        assert!(parse_tree(&data, 0, Some("Other"), 8).is_err());
    }

    #[test]
    fn test_check_and_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("version.bin");
        let output = dir.path().join("copy.bin");
        fs::write(&input, sample()).unwrap();

        let root = check_file(&input, None, 8).unwrap();
        assert_eq!(root.depth(), 3);

        cmd_roundtrip(&input, &output, None, 8).unwrap();
        assert_eq!(fs::read(&output).unwrap(), fs::read(&input).unwrap());

        check_file(&input, None, 1).unwrap();
        cmd_roundtrip(&input, &output, None, 1).unwrap();
        assert_eq!(fs::read(&output).unwrap(), fs::read(&input).unwrap());
    }

    #[test]
    fn test_check_rejects_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("short.bin");
        let data = sample();
        fs::write(&input, &data[..data.len() - 4]).unwrap();

        assert!(check_file(&input, None, 8).is_err());
    }
}

//! `deckscribe-patch`: diff two deck snapshots or apply a patch to one.
//!
//! Usage:
//!   deckscribe-patch diff <before.json> <after.json>
//!   deckscribe-patch apply [--lenient] <patch.json>   (document on stdin)

use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deckscribe_json_patch::{apply_patch, apply_patch_lenient, diff, ApplyOptions, Patch};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "deckscribe-patch", about = "Diff and patch deck snapshots")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the patch that turns BEFORE into AFTER.
    Diff { before: PathBuf, after: PathBuf },
    /// Apply PATCH to the document read from stdin.
    Apply {
        patch: PathBuf,
        /// Drop operations that do not fit instead of failing.
        #[arg(long)]
        lenient: bool,
    },
}

fn read_json(path: &PathBuf) -> Result<Value> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = match cli.command {
        Command::Diff { before, after } => {
            let patch = diff(&read_json(&before)?, &read_json(&after)?);
            serde_json::to_string_pretty(&patch)?
        }
        Command::Apply { patch, lenient } => {
            let patch: Patch = serde_json::from_value(read_json(&patch)?)?;
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            let mut doc: Value = serde_json::from_str(buf.trim()).context("parsing stdin")?;
            if lenient {
                let result = apply_patch_lenient(&doc, &patch);
                for skipped in &result.skipped {
                    eprintln!("skipped: {skipped}");
                }
                doc = result.doc;
            } else {
                apply_patch(&mut doc, &patch, &ApplyOptions::strict())?;
            }
            serde_json::to_string(&doc)?
        }
    };
    let mut stdout = io::stdout();
    stdout.write_all(output.as_bytes())?;
    stdout.write_all(b"\n")?;
    Ok(())
}

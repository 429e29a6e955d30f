//! Tagger subprocess
//!
//! Runs universal-ctags over a directory and parses its JSON-lines
//! output into [`TagEntry`] values.

use crate::models::TagEntry;
use std::path::Path;
use std::process::Command;
use thiserror::Error;

/// Default tagger executable, resolved through `PATH`.
pub const DEFAULT_PROGRAM: &str = "ctags";

#[derive(Error, Debug)]
pub enum TaggerError {
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("invalid tagger output: {0}")]
    InvalidOutput(#[from] serde_json::Error),
}

/// Run the tagger recursively over `dir` and return its parsed entries.
pub fn run_tagger(program: &str, dir: &Path) -> Result<Vec<TagEntry>, TaggerError> {
    let output = Command::new(program)
        .arg("--output-format=json")
        .arg("--fields=*")
        .arg("--fields=+S")
        .arg("--extras=*")
        .arg("--kinds-Python=+vm")
        .arg("-R")
        .arg(dir)
        .output()
        .map_err(|source| TaggerError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(TaggerError::Failed {
            program: program.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_entries(&String::from_utf8_lossy(&output.stdout))
}

/// Parse JSON-lines tagger output, one entry per non-blank line.
pub fn parse_entries(stdout: &str) -> Result<Vec<TagEntry>, TaggerError> {
    let mut entries = Vec::new();
    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(line)?);
    }
    Ok(entries)
}

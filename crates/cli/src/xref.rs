// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-reference search: call sites of a symbol within a directory tree.
//!
//! A call site is an occurrence of the symbol bounded on both sides by a C
//! punctuation or whitespace character, so `FOO` never matches inside
//! `FOOBAR`. Three interchangeable backends: a cscope index, recursive
//! fixed-string grep, and a native directory walk.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use aho_corasick::AhoCorasick;
use ignore::WalkBuilder;
use regex::Regex;
use tracing::{debug, warn};

use crate::ctags::run_with_timeout;
use crate::error::{Error, Result};
use crate::tags::is_c_file;

/// Character class bounding a symbol token in C source.
pub const C_TOKEN_PATTERN: &str = r"[\s;\*%\|&~\^\+\-/><,\(\)!\.=\?\{\}]";

/// Upper bound on a cscope invocation.
const CSCOPE_TIMEOUT: Duration = Duration::from_secs(60 * 10);

/// Upper bound on a grep invocation.
const GREP_TIMEOUT: Duration = Duration::from_secs(60 * 5);

/// A located symbol occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub path: PathBuf,
    pub line: u32,
}

/// Search strategy; one method per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchBackend {
    /// Build a cscope index, then query functions calling the symbol.
    CscopeIndex,
    /// `grep --recursive --fixed-strings` over C-like files.
    RecursiveGrep,
    /// Native walk with a fixed-string scan and token-boundary check.
    #[default]
    LiteralWalk,
}

/// Searcher over a fixed root directory.
pub struct CrossRefSearcher {
    root: PathBuf,
    backend: SearchBackend,
}

impl CrossRefSearcher {
    pub fn new(root: impl Into<PathBuf>, backend: SearchBackend) -> Self {
        Self {
            root: root.into(),
            backend,
        }
    }

    /// All call sites of `symbol` under the root. Paths are reported
    /// relative to `relative_to` when given.
    pub fn call_sites(&self, symbol: &str, relative_to: Option<&Path>) -> Result<Vec<CallSite>> {
        match self.backend {
            SearchBackend::CscopeIndex => self.cscope_call_sites(symbol, relative_to),
            SearchBackend::RecursiveGrep => self.grep_call_sites(symbol, relative_to),
            SearchBackend::LiteralWalk => self.walk_call_sites(symbol, relative_to),
        }
    }

    /// C-like files under the root, for backends needing an explicit list.
    fn c_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in WalkBuilder::new(&self.root).standard_filters(false).build() {
            let Ok(entry) = entry else { continue };
            if entry.file_type().is_some_and(|t| t.is_file()) && is_c_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        files
    }

    fn cscope_call_sites(
        &self,
        symbol: &str,
        relative_to: Option<&Path>,
    ) -> Result<Vec<CallSite>> {
        let files = self.c_files();
        if files.is_empty() {
            return Ok(Vec::new());
        }
        // cscope reads its file list from `cscope.files` and leaves
        // `cscope.out` behind; run inside a scratch directory so both are
        // reclaimed on every exit path.
        let scratch = tempfile::tempdir().map_err(|e| Error::Search(e.to_string()))?;
        let list = files
            .iter()
            .map(|f| format!("\"{}\"", f.display()))
            .collect::<Vec<_>>()
            .join("\n");
        let list_path = scratch.path().join("cscope.files");
        std::fs::write(&list_path, list).map_err(|e| Error::io(&list_path, e))?;

        let mut command = Command::new("cscope");
        command
            .current_dir(scratch.path())
            // Uncompressed cross-reference, line-oriented output, callers
            // of the symbol.
            .args(["-c", "-L", "-3", symbol]);
        let output = run_with_timeout(command, CSCOPE_TIMEOUT)
            .map_err(|e| Error::Search(format!("cscope: {e}")))?;
        if !output.status.success() {
            return Err(Error::Search(format!(
                "cscope exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut sites = Vec::new();
        for line in stdout.lines() {
            // `<path> <caller> <line> <context...>`
            let mut fields = line.split_whitespace();
            let (Some(path), Some(_name), Some(line_no)) =
                (fields.next(), fields.next(), fields.next())
            else {
                continue;
            };
            let Ok(line_no) = line_no.parse::<u32>() else {
                continue;
            };
            sites.push(CallSite {
                path: relativize(Path::new(path), relative_to),
                line: line_no,
            });
        }
        Ok(sites)
    }

    fn grep_call_sites(&self, symbol: &str, relative_to: Option<&Path>) -> Result<Vec<CallSite>> {
        let mut command = Command::new("grep");
        command
            .arg("--recursive")
            .arg("--with-filename")
            .arg("--line-number")
            .arg("--binary-files=without-match")
            .arg("--no-messages")
            .arg("--fixed-strings");
        for ext in crate::tags::C_LIKE_EXTENSIONS {
            command.arg(format!("--include=*{ext}"));
        }
        command.arg(symbol).arg(&self.root);
        let output = run_with_timeout(command, GREP_TIMEOUT)
            .map_err(|e| Error::Search(format!("grep: {e}")))?;
        // Exit code 1 means "no matches", which is a valid empty result.
        if !output.status.success() && output.status.code() != Some(1) {
            return Err(Error::Search(format!(
                "grep exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        parse_grep_output(
            symbol,
            &String::from_utf8_lossy(&output.stdout),
            relative_to,
        )
    }

    fn walk_call_sites(&self, symbol: &str, relative_to: Option<&Path>) -> Result<Vec<CallSite>> {
        let finder = AhoCorasick::new([symbol])
            .map_err(|e| Error::Search(format!("invalid symbol pattern: {e}")))?;
        let boundary = token_boundary_regex(symbol)?;
        let mut sites = Vec::new();
        for file in self.c_files() {
            let handle = match File::open(&file) {
                Ok(handle) => handle,
                Err(e) => {
                    warn!("could not search for call sites in {}: {e}", file.display());
                    continue;
                }
            };
            for (idx, line) in BufReader::new(handle).lines().enumerate() {
                let Ok(line) = line else { break };
                if finder.is_match(&line) && boundary.is_match(&line) {
                    sites.push(CallSite {
                        path: relativize(&file, relative_to),
                        line: idx as u32 + 1,
                    });
                }
            }
        }
        Ok(sites)
    }
}

/// Regex requiring the symbol to be token-bounded on both sides.
fn token_boundary_regex(symbol: &str) -> Result<Regex> {
    Regex::new(&format!(
        "{C_TOKEN_PATTERN}{}{C_TOKEN_PATTERN}",
        regex::escape(symbol)
    ))
    .map_err(|e| Error::Search(format!("invalid symbol pattern: {e}")))
}

/// Parse `path:line:match` grep output, keeping only token-bounded
/// occurrences on existing files.
fn parse_grep_output(
    symbol: &str,
    output: &str,
    relative_to: Option<&Path>,
) -> Result<Vec<CallSite>> {
    let boundary = token_boundary_regex(symbol)?;
    let mut sites = Vec::new();
    for line in output.lines() {
        let Some((path, line_no, matched)) = split_grep_line(line) else {
            continue;
        };
        if line_no == 0 || !boundary.is_match(matched) {
            continue;
        }
        if !path.is_file() {
            continue;
        }
        sites.push(CallSite {
            path: relativize(&path, relative_to),
            line: line_no,
        });
    }
    Ok(sites)
}

/// Split one grep line into `(path, line, match)`, tolerating a Windows
/// drive prefix in the path.
fn split_grep_line(line: &str) -> Option<(PathBuf, u32, &str)> {
    let parts: Vec<&str> = line.splitn(4, ':').collect();
    if parts.len() >= 3
        && let Ok(line_no) = parts[1].parse::<u32>()
    {
        let matched = line.splitn(3, ':').nth(2).unwrap_or("");
        return Some((PathBuf::from(parts[0]), line_no, matched));
    }
    // `C:\path\to\file.cpp:12:...`
    if parts.len() == 4
        && let Ok(line_no) = parts[2].parse::<u32>()
    {
        debug!("parsed drive-prefixed grep path: {}:{}", parts[0], parts[1]);
        return Some((
            PathBuf::from(format!("{}:{}", parts[0], parts[1])),
            line_no,
            parts[3],
        ));
    }
    None
}

fn relativize(path: &Path, relative_to: Option<&Path>) -> PathBuf {
    match relative_to {
        Some(base) => path.strip_prefix(base).unwrap_or(path).to_path_buf(),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
#[path = "xref_tests.rs"]
mod tests;

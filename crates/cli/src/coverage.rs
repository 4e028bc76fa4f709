// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Raw coverage dump parsing.
//!
//! Dump files live in per-module subdirectories next to a `dump-lookup`
//! file mapping each dump's bare file name to a raw test identifier of the
//! form `<suite>[.<case>][___<result>]`. Basic-block dumps carry
//! TAB-separated `+0x<offset>\t<path>\t<symbol>\t<line>` records; syscall
//! dumps carry one accessed path per line. Individual records that fail to
//! parse are logged and skipped, never fatal.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use memchr::memmem;
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::index::{CSV_SEP, matches_anchored};
use crate::test_id::WILDCARD;

/// Separator between test case and test result in raw identifiers.
pub const TEST_RESULT_SEP: &str = "___";

/// Separator between suite and case in raw identifiers.
pub const TEST_SUITE_CASE_SEP: char = '.';

/// Default name of the per-module dump lookup file.
pub const DUMP_LOOKUP_FILE: &str = "dump-lookup.log";

/// Raw suite identifiers that are discarded entirely.
const DISCARDED_SUITES: &[&str] = &["BEFORE_PROGRAM_START"];

/// One covered source line. Equality and hash consider only `(file, line)`;
/// the symbol is informational.
#[derive(Debug, Clone, Eq)]
pub struct CoveredLine {
    pub file: PathBuf,
    pub symbol_name: String,
    pub line: u32,
}

impl PartialEq for CoveredLine {
    fn eq(&self, other: &Self) -> bool {
        self.file == other.file && self.line == other.line
    }
}

impl Hash for CoveredLine {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.file.hash(state);
        self.line.hash(state);
    }
}

/// Per-test parse result: identity plus covered lines or files.
#[derive(Debug, Clone, Default)]
pub struct TestCoverage {
    pub test_module: String,
    pub test_suite: String,
    pub test_case: Option<String>,
    pub test_result: Option<String>,
    pub covered_lines: HashSet<CoveredLine>,
    pub covered_files: HashSet<PathBuf>,
}

/// Parser for per-test dump files.
pub struct CoverageParser {
    extension: String,
    /// module directory name -> dump stem -> raw test identifier
    lookup: HashMap<String, HashMap<String, String>>,
    java_mode: bool,
    includes: Option<Regex>,
}

impl CoverageParser {
    /// Build a parser from the dump-lookup files found under the input
    /// root. `includes_regex` filters covered file paths (case-insensitive,
    /// anchored).
    pub fn new(
        extension: impl Into<String>,
        lookup_files: &[PathBuf],
        java_mode: bool,
        includes_regex: Option<&str>,
    ) -> Result<Self> {
        let includes = match includes_regex {
            Some(pattern) => Some(
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| Error::Config(format!("invalid includes regex: {e}")))?,
            ),
            None => None,
        };
        let mut lookup: HashMap<String, HashMap<String, String>> = HashMap::new();
        for file in lookup_files {
            let module = file
                .parent()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            lookup.insert(module, read_dump_lookup(file)?);
        }
        Ok(Self {
            extension: extension.into(),
            lookup,
            java_mode,
            includes,
        })
    }

    /// Test identity for a dump file, resolved through the dump lookup.
    ///
    /// Returns `None` for dumps belonging to discarded execution phases.
    fn test_info(&self, dump: &Path) -> Result<Option<TestCoverage>> {
        let name = dump
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = name
            .split(&self.extension)
            .next()
            .unwrap_or(&name)
            .to_string();
        let module_dir = dump
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let raw_id = self
            .lookup
            .get(&module_dir)
            .and_then(|module_lookup| module_lookup.get(&stem))
            .ok_or_else(|| {
                Error::Config(format!(
                    "no dump-lookup entry for {} in module {module_dir}",
                    dump.display()
                ))
            })?;

        let (test_module, test_suite, test_case, test_result) = if self.java_mode {
            // Java has no per-module binaries; the raw identifier is the
            // whole test name.
            (
                WILDCARD.to_string(),
                raw_id.clone(),
                Some(WILDCARD.to_string()),
                None,
            )
        } else {
            let suite = raw_id
                .split(TEST_SUITE_CASE_SEP)
                .next()
                .unwrap_or(raw_id)
                .split(TEST_RESULT_SEP)
                .next()
                .unwrap_or(raw_id)
                .to_string();
            let (case, result) = match raw_id.split_once(TEST_SUITE_CASE_SEP) {
                None => (Some(WILDCARD.to_string()), None),
                Some((_, case_with_result)) => {
                    let (case, result) = match case_with_result.split_once(TEST_RESULT_SEP) {
                        Some((case, result)) => (case, Some(result.to_string())),
                        None => (case_with_result, None),
                    };
                    (Some(case.to_string()), result)
                }
            };
            (module_dir, suite, case, result)
        };

        if DISCARDED_SUITES.contains(&test_suite.as_str()) {
            return Ok(None);
        }
        Ok(Some(TestCoverage {
            test_module,
            test_suite,
            test_case,
            test_result,
            covered_lines: HashSet::new(),
            covered_files: HashSet::new(),
        }))
    }

    /// Parse one basic-block coverage dump.
    ///
    /// Returns `None` when the test identity cannot be resolved or the dump
    /// belongs to a discarded phase.
    pub fn parse_coverage(&self, dump: &Path) -> Option<TestCoverage> {
        let mut coverage = match self.test_info(dump) {
            Ok(info) => info?,
            Err(e) => {
                warn!("{e}: failed to parse coverage from {}", dump.display());
                return None;
            }
        };
        let file = match File::open(dump) {
            Ok(file) => file,
            Err(e) => {
                warn!("failed to open coverage dump {}: {e}", dump.display());
                return None;
            }
        };
        let finder = memmem::Finder::new(b"+0x");
        for line in BufReader::new(file).lines() {
            let Ok(line) = line else { break };
            let Some(offset_pos) = finder.find(line.as_bytes()) else {
                continue;
            };
            if !line.contains('/') && !line.contains('\\') {
                continue;
            }
            let record = &line[offset_pos + "+0x".len()..];
            match self.parse_coverage_record(record) {
                Some(Some(covered)) => {
                    coverage.covered_lines.insert(covered);
                }
                Some(None) => {} // filtered by the includes regex
                None => warn!("failed to parse line for coverage: {line}"),
            }
        }
        Some(coverage)
    }

    /// `offset\tfile\tsymbol\tline` after the `+0x` marker. Outer `None` is
    /// a parse failure, inner `None` a regex filter miss.
    fn parse_coverage_record(&self, record: &str) -> Option<Option<CoveredLine>> {
        let mut fragments = record.split('\t');
        let _offset = fragments.next()?;
        let file = PathBuf::from(fragments.next()?);
        if let Some(includes) = &self.includes
            && !matches_anchored(includes, &file.to_string_lossy())
        {
            return Some(None);
        }
        let symbol_name = fragments.next()?.to_string();
        let line: u32 = fragments.next()?.trim().parse().ok()?;
        Some(Some(CoveredLine {
            file,
            symbol_name,
            line,
        }))
    }

    /// Parse one syscall dump: a raw accessed path per line.
    pub fn parse_syscalls(&self, dump: &Path) -> Option<TestCoverage> {
        let mut coverage = match self.test_info(dump) {
            Ok(info) => info?,
            Err(e) => {
                warn!("{e}: failed to parse syscalls from {}", dump.display());
                return None;
            }
        };
        let file = match File::open(dump) {
            Ok(file) => file,
            Err(e) => {
                warn!("failed to open syscall dump {}: {e}", dump.display());
                return None;
            }
        };
        for line in BufReader::new(file).lines() {
            let Ok(line) = line else { break };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            // Win32 device paths arrive as `\??\C:\...`.
            let cleaned = trimmed.replace("\\??\\", "");
            let path = std::path::absolute(&cleaned).unwrap_or_else(|_| PathBuf::from(&cleaned));
            if let Some(includes) = &self.includes
                && !matches_anchored(includes, &path.to_string_lossy())
            {
                debug!("file {} did not match includes regex, skipping", path.display());
                continue;
            }
            coverage.covered_files.insert(path);
        }
        Some(coverage)
    }
}

/// Read a `basename;raw_test_identifier` dump-lookup file. Malformed rows
/// are logged and skipped.
fn read_dump_lookup(path: &Path) -> Result<HashMap<String, String>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut lookup = HashMap::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| Error::io(path, e))?;
        match line.split_once(CSV_SEP) {
            Some((stem, raw_id)) if !stem.is_empty() => {
                lookup.insert(stem.to_string(), raw_id.to_string());
            }
            _ if line.trim().is_empty() => {}
            _ => warn!("failed to parse test identifier from dump lookup: {line}"),
        }
    }
    Ok(lookup)
}

#[cfg(test)]
#[path = "coverage_tests.rs"]
mod tests;

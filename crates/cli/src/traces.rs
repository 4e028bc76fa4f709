// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-test dependency traces and the trace-driven selection pass.
//!
//! A trace index maps test identifiers to sets of entities: function
//! identifiers for basic-block coverage, lowercased file basenames for the
//! syscall variant. Selection walks the rows in setup-before-case order so
//! that global and suite setup impacts fan out to the test cases they
//! enclose.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::hash::Hash;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::index::CSV_SEP;
use crate::serialize;
use crate::test_id::TestId;

/// File name of the persisted function traces.
pub const TEST_FUNCTION_TRACES_FILE: &str = "test-function-traces.csv";

/// File name of the persisted file traces.
pub const TEST_FILE_TRACES_FILE: &str = "test-file-traces.csv";

/// Side file resolving test indices in the compact trace form.
pub const TEST_LOOKUP_FILE: &str = "test-lookup.csv";

/// Binary-serialized trace file names.
pub const BINARY_TEST_FUNCTION_TRACES_FILE: &str = "test-function-traces.bin";
pub const BINARY_TEST_FILE_TRACES_FILE: &str = "test-file-traces.bin";

/// Outcome of a selection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<E> {
    pub included: HashSet<String>,
    pub excluded: HashSet<String>,
    /// Entities that triggered each included test; may be empty for tests
    /// selected purely through setup fan-out.
    pub causes: HashMap<String, Vec<E>>,
}

impl<E> Default for Selection<E> {
    fn default() -> Self {
        Selection {
            included: HashSet::new(),
            excluded: HashSet::new(),
            causes: HashMap::new(),
        }
    }
}

/// Test-keyed entity sets over a stable id universe.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceIndex<E: Eq + Hash> {
    table: HashMap<TestId, HashSet<E>>,
}

/// Function-identifier traces from basic-block coverage.
pub type FunctionTraces = TraceIndex<u32>;

/// File-basename traces from syscall tracing.
pub type FileTraces = TraceIndex<String>;

impl<E> TraceIndex<E>
where
    E: Eq + Hash + Ord + Clone,
{
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn tests(&self) -> impl Iterator<Item = &TestId> {
        self.table.keys()
    }

    pub fn entities(&self, test: &TestId) -> Option<&HashSet<E>> {
        self.table.get(test)
    }

    /// Record that `test` depends on `entity`.
    pub fn add_dependency(&mut self, test: TestId, entity: E) {
        self.table.entry(test).or_default().insert(entity);
    }

    /// Single-pass selection given the affected entity set.
    ///
    /// Rows are visited in [`TestId::selection_order_key`] order: within a
    /// module the global-setup row first, then each suite's setup row
    /// immediately before that suite's cases. A single pair of trackers
    /// carries setup impacts forward onto the enclosed cases.
    pub fn select_tests(&self, affected: &HashSet<E>) -> Selection<E> {
        use crate::test_id::RowKind;

        let mut selection = Selection::default();
        let mut all: HashSet<String> = HashSet::new();
        let mut last_affected_module = String::new();
        let mut last_affected_suite = String::new();

        let mut rows: Vec<&TestId> = self.table.keys().collect();
        rows.sort_by(|a, b| a.selection_order_key().cmp(&b.selection_order_key()));

        for test_id in rows {
            // Rows without both suite and case fragments carry no
            // selectable test entity.
            if test_id.suite.is_none() || test_id.case.is_none() {
                continue;
            }
            if test_id.is_concrete_case() {
                all.insert(test_id.to_string());
            }

            let entities = &self.table[test_id];
            let mut hit: Vec<E> = affected.intersection(entities).cloned().collect();
            hit.sort();
            let is_affected = !hit.is_empty();

            // Java-style rows (`*!!!name!!!*`) are self-contained: no setup
            // fan-out, selected iff directly affected.
            if test_id.is_java_style() {
                let key = test_id.to_string();
                all.insert(key.clone());
                if is_affected {
                    selection.included.insert(key.clone());
                    selection.causes.insert(key, hit);
                }
                continue;
            }

            match test_id.row_kind() {
                RowKind::GlobalSetup if is_affected => {
                    last_affected_module = test_id.module.clone();
                    selection.causes.insert(test_id.to_string(), hit);
                }
                RowKind::SuiteSetup if is_affected => {
                    last_affected_suite = test_id.suite_key();
                    selection.causes.insert(test_id.to_string(), hit);
                }
                RowKind::Case => {
                    let selected = is_affected
                        || test_id.module == last_affected_module
                        || test_id.suite_key() == last_affected_suite;
                    if selected {
                        let key = test_id.to_string();
                        selection.included.insert(key.clone());
                        // Empty when selected solely through setup fan-out.
                        selection.causes.insert(key, hit);
                    }
                }
                _ => {}
            }
        }

        selection.excluded = all
            .into_iter()
            .filter(|test| !selection.included.contains(test))
            .collect();
        selection
    }
}

impl<E> TraceIndex<E>
where
    E: Eq + Hash + Ord + Clone + Serialize + DeserializeOwned,
{
    pub fn to_binary(&self, path: &Path) -> Result<()> {
        serialize::write_envelope(path, self)
    }

    pub fn from_binary(path: &Path) -> Result<Self> {
        serialize::read_envelope(path)
    }
}

impl TraceIndex<u32> {
    /// Write `(module;suite;case;function_id)` rows, or, when `test_lookup`
    /// is given, compact `(test_idx;function_id)` rows with the identifier
    /// mapping in the side file.
    pub fn to_csv(&self, path: &Path, test_lookup: Option<&Path>) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        let mut writer = BufWriter::new(file);
        let mut test_ids: Vec<String> = Vec::new();
        for (test_idx, (test_id, functions)) in self.table.iter().enumerate() {
            let mut functions: Vec<&u32> = functions.iter().collect();
            functions.sort();
            if test_lookup.is_some() {
                for function_id in functions {
                    writeln!(writer, "{test_idx}{CSV_SEP}{function_id}")
                        .map_err(|e| Error::io(path, e))?;
                }
                test_ids.push(test_id.to_string());
            } else {
                for function_id in functions {
                    writeln!(
                        writer,
                        "{}{CSV_SEP}{}{CSV_SEP}{}{CSV_SEP}{}",
                        test_id.module,
                        test_id.suite.as_deref().unwrap_or(""),
                        test_id.case.as_deref().unwrap_or(""),
                        function_id
                    )
                    .map_err(|e| Error::io(path, e))?;
                }
            }
        }
        writer.flush().map_err(|e| Error::io(path, e))?;

        if let Some(lookup_path) = test_lookup {
            let file = File::create(lookup_path).map_err(|e| Error::io(lookup_path, e))?;
            let mut writer = BufWriter::new(file);
            for (idx, test_id) in test_ids.iter().enumerate() {
                writeln!(writer, "{idx}{CSV_SEP}{test_id}")
                    .map_err(|e| Error::io(lookup_path, e))?;
            }
            writer.flush().map_err(|e| Error::io(lookup_path, e))?;
        }
        Ok(())
    }

    /// Load traces; `test_lookup` must be given when the file carries
    /// compact `(test_idx;function_id)` rows.
    pub fn from_csv(path: &Path, test_lookup: Option<&Path>) -> Result<Self> {
        let lookup: Option<Vec<String>> = match test_lookup {
            Some(lookup_path) => Some(read_test_lookup(lookup_path)?),
            None => None,
        };
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let mut traces = FunctionTraces::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| Error::io(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let malformed = || Error::Serialize {
                path: path.to_path_buf(),
                message: format!("malformed trace row at line {}", line_no + 1),
            };
            let fields: Vec<&str> = line.split(CSV_SEP).collect();
            let (test_id, function_id) = if let Some(lookup) = &lookup {
                let [test_idx, function_id] = fields.as_slice() else {
                    return Err(malformed());
                };
                let test_idx: usize = test_idx.parse().map_err(|_| malformed())?;
                let raw = lookup.get(test_idx).ok_or_else(malformed)?;
                (
                    TestId::parse(raw),
                    function_id.parse().map_err(|_| malformed())?,
                )
            } else {
                let [module, suite, case, function_id] = fields.as_slice() else {
                    return Err(malformed());
                };
                if module.is_empty() {
                    return Err(malformed());
                }
                (
                    TestId::new(
                        (*module).to_string(),
                        Some((*suite).to_string()),
                        Some((*case).to_string()),
                    ),
                    function_id.parse().map_err(|_| malformed())?,
                )
            };
            traces.add_dependency(test_id, function_id);
        }
        Ok(traces)
    }
}

impl TraceIndex<String> {
    /// Write `(module;suite;case;filename)` rows; filenames are stored as
    /// lowercased basenames at ingestion time.
    pub fn to_csv(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        let mut writer = BufWriter::new(file);
        for (test_id, filenames) in &self.table {
            let mut filenames: Vec<&String> = filenames.iter().collect();
            filenames.sort();
            for filename in filenames {
                writeln!(
                    writer,
                    "{}{CSV_SEP}{}{CSV_SEP}{}{CSV_SEP}{}",
                    test_id.module,
                    test_id.suite.as_deref().unwrap_or(""),
                    test_id.case.as_deref().unwrap_or(""),
                    filename
                )
                .map_err(|e| Error::io(path, e))?;
            }
        }
        writer.flush().map_err(|e| Error::io(path, e))
    }

    pub fn from_csv(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let mut traces = FileTraces::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| Error::io(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(CSV_SEP).collect();
            let [module, suite, case, filename] = fields.as_slice() else {
                return Err(Error::Serialize {
                    path: path.to_path_buf(),
                    message: format!("malformed file-trace row at line {}", line_no + 1),
                });
            };
            traces.add_dependency(
                TestId::new(
                    (*module).to_string(),
                    Some((*suite).to_string()),
                    Some((*case).to_string()),
                ),
                (*filename).to_string(),
            );
        }
        Ok(traces)
    }
}

fn read_test_lookup(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut test_ids = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| Error::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        // `idx;test_id` — the identifier may itself contain separators, so
        // only the first field is split off.
        let test_id = line.split_once(CSV_SEP).map(|(_, id)| id).unwrap_or(&line);
        test_ids.push(test_id.to_string());
    }
    Ok(test_ids)
}

#[cfg(test)]
#[path = "traces_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Function index: file-keyed lookup of covered functions with dense,
//! stable integer identifiers.
//!
//! The index is append-only during ingestion. Once persisted it is loaded
//! read-only; deserialization drops the repo-root binding so lookups never
//! pay for path re-normalization.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::serialize;
use crate::tags::{PROTOTYPE_PREFIX, TagExtractor};

/// CSV column separator shared by all persisted tables.
pub const CSV_SEP: char = ';';

/// File name of the persisted function index.
pub const FUNCTION_LOOKUP_FILE: &str = "function-lookup.csv";

/// File name of the binary-serialized function index.
pub const BINARY_FUNCTION_LOOKUP_FILE: &str = "function-lookup.bin";

/// An indexed function with a dense identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoveredFunction {
    /// Dense, 0-based, monotonic within one index build.
    pub identifier: u32,
    /// File key: repo-relative when a repo root is known, else absolute.
    pub file: String,
    /// Canonical raw signature.
    pub signature: String,
    /// Inclusive source-line range.
    pub start: u32,
    pub end: u32,
    pub properties: Option<String>,
    pub namespace: Option<String>,
    pub class_name: Option<String>,
}

impl CoveredFunction {
    /// `<file>::<ns?>::<class?>::<signature>`; the cause string reported
    /// for function-level selections.
    pub fn full_name(&self) -> String {
        format!(
            "{}::{}::{}::{}",
            self.file,
            self.namespace.as_deref().unwrap_or(""),
            self.class_name.as_deref().unwrap_or(""),
            self.signature
        )
    }

    fn to_csv_row(&self) -> String {
        format!(
            "{}{CSV_SEP}{}{CSV_SEP}{}{CSV_SEP}{}{CSV_SEP}{}{CSV_SEP}{}{CSV_SEP}{}{CSV_SEP}{}",
            self.identifier,
            self.file,
            self.signature,
            self.start,
            self.end,
            self.properties.as_deref().unwrap_or("None"),
            self.namespace.as_deref().unwrap_or("None"),
            self.class_name.as_deref().unwrap_or("None"),
        )
    }

    fn from_csv_row(row: &str) -> Option<Self> {
        let fields: Vec<&str> = row.split(CSV_SEP).collect();
        let [identifier, file, signature, start, end, properties, namespace, class_name] =
            fields.as_slice()
        else {
            return None;
        };
        let none_if_literal = |s: &str| {
            if s == "None" {
                None
            } else {
                Some(s.to_string())
            }
        };
        Some(CoveredFunction {
            identifier: identifier.parse().ok()?,
            file: (*file).to_string(),
            signature: (*signature).to_string(),
            start: start.parse().ok()?,
            end: end.parse().ok()?,
            properties: none_if_literal(properties),
            namespace: none_if_literal(namespace),
            class_name: none_if_literal(class_name),
        })
    }
}

/// Query over the index; `None` fields do not constrain the search.
#[derive(Debug, Default, Clone)]
pub struct FunctionQuery<'a> {
    pub file: Option<&'a Path>,
    /// A trailing `*` switches to substring matching.
    pub signature: Option<&'a str>,
    /// `""` matches no-namespace functions, `"*"` any non-empty namespace.
    pub namespace: Option<&'a str>,
    /// Same convention as `namespace`.
    pub class_name: Option<&'a str>,
}

/// File-keyed table of covered functions.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FunctionIndex {
    /// Primary mapping: file key to insertion-ordered functions.
    table: HashMap<String, Vec<CoveredFunction>>,
    /// All functions ordered by identifier; position == identifier.
    by_id: Vec<CoveredFunction>,
    /// Signature cache for non-wildcard signature queries.
    #[serde(skip)]
    signature_cache: HashMap<String, Vec<u32>>,
    /// Repo root for path-key normalization; dropped on deserialization.
    #[serde(skip)]
    repo_root: Option<PathBuf>,
}

impl FunctionIndex {
    pub fn new(repo_root: Option<PathBuf>) -> Self {
        Self {
            repo_root,
            ..Self::default()
        }
    }

    /// Next identifier to be assigned (== number of indexed functions).
    pub fn max_id(&self) -> u32 {
        self.by_id.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// All indexed file keys.
    pub fn file_keys(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    /// Normalize a path into its table key: repo-relative when inside the
    /// repo root, the absolute string otherwise.
    pub fn file_key(&self, file: &Path) -> String {
        if let Some(root) = &self.repo_root
            && let Ok(relative) = file.strip_prefix(root)
        {
            return relative.to_string_lossy().into_owned();
        }
        file.to_string_lossy().into_owned()
    }

    /// O(1) lookup by identifier.
    pub fn get_by_id(&self, identifier: u32) -> Option<&CoveredFunction> {
        self.by_id.get(identifier as usize)
    }

    /// Load all functions of `file` via the tag extractor and assign them
    /// contiguous identifiers. The file key must not be present yet.
    pub fn add_functions(
        &mut self,
        extractor: &dyn TagExtractor,
        file: &Path,
    ) -> Result<&[CoveredFunction]> {
        let key = self.file_key(file);
        if self.table.contains_key(&key) {
            return Err(Error::Config(format!(
                "file key already indexed, functions must be added exactly once: {key}"
            )));
        }
        let definitions = extractor.functions(file)?;
        let mut functions = Vec::with_capacity(definitions.len());
        for def in definitions {
            let func = CoveredFunction {
                identifier: self.max_id(),
                file: key.clone(),
                signature: def.signature,
                start: def.start_line,
                end: def.end_line,
                properties: def.properties,
                namespace: def.namespace,
                class_name: def.class_name,
            };
            self.signature_cache
                .entry(func.signature.clone())
                .or_default()
                .push(func.identifier);
            self.by_id.push(func.clone());
            functions.push(func);
        }
        Ok(self.table.entry(key).or_insert(functions).as_slice())
    }

    /// Functions of `file` whose line range contains `line`, or `None` when
    /// the file is not indexed.
    pub fn find_functions_by_line(&self, file: &Path, line: u32) -> Option<Vec<&CoveredFunction>> {
        let key = self.file_key(file);
        let functions = self.table.get(&key)?;
        Some(
            functions
                .iter()
                .filter(|f| (f.start..=f.end).contains(&line))
                .collect(),
        )
    }

    /// Idempotently ensure `file` is indexed, then return the functions
    /// enclosing `line`. A loaded file without an enclosing function is an
    /// [`Error::UncoveredLine`].
    pub fn find_or_add_functions(
        &mut self,
        extractor: &dyn TagExtractor,
        file: &Path,
        line: u32,
    ) -> Result<Vec<CoveredFunction>> {
        if !self.table.contains_key(&self.file_key(file)) {
            self.add_functions(extractor, file)?;
        }
        let functions: Vec<CoveredFunction> = self
            .find_functions_by_line(file, line)
            .unwrap_or_default()
            .into_iter()
            .cloned()
            .collect();
        if functions.is_empty() {
            return Err(Error::UncoveredLine {
                file: self.file_key(file),
                line,
            });
        }
        Ok(functions)
    }

    /// Filtered search over the index; see [`FunctionQuery`] for the
    /// wildcard conventions.
    pub fn find_functions(&self, query: &FunctionQuery) -> Vec<&CoveredFunction> {
        // Queries arriving from prototype diffs must match the definition.
        let signature = query
            .signature
            .map(|s| s.strip_prefix(PROTOTYPE_PREFIX).unwrap_or(s));
        let signature_wildcard = signature.is_some_and(|s| s.ends_with('*'));

        let candidates: Vec<&CoveredFunction> = if let Some(file) = query.file {
            let key = self.file_key(file);
            match self.table.get(&key) {
                Some(functions) => functions.iter().collect(),
                None => {
                    debug!("no functions indexed for {key}, skipping query");
                    return Vec::new();
                }
            }
        } else if let Some(sig) = signature
            && !signature_wildcard
        {
            match self.signature_cache.get(sig) {
                Some(ids) => ids
                    .iter()
                    .filter_map(|&id| self.get_by_id(id))
                    .collect(),
                None => {
                    debug!("signature {sig} not in cache, skipping query");
                    return Vec::new();
                }
            }
        } else {
            self.by_id.iter().collect()
        };

        candidates
            .into_iter()
            .filter(|func| {
                if let Some(sig) = signature {
                    let matched = if signature_wildcard {
                        func.signature.contains(sig.trim_end_matches('*'))
                    } else {
                        func.signature == sig
                    };
                    if !matched {
                        return false;
                    }
                }
                optional_field_matches(query.namespace, func.namespace.as_deref())
                    && optional_field_matches(query.class_name, func.class_name.as_deref())
            })
            .collect()
    }

    /// All functions whose file key matches `file_regex` (case-insensitive,
    /// anchored at the start).
    pub fn find_functions_by_file_regex(&self, file_regex: &str) -> Result<Vec<&CoveredFunction>> {
        let regex = RegexBuilder::new(file_regex)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::Config(format!("invalid file regex: {e}")))?;
        let mut functions = Vec::new();
        for (key, file_functions) in &self.table {
            if matches_anchored(&regex, key) {
                functions.extend(file_functions.iter());
            }
        }
        Ok(functions)
    }

    /// Rebuild the in-memory caches after deserialization.
    fn rebuild_caches(&mut self) {
        self.signature_cache.clear();
        for func in &self.by_id {
            self.signature_cache
                .entry(func.signature.clone())
                .or_default()
                .push(func.identifier);
        }
    }

    pub fn to_csv(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        let mut writer = BufWriter::new(file);
        for functions in self.table.values() {
            for func in functions {
                writeln!(writer, "{}", func.to_csv_row()).map_err(|e| Error::io(path, e))?;
            }
        }
        writer.flush().map_err(|e| Error::io(path, e))
    }

    pub fn from_csv(path: &Path, repo_root: Option<PathBuf>) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let mut index = FunctionIndex::new(repo_root);
        let mut all = Vec::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| Error::io(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let func = CoveredFunction::from_csv_row(&line).ok_or_else(|| Error::Serialize {
                path: path.to_path_buf(),
                message: format!("malformed function row at line {}", line_no + 1),
            })?;
            all.push(func);
        }
        all.sort_by_key(|f| f.identifier);
        for func in all {
            index.table.entry(func.file.clone()).or_default().push(func.clone());
            index.by_id.push(func);
        }
        index.rebuild_caches();
        Ok(index)
    }

    /// Persist in the schema-checked binary envelope.
    pub fn to_binary(&self, path: &Path) -> Result<()> {
        serialize::write_envelope(path, self)
    }

    /// Load from the binary envelope; the repo-root binding stays unset.
    pub fn from_binary(path: &Path) -> Result<Self> {
        let mut index: FunctionIndex = serialize::read_envelope(path)?;
        index.repo_root = None;
        index.rebuild_caches();
        Ok(index)
    }
}

/// Matching rules for optional namespace/class filters: `""` requires the
/// field to be absent, `"*"` requires it to be present, anything else is an
/// exact match.
fn optional_field_matches(query: Option<&str>, value: Option<&str>) -> bool {
    match query {
        None => true,
        Some("") => value.is_none(),
        Some("*") => value.is_some(),
        Some(expected) => value == Some(expected),
    }
}

/// Anchored, case-insensitive match (regex `match` rather than `search`).
pub fn matches_anchored(regex: &regex::Regex, text: &str) -> bool {
    regex.find(text).is_some_and(|m| m.start() == 0)
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test selection algorithms.
//!
//! Selectors orchestrate the diff analyzer, the function index, and the
//! trace index over a changelist, producing included/excluded test sets
//! with per-test selection causes. Retest-all (`*` with empty excludes) is
//! the conservative result every failure path degrades to.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};
use crate::index::matches_anchored;
use crate::tags::{has_ext, is_c_file};
use crate::vcs::ChangelistItem;

mod file_level;
mod function_level;
mod syscall;

pub use file_level::FileLevelRts;
pub use function_level::{FunctionLevelOptions, FunctionLevelRts};
pub use syscall::SyscallFileLevelRts;

/// Wildcard test identifier denoting retest-all.
pub const RETEST_ALL: &str = "*";

/// Well-known cause prefixes reported in `selection-causes.txt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionCause {
    AddNonFunctionalFile,
    DeleteNonFunctionalFile,
    ModifyNonFunctionalFile,
    RetestAllRegex,
    SelectionFailure,
    Unknown,
}

impl SelectionCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionCause::AddNonFunctionalFile => "Add non-functional",
            SelectionCause::DeleteNonFunctionalFile => "Delete non-functional",
            SelectionCause::ModifyNonFunctionalFile => "Modify non-functional",
            SelectionCause::RetestAllRegex => "Retest-all regex",
            SelectionCause::SelectionFailure => "Selection failure",
            SelectionCause::Unknown => "Unknown",
        }
    }

    /// Cause string referencing the triggering path.
    pub fn with_path(&self, path: &Path) -> String {
        format!("{} {}", self.as_str(), path.display())
    }
}

/// Final selection outcome with stringified causes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSelection {
    pub included: HashSet<String>,
    pub excluded: HashSet<String>,
    /// Test identifier to the code entities that triggered selection; empty
    /// lists mark tests selected through setup fan-out.
    pub causes: HashMap<String, Vec<String>>,
}

impl TestSelection {
    /// The conservative fallback: include everything.
    pub fn retest_all(causes: Vec<String>) -> Self {
        let causes = if causes.is_empty() {
            vec![SelectionCause::Unknown.as_str().to_string()]
        } else {
            causes
        };
        TestSelection {
            included: HashSet::from([RETEST_ALL.to_string()]),
            excluded: HashSet::new(),
            causes: HashMap::from([(RETEST_ALL.to_string(), causes)]),
        }
    }

    pub fn is_retest_all(&self) -> bool {
        self.included.contains(RETEST_ALL)
    }
}

/// Change-item policy shared by every selector: retest-all escalation,
/// generated-code handling, and include/exclude filtering. All regexes are
/// case-insensitive and anchored at the start (`match`, not `search`).
pub struct ChangePolicy {
    includes: Regex,
    excludes: Option<Regex>,
    pub generated_code_regex: Option<String>,
    generated_code_exts: Vec<String>,
    retest_all: Option<Regex>,
}

/// Builder-style inputs for [`ChangePolicy`].
#[derive(Debug, Clone, Default)]
pub struct ChangePolicyConfig {
    /// Include filter; `.*` when unset.
    pub includes_regex: Option<String>,
    /// Exclude filter; empty string or `None` disables exclusion.
    pub excludes_regex: Option<String>,
    /// Where generated code lives.
    pub generated_code_regex: Option<String>,
    /// Extensions whose change triggers the generated-code rule.
    pub generated_code_exts: Vec<String>,
    /// Changed paths forcing retest-all.
    pub retest_all_regex: Option<String>,
}

impl ChangePolicy {
    pub fn new(config: ChangePolicyConfig) -> Result<Self> {
        let compile = |pattern: &str, what: &str| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| Error::Config(format!("invalid {what} regex: {e}")))
        };
        let includes = compile(config.includes_regex.as_deref().unwrap_or(".*"), "includes")?;
        let excludes = match config.excludes_regex.as_deref() {
            None | Some("") => None,
            Some(pattern) => Some(compile(pattern, "excludes")?),
        };
        let retest_all = match config.retest_all_regex.as_deref() {
            None | Some("") => None,
            Some(pattern) => Some(compile(pattern, "retest-all")?),
        };
        Ok(Self {
            includes,
            excludes,
            generated_code_regex: config.generated_code_regex,
            generated_code_exts: config.generated_code_exts,
            retest_all,
        })
    }

    /// Whether this change alone forces retest-all.
    pub fn is_retest_all(&self, item: &ChangelistItem) -> bool {
        self.retest_all
            .as_ref()
            .is_some_and(|re| matches_anchored(re, &item.path.to_string_lossy()))
    }

    /// Whether this change triggers the generated-code rule: the extension
    /// is in the configured set and a generated-code location regex exists.
    pub fn is_generated_code(&self, item: &ChangelistItem) -> bool {
        self.generated_code_regex.is_some()
            && !self.generated_code_exts.is_empty()
            && has_ext(&item.path, &self.generated_code_exts)
    }

    /// Whether this change is filtered out of C/C++ selection entirely.
    pub fn is_excluded(&self, item: &ChangelistItem) -> bool {
        let path = item.path.to_string_lossy();
        !is_c_file(&item.path)
            || !matches_anchored(&self.includes, &path)
            || self
                .excludes
                .as_ref()
                .is_some_and(|re| matches_anchored(re, &path))
    }

    /// Include/exclude filtering only, for selectors that are not
    /// C/C++-specific.
    pub fn is_path_filtered(&self, item: &ChangelistItem) -> bool {
        let path = item.path.to_string_lossy();
        !matches_anchored(&self.includes, &path)
            || self
                .excludes
                .as_ref()
                .is_some_and(|re| matches_anchored(re, &path))
    }
}

/// The n-th parent of a path; depth 0 is the path itself. Walking past the
/// top yields the empty path.
pub(crate) fn parent_at_depth(path: &Path, depth: usize) -> PathBuf {
    let mut current = path;
    for _ in 0..depth {
        match current.parent() {
            Some(parent) => current = parent,
            None => return PathBuf::new(),
        }
    }
    current.to_path_buf()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

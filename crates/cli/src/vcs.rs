// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Git-backed changelist provider.
//!
//! Diffs use the three-dot merge-base form with whitespace and line-ending
//! normalization and renames disabled, so a rename surfaces as
//! ADDED + DELETED and whitespace-only churn never reaches the diff
//! analyzer. File contents are materialized with `git show`, BOM-stripped
//! and newline-normalized for byte-identical downstream comparison.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use dashmap::DashMap;
use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};

/// Action recorded for a changed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    Added,
    Modified,
    Deleted,
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeAction::Added => write!(f, "ADDED"),
            ChangeAction::Modified => write!(f, "MODIFIED"),
            ChangeAction::Deleted => write!(f, "DELETED"),
        }
    }
}

/// One changed path between two revisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangelistItem {
    /// Repo-relative path as reported by the diff.
    pub path: PathBuf,
    pub action: ChangeAction,
}

/// The set of paths changed between two revisions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changelist {
    pub items: Vec<ChangelistItem>,
}

/// Subprocess `git` client with per-process diff/show caches.
pub struct GitClient {
    root: PathBuf,
    use_cache: bool,
    diff_cache: DashMap<String, Changelist>,
    show_cache: DashMap<String, String>,
}

impl GitClient {
    /// Open the repository containing `path`. Fails when `path` is not
    /// inside a git work tree.
    pub fn open(path: &Path) -> Result<Self> {
        let repo = git2::Repository::discover(path)
            .map_err(|e| Error::Vcs(format!("not a git repository: {}: {e}", path.display())))?;
        let root = repo
            .workdir()
            .ok_or_else(|| Error::Vcs(format!("bare repository: {}", path.display())))?
            .to_path_buf();
        Ok(Self {
            root,
            use_cache: true,
            diff_cache: DashMap::new(),
            show_cache: DashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    #[cfg(test)]
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    fn run_git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .args(args)
            .output()
            .map_err(|e| Error::Vcs(format!("failed to invoke git: {e}")))?;
        if !output.status.success() {
            return Err(Error::Vcs(format!(
                "git {} failed: {}",
                args.first().unwrap_or(&""),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Changes introduced by `to` relative to the common ancestor of `from`
    /// and `to` (three-dot diff).
    pub fn diff(&self, from_revision: &str, to_revision: &str) -> Result<Changelist> {
        let git_obj = format!("{from_revision}...{to_revision}");
        if self.use_cache
            && let Some(cached) = self.diff_cache.get(&git_obj)
        {
            return Ok(cached.value().clone());
        }
        let raw = self.run_git(&[
            "diff",
            "--no-renames",
            "--unified=0",
            "--no-color",
            "--ignore-cr-at-eol",
            "--ignore-space-at-eol",
            "--ignore-space-change",
            "--ignore-all-space",
            &git_obj,
        ])?;
        let changelist = parse_diff(&raw);
        debug!(
            "diff {git_obj} has {} change items",
            changelist.items.len()
        );
        if self.use_cache {
            self.diff_cache.insert(git_obj, changelist.clone());
        }
        Ok(changelist)
    }

    /// The contents of `path` at `revision`, BOM-stripped with line endings
    /// normalized to `\n`.
    pub fn content_at(&self, revision: &str, path: &Path) -> Result<String> {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let spec = format!(
            "{revision}:{}",
            relative.to_string_lossy().replace('\\', "/")
        );
        if self.use_cache
            && let Some(cached) = self.show_cache.get(&spec)
        {
            return Ok(cached.value().clone());
        }
        debug!("calling git show {spec}");
        let raw = self.run_git(&["show", &spec])?;
        let content = normalize_content(&raw);
        if self.use_cache {
            self.show_cache.insert(spec, content.clone());
        }
        Ok(content)
    }
}

/// Strip a UTF-8 BOM and normalize CRLF/CR line endings to `\n`.
pub fn normalize_content(raw: &str) -> String {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    raw.replace("\r\n", "\n").replace('\r', "\n")
}

static DIFF_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^diff --git a/(?P<filepath>.*) b/.*$").expect("valid regex"));

/// Scan `diff --git a/<path> b/<path>` headers; the immediately following
/// line decides ADDED/DELETED, anything else is MODIFIED.
pub fn parse_diff(diff: &str) -> Changelist {
    let lines: Vec<&str> = diff.lines().collect();
    let mut items = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if !line.contains("diff --git") {
            continue;
        }
        let Some(captures) = DIFF_HEADER_RE.captures(line) else {
            continue;
        };
        let filepath = &captures["filepath"];
        let mut action = ChangeAction::Modified;
        if let Some(next) = lines.get(idx + 1) {
            if next.contains("new file mode") {
                action = ChangeAction::Added;
            } else if next.contains("deleted file mode") {
                action = ChangeAction::Deleted;
            }
        }
        let item = ChangelistItem {
            path: PathBuf::from(filepath),
            action,
        };
        if !items.contains(&item) {
            items.push(item);
        }
    }
    Changelist { items }
}

#[cfg(test)]
#[path = "vcs_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures: an in-memory tag extractor and a scratch git
//! repository builder.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use tempfile::TempDir;

use crate::error::Result;
use crate::tags::{FunctionDefinition, NonFunctionalEntityDefinition, TagExtractor};

/// Tag extractor backed by registered definitions instead of ctags.
///
/// Definitions are registered either for an exact path or for a content
/// marker; marker registration serves materialized revision snapshots whose
/// temp paths are not known up front.
#[derive(Default)]
pub struct FakeExtractor {
    by_path: Mutex<HashMap<PathBuf, FileDefs>>,
    by_marker: Mutex<Vec<(String, FileDefs)>>,
}

#[derive(Default, Clone)]
pub struct FileDefs {
    pub functions: Vec<FunctionDefinition>,
    pub non_functional: Vec<NonFunctionalEntityDefinition>,
}

impl FakeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_path(&self, path: impl Into<PathBuf>, defs: FileDefs) {
        self.by_path.lock().unwrap().insert(path.into(), defs);
    }

    /// Register definitions for any file whose content contains `marker`.
    /// Earlier registrations win.
    pub fn register_marker(&self, marker: impl Into<String>, defs: FileDefs) {
        self.by_marker.lock().unwrap().push((marker.into(), defs));
    }

    fn lookup(&self, file: &Path) -> FileDefs {
        if let Some(defs) = self.by_path.lock().unwrap().get(file) {
            return defs.clone();
        }
        let content = std::fs::read_to_string(file).unwrap_or_default();
        for (marker, defs) in self.by_marker.lock().unwrap().iter() {
            if content.contains(marker.as_str()) {
                return defs.clone();
            }
        }
        FileDefs::default()
    }
}

impl TagExtractor for FakeExtractor {
    fn functions(&self, file: &Path) -> Result<Vec<FunctionDefinition>> {
        Ok(self
            .lookup(file)
            .functions
            .into_iter()
            .map(|mut func| {
                func.file = file.to_path_buf();
                func
            })
            .collect())
    }

    fn non_functional_entities(&self, file: &Path) -> Result<Vec<NonFunctionalEntityDefinition>> {
        Ok(self
            .lookup(file)
            .non_functional
            .into_iter()
            .map(|mut entity| {
                entity.file = file.to_path_buf();
                entity
            })
            .collect())
    }
}

/// Shorthand for a plain function definition.
pub fn func_def(signature: &str, start: u32, end: u32) -> FunctionDefinition {
    FunctionDefinition {
        file: PathBuf::new(),
        signature: signature.to_string(),
        start_line: start,
        end_line: end,
        namespace: None,
        class_name: None,
        properties: None,
    }
}

/// Shorthand for a non-functional entity definition.
pub fn non_func_def(name: &str, start: u32, end: u32, properties: &str) -> NonFunctionalEntityDefinition {
    NonFunctionalEntityDefinition {
        file: PathBuf::new(),
        name: name.to_string(),
        start_line: start,
        end_line: end,
        properties: Some(properties.to_string()),
    }
}

/// A scratch git repository for VCS and selection tests.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let repo = Self { dir };
        repo.git(&["init", "--initial-branch=main"]);
        repo.git(&["config", "user.email", "tests@binaryrts.invalid"]);
        repo.git(&["config", "user.name", "binaryrts tests"]);
        repo
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .arg("-C")
            .arg(self.dir.path())
            .args(args)
            .output()
            .expect("git must be runnable in tests");
        assert!(
            output.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Write `content` to `path`, commit, and return the commit hash.
    pub fn commit_file(&self, path: &str, content: &str) -> String {
        let full = self.dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&full, content).unwrap();
        self.git(&["add", "."]);
        self.git(&["commit", "--allow-empty", "-m", &format!("update {path}")]);
        self.git(&["rev-parse", "HEAD"])
    }

    /// Delete `path`, commit, and return the commit hash.
    pub fn delete_file(&self, path: &str) -> String {
        self.git(&["rm", path]);
        self.git(&["commit", "-m", &format!("delete {path}")]);
        self.git(&["rev-parse", "HEAD"])
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

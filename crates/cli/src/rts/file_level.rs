// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! File-level selection: every function of a modified or deleted file is
//! affected. Added files have no prior traces and contribute nothing.

use std::collections::HashSet;

use tracing::debug;

use crate::error::Result;
use crate::index::{FunctionIndex, FunctionQuery};
use crate::traces::FunctionTraces;
use crate::vcs::{ChangeAction, GitClient};

use super::{ChangePolicy, SelectionCause, TestSelection};

pub struct FileLevelRts<'a> {
    git: &'a GitClient,
    index: &'a FunctionIndex,
    traces: &'a FunctionTraces,
    policy: ChangePolicy,
}

impl<'a> FileLevelRts<'a> {
    pub fn new(
        git: &'a GitClient,
        index: &'a FunctionIndex,
        traces: &'a FunctionTraces,
        policy: ChangePolicy,
    ) -> Self {
        Self {
            git,
            index,
            traces,
            policy,
        }
    }

    pub fn select_tests(&self, from_revision: &str, to_revision: &str) -> Result<TestSelection> {
        let mut affected: HashSet<u32> = HashSet::new();
        let changelist = self.git.diff(from_revision, to_revision)?;

        for item in &changelist.items {
            if self.policy.is_retest_all(item) {
                return Ok(TestSelection::retest_all(vec![
                    SelectionCause::RetestAllRegex.with_path(&item.path),
                ]));
            }
            if self.policy.is_generated_code(item)
                && let Some(regex) = &self.policy.generated_code_regex
            {
                for func in self.index.find_functions_by_file_regex(regex)? {
                    affected.insert(func.identifier);
                }
                continue;
            }
            if self.policy.is_excluded(item) {
                continue;
            }
            if matches!(item.action, ChangeAction::Modified | ChangeAction::Deleted) {
                let query = FunctionQuery {
                    file: Some(&item.path),
                    ..FunctionQuery::default()
                };
                for func in self.index.find_functions(&query) {
                    affected.insert(func.identifier);
                }
            }
        }

        debug!("file-level selection with {} affected function ids", affected.len());
        let selection = self.traces.select_tests(&affected);
        // File-level causes are the *files* of the affected functions.
        let causes = selection
            .causes
            .into_iter()
            .map(|(test, ids)| {
                let mut files: Vec<String> = ids
                    .iter()
                    .filter_map(|&id| self.index.get_by_id(id))
                    .map(|func| func.file.clone())
                    .collect::<HashSet<_>>()
                    .into_iter()
                    .collect();
                files.sort();
                (test, files)
            })
            .collect();
        Ok(TestSelection {
            included: selection.included,
            excluded: selection.excluded,
            causes,
        })
    }
}

#[cfg(test)]
#[path = "file_level_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Syscall-trace selection: tests depend on lowercased file basenames
//! instead of function identifiers.

use std::collections::HashSet;

use tracing::debug;

use crate::error::Result;
use crate::traces::FileTraces;
use crate::vcs::{ChangeAction, GitClient};

use super::{ChangePolicy, TestSelection};

pub struct SyscallFileLevelRts<'a> {
    git: &'a GitClient,
    traces: &'a FileTraces,
    policy: ChangePolicy,
}

impl<'a> SyscallFileLevelRts<'a> {
    pub fn new(git: &'a GitClient, traces: &'a FileTraces, policy: ChangePolicy) -> Self {
        Self { git, traces, policy }
    }

    pub fn select_tests(&self, from_revision: &str, to_revision: &str) -> Result<TestSelection> {
        let mut affected: HashSet<String> = HashSet::new();
        let changelist = self.git.diff(from_revision, to_revision)?;

        for item in &changelist.items {
            if self.policy.is_path_filtered(item) {
                continue;
            }
            if matches!(item.action, ChangeAction::Modified | ChangeAction::Deleted)
                && let Some(name) = item.path.file_name()
            {
                affected.insert(name.to_string_lossy().to_lowercase());
            }
        }

        debug!("syscall selection with {} affected files", affected.len());
        let selection = self.traces.select_tests(&affected);
        Ok(TestSelection {
            included: selection.included,
            excluded: selection.excluded,
            causes: selection.causes,
        })
    }
}

#[cfg(test)]
#[path = "syscall_tests.rs"]
mod tests;

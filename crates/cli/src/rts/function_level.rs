// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Function-level selection.
//!
//! Modified files are diffed symbolically; added and deleted files
//! contribute all of their functions. Non-functional entities (macros,
//! globals, member/enum variables, constexpr functions) optionally extend
//! the affected set through cross-reference search, escalate to marking the
//! whole file, or force retest-all.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::diff::DiffAnalyzer;
use crate::error::{Error, Result};
use crate::index::{FunctionIndex, FunctionQuery, matches_anchored};
use crate::tags::{FunctionDefinition, TagExtractor, is_c_file};
use crate::traces::FunctionTraces;
use crate::vcs::{ChangeAction, ChangelistItem, GitClient};
use crate::xref::{CrossRefSearcher, SearchBackend};

use super::{ChangePolicy, SelectionCause, TestSelection, parent_at_depth};

/// Heuristic and analysis toggles for function-level selection.
#[derive(Debug, Clone)]
pub struct FunctionLevelOptions {
    /// Cross-reference search for changed non-functional entities.
    pub non_functional_analysis: bool,
    /// How many directory levels above a changed file the search roots at.
    /// 2 suits the common `inc`/`src` project split.
    pub non_functional_analysis_depth: usize,
    /// Any non-functional change forces retest-all.
    pub non_functional_retest_all: bool,
    /// Newly added virtual/override members match any class.
    pub virtual_analysis: bool,
    /// Newly added inner-scope functions shadow outer scopes.
    pub scope_analysis: bool,
    /// Newly added functions overload same-named ones in the same file.
    pub overload_analysis: bool,
    /// Changed files matching this pattern escalate non-functional changes
    /// to file-level: every function in the file becomes affected.
    pub file_level_regex: Option<String>,
    /// Cross-reference backend.
    pub search_backend: SearchBackend,
}

impl Default for FunctionLevelOptions {
    fn default() -> Self {
        Self {
            non_functional_analysis: false,
            non_functional_analysis_depth: 2,
            non_functional_retest_all: false,
            virtual_analysis: false,
            scope_analysis: false,
            overload_analysis: false,
            file_level_regex: None,
            search_backend: SearchBackend::default(),
        }
    }
}

pub struct FunctionLevelRts<'a> {
    git: &'a GitClient,
    index: &'a FunctionIndex,
    traces: &'a FunctionTraces,
    extractor: &'a dyn TagExtractor,
    policy: ChangePolicy,
    options: FunctionLevelOptions,
    file_level_regex: Option<Regex>,
}

impl<'a> FunctionLevelRts<'a> {
    pub fn new(
        git: &'a GitClient,
        index: &'a FunctionIndex,
        traces: &'a FunctionTraces,
        extractor: &'a dyn TagExtractor,
        policy: ChangePolicy,
        options: FunctionLevelOptions,
    ) -> Result<Self> {
        let file_level_regex = match options.file_level_regex.as_deref() {
            None | Some("") => None,
            Some(pattern) => Some(
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| Error::Config(format!("invalid file-level regex: {e}")))?,
            ),
        };
        Ok(Self {
            git,
            index,
            traces,
            extractor,
            policy,
            options,
            file_level_regex,
        })
    }

    pub fn select_tests(&self, from_revision: &str, to_revision: &str) -> Result<TestSelection> {
        let mut affected: HashSet<u32> = HashSet::new();
        let changelist = self.git.diff(from_revision, to_revision)?;
        let analyzer = DiffAnalyzer::new(
            self.extractor,
            self.options.scope_analysis,
            self.options.overload_analysis,
            self.options.virtual_analysis,
        );

        for item in &changelist.items {
            debug!("analyzing change item: {} ({})", item.path.display(), item.action);

            if self.policy.is_retest_all(item) {
                debug!("triggering retest-all");
                return Ok(TestSelection::retest_all(vec![
                    SelectionCause::RetestAllRegex.with_path(&item.path),
                ]));
            }
            if self.policy.is_generated_code(item)
                && let Some(regex) = &self.policy.generated_code_regex
            {
                debug!("triggering generated-code handling");
                for func in self.index.find_functions_by_file_regex(regex)? {
                    affected.insert(func.identifier);
                }
                continue;
            }
            if self.policy.is_excluded(item) {
                debug!("change item excluded from selection");
                continue;
            }

            match item.action {
                ChangeAction::Added => {
                    let new_file = self.materialize(to_revision, item)?;
                    let functions = self.extractor.functions(new_file.path())?;
                    self.translate_functions(&functions, None, &mut affected);
                    if self.non_functional_pass_enabled() {
                        for entity in self.extractor.non_functional_entities(new_file.path())? {
                            if self.options.non_functional_retest_all {
                                return Ok(TestSelection::retest_all(vec![
                                    SelectionCause::AddNonFunctionalFile.with_path(&item.path),
                                ]));
                            }
                            self.translate_call_sites(&entity.name, item, &mut affected)?;
                        }
                    }
                }
                ChangeAction::Deleted => {
                    let old_file = self.materialize(from_revision, item)?;
                    let functions = self.extractor.functions(old_file.path())?;
                    self.translate_functions(&functions, Some(&item.path), &mut affected);
                    if self.non_functional_pass_enabled() {
                        for entity in self.extractor.non_functional_entities(old_file.path())? {
                            if self.options.non_functional_retest_all {
                                return Ok(TestSelection::retest_all(vec![
                                    SelectionCause::DeleteNonFunctionalFile.with_path(&item.path),
                                ]));
                            }
                            self.translate_call_sites(&entity.name, item, &mut affected)?;
                        }
                    }
                }
                ChangeAction::Modified => {
                    let old_file = self.materialize(from_revision, item)?;
                    let new_file = self.materialize(to_revision, item)?;
                    let mut scoped = analyzer
                        .changed_or_newly_overriding_functions(old_file.path(), new_file.path())?;
                    scoped.extend(
                        analyzer.deleted_functions(old_file.path(), new_file.path())?,
                    );
                    for (func, scope_hint) in &scoped {
                        let file_hint = scope_hint.as_ref().map(|_| item.path.as_path());
                        self.translate_functions(
                            std::slice::from_ref(func),
                            file_hint,
                            &mut affected,
                        );
                    }

                    if self.non_functional_pass_enabled() || self.file_level_regex.is_some() {
                        let mut first_entity = true;
                        for (entity, _) in analyzer
                            .changed_non_functional_entities(old_file.path(), new_file.path())?
                        {
                            if self.options.non_functional_retest_all {
                                return Ok(TestSelection::retest_all(vec![
                                    SelectionCause::ModifyNonFunctionalFile.with_path(&item.path),
                                ]));
                            }
                            // Escalate to the whole file once, not per entity.
                            if first_entity {
                                self.mark_all_functions(item, &mut affected);
                            }
                            first_entity = false;
                            if self.options.non_functional_analysis {
                                self.translate_call_sites(&entity.name, item, &mut affected)?;
                            }
                        }
                    }
                }
            }
        }

        debug!("selecting tests with {} affected function ids", affected.len());
        let selection = self.traces.select_tests(&affected);
        let causes = selection
            .causes
            .into_iter()
            .map(|(test, ids)| {
                let names: Vec<String> = ids
                    .iter()
                    .filter_map(|&id| self.index.get_by_id(id))
                    .map(|func| func.full_name())
                    .collect();
                (test, names)
            })
            .collect();
        Ok(TestSelection {
            included: selection.included,
            excluded: selection.excluded,
            causes,
        })
    }

    fn non_functional_pass_enabled(&self) -> bool {
        self.options.non_functional_analysis || self.options.non_functional_retest_all
    }

    /// Write the file's content at `revision` into a scoped temp file with
    /// a C++ extension so the tag extractor parses it as C++.
    fn materialize(&self, revision: &str, item: &ChangelistItem) -> Result<NamedTempFile> {
        let content = self.git.content_at(revision, &item.path)?;
        let mut file = tempfile::Builder::new()
            .suffix(".cxx")
            .tempfile()
            .map_err(|e| Error::Io {
                path: item.path.clone(),
                source: e,
            })?;
        file.write_all(content.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| Error::Io {
                path: item.path.clone(),
                source: e,
            })?;
        Ok(file)
    }

    /// Resolve definitions to indexed function ids, restricted to
    /// `file_hint` when given.
    fn translate_functions(
        &self,
        functions: &[FunctionDefinition],
        file_hint: Option<&Path>,
        affected: &mut HashSet<u32>,
    ) {
        for func in functions {
            let query = FunctionQuery {
                file: file_hint,
                signature: Some(&func.signature),
                namespace: func.namespace.as_deref(),
                class_name: func.class_name.as_deref(),
            };
            for matched in self.index.find_functions(&query) {
                affected.insert(matched.identifier);
            }
        }
    }

    /// Cross-reference `symbol` near the changed file and map each call
    /// site back to enclosing functions.
    fn translate_call_sites(
        &self,
        symbol: &str,
        item: &ChangelistItem,
        affected: &mut HashSet<u32>,
    ) -> Result<()> {
        let search_root = self.git.root().join(parent_at_depth(
            &item.path,
            self.options.non_functional_analysis_depth,
        ));
        info!(
            "non-functional analysis for `{symbol}` in {}",
            search_root.display()
        );
        let searcher = CrossRefSearcher::new(search_root, self.options.search_backend);
        for site in searcher.call_sites(symbol, Some(self.git.root()))? {
            if let Some(functions) = self.index.find_functions_by_line(&site.path, site.line) {
                for func in functions {
                    affected.insert(func.identifier);
                }
            }
        }
        Ok(())
    }

    /// Mark every indexed function of the changed file as affected, when
    /// the file matches the file-level escalation pattern.
    fn mark_all_functions(&self, item: &ChangelistItem, affected: &mut HashSet<u32>) {
        let Some(regex) = &self.file_level_regex else {
            return;
        };
        if !is_c_file(&item.path) || !matches_anchored(regex, &item.path.to_string_lossy()) {
            return;
        }
        let query = FunctionQuery {
            file: Some(&item.path),
            ..FunctionQuery::default()
        };
        for func in self.index.find_functions(&query) {
            affected.insert(func.identifier);
        }
    }
}

#[cfg(test)]
#[path = "function_level_tests.rs"]
mod tests;

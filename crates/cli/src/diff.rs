// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Symbolic diffing of two revisions of a source file.
//!
//! Two parsed file versions are compared function-by-function on matching
//! identifiers, with bodies compared as `raw_code` so whitespace and
//! comment churn never produces a change event. Optional heuristics
//! synthesize additional affected definitions for newly added overloads,
//! virtual/override members, and inner-scope shadows.

use std::path::{Path, PathBuf};

use dashmap::DashMap;

use crate::error::Result;
use crate::slicer;
use crate::tags::{FunctionDefinition, NonFunctionalEntityDefinition, TagExtractor};

/// File-scope hint attached to every yielded definition: `Some(file)`
/// restricts the downstream index query to that file, `None` searches
/// globally.
pub type ScopedFunction = (FunctionDefinition, Option<PathBuf>);

/// A changed non-functional entity with the same scope convention.
pub type ScopedNonFunctional = (NonFunctionalEntityDefinition, Option<PathBuf>);

/// Analyzer over materialized old/new revisions of one file.
pub struct DiffAnalyzer<'a> {
    extractor: &'a dyn TagExtractor,
    scope_analysis: bool,
    overload_analysis: bool,
    virtual_analysis: bool,
    /// Parsed definitions per materialized file; revisions are immutable
    /// snapshots so entries never invalidate.
    function_cache: DashMap<PathBuf, Vec<FunctionDefinition>>,
}

impl<'a> DiffAnalyzer<'a> {
    pub fn new(
        extractor: &'a dyn TagExtractor,
        scope_analysis: bool,
        overload_analysis: bool,
        virtual_analysis: bool,
    ) -> Self {
        Self {
            extractor,
            scope_analysis,
            overload_analysis,
            virtual_analysis,
            function_cache: DashMap::new(),
        }
    }

    fn functions(&self, file: &Path) -> Result<Vec<FunctionDefinition>> {
        if let Some(cached) = self.function_cache.get(file) {
            return Ok(cached.value().clone());
        }
        let functions = self.extractor.functions(file)?;
        self.function_cache
            .insert(file.to_path_buf(), functions.clone());
        Ok(functions)
    }

    /// Changed function definitions plus synthetic definitions for newly
    /// added functions, per the enabled heuristics.
    pub fn changed_or_newly_overriding_functions(
        &self,
        old_revision: &Path,
        new_revision: &Path,
    ) -> Result<Vec<ScopedFunction>> {
        let old_functions = self.functions(old_revision)?;
        let new_functions = self.functions(new_revision)?;
        let mut results: Vec<ScopedFunction> = Vec::new();

        for new_func in &new_functions {
            let new_code =
                slicer::raw_code(new_revision, new_func.start_line, new_func.end_line)?;
            let mut found = false;
            for old_func in &old_functions {
                if new_func.identifier() != old_func.identifier() {
                    continue;
                }
                let old_code =
                    slicer::raw_code(old_revision, old_func.start_line, old_func.end_line)?;
                if new_code != old_code && new_func.is_prototype() {
                    // A changed prototype means a keyword such as `virtual`
                    // or `override` was added; leaving the function
                    // unmatched lets the virtual-analysis rule below pick
                    // it up.
                    break;
                }
                if new_code != old_code {
                    results.push((new_func.clone(), Some(new_revision.to_path_buf())));
                }
                found = true;
                break;
            }

            // Newly added functions may overload an existing one: with
            // `B : A` and `void foo(A&)` traced, adding `void foo(B&)`
            // redirects calls for B objects. Matching by bare name with a
            // wildcard is broad (think `setName`), so the query is scoped
            // to the changed file.
            if self.overload_analysis
                && !found
                && !new_func.is_prototype()
                && new_func.has_parameters()
                && !new_func.is_test_function()
            {
                results.push((
                    FunctionDefinition {
                        file: new_func.file.clone(),
                        signature: format!("{}*", new_func.raw_name()),
                        start_line: new_func.start_line,
                        end_line: new_func.end_line,
                        namespace: None,
                        class_name: None,
                        properties: new_func.properties.clone(),
                    },
                    Some(new_revision.to_path_buf()),
                ));
            }

            // Newly added virtual/override members affect every class that
            // dispatches through the signature.
            if self.virtual_analysis
                && !found
                && (new_func.has_property("virtual") || new_func.has_property("override"))
            {
                results.push((
                    FunctionDefinition {
                        file: new_func.file.clone(),
                        signature: new_func.signature.clone(),
                        start_line: new_func.start_line,
                        end_line: new_func.end_line,
                        namespace: None,
                        class_name: Some("*".to_string()),
                        properties: new_func.properties.clone(),
                    },
                    None,
                ));
            }
            // A new member or namespace-local function may shadow one from
            // an outer scope. Expensive: every same-signature function is
            // marked affected.
            else if self.scope_analysis
                && !found
                && (new_func.class_name.is_some() || new_func.namespace.is_some())
                && !new_func.is_prototype()
            {
                results.push((
                    FunctionDefinition {
                        file: new_func.file.clone(),
                        signature: new_func.signature.clone(),
                        start_line: new_func.start_line,
                        end_line: new_func.end_line,
                        namespace: None,
                        class_name: None,
                        properties: new_func.properties.clone(),
                    },
                    None,
                ));
            }
        }
        Ok(results)
    }

    /// Old functions with no counterpart in the new revision. The scope
    /// hint points at the new revision; downstream resolves it to the
    /// changelist path so deletions still map through the index.
    pub fn deleted_functions(
        &self,
        old_revision: &Path,
        new_revision: &Path,
    ) -> Result<Vec<ScopedFunction>> {
        let old_functions = self.functions(old_revision)?;
        let new_functions = self.functions(new_revision)?;
        let mut results = Vec::new();
        for old_func in &old_functions {
            let found = new_functions
                .iter()
                .any(|new_func| old_func.identifier() == new_func.identifier());
            if !found {
                results.push((old_func.clone(), Some(new_revision.to_path_buf())));
            }
        }
        Ok(results)
    }

    /// Modified, added, and deleted non-functional entities, matched by
    /// name with `raw_code` equality on the modification check.
    pub fn changed_non_functional_entities(
        &self,
        old_revision: &Path,
        new_revision: &Path,
    ) -> Result<Vec<ScopedNonFunctional>> {
        let old_entities = self.extractor.non_functional_entities(old_revision)?;
        let new_entities = self.extractor.non_functional_entities(new_revision)?;
        let mut results = Vec::new();

        for new_entity in &new_entities {
            let new_code =
                slicer::raw_code(new_revision, new_entity.start_line, new_entity.end_line)?;
            let mut found = false;
            for old_entity in &old_entities {
                if new_entity.name == old_entity.name {
                    found = true;
                    let old_code = slicer::raw_code(
                        old_revision,
                        old_entity.start_line,
                        old_entity.end_line,
                    )?;
                    if new_code != old_code {
                        results.push((new_entity.clone(), Some(new_revision.to_path_buf())));
                    }
                    break;
                }
            }
            if !found {
                results.push((new_entity.clone(), Some(new_revision.to_path_buf())));
            }
        }

        for old_entity in &old_entities {
            let found = new_entities
                .iter()
                .any(|new_entity| old_entity.name == new_entity.name);
            if !found {
                results.push((old_entity.clone(), Some(new_revision.to_path_buf())));
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;

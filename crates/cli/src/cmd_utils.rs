// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `binaryrts utils` — merge, coverage statistics, and trace comparison.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use crate::cli::{CompareTracesArgs, CoverageStatsArgs, MergeArgs};
use crate::cmd_select::EXCLUDED_TESTS_FILE;
use crate::error::{Error, ExitCode, Result};
use crate::rts::RETEST_ALL;
use crate::tags::has_ext;
use crate::traces::FunctionTraces;

/// Merge excluded/included test lists into one excludes file.
///
/// Included identifiers are removed from the union of excludes; a single
/// `*` include clears everything (retest-all wins).
pub fn merge_test_lists(excludes: &[Vec<String>], includes: &[Vec<String>]) -> HashSet<String> {
    let mut final_excludes: HashSet<String> = excludes
        .iter()
        .flatten()
        .filter(|id| !id.is_empty())
        .cloned()
        .collect();
    'outer: for include_list in includes {
        for test_id in include_list {
            if test_id == RETEST_ALL {
                final_excludes.clear();
                break 'outer;
            }
            final_excludes.remove(test_id);
        }
    }
    final_excludes
}

pub fn run_merge(args: &MergeArgs) -> Result<()> {
    let read_lists = |paths: &[std::path::PathBuf]| -> Result<Vec<Vec<String>>> {
        paths
            .iter()
            .map(|path| {
                let content =
                    std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
                Ok(content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect())
            })
            .collect()
    };
    let excludes = read_lists(&args.exclude_files)?;
    let includes = read_lists(&args.include_files)?;
    let final_excludes = merge_test_lists(&excludes, &includes);

    std::fs::create_dir_all(&args.output).map_err(|e| Error::io(&args.output, e))?;
    let mut sorted: Vec<&String> = final_excludes.iter().collect();
    sorted.sort();
    let output_path = args.output.join(EXCLUDED_TESTS_FILE);
    let joined = sorted.iter().map(|s| s.as_str()).collect::<Vec<_>>().join("\n");
    std::fs::write(&output_path, joined).map_err(|e| Error::io(&output_path, e))
}

fn load_traces(path: &Path, lookup: Option<&Path>) -> Result<FunctionTraces> {
    if has_ext(path, &[".csv"]) {
        FunctionTraces::from_csv(path, lookup)
    } else if has_ext(path, &[".bin"]) {
        FunctionTraces::from_binary(path)
    } else {
        Err(Error::Config(
            "invalid trace format, only .csv and .bin are supported".to_string(),
        ))
    }
}

/// Per-module test and function counts, printed as plain text.
pub fn run_coverage_stats(args: &CoverageStatsArgs) -> Result<()> {
    let traces = load_traces(&args.traces, args.lookup.as_deref())?;
    let mut modules: BTreeMap<String, (usize, BTreeSet<u32>)> = BTreeMap::new();
    for test in traces.tests() {
        let entry = modules.entry(test.module.clone()).or_default();
        if test.is_concrete_case() {
            entry.0 += 1;
        }
        if let Some(entities) = traces.entities(test) {
            entry.1.extend(entities.iter().copied());
        }
    }
    println!("module;tests;functions");
    for (module, (tests, functions)) in &modules {
        println!("{module};{tests};{}", functions.len());
    }
    println!("total;{};{}", traces.len(), modules.values().map(|(_, f)| f.len()).sum::<usize>());
    Ok(())
}

/// Structural comparison of two trace files.
///
/// Reports tests present in only one file and per-test entity-set size
/// differences. Exits 0 when equal, 1 when different.
pub fn run_compare_traces(args: &CompareTracesArgs) -> Result<ExitCode> {
    let left = load_traces(&args.left, args.left_lookup.as_deref())?;
    let right = load_traces(&args.right, args.right_lookup.as_deref())?;

    let left_tests: BTreeSet<String> = left.tests().map(ToString::to_string).collect();
    let right_tests: BTreeSet<String> = right.tests().map(ToString::to_string).collect();

    let mut different = false;
    for test in left_tests.difference(&right_tests) {
        println!("only in {}: {test}", args.left.display());
        different = true;
    }
    for test in right_tests.difference(&left_tests) {
        println!("only in {}: {test}", args.right.display());
        different = true;
    }
    for test in left_tests.intersection(&right_tests) {
        let test_id = crate::test_id::TestId::parse(test);
        let left_entities = left.entities(&test_id).cloned().unwrap_or_default();
        let right_entities = right.entities(&test_id).cloned().unwrap_or_default();
        if left_entities != right_entities {
            let only_left = left_entities.difference(&right_entities).count();
            let only_right = right_entities.difference(&left_entities).count();
            println!("{test}: -{only_left} +{only_right} entities");
            different = true;
        }
    }

    if different {
        Ok(ExitCode::Different)
    } else {
        println!("traces are structurally equal");
        Ok(ExitCode::Success)
    }
}

#[cfg(test)]
#[path = "cmd_utils_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `binaryrts convert` — turn raw dumps into trace indices.
//!
//! Dump parsing is embarrassingly parallel: files are shuffled with a
//! fixed seed, split into shards, and parsed on a rayon pool. Workers
//! exchange only owned coverage lists; the main thread merges shard
//! outputs linearly into one function index and trace table, keeping
//! identifier assignment deterministic for a fixed shard assignment.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cli::{ConvertArgs, ConvertCppArgs, ConvertSyscallsArgs};
use crate::config::Config;
use crate::coverage::{CoverageParser, DUMP_LOOKUP_FILE, TestCoverage};
use crate::ctags::CtagsExtractor;
use crate::discovery;
use crate::error::{Error, Result};
use crate::index::{BINARY_FUNCTION_LOOKUP_FILE, FUNCTION_LOOKUP_FILE, FunctionIndex};
use crate::test_id::TestId;
use crate::traces::{
    BINARY_TEST_FILE_TRACES_FILE, BINARY_TEST_FUNCTION_TRACES_FILE, FileTraces, FunctionTraces,
    TEST_FILE_TRACES_FILE, TEST_FUNCTION_TRACES_FILE, TEST_LOOKUP_FILE,
};

/// Shared convert flags after applying `binaryrts.toml` defaults.
struct ResolvedConvert {
    regex: String,
    lookup: String,
    processes: usize,
    binary: bool,
}

impl ResolvedConvert {
    fn new(common: &ConvertArgs) -> Result<Self> {
        let config = Config::load(Path::new("."))?;
        Ok(Self {
            regex: common
                .regex
                .clone()
                .or(config.convert.regex)
                .unwrap_or_else(|| ".*".to_string()),
            lookup: common
                .lookup
                .clone()
                .or(config.convert.lookup)
                .unwrap_or_else(|| DUMP_LOOKUP_FILE.to_string()),
            processes: common.processes.or(config.convert.processes).unwrap_or(1),
            binary: common.binary || config.convert.binary.unwrap_or(false),
        })
    }
}

/// Parse all dump files, sharded across `processes` workers.
fn parse_all(
    parser: &CoverageParser,
    files: Vec<PathBuf>,
    processes: usize,
    syscalls: bool,
) -> Result<Vec<TestCoverage>> {
    let parse_shard = |shard: &[PathBuf]| -> Vec<TestCoverage> {
        debug!("worker parsing {} coverage files", shard.len());
        shard
            .iter()
            .filter_map(|file| {
                if syscalls {
                    parser.parse_syscalls(file)
                } else {
                    parser.parse_coverage(file)
                }
            })
            .collect()
    };

    if processes <= 1 {
        return Ok(parse_shard(&files));
    }

    info!("starting {processes} workers for {} dump files", files.len());
    let shards = discovery::shuffle_and_shard(files, processes);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(processes)
        .build()
        .map_err(|e| Error::Config(format!("failed to build worker pool: {e}")))?;
    let shard_outputs: Vec<Vec<TestCoverage>> = pool.install(|| {
        shards
            .par_iter()
            .map(|shard| {
                // A failing worker loses its shard, not the conversion.
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| parse_shard(shard)))
                    .unwrap_or_else(|_| {
                        warn!("worker failed, omitting its {} files", shard.len());
                        Vec::new()
                    })
            })
            .collect()
    });
    Ok(shard_outputs.into_iter().flatten().collect())
}

pub fn run_cpp(common: &ConvertArgs, args: &ConvertCppArgs) -> Result<()> {
    let resolved = ResolvedConvert::new(common)?;
    std::fs::create_dir_all(&common.output).map_err(|e| Error::io(&common.output, e))?;
    let lookup_files = discovery::find_lookup_files(&common.input, &resolved.lookup);
    let parser = CoverageParser::new(
        &args.extension,
        &lookup_files,
        args.java,
        Some(&resolved.regex),
    )?;
    let dump_files = discovery::find_dump_files(&common.input, &args.extension, &resolved.lookup);
    let all_coverage = parse_all(&parser, dump_files, resolved.processes, false)?;
    info!(
        "parsed {} test coverage dumps, constructing traces",
        all_coverage.len()
    );

    let extractor = CtagsExtractor::new(false);
    let mut index = FunctionIndex::new(common.repo.clone());
    let mut traces = FunctionTraces::new();
    for coverage in &all_coverage {
        let test_id = TestId::new(
            coverage.test_module.clone(),
            Some(coverage.test_suite.clone()),
            coverage.test_case.clone(),
        );
        // Deterministic identifier assignment for a fixed shard merge.
        let mut covered_lines: Vec<_> = coverage.covered_lines.iter().collect();
        covered_lines.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
        for line in covered_lines {
            match index.find_or_add_functions(&extractor, &line.file, line.line) {
                Ok(functions) => {
                    for func in functions {
                        traces.add_dependency(test_id.clone(), func.identifier);
                    }
                }
                Err(e) => {
                    // Per-line resolution failures never abort a conversion.
                    debug!(
                        "{e}: skipping {}:{} ({})",
                        line.file.display(),
                        line.line,
                        test_id
                    );
                }
            }
        }
    }

    if resolved.binary {
        index.to_binary(&common.output.join(BINARY_FUNCTION_LOOKUP_FILE))?;
        traces.to_binary(&common.output.join(BINARY_TEST_FUNCTION_TRACES_FILE))?;
    } else {
        index.to_csv(&common.output.join(FUNCTION_LOOKUP_FILE))?;
        let test_lookup = (!args.no_test_lookup).then(|| common.output.join(TEST_LOOKUP_FILE));
        traces.to_csv(
            &common.output.join(TEST_FUNCTION_TRACES_FILE),
            test_lookup.as_deref(),
        )?;
    }

    if common.clean {
        clean_dumps(&common.input, &args.extension, &resolved.lookup);
    }
    Ok(())
}

pub fn run_syscalls(common: &ConvertArgs, args: &ConvertSyscallsArgs) -> Result<()> {
    let resolved = ResolvedConvert::new(common)?;
    std::fs::create_dir_all(&common.output).map_err(|e| Error::io(&common.output, e))?;
    let lookup_files = discovery::find_lookup_files(&common.input, &resolved.lookup);
    let parser = CoverageParser::new(
        &args.extension,
        &lookup_files,
        false,
        Some(&resolved.regex),
    )?;
    let dump_files = discovery::find_dump_files(&common.input, &args.extension, &resolved.lookup);
    let all_coverage = parse_all(&parser, dump_files, resolved.processes, true)?;
    info!(
        "parsed {} syscall dumps, constructing traces",
        all_coverage.len()
    );

    let mut traces = FileTraces::new();
    for coverage in &all_coverage {
        let test_id = TestId::new(
            coverage.test_module.clone(),
            Some(coverage.test_suite.clone()),
            coverage.test_case.clone(),
        );
        for file in &coverage.covered_files {
            if let Some(name) = file.file_name() {
                traces.add_dependency(test_id.clone(), name.to_string_lossy().to_lowercase());
            }
        }
    }

    if resolved.binary {
        traces.to_binary(&common.output.join(BINARY_TEST_FILE_TRACES_FILE))?;
    } else {
        traces.to_csv(&common.output.join(TEST_FILE_TRACES_FILE))?;
    }

    if common.clean {
        clean_dumps(&common.input, &args.extension, &resolved.lookup);
    }
    Ok(())
}

/// Delete raw dump files after a successful conversion.
fn clean_dumps(input: &Path, extension: &str, lookup_file_name: &str) {
    for file in discovery::find_dump_files(input, extension, lookup_file_name) {
        if let Err(e) = std::fs::remove_file(&file) {
            warn!("failed to delete dump file {}: {e}", file.display());
        }
    }
}

#[cfg(test)]
#[path = "cmd_convert_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! CLI argument parsing with clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::xref::SearchBackend;

/// Regression test selection for C/C++ test suites from binary coverage traces
#[derive(Parser)]
#[command(name = "binaryrts")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Clone)]
pub enum Command {
    /// Convert raw coverage dumps into test traces and lookup tables
    Convert(ConvertArgs),
    /// Select tests between two VCS revisions
    Select(SelectArgs),
    /// Trace and selection utilities
    Utils(UtilsArgs),
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(clap::Args, Clone)]
pub struct ConvertArgs {
    /// Root directory searched recursively for coverage files
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub input: PathBuf,

    /// Output directory for converted traces
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// Regular expression to filter covered files in test traces
    /// (default `.*`, overridable in binaryrts.toml)
    #[arg(long)]
    pub regex: Option<String>,

    /// Name of the dump lookup file
    #[arg(long)]
    pub lookup: Option<String>,

    /// Repository root; covered files are stored relative to it
    #[arg(long, value_name = "DIR")]
    pub repo: Option<PathBuf>,

    /// Delete raw dump files after conversion
    #[arg(long)]
    pub clean: bool,

    /// Number of worker processes for parallel parsing
    #[arg(long, value_name = "N")]
    pub processes: Option<usize>,

    /// Emit the schema-checked binary form instead of CSV
    #[arg(long)]
    pub binary: bool,

    #[command(subcommand)]
    pub command: ConvertCommand,
}

#[derive(Subcommand, Clone)]
pub enum ConvertCommand {
    /// Convert basic-block coverage into function-level test traces
    Cpp(ConvertCppArgs),
    /// Convert syscall file-access traces into file-level test traces
    Syscalls(ConvertSyscallsArgs),
}

#[derive(clap::Args, Clone)]
pub struct ConvertCppArgs {
    /// Coverage file extension searched for recursively
    #[arg(short = 'e', long = "ext", default_value = ".log")]
    pub extension: String,

    /// Coverage stems from Java tests (one dump per suite, no modules)
    #[arg(long)]
    pub java: bool,

    /// Skip the test-lookup side file and store test identifiers inline
    #[arg(long)]
    pub no_test_lookup: bool,
}

#[derive(clap::Args, Clone)]
pub struct ConvertSyscallsArgs {
    /// Syscall dump extension searched for recursively
    #[arg(short = 'e', long = "ext", default_value = ".log.syscalls")]
    pub extension: String,
}

#[derive(clap::Args, Clone)]
pub struct SelectArgs {
    /// Revision the change set is compared against
    #[arg(short, long, default_value = "main", value_name = "REV")]
    pub from: String,

    /// Revision containing the changes under selection
    #[arg(short, long, default_value = "HEAD", value_name = "REV")]
    pub to: String,

    /// Git repository root
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub repo: PathBuf,

    /// Output directory for selection results
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// Regular expression including changed files in selection
    /// (default `.*`, overridable in binaryrts.toml)
    #[arg(long)]
    pub regex: Option<String>,

    /// Regular expression excluding changed files after inclusion
    #[arg(long)]
    pub exclude_regex: Option<String>,

    #[command(subcommand)]
    pub command: SelectCommand,
}

#[derive(Subcommand, Clone)]
pub enum SelectCommand {
    /// Select C++ (GoogleTest) tests from function-level traces
    Cpp(SelectCppArgs),
    /// Select tests from syscall file-access traces
    Syscalls(SelectSyscallsArgs),
}

#[derive(clap::Args, Clone)]
pub struct SelectCppArgs {
    /// Function lookup table (.csv or .bin)
    #[arg(long, value_name = "FILE")]
    pub lookup: PathBuf,

    /// Test function traces (.csv or .bin)
    #[arg(long, value_name = "FILE")]
    pub traces: PathBuf,

    /// Analyze call sites of changed non-functional entities
    #[arg(long = "non-functional")]
    pub non_functional: bool,

    /// Directory levels above a changed file to root the call-site search.
    /// Defaults to 2, suiting the common inc/src project split
    #[arg(long = "non-functional-depth", value_name = "N")]
    pub non_functional_depth: Option<usize>,

    /// Fall back to retest-all on any non-functional change
    #[arg(long = "non-functional-retest-all")]
    pub non_functional_retest_all: bool,

    /// File-level instead of function-level selection granularity
    #[arg(long = "file-level")]
    pub file_level: bool,

    /// Treat added inner-scope functions as shadowing outer scopes
    #[arg(long = "scope-analysis", alias = "scope", alias = "scope-overrides")]
    pub scope_analysis: bool,

    /// Treat added functions as potential overloads of same-named ones
    #[arg(long = "overload-analysis", alias = "overload")]
    pub overload_analysis: bool,

    /// Treat added virtual/override members as affecting any class
    #[arg(long = "virtual-analysis", alias = "virtual")]
    pub virtual_analysis: bool,

    /// Regex to directories containing generated code
    #[arg(long = "generated-code", value_name = "REGEX")]
    pub generated_code: Option<String>,

    /// Extensions whose change affects all generated-code functions
    #[arg(long = "generated-ext", value_name = "EXT")]
    pub generated_ext: Vec<String>,

    /// Regex of changed files that force retest-all
    #[arg(long = "retest-all", value_name = "REGEX")]
    pub retest_all: Option<String>,

    /// Regex of changed files whose non-functional changes mark every
    /// function in the file as affected
    #[arg(long = "file-level-regex", value_name = "REGEX")]
    pub file_level_regex: Option<String>,

    /// Cross-reference search backend for non-functional analysis
    #[arg(long = "search-backend", value_enum, default_value_t = SearchBackendArg::Walk)]
    pub search_backend: SearchBackendArg,

    /// Run the full evaluation matrix of selector configurations
    #[arg(long)]
    pub evaluation: bool,

    /// Prefix evaluation output directories with `java` instead of `cpp`
    #[arg(long)]
    pub java: bool,
}

#[derive(clap::Args, Clone)]
pub struct SelectSyscallsArgs {
    /// Test file traces (.csv or .bin)
    #[arg(long, value_name = "FILE")]
    pub traces: PathBuf,
}

/// CLI face of [`SearchBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchBackendArg {
    /// cscope cross-reference index
    Cscope,
    /// recursive fixed-string grep
    Grep,
    /// native literal directory walk
    Walk,
}

impl From<SearchBackendArg> for SearchBackend {
    fn from(arg: SearchBackendArg) -> Self {
        match arg {
            SearchBackendArg::Cscope => SearchBackend::CscopeIndex,
            SearchBackendArg::Grep => SearchBackend::RecursiveGrep,
            SearchBackendArg::Walk => SearchBackend::LiteralWalk,
        }
    }
}

#[derive(clap::Args, Clone)]
pub struct UtilsArgs {
    #[command(subcommand)]
    pub command: UtilsCommand,
}

#[derive(Subcommand, Clone)]
pub enum UtilsCommand {
    /// Merge included/excluded test files into a single excludes file
    Merge(MergeArgs),
    /// Report per-module coverage statistics from a trace file
    Coverage(CoverageStatsArgs),
    /// Structurally compare two trace files
    CompareTraces(CompareTracesArgs),
}

#[derive(clap::Args, Clone)]
pub struct MergeArgs {
    /// Output directory for the merged excludes file
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// `included.txt` files to merge
    #[arg(long = "include", value_name = "FILE")]
    pub include_files: Vec<PathBuf>,

    /// `excluded.txt` files to merge
    #[arg(long = "exclude", value_name = "FILE")]
    pub exclude_files: Vec<PathBuf>,
}

#[derive(clap::Args, Clone)]
pub struct CoverageStatsArgs {
    /// Test function traces (.csv or .bin)
    #[arg(long, value_name = "FILE")]
    pub traces: PathBuf,

    /// Test lookup side file for compact traces
    #[arg(long, value_name = "FILE")]
    pub lookup: Option<PathBuf>,
}

#[derive(clap::Args, Clone)]
pub struct CompareTracesArgs {
    /// Left trace file
    pub left: PathBuf,

    /// Right trace file
    pub right: PathBuf,

    /// Test lookup side file for the left trace
    #[arg(long, value_name = "FILE")]
    pub left_lookup: Option<PathBuf>,

    /// Test lookup side file for the right trace
    #[arg(long, value_name = "FILE")]
    pub right_lookup: Option<PathBuf>,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! `binaryrts select` — run test selection between two revisions.
//!
//! Every configuration writes `included.txt`, `excluded.txt`,
//! `selection-causes.txt`, and a START/END event pair into its output
//! directory. Any selector error degrades to retest-all; the command still
//! exits 0 and the fallback is visible in the causes file.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing::{error, info};

use crate::cli::{SelectArgs, SelectCppArgs, SelectSyscallsArgs};
use crate::config::Config;
use crate::ctags::CtagsExtractor;
use crate::error::{Error, Result};
use crate::event_log::{EVENT_LOG_FILE, LogEvent, RTS_END_EVENT, RTS_START_EVENT};
use crate::index::FunctionIndex;
use crate::rts::{
    ChangePolicy, ChangePolicyConfig, FileLevelRts, FunctionLevelOptions, FunctionLevelRts,
    SelectionCause, SyscallFileLevelRts, TestSelection,
};
use crate::tags::has_ext;
use crate::traces::{FileTraces, FunctionTraces, TEST_LOOKUP_FILE};
use crate::vcs::GitClient;

/// File name of the included test identifiers.
pub const INCLUDED_TESTS_FILE: &str = "included.txt";

/// File name of the excluded test identifiers.
pub const EXCLUDED_TESTS_FILE: &str = "excluded.txt";

/// File name of the JSON cause map.
pub const SELECTION_CAUSES_FILE: &str = "selection-causes.txt";

/// Shared select flags after applying `binaryrts.toml` defaults.
struct ResolvedSelect {
    regex: String,
    exclude_regex: String,
    retest_all: Option<String>,
    generated_code: Option<String>,
    generated_ext: Vec<String>,
    non_functional_depth: usize,
}

impl ResolvedSelect {
    fn new(common: &SelectArgs, args: Option<&SelectCppArgs>) -> Result<Self> {
        let config = Config::load(Path::new("."))?;
        Ok(Self {
            regex: common
                .regex
                .clone()
                .or(config.select.regex)
                .unwrap_or_else(|| ".*".to_string()),
            exclude_regex: common
                .exclude_regex
                .clone()
                .or(config.select.exclude_regex)
                .unwrap_or_default(),
            retest_all: args
                .and_then(|a| a.retest_all.clone())
                .or(config.select.retest_all),
            generated_code: args
                .and_then(|a| a.generated_code.clone())
                .or(config.select.generated_code),
            generated_ext: match args.map(|a| a.generated_ext.clone()) {
                Some(exts) if !exts.is_empty() => exts,
                _ => config.select.generated_ext,
            },
            non_functional_depth: args
                .and_then(|a| a.non_functional_depth)
                .or(config.select.non_functional_depth)
                .unwrap_or(2),
        })
    }
}

/// One named selector configuration.
#[derive(Debug, Clone, Default)]
struct RtsConfiguration {
    name: String,
    file_level: bool,
    scope_analysis: bool,
    overload_analysis: bool,
    virtual_analysis: bool,
    non_functional_analysis: bool,
    non_functional_retest_all: bool,
    non_functional_analysis_depth: usize,
}

/// The fixed matrix run by `--evaluation`.
fn evaluation_matrix(java: bool, depth: usize) -> Vec<RtsConfiguration> {
    let prefix = if java { "java" } else { "cpp" };
    let base = RtsConfiguration {
        non_functional_analysis_depth: depth,
        ..RtsConfiguration::default()
    };
    vec![
        RtsConfiguration {
            name: format!("{prefix}-func"),
            ..base.clone()
        },
        RtsConfiguration {
            name: format!("{prefix}-func-macro"),
            non_functional_analysis: true,
            ..base.clone()
        },
        RtsConfiguration {
            name: format!("{prefix}-func-macro-retest-all"),
            non_functional_retest_all: true,
            ..base.clone()
        },
        RtsConfiguration {
            name: format!("{prefix}-func-scope"),
            scope_analysis: true,
            ..base.clone()
        },
        RtsConfiguration {
            name: format!("{prefix}-func-overload"),
            overload_analysis: true,
            ..base.clone()
        },
        RtsConfiguration {
            name: format!("{prefix}-func-virtual"),
            virtual_analysis: true,
            ..base.clone()
        },
        RtsConfiguration {
            name: format!("{prefix}-func-all"),
            scope_analysis: true,
            overload_analysis: true,
            virtual_analysis: true,
            non_functional_analysis: true,
            ..base.clone()
        },
        RtsConfiguration {
            name: format!("{prefix}-file"),
            file_level: true,
            ..base
        },
    ]
}

pub fn run_cpp(common: &SelectArgs, args: &SelectCppArgs) -> Result<()> {
    let git = GitClient::open(&common.repo)?;
    std::fs::create_dir_all(&common.output).map_err(|e| Error::io(&common.output, e))?;

    info!("loading function table from {}", args.lookup.display());
    let index = if has_ext(&args.lookup, &[".csv"]) {
        FunctionIndex::from_csv(&args.lookup, Some(git.root().to_path_buf()))?
    } else if has_ext(&args.lookup, &[".bin"]) {
        FunctionIndex::from_binary(&args.lookup)?
    } else {
        return Err(Error::Config(
            "invalid function lookup format, only .csv and .bin are supported".to_string(),
        ));
    };

    info!("loading test function traces from {}", args.traces.display());
    let traces = if has_ext(&args.traces, &[".csv"]) {
        let sibling_lookup = args
            .traces
            .parent()
            .map(|dir| dir.join(TEST_LOOKUP_FILE))
            .filter(|lookup| lookup.is_file());
        FunctionTraces::from_csv(&args.traces, sibling_lookup.as_deref())?
    } else if has_ext(&args.traces, &[".bin"]) {
        FunctionTraces::from_binary(&args.traces)?
    } else {
        return Err(Error::Config(
            "invalid test traces format, only .csv and .bin are supported".to_string(),
        ));
    };

    let resolved = ResolvedSelect::new(common, Some(args))?;
    let configurations = if args.evaluation {
        evaluation_matrix(args.java, resolved.non_functional_depth)
    } else {
        vec![RtsConfiguration {
            name: String::new(),
            file_level: args.file_level,
            scope_analysis: args.scope_analysis,
            overload_analysis: args.overload_analysis,
            virtual_analysis: args.virtual_analysis,
            non_functional_analysis: args.non_functional,
            non_functional_retest_all: args.non_functional_retest_all,
            non_functional_analysis_depth: resolved.non_functional_depth,
        }]
    };

    for config in configurations {
        let output_dir = if config.name.is_empty() {
            common.output.clone()
        } else {
            common.output.join(&config.name)
        };
        std::fs::create_dir_all(&output_dir).map_err(|e| Error::io(&output_dir, e))?;
        let config_label = if config.name.is_empty() {
            "default".to_string()
        } else {
            config.name.clone()
        };

        LogEvent::new(format!("{RTS_START_EVENT}_{config_label}"))
            .append(&output_dir.join(EVENT_LOG_FILE))?;

        let selection = run_configuration(&git, &index, &traces, common, args, &resolved, &config)
            .unwrap_or_else(|e| {
                error!("error occurred in RTS, falling back to retest-all: {e}");
                TestSelection::retest_all(vec![
                    SelectionCause::SelectionFailure.as_str().to_string(),
                ])
            });
        write_selection(&output_dir, &selection)?;
        print_summary(&config_label, &selection);

        LogEvent::new(format!("{RTS_END_EVENT}_{config_label}"))
            .append(&output_dir.join(EVENT_LOG_FILE))?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_configuration(
    git: &GitClient,
    index: &FunctionIndex,
    traces: &FunctionTraces,
    common: &SelectArgs,
    args: &SelectCppArgs,
    resolved: &ResolvedSelect,
    config: &RtsConfiguration,
) -> Result<TestSelection> {
    let policy = ChangePolicy::new(ChangePolicyConfig {
        includes_regex: Some(resolved.regex.clone()),
        excludes_regex: Some(resolved.exclude_regex.clone()),
        generated_code_regex: resolved.generated_code.clone(),
        generated_code_exts: resolved.generated_ext.clone(),
        retest_all_regex: resolved.retest_all.clone(),
    })?;
    info!(
        "running test selection for {}..{} ({})",
        common.from,
        common.to,
        if config.name.is_empty() {
            "default"
        } else {
            &config.name
        }
    );
    if config.file_level {
        let rts = FileLevelRts::new(git, index, traces, policy);
        rts.select_tests(&common.from, &common.to)
    } else {
        // Prototypes matter here: changed declarations carry keywords such
        // as `virtual` and `override` that definitions lack.
        let extractor = CtagsExtractor::new(true).with_cache();
        let options = FunctionLevelOptions {
            non_functional_analysis: config.non_functional_analysis,
            non_functional_analysis_depth: config.non_functional_analysis_depth,
            non_functional_retest_all: config.non_functional_retest_all,
            virtual_analysis: config.virtual_analysis,
            scope_analysis: config.scope_analysis,
            overload_analysis: config.overload_analysis,
            file_level_regex: args.file_level_regex.clone(),
            search_backend: args.search_backend.into(),
        };
        let rts = FunctionLevelRts::new(git, index, traces, &extractor, policy, options)?;
        rts.select_tests(&common.from, &common.to)
    }
}

pub fn run_syscalls(common: &SelectArgs, args: &SelectSyscallsArgs) -> Result<()> {
    let git = GitClient::open(&common.repo)?;
    std::fs::create_dir_all(&common.output).map_err(|e| Error::io(&common.output, e))?;

    let traces = if has_ext(&args.traces, &[".csv"]) {
        FileTraces::from_csv(&args.traces)?
    } else if has_ext(&args.traces, &[".bin"]) {
        FileTraces::from_binary(&args.traces)?
    } else {
        return Err(Error::Config(
            "invalid test file traces format, only .csv and .bin are supported".to_string(),
        ));
    };

    LogEvent::new(format!("{RTS_START_EVENT}_syscall"))
        .append(&common.output.join(EVENT_LOG_FILE))?;

    let resolved = ResolvedSelect::new(common, None)?;
    let policy = ChangePolicy::new(ChangePolicyConfig {
        includes_regex: Some(resolved.regex.clone()),
        excludes_regex: Some(resolved.exclude_regex.clone()),
        ..ChangePolicyConfig::default()
    })?;
    let rts = SyscallFileLevelRts::new(&git, &traces, policy);
    let selection = rts
        .select_tests(&common.from, &common.to)
        .unwrap_or_else(|e| {
            error!("error occurred in RTS, falling back to retest-all: {e}");
            TestSelection::retest_all(vec![
                SelectionCause::SelectionFailure.as_str().to_string(),
            ])
        });
    write_selection(&common.output, &selection)?;
    print_summary("syscall", &selection);

    LogEvent::new(format!("{RTS_END_EVENT}_syscall"))
        .append(&common.output.join(EVENT_LOG_FILE))?;
    Ok(())
}

/// Write the three selection artifacts.
fn write_selection(output_dir: &Path, selection: &TestSelection) -> Result<()> {
    let mut included: Vec<&String> = selection.included.iter().collect();
    included.sort();
    let mut excluded: Vec<&String> = selection.excluded.iter().collect();
    excluded.sort();

    let included_path = output_dir.join(INCLUDED_TESTS_FILE);
    let joined = included
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    std::fs::write(&included_path, joined).map_err(|e| Error::io(&included_path, e))?;

    let excluded_path = output_dir.join(EXCLUDED_TESTS_FILE);
    let joined = excluded
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    std::fs::write(&excluded_path, joined).map_err(|e| Error::io(&excluded_path, e))?;

    // BTreeMap for stable JSON key order.
    let causes: BTreeMap<&String, &Vec<String>> = selection.causes.iter().collect();
    let causes_path = output_dir.join(SELECTION_CAUSES_FILE);
    let json = serde_json::to_string(&causes).map_err(|e| Error::Serialize {
        path: causes_path.clone(),
        message: e.to_string(),
    })?;
    std::fs::write(&causes_path, json).map_err(|e| Error::io(&causes_path, e))
}

/// Short colored summary on stderr.
fn print_summary(label: &str, selection: &TestSelection) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let _ = write!(stderr, "{label}: ");
    if selection.is_retest_all() {
        let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        let _ = writeln!(stderr, "retest-all");
    } else {
        let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
        let _ = writeln!(
            stderr,
            "{} included, {} excluded",
            selection.included.len(),
            selection.excluded.len()
        );
    }
    let _ = stderr.reset();
}

#[cfg(test)]
#[path = "cmd_select_tests.rs"]
mod tests;

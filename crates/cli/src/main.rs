// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! BinaryRTS CLI entry point.

use clap::{CommandFactory, Parser};
use tracing_subscriber::{EnvFilter, fmt};

use binaryrts::cli::{Cli, Command, ConvertCommand, SelectCommand, UtilsCommand};
use binaryrts::error::ExitCode;
use binaryrts::{cmd_convert, cmd_select, cmd_utils, completions};

fn init_logging() {
    let filter = EnvFilter::try_from_env("BINARYRTS_LOG").unwrap_or_else(|_| EnvFilter::new("off"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();

    let exit_code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("binaryrts: {}", e);
            match e.downcast_ref::<binaryrts::Error>() {
                Some(err) => ExitCode::from(err),
                None => ExitCode::InternalError,
            }
        }
    };

    std::process::exit(exit_code as i32);
}

fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match &cli.command {
        None => {
            // Show help for bare invocation
            Cli::command().print_help()?;
            println!();
            Ok(ExitCode::Success)
        }
        Some(Command::Convert(args)) => {
            match &args.command {
                ConvertCommand::Cpp(cpp_args) => cmd_convert::run_cpp(args, cpp_args)?,
                ConvertCommand::Syscalls(sys_args) => cmd_convert::run_syscalls(args, sys_args)?,
            }
            Ok(ExitCode::Success)
        }
        Some(Command::Select(args)) => {
            match &args.command {
                SelectCommand::Cpp(cpp_args) => cmd_select::run_cpp(args, cpp_args)?,
                SelectCommand::Syscalls(sys_args) => cmd_select::run_syscalls(args, sys_args)?,
            }
            Ok(ExitCode::Success)
        }
        Some(Command::Utils(args)) => match &args.command {
            UtilsCommand::Merge(merge_args) => {
                cmd_utils::run_merge(merge_args)?;
                Ok(ExitCode::Success)
            }
            UtilsCommand::Coverage(stats_args) => {
                cmd_utils::run_coverage_stats(stats_args)?;
                Ok(ExitCode::Success)
            }
            UtilsCommand::CompareTraces(compare_args) => {
                Ok(cmd_utils::run_compare_traces(compare_args)?)
            }
        },
        Some(Command::Completions { shell }) => {
            completions::generate_completions(*shell);
            Ok(ExitCode::Success)
        }
    }
}

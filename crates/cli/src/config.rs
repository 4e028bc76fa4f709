// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Optional `binaryrts.toml` configuration.
//!
//! The file provides project-wide defaults for the shared CLI flags;
//! explicitly passed flags always win. Absence of the file is not an
//! error.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Configuration file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "binaryrts.toml";

/// Top-level configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub convert: ConvertConfig,
    #[serde(default)]
    pub select: SelectConfig,
}

/// Defaults for `binaryrts convert`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConvertConfig {
    /// Regex filtering covered file paths.
    pub regex: Option<String>,
    /// Dump lookup file name.
    pub lookup: Option<String>,
    /// Worker process count.
    pub processes: Option<usize>,
    /// Emit binary artifacts instead of CSV.
    pub binary: Option<bool>,
}

/// Defaults for `binaryrts select`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectConfig {
    /// Regex including/excluding changed files.
    pub regex: Option<String>,
    /// Exclude regex applied after inclusion.
    pub exclude_regex: Option<String>,
    /// Retest-all trigger regex.
    pub retest_all: Option<String>,
    /// Generated-code location regex.
    pub generated_code: Option<String>,
    /// Extensions triggering the generated-code rule.
    #[serde(default)]
    pub generated_ext: Vec<String>,
    /// Non-functional analysis depth.
    pub non_functional_depth: Option<usize>,
}

impl Config {
    /// Load the configuration next to `dir`, or defaults when absent.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

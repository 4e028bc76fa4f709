// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Universal-Ctags adapter for the [`TagExtractor`] interface.
//!
//! Invokes `ctags` with JSON output and normalizes its records into the
//! crate's definition types: anonymous namespaces collapse to `anon`,
//! anonymous functions become `lambda`, prototypes are prefixed with
//! `__proto__`, and template/specialization suffixes are folded into the
//! signature. A post-processing sweep upgrades member functions to the full
//! templated name of their enclosing class.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use dashmap::DashMap;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::tags::{
    FunctionDefinition, NonFunctionalEntityDefinition, PROTOTYPE_PREFIX, TagExtractor,
    TypeDefinition, extract_raw_signature,
};

/// Upper bound on a single ctags invocation.
pub const EXTRACTOR_TIMEOUT: Duration = Duration::from_secs(60 * 10);

/// One record of `ctags --output-format=json`.
#[derive(Debug, Deserialize)]
struct CtagsRecord {
    name: String,
    line: u32,
    kind: String,
    #[serde(default)]
    end: Option<u32>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    signature: Option<String>,
    #[serde(default, rename = "scopeKind")]
    scope_kind: Option<String>,
    #[serde(default)]
    properties: Option<String>,
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    specialization: Option<String>,
}

impl CtagsRecord {
    fn is_constexpr(&self) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|p| p.contains("constexpr") || p.contains("consteval"))
    }

    fn split_scope(&self) -> (Option<String>, Option<String>) {
        let Some(scope) = &self.scope else {
            return (None, None);
        };
        let mut fragments: Vec<&str> = scope.split("::").collect();
        let mut class_name = None;
        if matches!(self.scope_kind.as_deref(), Some("class") | Some("struct")) {
            class_name = fragments.pop().map(str::to_string);
        }
        let namespace = if fragments.is_empty() {
            None
        } else {
            Some(
                fragments
                    .iter()
                    .map(|f| if f.contains("__anon") { "anon" } else { f })
                    .collect::<Vec<_>>()
                    .join("::"),
            )
        };
        (namespace, class_name)
    }

    fn to_type_def(&self) -> Option<TypeDefinition> {
        if !matches!(self.kind.as_str(), "class" | "struct") {
            return None;
        }
        let end = self.end?;
        if self.template.is_none() && self.specialization.is_none() {
            return None;
        }
        let mut full_name = self.name.clone();
        if let Some(template) = &self.template {
            full_name.push_str(template);
        }
        if let Some(specialization) = &self.specialization {
            full_name.push_str(specialization);
        }
        let (namespace, _) = self.split_scope();
        Some(TypeDefinition {
            name: self.name.clone(),
            full_name,
            start_line: self.line,
            end_line: end,
            namespace,
        })
    }

    fn to_func_def(&self, file: &Path) -> Option<FunctionDefinition> {
        if !matches!(self.kind.as_str(), "function" | "prototype") {
            return None;
        }
        let mut signature = self.name.clone();
        if signature.starts_with("__anon") {
            // Lambdas inside a function body are covered by their parent;
            // free-standing anonymous functions keep a stable name.
            if self.scope_kind.as_deref() == Some("function") {
                return None;
            }
            signature = "lambda".to_string();
        }
        if self.kind == "prototype" {
            signature = format!("{PROTOTYPE_PREFIX}{signature}");
        }
        if let Some(template) = &self.template {
            signature.push_str(template);
        }
        if let Some(specialization) = &self.specialization {
            signature.push_str(specialization);
        }
        if let Some(params) = &self.signature {
            signature.push_str(&extract_raw_signature(params));
        }
        let (namespace, class_name) = self.split_scope();
        Some(FunctionDefinition {
            file: file.to_path_buf(),
            signature,
            start_line: self.line,
            end_line: self.end.unwrap_or(self.line),
            namespace,
            class_name,
            properties: self.properties.clone(),
        })
    }
}

/// Tag extractor backed by the `ctags` executable.
pub struct CtagsExtractor {
    /// Path to the ctags executable (`ctags` from PATH by default).
    executable: PathBuf,
    /// Whether to also emit prototypes (`--kinds-c[++]=+p`).
    include_prototypes: bool,
    /// Raw ctags output per file; shared across worker threads.
    output_cache: DashMap<PathBuf, String>,
    use_cache: bool,
}

impl CtagsExtractor {
    pub fn new(include_prototypes: bool) -> Self {
        Self {
            executable: PathBuf::from("ctags"),
            include_prototypes,
            output_cache: DashMap::new(),
            use_cache: false,
        }
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Cache raw ctags output per file. Only safe while the underlying
    /// files do not change (e.g. materialized revision snapshots).
    pub fn with_cache(mut self) -> Self {
        self.use_cache = true;
        self
    }

    fn raw_output(&self, file: &Path) -> Result<String> {
        if self.use_cache
            && let Some(cached) = self.output_cache.get(file)
        {
            return Ok(cached.value().clone());
        }
        let output = self.invoke(file)?;
        if self.use_cache {
            self.output_cache
                .insert(file.to_path_buf(), output.clone());
        }
        Ok(output)
    }

    fn invoke(&self, file: &Path) -> Result<String> {
        let mut command = Command::new(&self.executable);
        command
            .arg("--fields-all=*")
            .arg("--fields-c++=-{macrodef}")
            .arg("--fields-c=-{macrodef}")
            .arg("--fields=-Prtl");
        if self.include_prototypes {
            command.arg("--kinds-c=+p").arg("--kinds-c++=+p");
        }
        command
            .arg("--output-format=json")
            // Forcing the C++ parser fixes .ipp and template-heavy headers.
            .arg("--language-force=c++")
            .arg(file);
        debug!(?file, "invoking ctags");
        let output = run_with_timeout(command, EXTRACTOR_TIMEOUT)
            .map_err(|e| Error::Extractor(format!("{}: {e}", file.display())))?;
        if !output.status.success() {
            return Err(Error::Extractor(format!(
                "ctags exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn parse_records(raw: &str) -> Vec<CtagsRecord> {
        let mut records = Vec::new();
        for line in raw.lines() {
            match serde_json::from_str::<CtagsRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => debug!("skipping unparseable ctags record: {e}: {line}"),
            }
        }
        records
    }
}

/// Build function definitions from parsed records, including the
/// class-name upgrade sweep.
fn functions_from_records(records: &[CtagsRecord], file: &Path) -> Vec<FunctionDefinition> {
    let mut functions = Vec::new();
    let mut type_defs: HashMap<String, Vec<TypeDefinition>> = HashMap::new();
    for record in records {
        if let Some(type_def) = record.to_type_def() {
            type_defs.entry(type_def.name.clone()).or_default().push(type_def);
        } else if let Some(func) = record.to_func_def(file) {
            functions.push(func);
        }
    }
    // Upgrade member functions defined inside a templated type's body to
    // the full type name. Out-of-line members cannot be resolved without
    // compiler knowledge and keep the simple name.
    for function in &mut functions {
        let Some(class_name) = function.class_name.clone() else {
            continue;
        };
        if let Some(candidates) = type_defs.get(&class_name) {
            for type_def in candidates {
                if (type_def.start_line..=type_def.end_line).contains(&function.start_line) {
                    function.class_name = Some(type_def.full_name.clone());
                    break;
                }
            }
        }
    }
    functions
}

/// Build non-functional entity definitions from parsed records.
fn entities_from_records(
    records: &[CtagsRecord],
    file: &Path,
) -> Vec<NonFunctionalEntityDefinition> {
    let mut entities = Vec::new();
    for record in records {
        let is_non_functional = matches!(
            record.kind.as_str(),
            "macro" | "member" | "variable" | "enumerator" | "externvar"
        ) || (record.kind == "function" && record.is_constexpr());
        if !is_non_functional {
            continue;
        }
        let mut properties = record.kind.clone();
        if let Some(extra) = &record.properties {
            properties.push_str(extra);
        }
        entities.push(NonFunctionalEntityDefinition {
            file: file.to_path_buf(),
            name: record.name.clone(),
            start_line: record.line,
            end_line: record.end.unwrap_or(record.line),
            properties: Some(properties),
        });
    }
    entities
}

impl TagExtractor for CtagsExtractor {
    fn functions(&self, file: &Path) -> Result<Vec<FunctionDefinition>> {
        let raw = self.raw_output(file)?;
        Ok(functions_from_records(&Self::parse_records(&raw), file))
    }

    fn non_functional_entities(&self, file: &Path) -> Result<Vec<NonFunctionalEntityDefinition>> {
        let raw = self.raw_output(file)?;
        Ok(entities_from_records(&Self::parse_records(&raw), file))
    }
}

/// Run a command, killing it if the deadline passes.
///
/// stdout/stderr are drained on separate threads so a chatty child can
/// never fill the pipe and stall the deadline polling.
pub(crate) fn run_with_timeout(
    mut command: Command,
    timeout: Duration,
) -> std::io::Result<std::process::Output> {
    use std::io::Read;
    use std::process::Stdio;
    use std::time::Instant;

    fn drain(pipe: Option<impl Read>) -> Vec<u8> {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    }

    command.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = command.spawn()?;
    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();
    let stdout_reader = std::thread::spawn(move || drain(stdout_pipe));
    let stderr_reader = std::thread::spawn(move || drain(stderr_pipe));

    let start = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if start.elapsed() > timeout {
            warn!("subprocess exceeded {}s timeout, killing", timeout.as_secs());
            child.kill()?;
            child.wait()?;
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "subprocess timed out",
            ));
        }
        std::thread::sleep(Duration::from_millis(20));
    };

    Ok(std::process::Output {
        status,
        stdout: stdout_reader.join().unwrap_or_default(),
        stderr: stderr_reader.join().unwrap_or_default(),
    })
}

#[cfg(test)]
#[path = "ctags_tests.rs"]
mod tests;

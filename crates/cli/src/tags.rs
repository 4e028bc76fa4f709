// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Source-tag data model: function, type, and non-functional entity
//! definitions produced by the tag extractor.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Signature prefix marking a function prototype (declaration).
pub const PROTOTYPE_PREFIX: &str = "__proto__";

/// File extensions treated as C/C++ source.
pub const C_LIKE_EXTENSIONS: &[&str] = &[
    ".c", ".cc", ".cxx", ".c++", ".cpp", ".ipp", ".tpp", ".tcc", ".inl", ".inc", ".h", ".hh",
    ".hpp", ".hxx", ".h++",
];

/// GoogleTest registration macros; these parse as functions but must never
/// feed the overload heuristic.
const TEST_FUNCTION_NAMES: &[&str] = &[
    "TEST",
    "TEST_F",
    "TEST_P",
    "TYPED_TEST",
    "TYPED_TEST_P",
    "FRIEND_TEST",
];

/// Whether `file` has a C/C++ extension (case-insensitive).
pub fn is_c_file(file: &Path) -> bool {
    has_ext(file, C_LIKE_EXTENSIONS)
}

/// Whether `file` ends in one of `exts` (case-insensitive, dot included).
pub fn has_ext(file: &Path, exts: &[impl AsRef<str>]) -> bool {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    exts.iter()
        .any(|ext| name.ends_with(&ext.as_ref().to_lowercase()))
}

/// A function (or prototype) definition extracted from source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDefinition {
    /// Source file the definition was extracted from.
    pub file: PathBuf,
    /// Canonical signature: name, template/specialization suffixes, and the
    /// raw parameter list (see [`extract_raw_signature`]).
    pub signature: String,
    pub start_line: u32,
    pub end_line: u32,
    /// `::`-joined enclosing namespaces, anonymous components collapsed to
    /// `anon`.
    pub namespace: Option<String>,
    /// Enclosing class/struct; `Some("*")` in synthetic definitions matches
    /// any class.
    pub class_name: Option<String>,
    /// Comma-joined annotation bag (`virtual`, `override`, `static`, ...).
    pub properties: Option<String>,
}

impl FunctionDefinition {
    /// Matching identifier: scope-qualified for C/C++ files, the bare
    /// signature otherwise (declarations unified across translation units
    /// outside C/C++).
    pub fn identifier(&self) -> String {
        if is_c_file(&self.file) {
            format!(
                "{}::{}::{}",
                self.namespace.as_deref().unwrap_or(""),
                self.class_name.as_deref().unwrap_or(""),
                self.signature
            )
        } else {
            self.signature.clone()
        }
    }

    /// Function name without parameter or template information.
    pub fn raw_name(&self) -> &str {
        self.signature.split('(').next().unwrap_or(&self.signature)
    }

    pub fn is_prototype(&self) -> bool {
        self.signature.starts_with(PROTOTYPE_PREFIX)
    }

    pub fn has_parameters(&self) -> bool {
        !self.signature.contains("()")
    }

    pub fn is_test_function(&self) -> bool {
        TEST_FUNCTION_NAMES.contains(&self.raw_name())
    }

    pub fn has_property(&self, property: &str) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|props| props.split(',').any(|p| p.trim() == property))
    }
}

/// A class or struct with template/specialization parameters; used to
/// upgrade member functions to their full templated class name.
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    pub name: String,
    /// Name concatenated with template and specialization suffixes.
    pub full_name: String,
    pub start_line: u32,
    pub end_line: u32,
    pub namespace: Option<String>,
}

/// A macro, global/member/enum variable, extern variable, or
/// `constexpr`/`consteval` function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonFunctionalEntityDefinition {
    pub file: PathBuf,
    pub name: String,
    pub start_line: u32,
    pub end_line: u32,
    pub properties: Option<String>,
}

/// Parses a C/C++ file into definition records.
///
/// The production implementation shells out to Universal Ctags; tests
/// substitute fixed outputs.
pub trait TagExtractor {
    fn functions(&self, file: &Path) -> Result<Vec<FunctionDefinition>>;
    fn non_functional_entities(&self, file: &Path) -> Result<Vec<NonFunctionalEntityDefinition>>;
}

/// Canonicalize a raw parameter list: parameter names dropped, types kept,
/// `*`/`&` qualifiers of the last token preserved.
///
/// `(const std::string &x, char** y)` becomes `(conststd::string&,char**)`.
pub fn extract_raw_signature(signature: &str) -> String {
    let inner = signature
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(signature);
    let mut raw = String::from("(");
    for (idx, param) in inner.split(',').enumerate() {
        if idx != 0 {
            raw.push(',');
        }
        let parts: Vec<&str> = param.split(' ').collect();
        if let Some((last, init)) = parts.split_last() {
            if init.is_empty() {
                // Single token: an unnamed parameter type, kept verbatim.
                raw.push_str(last);
            } else {
                raw.push_str(&init.concat());
                raw.extend(last.chars().filter(|&c| c == '*' || c == '&'));
            }
        }
    }
    raw.push(')');
    raw
}

#[cfg(test)]
#[path = "tags_tests.rs"]
mod tests;

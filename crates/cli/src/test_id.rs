// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test identifiers of the form `module!!!suite!!!case`.
//!
//! Missing fragments are dropped from the right; `*` is a wildcard
//! fragment. `GLOBAL_TEST_SETUP` is a reserved suite name emitted by the
//! GoogleTest listener for global setup coverage.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between test identifier fragments.
pub const TEST_ID_SEP: &str = "!!!";

/// Reserved suite name for global test setup rows.
pub const GLOBAL_TEST_SETUP: &str = "GLOBAL_TEST_SETUP";

/// Wildcard fragment.
pub const WILDCARD: &str = "*";

/// A parsed test identifier.
///
/// `suite` and `case` are `None` when the identifier carries fewer than
/// three fragments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestId {
    pub module: String,
    pub suite: Option<String>,
    pub case: Option<String>,
}

/// Row classification used to order and interpret trace entries.
///
/// The ordering `GlobalSetup < SuiteSetup < Case` within a module is what
/// the selection pass relies on: setup rows must be visited before the test
/// cases they fan out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RowKind {
    GlobalSetup,
    SuiteSetup,
    Case,
}

impl TestId {
    pub fn new(
        module: impl Into<String>,
        suite: Option<String>,
        case: Option<String>,
    ) -> Self {
        let mut id = TestId {
            module: module.into(),
            suite,
            case,
        };
        // An empty fragment means the fragment is absent.
        if id.suite.as_deref() == Some("") {
            id.suite = None;
        }
        if id.case.as_deref() == Some("") {
            id.case = None;
        }
        id
    }

    /// Parse a `module!!!suite!!!case` string; extra fragments are ignored.
    pub fn parse(raw: &str) -> Self {
        let mut fragments = raw.split(TEST_ID_SEP);
        let module = fragments.next().unwrap_or_default().to_string();
        let suite = fragments.next().map(str::to_string);
        let case = fragments.next().map(str::to_string);
        TestId::new(module, suite, case)
    }

    /// Whether this row is a concrete, runnable test case (counted in the
    /// `all` universe during selection).
    pub fn is_concrete_case(&self) -> bool {
        match (&self.suite, &self.case) {
            (Some(suite), Some(case)) => {
                suite != GLOBAL_TEST_SETUP && suite != WILDCARD && case != WILDCARD
            }
            _ => false,
        }
    }

    /// Java-style identifiers carry the whole test name in the suite
    /// fragment: `*!!!<name>!!!*`.
    pub fn is_java_style(&self) -> bool {
        self.module == WILDCARD && self.case.as_deref() == Some(WILDCARD)
    }

    pub fn row_kind(&self) -> RowKind {
        if self.suite.as_deref() == Some(GLOBAL_TEST_SETUP) {
            RowKind::GlobalSetup
        } else if self.case.as_deref() == Some(WILDCARD) {
            RowKind::SuiteSetup
        } else {
            RowKind::Case
        }
    }

    /// Key for the selection pass: within a module, the global-setup row
    /// precedes every suite, and within a suite the setup row precedes its
    /// cases. The fan-out tracking in the selection pass requires exactly
    /// this interleaving.
    pub fn selection_order_key(&self) -> (&str, u8, &str, u8, &str) {
        let global = u8::from(self.row_kind() != RowKind::GlobalSetup);
        let setup = u8::from(self.case.as_deref() != Some(WILDCARD));
        (
            &self.module,
            global,
            self.suite.as_deref().unwrap_or(""),
            setup,
            self.case.as_deref().unwrap_or(""),
        )
    }

    /// The `module!!!suite` prefix used to match suite-setup fan-out.
    pub fn suite_key(&self) -> String {
        format!(
            "{}{}{}",
            self.module,
            TEST_ID_SEP,
            self.suite.as_deref().unwrap_or("")
        )
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.module)?;
        if let Some(suite) = &self.suite {
            write!(f, "{TEST_ID_SEP}{suite}")?;
            if let Some(case) = &self.case {
                write!(f, "{TEST_ID_SEP}{case}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "test_id_tests.rs"]
mod tests;

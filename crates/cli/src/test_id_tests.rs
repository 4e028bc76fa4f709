#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;

#[test]
fn parse_full_identifier() {
    let id = TestId::parse("module!!!Suite!!!Case");
    assert_eq!(id.module, "module");
    assert_eq!(id.suite.as_deref(), Some("Suite"));
    assert_eq!(id.case.as_deref(), Some("Case"));
}

#[test]
fn parse_drops_missing_fragments_from_the_right() {
    let id = TestId::parse("module!!!Suite");
    assert_eq!(id.suite.as_deref(), Some("Suite"));
    assert!(id.case.is_none());

    let id = TestId::parse("module");
    assert!(id.suite.is_none());
    assert!(id.case.is_none());
}

#[test]
fn empty_fragments_are_absent() {
    let id = TestId::new("m", Some(String::new()), Some(String::new()));
    assert!(id.suite.is_none());
    assert!(id.case.is_none());
    assert_eq!(id.to_string(), "m");
}

#[test]
fn display_round_trips() {
    let id = TestId::parse("m!!!s!!!c");
    assert_eq!(id.to_string(), "m!!!s!!!c");
    assert_eq!(TestId::parse(&id.to_string()), id);
}

#[test]
fn concrete_case_excludes_setup_and_wildcards() {
    assert!(TestId::parse("m!!!s!!!c").is_concrete_case());
    assert!(!TestId::parse("m!!!s!!!*").is_concrete_case());
    assert!(!TestId::parse("m!!!GLOBAL_TEST_SETUP!!!*").is_concrete_case());
    assert!(!TestId::parse("m!!!*!!!c").is_concrete_case());
    assert!(!TestId::parse("m!!!s").is_concrete_case());
}

#[test]
fn java_style_detection() {
    assert!(TestId::parse("*!!!edu.tum.sse.FooTest!!!*").is_java_style());
    assert!(!TestId::parse("m!!!s!!!*").is_java_style());
}

#[test]
fn row_kinds() {
    assert_eq!(
        TestId::parse("m!!!GLOBAL_TEST_SETUP!!!*").row_kind(),
        RowKind::GlobalSetup
    );
    assert_eq!(TestId::parse("m!!!s!!!*").row_kind(), RowKind::SuiteSetup);
    assert_eq!(TestId::parse("m!!!s!!!c").row_kind(), RowKind::Case);
}

#[test]
fn selection_order_interleaves_setup_rows() {
    // Global setup first, then per suite: setup row immediately before
    // that suite's cases.
    let mut rows = vec![
        TestId::parse("m!!!B!!!case1"),
        TestId::parse("m!!!B!!!*"),
        TestId::parse("m!!!A!!!case1"),
        TestId::parse("m!!!GLOBAL_TEST_SETUP!!!*"),
        TestId::parse("m!!!A!!!*"),
    ];
    rows.sort_by(|a, b| a.selection_order_key().cmp(&b.selection_order_key()));
    let order: Vec<String> = rows.iter().map(ToString::to_string).collect();
    assert_eq!(
        order,
        vec![
            "m!!!GLOBAL_TEST_SETUP!!!*",
            "m!!!A!!!*",
            "m!!!A!!!case1",
            "m!!!B!!!*",
            "m!!!B!!!case1",
        ]
    );
}

#[test]
fn suite_key_joins_module_and_suite() {
    assert_eq!(TestId::parse("m!!!s!!!c").suite_key(), "m!!!s");
}

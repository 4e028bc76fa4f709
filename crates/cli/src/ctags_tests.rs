#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use std::path::Path;

fn parse(lines: &str) -> Vec<CtagsRecord> {
    CtagsExtractor::parse_records(lines)
}

#[test]
fn parse_records_skips_malformed_lines() {
    let raw = concat!(
        r#"{"_type": "tag", "name": "foo", "path": "a.cpp", "line": 1, "kind": "function"}"#,
        "\n",
        "not json\n",
    );
    let records = parse(raw);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "foo");
}

#[test]
fn function_record_builds_definition_with_raw_signature() {
    let raw = r#"{"_type":"tag","name":"Max","path":"a.cpp","line":3,"end":5,"kind":"function","signature":"(int a, int b)"}"#;
    let functions = functions_from_records(&parse(raw), Path::new("a.cpp"));
    assert_eq!(functions.len(), 1);
    assert_eq!(functions[0].signature, "Max(int,int)");
    assert_eq!(functions[0].start_line, 3);
    assert_eq!(functions[0].end_line, 5);
}

#[test]
fn prototype_records_are_prefixed() {
    let raw = r#"{"_type":"tag","name":"Max","path":"a.cpp","line":1,"kind":"prototype","signature":"(int a, int b)"}"#;
    let functions = functions_from_records(&parse(raw), Path::new("a.cpp"));
    assert_eq!(functions[0].signature, "__proto__Max(int,int)");
    assert!(functions[0].is_prototype());
}

#[test]
fn anonymous_namespace_collapses_to_anon() {
    let raw = r#"{"_type":"tag","name":"helper","path":"a.cpp","line":2,"kind":"function","scope":"__anon1234::detail","scopeKind":"namespace","signature":"()"}"#;
    let functions = functions_from_records(&parse(raw), Path::new("a.cpp"));
    assert_eq!(functions[0].namespace.as_deref(), Some("anon::detail"));
}

#[test]
fn class_scope_splits_namespace_and_class() {
    let raw = r#"{"_type":"tag","name":"run","path":"a.cpp","line":4,"kind":"function","scope":"ns::Widget","scopeKind":"class","signature":"()"}"#;
    let functions = functions_from_records(&parse(raw), Path::new("a.cpp"));
    assert_eq!(functions[0].namespace.as_deref(), Some("ns"));
    assert_eq!(functions[0].class_name.as_deref(), Some("Widget"));
}

#[test]
fn free_standing_lambda_becomes_lambda() {
    let raw = r#"{"_type":"tag","name":"__anon99","path":"a.cpp","line":7,"kind":"function","signature":"()"}"#;
    let functions = functions_from_records(&parse(raw), Path::new("a.cpp"));
    assert_eq!(functions[0].signature, "lambda()");
}

#[test]
fn lambda_inside_function_scope_is_dropped() {
    let raw = r#"{"_type":"tag","name":"__anon99","path":"a.cpp","line":7,"kind":"function","scope":"outer","scopeKind":"function","signature":"()"}"#;
    let functions = functions_from_records(&parse(raw), Path::new("a.cpp"));
    assert!(functions.is_empty());
}

#[test]
fn template_and_specialization_suffixes_fold_into_signature() {
    let raw = r#"{"_type":"tag","name":"max","path":"a.cpp","line":1,"kind":"function","template":"<T>","signature":"(T a, T b)"}"#;
    let functions = functions_from_records(&parse(raw), Path::new("a.cpp"));
    assert_eq!(functions[0].signature, "max<T>(T,T)");
}

#[test]
fn member_function_upgrades_to_full_templated_class_name() {
    let raw = concat!(
        r#"{"_type":"tag","name":"Box","path":"a.hpp","line":1,"end":10,"kind":"class","template":"<T>"}"#,
        "\n",
        r#"{"_type":"tag","name":"get","path":"a.hpp","line":4,"end":6,"kind":"function","scope":"Box","scopeKind":"class","signature":"()"}"#,
        "\n",
        r#"{"_type":"tag","name":"outside","path":"a.hpp","line":20,"end":22,"kind":"function","scope":"Box","scopeKind":"class","signature":"()"}"#,
    );
    let functions = functions_from_records(&parse(raw), Path::new("a.hpp"));
    assert_eq!(functions[0].class_name.as_deref(), Some("Box<T>"));
    // Out-of-line member outside the type body keeps the simple name.
    assert_eq!(functions[1].class_name.as_deref(), Some("Box"));
}

#[test]
fn non_functional_kinds_are_collected() {
    let raw = concat!(
        r#"{"_type":"tag","name":"MY_MACRO","path":"a.hpp","line":1,"kind":"macro"}"#,
        "\n",
        r#"{"_type":"tag","name":"counter","path":"a.hpp","line":2,"kind":"variable"}"#,
        "\n",
        r#"{"_type":"tag","name":"Color","path":"a.hpp","line":3,"kind":"enumerator"}"#,
        "\n",
        r#"{"_type":"tag","name":"plain","path":"a.hpp","line":4,"kind":"function","signature":"()"}"#,
    );
    let entities = entities_from_records(&parse(raw), Path::new("a.hpp"));
    let names: Vec<&str> = entities.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["MY_MACRO", "counter", "Color"]);
    assert_eq!(entities[0].properties.as_deref(), Some("macro"));
}

#[test]
fn constexpr_functions_count_as_non_functional() {
    let raw = r#"{"_type":"tag","name":"answer","path":"a.hpp","line":1,"kind":"function","properties":"constexpr","signature":"()"}"#;
    let entities = entities_from_records(&parse(raw), Path::new("a.hpp"));
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].properties.as_deref(), Some("functionconstexpr"));
}

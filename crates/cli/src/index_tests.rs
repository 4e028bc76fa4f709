#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use crate::test_utils::{FakeExtractor, FileDefs, func_def};

fn sample_index() -> FunctionIndex {
    let extractor = FakeExtractor::new();
    extractor.register_path(
        "/repo/src/a.cpp",
        FileDefs {
            functions: vec![func_def("Max(int,int)", 1, 3), func_def("Other()", 5, 8)],
            ..FileDefs::default()
        },
    );
    extractor.register_path(
        "/repo/gen/b.cpp",
        FileDefs {
            functions: vec![{
                let mut f = func_def("render()", 1, 4);
                f.namespace = Some("ui".to_string());
                f.class_name = Some("View".to_string());
                f
            }],
            ..FileDefs::default()
        },
    );
    let mut index = FunctionIndex::new(Some(PathBuf::from("/repo")));
    index
        .add_functions(&extractor, Path::new("/repo/src/a.cpp"))
        .unwrap();
    index
        .add_functions(&extractor, Path::new("/repo/gen/b.cpp"))
        .unwrap();
    index
}

#[test]
fn identifiers_are_dense_and_bijective() {
    let index = sample_index();
    assert_eq!(index.len(), 3);
    assert_eq!(index.max_id(), 3);
    for id in 0..index.max_id() {
        assert_eq!(index.get_by_id(id).unwrap().identifier, id);
    }
    assert!(index.get_by_id(3).is_none());
}

#[test]
fn file_keys_are_repo_relative_inside_the_root() {
    let index = sample_index();
    assert_eq!(index.file_key(Path::new("/repo/src/a.cpp")), "src/a.cpp");
    assert_eq!(index.file_key(Path::new("/elsewhere/x.cpp")), "/elsewhere/x.cpp");
}

#[test]
fn adding_the_same_file_twice_is_forbidden() {
    let mut index = sample_index();
    let extractor = FakeExtractor::new();
    let err = index
        .add_functions(&extractor, Path::new("/repo/src/a.cpp"))
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn find_functions_by_line_requires_enclosing_range() {
    let index = sample_index();
    let hits = index
        .find_functions_by_line(Path::new("/repo/src/a.cpp"), 2)
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].signature, "Max(int,int)");

    let misses = index
        .find_functions_by_line(Path::new("/repo/src/a.cpp"), 4)
        .unwrap();
    assert!(misses.is_empty());

    assert!(index.find_functions_by_line(Path::new("/repo/unknown.cpp"), 1).is_none());
}

#[test]
fn find_or_add_reports_uncovered_lines() {
    let extractor = FakeExtractor::new();
    extractor.register_path(
        "/repo/src/a.cpp",
        FileDefs {
            functions: vec![func_def("Max(int,int)", 1, 3)],
            ..FileDefs::default()
        },
    );
    let mut index = FunctionIndex::new(Some(PathBuf::from("/repo")));
    let err = index
        .find_or_add_functions(&extractor, Path::new("/repo/src/a.cpp"), 99)
        .unwrap_err();
    assert!(matches!(err, Error::UncoveredLine { line: 99, .. }));

    // The file itself is loaded and further lookups succeed.
    let hits = index
        .find_or_add_functions(&extractor, Path::new("/repo/src/a.cpp"), 2)
        .unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn find_functions_by_exact_signature_uses_the_cache() {
    let index = sample_index();
    let hits = index.find_functions(&FunctionQuery {
        signature: Some("Max(int,int)"),
        ..FunctionQuery::default()
    });
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].identifier, 0);

    let misses = index.find_functions(&FunctionQuery {
        signature: Some("Unknown()"),
        ..FunctionQuery::default()
    });
    assert!(misses.is_empty());
}

#[test]
fn trailing_wildcard_matches_by_substring() {
    let index = sample_index();
    let hits = index.find_functions(&FunctionQuery {
        signature: Some("Max*"),
        ..FunctionQuery::default()
    });
    assert_eq!(hits.len(), 1);
}

#[test]
fn prototype_prefix_is_stripped_before_matching() {
    let index = sample_index();
    let hits = index.find_functions(&FunctionQuery {
        signature: Some("__proto__Max(int,int)"),
        ..FunctionQuery::default()
    });
    assert_eq!(hits.len(), 1);
}

#[test]
fn namespace_filter_conventions() {
    let index = sample_index();
    // "" means no namespace.
    let hits = index.find_functions(&FunctionQuery {
        namespace: Some(""),
        ..FunctionQuery::default()
    });
    assert_eq!(hits.len(), 2);
    // "*" means any non-empty namespace.
    let hits = index.find_functions(&FunctionQuery {
        namespace: Some("*"),
        ..FunctionQuery::default()
    });
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].signature, "render()");
    // Exact match otherwise.
    let hits = index.find_functions(&FunctionQuery {
        namespace: Some("ui"),
        class_name: Some("View"),
        ..FunctionQuery::default()
    });
    assert_eq!(hits.len(), 1);
}

#[test]
fn file_scoped_query_restricts_candidates() {
    let index = sample_index();
    let hits = index.find_functions(&FunctionQuery {
        file: Some(Path::new("/repo/src/a.cpp")),
        signature: Some("render()"),
        ..FunctionQuery::default()
    });
    assert!(hits.is_empty());

    let hits = index.find_functions(&FunctionQuery {
        file: Some(Path::new("/repo/unindexed.cpp")),
        ..FunctionQuery::default()
    });
    assert!(hits.is_empty());
}

#[test]
fn file_regex_search_is_case_insensitive_and_anchored() {
    let index = sample_index();
    let hits = index.find_functions_by_file_regex("GEN/.*").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].signature, "render()");
    // `search`-style mid-string matches are not accepted.
    let hits = index.find_functions_by_file_regex("b\\.cpp").unwrap();
    assert!(hits.is_empty());
}

#[test]
fn csv_round_trip_preserves_rows() {
    let index = sample_index();
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join(FUNCTION_LOOKUP_FILE);
    index.to_csv(&csv_path).unwrap();

    let reloaded = FunctionIndex::from_csv(&csv_path, None).unwrap();
    assert_eq!(reloaded.len(), index.len());
    for id in 0..index.max_id() {
        assert_eq!(reloaded.get_by_id(id), index.get_by_id(id));
    }

    // Byte-identical modulo row order.
    let rewritten = dir.path().join("again.csv");
    reloaded.to_csv(&rewritten).unwrap();
    let mut original: Vec<String> = std::fs::read_to_string(&csv_path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    let mut round_tripped: Vec<String> = std::fs::read_to_string(&rewritten)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    original.sort();
    round_tripped.sort();
    assert_eq!(original, round_tripped);
}

#[test]
fn csv_row_with_none_fields_round_trips() {
    let func = CoveredFunction {
        identifier: 7,
        file: "src/x.cpp".to_string(),
        signature: "f()".to_string(),
        start: 1,
        end: 2,
        properties: None,
        namespace: Some("ns".to_string()),
        class_name: None,
    };
    let row = func.to_csv_row();
    assert_eq!(row, "7;src/x.cpp;f();1;2;None;ns;None");
    assert_eq!(CoveredFunction::from_csv_row(&row).unwrap(), func);
}

#[test]
fn binary_round_trip_is_structurally_equal() {
    let index = sample_index();
    let dir = tempfile::tempdir().unwrap();
    let bin_path = dir.path().join(BINARY_FUNCTION_LOOKUP_FILE);
    index.to_binary(&bin_path).unwrap();

    let reloaded = FunctionIndex::from_binary(&bin_path).unwrap();
    assert_eq!(reloaded.len(), index.len());
    for id in 0..index.max_id() {
        assert_eq!(reloaded.get_by_id(id), index.get_by_id(id));
    }
    // The repo-root binding is dropped: absolute paths stay verbatim.
    assert_eq!(
        reloaded.file_key(Path::new("/repo/src/a.cpp")),
        "/repo/src/a.cpp"
    );
}

#[test]
fn full_name_concatenates_all_scope_fragments() {
    let index = sample_index();
    let func = index.get_by_id(2).unwrap();
    assert_eq!(func.full_name(), "gen/b.cpp::ui::View::render()");
    let plain = index.get_by_id(0).unwrap();
    assert_eq!(plain.full_name(), "src/a.cpp::::::Max(int,int)");
}

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use std::collections::HashSet;

use crate::rts::{ChangePolicy, ChangePolicyConfig};
use crate::test_id::TestId;
use crate::test_utils::{FakeExtractor, FileDefs, TestRepo, func_def, non_func_def};
use crate::traces::FunctionTraces;

fn index_from_rows(rows: &str) -> FunctionIndex {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("function-lookup.csv");
    std::fs::write(&csv, rows).unwrap();
    FunctionIndex::from_csv(&csv, None).unwrap()
}

fn traces_for(deps: &[(&str, u32)]) -> FunctionTraces {
    let mut traces = FunctionTraces::new();
    for (test, function_id) in deps {
        traces.add_dependency(TestId::parse(test), *function_id);
    }
    traces
}

fn default_policy() -> ChangePolicy {
    ChangePolicy::new(ChangePolicyConfig::default()).unwrap()
}

fn select(
    repo: &TestRepo,
    index: &FunctionIndex,
    traces: &FunctionTraces,
    extractor: &FakeExtractor,
    options: FunctionLevelOptions,
    from: &str,
    to: &str,
) -> TestSelection {
    let git = GitClient::open(repo.root()).unwrap();
    let rts =
        FunctionLevelRts::new(&git, index, traces, extractor, default_policy(), options).unwrap();
    rts.select_tests(from, to).unwrap()
}

#[test]
fn modified_function_body_selects_its_tests() {
    let repo = TestRepo::new();
    let base = repo.commit_file("src/max.cpp", "int Max(int a,int b){ return a>b?a:b; }\n");
    let head = repo.commit_file(
        "src/max.cpp",
        "int Max(int a,int b){ int c=0; return a>b?a:b; }\n",
    );

    let extractor = FakeExtractor::new();
    extractor.register_marker(
        "int c=0",
        FileDefs {
            functions: vec![func_def("Max(int,int)", 1, 1)],
            ..FileDefs::default()
        },
    );
    extractor.register_marker(
        "Max",
        FileDefs {
            functions: vec![func_def("Max(int,int)", 1, 1)],
            ..FileDefs::default()
        },
    );

    let index = index_from_rows(
        "0;src/max.cpp;Max(int,int);1;1;None;None;None\n1;src/other.cpp;Other();1;1;None;None;None\n",
    );
    let traces = traces_for(&[("M!!!S!!!Max", 0), ("M!!!S!!!Other", 1)]);

    let selection = select(
        &repo,
        &index,
        &traces,
        &extractor,
        FunctionLevelOptions::default(),
        &base,
        &head,
    );
    assert_eq!(selection.included, HashSet::from(["M!!!S!!!Max".to_string()]));
    assert_eq!(selection.excluded, HashSet::from(["M!!!S!!!Other".to_string()]));
    assert_eq!(
        selection.causes["M!!!S!!!Max"],
        vec!["src/max.cpp::::::Max(int,int)".to_string()]
    );
}

#[test]
fn suite_setup_change_fans_out_to_all_cases() {
    let repo = TestRepo::new();
    let base = repo.commit_file(
        "src/foo_suite.cpp",
        "void FooSuite::SetUpTestSuite() { prepare(1); }\n",
    );
    let head = repo.commit_file(
        "src/foo_suite.cpp",
        "void FooSuite::SetUpTestSuite() { prepare(2); }\n",
    );

    let mut setup = func_def("SetUpTestSuite()", 1, 1);
    setup.class_name = Some("FooSuite".to_string());
    let extractor = FakeExtractor::new();
    extractor.register_marker(
        "prepare(2)",
        FileDefs {
            functions: vec![setup.clone()],
            ..FileDefs::default()
        },
    );
    extractor.register_marker(
        "prepare(1)",
        FileDefs {
            functions: vec![setup],
            ..FileDefs::default()
        },
    );

    let index = index_from_rows(
        "0;src/foo_suite.cpp;SetUpTestSuite();1;1;None;None;FooSuite\n1;src/foo.cpp;helper();1;1;None;None;None\n",
    );
    let traces = traces_for(&[
        ("M!!!FooSuite!!!*", 0),
        ("M!!!FooSuite!!!a", 1),
        ("M!!!FooSuite!!!b", 1),
        ("M!!!FooSuite!!!c", 1),
    ]);

    let selection = select(
        &repo,
        &index,
        &traces,
        &extractor,
        FunctionLevelOptions::default(),
        &base,
        &head,
    );
    assert_eq!(
        selection.included,
        HashSet::from([
            "M!!!FooSuite!!!a".to_string(),
            "M!!!FooSuite!!!b".to_string(),
            "M!!!FooSuite!!!c".to_string(),
        ])
    );
    // The suite row names the setup function; fanned-out cases carry empty
    // cause lists.
    assert_eq!(
        selection.causes["M!!!FooSuite!!!*"],
        vec!["src/foo_suite.cpp::::FooSuite::SetUpTestSuite()".to_string()]
    );
    assert!(selection.causes["M!!!FooSuite!!!a"].is_empty());
}

#[test]
fn new_overload_selects_tests_of_the_existing_function() {
    let repo = TestRepo::new();
    let base = repo.commit_file("src/max.cpp", "int Max(int a,int b){ return a>b?a:b; }\n");
    let head = repo.commit_file(
        "src/max.cpp",
        "int Max(int a,int b){ return a>b?a:b; }\nshort Max(short a,short b){ return a>b?a:b; }\n",
    );

    let extractor = FakeExtractor::new();
    extractor.register_marker(
        "short",
        FileDefs {
            functions: vec![
                func_def("Max(int,int)", 1, 1),
                func_def("Max(short,short)", 2, 2),
            ],
            ..FileDefs::default()
        },
    );
    extractor.register_marker(
        "Max",
        FileDefs {
            functions: vec![func_def("Max(int,int)", 1, 1)],
            ..FileDefs::default()
        },
    );

    let index = index_from_rows("0;src/max.cpp;Max(int,int);1;1;None;None;None\n");
    let traces = traces_for(&[("M!!!S!!!Max", 0)]);

    let options = FunctionLevelOptions {
        overload_analysis: true,
        ..FunctionLevelOptions::default()
    };
    let selection = select(&repo, &index, &traces, &extractor, options, &base, &head);
    assert_eq!(selection.included, HashSet::from(["M!!!S!!!Max".to_string()]));
    assert!(selection.causes["M!!!S!!!Max"][0].contains("Max(int,int)"));
}

#[test]
fn new_virtual_override_matches_any_class() {
    let repo = TestRepo::new();
    let base = repo.commit_file("src/shapes.cpp", "struct D : B {};\n");
    let head = repo.commit_file(
        "src/shapes.cpp",
        "struct D : B { void render() override { draw(); } };\n",
    );

    let mut overriding = func_def("render()", 1, 1);
    overriding.class_name = Some("D".to_string());
    overriding.properties = Some("override".to_string());
    let extractor = FakeExtractor::new();
    extractor.register_marker(
        "render",
        FileDefs {
            functions: vec![overriding],
            ..FileDefs::default()
        },
    );
    extractor.register_marker("struct D", FileDefs::default());

    let index = index_from_rows("0;src/base.cpp;render();1;1;virtual;None;B\n");
    let traces = traces_for(&[("M!!!S!!!render", 0)]);

    let options = FunctionLevelOptions {
        virtual_analysis: true,
        ..FunctionLevelOptions::default()
    };
    let selection = select(&repo, &index, &traces, &extractor, options, &base, &head);
    assert_eq!(
        selection.included,
        HashSet::from(["M!!!S!!!render".to_string()])
    );
}

#[test]
fn deleted_file_still_maps_through_the_index() {
    let repo = TestRepo::new();
    repo.commit_file("src/gone.cpp", "int gone() { return 0; }\n");
    let base = repo.commit_file("src/keep.cpp", "int keep() { return 1; }\n");
    let head = repo.delete_file("src/gone.cpp");

    let extractor = FakeExtractor::new();
    extractor.register_marker(
        "gone",
        FileDefs {
            functions: vec![func_def("gone()", 1, 1)],
            ..FileDefs::default()
        },
    );

    let index = index_from_rows("0;src/gone.cpp;gone();1;1;None;None;None\n");
    let traces = traces_for(&[("M!!!S!!!tg", 0)]);

    let selection = select(
        &repo,
        &index,
        &traces,
        &extractor,
        FunctionLevelOptions::default(),
        &base,
        &head,
    );
    assert_eq!(selection.included, HashSet::from(["M!!!S!!!tg".to_string()]));
}

#[test]
fn added_file_functions_resolve_globally() {
    let repo = TestRepo::new();
    let base = repo.commit_file("src/a.cpp", "int a() { return 0; }\n");
    let head = repo.commit_file("src/fresh.cpp", "int shared() { return 1; }\n");

    let extractor = FakeExtractor::new();
    extractor.register_marker(
        "shared",
        FileDefs {
            functions: vec![func_def("shared()", 1, 1)],
            ..FileDefs::default()
        },
    );

    // A function with the same signature exists in another file; the
    // global query resolves it.
    let index = index_from_rows("0;src/old_home.cpp;shared();1;1;None;None;None\n");
    let traces = traces_for(&[("M!!!S!!!ts", 0)]);

    let selection = select(
        &repo,
        &index,
        &traces,
        &extractor,
        FunctionLevelOptions::default(),
        &base,
        &head,
    );
    assert_eq!(selection.included, HashSet::from(["M!!!S!!!ts".to_string()]));
}

#[test]
fn non_functional_retest_all_on_modified_macro() {
    let repo = TestRepo::new();
    let base = repo.commit_file("src/test.h", "#define LIMIT 10\n");
    let head = repo.commit_file("src/test.h", "#define LIMIT 20\n");

    let extractor = FakeExtractor::new();
    extractor.register_marker(
        "20",
        FileDefs {
            non_functional: vec![non_func_def("LIMIT", 1, 1, "macro")],
            ..FileDefs::default()
        },
    );
    extractor.register_marker(
        "LIMIT",
        FileDefs {
            non_functional: vec![non_func_def("LIMIT", 1, 1, "macro")],
            ..FileDefs::default()
        },
    );

    let index = index_from_rows("0;src/a.cpp;a();1;1;None;None;None\n");
    let traces = traces_for(&[("M!!!S!!!ta", 0)]);

    let options = FunctionLevelOptions {
        non_functional_retest_all: true,
        ..FunctionLevelOptions::default()
    };
    let selection = select(&repo, &index, &traces, &extractor, options, &base, &head);
    assert!(selection.is_retest_all());
    assert_eq!(
        selection.causes["*"],
        vec!["Modify non-functional src/test.h".to_string()]
    );
}

#[test]
fn non_functional_analysis_follows_call_sites() {
    let repo = TestRepo::new();
    repo.commit_file("src/user.cpp", "int f() {\n  return LIMIT;\n}\n");
    let base = repo.commit_file("src/inc/limits.h", "#define LIMIT 10\n");
    let head = repo.commit_file("src/inc/limits.h", "#define LIMIT 20\n");

    let extractor = FakeExtractor::new();
    extractor.register_marker(
        "20",
        FileDefs {
            non_functional: vec![non_func_def("LIMIT", 1, 1, "macro")],
            ..FileDefs::default()
        },
    );
    extractor.register_marker(
        "LIMIT",
        FileDefs {
            non_functional: vec![non_func_def("LIMIT", 1, 1, "macro")],
            ..FileDefs::default()
        },
    );

    let index = index_from_rows("0;src/user.cpp;f();1;3;None;None;None\n");
    let traces = traces_for(&[("M!!!S!!!tf", 0), ("M!!!S!!!tu", 99)]);

    let options = FunctionLevelOptions {
        non_functional_analysis: true,
        non_functional_analysis_depth: 2,
        ..FunctionLevelOptions::default()
    };
    let selection = select(&repo, &index, &traces, &extractor, options, &base, &head);
    assert_eq!(selection.included, HashSet::from(["M!!!S!!!tf".to_string()]));
    assert_eq!(selection.excluded, HashSet::from(["M!!!S!!!tu".to_string()]));
}

#[test]
fn file_level_regex_escalates_non_functional_changes() {
    let repo = TestRepo::new();
    let base = repo.commit_file(
        "src/config.h",
        "#define A 1\nint helper() { return A; }\n",
    );
    let head = repo.commit_file(
        "src/config.h",
        "#define A 2\nint helper() { return A; }\n",
    );

    let extractor = FakeExtractor::new();
    extractor.register_marker(
        "#define A 2",
        FileDefs {
            functions: vec![func_def("helper()", 2, 2)],
            non_functional: vec![non_func_def("A", 1, 1, "macro")],
        },
    );
    extractor.register_marker(
        "#define A 1",
        FileDefs {
            functions: vec![func_def("helper()", 2, 2)],
            non_functional: vec![non_func_def("A", 1, 1, "macro")],
        },
    );

    let index = index_from_rows(
        "0;src/config.h;helper();2;2;None;None;None\n1;src/other.cpp;other();1;1;None;None;None\n",
    );
    let traces = traces_for(&[("M!!!S!!!th", 0), ("M!!!S!!!to", 1)]);

    let options = FunctionLevelOptions {
        file_level_regex: Some("src/config.*".to_string()),
        ..FunctionLevelOptions::default()
    };
    let selection = select(&repo, &index, &traces, &extractor, options, &base, &head);
    assert_eq!(selection.included, HashSet::from(["M!!!S!!!th".to_string()]));
    assert_eq!(selection.excluded, HashSet::from(["M!!!S!!!to".to_string()]));
}

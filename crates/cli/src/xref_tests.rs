#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use std::fs;

#[test]
fn walk_backend_finds_token_bounded_occurrences() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(
        src.join("user.cpp"),
        "int a = LIMIT;\nint b = LIMIT_MAX;\nint c = (LIMIT);\n",
    )
    .unwrap();
    fs::write(src.join("notes.md"), "LIMIT appears here too\n").unwrap();

    let searcher = CrossRefSearcher::new(dir.path(), SearchBackend::LiteralWalk);
    let mut sites = searcher.call_sites("LIMIT", None).unwrap();
    sites.sort_by_key(|s| s.line);
    // Line 2 is LIMIT_MAX: not token-bounded. The markdown file is not a
    // C file and is never scanned.
    assert_eq!(sites.len(), 2);
    assert_eq!(sites[0].line, 1);
    assert_eq!(sites[1].line, 3);
}

#[test]
fn walk_backend_relativizes_paths() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("a.cpp"), "call(FOO);\n").unwrap();

    let searcher = CrossRefSearcher::new(dir.path(), SearchBackend::LiteralWalk);
    let sites = searcher.call_sites("FOO", Some(dir.path())).unwrap();
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].path, Path::new("src/a.cpp"));
}

#[test]
fn symbols_with_regex_metacharacters_are_searched_literally() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.cpp"), "use(op++);\n").unwrap();
    let searcher = CrossRefSearcher::new(dir.path(), SearchBackend::LiteralWalk);
    let sites = searcher.call_sites("op++", None).unwrap();
    assert_eq!(sites.len(), 1);
}

#[test]
fn token_boundary_rejects_identifier_continuations() {
    let re = token_boundary_regex("FOO").unwrap();
    assert!(re.is_match(" FOO;"));
    assert!(re.is_match("(FOO)"));
    assert!(!re.is_match("aFOO;"));
    assert!(!re.is_match(" FOOBAR "));
}

#[test]
fn split_grep_line_parses_unix_output() {
    let (path, line, matched) = split_grep_line("src/a.cpp:12: use(FOO);").unwrap();
    assert_eq!(path, PathBuf::from("src/a.cpp"));
    assert_eq!(line, 12);
    assert_eq!(matched, " use(FOO);");
}

#[test]
fn split_grep_line_parses_windows_drive_paths() {
    let (path, line, matched) = split_grep_line(r"C:\src\a.cpp:7:use(FOO);").unwrap();
    assert_eq!(path, PathBuf::from(r"C:\src\a.cpp"));
    assert_eq!(line, 7);
    assert_eq!(matched, "use(FOO);");
}

#[test]
fn split_grep_line_rejects_garbage() {
    assert!(split_grep_line("no separators here").is_none());
    assert!(split_grep_line("path:not-a-number:text").is_none());
}

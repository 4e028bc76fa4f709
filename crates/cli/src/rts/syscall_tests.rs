#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use std::collections::HashSet;

use crate::rts::ChangePolicyConfig;
use crate::test_id::TestId;
use crate::test_utils::TestRepo;

fn traces_for(deps: &[(&str, &str)]) -> FileTraces {
    let mut traces = FileTraces::new();
    for (test, file) in deps {
        traces.add_dependency(TestId::parse(test), (*file).to_string());
    }
    traces
}

fn default_policy() -> ChangePolicy {
    ChangePolicy::new(ChangePolicyConfig::default()).unwrap()
}

#[test]
fn modified_files_select_by_lowercased_basename() {
    let repo = TestRepo::new();
    let base = repo.commit_file("data/Config.XML", "<a/>\n");
    let head = repo.commit_file("data/Config.XML", "<b/>\n");

    let traces = traces_for(&[("M!!!S!!!tc", "config.xml"), ("M!!!S!!!td", "other.dat")]);
    let git = GitClient::open(repo.root()).unwrap();
    let rts = SyscallFileLevelRts::new(&git, &traces, default_policy());
    let selection = rts.select_tests(&base, &head).unwrap();
    assert_eq!(selection.included, HashSet::from(["M!!!S!!!tc".to_string()]));
    assert_eq!(selection.excluded, HashSet::from(["M!!!S!!!td".to_string()]));
    assert_eq!(selection.causes["M!!!S!!!tc"], vec!["config.xml".to_string()]);
}

#[test]
fn added_files_have_no_effect() {
    let repo = TestRepo::new();
    let base = repo.commit_file("data/a.dat", "1\n");
    let head = repo.commit_file("data/new.dat", "2\n");

    let traces = traces_for(&[("M!!!S!!!t", "new.dat")]);
    let git = GitClient::open(repo.root()).unwrap();
    let rts = SyscallFileLevelRts::new(&git, &traces, default_policy());
    let selection = rts.select_tests(&base, &head).unwrap();
    assert!(selection.included.is_empty());
}

#[test]
fn include_regex_gates_non_c_paths_too() {
    let repo = TestRepo::new();
    let base = repo.commit_file("data/config.xml", "<a/>\n");
    let head = repo.commit_file("data/config.xml", "<b/>\n");

    let traces = traces_for(&[("M!!!S!!!tc", "config.xml")]);
    let git = GitClient::open(repo.root()).unwrap();
    let policy = ChangePolicy::new(ChangePolicyConfig {
        includes_regex: Some("src/.*".to_string()),
        ..ChangePolicyConfig::default()
    })
    .unwrap();
    let rts = SyscallFileLevelRts::new(&git, &traces, policy);
    let selection = rts.select_tests(&base, &head).unwrap();
    assert!(selection.included.is_empty());
}

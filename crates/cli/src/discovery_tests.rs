#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use std::fs;

#[test]
fn finds_dumps_by_extension_in_descending_order() {
    let dir = tempfile::tempdir().unwrap();
    let module_a = dir.path().join("module_a");
    let module_b = dir.path().join("module_b");
    fs::create_dir_all(&module_a).unwrap();
    fs::create_dir_all(&module_b).unwrap();
    fs::write(module_a.join("1.log"), "").unwrap();
    fs::write(module_a.join("2.log"), "").unwrap();
    fs::write(module_b.join("1.log"), "").unwrap();
    fs::write(module_a.join("notes.txt"), "").unwrap();

    let files = find_dump_files(dir.path(), ".log", "dump-lookup.log");
    assert_eq!(files.len(), 3);
    let mut sorted = files.clone();
    sorted.sort();
    sorted.reverse();
    assert_eq!(files, sorted);
}

#[test]
fn lookup_and_suite_dump_files_are_excluded() {
    let dir = tempfile::tempdir().unwrap();
    let module = dir.path().join("m");
    fs::create_dir_all(&module).unwrap();
    fs::write(module.join("1.log"), "").unwrap();
    fs::write(module.join("dump-lookup.log"), "").unwrap();
    fs::write(module.join("coverage.log"), "").unwrap();

    let files = find_dump_files(dir.path(), ".log", "dump-lookup.log");
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("m/1.log"));
}

#[test]
fn gitignore_rules_do_not_hide_dumps() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".gitignore"), "*.log\n").unwrap();
    let module = dir.path().join("m");
    fs::create_dir_all(&module).unwrap();
    fs::write(module.join("1.log"), "").unwrap();

    let files = find_dump_files(dir.path(), ".log", "dump-lookup.log");
    assert_eq!(files.len(), 1);
}

#[test]
fn finds_all_lookup_files() {
    let dir = tempfile::tempdir().unwrap();
    for module in ["a", "b"] {
        let module_dir = dir.path().join(module);
        fs::create_dir_all(&module_dir).unwrap();
        fs::write(module_dir.join("dump-lookup.log"), "").unwrap();
    }
    let lookups = find_lookup_files(dir.path(), "dump-lookup.log");
    assert_eq!(lookups.len(), 2);
}

#[test]
fn sharding_is_balanced_and_complete() {
    let files: Vec<PathBuf> = (0..10).map(|i| PathBuf::from(format!("{i}.log"))).collect();
    let shards = shuffle_and_shard(files.clone(), 3);
    assert_eq!(shards.len(), 3);
    let sizes: Vec<usize> = shards.iter().map(Vec::len).collect();
    assert_eq!(sizes.iter().sum::<usize>(), 10);
    assert!(sizes.iter().all(|&s| (3..=4).contains(&s)));

    let mut flattened: Vec<PathBuf> = shards.into_iter().flatten().collect();
    flattened.sort();
    let mut expected = files;
    expected.sort();
    assert_eq!(flattened, expected);
}

#[test]
fn shards_keep_descending_order_internally() {
    let files: Vec<PathBuf> = (0..12).map(|i| PathBuf::from(format!("{i:02}.log"))).collect();
    for shard in shuffle_and_shard(files, 3) {
        let mut expected = shard.clone();
        expected.sort();
        expected.reverse();
        assert_eq!(shard, expected);
    }
}

#[test]
fn shard_assignment_is_deterministic() {
    let files: Vec<PathBuf> = (0..20).map(|i| PathBuf::from(format!("{i}.log"))).collect();
    assert_eq!(
        shuffle_and_shard(files.clone(), 4),
        shuffle_and_shard(files, 4)
    );
}

#[test]
fn single_process_keeps_the_original_order() {
    let files: Vec<PathBuf> = (0..5).map(|i| PathBuf::from(format!("{i}.log"))).collect();
    let shards = shuffle_and_shard(files.clone(), 1);
    assert_eq!(shards, vec![files]);
}

#[test]
fn more_shards_than_files_drops_empty_shards() {
    let files = vec![PathBuf::from("a.log"), PathBuf::from("b.log")];
    let shards = shuffle_and_shard(files, 5);
    assert_eq!(shards.len(), 2);
    assert!(shards.iter().all(|s| s.len() == 1));
}

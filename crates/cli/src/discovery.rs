// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Coverage dump discovery and shard assignment.
//!
//! Dumps are found by extension under the input root, excluding the
//! dump-lookup files and the whole-suite `coverage<ext>` dump emitted after
//! suite execution. The result is ordered descending by path so the
//! largest dumps (conventionally numbered last) start earliest, and can be
//! split into balanced shards via a fixed-seed shuffle.

use std::path::{Path, PathBuf};

use crossbeam_channel::unbounded;
use ignore::{WalkBuilder, WalkState};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use tracing::debug;

/// Fixed shuffle seed; shard assignment must be reproducible across runs.
const SHARD_SHUFFLE_SEED: u64 = 42;

/// Recursively collect dump files ending in `extension` under `root`,
/// skipping `lookup_file_name` and the aggregate `coverage<extension>`
/// file. Paths come back in descending lexicographic order.
pub fn find_dump_files(root: &Path, extension: &str, lookup_file_name: &str) -> Vec<PathBuf> {
    let excluded_suite_dump = format!("coverage{extension}");
    let (sender, receiver) = unbounded::<PathBuf>();

    let walker = WalkBuilder::new(root)
        // Dump trees are build artifacts; gitignore rules must not hide them.
        .standard_filters(false)
        .build_parallel();
    walker.run(|| {
        let sender = sender.clone();
        let extension = extension.to_string();
        let lookup_file_name = lookup_file_name.to_string();
        let excluded_suite_dump = excluded_suite_dump.clone();
        Box::new(move |entry| {
            let Ok(entry) = entry else {
                return WalkState::Continue;
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                return WalkState::Continue;
            }
            let name = entry.file_name().to_string_lossy();
            if name.ends_with(&extension)
                && name != lookup_file_name
                && name != excluded_suite_dump
            {
                let _ = sender.send(entry.into_path());
            }
            WalkState::Continue
        })
    });
    drop(sender);

    let mut files: Vec<PathBuf> = receiver.into_iter().collect();
    files.sort();
    files.reverse();
    debug!("discovered {} dump files under {}", files.len(), root.display());
    files
}

/// Recursively collect all dump-lookup files under `root`, sorted.
pub fn find_lookup_files(root: &Path, lookup_file_name: &str) -> Vec<PathBuf> {
    let (sender, receiver) = unbounded::<PathBuf>();
    let walker = WalkBuilder::new(root).standard_filters(false).build_parallel();
    walker.run(|| {
        let sender = sender.clone();
        let lookup_file_name = lookup_file_name.to_string();
        Box::new(move |entry| {
            let Ok(entry) = entry else {
                return WalkState::Continue;
            };
            if entry.file_type().is_some_and(|t| t.is_file())
                && entry.file_name().to_string_lossy() == lookup_file_name
            {
                let _ = sender.send(entry.into_path());
            }
            WalkState::Continue
        })
    });
    drop(sender);

    let mut files: Vec<PathBuf> = receiver.into_iter().collect();
    files.sort();
    files
}

/// Split `files` into at most `shards` non-empty chunks after a fixed-seed
/// shuffle. The shuffle spreads the few large dumps across shards instead
/// of letting them pile up in one; within each shard, descending path order
/// is restored so the largest dumps start earliest.
pub fn shuffle_and_shard(mut files: Vec<PathBuf>, shards: usize) -> Vec<Vec<PathBuf>> {
    if shards <= 1 || files.len() <= 1 {
        return vec![files];
    }
    let mut rng = rand::rngs::StdRng::seed_from_u64(SHARD_SHUFFLE_SEED);
    files.shuffle(&mut rng);
    let mut shards = array_split(files, shards);
    for shard in &mut shards {
        shard.sort();
        shard.reverse();
    }
    shards
}

/// Split into `chunks` contiguous pieces whose lengths differ by at most
/// one; empty pieces are dropped.
fn array_split(items: Vec<PathBuf>, chunks: usize) -> Vec<Vec<PathBuf>> {
    let mut result = Vec::with_capacity(chunks);
    let mut remaining = items.len();
    let mut remaining_chunks = chunks;
    let mut iter = items.into_iter();
    while remaining_chunks > 0 {
        let take = remaining.div_ceil(remaining_chunks);
        if take > 0 {
            result.push(iter.by_ref().take(take).collect());
        }
        remaining -= take;
        remaining_chunks -= 1;
    }
    result
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Source-range slicing and normalization for textual equality checks.
//!
//! `raw_code` is the comparison form used by the diff analyzer: a line
//! range with comments and all whitespace removed, so reformatting and
//! comment churn never count as a functional change.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};

/// An inclusive 1-based line range.
pub type LineRange = (u32, u32);

/// Extract one chunk per range from `file` in a single streaming pass.
///
/// Ranges may overlap; each chunk is the concatenation of the lines whose
/// 1-based number falls inside the range. Reading stops once the largest
/// requested line has been passed.
pub fn slice(file: &Path, ranges: &[LineRange]) -> Result<Vec<String>> {
    let mut chunks: Vec<String> = vec![String::new(); ranges.len()];
    let max_line = ranges.iter().map(|&(s, e)| s.max(e)).max().unwrap_or(0);
    if max_line == 0 {
        return Ok(chunks);
    }

    let reader = BufReader::new(File::open(file).map_err(|e| Error::io(file, e))?);
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| Error::io(file, e))?;
        let line_no = idx as u32 + 1;
        for (chunk, &(start, end)) in chunks.iter_mut().zip(ranges) {
            let (lo, hi) = (start.min(end), start.max(end));
            if (lo..=hi).contains(&line_no) {
                chunk.push_str(&line);
                chunk.push('\n');
            }
        }
        if line_no == max_line {
            break;
        }
    }
    Ok(chunks)
}

/// The normalized text of a line range: comments stripped, then all
/// whitespace dropped.
pub fn raw_code(file: &Path, start: u32, end: u32) -> Result<String> {
    let chunk = slice(file, &[(start, end)])?.swap_remove(0);
    Ok(strip_whitespace(&strip_comments(&chunk)))
}

/// Remove `//...` and `/*...*/` comments, leaving string and character
/// literals untouched. Each comment is replaced by a single space so that
/// adjacent tokens do not fuse.
pub fn strip_comments(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut chars = code.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                // Copy the literal verbatim, honoring escapes.
                out.push(c);
                while let Some(&next) = chars.peek() {
                    chars.next();
                    out.push(next);
                    if next == '\\' {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    } else if next == c {
                        break;
                    }
                }
            }
            '/' => match chars.peek() {
                Some('/') => {
                    // Line comment: drop to end of line, keep the newline.
                    for next in chars.by_ref() {
                        if next == '\n' {
                            out.push(' ');
                            out.push('\n');
                            break;
                        }
                    }
                }
                Some('*') => {
                    chars.next();
                    let mut prev = '\0';
                    for next in chars.by_ref() {
                        if prev == '*' && next == '/' {
                            break;
                        }
                        prev = next;
                    }
                    out.push(' ');
                }
                _ => out.push(c),
            },
            _ => out.push(c),
        }
    }
    out
}

/// Drop every Unicode whitespace character.
pub fn strip_whitespace(code: &str) -> String {
    code.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
#[path = "slicer_tests.rs"]
mod tests;

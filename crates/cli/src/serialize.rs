// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Schema-checked binary persistence.
//!
//! Every binary artifact is a small envelope: magic bytes, a format
//! version, then a postcard-encoded payload. Loading validates both before
//! deserializing, so stale or foreign files fail fast instead of producing
//! garbage indices.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Envelope magic.
const MAGIC: &[u8; 4] = b"BRTS";

/// Format version; bump on any change to the persisted types.
const FORMAT_VERSION: u16 = 1;

/// Serialize `value` into the envelope at `path` (atomic via temp + rename).
pub fn write_envelope<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let payload = postcard::to_allocvec(value).map_err(|e| Error::Serialize {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let mut bytes = Vec::with_capacity(payload.len() + 6);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&payload);

    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, &bytes).map_err(|e| Error::io(&temp_path, e))?;
    std::fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))
}

/// Read and validate the envelope at `path`.
pub fn read_envelope<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    let serialize_error = |message: String| Error::Serialize {
        path: path.to_path_buf(),
        message,
    };
    if bytes.len() < 6 || &bytes[..4] != MAGIC {
        return Err(serialize_error("not a BinaryRTS binary artifact".to_string()));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != FORMAT_VERSION {
        return Err(serialize_error(format!(
            "unsupported format version {version} (expected {FORMAT_VERSION})"
        )));
    }
    postcard::from_bytes(&bytes[6..]).map_err(|e| serialize_error(e.to_string()))
}

#[cfg(test)]
#[path = "serialize_tests.rs"]
mod tests;

//! The redirect map on disk: written atomically by the generator, loaded once by the normalizer.

use crate::types::{InvalidMapError, RedirectMap};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(thiserror::Error, Debug)]
pub enum ArtifactError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("malformed redirect map {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("could not encode redirect map: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid redirect map {}: {source}", .path.display())]
    Invalid {
        path: PathBuf,
        source: InvalidMapError,
    },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ArtifactError + '_ {
    move |source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Pretty JSON with sorted keys and a trailing newline. Equal maps encode to equal bytes.
pub fn encode(map: &RedirectMap) -> Result<Vec<u8>, ArtifactError> {
    let mut bytes = serde_json::to_vec_pretty(map)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Replaces the artifact at `path`. The new content is written to a sibling temp file and
/// renamed over the target, so readers see either the old map or the new one.
pub fn store(path: &Path, map: &RedirectMap) -> Result<usize, ArtifactError> {
    let bytes = encode(map)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_error(dir))?;
    tmp.write_all(&bytes).map_err(io_error(path))?;
    tmp.as_file().sync_all().map_err(io_error(path))?;
    tmp.persist(path).map_err(|e| ArtifactError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    tracing::info!(path = %path.display(), bytes = bytes.len(), "stored redirect map");
    Ok(bytes.len())
}

/// Reads and validates the artifact. Any failure here must stop the normalizer from starting.
pub fn load(path: &Path) -> Result<RedirectMap, ArtifactError> {
    let raw = std::fs::read(path).map_err(io_error(path))?;
    let map: RedirectMap = serde_json::from_slice(&raw).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    map.validate().map_err(|source| ArtifactError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(map)
}

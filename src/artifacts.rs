// Artifact loading — the shared file-to-struct step for scalers and models.
//
// Artifacts are produced by an out-of-band training run and read exactly
// once at startup. Any failure here is fatal: the caller wraps it in
// anyhow context and the process exits before classifying anything.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

/// Why an artifact could not be loaded.
#[derive(Debug)]
pub enum ArtifactError {
    /// The file does not exist.
    Missing(PathBuf),
    /// The file exists but could not be read.
    Io { path: PathBuf, source: std::io::Error },
    /// The file was read but its content is not a usable artifact.
    Format { path: PathBuf, reason: String },
}

impl ArtifactError {
    pub fn format(path: &Path, reason: impl Into<String>) -> Self {
        ArtifactError::Format {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ArtifactError::Missing(path) => path,
            ArtifactError::Io { path, .. } => path,
            ArtifactError::Format { path, .. } => path,
        }
    }
}

impl fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactError::Missing(path) => {
                write!(f, "artifact not found: {}", path.display())
            }
            ArtifactError::Io { path, source } => {
                write!(f, "failed to read artifact {}: {}", path.display(), source)
            }
            ArtifactError::Format { path, reason } => {
                write!(f, "malformed artifact {}: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for ArtifactError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArtifactError::Io { source, .. } => Some(source),
            ArtifactError::Missing(_) | ArtifactError::Format { .. } => None,
        }
    }
}

/// Read raw artifact bytes, distinguishing a missing file from other I/O errors.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::Missing(path.to_path_buf()));
    }
    std::fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and deserialize a JSON artifact.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = read_bytes(path)?;
    let value = serde_json::from_slice(&bytes)
        .map_err(|e| ArtifactError::format(path, e.to_string()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Loaded JSON artifact");
    Ok(value)
}

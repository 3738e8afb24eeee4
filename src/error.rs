//! Error taxonomy shared by every stage of a bundling run.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias used throughout the crate.
pub type BundleResult<T> = Result<T, BundleError>;

/// Errors that abort a bundling run.
#[derive(Debug, Error)]
pub enum BundleError {
  /// A file or directory could not be read or written.
  #[error("failed to access {}: {source}", path.display())]
  Io {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// Directory traversal failed part way through.
  #[error("failed to walk {}: {source}", root.display())]
  Walk {
    /// Root of the traversal.
    root: PathBuf,
    /// Source traversal error.
    source: walkdir::Error,
  },
  /// A manifest contained malformed JSON.
  #[error("failed to parse {}: {source}", path.display())]
  Parse {
    /// Path of the malformed document.
    path: PathBuf,
    /// Source parse error.
    source: serde_json::Error,
  },
  /// The merged optimizer configuration has fields of the wrong type.
  #[error("invalid optimizer configuration: {source}")]
  InvalidConfig {
    /// Source deserialisation error.
    source: serde_json::Error,
  },
  /// An external optimizer or minifier reported a failure.
  #[error("{tool} failed: {message}")]
  Delegate {
    /// Name of the collaborator that failed.
    tool: String,
    /// Failure description reported by the collaborator.
    message: String,
  },
}

impl BundleError {
  pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
    Self::Io {
      path: path.to_path_buf(),
      source,
    }
  }

  pub(crate) fn parse(path: &Path, source: serde_json::Error) -> Self {
    Self::Parse {
      path: path.to_path_buf(),
      source,
    }
  }

  pub(crate) fn delegate(tool: &str, message: impl Into<String>) -> Self {
    Self::Delegate {
      tool: tool.to_string(),
      message: message.into(),
    }
  }

  /// Returns `true` for errors raised while touching the filesystem.
  pub fn is_io(&self) -> bool {
    matches!(self, Self::Io { .. } | Self::Walk { .. })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn walk_errors_count_as_io() {
    let err = BundleError::io(
      Path::new("app/conf.json"),
      std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
    );
    assert!(err.is_io());
    assert!(err.to_string().contains("app/conf.json"));

    let delegate = BundleError::delegate("r.js", "exit status 1");
    assert!(!delegate.is_io());
    assert_eq!(delegate.to_string(), "r.js failed: exit status 1");
  }
}

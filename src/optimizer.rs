//! Hand-off to the external JS module optimizer.

use std::io::Write;
use std::process::Command;

use tempfile::NamedTempFile;

use crate::error::{BundleError, BundleResult};
use crate::models::BundleConfig;

/// External optimizer that turns a [`BundleConfig`] into a JS bundle.
pub trait ScriptOptimizer: Send + Sync {
  /// Run the optimizer and return its report.
  fn optimize(&self, config: &BundleConfig) -> BundleResult<String>;
}

/// Runs the RequireJS optimizer (`r.js -o <build file>`).
#[derive(Debug, Clone)]
pub struct RequireJsOptimizer {
  command: String,
}

impl RequireJsOptimizer {
  /// Create an optimizer that invokes `command`.
  pub fn new(command: impl Into<String>) -> Self {
    Self {
      command: command.into(),
    }
  }

  /// Write `config` to a fresh build file that is deleted when the handle drops.
  fn build_file(&self, config: &BundleConfig) -> BundleResult<NamedTempFile> {
    let body = serde_json::to_string_pretty(config)
      .map_err(|source| BundleError::InvalidConfig { source })?;
    let mut file = tempfile::Builder::new()
      .prefix("component-bundler-")
      .suffix(".build.json")
      .tempfile()
      .map_err(|err| BundleError::io(&std::env::temp_dir(), err))?;
    file
      .write_all(body.as_bytes())
      .and_then(|_| file.flush())
      .map_err(|err| BundleError::io(file.path(), err))?;
    Ok(file)
  }
}

impl Default for RequireJsOptimizer {
  fn default() -> Self {
    Self::new("r.js")
  }
}

impl ScriptOptimizer for RequireJsOptimizer {
  fn optimize(&self, config: &BundleConfig) -> BundleResult<String> {
    let build_file = self.build_file(config)?;

    tracing::info!("running `{} -o {}`", self.command, build_file.path().display());
    let output = Command::new(&self.command)
      .arg("-o")
      .arg(build_file.path())
      .output();

    if let Err(err) = build_file.close() {
      tracing::warn!("failed to remove optimizer build file: {err}");
    }

    let output = output.map_err(|err| {
      BundleError::delegate(&self.command, format!("failed to launch: {err}"))
    })?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      let detail = if stderr.trim().is_empty() {
        stdout.trim()
      } else {
        stderr.trim()
      };
      return Err(BundleError::delegate(
        &self.command,
        format!("{}: {detail}", output.status),
      ));
    }

    Ok(stdout)
  }
}

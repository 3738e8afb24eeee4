//! Installing and removing the loader shims the optimizer needs next to the application.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use rayon::prelude::*;
use same_file::is_same_file;

use crate::error::{BundleError, BundleResult};

/// Framework-relative source and application-relative destination of each shim.
pub const LOADER_SHIMS: [(&[&str], &str); 3] = [
  (&["lib", "client", "loader.js"], "loader.js"),
  (&["lib", "vendor", "text.js"], "text.js"),
  (&["lib", "vendor", "json.js"], "json.js"),
];

/// Copy the loader shims from the framework into the application root.
///
/// If any copy fails, shims that were already installed are removed again and the first
/// failure is returned.
pub fn copy_loaders(framework_root: &Path, app_root: &Path) -> BundleResult<()> {
  let results: Vec<BundleResult<()>> = LOADER_SHIMS
    .par_iter()
    .map(|(source, dest)| {
      let source = source
        .iter()
        .fold(framework_root.to_path_buf(), |path, segment| path.join(segment));
      install_shim(&source, &app_root.join(dest))
    })
    .collect();

  if let Some(err) = results.into_iter().find_map(Result::err) {
    if let Err(cleanup) = remove_loaders(app_root) {
      tracing::warn!("failed to clean up loader shims: {cleanup}");
    }
    return Err(err);
  }

  tracing::debug!("installed loader shims into {}", app_root.display());
  Ok(())
}

/// Remove the loader shims from the application root. Missing shims are ignored.
pub fn remove_loaders(app_root: &Path) -> BundleResult<()> {
  LOADER_SHIMS
    .par_iter()
    .map(|(_, dest)| app_root.join(dest))
    .try_for_each(|path| remove_shim(&path))
}

fn install_shim(source: &Path, destination: &Path) -> BundleResult<()> {
  if destination.exists() {
    if is_same_file(source, destination).map_err(|err| BundleError::io(source, err))? {
      return Ok(());
    }
  }

  fs::copy(source, destination)
    .map(|_| ())
    .map_err(|err| BundleError::io(source, err))
}

fn remove_shim(path: &Path) -> BundleResult<()> {
  match fs::remove_file(path) {
    Ok(()) => Ok(()),
    Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
    Err(err) => Err(BundleError::io(path, err)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::path::PathBuf;
  use tempfile::tempdir;

  fn shim_paths(app_root: &Path) -> Vec<PathBuf> {
    LOADER_SHIMS
      .iter()
      .map(|(_, dest)| app_root.join(dest))
      .collect()
  }

  fn framework(root: &Path) -> PathBuf {
    let lazo = root.join("lazo");
    for (source, _) in LOADER_SHIMS {
      let path = source.iter().fold(lazo.clone(), |path, segment| path.join(segment));
      fs::create_dir_all(path.parent().unwrap()).unwrap();
      fs::write(&path, format!("// {}", source.join("/"))).unwrap();
    }
    lazo
  }

  #[test]
  fn copies_and_removes_all_shims() -> std::io::Result<()> {
    let temp = tempdir()?;
    let lazo = framework(temp.path());
    let app = temp.path().join("app");
    fs::create_dir_all(&app)?;

    copy_loaders(&lazo, &app).unwrap();
    for path in shim_paths(&app) {
      assert!(path.exists(), "{} missing", path.display());
    }
    assert_eq!(fs::read_to_string(app.join("text.js"))?, "// lib/vendor/text.js");

    remove_loaders(&app).unwrap();
    assert!(shim_paths(&app).iter().all(|path| !path.exists()));

    remove_loaders(&app).unwrap();
    Ok(())
  }

  #[test]
  fn failed_copy_leaves_no_partial_shims() -> std::io::Result<()> {
    let temp = tempdir()?;
    let lazo = framework(temp.path());
    fs::remove_file(lazo.join("lib/vendor/json.js"))?;
    let app = temp.path().join("app");
    fs::create_dir_all(&app)?;

    let err = copy_loaders(&lazo, &app).unwrap_err();
    assert!(err.is_io());
    assert!(shim_paths(&app).iter().all(|path| !path.exists()));
    Ok(())
  }

  #[test]
  fn copying_onto_itself_is_a_no_op() -> std::io::Result<()> {
    let temp = tempdir()?;
    let source = temp.path().join("loader.js");
    fs::write(&source, "loader")?;

    install_shim(&source, &source).unwrap();
    assert_eq!(fs::read_to_string(&source)?, "loader");
    Ok(())
  }
}

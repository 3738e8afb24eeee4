//! Directory traversal shared by the JS include resolver and the CSS collector.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::{BundleError, BundleResult};

/// Walk `root` and return every file beneath it, in a stable name-sorted order.
///
/// Directories whose name equals `skip_dir` are not descended into.
pub fn discover_files(root: &Path, skip_dir: Option<&str>) -> BundleResult<Vec<PathBuf>> {
  let walker = WalkDir::new(root)
    .follow_links(true)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|entry| !is_skipped_dir(entry, skip_dir));

  let mut files = Vec::new();
  for entry in walker {
    let entry = entry.map_err(|source| BundleError::Walk {
      root: root.to_path_buf(),
      source,
    })?;
    if entry.file_type().is_file() {
      files.push(entry.into_path());
    }
  }

  tracing::debug!("discovered {} files under {}", files.len(), root.display());
  Ok(files)
}

/// Walk `root` and return the root-relative paths accepted by `predicate`.
pub fn discover_matching<P>(
  root: &Path,
  skip_dir: Option<&str>,
  predicate: P,
) -> BundleResult<Vec<String>>
where
  P: Fn(&str) -> bool,
{
  Ok(
    discover_files(root, skip_dir)?
      .iter()
      .map(|path| relative_to_root(root, path))
      .filter(|relative| predicate(relative))
      .collect(),
  )
}

/// Strip `root` from `path` and normalise separators to forward slashes.
pub fn relative_to_root(root: &Path, path: &Path) -> String {
  let relative = path.strip_prefix(root).unwrap_or(path);
  relative
    .to_string_lossy()
    .replace('\\', "/")
    .trim_start_matches("./")
    .trim_start_matches('/')
    .to_string()
}

fn is_skipped_dir(entry: &DirEntry, skip_dir: Option<&str>) -> bool {
  let Some(skip_dir) = skip_dir else {
    return false;
  };
  entry.depth() > 0 && entry.file_type().is_dir() && entry.file_name() == skip_dir
}

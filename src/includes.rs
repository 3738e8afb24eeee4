//! Turning discovered application files into the ordered JS include list.

use std::path::{Path, PathBuf};

use crate::discovery::{discover_files, relative_to_root};
use crate::error::BundleResult;
use crate::hooks::IncludeFilter;
use crate::models::{IncludeEntry, PathTable};
use crate::options::BundleOptions;

const SCRIPT_EXTENSION: &str = ".js";

/// Discover application files and resolve them into include entries.
///
/// Stages run in a fixed order: extension filter, entry mapping, path-table exclusion, the
/// caller's filter hook, then bundle-output exclusion. Discovery order is preserved.
pub fn resolve_includes(
  options: &BundleOptions,
  table: &PathTable,
  filter: &dyn IncludeFilter,
) -> BundleResult<Vec<IncludeEntry>> {
  let files = discover_files(&options.app_path, Some(options.server_dir.as_str()))?;
  Ok(select_includes(options, &files, table, filter))
}

/// Apply the include pipeline to an already discovered file list.
pub fn select_includes(
  options: &BundleOptions,
  files: &[PathBuf],
  table: &PathTable,
  filter: &dyn IncludeFilter,
) -> Vec<IncludeEntry> {
  let root = options.app_path.as_path();
  let candidates: Vec<IncludeEntry> = files
    .iter()
    .filter_map(|file| {
      let extension = dotted_extension(file)?;
      if !options.include_extensions.contains(&extension) {
        return None;
      }
      to_entry(options, &relative_to_root(root, file), &extension)
    })
    .collect();
  let discovered = candidates.len();

  let unaliased: Vec<IncludeEntry> = candidates
    .into_iter()
    .filter(|entry| {
      let aliased = table.contains(entry.module_id());
      if aliased {
        tracing::debug!("skipping `{entry}`: already present in the path table");
      }
      !aliased
    })
    .collect();

  let output_dirs = bundle_output_dirs(options);
  let included: Vec<IncludeEntry> = filter
    .filter(unaliased)
    .into_iter()
    .filter(|entry| {
      let relative = entry_relative_path(entry);
      !output_dirs.iter().any(|dir| is_under(&relative, dir))
    })
    .collect();

  tracing::debug!(
    "resolved {} includes from {} candidate files",
    included.len(),
    discovered
  );
  included
}

fn to_entry(options: &BundleOptions, relative: &str, extension: &str) -> Option<IncludeEntry> {
  if extension == SCRIPT_EXTENSION {
    let id = relative.strip_suffix(SCRIPT_EXTENSION).unwrap_or(relative);
    return Some(IncludeEntry::Module(id.to_string()));
  }

  match options.loaders.get(extension) {
    Some(loader) => Some(IncludeEntry::LoaderPrefixed {
      loader: loader.clone(),
      path: relative.to_string(),
    }),
    None => {
      tracing::warn!("no loader configured for `{extension}`; skipping {relative}");
      None
    }
  }
}

fn dotted_extension(path: &Path) -> Option<String> {
  path
    .extension()
    .map(|ext| format!(".{}", ext.to_string_lossy()))
}

fn entry_relative_path(entry: &IncludeEntry) -> String {
  match entry {
    IncludeEntry::Module(id) => format!("{id}{SCRIPT_EXTENSION}"),
    IncludeEntry::LoaderPrefixed { path, .. } => path.clone(),
  }
}

/// Directories holding previous bundle output, root-relative.
fn bundle_output_dirs(options: &BundleOptions) -> Vec<String> {
  [&options.js_out, &options.css_out]
    .into_iter()
    .filter_map(|out| {
      let parent = Path::new(out.as_str()).parent()?;
      let parent = relative_to_root(Path::new(""), parent);
      (!parent.is_empty()).then_some(parent)
    })
    .collect()
}

fn is_under(relative: &str, dir: &str) -> bool {
  relative
    .strip_prefix(dir)
    .is_some_and(|rest| rest.starts_with('/'))
}

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use rayon::prelude::*;

use crate::discovery::discover_matching;
use crate::error::{BundleError, BundleResult};
use crate::hooks::{CssFilter, CssOrdering};
use crate::manifest::read_optional_json;
use crate::models::CssFragment;
use crate::options::BundleOptions;

/// Gather the stylesheets that make up the CSS bundle, root-relative and deduplicated.
///
/// Paths declared in `app/app.json` come first, followed by discovered files in discovery
/// order. Previous bundle output is dropped before `ordering` runs.
pub fn collect_css_files(
  options: &BundleOptions,
  filter: &dyn CssFilter,
  ordering: &dyn CssOrdering,
) -> BundleResult<Vec<String>> {
  let root = options.app_path.as_path();
  let (declared, discovered) = rayon::join(
    || declared_css(options),
    || discover_matching(root, None, |path| filter.accepts(path)),
  );
  let (declared, discovered) = (declared?, discovered?);

  let output = normalise(&options.css_out);
  let output_dir = output
    .rsplit_once('/')
    .map(|(dir, _)| dir.to_string())
    .unwrap_or_default();

  let mut seen = BTreeSet::new();
  let files: Vec<String> = declared
    .into_iter()
    .chain(discovered)
    .filter(|path| !is_bundle_output(path, &output, &output_dir))
    .filter(|path| seen.insert(path.clone()))
    .collect();

  tracing::debug!("collected {} stylesheets", files.len());
  Ok(ordering.sort(files))
}

/// Read each stylesheet's contents, keeping the given order.
pub fn read_css_files(root: &Path, files: &[String]) -> BundleResult<Vec<CssFragment>> {
  files
    .par_iter()
    .map(|relative| {
      let path = root.join(relative);
      fs::read_to_string(&path)
        .map(|contents| CssFragment::new(relative.clone(), contents))
        .map_err(|err| BundleError::io(&path, err))
    })
    .collect()
}

fn declared_css(options: &BundleOptions) -> BundleResult<Vec<String>> {
  let Some(manifest) = read_optional_json(&options.app_css_manifest())? else {
    return Ok(Vec::new());
  };

  let root_prefix = normalise(&options.app_path.to_string_lossy());
  let declared = manifest
    .get("css")
    .and_then(|value| value.as_array())
    .map(|entries| {
      entries
        .iter()
        .filter_map(|entry| entry.as_str())
        .map(|entry| strip_root(&normalise(entry), &root_prefix))
        .filter(|entry| !entry.is_empty())
        .collect()
    })
    .unwrap_or_default();
  Ok(declared)
}

fn normalise(path: &str) -> String {
  let mut value = path.replace('\\', "/");
  while let Some(rest) = value.strip_prefix("./") {
    value = rest.to_string();
  }
  value.trim_start_matches('/').to_string()
}

fn strip_root(path: &str, root_prefix: &str) -> String {
  if root_prefix.is_empty() || root_prefix == "." {
    return path.to_string();
  }
  path
    .strip_prefix(root_prefix)
    .and_then(|rest| rest.strip_prefix('/'))
    .unwrap_or(path)
    .to_string()
}

fn is_bundle_output(path: &str, output: &str, output_dir: &str) -> bool {
  if path == output {
    return true;
  }
  !output_dir.is_empty()
    && path
      .strip_prefix(output_dir)
      .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::hooks::{CssExtension, DiscoveryOrder};

  use tempfile::tempdir;

  fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
  }

  fn options(root: &Path) -> BundleOptions {
    BundleOptions {
      app_path: root.to_path_buf(),
      ..BundleOptions::default()
    }
  }

  #[test]
  fn collects_discovered_stylesheets_in_discovery_order() {
    let dir = tempdir().unwrap();
    write(dir.path(), "app/css/a.css", "a{}");
    write(dir.path(), "components/x/index.css", "x{}");
    write(dir.path(), "components/x/index.js", "");

    let files = collect_css_files(&options(dir.path()), &CssExtension, &DiscoveryOrder).unwrap();
    assert_eq!(files, vec!["app/css/a.css", "components/x/index.css"]);
  }

  #[test]
  fn declared_stylesheets_come_first_and_appear_once() {
    let dir = tempdir().unwrap();
    write(dir.path(), "app/css/a.css", "a{}");
    write(dir.path(), "components/x/index.css", "x{}");
    write(
      dir.path(),
      "app/app.json",
      r#"{"css": ["/components/x/index.css", "vendor/reset.css", 7]}"#,
    );

    let files = collect_css_files(&options(dir.path()), &CssExtension, &DiscoveryOrder).unwrap();
    assert_eq!(files, vec![
      "components/x/index.css",
      "vendor/reset.css",
      "app/css/a.css",
    ]);
  }

  #[test]
  fn previous_bundle_is_excluded() {
    let dir = tempdir().unwrap();
    write(dir.path(), "app/css/a.css", "a{}");
    write(dir.path(), "app/bundles/application.css", "old{}");

    let files = collect_css_files(&options(dir.path()), &CssExtension, &DiscoveryOrder).unwrap();
    assert_eq!(files, vec!["app/css/a.css"]);
  }

  #[test]
  fn ordering_hook_runs_last() {
    struct Reverse;
    impl CssOrdering for Reverse {
      fn sort(&self, mut files: Vec<String>) -> Vec<String> {
        files.reverse();
        files
      }
    }

    let dir = tempdir().unwrap();
    write(dir.path(), "a.css", "");
    write(dir.path(), "b.css", "");

    let files = collect_css_files(&options(dir.path()), &CssExtension, &Reverse).unwrap();
    assert_eq!(files, vec!["b.css", "a.css"]);
  }

  #[test]
  fn reads_contents_in_order() {
    let dir = tempdir().unwrap();
    let files = vec!["components/b/index.css".to_string(), "app/a.css".to_string()];
    write(dir.path(), &files[0], "b{}");
    write(dir.path(), &files[1], "a{}");

    let fragments = read_css_files(dir.path(), &files).unwrap();
    assert_eq!(fragments, vec![
      CssFragment::new("components/b/index.css", "b{}"),
      CssFragment::new("app/a.css", "a{}"),
    ]);
  }

  #[test]
  fn missing_declared_stylesheet_fails_on_read() {
    let dir = tempdir().unwrap();
    let err = read_css_files(dir.path(), &["vendor/missing.css".to_string()]).unwrap_err();
    assert!(err.is_io());
  }
}

//! Caller hooks that customise which files reach the bundles and in what order.

use std::collections::BTreeSet;
use std::path::Path;

use crate::models::IncludeEntry;

/// Final say over the include list after alias exclusion has run.
pub trait IncludeFilter: Send + Sync {
  /// Return the entries to keep, in the order they should be embedded.
  fn filter(&self, entries: Vec<IncludeEntry>) -> Vec<IncludeEntry>;
}

/// Predicate selecting which discovered files are stylesheets.
pub trait CssFilter: Send + Sync {
  /// Returns `true` when the root-relative path should be collected.
  fn accepts(&self, relative_path: &str) -> bool;
}

/// Ordering applied to the collected stylesheet list.
pub trait CssOrdering: Send + Sync {
  /// Return the stylesheets in concatenation order.
  fn sort(&self, files: Vec<String>) -> Vec<String>;
}

/// Keeps every entry untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAll;

impl IncludeFilter for KeepAll {
  fn filter(&self, entries: Vec<IncludeEntry>) -> Vec<IncludeEntry> {
    entries
  }
}

/// Accepts files with a `.css` extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssExtension;

impl CssFilter for CssExtension {
  fn accepts(&self, relative_path: &str) -> bool {
    Path::new(relative_path)
      .extension()
      .is_some_and(|ext| ext == "css")
  }
}

/// Leaves stylesheets in discovery order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoveryOrder;

impl CssOrdering for DiscoveryOrder {
  fn sort(&self, files: Vec<String>) -> Vec<String> {
    files
  }
}

impl<F> IncludeFilter for F
where
  F: Fn(Vec<IncludeEntry>) -> Vec<IncludeEntry> + Send + Sync,
{
  fn filter(&self, entries: Vec<IncludeEntry>) -> Vec<IncludeEntry> {
    self(entries)
  }
}

impl<F> CssFilter for F
where
  F: Fn(&str) -> bool + Send + Sync,
{
  fn accepts(&self, relative_path: &str) -> bool {
    self(relative_path)
  }
}

/// Scope-based include/exclude rules applied to module ids.
///
/// A rule matches the id itself and anything nested beneath it, so excluding
/// `components/admin` also drops `components/admin/views/index`.
#[derive(Debug, Clone, Default)]
pub struct ModuleSelection {
  include: Option<BTreeSet<String>>,
  exclude: BTreeSet<String>,
}

impl ModuleSelection {
  /// Build a selection from raw rule lists. An empty include list means "everything".
  pub fn new(
    include: impl IntoIterator<Item = String>,
    exclude: impl IntoIterator<Item = String>,
  ) -> Self {
    let include = normalise_list(include);
    Self {
      include: (!include.is_empty()).then_some(include),
      exclude: normalise_list(exclude),
    }
  }

  /// Determine whether a module id should be embedded.
  pub fn is_included(&self, module_id: &str) -> bool {
    if self
      .exclude
      .iter()
      .any(|rule| scope_matches(rule, module_id))
    {
      return false;
    }

    match &self.include {
      Some(include) => include.iter().any(|rule| scope_matches(rule, module_id)),
      None => true,
    }
  }

  /// Returns true when no rules are active.
  pub fn is_unfiltered(&self) -> bool {
    self.include.is_none() && self.exclude.is_empty()
  }
}

impl IncludeFilter for ModuleSelection {
  fn filter(&self, entries: Vec<IncludeEntry>) -> Vec<IncludeEntry> {
    entries
      .into_iter()
      .filter(|entry| self.is_included(entry.module_id()))
      .collect()
  }
}

/// Hooks used by a bundling run.
pub struct BundleHooks {
  /// Applied to the include list after alias exclusion.
  pub include_filter: Box<dyn IncludeFilter>,
  /// Selects stylesheets among discovered files.
  pub css_filter: Box<dyn CssFilter>,
  /// Orders collected stylesheets.
  pub css_ordering: Box<dyn CssOrdering>,
}

impl Default for BundleHooks {
  fn default() -> Self {
    Self {
      include_filter: Box::new(KeepAll),
      css_filter: Box::new(CssExtension),
      css_ordering: Box::new(DiscoveryOrder),
    }
  }
}

impl std::fmt::Debug for BundleHooks {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BundleHooks").finish_non_exhaustive()
  }
}

/// Trim whitespace and slashes, dropping empty rules.
fn normalise_list(values: impl IntoIterator<Item = String>) -> BTreeSet<String> {
  values
    .into_iter()
    .map(|value| value.trim().trim_matches('/').to_string())
    .filter(|value| !value.is_empty())
    .collect()
}

fn scope_matches(rule: &str, candidate: &str) -> bool {
  if candidate == rule {
    return true;
  }

  candidate
    .strip_prefix(rule)
    .is_some_and(|suffix| suffix.starts_with('/'))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn module(id: &str) -> IncludeEntry {
    IncludeEntry::Module(id.into())
  }

  #[test]
  fn default_hooks_are_identity() {
    let hooks = BundleHooks::default();
    let entries = vec![module("app/application"), module("components/a/controller")];
    assert_eq!(hooks.include_filter.filter(entries.clone()), entries);
    assert!(hooks.css_filter.accepts("components/a/index.css"));
    assert!(!hooks.css_filter.accepts("components/a/index.scss"));
    assert_eq!(
      hooks.css_ordering.sort(vec!["b.css".into(), "a.css".into()]),
      vec!["b.css", "a.css"]
    );
  }

  #[test]
  fn closures_work_as_hooks() {
    let drop_tests = |entries: Vec<IncludeEntry>| {
      entries
        .into_iter()
        .filter(|entry| !entry.module_id().ends_with("_test"))
        .collect::<Vec<_>>()
    };
    let hooks = BundleHooks {
      include_filter: Box::new(drop_tests),
      css_filter: Box::new(|path: &str| path.starts_with("components/")),
      ..BundleHooks::default()
    };

    let kept = hooks
      .include_filter
      .filter(vec![module("app/a"), module("app/a_test")]);
    assert_eq!(kept, vec![module("app/a")]);
    assert!(!hooks.css_filter.accepts("app/css/a.css"));
  }

  #[test]
  fn excludes_nested_modules_with_parent_scope() {
    let selection = ModuleSelection::new(Vec::new(), vec!["components/admin/".into()]);

    assert!(!selection.is_included("components/admin"));
    assert!(!selection.is_included("components/admin/controller"));
    assert!(selection.is_included("components/administrator/controller"));
  }

  #[test]
  fn exclusions_win_over_inclusions() {
    let selection = ModuleSelection::new(
      vec!["components".into(), " app ".into(), String::new()],
      vec!["components/draft".into()],
    );

    assert!(!selection.is_unfiltered());
    assert!(selection.is_included("app/application"));
    assert!(selection.is_included("components/a/controller"));
    assert!(!selection.is_included("components/draft/controller"));
    assert!(!selection.is_included("models/user"));
  }

  #[test]
  fn selection_filters_loader_prefixed_entries_by_path() {
    let selection = ModuleSelection::new(Vec::new(), vec!["components/b".into()]);
    let entries = vec![
      IncludeEntry::LoaderPrefixed {
        loader: "text".into(),
        path: "components/b/views/index.hbs".into(),
      },
      module("components/a/controller"),
    ];

    assert_eq!(selection.filter(entries), vec![module("components/a/controller")]);
  }
}

//! Data structures produced while resolving and merging a bundle.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Marker understood by the optimizer for modules supplied at runtime.
pub const EMPTY_TARGET: &str = "empty:";

/// Where a logical module id resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum ModuleTarget {
  /// Module is loaded from the given location.
  Local(String),
  /// Module is provided by the host runtime and must never be inlined.
  EmptyAtRuntime,
}

impl ModuleTarget {
  /// Returns `true` for modules supplied by the host runtime.
  pub fn is_empty_at_runtime(&self) -> bool {
    matches!(self, Self::EmptyAtRuntime)
  }
}

impl From<String> for ModuleTarget {
  fn from(value: String) -> Self {
    if value == EMPTY_TARGET {
      Self::EmptyAtRuntime
    } else {
      Self::Local(value)
    }
  }
}

impl From<ModuleTarget> for String {
  fn from(value: ModuleTarget) -> Self {
    match value {
      ModuleTarget::Local(path) => path,
      ModuleTarget::EmptyAtRuntime => EMPTY_TARGET.to_string(),
    }
  }
}

/// Authoritative mapping from module id to its target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PathTable {
  entries: BTreeMap<String, ModuleTarget>,
}

impl PathTable {
  /// Create an empty table.
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert or overwrite the target for `id`.
  pub fn insert(&mut self, id: impl Into<String>, target: ModuleTarget) {
    self.entries.insert(id.into(), target);
  }

  /// Look up the target recorded for `id`.
  pub fn get(&self, id: &str) -> Option<&ModuleTarget> {
    self.entries.get(id)
  }

  /// Returns `true` when `id` has any entry, regardless of target.
  pub fn contains(&self, id: &str) -> bool {
    self.entries.contains_key(id)
  }

  /// Number of ids in the table.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Returns `true` when the table holds no ids.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Iterate over ids and targets in id order.
  pub fn iter(&self) -> impl Iterator<Item = (&String, &ModuleTarget)> {
    self.entries.iter()
  }
}

/// One module reference embedded in the JS bundle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum IncludeEntry {
  /// Script module referenced by id (root-relative path without extension).
  Module(String),
  /// Non-script asset loaded through a loader plugin (`loader!path`).
  LoaderPrefixed {
    /// Loader plugin id.
    loader: String,
    /// Root-relative asset path, extension included.
    path: String,
  },
}

impl IncludeEntry {
  /// Module id used to look the entry up in the path table.
  pub fn module_id(&self) -> &str {
    match self {
      Self::Module(id) => id,
      Self::LoaderPrefixed { path, .. } => path,
    }
  }
}

impl From<String> for IncludeEntry {
  fn from(value: String) -> Self {
    match value.split_once('!') {
      Some((loader, path)) => Self::LoaderPrefixed {
        loader: loader.to_string(),
        path: path.to_string(),
      },
      None => Self::Module(value),
    }
  }
}

impl From<IncludeEntry> for String {
  fn from(value: IncludeEntry) -> Self {
    value.to_string()
  }
}

impl fmt::Display for IncludeEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Module(id) => f.write_str(id),
      Self::LoaderPrefixed { loader, path } => write!(f, "{loader}!{path}"),
    }
  }
}

/// Stylesheet contents paired with the root-relative path they were read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssFragment {
  /// Root-relative source path.
  pub path: String,
  /// Raw or rewritten stylesheet text.
  pub contents: String,
}

impl CssFragment {
  /// Convenience constructor.
  pub fn new(path: impl Into<String>, contents: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      contents: contents.into(),
    }
  }
}

/// Final configuration handed to the JS optimizer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleConfig {
  /// Modules embedded in the bundle, in discovery order.
  pub include: Vec<IncludeEntry>,
  /// Module path table.
  pub paths: PathTable,
  /// Loader plugins stripped from the output once the build is done.
  pub stub_modules: Vec<String>,
  /// Module id aliases, keyed by requesting module pattern.
  pub map: BTreeMap<String, BTreeMap<String, String>>,
  /// File name of the JS bundle.
  pub out_file_name: String,
  /// Optimizer main config file; empty means none.
  #[serde(default)]
  pub main_config_file: String,
  /// Directory module ids resolve against.
  pub base_url: String,
  /// Optimization mode passed through to the optimizer.
  pub optimize: String,
  /// Optimizer log verbosity.
  pub log_level: u8,
  /// Absolute output path of the JS bundle.
  pub out: String,
  /// Options the crate does not interpret, forwarded untouched.
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Outcome of a JS bundling run.
#[derive(Debug, Clone)]
pub struct JsBundleOutput {
  /// Path the optimizer wrote the bundle to.
  pub out: PathBuf,
  /// Report returned by the optimizer.
  pub response: String,
}

/// Outcome of a CSS bundling run.
#[derive(Debug, Clone)]
pub struct CssBundleOutput {
  /// Path the stylesheet bundle was written to.
  pub out: PathBuf,
  /// Root-relative stylesheets folded into the bundle, in order.
  pub files: Vec<String>,
  /// Size of the written bundle in bytes.
  pub bytes: usize,
}

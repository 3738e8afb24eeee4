//! Caller-facing options describing where the application and framework live.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{BundleError, BundleResult};

const DEFAULT_CONFIG_FILE: &str = "bundler.config.json";

/// Framework path manifest, relative to the framework root.
pub const FRAMEWORK_PATHS_MANIFEST: &[&str] = &["lib", "common", "resolver", "paths.json"];
/// Framework and application configuration file name.
pub const CONF_FILE: &str = "conf.json";
/// Application CSS manifest, relative to the application root.
pub const APP_CSS_MANIFEST: &[&str] = &["app", "app.json"];

/// Options recognised by the bundler. Unknown keys are kept in [`BundleOptions::extra`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BundleOptions {
  /// Application root to scan.
  pub app_path: PathBuf,
  /// Framework root providing the path manifest and loader shims.
  pub lazo_path: PathBuf,
  /// Raw optimizer configuration merged over everything else.
  pub config: Map<String, Value>,
  /// Extensions (with leading dot) embedded in the JS bundle.
  pub include_extensions: Vec<String>,
  /// Loader plugin id for each non-script extension.
  pub loaders: BTreeMap<String, String>,
  /// Whether the CSS bundle is minified.
  pub minify_css: bool,
  /// CSS bundle path, relative to the application root.
  pub css_out: String,
  /// JS bundle path, relative to the application root.
  pub js_out: String,
  /// Host UI library id the application may not re-point.
  pub reserved_module_id: String,
  /// Directory name whose contents never reach the client bundle.
  pub server_dir: String,
  /// Executable used to run the JS optimizer.
  pub optimizer_command: String,
  /// Module scopes to embed; empty means every discovered module.
  pub include_modules: Vec<String>,
  /// Module scopes never embedded.
  pub exclude_modules: Vec<String>,
  /// Unrecognised options, forwarded into the final configuration.
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Default for BundleOptions {
  fn default() -> Self {
    Self {
      app_path: PathBuf::from("."),
      lazo_path: PathBuf::from("node_modules/lazo"),
      config: Map::new(),
      include_extensions: vec![".hbs".into(), ".json".into(), ".js".into()],
      loaders: BTreeMap::from([
        (".hbs".to_string(), "text".to_string()),
        (".json".to_string(), "json".to_string()),
      ]),
      minify_css: true,
      css_out: "app/bundles/application.css".into(),
      js_out: "app/bundles/application.js".into(),
      reserved_module_id: "jquery".into(),
      server_dir: "server".into(),
      optimizer_command: "r.js".into(),
      include_modules: Vec::new(),
      exclude_modules: Vec::new(),
      extra: Map::new(),
    }
  }
}

impl BundleOptions {
  /// Load options from `bundler.config.json` in `dir`, falling back to defaults.
  ///
  /// A missing file is expected; a malformed one is logged and ignored so callers can still
  /// override individual fields on the command line.
  pub fn discover(dir: &Path) -> Self {
    let candidate = dir.join(DEFAULT_CONFIG_FILE);
    match Self::from_path(&candidate) {
      Ok(Some(options)) => options,
      Ok(None) => Self::default(),
      Err(err) => {
        tracing::warn!("ignoring bundler options: {err}");
        Self::default()
      }
    }
  }

  /// Read options from a specific JSON file. Returns `None` when the file does not exist.
  pub fn from_path(path: &Path) -> BundleResult<Option<Self>> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
      Err(err) => return Err(BundleError::io(path, err)),
    };
    serde_json::from_str(&content)
      .map(Some)
      .map_err(|err| BundleError::parse(path, err))
  }

  /// Absolute-style path of the JS bundle.
  pub fn js_out_path(&self) -> PathBuf {
    self.app_path.join(&self.js_out)
  }

  /// Absolute-style path of the CSS bundle.
  pub fn css_out_path(&self) -> PathBuf {
    self.app_path.join(&self.css_out)
  }

  /// Location of the framework path manifest.
  pub fn framework_paths_manifest(&self) -> PathBuf {
    FRAMEWORK_PATHS_MANIFEST
      .iter()
      .fold(self.lazo_path.clone(), |path, segment| path.join(segment))
  }

  /// Location of the framework configuration.
  pub fn framework_conf(&self) -> PathBuf {
    self.lazo_path.join(CONF_FILE)
  }

  /// Location of the optional application configuration.
  pub fn app_conf(&self) -> PathBuf {
    self.app_path.join(CONF_FILE)
  }

  /// Location of the optional application CSS manifest.
  pub fn app_css_manifest(&self) -> PathBuf {
    APP_CSS_MANIFEST
      .iter()
      .fold(self.app_path.clone(), |path, segment| path.join(segment))
  }
}

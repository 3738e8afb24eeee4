//! Layered construction of the optimizer configuration.
//!
//! Layers, lowest precedence first: the crate's fixed defaults, the framework's
//! `requirejs.client` section (its `common` section is server-side and ignored), the application's `requirejs.common` then `requirejs.client`
//! sections, unrecognised caller options, and finally the caller's raw `config`. Nested objects
//! are merged key by key; every other value is replaced. The computed `include` list and path
//! table are injected afterwards as whole values.

use std::path::Path;

use serde_json::{Map, Value, json};

use crate::discovery::discover_files;
use crate::error::{BundleError, BundleResult};
use crate::hooks::IncludeFilter;
use crate::includes::select_includes;
use crate::manifest::{read_json, read_optional_json, section};
use crate::models::{BundleConfig, IncludeEntry, PathTable};
use crate::options::BundleOptions;
use crate::paths::build_path_table;

/// Keys owned by the resolver; declared values for them are discarded.
const DERIVED_KEYS: [&str; 2] = ["include", "paths"];

/// Merge `overlay` into `base`, recursing into objects present on both sides.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
  match (base, overlay) {
    (Value::Object(base), Value::Object(overlay)) => {
      for (key, value) in overlay {
        match base.get_mut(key) {
          Some(existing) => deep_merge(existing, value),
          None => {
            base.insert(key.clone(), value.clone());
          }
        }
      }
    }
    (base, overlay) => *base = overlay.clone(),
  }
}

/// Merge layers in order, later layers winning at the leaves.
pub fn merge_layers<'a>(layers: impl IntoIterator<Item = &'a Value>) -> Value {
  let mut merged = Value::Object(Map::new());
  for layer in layers {
    deep_merge(&mut merged, layer);
  }
  merged
}

/// The crate's own defaults for an application.
pub fn default_layer(options: &BundleOptions) -> Value {
  let out = options.js_out_path();
  let out = std::path::absolute(&out).unwrap_or(out);
  let base_url =
    std::path::absolute(&options.app_path).unwrap_or_else(|_| options.app_path.clone());
  let out_file_name = Path::new(&options.js_out)
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_else(|| "application.js".to_string());

  json!({
    "stubModules": ["text", "json", "l"],
    "map": { "*": { "l": "loader.js" } },
    "outFileName": out_file_name,
    "mainConfigFile": "",
    "baseUrl": base_url.to_string_lossy(),
    "optimize": "uglify2",
    "logLevel": 4,
    "out": out.to_string_lossy(),
  })
}

/// The framework's default client-side optimizer options (`requirejs.client` only).
pub fn framework_layer(conf: &Value) -> Value {
  section(conf, &["requirejs", "client"])
    .map(|section| Value::Object(without_derived(section)))
    .unwrap_or(Value::Null)
}

/// Extract the client-side optimizer options declared in an application `conf.json`, with
/// `client` overriding `common`.
pub fn client_layer(conf: &Value) -> Value {
  let layers: Vec<Value> = ["common", "client"]
    .into_iter()
    .filter_map(|layer| section(conf, &["requirejs", layer]))
    .map(|section| Value::Object(without_derived(section)))
    .collect();
  merge_layers(&layers)
}

/// Combine the declared layers with the computed include list and path table.
pub fn assemble_config(
  options: &BundleOptions,
  framework_conf: &Value,
  app_conf: Option<&Value>,
  include: Vec<IncludeEntry>,
  paths: PathTable,
) -> BundleResult<BundleConfig> {
  let framework = framework_layer(framework_conf);
  let app = app_conf.map(client_layer).unwrap_or(Value::Null);
  let passthrough = Value::Object(without_derived(&options.extra));
  let overrides = Value::Object(without_derived(&options.config));

  let mut merged = merge_layers(
    [
      &default_layer(options),
      &framework,
      &app,
      &passthrough,
      &overrides,
    ]
    .into_iter()
    .filter(|layer| !layer.is_null()),
  );

  if let Value::Object(map) = &mut merged {
    map.insert(
      "include".into(),
      serde_json::to_value(&include).map_err(|source| BundleError::InvalidConfig { source })?,
    );
    map.insert(
      "paths".into(),
      serde_json::to_value(&paths).map_err(|source| BundleError::InvalidConfig { source })?,
    );
  }

  serde_json::from_value(merged).map_err(|source| BundleError::InvalidConfig { source })
}

/// Read every configuration source concurrently and produce the final configuration.
///
/// The path table, application file list, framework configuration and application
/// configuration are independent, so they are fetched in parallel; the first failure in
/// declaration order is reported.
pub fn build_config(
  options: &BundleOptions,
  filter: &dyn IncludeFilter,
) -> BundleResult<BundleConfig> {
  let ((paths, files), (framework_conf, app_conf)) = rayon::join(
    || {
      rayon::join(
        || build_path_table(options),
        || discover_files(&options.app_path, Some(options.server_dir.as_str())),
      )
    },
    || {
      rayon::join(
        || read_json(&options.framework_conf()),
        || read_optional_json(&options.app_conf()),
      )
    },
  );
  let (paths, files) = (paths?, files?);
  let (framework_conf, app_conf) = (framework_conf?, app_conf?);

  let include = select_includes(options, &files, &paths, filter);
  let config = assemble_config(options, &framework_conf, app_conf.as_ref(), include, paths)?;
  tracing::info!(
    "optimizer configuration ready: {} includes, {} paths, out {}",
    config.include.len(),
    config.paths.len(),
    config.out
  );
  Ok(config)
}

fn without_derived(map: &Map<String, Value>) -> Map<String, Value> {
  map
    .iter()
    .filter(|(key, _)| !DERIVED_KEYS.contains(&key.as_str()))
    .map(|(key, value)| (key.clone(), value.clone()))
    .collect()
}

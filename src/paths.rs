//! Layered construction of the module path table.
//!
//! Precedence, lowest first: framework `common`, framework `client`, application
//! `requirejs.common.paths`, application `requirejs.client.paths`. Framework ids other than
//! the bundled loader plugins are stubbed out with [`ModuleTarget::EmptyAtRuntime`] since the
//! runtime loader already provides them.

use serde_json::{Map, Value};

use crate::error::BundleResult;
use crate::manifest::{read_json, read_optional_json, section};
use crate::models::{ModuleTarget, PathTable};
use crate::options::BundleOptions;

/// Loader plugins that are bundled rather than provided by the host.
pub const LOADER_PLUGIN_IDS: [&str; 2] = ["text", "json"];

/// Build the path table for an application.
pub fn build_path_table(options: &BundleOptions) -> BundleResult<PathTable> {
  let framework = read_json(&options.framework_paths_manifest())?;
  let mut table = framework_table(&framework);

  if let Some(app_conf) = read_optional_json(&options.app_conf())? {
    apply_app_paths(&mut table, &app_conf, &options.reserved_module_id);
  }

  tracing::debug!("path table holds {} module ids", table.len());
  Ok(table)
}

/// Derive the framework's contribution from its path manifest.
pub fn framework_table(manifest: &Value) -> PathTable {
  let mut table = PathTable::new();
  for layer in ["common", "client"] {
    let Some(paths) = section(manifest, &[layer]) else {
      continue;
    };
    for id in paths.keys() {
      let target = if LOADER_PLUGIN_IDS.contains(&id.as_str()) {
        ModuleTarget::Local(id.clone())
      } else {
        ModuleTarget::EmptyAtRuntime
      };
      table.insert(id.clone(), target);
    }
  }
  table
}

/// Merge application-declared paths over `table`, client over common.
///
/// The reserved host UI library id is never re-pointed by the application.
pub fn apply_app_paths(table: &mut PathTable, app_conf: &Value, reserved_id: &str) {
  for layer in ["common", "client"] {
    let Some(paths) = section(app_conf, &["requirejs", layer, "paths"]) else {
      continue;
    };
    merge_layer(table, paths, reserved_id);
  }
}

fn merge_layer(table: &mut PathTable, paths: &Map<String, Value>, reserved_id: &str) {
  for (id, target) in paths {
    if id == reserved_id {
      tracing::debug!("dropping application override for reserved module `{id}`");
      continue;
    }
    match target {
      Value::String(target) => table.insert(id.clone(), ModuleTarget::from(target.clone())),
      other => tracing::warn!("ignoring non-string path for `{id}`: {other}"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::fs;
  use std::path::Path;
  use tempfile::tempdir;

  fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
  }

  fn options(root: &Path) -> BundleOptions {
    BundleOptions {
      app_path: root.join("app-root"),
      lazo_path: root.join("lazo"),
      ..BundleOptions::default()
    }
  }

  #[test]
  fn framework_ids_become_empty_except_loader_plugins() {
    let manifest = json!({
      "common": { "jquery": "lib/vendor/jquery", "text": "lib/vendor/text" },
      "client": { "json": "lib/vendor/json", "lazoView": "lib/client/view" }
    });

    let table = framework_table(&manifest);
    assert_eq!(table.get("jquery"), Some(&ModuleTarget::EmptyAtRuntime));
    assert_eq!(table.get("lazoView"), Some(&ModuleTarget::EmptyAtRuntime));
    assert_eq!(table.get("text"), Some(&ModuleTarget::Local("text".into())));
    assert_eq!(table.get("json"), Some(&ModuleTarget::Local("json".into())));
  }

  #[test]
  fn client_paths_override_common_paths() {
    let mut table = PathTable::new();
    let conf = json!({
      "requirejs": {
        "common": { "paths": { "moment": "app/vendor/moment", "d3": "app/vendor/d3" } },
        "client": { "paths": { "moment": "app/vendor/moment.client" } }
      }
    });

    apply_app_paths(&mut table, &conf, "jquery");
    assert_eq!(
      table.get("moment"),
      Some(&ModuleTarget::Local("app/vendor/moment.client".into()))
    );
    assert_eq!(table.get("d3"), Some(&ModuleTarget::Local("app/vendor/d3".into())));
  }

  #[test]
  fn reserved_id_is_never_overridden() {
    let manifest = json!({ "common": { "jquery": "lib/vendor/jquery" } });
    let without = framework_table(&manifest);

    let mut with = framework_table(&manifest);
    let conf = json!({ "requirejs": { "client": { "paths": { "jquery": "app/jquery" } } } });
    apply_app_paths(&mut with, &conf, "jquery");

    assert_eq!(with.get("jquery"), without.get("jquery"));
  }

  #[test]
  fn malformed_sections_are_treated_as_empty() {
    let manifest = json!({ "common": { "foo": "lib/foo" } });
    let mut table = framework_table(&manifest);
    let conf = json!({ "requirejs": { "client": { "paths": ["nope"] }, "common": 5 } });

    apply_app_paths(&mut table, &conf, "jquery");
    assert_eq!(table, framework_table(&manifest));
  }

  #[test]
  fn application_override_wins_and_others_are_empty() {
    let dir = tempdir().unwrap();
    let options = options(dir.path());
    write(
      &options.framework_paths_manifest(),
      r#"{"common": {"foo": "lib/foo", "bar": "lib/bar"}, "client": {"baz": "lib/baz"}}"#,
    );
    write(
      &options.app_conf(),
      r#"{"requirejs": {"client": {"paths": {"foo": "app/foo"}}}}"#,
    );

    let table = build_path_table(&options).unwrap();
    assert_eq!(table.get("foo"), Some(&ModuleTarget::Local("app/foo".into())));
    assert_eq!(table.get("bar"), Some(&ModuleTarget::EmptyAtRuntime));
    assert_eq!(table.get("baz"), Some(&ModuleTarget::EmptyAtRuntime));
    assert_eq!(table.len(), 3);
  }

  #[test]
  fn missing_app_conf_yields_framework_table() {
    let dir = tempdir().unwrap();
    let options = options(dir.path());
    let manifest = r#"{"common": {"foo": "lib/foo"}, "client": {"text": "lib/text"}}"#;
    write(&options.framework_paths_manifest(), manifest);

    let table = build_path_table(&options).unwrap();
    assert_eq!(table, framework_table(&serde_json::from_str(manifest).unwrap()));
  }

  #[test]
  fn unreadable_framework_manifest_fails() {
    let dir = tempdir().unwrap();
    let options = options(dir.path());
    assert!(build_path_table(&options).unwrap_err().is_io());

    write(&options.framework_paths_manifest(), "not json");
    assert!(matches!(
      build_path_table(&options),
      Err(crate::error::BundleError::Parse { .. })
    ));
  }
}

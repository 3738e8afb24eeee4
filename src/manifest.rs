//! Reading the JSON manifests published by the framework and the application.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{BundleError, BundleResult};

/// Read a required JSON document.
pub fn read_json(path: &Path) -> BundleResult<Value> {
  let content = fs::read_to_string(path).map_err(|err| BundleError::io(path, err))?;
  serde_json::from_str(&content).map_err(|err| BundleError::parse(path, err))
}

/// Read an optional JSON document; a missing file yields `None`.
pub fn read_optional_json(path: &Path) -> BundleResult<Option<Value>> {
  let content = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(err) if err.kind() == ErrorKind::NotFound => {
      tracing::debug!("optional manifest {} not present", path.display());
      return Ok(None);
    }
    Err(err) => return Err(BundleError::io(path, err)),
  };
  serde_json::from_str(&content)
    .map(Some)
    .map_err(|err| BundleError::parse(path, err))
}

/// Walk nested object keys, returning the object found at the end.
///
/// A value of the wrong shape at the end is logged and treated as absent.
pub fn section<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Map<String, Value>> {
  let found = keys
    .iter()
    .try_fold(value, |current, key| current.get(key));
  match found {
    Some(Value::Object(map)) => Some(map),
    Some(other) => {
      tracing::warn!(
        "ignoring malformed `{}` section of type {}",
        keys.join("."),
        json_kind(other)
      );
      None
    }
    None => None,
  }
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

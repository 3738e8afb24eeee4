use std::sync::OnceLock;

use lightningcss::{
  printer::PrinterOptions,
  stylesheet::{MinifyOptions, ParserOptions, StyleSheet},
};
use regex::Regex;

use crate::error::{BundleError, BundleResult};
use crate::models::CssFragment;

fn import_rule_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r#"@import\s+(?:url\([^)]*\)|"[^"]*"|'[^']*')[^;{}]*;"#)
      .expect("invalid import rule regex")
  })
}

/// External CSS minifier.
pub trait CssMinifier: Send + Sync {
  /// Return a semantically equivalent, minified stylesheet.
  fn minify(&self, css: &str) -> BundleResult<String>;
}

/// Minifier backed by lightningcss.
#[derive(Debug, Clone, Copy, Default)]
pub struct LightningMinifier;

impl CssMinifier for LightningMinifier {
  fn minify(&self, css: &str) -> BundleResult<String> {
    let mut stylesheet = StyleSheet::parse(
      css,
      ParserOptions {
        filename: "bundle.css".to_string(),
        error_recovery: true,
        ..Default::default()
      },
    )
    .map_err(|err| BundleError::delegate("lightningcss", format!("parse: {err:?}")))?;

    stylesheet
      .minify(MinifyOptions::default())
      .map_err(|err| BundleError::delegate("lightningcss", format!("minify: {err:?}")))?;

    let result = stylesheet
      .to_css(PrinterOptions {
        minify: true,
        ..Default::default()
      })
      .map_err(|err| BundleError::delegate("lightningcss", format!("print: {err:?}")))?;

    Ok(result.code)
  }
}

/// Concatenate fragments using the default minifier when `minify` is set.
pub fn concatenate(fragments: &[CssFragment], minify: bool) -> BundleResult<String> {
  concatenate_with(fragments, minify, &LightningMinifier)
}

/// Concatenate fragments in order.
///
/// Unminified output prefixes each fragment with a `/* path */` comment and separates
/// fragments with a blank line. Minified output drops the comments and hands the joined
/// text to `minifier`, with every fragment's `@import` rules moved ahead of the first style
/// rule so imports from later components stay valid.
pub fn concatenate_with(
  fragments: &[CssFragment],
  minify: bool,
  minifier: &dyn CssMinifier,
) -> BundleResult<String> {
  if minify {
    return minifier.minify(&hoist_imports(fragments));
  }

  Ok(
    fragments
      .iter()
      .map(|fragment| format!("/* {} */\n{}", fragment.path, fragment.contents))
      .collect::<Vec<_>>()
      .join("\n\n"),
  )
}

/// Join fragment contents with all `@import` rules first, in fragment order.
fn hoist_imports(fragments: &[CssFragment]) -> String {
  let pattern = import_rule_pattern();
  let mut imports = Vec::new();
  let mut bodies = Vec::with_capacity(fragments.len());
  for fragment in fragments {
    imports.extend(
      pattern
        .find_iter(&fragment.contents)
        .map(|rule| rule.as_str().to_string()),
    );
    bodies.push(pattern.replace_all(&fragment.contents, "").into_owned());
  }
  imports.into_iter().chain(bodies).collect::<Vec<_>>().join("\n")
}

//! Bundling orchestrator tying resolution, merging and the external collaborators together.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::build_config;
use crate::css::{
  CssMinifier, LightningMinifier, collect_css_files, concatenate_with, read_css_files,
  rewrite_urls,
};
use crate::error::{BundleError, BundleResult};
use crate::hooks::{BundleHooks, ModuleSelection};
use crate::loaders::{copy_loaders, remove_loaders};
use crate::models::{BundleConfig, CssBundleOutput, CssFragment, JsBundleOutput};
use crate::optimizer::{RequireJsOptimizer, ScriptOptimizer};
use crate::options::BundleOptions;

/// High-level helper producing the JS and CSS bundles for one application.
///
/// At most one run per application root should be active at a time; the loader shims and
/// bundle files are written without locking.
pub struct Bundler {
  options: BundleOptions,
  hooks: BundleHooks,
  optimizer: Box<dyn ScriptOptimizer>,
  minifier: Box<dyn CssMinifier>,
}

impl Bundler {
  /// Create a bundler with default hooks and collaborators.
  ///
  /// `includeModules`/`excludeModules` from the options become the include filter.
  pub fn new(options: BundleOptions) -> Self {
    let mut hooks = BundleHooks::default();
    let selection = ModuleSelection::new(
      options.include_modules.iter().cloned(),
      options.exclude_modules.iter().cloned(),
    );
    if !selection.is_unfiltered() {
      hooks.include_filter = Box::new(selection);
    }
    let optimizer = RequireJsOptimizer::new(options.optimizer_command.clone());

    Self {
      options,
      hooks,
      optimizer: Box::new(optimizer),
      minifier: Box::new(LightningMinifier),
    }
  }

  /// Replace the caller hooks.
  pub fn with_hooks(mut self, hooks: BundleHooks) -> Self {
    self.hooks = hooks;
    self
  }

  /// Replace the JS optimizer.
  pub fn with_optimizer(mut self, optimizer: impl ScriptOptimizer + 'static) -> Self {
    self.optimizer = Box::new(optimizer);
    self
  }

  /// Replace the CSS minifier.
  pub fn with_minifier(mut self, minifier: impl CssMinifier + 'static) -> Self {
    self.minifier = Box::new(minifier);
    self
  }

  /// Options this bundler runs with.
  pub fn options(&self) -> &BundleOptions {
    &self.options
  }

  /// Build the optimizer configuration without touching the application tree.
  pub fn config(&self) -> BundleResult<BundleConfig> {
    build_config(&self.options, self.hooks.include_filter.as_ref())
  }

  /// Produce the JS bundle.
  ///
  /// The loader shims are installed for the duration of the run and removed afterwards, even
  /// when the optimizer fails. An optimizer failure takes precedence over a cleanup failure.
  pub fn bundle_js(&self) -> BundleResult<JsBundleOutput> {
    let app_root = self.options.app_path.as_path();
    copy_loaders(&self.options.lazo_path, app_root)?;

    let result = self.config().and_then(|config| {
      let response = self.optimizer.optimize(&config)?;
      Ok(JsBundleOutput {
        out: PathBuf::from(config.out),
        response,
      })
    });
    let cleanup = remove_loaders(app_root);

    let output = result?;
    cleanup?;
    tracing::info!("wrote JS bundle to {}", output.out.display());
    Ok(output)
  }

  /// Collect, rewrite and concatenate the application's stylesheets.
  pub fn css_bundle(&self) -> BundleResult<(Vec<String>, String)> {
    let files = collect_css_files(
      &self.options,
      self.hooks.css_filter.as_ref(),
      self.hooks.css_ordering.as_ref(),
    )?;
    let fragments: Vec<CssFragment> = read_css_files(&self.options.app_path, &files)?
      .into_iter()
      .map(|fragment| {
        let contents = rewrite_urls(&fragment.contents, &fragment.path);
        CssFragment { contents, ..fragment }
      })
      .collect();

    let css = concatenate_with(&fragments, self.options.minify_css, self.minifier.as_ref())?;
    Ok((files, css))
  }

  /// Produce the CSS bundle, replacing any previous bundle only once the new one is complete.
  pub fn bundle_css(&self) -> BundleResult<CssBundleOutput> {
    let (files, css) = self.css_bundle()?;
    let out = self.options.css_out_path();
    write_atomically(&out, &css)?;

    tracing::info!(
      "wrote CSS bundle to {} ({} stylesheets, {} bytes)",
      out.display(),
      files.len(),
      css.len()
    );
    Ok(CssBundleOutput {
      out,
      files,
      bytes: css.len(),
    })
  }

  /// Produce both bundles as one run.
  ///
  /// The CSS bundle is assembled in memory first and only written once the JS optimizer has
  /// succeeded, so a failure on either side leaves no new artifact from this run.
  pub fn bundle_all(&self) -> BundleResult<(JsBundleOutput, CssBundleOutput)> {
    let (files, css) = self.css_bundle()?;
    let js = self.bundle_js()?;

    let out = self.options.css_out_path();
    write_atomically(&out, &css)?;
    tracing::info!("wrote CSS bundle to {} ({} stylesheets)", out.display(), files.len());
    Ok((js, CssBundleOutput {
      out,
      files,
      bytes: css.len(),
    }))
  }
}

impl std::fmt::Debug for Bundler {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Bundler")
      .field("options", &self.options)
      .finish_non_exhaustive()
  }
}

fn write_atomically(path: &Path, contents: &str) -> BundleResult<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(|err| BundleError::io(parent, err))?;
  }

  let mut staging = path.as_os_str().to_owned();
  staging.push(format!(".{}.tmp", std::process::id()));
  let staging = PathBuf::from(staging);

  let result = fs::write(&staging, contents).and_then(|_| fs::rename(&staging, path));
  if let Err(err) = result {
    let _ = fs::remove_file(&staging);
    return Err(BundleError::io(path, err));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn atomic_write_creates_parents_and_replaces() -> std::io::Result<()> {
    let temp = tempdir()?;
    let out = temp.path().join("app/bundles/application.css");

    write_atomically(&out, "a{}").unwrap();
    write_atomically(&out, "b{}").unwrap();

    assert_eq!(fs::read_to_string(&out)?, "b{}");
    let leftovers: Vec<_> = fs::read_dir(out.parent().unwrap())?
      .flatten()
      .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
      .collect();
    assert!(leftovers.is_empty());
    Ok(())
  }

  #[test]
  fn option_scopes_become_the_include_filter() {
    let options = BundleOptions {
      exclude_modules: vec!["components/admin".into()],
      ..BundleOptions::default()
    };
    let bundler = Bundler::new(options);
    let kept = bundler.hooks.include_filter.filter(vec![
      crate::models::IncludeEntry::Module("components/admin/controller".into()),
      crate::models::IncludeEntry::Module("components/home/controller".into()),
    ]);
    assert_eq!(kept.len(), 1);
  }
}

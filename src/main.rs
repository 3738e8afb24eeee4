//! Command-line entry point for bundling a component application.
//!
//! Usage:
//!   component-bundler js              Build the JS bundle
//!   component-bundler css             Build the CSS bundle
//!   component-bundler all             Build both bundles
//!   component-bundler config          Print the merged optimizer configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use component_bundler::{BundleOptions, Bundler};

#[derive(Parser)]
#[command(name = "component-bundler")]
#[command(about = "Bundle a component application into one JS and one CSS file", long_about = None)]
#[command(version)]
struct Cli {
  #[command(subcommand)]
  command: Commands,

  /// Directory containing `bundler.config.json`
  #[arg(long, global = true, default_value = ".")]
  config_dir: PathBuf,

  /// Application root to scan
  #[arg(long, global = true)]
  app_path: Option<PathBuf>,

  /// Framework root
  #[arg(long, global = true)]
  lazo_path: Option<PathBuf>,

  /// CSS bundle path, relative to the application root
  #[arg(long, global = true)]
  css_out: Option<String>,

  /// JS bundle path, relative to the application root
  #[arg(long, global = true)]
  js_out: Option<String>,

  /// Skip CSS minification
  #[arg(long, global = true)]
  no_minify_css: bool,

  /// Log filter used when RUST_LOG is unset
  #[arg(long, global = true, default_value = "info")]
  log_level: String,
}

#[derive(Subcommand)]
enum Commands {
  /// Build the JS bundle through the optimizer
  Js,
  /// Build the CSS bundle
  Css,
  /// Build both bundles
  All,
  /// Print the merged optimizer configuration as JSON
  Config,
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(&cli.log_level);

  let bundler = Bundler::new(resolve_options(&cli));

  match cli.command {
    Commands::Js => {
      let output = bundler.bundle_js().context("JS bundling failed")?;
      println!("{}", output.out.display());
    }
    Commands::Css => {
      let output = bundler.bundle_css().context("CSS bundling failed")?;
      println!("{}", output.out.display());
    }
    Commands::All => {
      let (js, css) = bundler.bundle_all().context("bundling failed")?;
      println!("{}", js.out.display());
      println!("{}", css.out.display());
    }
    Commands::Config => {
      let config = bundler
        .config()
        .context("failed to build optimizer configuration")?;
      println!("{}", serde_json::to_string_pretty(&config)?);
    }
  }

  Ok(())
}

fn resolve_options(cli: &Cli) -> BundleOptions {
  let mut options = BundleOptions::discover(&cli.config_dir);
  if let Some(app_path) = &cli.app_path {
    options.app_path = app_path.clone();
  }
  if let Some(lazo_path) = &cli.lazo_path {
    options.lazo_path = lazo_path.clone();
  }
  if let Some(css_out) = &cli.css_out {
    options.css_out = css_out.clone();
  }
  if let Some(js_out) = &cli.js_out {
    options.js_out = js_out.clone();
  }
  if cli.no_minify_css {
    options.minify_css = false;
  }
  options
}

fn init_logging(level: &str) {
  use tracing_subscriber::{EnvFilter, fmt, prelude::*};

  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(level))
    .unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(filter)
    .try_init()
    .ok();
}

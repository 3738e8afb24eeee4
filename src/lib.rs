#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod bundler;
pub mod config;
pub mod css;
pub mod discovery;
pub mod error;
pub mod hooks;
pub mod includes;
pub mod loaders;
pub mod manifest;
pub mod models;
pub mod optimizer;
pub mod options;
pub mod paths;

pub use bundler::Bundler;
pub use error::{BundleError, BundleResult};
pub use hooks::{BundleHooks, CssFilter, CssOrdering, IncludeFilter, ModuleSelection};
pub use models::{BundleConfig, CssFragment, IncludeEntry, ModuleTarget, PathTable};
pub use options::BundleOptions;

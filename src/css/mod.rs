//! Stylesheet collection, URL rewriting and concatenation.
//!
//! The submodules are split along the pipeline so each stage can be tested on its own:
//! collecting root-relative paths, rewriting `url(...)` references against each file's
//! directory, and folding the fragments into one bundle.

mod collect;
mod concat;
mod urls;

pub use collect::{collect_css_files, read_css_files};
pub use concat::{CssMinifier, LightningMinifier, concatenate, concatenate_with};
pub use urls::{resolve_relative, rewrite_urls, should_ignore_url};

//! Merging of independently built documentation sites.
//!
//! Takes several pre-rendered static sites and welds them into one tree:
//! each site is copied under its mount path, every page gets a shared
//! navigation bar, stylesheet and runtime script spliced into its DOM, and
//! an optional search back end indexes the combined result.
//!
//! A merge runs in a fixed order, driven by [`Merger`]:
//!
//! 1. sources are staged into a temporary tree next to the output path,
//!    with a root redirect page pointing at the first source;
//! 2. the [`Injector`] walks every staged page and splices in the chrome;
//! 3. the search engine, when one is configured, builds its artifacts over
//!    the injected tree;
//! 4. the staging tree is renamed to the output path.
//!
//! Nothing is ever written to the output path until step 4, so a failed
//! merge leaves no partial site behind.
//!
//! ```no_run
//! # fn main() -> Result<(), docweld_merge::MergeError> {
//! use docweld_merge::{DocSource, MergeConfig, Merger};
//!
//! let sources = vec![
//!     DocSource::new("/builds/appliance/site", "appliance", "Appliance"),
//!     DocSource::new("/builds/cloud/site", "cloud", "Cloud"),
//! ];
//! let mut config = MergeConfig::new(sources, "public");
//! config.pretty_urls = true;
//!
//! let report = Merger::new(config).merge()?;
//! assert!(report.warnings.is_empty());
//! # Ok(())
//! # }
//! ```

mod inject;
mod navigation;
mod pipeline;
mod source;
mod staging;
mod util;

pub use inject::{Injector, MergeReport, PageWarning};
pub use pipeline::{MergeConfig, MergeError, Merger};
pub use source::{BrandImage, DocSource, SourceError};
pub use staging::StagingError;

/// Tree-relative directory user assets are copied into. Reserved; no
/// source may mount at or below it.
pub const ASSETS_DIR: &str = "assets";

/// Tree-relative directory holding the engine-owned assets.
pub const DEFAULT_ASSET_DIR: &str = "assets/__default";

/// Filename of the stylesheet injected into every page.
pub const DEFAULT_STYLESHEET: &str = "docweld.css";

/// Filename of the shared runtime script. The injection walk appends the
/// page behavior to this file wherever it sits in the tree.
pub const RUNTIME_SCRIPT: &str = "docweld.js";

/// Attribute upstream renderers put on the content wrapper of pages that
/// should receive the navigation bar.
pub const DEFAULT_MARKER_ATTR: &str = "data-docweld-content";

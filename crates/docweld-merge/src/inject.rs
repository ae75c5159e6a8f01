//! DOM injection over a staged tree.
//!
//! After staging, every page still looks like the site it came from. The
//! [`Injector`] walks the tree and splices the shared chrome into each HTML
//! page: stylesheet and script references into `<head>`, the navigation bar
//! as the first child of `<body>`. Pages are parsed leniently, so malformed
//! markup from upstream renderers is normalized rather than rejected.

use std::fs;
use std::io;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use docweld_dom::{
    Handle, append_child, create_element, first_content_child, has_attribute, is_element,
    parse_html, prepend_child, serialize_html,
};
use docweld_search::SearchConfig;
use rayon::prelude::*;

use crate::navigation::{NavContext, build_navigation};
use crate::pipeline::MergeConfig;
use crate::source::{BrandImage, DocSource};
use crate::util::resolve_ref;
use crate::{DEFAULT_ASSET_DIR, DEFAULT_STYLESHEET, RUNTIME_SCRIPT};

/// Page behavior appended to the staged runtime script. Kept textual so the
/// base file stays a plain asset until the tree is actually merged.
const INJECTOR_SCRIPT: &str = r#"
(function () {
  "use strict";
  document.addEventListener("click", function (event) {
    var toggle = event.target.closest(".docweld-nav-toggle");
    if (!toggle) {
      return;
    }
    var nav = toggle.closest(".docweld-nav");
    if (nav) {
      nav.classList.toggle("docweld-nav-open");
    }
  });
})();
"#;

/// Each page takes exactly one head insertion and one body insertion; the
/// traversal stops as soon as both happened.
const MAX_INJECTIONS: u8 = 2;

/// A per-page problem that did not abort the merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageWarning {
    /// The body's first content child lacks the marker attribute, so the
    /// page got styles and scripts but no navigation bar.
    MarkerMissing { page: String },
    /// The page could not be read, serialized or written back.
    Io { page: String, error: String },
}

impl PageWarning {
    /// Tree-relative path of the page the warning is about.
    #[must_use]
    pub fn page(&self) -> &str {
        match self {
            Self::MarkerMissing { page } | Self::Io { page, .. } => page,
        }
    }
}

impl std::fmt::Display for PageWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MarkerMissing { page } => {
                write!(f, "{page}: no content marker, navigation not injected")
            }
            Self::Io { page, error } => write!(f, "{page}: {error}"),
        }
    }
}

/// What the injection walk did to a staged tree.
#[derive(Debug, Default)]
pub struct MergeReport {
    /// Pages parsed, injected and rewritten in place.
    pub pages_injected: usize,
    /// Files the walk meant to update but could not.
    pub pages_skipped: usize,
    /// Per-page problems, in tree order. Never fatal.
    pub warnings: Vec<PageWarning>,
}

enum Outcome {
    Injected(Option<PageWarning>),
    Skipped(PageWarning),
    Ignored,
}

/// Walks a staged tree and splices the shared chrome into every page.
///
/// The injector is built once per merge and shared across worker threads;
/// each page's DOM lives and dies on the thread that processes it. Running
/// it twice over the same tree inserts the chrome twice, which is why the
/// merge pipeline always hands it a freshly staged tree.
#[derive(Debug)]
pub struct Injector {
    sources: Vec<DocSource>,
    brand: Option<BrandImage>,
    search: Option<SearchConfig>,
    pretty_urls: bool,
    marker_attr: String,
    /// Stylesheet references, tree-root relative, in head insertion order.
    styles: Vec<String>,
    /// Script references, tree-root relative, in head insertion order.
    scripts: Vec<String>,
}

impl Injector {
    /// Assemble the injector from a merge configuration. The engine-owned
    /// references come first, then the user-configured ones, then whatever
    /// the search engine contributes.
    #[must_use]
    pub fn new(config: &MergeConfig) -> Self {
        let mut styles = vec![format!("{DEFAULT_ASSET_DIR}/{DEFAULT_STYLESHEET}")];
        styles.extend(config.styles.iter().cloned());
        let mut scripts = vec![format!("{DEFAULT_ASSET_DIR}/{RUNTIME_SCRIPT}")];
        scripts.extend(config.scripts.iter().cloned());
        if let Some(search) = &config.search {
            search.engine.contribute_styles(&mut styles);
            search.engine.contribute_scripts(&mut scripts);
        }
        Self {
            sources: config.sources.clone(),
            brand: config.brand.clone(),
            search: config.search.clone(),
            pretty_urls: config.pretty_urls,
            marker_attr: config.marker_attr.clone(),
            styles,
            scripts,
        }
    }

    /// Inject every page under `root`, rewriting files in place.
    ///
    /// Pages are processed in parallel but reported in tree order. A page
    /// that cannot be processed is left untouched and recorded in the
    /// report; only a failure to list the tree itself is an error.
    ///
    /// # Errors
    ///
    /// Returns an error when a directory in the tree cannot be read.
    pub fn run(&self, root: &Path) -> io::Result<MergeReport> {
        let mut files = Vec::new();
        walk_tree(root, root, &mut files)?;
        files.sort();

        let outcomes: Vec<Outcome> = files
            .par_iter()
            .map(|(relative, path)| self.process(relative, path))
            .collect();

        let mut report = MergeReport::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Injected(warning) => {
                    report.pages_injected += 1;
                    report.warnings.extend(warning);
                }
                Outcome::Skipped(warning) => {
                    report.pages_skipped += 1;
                    report.warnings.push(warning);
                }
                Outcome::Ignored => {}
            }
        }
        Ok(report)
    }

    fn process(&self, relative: &str, path: &Path) -> Outcome {
        // The root redirect is engine-owned and needs no chrome.
        if relative == "index.html" {
            return Outcome::Ignored;
        }
        if relative.rsplit('/').next() == Some(RUNTIME_SCRIPT) {
            return match append_runtime(path) {
                Ok(()) => Outcome::Ignored,
                Err(error) => {
                    tracing::warn!(page = %relative, error = %error, "Failed to extend runtime script");
                    Outcome::Skipped(PageWarning::Io {
                        page: relative.to_owned(),
                        error: error.to_string(),
                    })
                }
            };
        }
        if !is_html(path) {
            return Outcome::Ignored;
        }
        self.inject_page(relative, path)
    }

    fn inject_page(&self, relative: &str, path: &Path) -> Outcome {
        let skipped = |error: &dyn std::fmt::Display| {
            tracing::warn!(page = %relative, error = %error, "Skipping page");
            Outcome::Skipped(PageWarning::Io {
                page: relative.to_owned(),
                error: error.to_string(),
            })
        };

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(error) => return skipped(&error),
        };
        let dom = parse_html(&bytes);

        let styles: Vec<String> = self.styles.iter().map(|r| resolve_ref(relative, r)).collect();
        let scripts: Vec<String> = self.scripts.iter().map(|r| resolve_ref(relative, r)).collect();

        let mut injections = 0;
        let mut marker_warning = None;
        self.visit(
            &dom.document,
            relative,
            &styles,
            &scripts,
            &mut injections,
            &mut marker_warning,
        );

        let rewritten = match serialize_html(&dom) {
            Ok(bytes) => bytes,
            Err(error) => return skipped(&error),
        };
        if let Err(error) = fs::write(path, rewritten) {
            return skipped(&error);
        }
        Outcome::Injected(marker_warning)
    }

    /// Pre-order walk injecting into the first `<head>` and `<body>` seen.
    fn visit(
        &self,
        node: &Handle,
        page: &str,
        styles: &[String],
        scripts: &[String],
        injections: &mut u8,
        marker_warning: &mut Option<PageWarning>,
    ) {
        if is_element(node, "head") {
            for href in styles {
                let link = create_element("link", &[("rel", "stylesheet"), ("href", href)]);
                append_child(node, link);
            }
            // Prepending each script in turn reverses their order in the
            // serialized head; later-configured scripts end up closest to
            // the top.
            for src in scripts {
                prepend_child(node, create_element("script", &[("src", src)]));
            }
            *injections += 1;
        } else if is_element(node, "body") {
            match first_content_child(node) {
                Some(first) if has_attribute(&first, &self.marker_attr) => {
                    let ctx = NavContext {
                        sources: &self.sources,
                        brand: self.brand.as_ref(),
                        search: self.search.as_ref(),
                        pretty_urls: self.pretty_urls,
                    };
                    prepend_child(node, build_navigation(&ctx, page));
                    *injections += 1;
                }
                _ => {
                    if marker_warning.is_none() {
                        tracing::warn!(
                            page = %page,
                            marker = %self.marker_attr,
                            "No content marker, navigation not injected"
                        );
                        *marker_warning = Some(PageWarning::MarkerMissing {
                            page: page.to_owned(),
                        });
                    }
                }
            }
        }

        if *injections >= MAX_INJECTIONS {
            return;
        }
        for child in node.children.borrow().iter() {
            self.visit(child, page, styles, scripts, injections, marker_warning);
            if *injections >= MAX_INJECTIONS {
                return;
            }
        }
    }
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
}

fn append_runtime(path: &Path) -> io::Result<()> {
    let mut file = fs::OpenOptions::new().append(true).open(path)?;
    file.write_all(INJECTOR_SCRIPT.as_bytes())
}

/// Collect regular files under `base` as (relative path, absolute path)
/// pairs with forward-slash relative paths. Symlinks are never followed.
fn walk_tree(base: &Path, current: &Path, files: &mut Vec<(String, PathBuf)>) -> io::Result<()> {
    for entry in fs::read_dir(current)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            continue;
        }
        let path = entry.path();
        if file_type.is_dir() {
            walk_tree(base, &path, files)?;
        } else if file_type.is_file() {
            let relative = path
                .strip_prefix(base)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            files.push((relative, path));
        }
    }
    Ok(())
}

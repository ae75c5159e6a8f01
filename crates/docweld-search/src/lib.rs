//! Pluggable search back ends for merged documentation trees.
//!
//! A merged site gets exactly one [`SearchEngine`], chosen from
//! configuration. The engine participates in three phases of a merge:
//! it contributes script and stylesheet references that the injector
//! weaves into every page, it renders its widget markup into each
//! navigation fragment, and once the whole tree is staged and injected
//! it builds whatever persisted index artifacts it needs under the
//! tree root.
//!
//! Two engines ship with the crate:
//!
//! - [`JsonIndexEngine`] walks the indexed doc versions and writes one
//!   JSON index per version plus a small client-side lookup script.
//! - [`ExternalIndexEngine`] shells out to an indexer binary and lets
//!   it do whatever it wants with the tree.
//!
//! ```ignore
//! let config = SearchConfig::new(
//!     vec!["appliance".into()],
//!     Arc::new(JsonIndexEngine),
//! );
//! config.engine.build_index(tree_root, &config.versions)?;
//! ```

use std::path::Path;
use std::process::ExitStatus;
use std::sync::Arc;

use docweld_dom::Handle;

mod external;
mod json;

pub use external::ExternalIndexEngine;
pub use json::JsonIndexEngine;

/// Errors raised while building a persisted search index.
///
/// Index construction runs after every page has been staged and
/// injected, and a failure here aborts the whole merge: shipping a
/// site whose search box returns nothing is worse than shipping no
/// site at all.
#[derive(Debug, thiserror::Error)]
pub enum SearchIndexError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize search index: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Indexed version `{0}` does not exist in the merged tree")]
    MissingVersion(String),

    #[error("Failed to run indexer `{program}`: {source}")]
    IndexerSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Indexer `{program}` exited with {status}")]
    IndexerFailed { program: String, status: ExitStatus },
}

/// Search configuration resolved from the merge config file.
#[derive(Clone)]
pub struct SearchConfig {
    /// Mount names of the doc versions whose pages feed the index.
    /// Always a subset of the mounts present in the merged tree.
    pub versions: Vec<String>,
    /// The engine driving widget markup, page assets and indexing.
    pub engine: Arc<dyn SearchEngine>,
}

impl SearchConfig {
    #[must_use]
    pub fn new(versions: Vec<String>, engine: Arc<dyn SearchEngine>) -> Self {
        Self { versions, engine }
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("versions", &self.versions)
            .field("engine", &self.engine.name())
            .finish()
    }
}

/// A search back end for a merged documentation tree.
///
/// Implementations must be thread safe: pages are injected in
/// parallel and each worker calls [`render_widget`] for the page it
/// owns.
///
/// [`render_widget`]: SearchEngine::render_widget
pub trait SearchEngine: Send + Sync {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &'static str;

    /// Appends or prepends engine script references to the list the
    /// injector weaves into every page head. References are tree-root
    /// relative and get relativized per page.
    fn contribute_scripts(&self, scripts: &mut Vec<String>) {
        let _ = scripts;
    }

    /// Same as [`contribute_scripts`] for stylesheet references.
    ///
    /// [`contribute_scripts`]: SearchEngine::contribute_scripts
    fn contribute_styles(&self, styles: &mut Vec<String>) {
        let _ = styles;
    }

    /// Renders the engine's widget markup into a navigation fragment.
    /// Called once per injected page, after the doc links and before
    /// the collapse toggle.
    fn render_widget(&self, nav: &Handle);

    /// Builds the persisted index artifacts under `root`, the merged
    /// tree root. Runs once, strictly after all pages are staged and
    /// injected, so the indexed pages are the pages that ship.
    fn build_index(&self, root: &Path, versions: &[String]) -> Result<(), SearchIndexError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DummyEngine;

    impl SearchEngine for DummyEngine {
        fn name(&self) -> &'static str {
            "dummy"
        }

        fn render_widget(&self, _nav: &Handle) {}

        fn build_index(&self, _root: &Path, _versions: &[String]) -> Result<(), SearchIndexError> {
            Ok(())
        }
    }

    #[test]
    fn contributions_default_to_empty() {
        let engine = DummyEngine;
        let mut scripts = Vec::new();
        let mut styles = Vec::new();
        engine.contribute_scripts(&mut scripts);
        engine.contribute_styles(&mut styles);
        assert!(scripts.is_empty());
        assert!(styles.is_empty());
    }

    #[test]
    fn config_debug_names_the_engine() {
        let config = SearchConfig::new(vec!["v1".to_owned()], Arc::new(DummyEngine));
        let rendered = format!("{config:?}");
        assert!(rendered.contains("dummy"));
        assert!(rendered.contains("v1"));
    }
}

//! The merge pipeline.
//!
//! [`Merger`] drives a full merge: validate the sources, stage everything
//! into a temporary tree next to the output path, inject every page, let the
//! search engine build its index, then rename the staging tree into place.
//! Any failure before the rename leaves the filesystem as it was; the output
//! path either holds a complete merged site or nothing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use docweld_search::{SearchConfig, SearchIndexError};

use crate::inject::{Injector, MergeReport};
use crate::source::{BrandImage, DocSource};
use crate::staging::StagingError;
use crate::{DEFAULT_MARKER_ATTR, source, staging};

/// Everything a merge needs. Only sources and the output path are
/// mandatory; the rest defaults to a bare site without branding, extra
/// assets or search.
#[derive(Debug)]
pub struct MergeConfig {
    /// Sites to merge, in navigation bar order. The first source is the
    /// target of the root redirect.
    pub sources: Vec<DocSource>,
    /// Where the merged tree ends up. Must not exist yet.
    pub output_dir: PathBuf,
    /// Link between sites with directory URLs instead of explicit
    /// `index.html` suffixes.
    pub pretty_urls: bool,
    /// Branding shown at the left edge of the navigation bar.
    pub brand: Option<BrandImage>,
    /// Directory copied to `assets/` at the tree root.
    pub assets_dir: Option<PathBuf>,
    /// Extra stylesheet references injected into every page, tree-root
    /// relative unless absolute.
    pub styles: Vec<String>,
    /// Extra script references injected into every page.
    pub scripts: Vec<String>,
    /// Search back end; `None` disables search entirely.
    pub search: Option<SearchConfig>,
    /// Attribute marking injectable page content.
    pub marker_attr: String,
}

impl MergeConfig {
    #[must_use]
    pub fn new(sources: Vec<DocSource>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            output_dir: output_dir.into(),
            pretty_urls: false,
            brand: None,
            assets_dir: None,
            styles: Vec::new(),
            scripts: Vec::new(),
            search: None,
            marker_attr: DEFAULT_MARKER_ATTR.to_owned(),
        }
    }
}

/// Errors that abort a merge. None of them leave a partial output tree
/// behind.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error(transparent)]
    Source(#[from] source::SourceError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error("Search indexing failed: {0}")]
    SearchIndex(#[from] SearchIndexError),

    #[error("Output directory already exists: {}", .0.display())]
    OutputExists(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Runs the merge pipeline for one configuration.
#[derive(Debug)]
pub struct Merger {
    config: MergeConfig,
}

impl Merger {
    #[must_use]
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Merge the configured sources into the output directory.
    ///
    /// # Errors
    ///
    /// Fails when the source set is invalid, the output path already
    /// exists, a source cannot be staged, or the search engine cannot
    /// build its index. The staging tree is discarded on failure.
    pub fn merge(&self) -> Result<MergeReport, MergeError> {
        let config = &self.config;
        source::validate_sources(&config.sources)?;
        if config.output_dir.exists() {
            return Err(MergeError::OutputExists(config.output_dir.clone()));
        }

        // Staging lives next to the output so the final move is a rename
        // on the same filesystem.
        let parent = output_parent(&config.output_dir);
        fs::create_dir_all(&parent)?;
        let staging_dir = tempfile::Builder::new()
            .prefix(".docweld-")
            .tempdir_in(&parent)?;
        let root = staging_dir.path();

        staging::stage_sources(root, &config.sources, config.pretty_urls)?;
        if let Some(assets_dir) = &config.assets_dir {
            staging::copy_user_assets(root, assets_dir)?;
        }
        staging::install_default_assets(root)?;

        let injector = Injector::new(config);
        let report = injector.run(root)?;

        if let Some(search) = &config.search {
            search.engine.build_index(root, &search.versions)?;
        }

        fs::rename(root, &config.output_dir)?;
        let _ = staging_dir.keep();

        tracing::info!(
            pages = report.pages_injected,
            skipped = report.pages_skipped,
            warnings = report.warnings.len(),
            output = %config.output_dir.display(),
            "Merged documentation tree"
        );
        Ok(report)
    }
}

fn output_parent(output_dir: &Path) -> PathBuf {
    match output_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use docweld_search::{ExternalIndexEngine, JsonIndexEngine};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::inject::PageWarning;

    fn write_file(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn marked_page(title: &str) -> String {
        format!(
            "<!DOCTYPE html><html><head><title>{title}</title></head>\
             <body><div data-docweld-content=\"\"><h1>{title}</h1></div></body></html>"
        )
    }

    /// Two small sites mounted at `a` and `b`.
    fn two_source_config(dir: &Path, output: &Path) -> MergeConfig {
        write_file(&dir.join("site-a/index.html"), &marked_page("A Home"));
        write_file(&dir.join("site-a/guide/setup.html"), &marked_page("A Setup"));
        write_file(&dir.join("site-b/index.html"), &marked_page("B Home"));
        write_file(&dir.join("site-b/sub/deep/page.html"), &marked_page("B Deep"));
        let sources = vec![
            DocSource::new(dir.join("site-a"), "a", "A Docs"),
            DocSource::new(dir.join("site-b"), "b", "B Docs"),
        ];
        MergeConfig::new(sources, output)
    }

    fn tree_snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
        fn walk(base: &Path, dir: &Path, out: &mut BTreeMap<String, Vec<u8>>) {
            for entry in fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    walk(base, &path, out);
                } else {
                    let relative = path
                        .strip_prefix(base)
                        .unwrap()
                        .to_string_lossy()
                        .replace('\\', "/");
                    out.insert(relative, fs::read(&path).unwrap());
                }
            }
        }
        let mut out = BTreeMap::new();
        walk(root, root, &mut out);
        out
    }

    #[test]
    fn merges_two_sources_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("site");
        let mut config = two_source_config(tmp.path(), &output);
        config.pretty_urls = true;

        let report = Merger::new(config).merge().unwrap();

        assert_eq!(report.pages_injected, 4);
        assert_eq!(report.pages_skipped, 0);
        assert!(report.warnings.is_empty());

        // Root redirect points at the first source.
        let redirect = fs::read_to_string(output.join("index.html")).unwrap();
        assert!(redirect.contains("url=./a/"));

        // Engine assets are installed.
        assert!(output.join("assets/__default/docweld.css").exists());
        let runtime = fs::read_to_string(output.join("assets/__default/docweld.js")).unwrap();
        assert!(runtime.contains("docweld-nav-open"));

        // Every page carries the bar with the right link active.
        let page_a = fs::read_to_string(output.join("a/index.html")).unwrap();
        assert!(page_a.contains("docweld-nav"));
        assert!(page_a.contains(r#"class="active">A Docs"#));
        assert!(!page_a.contains(r#"class="active">B Docs"#));
        assert!(page_a.contains(r#"href="../b/""#));

        let page_b = fs::read_to_string(output.join("b/sub/deep/page.html")).unwrap();
        assert!(page_b.contains(r#"class="active">B Docs"#));
        assert!(page_b.contains(r#"href="../../../a/""#));
        assert!(page_b.contains(r#"href="../../../assets/__default/docweld.css""#));
    }

    #[test]
    fn default_urls_keep_index_suffix() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("site");
        let config = two_source_config(tmp.path(), &output);

        Merger::new(config).merge().unwrap();

        let page_a = fs::read_to_string(output.join("a/index.html")).unwrap();
        assert!(page_a.contains(r#"href="../b/index.html""#));
        let redirect = fs::read_to_string(output.join("index.html")).unwrap();
        assert!(redirect.contains("url=./a/index.html"));
    }

    #[test]
    fn disabled_search_leaves_no_trace() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("site");
        let config = two_source_config(tmp.path(), &output);

        Merger::new(config).merge().unwrap();

        let page = fs::read_to_string(output.join("a/index.html")).unwrap();
        assert!(!page.contains("docweld-search"));
        assert!(!page.contains("search.js"));
        assert!(!output.join("assets/__default/search").exists());
        assert!(!output.join("assets/__default/search.js").exists());
    }

    #[test]
    fn json_search_builds_index_and_widget() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("site");
        let mut config = two_source_config(tmp.path(), &output);
        config.search = Some(SearchConfig::new(
            vec!["a".to_owned(), "b".to_owned()],
            Arc::new(JsonIndexEngine),
        ));

        Merger::new(config).merge().unwrap();

        assert!(output.join("assets/__default/search/a.json").exists());
        assert!(output.join("assets/__default/search/b.json").exists());
        assert!(output.join("assets/__default/search/versions.json").exists());

        let page = fs::read_to_string(output.join("a/index.html")).unwrap();
        assert!(page.contains("docweld-search-input"));
        assert!(page.contains("search.js"));

        // The index saw the injected pages, i.e. it ran after injection.
        let index = fs::read_to_string(output.join("assets/__default/search/a.json")).unwrap();
        assert!(index.contains("A Docs"));
    }

    #[test]
    fn search_failure_aborts_without_output() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("site");
        let mut config = two_source_config(tmp.path(), &output);
        config.search = Some(SearchConfig::new(
            vec!["a".to_owned()],
            Arc::new(ExternalIndexEngine::new("docweld-no-such-indexer")),
        ));

        let err = Merger::new(config).merge().unwrap_err();

        assert!(matches!(err, MergeError::SearchIndex(_)));
        assert!(!output.exists());
        // The staging tree is gone too.
        let leftovers: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(".docweld-"))
            .collect();
        assert_eq!(leftovers, Vec::<String>::new());
    }

    #[test]
    fn missing_source_aborts_without_output() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("site");
        let sources = vec![DocSource::new(tmp.path().join("nope"), "a", "A")];
        let config = MergeConfig::new(sources, &output);

        let err = Merger::new(config).merge().unwrap_err();

        assert!(matches!(err, MergeError::Staging(StagingError::SourceMissing(_))));
        assert!(!output.exists());
    }

    #[test]
    fn invalid_sources_fail_before_touching_the_filesystem() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("deliberately/nested/site");
        let sources = vec![
            DocSource::new(tmp.path().join("x"), "docs", "One"),
            DocSource::new(tmp.path().join("y"), "docs", "Two"),
        ];

        let err = Merger::new(MergeConfig::new(sources, &output)).merge().unwrap_err();

        assert!(matches!(err, MergeError::Source(source::SourceError::DuplicateMount(_))));
        assert!(!tmp.path().join("deliberately").exists());
    }

    #[test]
    fn refuses_existing_output_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("site");
        fs::create_dir_all(&output).unwrap();
        let config = two_source_config(tmp.path(), &output);

        let err = Merger::new(config).merge().unwrap_err();
        assert!(matches!(err, MergeError::OutputExists(path) if path == output));
    }

    #[test]
    fn user_assets_are_copied_alongside_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("site");
        write_file(&tmp.path().join("extra/logo.svg"), "<svg/>");
        let mut config = two_source_config(tmp.path(), &output);
        config.assets_dir = Some(tmp.path().join("extra"));
        config.brand = Some(BrandImage::new("a/index.html", "assets/logo.svg"));

        Merger::new(config).merge().unwrap();

        assert!(output.join("assets/logo.svg").exists());
        assert!(output.join("assets/__default/docweld.css").exists());
        let page = fs::read_to_string(output.join("b/index.html")).unwrap();
        assert!(page.contains(r#"class="docweld-brand" href="../a/index.html""#));
        assert!(page.contains(r#"src="../assets/logo.svg""#));
    }

    #[test]
    fn unmarked_pages_surface_as_warnings() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("site");
        write_file(&tmp.path().join("site-a/index.html"), &marked_page("A"));
        write_file(
            &tmp.path().join("site-a/legacy.html"),
            "<html><body><p>old</p></body></html>",
        );
        let sources = vec![DocSource::new(tmp.path().join("site-a"), "a", "A")];

        let report = Merger::new(MergeConfig::new(sources, &output)).merge().unwrap();

        assert_eq!(report.pages_injected, 2);
        assert_eq!(
            report.warnings,
            vec![PageWarning::MarkerMissing {
                page: "a/legacy.html".to_owned()
            }]
        );
    }

    #[test]
    fn fresh_runs_produce_identical_trees() {
        let tmp = tempfile::tempdir().unwrap();
        let out1 = tmp.path().join("one");
        let out2 = tmp.path().join("two");

        let mut config = two_source_config(tmp.path(), &out1);
        config.search = Some(SearchConfig::new(vec!["a".to_owned()], Arc::new(JsonIndexEngine)));
        Merger::new(config).merge().unwrap();

        let mut config = two_source_config(tmp.path(), &out2);
        config.search = Some(SearchConfig::new(vec!["a".to_owned()], Arc::new(JsonIndexEngine)));
        Merger::new(config).merge().unwrap();

        assert_eq!(tree_snapshot(&out1), tree_snapshot(&out2));
    }
}

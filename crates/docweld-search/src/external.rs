//! Search indexing delegated to an external program.
//!
//! The configured binary receives the merged tree root as its final
//! argument and owns the index format end to end. Useful when the
//! site is fronted by a search service with its own ingestion
//! tooling.

use std::path::Path;
use std::process::Command;

use docweld_dom::{Handle, append_child, create_element};

use crate::{SearchEngine, SearchIndexError};

/// Default query endpoint the widget form submits to.
const DEFAULT_QUERY_URL: &str = "/search";

/// Search engine that shells out to an indexer binary.
pub struct ExternalIndexEngine {
    program: String,
    args: Vec<String>,
    query_url: String,
}

impl ExternalIndexEngine {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            query_url: DEFAULT_QUERY_URL.to_owned(),
        }
    }

    /// Arguments passed before the merged tree root.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Endpoint the rendered widget submits queries to.
    #[must_use]
    pub fn with_query_url(mut self, query_url: impl Into<String>) -> Self {
        self.query_url = query_url.into();
        self
    }
}

impl SearchEngine for ExternalIndexEngine {
    fn name(&self) -> &'static str {
        "external"
    }

    fn render_widget(&self, nav: &Handle) {
        let form = create_element(
            "form",
            &[
                ("class", "docweld-search"),
                ("action", &self.query_url),
                ("method", "get"),
            ],
        );
        let input = create_element(
            "input",
            &[
                ("type", "search"),
                ("name", "q"),
                ("class", "docweld-search-input"),
                ("placeholder", "Search docs"),
            ],
        );
        append_child(&form, input);
        append_child(nav, form);
    }

    fn build_index(&self, root: &Path, versions: &[String]) -> Result<(), SearchIndexError> {
        for version in versions {
            if !root.join(version).is_dir() {
                return Err(SearchIndexError::MissingVersion(version.clone()));
            }
        }

        tracing::info!(program = %self.program, "Running external indexer");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(root)
            .output()
            .map_err(|source| SearchIndexError::IndexerSpawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(
                program = %self.program,
                status = %output.status,
                stderr = %stderr.trim(),
                "External indexer failed"
            );
            return Err(SearchIndexError::IndexerFailed {
                program: self.program.clone(),
                status: output.status,
            });
        }
        Ok(())
    }
}

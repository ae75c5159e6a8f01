//! `docweld merge` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use docweld_config::{CliSettings, Config, EngineKind, SearchSection};
use docweld_merge::{BrandImage, DocSource, MergeConfig, Merger};
use docweld_search::{ExternalIndexEngine, JsonIndexEngine, SearchConfig, SearchEngine};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the merge command.
#[derive(Args)]
pub(crate) struct MergeArgs {
    /// Output directory for the merged site (default: site/ next to the config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Link between sites with directory URLs instead of index.html.
    #[arg(long)]
    pretty_urls: bool,

    /// Path to configuration file (default: auto-discover docweld.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl MergeArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            output_dir: self.output_dir.clone(),
            pretty_urls: self.pretty_urls.then_some(true),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let sources: Vec<DocSource> = config
            .sources_resolved
            .iter()
            .map(|source| {
                DocSource::new(&source.path, source.mount.clone(), source.name.clone())
            })
            .collect();

        let mut merge_config = MergeConfig::new(sources, &config.output_resolved);
        merge_config.pretty_urls = config.pretty_urls;
        merge_config.brand = config
            .brand
            .as_ref()
            .map(|brand| BrandImage::new(brand.page.clone(), brand.image.clone()));
        merge_config.assets_dir = config.assets_resolved.dir.clone();
        merge_config.styles = config.assets_resolved.styles.clone();
        merge_config.scripts = config.assets_resolved.scripts.clone();
        merge_config.search = config.search.as_ref().map(build_search);
        merge_config
            .marker_attr
            .clone_from(&config.advanced.marker_attr);

        output.info(&format!(
            "Merging {} documentation sites",
            merge_config.sources.len()
        ));
        output.info(&format!("Output: {}", config.output_resolved.display()));

        let report = Merger::new(merge_config).merge()?;

        for warning in &report.warnings {
            output.warning(&format!("Warning: {warning}"));
        }
        if report.pages_skipped > 0 {
            output.warning(&format!("{} pages could not be updated", report.pages_skipped));
        }
        output.success(&format!(
            "Merged {} pages into {}",
            report.pages_injected,
            config.output_resolved.display()
        ));
        Ok(())
    }
}

/// Map the `[search]` section onto an engine instance.
fn build_search(section: &SearchSection) -> SearchConfig {
    let engine: Arc<dyn SearchEngine> = match section.engine {
        EngineKind::Json => Arc::new(JsonIndexEngine),
        EngineKind::External => {
            // Validation guarantees a program for the external engine.
            let mut engine = ExternalIndexEngine::new(section.program.clone().unwrap_or_default())
                .with_args(section.args.clone());
            if let Some(query_url) = &section.query_url {
                engine = engine.with_query_url(query_url.clone());
            }
            Arc::new(engine)
        }
    };
    SearchConfig::new(section.versions.clone(), engine)
}

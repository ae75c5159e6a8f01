//! Configuration management for docweld.
//!
//! Parses `docweld.toml` files with serde and provides auto-discovery of
//! config files in parent directories. Relative paths in the file are
//! resolved against the directory the file lives in, so a merge behaves the
//! same no matter where it is invoked from.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ```toml
//! pretty_urls = true
//! output_dir = "public"
//!
//! [[source]]
//! path = "../appliance/site"
//! mount = "appliance"
//! name = "Appliance"
//!
//! [[source]]
//! path = "../cloud/site"
//! mount = "cloud"
//!
//! [search]
//! engine = "json"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "docweld.toml";

/// Output directory used when the file does not name one.
const DEFAULT_OUTPUT_DIR: &str = "site";

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the output directory.
    pub output_dir: Option<PathBuf>,
    /// Override the pretty URLs flag.
    pub pretty_urls: Option<bool>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Link between sites with directory URLs instead of `index.html`.
    pub pretty_urls: bool,
    /// Output directory as written in the file (relative string).
    output_dir: Option<String>,
    /// Sources as written in the file (paths are relative strings).
    #[serde(rename = "source")]
    sources: Vec<SourceRaw>,
    /// Shared asset configuration (paths are relative strings).
    assets: AssetsRaw,
    /// Branding shown in the navigation bar.
    pub brand: Option<BrandConfig>,
    /// Search configuration. Absent means search is disabled.
    pub search: Option<SearchSection>,
    /// Escape hatches for unusual upstream renderers.
    pub advanced: AdvancedConfig,

    /// Resolved output directory (set after loading).
    #[serde(skip)]
    pub output_resolved: PathBuf,
    /// Resolved sources (set after loading).
    #[serde(skip)]
    pub sources_resolved: Vec<SourceEntry>,
    /// Resolved asset configuration (set after loading).
    #[serde(skip)]
    pub assets_resolved: AssetsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// One `[[source]]` entry as parsed from TOML.
#[derive(Debug, Deserialize)]
struct SourceRaw {
    /// Directory holding the pre-built site.
    path: String,
    /// Mount directory in the merged tree.
    mount: String,
    /// Navigation label; defaults to the mount.
    name: Option<String>,
}

/// A resolved documentation source.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    /// Directory holding the pre-built site, resolved against the config
    /// file location.
    pub path: PathBuf,
    /// Mount directory in the merged tree.
    pub mount: String,
    /// Navigation label.
    pub name: String,
}

/// The `[assets]` section as parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AssetsRaw {
    dir: Option<String>,
    styles: Vec<String>,
    scripts: Vec<String>,
}

/// Resolved shared asset configuration.
#[derive(Debug, Default)]
pub struct AssetsConfig {
    /// Directory copied to `assets/` in the merged tree.
    pub dir: Option<PathBuf>,
    /// Extra stylesheet references injected into every page.
    pub styles: Vec<String>,
    /// Extra script references injected into every page.
    pub scripts: Vec<String>,
}

/// The `[brand]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BrandConfig {
    /// Tree-relative page the brand links to.
    pub page: String,
    /// Tree-relative image shown in the bar.
    pub image: String,
}

/// The `[search]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    /// Which engine builds the index.
    pub engine: EngineKind,
    /// Mounts to index; defaults to every configured mount.
    pub versions: Vec<String>,
    /// Indexer binary, required for the external engine.
    pub program: Option<String>,
    /// Arguments passed to the indexer before the tree root.
    pub args: Vec<String>,
    /// Query endpoint the external engine's widget submits to.
    pub query_url: Option<String>,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            engine: EngineKind::Json,
            versions: Vec::new(),
            program: None,
            args: Vec::new(),
            query_url: None,
        }
    }
}

/// Known search engine kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Self-contained JSON index plus client-side lookup script.
    Json,
    /// External indexer binary.
    External,
}

/// The `[advanced]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AdvancedConfig {
    /// Attribute upstream renderers put on their content wrapper. Only
    /// pages carrying it get the navigation bar.
    pub marker_attr: String,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            marker_attr: "data-docweld-content".to_owned(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

impl Config {
    /// Load configuration.
    ///
    /// With an explicit `config_path` the file must exist. Otherwise
    /// `docweld.toml` is searched for in the current directory and its
    /// parents, falling back to defaults when none is found.
    ///
    /// CLI settings are applied after loading and path resolution, so CLI
    /// arguments take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit `config_path` doesn't exist, or
    /// when parsing or validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(output_dir) = &settings.output_dir {
            self.output_resolved.clone_from(output_dir);
        }
        if let Some(pretty_urls) = settings.pretty_urls {
            self.pretty_urls = pretty_urls;
        }
    }

    /// Search for a config file in the current directory and its parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create a default config with paths relative to the working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create a default config with paths relative to the given base.
    fn default_with_base(base: &Path) -> Self {
        Self {
            pretty_urls: false,
            output_dir: None,
            sources: Vec::new(),
            assets: AssetsRaw::default(),
            brand: None,
            search: None,
            advanced: AdvancedConfig::default(),
            output_resolved: base.join(DEFAULT_OUTPUT_DIR),
            sources_resolved: Vec::new(),
            assets_resolved: AssetsConfig::default(),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Resolve relative paths against the config file directory and fill
    /// in the derived defaults.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.output_resolved = config_dir.join(
            self.output_dir.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR),
        );
        self.sources_resolved = self
            .sources
            .iter()
            .map(|raw| SourceEntry {
                path: config_dir.join(&raw.path),
                mount: raw.mount.clone(),
                name: raw.name.clone().unwrap_or_else(|| raw.mount.clone()),
            })
            .collect();
        self.assets_resolved = AssetsConfig {
            dir: self.assets.dir.as_ref().map(|dir| config_dir.join(dir)),
            styles: self.assets.styles.clone(),
            scripts: self.assets.scripts.clone(),
        };
        if let Some(search) = &mut self.search
            && search.versions.is_empty()
        {
            search.versions = self
                .sources_resolved
                .iter()
                .map(|source| source.mount.clone())
                .collect();
        }
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from a file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any check fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_sources()?;
        self.validate_search()?;
        if let Some(brand) = &self.brand {
            require_non_empty(&brand.page, "brand.page")?;
            require_non_empty(&brand.image, "brand.image")?;
        }
        Ok(())
    }

    fn validate_sources(&self) -> Result<(), ConfigError> {
        if self.sources_resolved.is_empty() {
            return Err(ConfigError::Validation(
                "at least one [[source]] is required".to_owned(),
            ));
        }
        for source in &self.sources_resolved {
            validate_mount(&source.mount)?;
            require_non_empty(&source.name, "source.name")?;
        }
        for (i, a) in self.sources_resolved.iter().enumerate() {
            for b in &self.sources_resolved[i + 1..] {
                if a.mount == b.mount {
                    return Err(ConfigError::Validation(format!(
                        "mount `{}` is used by more than one source",
                        a.mount
                    )));
                }
                if mounts_overlap(&a.mount, &b.mount) {
                    return Err(ConfigError::Validation(format!(
                        "mounts `{}` and `{}` overlap",
                        a.mount, b.mount
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_search(&self) -> Result<(), ConfigError> {
        let Some(search) = &self.search else {
            return Ok(());
        };
        if search.engine == EngineKind::External {
            let has_program = search.program.as_deref().is_some_and(|p| !p.trim().is_empty());
            if !has_program {
                return Err(ConfigError::Validation(
                    "search.program is required for the external engine".to_owned(),
                ));
            }
        }
        for (i, version) in search.versions.iter().enumerate() {
            if !self.sources_resolved.iter().any(|s| s.mount == *version) {
                return Err(ConfigError::Validation(format!(
                    "search.versions entry `{version}` does not match any source mount"
                )));
            }
            if search.versions[..i].contains(version) {
                return Err(ConfigError::Validation(format!(
                    "search.versions entry `{version}` is listed twice"
                )));
            }
        }
        Ok(())
    }
}

fn validate_mount(mount: &str) -> Result<(), ConfigError> {
    let well_formed = !mount.is_empty()
        && !mount.contains('\\')
        && mount
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    if !well_formed {
        return Err(ConfigError::Validation(format!(
            "invalid source.mount `{mount}`"
        )));
    }
    if mount == "assets" || mount.starts_with("assets/") {
        return Err(ConfigError::Validation(format!(
            "source.mount `{mount}` collides with the shared assets directory"
        )));
    }
    Ok(())
}

/// Segment-aware prefix check: `doc` does not overlap `docs`.
fn mounts_overlap(a: &str, b: &str) -> bool {
    let nested = |parent: &str, child: &str| {
        child.len() > parent.len()
            && child.starts_with(parent)
            && child.as_bytes()[parent.len()] == b'/'
    };
    nested(a, b) || nested(b, a)
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

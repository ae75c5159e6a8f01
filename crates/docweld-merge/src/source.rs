//! Documentation sources and mount-path validation.

use std::path::PathBuf;

use crate::ASSETS_DIR;

/// One independently built documentation site to merge in.
#[derive(Debug, Clone)]
pub struct DocSource {
    /// Directory holding the pre-built static site.
    pub source_path: PathBuf,
    /// Tree-relative directory the site is mounted at, e.g. `appliance/v2`.
    pub mount_path: String,
    /// Label shown for this site in the navigation bar.
    pub display_name: String,
}

impl DocSource {
    #[must_use]
    pub fn new(
        source_path: impl Into<PathBuf>,
        mount_path: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            mount_path: mount_path.into(),
            display_name: display_name.into(),
        }
    }

    /// True if the tree-relative page path lies under this source's mount.
    #[must_use]
    pub fn contains_page(&self, page: &str) -> bool {
        page.strip_prefix(&self.mount_path)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Branding shown at the left edge of the navigation bar.
///
/// Both paths are relative to the merged tree root and are rewritten per
/// page when the bar is built.
#[derive(Debug, Clone)]
pub struct BrandImage {
    /// Page the brand anchor links to.
    pub page_path: String,
    /// Image displayed inside the anchor.
    pub image_path: String,
}

impl BrandImage {
    #[must_use]
    pub fn new(page_path: impl Into<String>, image_path: impl Into<String>) -> Self {
        Self {
            page_path: page_path.into(),
            image_path: image_path.into(),
        }
    }
}

/// Errors detected while validating a set of sources.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("At least one documentation source is required")]
    Empty,

    #[error("Invalid mount path `{0}`")]
    InvalidMount(String),

    #[error("Mount path `{0}` collides with the shared assets directory")]
    ReservedMount(String),

    #[error("Mount path `{0}` is used by more than one source")]
    DuplicateMount(String),

    #[error("Mount path `{child}` is nested inside `{parent}`")]
    OverlappingMounts { parent: String, child: String },
}

/// Check that a set of sources can be staged without any two writing to the
/// same destination.
pub(crate) fn validate_sources(sources: &[DocSource]) -> Result<(), SourceError> {
    if sources.is_empty() {
        return Err(SourceError::Empty);
    }
    for source in sources {
        validate_mount(&source.mount_path)?;
    }
    for (i, a) in sources.iter().enumerate() {
        for b in &sources[i + 1..] {
            if a.mount_path == b.mount_path {
                return Err(SourceError::DuplicateMount(a.mount_path.clone()));
            }
            if is_nested(&a.mount_path, &b.mount_path) {
                return Err(SourceError::OverlappingMounts {
                    parent: a.mount_path.clone(),
                    child: b.mount_path.clone(),
                });
            }
            if is_nested(&b.mount_path, &a.mount_path) {
                return Err(SourceError::OverlappingMounts {
                    parent: b.mount_path.clone(),
                    child: a.mount_path.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_mount(mount: &str) -> Result<(), SourceError> {
    let well_formed = !mount.is_empty()
        && !mount.contains('\\')
        && mount
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    if !well_formed {
        return Err(SourceError::InvalidMount(mount.to_owned()));
    }
    if mount == ASSETS_DIR || is_nested(ASSETS_DIR, mount) {
        return Err(SourceError::ReservedMount(mount.to_owned()));
    }
    Ok(())
}

/// True if `child` names a directory strictly inside `parent`. The check is
/// segment-aware, so `doc` does not contain `docs`.
fn is_nested(parent: &str, child: &str) -> bool {
    child.len() > parent.len()
        && child.starts_with(parent)
        && child.as_bytes()[parent.len()] == b'/'
}

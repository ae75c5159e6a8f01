//! Staging of source trees into the merged layout.
//!
//! Every source is copied below its mount path, version-control metadata is
//! left behind, and the tree root gets a redirect page plus the engine-owned
//! assets under `assets/__default/`.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::source::DocSource;
use crate::{ASSETS_DIR, DEFAULT_ASSET_DIR, DEFAULT_STYLESHEET, RUNTIME_SCRIPT};

/// Version-control metadata directories never copied into the output.
const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn"];

/// Stylesheet backing the injected chrome. Installed as
/// `assets/__default/docweld.css` and referenced from every page.
const DEFAULT_STYLESHEET_BODY: &str = r"/* docweld navigation chrome. */

.docweld-nav {
  position: sticky;
  top: 0;
  z-index: 100;
  display: flex;
  align-items: center;
  gap: 0.75rem;
  min-height: 3rem;
  padding: 0 1rem;
  background: #1d212a;
  color: #f5f6f8;
  font: 14px/1.4 system-ui, sans-serif;
}

.docweld-brand img {
  display: block;
  height: 1.75rem;
}

.docweld-nav-links {
  display: flex;
  flex: 1;
  gap: 0.25rem;
}

.docweld-nav-links a {
  padding: 0.4rem 0.75rem;
  border-radius: 4px;
  color: #c6cdd8;
  text-decoration: none;
}

.docweld-nav-links a:hover {
  color: #fff;
}

.docweld-nav-links a.active {
  background: #343b49;
  color: #fff;
}

.docweld-search {
  position: relative;
}

.docweld-search-input {
  padding: 0.35rem 0.6rem;
  border: 1px solid #3c4453;
  border-radius: 4px;
  background: #12151b;
  color: inherit;
}

.docweld-search-results {
  position: absolute;
  right: 0;
  top: 100%;
  min-width: 16rem;
  margin: 0.25rem 0 0;
  padding: 0.25rem;
  list-style: none;
  background: #fff;
  color: #1d212a;
  border-radius: 4px;
  box-shadow: 0 4px 16px rgb(0 0 0 / 0.25);
}

.docweld-search-results a {
  display: block;
  padding: 0.35rem 0.5rem;
  color: inherit;
  text-decoration: none;
}

.docweld-search-results a:hover {
  background: #eef1f5;
}

.docweld-nav-toggle {
  display: none;
  border: 0;
  background: none;
  color: inherit;
  font-size: 1.25rem;
}

@media (max-width: 640px) {
  .docweld-nav {
    flex-wrap: wrap;
  }

  .docweld-nav-toggle {
    display: block;
    margin-left: auto;
  }

  .docweld-nav-links,
  .docweld-search {
    display: none;
  }

  .docweld-nav.docweld-nav-open .docweld-nav-links {
    display: flex;
    flex-direction: column;
    flex-basis: 100%;
  }

  .docweld-nav.docweld-nav-open .docweld-search {
    display: block;
    flex-basis: 100%;
  }
}
";

/// Base body of the shared runtime script. The injection walk appends the
/// page behavior to this file after staging.
const RUNTIME_SCRIPT_BASE: &str =
    "/* docweld shared runtime. Page behavior is appended during the merge. */\n";

/// Errors raised while building the staging tree.
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("Source directory not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Copy every source below its mount path and write the root redirect page.
pub(crate) fn stage_sources(
    root: &Path,
    sources: &[DocSource],
    pretty_urls: bool,
) -> Result<(), StagingError> {
    for source in sources {
        if !source.source_path.is_dir() {
            return Err(StagingError::SourceMissing(source.source_path.clone()));
        }
        copy_tree(&source.source_path, &root.join(&source.mount_path))?;
        tracing::debug!(
            mount = %source.mount_path,
            source = %source.source_path.display(),
            "Staged documentation source"
        );
    }
    if let Some(first) = sources.first() {
        write_redirect(root, first, pretty_urls)?;
    }
    Ok(())
}

/// Copy a user asset directory to `assets/` at the tree root.
pub(crate) fn copy_user_assets(root: &Path, assets_dir: &Path) -> Result<(), StagingError> {
    if !assets_dir.is_dir() {
        return Err(StagingError::SourceMissing(assets_dir.to_path_buf()));
    }
    copy_tree(assets_dir, &root.join(ASSETS_DIR))
}

/// Install the engine-owned stylesheet and runtime script. Runs after user
/// assets are copied, so the `__default` subtree always holds engine files.
pub(crate) fn install_default_assets(root: &Path) -> Result<(), StagingError> {
    let dir = root.join(DEFAULT_ASSET_DIR);
    fs::create_dir_all(&dir)?;
    fs::write(dir.join(DEFAULT_STYLESHEET), DEFAULT_STYLESHEET_BODY)?;
    fs::write(dir.join(RUNTIME_SCRIPT), RUNTIME_SCRIPT_BASE)?;
    Ok(())
}

fn copy_tree(src: &Path, dest: &Path) -> Result<(), StagingError> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let name = entry.file_name();
        if file_type.is_dir() {
            if VCS_DIRS.iter().any(|vcs| name == *vcs) {
                continue;
            }
            copy_tree(&entry.path(), &dest.join(&name))?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), dest.join(&name))?;
        }
        // Symlinks and other special files are not carried over.
    }
    Ok(())
}

/// Write the `index.html` that forwards the tree root to the first source.
fn write_redirect(root: &Path, first: &DocSource, pretty_urls: bool) -> Result<(), StagingError> {
    let target = if pretty_urls {
        format!("./{}/", first.mount_path)
    } else {
        format!("./{}/index.html", first.mount_path)
    };
    let target = escape(&target);

    let mut html = String::with_capacity(512);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<meta http-equiv=\"refresh\" content=\"0; url={target}\">");
    html.push_str("<title>Redirecting</title>\n</head>\n<body>\n");
    let _ = writeln!(
        html,
        "<p>Redirecting to <a href=\"{target}\">{}</a>.</p>",
        escape(&first.display_name)
    );
    html.push_str("</body>\n</html>\n");

    fs::write(root.join("index.html"), html)?;
    Ok(())
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

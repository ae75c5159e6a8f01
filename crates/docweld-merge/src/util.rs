//! Path helpers for tree-relative references.

/// Compute a relative URL from one tree location to another.
///
/// Both arguments are forward-slash paths relative to the merged tree root.
/// `from` names the document the URL will appear in, so per RFC 3986 its last
/// segment is dropped before resolving. Returns `./` when the target is the
/// page's own directory.
pub(crate) fn relative_path(from: &str, to: &str) -> String {
    let from_dir: Vec<&str> = {
        let mut segments: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
        segments.pop();
        segments
    };
    let to_segments: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    let common = from_dir
        .iter()
        .zip(&to_segments)
        .take_while(|(a, b)| a == b)
        .count();

    let ups = "../".repeat(from_dir.len() - common);
    let down = to_segments[common..].join("/");
    let href = format!("{ups}{down}");
    if href.is_empty() { "./".to_owned() } else { href }
}

/// Resolve a configured reference for use inside a given page.
///
/// References carrying a URL scheme or a leading slash are emitted verbatim;
/// everything else is treated as a tree-root-relative path and rewritten
/// relative to the page's directory.
pub(crate) fn resolve_ref(page: &str, target: &str) -> String {
    if target.contains("://") || target.starts_with('/') {
        target.to_owned()
    } else {
        relative_path(page, target)
    }
}

//! Self-contained JSON search index.
//!
//! One index file per indexed doc version, written under
//! `assets/__default/search/` in the merged tree, plus a small
//! client-side lookup script that loads them on demand. No server
//! component, which makes it the default engine for statically
//! hosted sites.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use docweld_dom::{
    Handle, append_child, create_element, find_first_element, parse_html, text_content,
};
use serde::Serialize;

use crate::{SearchEngine, SearchIndexError};

/// Tree-root relative path of the lookup script.
const SCRIPT_REF: &str = "assets/__default/search.js";

/// Tree-root relative directory holding the per-version index files.
const INDEX_DIR: &str = "assets/__default/search";

const LOOKUP_SCRIPT: &str = r#"(function () {
  "use strict";

  var script = document.currentScript;
  if (!script || !script.src) {
    return;
  }
  var assetBase = script.src.replace(/search\.js$/, "");
  var rootBase = assetBase.replace(/assets\/__default\/$/, "");
  var entries = null;

  function loadIndex(done) {
    if (entries) {
      done(entries);
      return;
    }
    fetch(assetBase + "search/versions.json")
      .then(function (res) { return res.json(); })
      .then(function (versions) {
        return Promise.all(versions.map(function (version) {
          return fetch(assetBase + "search/" + version + ".json")
            .then(function (res) { return res.json(); });
        }));
      })
      .then(function (indexes) {
        entries = [].concat.apply([], indexes);
        done(entries);
      });
  }

  function render(list, matches) {
    list.innerHTML = "";
    matches.slice(0, 10).forEach(function (entry) {
      var item = document.createElement("li");
      var link = document.createElement("a");
      link.href = rootBase + entry.path;
      link.textContent = entry.title;
      item.appendChild(link);
      list.appendChild(item);
    });
    list.hidden = matches.length === 0;
  }

  document.addEventListener("input", function (event) {
    var input = event.target;
    if (!input.classList || !input.classList.contains("docweld-search-input")) {
      return;
    }
    var list = input.parentNode.querySelector(".docweld-search-results");
    var query = input.value.trim().toLowerCase();
    if (query.length < 2) {
      render(list, []);
      return;
    }
    loadIndex(function (all) {
      render(list, all.filter(function (entry) {
        return entry.title.toLowerCase().indexOf(query) !== -1
          || entry.text.toLowerCase().indexOf(query) !== -1;
      }));
    });
  });
})();
"#;

#[derive(Debug, Serialize)]
struct IndexEntry {
    title: String,
    path: String,
    text: String,
}

/// Search engine that persists one JSON index per indexed version.
pub struct JsonIndexEngine;

impl SearchEngine for JsonIndexEngine {
    fn name(&self) -> &'static str {
        "json"
    }

    fn contribute_scripts(&self, scripts: &mut Vec<String>) {
        scripts.push(SCRIPT_REF.to_owned());
    }

    fn render_widget(&self, nav: &Handle) {
        let widget = create_element("div", &[("class", "docweld-search")]);
        let input = create_element(
            "input",
            &[
                ("type", "search"),
                ("class", "docweld-search-input"),
                ("placeholder", "Search docs"),
                ("autocomplete", "off"),
            ],
        );
        let results = create_element(
            "ul",
            &[("class", "docweld-search-results"), ("hidden", "")],
        );
        append_child(&widget, input);
        append_child(&widget, results);
        append_child(nav, widget);
    }

    fn build_index(&self, root: &Path, versions: &[String]) -> Result<(), SearchIndexError> {
        let index_dir = root.join(INDEX_DIR);
        fs::create_dir_all(&index_dir)?;

        for version in versions {
            let version_dir = root.join(version);
            if !version_dir.is_dir() {
                return Err(SearchIndexError::MissingVersion(version.clone()));
            }

            let mut pages = Vec::new();
            walk_pages(&version_dir, &version_dir, &mut pages)?;
            // Deterministic artifact regardless of readdir order.
            pages.sort();

            let mut entries = Vec::with_capacity(pages.len());
            for (relative, path) in pages {
                entries.push(index_page(version, &relative, &path)?);
            }
            tracing::debug!(version = %version, pages = entries.len(), "Indexed doc version");

            let index = serde_json::to_vec(&entries)?;
            fs::write(index_dir.join(format!("{version}.json")), index)?;
        }

        let manifest = serde_json::to_vec(&versions)?;
        fs::write(index_dir.join("versions.json"), manifest)?;
        fs::write(root.join(SCRIPT_REF), LOOKUP_SCRIPT)?;
        Ok(())
    }
}

fn index_page(version: &str, relative: &str, path: &Path) -> Result<IndexEntry, SearchIndexError> {
    let bytes = fs::read(path)?;
    let dom = parse_html(&bytes);

    let entry_path = format!("{version}/{relative}");
    let title = find_first_element(&dom.document, "title")
        .map(|node| collapse_whitespace(&text_content(&node)))
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| entry_path.clone());
    let text = find_first_element(&dom.document, "body")
        .map(|node| collapse_whitespace(&text_content(&node)))
        .unwrap_or_default();

    Ok(IndexEntry {
        title,
        path: entry_path,
        text,
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collect `.html` files under `base` as (relative path, absolute path)
/// pairs, with forward-slash relative paths.
fn walk_pages(
    base: &Path,
    current: &Path,
    pages: &mut Vec<(String, PathBuf)>,
) -> Result<(), io::Error> {
    for entry in fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk_pages(base, &path, pages)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
        {
            let relative = path
                .strip_prefix(base)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            pages.push((relative, path));
        }
    }
    Ok(())
}

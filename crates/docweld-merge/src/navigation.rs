//! Navigation bar construction.
//!
//! The bar is a detached DOM fragment rebuilt for every page: link targets
//! depend on the page's depth in the tree, and the active link depends on
//! which mount the page lives under.

use docweld_dom::{Handle, append_child, create_element, create_text, set_attribute};
use docweld_search::SearchConfig;

use crate::source::{BrandImage, DocSource};
use crate::util::{relative_path, resolve_ref};

/// Everything the bar renders besides the page itself.
pub(crate) struct NavContext<'a> {
    pub sources: &'a [DocSource],
    pub brand: Option<&'a BrandImage>,
    pub search: Option<&'a SearchConfig>,
    pub pretty_urls: bool,
}

/// Build the `<nav>` fragment for the page at tree-relative path `page`.
///
/// Child order is fixed: brand anchor (when configured), one link per
/// source, the search widget (when search is enabled), then the collapse
/// toggle.
pub(crate) fn build_navigation(ctx: &NavContext<'_>, page: &str) -> Handle {
    let nav = create_element("nav", &[("class", "docweld-nav")]);

    if let Some(brand) = ctx.brand {
        let anchor = create_element(
            "a",
            &[
                ("class", "docweld-brand"),
                ("href", &resolve_ref(page, &brand.page_path)),
            ],
        );
        let img = create_element(
            "img",
            &[("src", &resolve_ref(page, &brand.image_path)), ("alt", "")],
        );
        append_child(&anchor, img);
        append_child(&nav, anchor);
    }

    let links = create_element("div", &[("class", "docweld-nav-links")]);
    for source in ctx.sources {
        let href = mount_href(page, &source.mount_path, ctx.pretty_urls);
        let anchor = create_element("a", &[("href", &href)]);
        if source.contains_page(page) {
            set_attribute(&anchor, "class", "active");
        }
        append_child(&anchor, create_text(&source.display_name));
        append_child(&links, anchor);
    }
    append_child(&nav, links);

    if let Some(search) = ctx.search {
        search.engine.render_widget(&nav);
    }

    let toggle = create_element(
        "button",
        &[
            ("class", "docweld-nav-toggle"),
            ("type", "button"),
            ("aria-label", "Toggle navigation"),
        ],
    );
    append_child(&toggle, create_text("\u{2630}"));
    append_child(&nav, toggle);

    nav
}

/// Href from a page to a source's landing page.
fn mount_href(page: &str, mount: &str, pretty_urls: bool) -> String {
    if pretty_urls {
        let href = relative_path(page, mount);
        if href.ends_with('/') { href } else { format!("{href}/") }
    } else {
        relative_path(page, &format!("{mount}/index.html"))
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use std::sync::Arc;

    use docweld_dom::{get_attribute, is_element, text_content};
    use docweld_search::{JsonIndexEngine, SearchConfig};
    use pretty_assertions::assert_eq;

    use super::*;

    fn sources() -> Vec<DocSource> {
        vec![
            DocSource::new("/unused", "appliance", "Appliance"),
            DocSource::new("/unused", "cloud", "Cloud"),
        ]
    }

    fn class_of(node: &Handle) -> String {
        get_attribute(node, "class").unwrap_or_default()
    }

    #[test]
    fn orders_brand_links_widget_toggle() {
        let srcs = sources();
        let brand = BrandImage::new("appliance/index.html", "assets/logo.svg");
        let search = SearchConfig::new(vec!["appliance".to_owned()], Arc::new(JsonIndexEngine));
        let ctx = NavContext {
            sources: &srcs,
            brand: Some(&brand),
            search: Some(&search),
            pretty_urls: false,
        };

        let nav = build_navigation(&ctx, "appliance/index.html");

        let classes: Vec<String> = nav.children.borrow().iter().map(class_of).collect();
        assert_eq!(
            classes,
            vec!["docweld-brand", "docweld-nav-links", "docweld-search", "docweld-nav-toggle"]
        );
    }

    #[test]
    fn omits_brand_and_widget_when_unconfigured() {
        let srcs = sources();
        let ctx = NavContext {
            sources: &srcs,
            brand: None,
            search: None,
            pretty_urls: false,
        };

        let nav = build_navigation(&ctx, "appliance/index.html");

        let classes: Vec<String> = nav.children.borrow().iter().map(class_of).collect();
        assert_eq!(classes, vec!["docweld-nav-links", "docweld-nav-toggle"]);
    }

    #[test]
    fn marks_only_the_current_mount_active() {
        let srcs = sources();
        let ctx = NavContext {
            sources: &srcs,
            brand: None,
            search: None,
            pretty_urls: false,
        };

        let nav = build_navigation(&ctx, "cloud/guide/setup.html");

        let links = Rc::clone(&nav.children.borrow()[0]);
        let anchors = links.children.borrow();
        assert_eq!(class_of(&anchors[0]), "");
        assert_eq!(text_content(&anchors[0]), "Appliance");
        assert_eq!(class_of(&anchors[1]), "active");
        assert_eq!(text_content(&anchors[1]), "Cloud");
    }

    #[test]
    fn hrefs_climb_to_sibling_mounts() {
        let srcs = sources();
        let ctx = NavContext {
            sources: &srcs,
            brand: None,
            search: None,
            pretty_urls: false,
        };

        let nav = build_navigation(&ctx, "cloud/guide/setup.html");

        let links = Rc::clone(&nav.children.borrow()[0]);
        let anchors = links.children.borrow();
        assert_eq!(
            get_attribute(&anchors[0], "href").unwrap(),
            "../../appliance/index.html"
        );
        assert_eq!(get_attribute(&anchors[1], "href").unwrap(), "../index.html");
    }

    #[test]
    fn pretty_urls_use_directory_hrefs() {
        let srcs = sources();
        let ctx = NavContext {
            sources: &srcs,
            brand: None,
            search: None,
            pretty_urls: true,
        };

        let nav = build_navigation(&ctx, "appliance/index.html");

        let links = Rc::clone(&nav.children.borrow()[0]);
        let anchors = links.children.borrow();
        assert_eq!(get_attribute(&anchors[0], "href").unwrap(), "./");
        assert_eq!(get_attribute(&anchors[1], "href").unwrap(), "../cloud/");
    }

    #[test]
    fn brand_paths_are_rewritten_per_page() {
        let srcs = sources();
        let brand = BrandImage::new("appliance/index.html", "assets/logo.svg");
        let ctx = NavContext {
            sources: &srcs,
            brand: Some(&brand),
            search: None,
            pretty_urls: false,
        };

        let nav = build_navigation(&ctx, "cloud/guide/setup.html");

        let anchor = Rc::clone(&nav.children.borrow()[0]);
        assert!(is_element(&anchor, "a"));
        assert_eq!(
            get_attribute(&anchor, "href").unwrap(),
            "../../appliance/index.html"
        );
        let img = Rc::clone(&anchor.children.borrow()[0]);
        assert_eq!(get_attribute(&img, "src").unwrap(), "../../assets/logo.svg");
    }
}

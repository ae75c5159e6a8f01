//! Lenient HTML parsing and DOM mutation for docweld.
//!
//! Thin wrappers around `html5ever`'s document parser and serializer, working
//! on the reference-counted DOM from `markup5ever_rcdom`. The merge pipeline
//! needs exactly four capabilities:
//!
//! - parse whatever a documentation renderer emitted without rejecting it
//! - locate elements in document order
//! - splice new nodes into position
//! - serialize the tree back out
//!
//! Handles are `Rc`-based and not `Send`; callers keep each document's tree
//! on the thread that parsed it.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use html5ever::serialize::{SerializeOpts, serialize};
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{Attribute, LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Node, NodeData, RcDom, SerializableHandle};

pub use markup5ever_rcdom::Handle;

/// XHTML namespace for created elements. The parser assigns the same
/// namespace, so created and parsed nodes serialize identically (in
/// particular, void elements like `link` stay void).
const HTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// Parse an HTML document leniently.
///
/// Never fails: html5ever recovers from malformed markup the way browsers do
/// and always produces a tree with exactly one `html`/`head`/`body`. Invalid
/// UTF-8 is decoded lossily.
#[must_use]
pub fn parse_html(bytes: &[u8]) -> RcDom {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: false,
            ..TreeBuilderOpts::default()
        },
        ..ParseOpts::default()
    };

    html5ever::parse_document(RcDom::default(), opts)
        .from_utf8()
        .one(bytes)
}

/// Serialize a full document back to bytes, doctype included.
///
/// # Errors
///
/// Returns `io::Error` if the serializer reports one; writing to a `Vec`
/// cannot fail in practice.
pub fn serialize_html(dom: &RcDom) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let document: SerializableHandle = Rc::clone(&dom.document).into();
    serialize(&mut bytes, &document, SerializeOpts::default())?;
    Ok(bytes)
}

/// True if the node is an element with the given (lowercase) tag name.
#[must_use]
pub fn is_element(node: &Handle, tag: &str) -> bool {
    match &node.data {
        NodeData::Element { name, .. } => name.local.as_ref() == tag,
        _ => false,
    }
}

/// Find the first element with the given tag name, in document order.
#[must_use]
pub fn find_first_element(root: &Handle, tag: &str) -> Option<Handle> {
    if is_element(root, tag) {
        return Some(Rc::clone(root));
    }
    for child in root.children.borrow().iter() {
        if let Some(found) = find_first_element(child, tag) {
            return Some(found);
        }
    }
    None
}

/// Get an attribute value from an element.
#[must_use]
pub fn get_attribute(node: &Handle, attr: &str) -> Option<String> {
    if let NodeData::Element { attrs, .. } = &node.data {
        return attrs
            .borrow()
            .iter()
            .find(|a| a.name.local.as_ref() == attr)
            .map(|a| a.value.to_string());
    }
    None
}

/// True if the element carries the attribute, regardless of its value.
#[must_use]
pub fn has_attribute(node: &Handle, attr: &str) -> bool {
    match &node.data {
        NodeData::Element { attrs, .. } => {
            attrs.borrow().iter().any(|a| a.name.local.as_ref() == attr)
        }
        _ => false,
    }
}

/// Set an attribute on an element, replacing any existing value.
pub fn set_attribute(node: &Handle, attr: &str, value: &str) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let mut attrs = attrs.borrow_mut();
        for existing in attrs.iter_mut() {
            if existing.name.local.as_ref() == attr {
                existing.value = value.into();
                return;
            }
        }
        attrs.push(Attribute {
            name: attr_name(attr),
            value: value.into(),
        });
    }
}

/// Create a detached element in the HTML namespace.
#[must_use]
pub fn create_element(tag: &str, attrs: &[(&str, &str)]) -> Handle {
    let attrs = attrs
        .iter()
        .map(|(name, value)| Attribute {
            name: attr_name(name),
            value: (*value).into(),
        })
        .collect();

    Node::new(NodeData::Element {
        name: QualName::new(None, Namespace::from(HTML_NS), LocalName::from(tag)),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

/// Create a detached text node.
#[must_use]
pub fn create_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(text.into()),
    })
}

/// Append `child` as the last child of `parent`.
pub fn append_child(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// Insert `child` as the first child of `parent`.
pub fn prepend_child(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().insert(0, child);
}

/// First child that is not whitespace-only text or a comment.
///
/// Renderers put a newline between `<body>` and their content wrapper; that
/// text node is not content for marker detection.
#[must_use]
pub fn first_content_child(node: &Handle) -> Option<Handle> {
    node.children
        .borrow()
        .iter()
        .find(|child| match &child.data {
            NodeData::Text { contents } => !contents.borrow().trim().is_empty(),
            NodeData::Comment { .. } | NodeData::ProcessingInstruction { .. } => false,
            _ => true,
        })
        .map(Rc::clone)
}

/// Concatenated text content of a node's subtree, tags ignored.
#[must_use]
pub fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    collect_text(node, &mut text);
    text
}

fn collect_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { .. } | NodeData::Document => {
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        }
        _ => {}
    }
}

/// Attribute names carry no namespace, matching what the parser produces.
fn attr_name(name: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(name))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn serialize_to_string(dom: &RcDom) -> String {
        String::from_utf8(serialize_html(dom).unwrap()).unwrap()
    }

    #[test]
    fn parse_and_serialize_roundtrip() {
        let html = "<!DOCTYPE html><html><head><title>T</title></head><body><p>Hello</p></body></html>";
        let dom = parse_html(html.as_bytes());
        let out = serialize_to_string(&dom);

        assert!(out.starts_with("<!DOCTYPE html>"));
        assert!(out.contains("<p>Hello</p>"));
    }

    #[test]
    fn parse_is_lenient_about_malformed_markup() {
        let dom = parse_html(b"<html><body><p>unclosed<div>nested</body>");
        let out = serialize_to_string(&dom);

        assert!(out.contains("unclosed"));
        assert!(out.contains("nested"));
    }

    #[test]
    fn parse_synthesizes_head_and_body() {
        let dom = parse_html(b"<p>bare</p>");

        assert!(find_first_element(&dom.document, "head").is_some());
        assert!(find_first_element(&dom.document, "body").is_some());
    }

    #[test]
    fn find_first_element_follows_document_order() {
        let dom = parse_html(b"<html><body><div id=\"a\"><span></span></div><div id=\"b\"></div></body></html>");

        let div = find_first_element(&dom.document, "div").unwrap();
        assert_eq!(get_attribute(&div, "id").as_deref(), Some("a"));
    }

    #[test]
    fn attribute_get_set_has() {
        let dom = parse_html(b"<html><body><div id=\"main\">x</div></body></html>");
        let div = find_first_element(&dom.document, "div").unwrap();

        assert!(has_attribute(&div, "id"));
        assert_eq!(get_attribute(&div, "id").as_deref(), Some("main"));
        assert!(!has_attribute(&div, "class"));

        set_attribute(&div, "class", "wrapper");
        assert_eq!(get_attribute(&div, "class").as_deref(), Some("wrapper"));

        set_attribute(&div, "id", "other");
        assert_eq!(get_attribute(&div, "id").as_deref(), Some("other"));
    }

    #[test]
    fn created_link_serializes_as_void_element() {
        let dom = parse_html(b"<html><head></head><body></body></html>");
        let head = find_first_element(&dom.document, "head").unwrap();
        append_child(
            &head,
            create_element("link", &[("rel", "stylesheet"), ("href", "a.css")]),
        );

        let out = serialize_to_string(&dom);
        assert!(out.contains("<link rel=\"stylesheet\" href=\"a.css\">"));
        assert!(!out.contains("</link>"));
    }

    #[test]
    fn prepend_child_becomes_first() {
        let dom = parse_html(b"<html><body><p>old</p></body></html>");
        let body = find_first_element(&dom.document, "body").unwrap();
        let nav = create_element("nav", &[("id", "topbar")]);
        append_child(&nav, create_text("menu"));
        prepend_child(&body, nav);

        let first = first_content_child(&body).unwrap();
        assert!(is_element(&first, "nav"));

        let out = serialize_to_string(&dom);
        let nav_pos = out.find("<nav").unwrap();
        let p_pos = out.find("<p>").unwrap();
        assert!(nav_pos < p_pos);
    }

    #[test]
    fn text_nodes_escape_on_serialize() {
        let dom = parse_html(b"<html><body></body></html>");
        let body = find_first_element(&dom.document, "body").unwrap();
        let span = create_element("span", &[]);
        append_child(&span, create_text("a < b & c"));
        append_child(&body, span);

        let out = serialize_to_string(&dom);
        assert!(out.contains("a &lt; b &amp; c"));
    }

    #[test]
    fn first_content_child_skips_whitespace_and_comments() {
        let dom = parse_html(b"<html><body>\n  <!-- generator -->\n  <div data-x=\"1\">c</div></body></html>");
        let body = find_first_element(&dom.document, "body").unwrap();

        let first = first_content_child(&body).unwrap();
        assert!(is_element(&first, "div"));
    }

    #[test]
    fn first_content_child_sees_leading_text() {
        let dom = parse_html(b"<html><body>loose text<div>c</div></body></html>");
        let body = find_first_element(&dom.document, "body").unwrap();

        let first = first_content_child(&body).unwrap();
        assert!(!is_element(&first, "div"));
    }

    #[test]
    fn text_content_concatenates_subtree() {
        let dom = parse_html(b"<html><body><h1>Title</h1><p>Hello <em>world</em></p></body></html>");
        let body = find_first_element(&dom.document, "body").unwrap();

        assert_eq!(text_content(&body), "TitleHello world");
    }
}

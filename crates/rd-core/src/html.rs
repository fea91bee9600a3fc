//! HTML adapter: converts `scraper` (html5ever) parse trees into [`Tree`].
//!
//! Only elements are carried over. Direct text children are concatenated into
//! the owning element's `text`; comments, doctypes and processing
//! instructions are dropped.

use encoding_rs::Encoding;
use scraper::{ElementRef, Html, Node as HtmlNode};

use crate::error::{RdError, Result};
use crate::tree::{NodeId, Tree};

/// Parse a full HTML document. The root of the returned tree is `<html>`.
pub fn parse_document(markup: &str) -> Tree {
    let html = Html::parse_document(markup);
    let mut tree = Tree::new();
    let root = convert(&mut tree, html.root_element());
    tree.set_root(root);
    tree
}

/// Parse an HTML fragment.
///
/// When the fragment has a single top-level element, that element becomes the
/// root; otherwise the top-level elements are wrapped in a `<div>`.
pub fn parse_fragment(markup: &str) -> Tree {
    let html = Html::parse_fragment(markup);
    let mut tree = Tree::new();
    let top: Vec<ElementRef<'_>> = html
        .root_element()
        .children()
        .filter_map(ElementRef::wrap)
        .collect();

    let root = match top.as_slice() {
        [single] => convert(&mut tree, *single),
        many => {
            let wrapper = tree.create_element("div");
            for element in many {
                let child = convert(&mut tree, *element);
                tree.append_child(wrapper, child);
            }
            wrapper
        }
    };
    tree.set_root(root);
    tree
}

/// Decode raw bytes using a WHATWG encoding label (e.g. `"utf-8"`,
/// `"windows-1252"`).
pub fn decode(bytes: &[u8], label: &str) -> Result<String> {
    let encoding = Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| RdError::UnknownEncoding(label.to_string()))?;
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        log::debug!("replaced malformed {} sequences while decoding", encoding.name());
    }
    Ok(text.into_owned())
}

fn convert(tree: &mut Tree, element: ElementRef<'_>) -> NodeId {
    let value = element.value();
    let id = tree.create_element(value.name().to_ascii_lowercase());
    for (name, attr) in value.attrs() {
        tree.set_attribute(id, name, attr);
    }

    let mut text = String::new();
    for child in element.children() {
        match child.value() {
            HtmlNode::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    let child_id = convert(tree, child_element);
                    tree.append_child(id, child_id);
                }
            }
            HtmlNode::Text(fragment) => {
                let fragment: &str = fragment;
                let fragment = fragment.trim();
                if !fragment.is_empty() {
                    if !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(fragment);
                }
            }
            _ => {}
        }
    }
    if !text.is_empty() {
        tree.set_text(id, text);
    }
    id
}

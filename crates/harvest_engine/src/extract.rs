use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html};

use crate::schema::{Attribute, FieldSpec};
use crate::xpath::Match;

/// Elements whose text never reaches a reader.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// A raw value pulled out of a page for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedValue {
    /// Plain text or an attribute value.
    Scalar(String),
    /// An HTML fragment.
    Markup(String),
}

impl ExtractedValue {
    pub fn as_str(&self) -> &str {
        match self {
            ExtractedValue::Scalar(value) | ExtractedValue::Markup(value) => value,
        }
    }
}

pub trait Extractor: Send + Sync {
    /// Value of `field` in `document`, or `None` when nothing non-empty matched.
    fn extract(&self, document: &Html, field: &FieldSpec) -> Option<ExtractedValue>;
}

/// Evaluates each field's locator and applies its attribute kind to the first
/// match in document order.
#[derive(Debug, Default)]
pub struct XPathExtractor;

impl Extractor for XPathExtractor {
    fn extract(&self, document: &Html, field: &FieldSpec) -> Option<ExtractedValue> {
        let value = match (field.locator.first(document)?, &field.attribute) {
            (Match::Element(element), Attribute::Text) => {
                ExtractedValue::Scalar(visible_text(element))
            }
            (Match::Element(element), Attribute::Html) => {
                ExtractedValue::Markup(element.inner_html().trim().to_string())
            }
            (Match::Element(element), Attribute::Named(name)) => {
                ExtractedValue::Scalar(element.value().attr(name)?.trim().to_string())
            }
            (Match::Text(text), _) | (Match::Attribute(text), _) => {
                ExtractedValue::Scalar(text.trim().to_string())
            }
        };
        (!value.as_str().is_empty()).then_some(value)
    }
}

/// Text a browser would render for `element`, with whitespace runs collapsed.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(*element, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(node: NodeRef<'_, Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) if HIDDEN_ELEMENTS.contains(&element.name()) => {}
            Node::Element(_) => collect_text(child, out),
            _ => {}
        }
    }
}

//! Rule-based HTML rewriting.
//!
//! The input is parsed once into scraper's immutable tree. Serialization walks
//! the tree and hands every element to each [`RewriteRule`] in turn as an
//! owned [`ElementEdit`]. The rules decide which attributes survive, whether
//! the content is replaced and whether the element is dropped. The source
//! tree is never mutated, so every rule can be tested on plain strings.

use std::collections::{HashMap, HashSet};

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub const POLL_PLACEHOLDER: &str =
    "<em>Polls have been temporarily removed while we migrate to a new platform.</em>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementEdit {
    name: String,
    attrs: Vec<(String, String)>,
    replacement: Option<String>,
    removed: bool,
}

impl ElementEdit {
    fn from_element(element: &ElementRef<'_>) -> Self {
        let value = element.value();
        Self {
            name: value.name().to_ascii_lowercase(),
            attrs: value
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            replacement: None,
            removed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn remove_attrs(&mut self, names: &[&str]) {
        self.attrs.retain(|(key, _)| !names.contains(&key.as_str()));
    }

    /// Replaces the element's children with literal HTML.
    pub fn replace_content(&mut self, html: impl Into<String>) {
        self.replacement = Some(html.into());
    }

    /// Drops the element and everything inside it.
    pub fn remove(&mut self) {
        self.removed = true;
    }
}

pub trait RewriteRule {
    fn name(&self) -> &'static str;

    fn apply(&self, element: &mut ElementEdit);
}

/// Drops sizing and styling hints that only make sense for the source theme.
#[derive(Debug, Default, Clone, Copy)]
pub struct StripPresentationAttributes;

impl RewriteRule for StripPresentationAttributes {
    fn name(&self) -> &'static str {
        "strip-presentation-attributes"
    }

    fn apply(&self, element: &mut ElementEdit) {
        match element.name() {
            "img" => element.remove_attrs(&[
                "class",
                "width",
                "height",
                "data-recalc-dims",
                "sizes",
                "srcset",
            ]),
            "figure" | "figcaption" => element.remove_attrs(&["class"]),
            _ => {}
        }
    }
}

/// Poll widgets cannot work outside WordPress; swap them for a notice.
#[derive(Debug, Default, Clone, Copy)]
pub struct PollPlaceholder;

impl RewriteRule for PollPlaceholder {
    fn name(&self) -> &'static str {
        "poll-placeholder"
    }

    fn apply(&self, element: &mut ElementEdit) {
        if element.has_class("wp-polls-loading") {
            element.remove();
        } else if element.has_class("wp-polls") {
            element.replace_content(POLL_PLACEHOLDER);
        }
    }
}

/// Points `<img src>` at materialized local files. Sources that failed to
/// materialize lose their `src` so no remote reference survives.
#[derive(Debug, Clone)]
pub struct LocalizeImageSources<'a> {
    resolved: &'a HashMap<String, Option<String>>,
}

impl<'a> LocalizeImageSources<'a> {
    pub fn new(resolved: &'a HashMap<String, Option<String>>) -> Self {
        Self { resolved }
    }
}

impl RewriteRule for LocalizeImageSources<'_> {
    fn name(&self) -> &'static str {
        "localize-image-sources"
    }

    fn apply(&self, element: &mut ElementEdit) {
        if element.name() != "img" {
            return;
        }
        let Some(src) = element.attr("src").map(|src| src.trim().to_string()) else {
            return;
        };
        match self.resolved.get(&src) {
            Some(Some(local)) => element.set_attr("src", local.clone()),
            _ => element.remove_attrs(&["src"]),
        }
    }
}

/// Parses `html` as a fragment and serializes it back with `rules` applied
/// to every element, in order.
pub fn rewrite_html(html: &str, rules: &[&dyn RewriteRule]) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());
    for child in fragment.root_element().children() {
        write_node(child, rules, false, &mut out);
    }
    out
}

/// Serializes an element subtree without any rewriting.
pub fn outer_html(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    write_node(*element, &[], false, &mut out);
    out
}

/// Distinct, non-empty `<img src>` values in document order.
pub fn collect_image_sources(html: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(html);
    let Ok(selector) = Selector::parse("img[src]") else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    fragment
        .select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .filter(|src| seen.insert(src.to_string()))
        .map(str::to_string)
        .collect()
}

fn write_node(node: NodeRef<'_, Node>, rules: &[&dyn RewriteRule], raw_text: bool, out: &mut String) {
    match node.value() {
        Node::Text(text) => {
            if raw_text {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        Node::Element(_) => {
            if let Some(element) = ElementRef::wrap(node) {
                write_element(element, rules, out);
            }
        }
        Node::Comment(_) | Node::Doctype(_) | Node::ProcessingInstruction(_) => {}
        _ => {
            for child in node.children() {
                write_node(child, rules, raw_text, out);
            }
        }
    }
}

fn write_element(element: ElementRef<'_>, rules: &[&dyn RewriteRule], out: &mut String) {
    let mut edit = ElementEdit::from_element(&element);
    for rule in rules {
        rule.apply(&mut edit);
        if edit.removed {
            return;
        }
    }

    out.push('<');
    out.push_str(&edit.name);
    for (key, value) in &edit.attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        escape_attr(value, out);
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&edit.name.as_str()) {
        return;
    }

    match &edit.replacement {
        Some(html) => out.push_str(html),
        None => {
            let raw_text = RAW_TEXT_ELEMENTS.contains(&edit.name.as_str());
            for child in element.children() {
                write_node(child, rules, raw_text, out);
            }
        }
    }

    out.push_str("</");
    out.push_str(&edit.name);
    out.push('>');
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

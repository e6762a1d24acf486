//! HTML serializer for arena nodes.
//!
//! Follows HTML5 serialization rules:
//!
//! - Void elements never get end tags
//! - Text content is escaped, except inside raw text elements (script, style)
//! - RCDATA elements (title, textarea) escape only `&` and `<`
//! - Attribute values are escaped and double-quoted
//! - Every non-void element gets an end tag, SVG and MathML included
//! - Fragment containers produce no markup of their own
//!
//! The walk uses indextree's `traverse`, so output depth is not bounded by
//! the call stack.

use indextree::{NodeEdge, NodeId};
use std::fmt::Write;

use crate::dom::{Document, ElementData, NodeKind};

/// Options for HTML serialization.
#[derive(Clone, Debug)]
pub struct SerializeOptions {
    /// Whether to sort attributes alphabetically (default: false, which
    /// keeps insertion order).
    pub sort_attributes: bool,
    /// Whether to escape `</script` sequences in script content (default: true for safety)
    pub escape_script_end_tags: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            sort_attributes: false,
            escape_script_end_tags: true,
        }
    }
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable sorting attributes alphabetically for deterministic output.
    pub fn sort_attributes(mut self) -> Self {
        self.sort_attributes = true;
        self
    }

    /// Disable escaping `</script` in script content (not recommended).
    pub fn no_escape_script_end_tags(mut self) -> Self {
        self.escape_script_end_tags = false;
        self
    }
}

/// HTML5 void elements - these never have end tags.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Raw text elements - content is not escaped.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// RCDATA elements - only `&` and `<` are escaped.
const RCDATA_ELEMENTS: &[&str] = &["title", "textarea"];

fn is_one_of(set: &[&str], tag: &str) -> bool {
    set.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

/// Check if a tag is a void element.
pub fn is_void_element(tag: &str) -> bool {
    is_one_of(VOID_ELEMENTS, tag)
}

/// How text inside the current element gets written.
#[derive(Clone, Copy, PartialEq, Eq)]
enum TextMode {
    Escaped,
    Rcdata,
    Raw,
    Script,
}

struct Serializer<'a, W: Write> {
    out: &'a mut W,
    doc: &'a Document,
    options: &'a SerializeOptions,
}

impl<'a, W: Write> Serializer<'a, W> {
    fn new(out: &'a mut W, doc: &'a Document, options: &'a SerializeOptions) -> Self {
        Self { out, doc, options }
    }

    fn write_text_escaped(&mut self, text: &str) {
        for c in text.chars() {
            let _ = match c {
                '&' => self.out.write_str("&amp;"),
                '<' => self.out.write_str("&lt;"),
                '>' => self.out.write_str("&gt;"),
                _ => self.out.write_char(c),
            };
        }
    }

    fn write_rcdata_escaped(&mut self, text: &str) {
        for c in text.chars() {
            let _ = match c {
                '&' => self.out.write_str("&amp;"),
                '<' => self.out.write_str("&lt;"),
                _ => self.out.write_char(c),
            };
        }
    }

    /// Write script text, breaking up any `</script` inside it.
    fn write_script_text(&mut self, text: &str) {
        // ASCII case-insensitive matching on bytes keeps indices on char
        // boundaries
        const PATTERN: &[u8] = b"</script";
        let bytes = text.as_bytes();
        let mut last_end = 0;
        let mut i = 0;
        while i + PATTERN.len() <= bytes.len() {
            if bytes[i..i + PATTERN.len()].eq_ignore_ascii_case(PATTERN) {
                let _ = self.out.write_str(&text[last_end..i]);
                let _ = self.out.write_str("<\\/script");
                i += PATTERN.len();
                last_end = i;
            } else {
                i += 1;
            }
        }
        let _ = self.out.write_str(&text[last_end..]);
    }

    fn write_attr_value_escaped(&mut self, text: &str) {
        for c in text.chars() {
            let _ = match c {
                '&' => self.out.write_str("&amp;"),
                '<' => self.out.write_str("&lt;"),
                '>' => self.out.write_str("&gt;"),
                '"' => self.out.write_str("&quot;"),
                _ => self.out.write_char(c),
            };
        }
    }

    fn write_attr(&mut self, name: &str, value: &str) {
        let _ = write!(self.out, " {}=\"", name);
        self.write_attr_value_escaped(value);
        let _ = self.out.write_char('"');
    }

    fn write_open_tag(&mut self, elem: &ElementData) {
        let _ = write!(self.out, "<{}", elem.tag);
        if self.options.sort_attributes {
            let mut attrs: Vec<_> = elem.attrs.iter().collect();
            attrs.sort_by_key(|(k, _)| *k);
            for (name, value) in attrs {
                self.write_attr(name, value);
            }
        } else {
            for (name, value) in &elem.attrs {
                self.write_attr(name, value);
            }
        }
    }

    fn text_mode(&self, parent: Option<NodeId>) -> TextMode {
        let Some(tag) = parent.and_then(|p| self.doc.tag_name(p)) else {
            return TextMode::Escaped;
        };
        if is_one_of(RAW_TEXT_ELEMENTS, tag) {
            if self.options.escape_script_end_tags && tag.eq_ignore_ascii_case("script") {
                TextMode::Script
            } else {
                TextMode::Raw
            }
        } else if is_one_of(RCDATA_ELEMENTS, tag) {
            TextMode::Rcdata
        } else {
            TextMode::Escaped
        }
    }

    /// Write `id` and its subtree (or only the subtree when `inner`).
    fn write_subtree(&mut self, id: NodeId, inner: bool) {
        let doc = self.doc;
        for edge in id.traverse(&doc.arena) {
            match edge {
                NodeEdge::Start(node) => {
                    if inner && node == id {
                        continue;
                    }
                    self.start(node);
                }
                NodeEdge::End(node) => {
                    if inner && node == id {
                        continue;
                    }
                    self.end(node);
                }
            }
        }
    }

    fn start(&mut self, node: NodeId) {
        let doc = self.doc;
        let data = doc.get(node);
        match &data.kind {
            NodeKind::Fragment => {}
            NodeKind::Element(elem) => {
                self.write_open_tag(elem);
                let _ = self.out.write_char('>');
            }
            NodeKind::Text(text) => match self.text_mode(doc.parent(node)) {
                TextMode::Escaped => self.write_text_escaped(text),
                TextMode::Rcdata => self.write_rcdata_escaped(text),
                TextMode::Raw => {
                    let _ = self.out.write_str(text);
                }
                TextMode::Script => self.write_script_text(text),
            },
            NodeKind::Comment(text) => {
                let _ = write!(self.out, "<!--{}-->", text);
            }
        }
    }

    fn end(&mut self, node: NodeId) {
        if let NodeKind::Element(elem) = &self.doc.get(node).kind {
            if is_void_element(&elem.tag) {
                return;
            }
            let _ = write!(self.out, "</{}>", elem.tag);
        }
    }
}

impl Document {
    /// Serialize a node and its subtree with default options.
    pub fn outer_html(&self, id: NodeId) -> String {
        self.outer_html_with_options(id, &SerializeOptions::default())
    }

    /// Serialize the children of a node with default options.
    pub fn inner_html(&self, id: NodeId) -> String {
        self.inner_html_with_options(id, &SerializeOptions::default())
    }

    pub fn outer_html_with_options(&self, id: NodeId, opts: &SerializeOptions) -> String {
        let mut out = String::new();
        Serializer::new(&mut out, self, opts).write_subtree(id, false);
        out
    }

    pub fn inner_html_with_options(&self, id: NodeId, opts: &SerializeOptions) -> String {
        let mut out = String::new();
        Serializer::new(&mut out, self, opts).write_subtree(id, true);
        out
    }
}

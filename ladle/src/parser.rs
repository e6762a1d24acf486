//! HTML fragment parsing.
//!
//! html5ever builds nodes straight into the target document's arena through
//! a [`TreeSink`]. The tree builder always produces a full document
//! (`html`/`head`/`body`), so once it is done the head and body children are
//! lifted into a fragment container and the scaffolding is discarded.

use html5ever::tree_builder::{ElemName, ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute, LocalName, QualName, parse_document};
use indexmap::IndexMap;
use indextree::{Arena, NodeId};
use std::borrow::Cow;
use std::cell::RefCell;
use tendril::{StrTendril, TendrilSink};

use crate::debug;
use crate::dom::{Document, ElementData, Namespace, NodeData, NodeKind};

impl Document {
    /// Parse an HTML fragment into this document.
    ///
    /// Returns the top-level nodes, in order. They are siblings under a fresh
    /// fragment container, so they have no element parent but can still be
    /// navigated between. Whitespace-only top-level text is dropped, and
    /// markup the tokenizer cannot finish (`<div`) produces nothing.
    pub fn parse_fragment(&mut self, html: &str) -> Vec<NodeId> {
        let sink = ForestSink::new(&mut self.arena);
        let container = parse_document(sink, Default::default()).one(StrTendril::from(html));
        self.lift_forest(container)
    }

    /// Replace the scaffolding under `container` with the content it wraps.
    fn lift_forest(&mut self, container: NodeId) -> Vec<NodeId> {
        let mut forest = Vec::new();
        let top: Vec<NodeId> = self.children(container).collect();
        for node in top {
            match self.kind(node) {
                NodeKind::Element(elem) if elem.tag.as_ref() == "html" => {
                    for section in self.element_children(node).collect::<Vec<_>>() {
                        forest.extend(self.children(section));
                    }
                }
                NodeKind::Comment(_) => forest.push(node),
                _ => {}
            }
        }

        forest.retain(|&node| match self.kind(node) {
            NodeKind::Text(text) => !text.trim().is_empty(),
            _ => true,
        });
        for &node in &forest {
            node.detach(&mut self.arena);
        }
        // html/head/body and dropped whitespace
        let scaffolding: Vec<NodeId> = self.children(container).collect();
        for node in scaffolding {
            self.discard(node);
        }
        for &node in &forest {
            container.append(node, &mut self.arena);
        }
        self.discard_if_drained(container);

        debug!(count = forest.len(), "parsed fragment");
        forest
    }
}

/// Owned element name wrapper
#[derive(Debug, Clone)]
struct OwnedElemName(QualName);

impl ElemName for OwnedElemName {
    fn ns(&self) -> &html5ever::Namespace {
        &self.0.ns
    }

    fn local_name(&self) -> &LocalName {
        &self.0.local
    }
}

/// TreeSink that writes into an existing document's arena
struct ForestSink<'d> {
    arena: RefCell<&'d mut Arena<NodeData>>,

    /// Stands in for the html5ever document node; becomes the fragment
    /// container once parsing is done.
    container: NodeId,
}

impl<'d> ForestSink<'d> {
    fn new(arena: &'d mut Arena<NodeData>) -> Self {
        let container = arena.new_node(NodeData {
            kind: NodeKind::Fragment,
            ns: Namespace::Html,
        });
        ForestSink {
            arena: RefCell::new(arena),
            container,
        }
    }

    fn new_text(&self, text: StrTendril) -> NodeId {
        self.arena.borrow_mut().new_node(NodeData {
            kind: NodeKind::Text(text),
            ns: Namespace::Html,
        })
    }
}

impl TreeSink for ForestSink<'_> {
    type Handle = NodeId;
    type Output = NodeId;
    type ElemName<'a>
        = OwnedElemName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        self.container
    }

    fn parse_error(&self, _msg: Cow<'static, str>) {
        // html5ever recovers on its own
    }

    fn get_document(&self) -> Self::Handle {
        self.container
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn same_node(&self, a: &Self::Handle, b: &Self::Handle) -> bool {
        a == b
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> OwnedElemName {
        let arena = self.arena.borrow();
        let node = arena[*target].get();

        let (ns, local) = match &node.kind {
            NodeKind::Element(elem) => (node.ns, LocalName::from(elem.tag.as_ref())),
            _ => (Namespace::Html, LocalName::from("")),
        };
        OwnedElemName(QualName {
            prefix: None,
            ns: html5ever::Namespace::from(ns.url()),
            local,
        })
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let attrs: IndexMap<_, _> = attrs
            .into_iter()
            .map(|attr| (attr.name.local.to_string(), attr.value))
            .collect();

        self.arena.borrow_mut().new_node(NodeData {
            kind: NodeKind::Element(ElementData {
                tag: StrTendril::from(name.local.as_ref()),
                attrs,
                props: IndexMap::new(),
            }),
            ns: Namespace::from_url(name.ns.as_ref()),
        })
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        self.arena.borrow_mut().new_node(NodeData {
            kind: NodeKind::Comment(text),
            ns: Namespace::Html,
        })
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> Self::Handle {
        self.create_comment(StrTendril::new())
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        match child {
            NodeOrText::AppendNode(node) => {
                parent.append(node, &mut self.arena.borrow_mut());
            }
            NodeOrText::AppendText(text) => {
                {
                    let mut arena = self.arena.borrow_mut();
                    let last_child = parent.children(&arena).next_back();
                    if let Some(last_child) = last_child
                        && let NodeKind::Text(existing) = &mut arena[last_child].get_mut().kind
                    {
                        existing.push_tendril(&text);
                        return;
                    }
                }
                let text_node = self.new_text(text);
                parent.append(text_node, &mut self.arena.borrow_mut());
            }
        }
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        let node = match new_node {
            NodeOrText::AppendNode(node) => node,
            NodeOrText::AppendText(text) => self.new_text(text),
        };
        sibling.insert_before(node, &mut self.arena.borrow_mut());
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        _prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        self.append(element, child);
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        // template content stays inline
        *target
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>) {
        let mut arena = self.arena.borrow_mut();
        if let NodeKind::Element(elem) = &mut arena[*target].get_mut().kind {
            for attr in attrs {
                elem.attrs
                    .entry(attr.name.local.to_string())
                    .or_insert(attr.value);
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        target.detach(&mut self.arena.borrow_mut());
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let mut arena = self.arena.borrow_mut();
        let children: Vec<NodeId> = node.children(&arena).collect();
        for child in children {
            child.detach(&mut arena);
            new_parent.append(child, &mut arena);
        }
    }
}

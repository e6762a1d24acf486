//! Inserting, wrapping, removing and copying nodes.
//!
//! When content goes to several targets, the first target receives the
//! original nodes and every later target a deep copy. Insertions the tree
//! refuses (a node into its own subtree, children under a text node) are
//! skipped for that target only.

use indextree::NodeId;
use sieve::SelectorError;
use smallvec::SmallVec;

use super::{Collection, Content, Dom, Target};
use crate::debug;
use crate::dom::{Document, DomError, NodeKind};
use crate::matcher::matches_list;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Place {
    Append,
    Prepend,
    Before,
    After,
}

fn log_refused(_node: NodeId, _target: NodeId, _err: DomError) {
    debug!(node = ?_node, target = ?_target, error = %_err, "insertion refused");
}

/// Insert `nodes`, in order, at `place` relative to `target`. Returns the
/// nodes that were placed.
fn place_nodes(
    doc: &mut Document,
    place: Place,
    target: NodeId,
    nodes: &[NodeId],
) -> SmallVec<[NodeId; 4]> {
    let mut placed = SmallVec::new();
    // prepended nodes go before this one; a node that already sits there
    // stays put and the insertion point moves past it
    let mut reference = doc.first_child(target);
    let mut anchor = target;
    for &node in nodes {
        let result = match place {
            Place::Append => doc.append_child(target, node),
            Place::Prepend if reference == Some(node) => {
                reference = doc.next_sibling(node);
                Ok(())
            }
            Place::Prepend => doc.insert_before(target, node, reference),
            Place::Before => doc.insert_sibling_before(target, node),
            Place::After => doc.insert_sibling_after(anchor, node),
        };
        match result {
            Ok(()) => {
                if place == Place::After {
                    anchor = node;
                }
                placed.push(node);
            }
            Err(err) => log_refused(node, target, err),
        }
    }
    placed
}

/// Register nodes that ended up directly under a fragment container, so a
/// bare selector still finds them.
fn adopt_top_level(doc: &mut Document, nodes: &[NodeId]) {
    let top: Vec<NodeId> = nodes
        .iter()
        .copied()
        .filter(|&n| {
            doc.parent(n)
                .is_some_and(|p| matches!(doc.kind(p), NodeKind::Fragment))
        })
        .collect();
    if !top.is_empty() {
        doc.register_roots(&top);
    }
}

/// Give `originals` to the first target and deep copies to the rest.
fn distribute(
    doc: &mut Document,
    targets: &[NodeId],
    originals: &[NodeId],
    place: Place,
) -> Vec<NodeId> {
    let mut inserted = Vec::new();
    for (i, &target) in targets.iter().enumerate() {
        let batch: SmallVec<[NodeId; 4]> = if i == 0 {
            originals.iter().copied().collect()
        } else {
            originals
                .iter()
                .map(|&node| doc.clone_node(node, true))
                .collect()
        };
        inserted.extend(place_nodes(doc, place, target, &batch));
    }
    if matches!(place, Place::Before | Place::After) {
        adopt_top_level(doc, &inserted);
    }
    debug!(
        targets = targets.len(),
        inserted = inserted.len(),
        ?place,
        "distributed content"
    );
    inserted
}

/// The fragment container freshly parsed `nodes` sit in. Nothing outside
/// this module can reach it, so it is freed once the content is placed.
fn scratch_container(doc: &Document, parsed: bool, nodes: &[NodeId]) -> Option<NodeId> {
    if !parsed {
        return None;
    }
    nodes.first().and_then(|&n| doc.parent(n))
}

/// Free a scratch container along with whatever content was never placed.
fn discard_scratch(doc: &mut Document, scratch: Option<NodeId>) {
    if let Some(container) = scratch {
        doc.discard(container);
    }
}

/// Descend through first element children as far as possible.
fn innermost(doc: &Document, mut node: NodeId) -> NodeId {
    while let Some(child) = doc.element_children(node).next() {
        node = child;
    }
    node
}

impl Collection {
    fn insert_content(&self, content: Content, place: Place) -> &Self {
        let parsed = content.is_markup();
        let nodes = content.into_nodes(&self.dom);
        let mut doc = self.dom.borrow_mut();
        let scratch = scratch_container(&doc, parsed, &nodes);
        distribute(&mut doc, &self.nodes, &nodes, place);
        discard_scratch(&mut doc, scratch);
        self
    }

    fn insert_into(&self, target: Target, place: Place) -> Result<Collection, SelectorError> {
        let (dom, targets) = target.resolve(&self.dom)?;
        let nodes = Content::Collection(self.clone()).into_nodes(&dom);
        let inserted = distribute(&mut dom.borrow_mut(), &targets, &nodes, place);
        Ok(self.push_stack_in(&dom, inserted))
    }

    /// Insert content at the end of every node.
    pub fn append(&self, content: impl Into<Content>) -> &Self {
        self.insert_content(content.into(), Place::Append)
    }

    /// Insert content at the start of every node.
    pub fn prepend(&self, content: impl Into<Content>) -> &Self {
        self.insert_content(content.into(), Place::Prepend)
    }

    /// Insert content right before every node.
    pub fn before(&self, content: impl Into<Content>) -> &Self {
        self.insert_content(content.into(), Place::Before)
    }

    /// Insert content right after every node.
    pub fn after(&self, content: impl Into<Content>) -> &Self {
        self.insert_content(content.into(), Place::After)
    }

    /// Append these nodes to every target. Returns everything inserted.
    pub fn append_to(&self, target: impl Into<Target>) -> Result<Collection, SelectorError> {
        self.insert_into(target.into(), Place::Append)
    }

    /// Prepend these nodes to every target. Returns everything inserted.
    pub fn prepend_to(&self, target: impl Into<Target>) -> Result<Collection, SelectorError> {
        self.insert_into(target.into(), Place::Prepend)
    }

    /// Put these nodes before every target. Returns everything inserted.
    pub fn insert_before(&self, target: impl Into<Target>) -> Result<Collection, SelectorError> {
        self.insert_into(target.into(), Place::Before)
    }

    /// Put these nodes after every target. Returns everything inserted.
    pub fn insert_after(&self, target: impl Into<Target>) -> Result<Collection, SelectorError> {
        self.insert_into(target.into(), Place::After)
    }

    /// The first element of some content, used as a wrapper template, plus
    /// the container to free once the template has been copied.
    fn wrapper_template(&self, content: Content) -> Option<(NodeId, Option<NodeId>)> {
        let parsed = content.is_markup();
        let nodes = content.into_nodes(&self.dom);
        let mut doc = self.dom.borrow_mut();
        let scratch = scratch_container(&doc, parsed, &nodes);
        let template = nodes.iter().copied().find(|&n| doc.is_element(n));
        match template {
            Some(template) => Some((template, scratch)),
            None => {
                discard_scratch(&mut doc, scratch);
                None
            }
        }
    }

    /// Wrap each node in its own copy of the wrapper structure. The node
    /// goes into the innermost first element of the copy.
    pub fn wrap(&self, content: impl Into<Content>) -> &Self {
        let Some((template, scratch)) = self.wrapper_template(content.into()) else {
            return self;
        };
        let mut doc = self.dom.borrow_mut();
        for &node in &self.nodes {
            let wrapper = doc.clone_node(template, true);
            if doc.parent(node).is_some()
                && let Err(err) = doc.insert_sibling_before(node, wrapper)
            {
                log_refused(wrapper, node, err);
                doc.discard(wrapper);
                continue;
            }
            let inner = innermost(&doc, wrapper);
            if let Err(err) = doc.append_child(inner, node) {
                log_refused(node, inner, err);
            }
            adopt_top_level(&mut doc, &[wrapper]);
        }
        discard_scratch(&mut doc, scratch);
        self
    }

    /// Wrap all nodes together in one copy of the wrapper, placed where the
    /// first node was.
    pub fn wrap_all(&self, content: impl Into<Content>) -> &Self {
        let Some(&first) = self.nodes.first() else {
            return self;
        };
        let Some((template, scratch)) = self.wrapper_template(content.into()) else {
            return self;
        };
        let mut doc = self.dom.borrow_mut();
        let wrapper = doc.clone_node(template, true);
        discard_scratch(&mut doc, scratch);
        if doc.parent(first).is_some()
            && let Err(err) = doc.insert_sibling_before(first, wrapper)
        {
            log_refused(wrapper, first, err);
            doc.discard(wrapper);
            return self;
        }
        let inner = innermost(&doc, wrapper);
        for &node in &self.nodes {
            if let Err(err) = doc.append_child(inner, node) {
                log_refused(node, inner, err);
            }
        }
        adopt_top_level(&mut doc, &[wrapper]);
        self
    }

    /// Wrap the children of each node in a copy of the wrapper.
    pub fn wrap_inner(&self, content: impl Into<Content>) -> &Self {
        let Some((template, scratch)) = self.wrapper_template(content.into()) else {
            return self;
        };
        let mut doc = self.dom.borrow_mut();
        for &node in &self.nodes {
            let wrapper = doc.clone_node(template, true);
            let children: Vec<NodeId> = doc.children(node).collect();
            if let Err(err) = doc.append_child(node, wrapper) {
                log_refused(wrapper, node, err);
                doc.discard(wrapper);
                continue;
            }
            let inner = innermost(&doc, wrapper);
            for child in children {
                if let Err(err) = doc.append_child(inner, child) {
                    log_refused(child, inner, err);
                }
            }
        }
        discard_scratch(&mut doc, scratch);
        self
    }

    /// Detach the nodes (those matching `filter`, if given) from the tree.
    /// Their subtrees stay intact and can be inserted again.
    pub fn remove(&self, filter: Option<&str>) -> Result<&Self, SelectorError> {
        let filter = filter.map(sieve::parse).transpose()?;
        let mut doc = self.dom.borrow_mut();
        let doomed: Vec<NodeId> = self
            .iter()
            .filter(|&n| filter.as_ref().is_none_or(|list| matches_list(&doc, n, list)))
            .collect();
        for &node in &doomed {
            doc.detach(node);
        }
        doc.unregister_roots(&doomed);
        debug!(count = doomed.len(), "removed nodes");
        Ok(self)
    }

    /// Detach every child of every node.
    pub fn empty(&self) -> &Self {
        let mut doc = self.dom.borrow_mut();
        for &node in &self.nodes {
            doc.clear_children(node);
        }
        self
    }

    /// Deep, detached copies of every node.
    pub fn clone_nodes(&self) -> Collection {
        let copies: Vec<NodeId> = {
            let mut doc = self.dom.borrow_mut();
            self.iter().map(|n| doc.clone_node(n, true)).collect()
        };
        self.push_stack(copies)
    }

    /// Concatenated text of every node.
    pub fn text(&self) -> String {
        let doc = self.dom.borrow();
        self.iter().map(|n| doc.text_content(n)).collect()
    }

    /// Replace the content of every node with a single text node.
    pub fn set_text(&self, text: &str) -> &Self {
        let mut doc = self.dom.borrow_mut();
        for &node in &self.nodes {
            doc.set_text_content(node, text);
        }
        self
    }

    /// Markup inside the first node.
    pub fn html(&self) -> Option<String> {
        let first = self.get(0)?;
        Some(self.dom.borrow().inner_html(first))
    }

    /// Replace the children of every element with parsed markup.
    pub fn set_html(&self, html: &str) -> &Self {
        let elements: Vec<NodeId> = {
            let doc = self.dom.borrow();
            self.iter().filter(|&n| doc.is_element(n)).collect()
        };
        let mut doc = self.dom.borrow_mut();
        for &node in &elements {
            doc.clear_children(node);
        }
        let nodes = doc.parse_fragment(html);
        let scratch = scratch_container(&doc, true, &nodes);
        distribute(&mut doc, &elements, &nodes, Place::Append);
        discard_scratch(&mut doc, scratch);
        self
    }

    /// Markup of every node, concatenated.
    pub fn outer_html(&self) -> String {
        let doc = self.dom.borrow();
        self.iter().map(|n| doc.outer_html(n)).collect()
    }
}

impl Dom {
    /// Parse `html` into this document without registering its top-level
    /// nodes as roots. They sit as siblings under their own fragment
    /// container, so a bare selector does not see them until they are
    /// inserted somewhere.
    pub fn fragment(&self, html: &str) -> Collection {
        let nodes = self.borrow_mut().parse_fragment(html);
        Collection::new(self, nodes)
    }
}

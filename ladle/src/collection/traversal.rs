//! Tree traversal: each method maps every node of the collection to related
//! nodes and returns the de-duplicated result as a new link in the chain.

use indextree::NodeId;
use sieve::{SelectorError, SelectorList};

use super::{Collection, Target};
use crate::dom::{Document, NodeKind};
use crate::matcher::matches_list;

/// Keep the nodes matching an optional selector filter.
fn apply_filter(
    doc: &Document,
    nodes: Vec<NodeId>,
    filter: Option<&SelectorList>,
) -> Vec<NodeId> {
    match filter {
        Some(list) => nodes
            .into_iter()
            .filter(|&n| matches_list(doc, n, list))
            .collect(),
        None => nodes,
    }
}

fn parse_filter(filter: Option<&str>) -> Result<Option<SelectorList>, SelectorError> {
    filter.map(sieve::parse).transpose()
}

impl Collection {
    /// Collect related nodes of every node, then apply `filter`.
    fn gather<F, I>(&self, filter: Option<&str>, mut related: F) -> Result<Collection, SelectorError>
    where
        F: FnMut(&Document, NodeId) -> I,
        I: IntoIterator<Item = NodeId>,
    {
        let filter = parse_filter(filter)?;
        let nodes = {
            let guard = self.dom.borrow();
            let doc: &Document = &guard;
            let found: Vec<NodeId> = self.nodes.iter().flat_map(|&n| related(doc, n)).collect();
            apply_filter(doc, super::dedup(found), filter.as_ref())
        };
        Ok(self.push_stack(nodes))
    }

    /// Descendants of every node matching `selector`, in document order.
    pub fn find(&self, selector: &str) -> Result<Collection, SelectorError> {
        let list = sieve::parse(selector)?;
        Ok(self.push_stack(self.query_below(&list)))
    }

    /// Direct element children.
    pub fn children(&self, filter: Option<&str>) -> Result<Collection, SelectorError> {
        self.gather(filter, |doc, n| doc.element_children(n).collect::<Vec<_>>())
    }

    /// Every child, text and comments included.
    pub fn contents(&self) -> Collection {
        let doc = self.dom.borrow();
        let nodes: Vec<NodeId> = self.nodes.iter().flat_map(|&n| doc.children(n)).collect();
        drop(doc);
        self.push_stack(nodes)
    }

    /// Element parents.
    pub fn parent(&self, filter: Option<&str>) -> Result<Collection, SelectorError> {
        self.gather(filter, |doc, n| doc.parent_element(n))
    }

    /// Element ancestors, nearest first.
    pub fn parents(&self, filter: Option<&str>) -> Result<Collection, SelectorError> {
        self.gather(filter, element_ancestors)
    }

    /// Element ancestors up to (not including) the first one matching `stop`.
    pub fn parents_until(
        &self,
        stop: impl Into<Target>,
        filter: Option<&str>,
    ) -> Result<Collection, SelectorError> {
        let stop = stop.into().matcher(&self.dom)?;
        self.gather(filter, |doc, n| {
            element_ancestors(doc, n)
                .into_iter()
                .take_while(|&a| !stop.matches(doc, a))
                .collect::<Vec<_>>()
        })
    }

    /// Other element children of each node's parent, in document order.
    pub fn siblings(&self, filter: Option<&str>) -> Result<Collection, SelectorError> {
        self.gather(filter, |doc, n| match doc.parent(n) {
            Some(parent) => doc
                .element_children(parent)
                .filter(|&s| s != n)
                .collect::<Vec<_>>(),
            None => Vec::new(),
        })
    }

    /// The next element sibling of each node.
    pub fn next(&self, filter: Option<&str>) -> Result<Collection, SelectorError> {
        self.gather(filter, |doc, n| doc.next_element_sibling(n))
    }

    /// All following element siblings, in document order.
    pub fn next_all(&self, filter: Option<&str>) -> Result<Collection, SelectorError> {
        self.gather(filter, following_elements)
    }

    /// Following element siblings up to (not including) the first one
    /// matching `stop`, nearest first.
    pub fn next_until(
        &self,
        stop: impl Into<Target>,
        filter: Option<&str>,
    ) -> Result<Collection, SelectorError> {
        let stop = stop.into().matcher(&self.dom)?;
        self.gather(filter, |doc, n| {
            following_elements(doc, n)
                .into_iter()
                .take_while(|&s| !stop.matches(doc, s))
                .collect::<Vec<_>>()
        })
    }

    /// The previous element sibling of each node.
    pub fn prev(&self, filter: Option<&str>) -> Result<Collection, SelectorError> {
        self.gather(filter, |doc, n| doc.prev_element_sibling(n))
    }

    /// All preceding element siblings, earliest first.
    pub fn prev_all(&self, filter: Option<&str>) -> Result<Collection, SelectorError> {
        self.gather(filter, |doc, n| {
            let mut before = preceding_elements(doc, n);
            before.reverse();
            before
        })
    }

    /// Preceding element siblings up to (not including) the first one
    /// matching `stop`, walking backwards: nearest first.
    pub fn prev_until(
        &self,
        stop: impl Into<Target>,
        filter: Option<&str>,
    ) -> Result<Collection, SelectorError> {
        let stop = stop.into().matcher(&self.dom)?;
        self.gather(filter, |doc, n| {
            preceding_elements(doc, n)
                .into_iter()
                .take_while(|&s| !stop.matches(doc, s))
                .collect::<Vec<_>>()
        })
    }

    /// For each node, itself or its nearest element ancestor matching
    /// `selector`.
    pub fn closest(&self, selector: &str) -> Result<Collection, SelectorError> {
        let list = sieve::parse(selector)?;
        let nodes = {
            let doc = self.dom.borrow();
            self.nodes
                .iter()
                .filter_map(|&n| {
                    std::iter::once(n)
                        .chain(element_ancestors(&doc, n))
                        .find(|&c| matches_list(&doc, c, &list))
                })
                .collect::<Vec<_>>()
        };
        Ok(self.push_stack(nodes))
    }

    /// Nodes between `start` and `end`; negative indices count from the end.
    pub fn slice(&self, start: isize, end: Option<isize>) -> Collection {
        let len = self.nodes.len();
        let resolve = |i: isize| -> usize {
            if i < 0 {
                len.saturating_sub(i.unsigned_abs())
            } else {
                (i as usize).min(len)
            }
        };
        let start = resolve(start);
        let end = end.map_or(len, resolve);
        let nodes = if start < end {
            self.nodes[start..end].to_vec()
        } else {
            Vec::new()
        };
        self.push_stack(nodes)
    }

    /// The node at `index` (negative counts from the end), or nothing.
    pub fn eq(&self, index: isize) -> Collection {
        let len = self.nodes.len() as isize;
        let index = if index < 0 { len + index } else { index };
        let node = (0..len)
            .contains(&index)
            .then(|| self.nodes[index as usize]);
        self.push_stack(node)
    }

    pub fn first(&self) -> Collection {
        self.eq(0)
    }

    pub fn last(&self) -> Collection {
        self.eq(-1)
    }

    /// This collection plus the nodes of `other`, in document order.
    pub fn add(&self, other: impl Into<Target>) -> Result<Collection, SelectorError> {
        let (dom, extra) = other.into().resolve(&self.dom)?;
        let extra = if dom.ptr_eq(&self.dom) {
            extra
        } else {
            crate::debug!(count = extra.len(), "add: ignoring nodes of another document");
            Vec::new()
        };
        let mut nodes = super::dedup(self.nodes.iter().copied().chain(extra));
        self.dom.borrow().sort_by_document_order(&mut nodes);
        Ok(self.push_stack(nodes))
    }
}

fn element_ancestors(doc: &Document, node: NodeId) -> Vec<NodeId> {
    doc.ancestors(node)
        .take_while(|&a| !matches!(doc.kind(a), NodeKind::Fragment))
        .filter(|&a| doc.is_element(a))
        .collect()
}

fn following_elements(doc: &Document, node: NodeId) -> Vec<NodeId> {
    doc.following_siblings(node)
        .filter(|&s| doc.is_element(s))
        .collect()
}

/// Preceding element siblings, nearest first.
fn preceding_elements(doc: &Document, node: NodeId) -> Vec<NodeId> {
    doc.preceding_siblings(node)
        .filter(|&s| doc.is_element(s))
        .collect()
}

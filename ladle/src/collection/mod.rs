//! jQuery-style node collections.
//!
//! A [`Collection`] is an ordered, duplicate-free list of nodes from one
//! [`Dom`], plus a link to the collection it was derived from so that
//! [`Collection::end`] can step back up a chain. Every chaining method
//! returns a new collection; mutations go through the shared document and
//! are visible to every collection holding the same `Dom`.

mod args;
mod attributes;
mod filtering;
mod manipulation;
mod traversal;

pub use args::{Content, Target, Verdict};

use indextree::NodeId;
use rapidhash::RapidHashSet as HashSet;
use sieve::{SelectorError, SelectorList};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::dom::{Document, NodeRef};
use crate::matcher::{Scope, query_all};
use crate::registry;
#[allow(unused_imports)]
use crate::trace;

/// A document shared between collections.
#[derive(Clone, Default)]
pub struct Dom(Rc<RefCell<Document>>);

impl Dom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(doc: Document) -> Self {
        Dom(Rc::new(RefCell::new(doc)))
    }

    pub fn borrow(&self) -> Ref<'_, Document> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Document> {
        self.0.borrow_mut()
    }

    /// Whether both handles point at the same document.
    pub fn ptr_eq(&self, other: &Dom) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Parse an HTML fragment into this document and register its top-level
    /// nodes as roots.
    pub fn parse(&self, html: &str) -> Collection {
        let nodes = {
            let mut doc = self.borrow_mut();
            let nodes = doc.parse_fragment(html);
            doc.register_roots(&nodes);
            nodes
        };
        Collection::new(self, nodes)
    }

    /// Match a selector against every registered root that is still
    /// top-level, the roots included.
    pub fn select(&self, selector: &str) -> Result<Collection, SelectorError> {
        let list = sieve::parse(selector)?;
        let nodes = {
            let doc = self.borrow();
            let roots: Vec<NodeId> = doc.live_roots().collect();
            query_all(&doc, &roots, &list, Scope::Inclusive)
        };
        trace!(selector, found = nodes.len(), "select");
        Ok(Collection::new(self, nodes))
    }
}

impl fmt::Debug for Dom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(doc) => f
                .debug_struct("Dom")
                .field("nodes", &doc.node_count())
                .field("roots", &doc.roots().len())
                .finish(),
            Err(_) => f.write_str("Dom(<borrowed>)"),
        }
    }
}

/// An ordered set of nodes from one [`Dom`].
#[derive(Clone)]
pub struct Collection {
    dom: Dom,
    nodes: Vec<NodeId>,
    prev: Option<Rc<Collection>>,
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("nodes", &self.nodes)
            .field("has_prev", &self.prev.is_some())
            .finish()
    }
}

/// Remove repeated nodes, keeping the first occurrence.
pub(crate) fn dedup(nodes: impl IntoIterator<Item = NodeId>) -> Vec<NodeId> {
    let mut seen: HashSet<NodeId> = HashSet::default();
    nodes.into_iter().filter(|n| seen.insert(*n)).collect()
}

impl Collection {
    /// A collection over explicit nodes of `dom`. Duplicates are dropped.
    pub fn new(dom: &Dom, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Collection {
            dom: dom.clone(),
            nodes: dedup(nodes),
            prev: None,
        }
    }

    /// Select against the roots of the current thread's registry.
    pub fn select(selector: &str) -> Result<Self, SelectorError> {
        registry::current().select(selector)
    }

    /// Parse HTML into the current thread's registry document, registering
    /// the top-level nodes.
    pub fn parse(html: &str) -> Self {
        registry::current().parse(html)
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.nodes.get(index).copied()
    }

    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, NodeId>> {
        self.nodes.iter().copied()
    }

    /// Derive a new collection whose [`end`](Self::end) is `self`.
    pub(crate) fn push_stack(&self, nodes: impl IntoIterator<Item = NodeId>) -> Collection {
        Collection {
            dom: self.dom.clone(),
            nodes: dedup(nodes),
            prev: Some(Rc::new(self.clone())),
        }
    }

    /// Like [`push_stack`](Self::push_stack), for nodes of another document.
    pub(crate) fn push_stack_in(
        &self,
        dom: &Dom,
        nodes: impl IntoIterator<Item = NodeId>,
    ) -> Collection {
        Collection {
            dom: dom.clone(),
            nodes: dedup(nodes),
            prev: Some(Rc::new(self.clone())),
        }
    }

    /// The collection this one was derived from, or an empty one at the
    /// start of a chain.
    pub fn end(&self) -> Collection {
        match &self.prev {
            Some(prev) => (**prev).clone(),
            None => Collection::new(&self.dom, []),
        }
    }

    /// Call `f` for each node in order, stopping early when it returns
    /// `false`.
    pub fn each<F>(&self, mut f: F) -> &Self
    where
        F: FnMut(usize, NodeRef<'_>) -> bool,
    {
        let doc = self.dom.borrow();
        for (i, &node) in self.nodes.iter().enumerate() {
            if !f(i, doc.node(node)) {
                break;
            }
        }
        self
    }

    /// Collect `f` over each node, skipping `None`.
    pub fn map<T, F>(&self, mut f: F) -> Vec<T>
    where
        F: FnMut(usize, NodeRef<'_>) -> Option<T>,
    {
        let doc = self.dom.borrow();
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, &node)| f(i, doc.node(node)))
            .collect()
    }

    /// Run a scoped query below every node of this collection.
    pub(crate) fn query_below(&self, list: &SelectorList) -> Vec<NodeId> {
        query_all(&self.dom.borrow(), &self.nodes, list, Scope::Descendants)
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = NodeId;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, NodeId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_drops_duplicates() {
        let dom = Dom::new();
        let (a, b) = {
            let mut doc = dom.borrow_mut();
            (doc.create_element("a"), doc.create_element("b"))
        };
        let c = Collection::new(&dom, [a, b, a, b]);
        assert_eq!(c.nodes(), &[a, b]);
    }

    #[test]
    fn test_end_walks_back_up() {
        let dom = Dom::new();
        let list = dom.parse("<ul><li>a</li><li>b</li></ul>");
        let items = list.find("li").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items.end().nodes(), list.nodes());
        assert!(list.end().is_empty());
    }

    #[test]
    fn test_each_stops_on_false() {
        let dom = Dom::new();
        let items = dom.parse("<i>1</i><i>2</i><i>3</i>");
        let mut seen = Vec::new();
        items.each(|i, node| {
            seen.push(node.text());
            i < 1
        });
        assert_eq!(seen, vec!["1", "2"]);
    }

    #[test]
    fn test_map_skips_none() {
        let dom = Dom::new();
        let items = dom.parse(r#"<i id="a"></i><i></i><i id="c"></i>"#);
        let ids = items.map(|_, node| node.attr("id").map(str::to_string));
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_select_sees_only_live_roots() {
        let dom = Dom::new();
        let first = dom.parse("<p class=x>1</p>");
        let holder = dom.parse("<div></div>");
        assert_eq!(dom.select(".x").unwrap().len(), 1);

        holder.append(&first);
        // still reachable through the div's subtree
        assert_eq!(dom.select(".x").unwrap().len(), 1);

        holder.remove(None).unwrap();
        assert!(dom.select(".x").unwrap().is_empty());
    }
}

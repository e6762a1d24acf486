//! Narrowing a collection and asking questions about it.

use indextree::NodeId;
use sieve::SelectorError;

use super::{Collection, Target, Verdict};
use crate::dom::NodeRef;
use crate::matcher::{Scope, matches_list, query_all};

impl Collection {
    /// Keep the elements matching `selector`.
    pub fn filter(&self, selector: &str) -> Result<Collection, SelectorError> {
        let list = sieve::parse(selector)?;
        let nodes: Vec<NodeId> = {
            let doc = self.dom.borrow();
            self.iter()
                .filter(|&n| matches_list(&doc, n, &list))
                .collect()
        };
        Ok(self.push_stack(nodes))
    }

    /// Keep the nodes for which `predicate(index, node)` gives a definite
    /// `true`. A failing predicate only drops that node.
    pub fn filter_by<F, V>(&self, mut predicate: F) -> Collection
    where
        F: FnMut(usize, NodeRef<'_>) -> V,
        V: Verdict,
    {
        let nodes: Vec<NodeId> = {
            let doc = self.dom.borrow();
            self.iter()
                .enumerate()
                .filter(|&(i, n)| predicate(i, doc.node(n)).verdict())
                .map(|(_, n)| n)
                .collect()
        };
        self.push_stack(nodes)
    }

    /// Drop the elements matching `selector`. Non-elements are kept.
    pub fn not(&self, selector: &str) -> Result<Collection, SelectorError> {
        let list = sieve::parse(selector)?;
        let nodes: Vec<NodeId> = {
            let doc = self.dom.borrow();
            self.iter()
                .filter(|&n| !matches_list(&doc, n, &list))
                .collect()
        };
        Ok(self.push_stack(nodes))
    }

    /// Drop the nodes for which `predicate(index, node)` gives a definite
    /// `true`.
    pub fn not_by<F, V>(&self, mut predicate: F) -> Collection
    where
        F: FnMut(usize, NodeRef<'_>) -> V,
        V: Verdict,
    {
        let nodes: Vec<NodeId> = {
            let doc = self.dom.borrow();
            self.iter()
                .enumerate()
                .filter(|&(i, n)| !predicate(i, doc.node(n)).verdict())
                .map(|(_, n)| n)
                .collect()
        };
        self.push_stack(nodes)
    }

    /// Keep the nodes with at least one descendant matching `selector`.
    pub fn has(&self, selector: &str) -> Result<Collection, SelectorError> {
        let list = sieve::parse(selector)?;
        let nodes: Vec<NodeId> = {
            let doc = self.dom.borrow();
            self.iter()
                .filter(|&n| !query_all(&doc, &[n], &list, Scope::Descendants).is_empty())
                .collect()
        };
        Ok(self.push_stack(nodes))
    }

    /// Whether any node matches `target`.
    pub fn is(&self, target: impl Into<Target>) -> Result<bool, SelectorError> {
        let matcher = target.into().matcher(&self.dom)?;
        let doc = self.dom.borrow();
        Ok(self.iter().any(|n| matcher.matches(&doc, n)))
    }

    /// Position of the first node among its element siblings, or -1 for an
    /// empty collection or a parentless node.
    pub fn index(&self) -> isize {
        let Some(first) = self.get(0) else {
            return -1;
        };
        let doc = self.dom.borrow();
        if doc.parent(first).is_none() {
            return -1;
        }
        doc.preceding_siblings(first)
            .filter(|&s| doc.is_element(s))
            .count() as isize
    }

    /// Position within this collection of the node `target` designates (for
    /// a selector, the first node matching it), or -1.
    pub fn index_of(&self, target: impl Into<Target>) -> Result<isize, SelectorError> {
        let target = target.into();
        let wanted: Option<NodeId> = match &target {
            Target::Selector(_) => {
                let matcher = target.matcher(&self.dom)?;
                let doc = self.dom.borrow();
                return Ok(position(self.iter().position(|n| matcher.matches(&doc, n))));
            }
            Target::Node(node) => Some(*node),
            Target::Nodes(nodes) => nodes.first().copied(),
            Target::Collection(other) if other.dom.ptr_eq(&self.dom) => other.get(0),
            Target::Collection(_) => None,
        };
        Ok(position(
            wanted.and_then(|w| self.iter().position(|n| n == w)),
        ))
    }
}

fn position(found: Option<usize>) -> isize {
    found.map_or(-1, |i| i as isize)
}

//! Arena-based node model.
//!
//! Every node of a [`Document`] lives in one indextree arena and is addressed
//! by a [`NodeId`]. Parent, sibling and child links are arena handles, so
//! there are no ownership cycles and sibling navigation is O(1).
//!
//! Detached nodes are not freed: they stay valid (and parentless) until the
//! document itself is dropped. This is what lets a removed subtree be
//! re-inserted later. Only internal scratch nodes that no handle can reach
//! (parser scaffolding, wrapper templates, drained fragment containers) are
//! returned to the arena.

use facet::Facet;
use indexmap::IndexMap;
use indextree::{Arena, NodeId};
use rapidhash::RapidHashMap as HashMap;
use tendril::StrTendril;

#[allow(unused_imports)]
use crate::trace;

/// Errors raised by explicit tree mutations.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum DomError {
    /// node is not a child of the given parent
    NotFound,
    /// node cannot be inserted there: it would become its own ancestor or the parent cannot have children
    HierarchyRequest,
    /// node is not an element
    NotAnElement,
    /// node has no parent to insert next to
    NoParent,
}

/// A tree of HTML nodes plus the list of registered root nodes.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// All nodes, attached or not.
    pub arena: Arena<NodeData>,

    /// Top-level nodes that bare selectors are resolved against.
    roots: Vec<NodeId>,
}

/// What goes in each arena slot
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub ns: Namespace,
}

/// Node types
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Invisible container owning the top-level nodes of one parsed forest.
    /// Never matched, serialized, or reported as a parent.
    Fragment,
    /// Element with tag, attributes and properties
    Element(ElementData),
    /// Text content (StrTendril is refcounted - cheap to clone)
    Text(StrTendril),
    /// HTML comment
    Comment(StrTendril),
}

/// Element data
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Tag name as produced by the parser or given to [`Document::create_element`].
    pub tag: StrTendril,

    /// Attributes - keys are String (to avoid clippy mutable_key_type), values are StrTendril.
    /// IndexMap preserves insertion order for consistent serialization
    pub attrs: IndexMap<String, StrTendril>,

    /// Properties: live state such as `checked` or `value`, never serialized.
    pub props: IndexMap<String, PropValue>,
}

impl ElementData {
    fn new(tag: &str) -> Self {
        Self {
            tag: StrTendril::from(tag),
            attrs: IndexMap::new(),
            props: IndexMap::new(),
        }
    }
}

/// A property value.
#[derive(Facet, Debug, Clone, PartialEq)]
#[repr(u8)]
pub enum PropValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::String(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::String(value)
    }
}

/// XML namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Namespace {
    #[default]
    Html,
    Svg,
    MathMl,
}

impl Namespace {
    pub fn from_url(url: &str) -> Self {
        match url {
            "http://www.w3.org/2000/svg" => Namespace::Svg,
            "http://www.w3.org/1998/Math/MathML" => Namespace::MathMl,
            _ => Namespace::Html,
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            Namespace::Html => "http://www.w3.org/1999/xhtml",
            Namespace::Svg => "http://www.w3.org/2000/svg",
            Namespace::MathMl => "http://www.w3.org/1998/Math/MathML",
        }
    }
}

/// Case-insensitive comparison used for tag names and class tokens.
pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        a.eq_ignore_ascii_case(b)
    } else {
        a.to_lowercase() == b.to_lowercase()
    }
}

/// Whether a `class` attribute value lists `class` (case-insensitively).
pub(crate) fn class_list_contains(list: &str, class: &str) -> bool {
    list.split_ascii_whitespace()
        .any(|token| eq_ignore_case(token, class))
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get immutable reference to node data
    pub fn get(&self, id: NodeId) -> &NodeData {
        self.arena[id].get()
    }

    /// Get mutable reference to node data
    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.arena[id].get_mut()
    }

    /// A read-only view of a node.
    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { doc: self, id }
    }

    /// Number of nodes currently allocated, attached or not.
    pub fn node_count(&self) -> usize {
        self.arena.iter().filter(|node| !node.is_removed()).count()
    }

    /// Free a subtree for good. Only for nodes no caller holds an id to:
    /// parser scaffolding, wrapper templates, drained containers.
    pub(crate) fn discard(&mut self, id: NodeId) {
        id.remove_subtree(&mut self.arena);
    }

    /// Free `container` if it is a fragment container with nothing left in
    /// it.
    pub(crate) fn discard_if_drained(&mut self, container: NodeId) {
        if matches!(self.kind(container), NodeKind::Fragment) && self.first_child(container).is_none()
        {
            self.discard(container);
        }
    }

    // ---------------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------------

    /// Create a detached HTML element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.create_element_ns(tag, Namespace::Html)
    }

    /// Create a detached element in the given namespace.
    pub fn create_element_ns(&mut self, tag: &str, ns: Namespace) -> NodeId {
        self.arena.new_node(NodeData {
            kind: NodeKind::Element(ElementData::new(tag)),
            ns,
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, data: &str) -> NodeId {
        self.arena.new_node(NodeData {
            kind: NodeKind::Text(StrTendril::from(data)),
            ns: Namespace::Html,
        })
    }

    /// Create a detached comment node.
    pub fn create_comment(&mut self, data: &str) -> NodeId {
        self.arena.new_node(NodeData {
            kind: NodeKind::Comment(StrTendril::from(data)),
            ns: Namespace::Html,
        })
    }

    /// Create an empty fragment container.
    pub fn create_fragment(&mut self) -> NodeId {
        self.arena.new_node(NodeData {
            kind: NodeKind::Fragment,
            ns: Namespace::Html,
        })
    }

    // ---------------------------------------------------------------------
    // Kind and element accessors
    // ---------------------------------------------------------------------

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.get(id).kind
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element(_))
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.kind(id) {
            NodeKind::Element(elem) => Some(elem),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match &mut self.get_mut(id).kind {
            NodeKind::Element(elem) => Ok(elem),
            _ => Err(DomError::NotAnElement),
        }
    }

    /// The tag name of an element, as stored.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_ref())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attrs.get(name).map(|v| v.as_ref())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let elem = self.element_mut(id)?;
        match elem.attrs.get_mut(name) {
            Some(existing) => *existing = StrTendril::from(value),
            None => {
                elem.attrs.insert(name.to_string(), StrTendril::from(value));
            }
        }
        Ok(())
    }

    /// Remove an attribute, returning its old value.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<Option<String>, DomError> {
        let elem = self.element_mut(id)?;
        Ok(elem.attrs.shift_remove(name).map(|v| v.to_string()))
    }

    /// Attributes in insertion order. Empty for non-elements.
    pub fn attrs(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.element(id)
            .into_iter()
            .flat_map(|e| e.attrs.iter().map(|(k, v)| (k.as_str(), v.as_ref())))
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|list| class_list_contains(list, class))
    }

    pub fn prop(&self, id: NodeId, name: &str) -> Option<&PropValue> {
        self.element(id)?.props.get(name)
    }

    pub fn set_prop(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<PropValue>,
    ) -> Result<(), DomError> {
        self.element_mut(id)?
            .props
            .insert(name.to_string(), value.into());
        Ok(())
    }

    pub fn remove_prop(&mut self, id: NodeId, name: &str) -> Result<Option<PropValue>, DomError> {
        Ok(self.element_mut(id)?.props.shift_remove(name))
    }

    // ---------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------

    /// The raw parent, which may be a fragment container.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    /// The parent if it is an element.
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|&p| self.is_element(p))
    }

    /// Iterate children of a node
    pub fn children(&self, id: NodeId) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// Element children only.
    pub fn element_children(&self, id: NodeId) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.children(id).filter(|&c| self.is_element(c))
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].first_child()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].last_child()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].previous_sibling()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].next_sibling()
    }

    pub fn prev_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.preceding_siblings(id).find(|&s| self.is_element(s))
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.following_siblings(id).find(|&s| self.is_element(s))
    }

    /// Siblings before `id`, nearest first, excluding `id`.
    pub fn preceding_siblings(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.preceding_siblings(&self.arena).skip(1)
    }

    /// Siblings after `id`, nearest first, excluding `id`.
    pub fn following_siblings(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.following_siblings(&self.arena).skip(1)
    }

    /// Strict descendants in pre-order (document order). Iterative.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.descendants(&self.arena).skip(1)
    }

    /// Strict ancestors, nearest first, including fragment containers.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.ancestors(&self.arena).skip(1)
    }

    /// Whether `node` is a strict descendant of `ancestor`.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Sort nodes into document order. Nodes from unrelated trees keep the
    /// relative order in which their trees first appear in `nodes`.
    pub fn sort_by_document_order(&self, nodes: &mut [NodeId]) {
        let mut trees: Vec<NodeId> = Vec::new();
        // each parent's children are numbered once, on first visit
        let mut sibling_index: HashMap<NodeId, usize> = HashMap::default();
        nodes.sort_by_cached_key(|&node| {
            let mut path: Vec<usize> = Vec::new();
            let mut top = node;
            for ancestor in node.ancestors(&self.arena) {
                let index = match (sibling_index.get(&ancestor), self.parent(ancestor)) {
                    (Some(&index), _) => index,
                    (None, Some(parent)) => {
                        sibling_index.extend(self.children(parent).enumerate().map(|(i, c)| (c, i)));
                        sibling_index.get(&ancestor).copied().unwrap_or_default()
                    }
                    (None, None) => 0,
                };
                path.push(index);
                top = ancestor;
            }
            path.reverse();
            let rank = match trees.iter().position(|&t| t == top) {
                Some(rank) => rank,
                None => {
                    trees.push(top);
                    trees.len() - 1
                }
            };
            (rank, path)
        });
    }

    /// Whether a node has no parent other than a fragment container.
    pub fn is_top_level(&self, id: NodeId) -> bool {
        self.parent(id)
            .is_none_or(|p| matches!(self.kind(p), NodeKind::Fragment))
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if matches!(self.kind(parent), NodeKind::Text(_) | NodeKind::Comment(_)) {
            return Err(DomError::HierarchyRequest);
        }
        // ancestors() includes the node itself, which also rejects parent == child
        if parent.ancestors(&self.arena).any(|a| a == child) {
            return Err(DomError::HierarchyRequest);
        }
        Ok(())
    }

    /// Remove a node from its parent. The subtree stays intact. No-op for
    /// parentless nodes.
    pub fn detach(&mut self, id: NodeId) {
        id.detach(&mut self.arena);
    }

    /// Append `child` as the last child of `parent`, detaching it from its
    /// current parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insertable(parent, child)?;
        child.detach(&mut self.arena);
        parent
            .checked_append(child, &mut self.arena)
            .map_err(|_| DomError::HierarchyRequest)
    }

    /// Insert `child` as the first child of `parent`.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insertable(parent, child)?;
        child.detach(&mut self.arena);
        parent
            .checked_prepend(child, &mut self.arena)
            .map_err(|_| DomError::HierarchyRequest)
    }

    /// Insert `child` into `parent` before `reference`, or at the end when
    /// `reference` is `None`. `reference` must be a child of `parent`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        let Some(reference) = reference else {
            return self.append_child(parent, child);
        };
        if self.parent(reference) != Some(parent) {
            return Err(DomError::NotFound);
        }
        if reference == child {
            return Ok(());
        }
        self.check_insertable(parent, child)?;
        child.detach(&mut self.arena);
        reference
            .checked_insert_before(child, &mut self.arena)
            .map_err(|_| DomError::HierarchyRequest)
    }

    /// Insert `node` right before `reference`, in `reference`'s parent.
    pub fn insert_sibling_before(
        &mut self,
        reference: NodeId,
        node: NodeId,
    ) -> Result<(), DomError> {
        let parent = self.parent(reference).ok_or(DomError::NoParent)?;
        self.insert_before(parent, node, Some(reference))
    }

    /// Insert `node` right after `reference`, in `reference`'s parent.
    pub fn insert_sibling_after(&mut self, reference: NodeId, node: NodeId) -> Result<(), DomError> {
        let parent = self.parent(reference).ok_or(DomError::NoParent)?;
        if reference == node {
            return Ok(());
        }
        self.check_insertable(parent, node)?;
        node.detach(&mut self.arena);
        reference
            .checked_insert_after(node, &mut self.arena)
            .map_err(|_| DomError::HierarchyRequest)
    }

    /// Detach `child` from `parent`. Fails with [`DomError::NotFound`] if it
    /// is not a child of `parent`, leaving the tree untouched.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, DomError> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotFound);
        }
        child.detach(&mut self.arena);
        Ok(child)
    }

    /// Put `new` where `old` is and detach `old`, returning it.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new: NodeId,
        old: NodeId,
    ) -> Result<NodeId, DomError> {
        if self.parent(old) != Some(parent) {
            return Err(DomError::NotFound);
        }
        if new == old {
            return Ok(old);
        }
        self.check_insertable(parent, new)?;
        new.detach(&mut self.arena);
        old.checked_insert_before(new, &mut self.arena)
            .map_err(|_| DomError::HierarchyRequest)?;
        old.detach(&mut self.arena);
        Ok(old)
    }

    /// Detach every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        let children: Vec<NodeId> = self.children(id).collect();
        for child in children {
            child.detach(&mut self.arena);
        }
    }

    /// Copy a node. A shallow copy has no children; a deep copy duplicates
    /// the whole subtree. The copy is detached and shares nothing mutable
    /// with the original.
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> NodeId {
        let copy = self.arena.new_node(self.get(id).clone());
        if deep {
            let mut pending = vec![(id, copy)];
            while let Some((source, target)) = pending.pop() {
                let children: Vec<NodeId> = self.children(source).collect();
                for child in children {
                    let child_copy = self.arena.new_node(self.get(child).clone());
                    target.append(child_copy, &mut self.arena);
                    pending.push((child, child_copy));
                }
            }
        }
        copy
    }

    /// Deep-copy a node from another document into this one. The copy is
    /// detached.
    pub fn import_node(&mut self, other: &Document, id: NodeId) -> NodeId {
        let copy = self.arena.new_node(other.get(id).clone());
        let mut pending = vec![(id, copy)];
        while let Some((source, target)) = pending.pop() {
            for child in other.children(source) {
                let child_copy = self.arena.new_node(other.get(child).clone());
                target.append(child_copy, &mut self.arena);
                pending.push((child, child_copy));
            }
        }
        copy
    }

    // ---------------------------------------------------------------------
    // Text
    // ---------------------------------------------------------------------

    /// Concatenated text and comment data of `id` and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in id.descendants(&self.arena) {
            match self.kind(node) {
                NodeKind::Text(data) | NodeKind::Comment(data) => out.push_str(data),
                NodeKind::Element(_) | NodeKind::Fragment => {}
            }
        }
        out
    }

    /// Replace the children of `id` with a single text node (none for an
    /// empty string). For text and comment nodes, replace their data.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        match &mut self.get_mut(id).kind {
            NodeKind::Text(data) | NodeKind::Comment(data) => {
                *data = StrTendril::from(text);
            }
            NodeKind::Element(_) | NodeKind::Fragment => {
                self.clear_children(id);
                if !text.is_empty() {
                    let text_node = self.create_text(text);
                    id.append(text_node, &mut self.arena);
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Roots
    // ---------------------------------------------------------------------

    /// Every node registered as a root, in registration order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Registered roots that are still top-level (not since moved under an
    /// element).
    pub fn live_roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.roots.iter().copied().filter(|&r| self.is_top_level(r))
    }

    /// Add nodes to the root list, skipping ones already there.
    pub fn register_roots(&mut self, nodes: &[NodeId]) {
        for &node in nodes {
            if !self.roots.contains(&node) {
                self.roots.push(node);
            }
        }
        trace!(count = nodes.len(), total = self.roots.len(), "registered roots");
    }

    /// Drop nodes from the root list.
    pub fn unregister_roots(&mut self, nodes: &[NodeId]) {
        self.roots.retain(|r| !nodes.contains(r));
    }

    /// Forget every registered root. The nodes themselves stay valid.
    pub fn clear_roots(&mut self) {
        self.roots.clear();
    }
}

/// A borrowed view of one node.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("kind", self.kind())
            .finish()
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn kind(&self) -> &'a NodeKind {
        self.doc.kind(self.id)
    }

    pub fn is_element(&self) -> bool {
        self.doc.is_element(self.id)
    }

    pub fn tag_name(&self) -> Option<&'a str> {
        self.doc.tag_name(self.id)
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.doc.attr(self.id, name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.doc.has_class(self.id, class)
    }

    pub fn prop(&self, name: &str) -> Option<&'a PropValue> {
        self.doc.prop(self.id, name)
    }

    pub fn text(&self) -> String {
        self.doc.text_content(self.id)
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.doc.parent_element(self.id).map(|id| self.doc.node(id))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let doc = self.doc;
        doc.children(self.id).map(move |id| doc.node(id))
    }

    pub fn outer_html(&self) -> String {
        self.doc.outer_html(self.id)
    }

    pub fn inner_html(&self) -> String {
        self.doc.inner_html(self.id)
    }
}

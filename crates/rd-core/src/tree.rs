//! Index-addressed document tree.
//!
//! Every element of a parsed document lives in a single [`Tree`] arena and is
//! addressed by a [`NodeId`]. Ids are only meaningful inside the tree that
//! produced them; comparing nodes of two different trees goes through
//! [`NodeRef`], which carries the tree alongside the id.
//!
//! The arena only ever grows: nodes are appended by the parser, by
//! [`Tree::create_element`] and by [`Tree::import_subtree`], and are attached
//! or re-positioned through [`Tree::append_child`] / [`Tree::insert_child`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RdError, Result};

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// Dense identifier of a node inside its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Position of the node in the arena.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// One element of the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Lowercase element name (e.g. `"li"`).
    pub tag: String,
    /// Attribute map; ordered so that serialized trees are deterministic.
    pub attributes: BTreeMap<String, String>,
    /// Direct text content of the element, trimmed; `None` when the element
    /// has no non-whitespace text of its own.
    pub text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(tag: String) -> Self {
        Self {
            tag,
            attributes: BTreeMap::new(),
            text: None,
            parent: None,
            children: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// Arena of [`Node`]s with an optional document root.
///
/// Methods taking a [`NodeId`] panic if the id does not belong to this tree,
/// the same way slice indexing does.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes in the arena, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    /// Allocate a detached element.
    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(Node::new(tag.into()));
        id
    }

    /// Attach `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let at = self.nodes[parent.index()].children.len();
        self.insert_child(parent, at, child);
    }

    /// Attach `child` at position `index` among `parent`'s children, shifting
    /// later siblings right. `index` is clamped to the child count. A child
    /// that is already attached somewhere is detached first.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.nodes[parent.index()].children;
        let at = index.min(children.len());
        children.insert(at, child);
        self.nodes[child.index()].parent = Some(parent);
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|c| *c != id);
        }
    }

    pub fn set_attribute(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) {
        self.nodes[id.index()]
            .attributes
            .insert(name.into(), value.into());
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        let text = text.into();
        self.nodes[id.index()].text = if text.trim().is_empty() {
            None
        } else {
            Some(text)
        };
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Borrow a node together with this tree.
    pub fn get(&self, id: NodeId) -> NodeRef<'_> {
        debug_assert!(id.index() < self.nodes.len(), "{id} is not a node of this tree");
        NodeRef { tree: self, id }
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.nodes[id.index()].tag
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id.index()].attributes.get(name).map(String::as_str)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.index()].text.as_deref()
    }

    /// Zero-based position of `id` among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let at = self.index_in_parent(id)?;
        self.children(parent).get(at + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let at = self.index_in_parent(id)?;
        at.checked_sub(1).map(|i| self.children(parent)[i])
    }

    /// Check that every link in the arena is consistent.
    ///
    /// Ids must be in range, every child must name its parent and appear
    /// under it exactly once, and parent chains must end. Trees built through
    /// this API always pass; deserialized ones may not.
    pub fn validate(&self) -> Result<()> {
        let len = self.nodes.len();
        let in_range = |id: NodeId, what: &str| {
            if id.index() < len {
                Ok(())
            } else {
                Err(RdError::InvalidInput(format!(
                    "{what} {id} is outside a tree of {len} nodes"
                )))
            }
        };

        if let Some(root) = self.root {
            in_range(root, "root")?;
        }
        let mut listed = vec![0usize; len];
        for (index, node) in self.nodes.iter().enumerate() {
            let id = NodeId::new(index as u32);
            if let Some(parent) = node.parent {
                in_range(parent, "parent")?;
            }
            for child in &node.children {
                in_range(*child, "child")?;
                if self.nodes[child.index()].parent != Some(id) {
                    return Err(RdError::InvalidInput(format!(
                        "{child} is listed under {id} but does not name it as parent"
                    )));
                }
                listed[child.index()] += 1;
            }
        }
        for (index, node) in self.nodes.iter().enumerate() {
            let expected = usize::from(node.parent.is_some());
            if listed[index] != expected {
                return Err(RdError::InvalidInput(format!(
                    "#{index} is listed {} times under its parent",
                    listed[index]
                )));
            }
        }

        // With consistent links, every node reachable from a parentless node
        // is visited once; the rest sit on a cycle.
        let mut stack: Vec<NodeId> = (0..len)
            .filter(|i| self.nodes[*i].parent.is_none())
            .map(|i| NodeId::new(i as u32))
            .collect();
        let mut visited = 0usize;
        while let Some(next) = stack.pop() {
            visited += 1;
            stack.extend(self.children(next).iter().copied());
        }
        if visited != len {
            return Err(RdError::InvalidInput(format!(
                "{} nodes are cut off by a parent cycle",
                len - visited
            )));
        }
        Ok(())
    }

    /// Count of `id` plus all of its descendants.
    pub fn subtree_size(&self, id: NodeId) -> usize {
        1 + self
            .children(id)
            .iter()
            .map(|c| self.subtree_size(*c))
            .sum::<usize>()
    }

    /// Pre-order list of `id` and its descendants.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// First element with the given tag in document order, starting at the
    /// root.
    pub fn find_first(&self, tag: &str) -> Option<NodeId> {
        let root = self.root?;
        self.descendants(root).into_iter().find(|id| self.tag(*id) == tag)
    }

    /// Deep-copy the subtree rooted at `src_root` of `src` into this arena.
    ///
    /// The copy is detached. Returns the id of the copied root and the
    /// `(copy, original)` pairs for every copied node, in pre-order.
    pub fn import_subtree(&mut self, src: &Tree, src_root: NodeId) -> (NodeId, Vec<(NodeId, NodeId)>) {
        let mut provenance = Vec::new();
        let root = self.import_recursive(src, src_root, &mut provenance);
        (root, provenance)
    }

    fn import_recursive(
        &mut self,
        src: &Tree,
        src_id: NodeId,
        provenance: &mut Vec<(NodeId, NodeId)>,
    ) -> NodeId {
        let original = src.node(src_id);
        let copy = self.create_element(original.tag.clone());
        {
            let node = &mut self.nodes[copy.index()];
            node.attributes = original.attributes.clone();
            node.text = original.text.clone();
        }
        provenance.push((copy, src_id));
        for child in src.children(src_id) {
            let child_copy = self.import_recursive(src, *child, provenance);
            self.append_child(copy, child_copy);
        }
        copy
    }

    // -----------------------------------------------------------------------
    // Structural paths
    // -----------------------------------------------------------------------

    /// XPath-like address of `id`, e.g. `/html/body/div[2]/ul`.
    ///
    /// A segment carries a 1-based `[k]` predicate only when its parent has
    /// more than one child with the same tag.
    pub fn path(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            segments.push(self.path_segment(node));
            current = self.parent(node);
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    fn path_segment(&self, id: NodeId) -> String {
        let tag = self.tag(id);
        let Some(parent) = self.parent(id) else {
            return tag.to_string();
        };
        let same_tag: Vec<NodeId> = self
            .children(parent)
            .iter()
            .copied()
            .filter(|c| self.tag(*c) == tag)
            .collect();
        if same_tag.len() > 1 {
            let k = same_tag.iter().position(|c| *c == id).unwrap_or(0) + 1;
            format!("{tag}[{k}]")
        } else {
            tag.to_string()
        }
    }

    /// Resolve a path produced by [`Tree::path`] back to a node, starting at
    /// the root. A segment without a predicate selects the first child with
    /// that tag.
    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let root = self.root?;
        let (root_tag, _) = parse_segment(segments.next()?)?;
        if self.tag(root) != root_tag {
            return None;
        }
        let mut current = root;
        for segment in segments {
            let (tag, k) = parse_segment(segment)?;
            current = self
                .children(current)
                .iter()
                .copied()
                .filter(|c| self.tag(*c) == tag)
                .nth(k.checked_sub(1)?)?;
        }
        Some(current)
    }
}

/// Split `div[2]` into `("div", 2)`; a bare tag selects index 1.
fn parse_segment(segment: &str) -> Option<(&str, usize)> {
    match segment.split_once('[') {
        Some((tag, rest)) => {
            let k = rest.strip_suffix(']')?.parse().ok()?;
            Some((tag, k))
        }
        None => Some((segment, 1)),
    }
}

// ---------------------------------------------------------------------------
// NodeRef
// ---------------------------------------------------------------------------

/// A node borrowed together with the tree that owns it.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn tag(&self) -> &'a str {
        self.tree.tag(self.id)
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.tree.attribute(self.id, name)
    }

    pub fn text(&self) -> Option<&'a str> {
        self.tree.text(self.id)
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.tree.parent(self.id).map(|id| self.tree.get(id))
    }

    pub fn child_count(&self) -> usize {
        self.tree.children(self.id).len()
    }

    pub fn children(&self) -> impl ExactSizeIterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        tree.children(self.id).iter().map(move |id| tree.get(*id))
    }

    pub fn subtree_size(&self) -> usize {
        self.tree.subtree_size(self.id)
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

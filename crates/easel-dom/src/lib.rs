//! Element model for the Easel style engine.
//!
//! The selector matcher never sees a concrete element type. It talks to the
//! host through [`SelectorModel`], a narrow set of read-only capability
//! queries. Drawing figures, DOM-like nodes, or any other tree can be styled
//! by implementing that trait.
//!
//! This crate also provides [`DomTree`], an arena-based element tree that
//! implements [`SelectorModel`] directly. It is used by tooling and tests,
//! and by hosts that do not have a tree of their own.
//!
//! # Design
//!
//! The tree uses arena allocation with [`NodeId`] indices for all relationships,
//! providing O(1) access and traversal without borrow checker issues.

mod model;

pub use model::SelectorModel;

use std::collections::{BTreeSet, HashMap};

/// Map of attribute names to values for an element.
pub type AttributesMap = HashMap<String, String>;

/// A type-safe index into the element tree.
///
/// `NodeId` provides O(1) access to any node in the tree without borrowing issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The root document node is always at index 0.
    pub const ROOT: Self = Self(0);
}

/// A node in the arena.
///
/// This node stores indices for parent/child/sibling relationships,
/// enabling O(1) traversal in any direction.
#[derive(Debug, Clone)]
pub struct Node {
    /// What kind of node this is.
    pub node_type: NodeType,

    /// The parent node, `None` for the document and for detached nodes.
    pub parent: Option<NodeId>,

    /// Children in document order.
    pub children: Vec<NodeId>,

    /// The node immediately following this one in its parent's children.
    pub next_sibling: Option<NodeId>,

    /// The node immediately preceding this one in its parent's children.
    pub prev_sibling: Option<NodeId>,
}

/// The kind of a node.
#[derive(Debug, Clone)]
pub enum NodeType {
    /// The document node at the root of every tree. It is not an element and
    /// never matches a selector.
    Document,
    /// A styleable element.
    Element(ElementData),
}

/// Element-specific data.
///
/// The `id` and `class` attributes are interpreted the usual way: the
/// element id is the `id` attribute, and style classes are the
/// whitespace-separated words of the `class` attribute.
#[derive(Debug, Clone, Default)]
pub struct ElementData {
    /// The element type name, e.g. `rect` or `LineFigure`.
    pub type_name: String,
    /// The element's attributes.
    pub attrs: AttributesMap,
    /// Pseudo-classes currently set on the element (e.g. `selected`).
    pub pseudo_classes: BTreeSet<String>,
}

impl ElementData {
    /// Create element data with the given type name and no attributes.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    /// Builder-style helper setting an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attrs.insert(name.into(), value.into());
        self
    }

    /// Builder-style helper setting the `id` attribute.
    #[must_use]
    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.with_attr("id", id)
    }

    /// Builder-style helper setting the `class` attribute.
    #[must_use]
    pub fn with_classes(self, classes: &[&str]) -> Self {
        self.with_attr("class", classes.join(" "))
    }

    /// Builder-style helper adding a pseudo-class.
    #[must_use]
    pub fn with_pseudo_class(mut self, pseudo_class: impl Into<String>) -> Self {
        let _ = self.pseudo_classes.insert(pseudo_class.into());
        self
    }

    /// Returns the element's id attribute value if present.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attrs.get("id").map(String::as_str)
    }

    /// Returns the style classes from the class attribute, in order.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attrs
            .get("class")
            .map(String::as_str)
            .unwrap_or_default()
            .split_whitespace()
    }
}

/// Arena-based element tree with O(1) node access and traversal.
///
/// This structure stores all nodes in a contiguous vector, using indices
/// for all relationships. This provides:
/// - O(1) access to any node by `NodeId`
/// - O(1) parent/sibling traversal
/// - No borrowing issues (indices instead of references)
#[derive(Debug, Clone)]
pub struct DomTree {
    /// All nodes in the tree, indexed by `NodeId`.
    /// The Document node is always at index 0 (`NodeId::ROOT`).
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a new tree with just the Document node.
    #[must_use]
    pub fn new() -> Self {
        let document = Node {
            node_type: NodeType::Document,
            parent: None,
            children: Vec::new(),
            next_sibling: None,
            prev_sibling: None,
        };
        Self {
            nodes: vec![document],
        }
    }

    /// Get a node by its ID.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Get the number of nodes in the tree, including the Document node.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty (should always have at least the Document).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a new node and return its ID.
    /// The node is not yet attached to the tree.
    pub fn alloc(&mut self, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            node_type,
            parent: None,
            children: Vec::new(),
            next_sibling: None,
            prev_sibling: None,
        });
        id
    }

    /// Allocate an element and append it as the last child of `parent`.
    pub fn append_element(&mut self, parent: NodeId, data: ElementData) -> NodeId {
        let id = self.alloc(NodeType::Element(data));
        self.append_child(parent, id);
        id
    }

    /// Appends `child` as the last child of `parent`, updating all relationships.
    ///
    /// # Panics
    ///
    /// Panics if either id does not belong to this tree.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        // Get the current last child of parent (if any) to set up sibling links
        let prev_last_child = self.nodes[parent.0].children.last().copied();

        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);

        if let Some(prev_id) = prev_last_child {
            self.nodes[prev_id.0].next_sibling = Some(child);
            self.nodes[child.0].prev_sibling = Some(prev_id);
        }
    }

    /// Get the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Get all children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Get the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling)
    }

    /// Get the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling)
    }

    /// Iterate over all ancestors of a node, from parent to root.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> AncestorIterator<'_> {
        AncestorIterator {
            tree: self,
            current: self.parent(id),
        }
    }

    /// Iterate over the node and all its descendants in document order.
    #[must_use]
    pub fn descendants_inclusive(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Get element data if this node is an element.
    #[must_use]
    pub fn as_element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(|n| match &n.node_type {
            NodeType::Element(data) => Some(data),
            NodeType::Document => None,
        })
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over ancestors of a node.
pub struct AncestorIterator<'a> {
    tree: &'a DomTree,
    current: Option<NodeId>,
}

impl Iterator for AncestorIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.tree.parent(id);
        Some(id)
    }
}

impl SelectorModel for DomTree {
    type Element = NodeId;

    fn has_id(&self, element: &NodeId, id: &str) -> bool {
        self.as_element(*element).and_then(ElementData::id) == Some(id)
    }

    fn has_type(&self, element: &NodeId, type_name: &str) -> bool {
        self.as_element(*element)
            .is_some_and(|e| e.type_name == type_name)
    }

    fn has_style_class(&self, element: &NodeId, class_name: &str) -> bool {
        self.as_element(*element)
            .is_some_and(|e| e.classes().any(|c| c == class_name))
    }

    fn has_pseudo_class(&self, element: &NodeId, pseudo_class: &str) -> bool {
        self.as_element(*element)
            .is_some_and(|e| e.pseudo_classes.contains(pseudo_class))
    }

    fn get_attribute(&self, element: &NodeId, name: &str) -> Option<String> {
        self.as_element(*element)?.attrs.get(name).cloned()
    }

    fn attribute_names(&self, element: &NodeId) -> Vec<String> {
        let mut names: Vec<String> = self
            .as_element(*element)
            .map(|e| e.attrs.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// The document node is not an element, so it is never reported as a parent.
    fn get_parent(&self, element: &NodeId) -> Option<NodeId> {
        self.parent(*element)
            .filter(|&parent| self.as_element(parent).is_some())
    }

    fn get_previous_sibling(&self, element: &NodeId) -> Option<NodeId> {
        self.prev_sibling(*element)
    }
}

//! Lazy traversal over the ring structure.
//!
//! All iterators borrow the tree immutably and walk handles; none allocate.
//! `Children` stops when the ring wraps back to the first child, `Descendants`
//! threads through the tree pre-order using parent pointers instead of a
//! stack.

use crate::tree::{JsonTree, NodeId};

/// Forward iteration over one container's children.
pub struct Children<'a> {
    tree: &'a JsonTree,
    first: Option<NodeId>,
    cursor: Option<NodeId>,
}

impl<'a> Children<'a> {
    pub(crate) fn new(tree: &'a JsonTree, first: Option<NodeId>) -> Self {
        Children {
            tree,
            first,
            cursor: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let cur = self.cursor?;
        let next = self.tree.ring_next(cur);
        // ring wrap: revisiting the first child ends the walk
        self.cursor = match next {
            Some(n) if Some(n) != self.first => Some(n),
            _ => None,
        };
        Some(cur)
    }
}

/// Pre-order walk of a subtree, excluding the subtree root itself.
pub struct Descendants<'a> {
    tree: &'a JsonTree,
    root: NodeId,
    next: Option<NodeId>,
}

impl<'a> Descendants<'a> {
    pub(crate) fn new(tree: &'a JsonTree, root: NodeId) -> Self {
        Descendants {
            tree,
            root,
            next: tree.first_child(root),
        }
    }
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let cur = self.next?;
        self.next = if let Some(child) = self.tree.first_child(cur) {
            Some(child)
        } else {
            // climb until a following sibling exists or the walk leaves the root
            let mut node = cur;
            loop {
                if node == self.root {
                    break None;
                }
                if let Some(sibling) = self.tree.next_sibling(node) {
                    break Some(sibling);
                }
                match self.tree.parent(node) {
                    Some(p) => node = p,
                    None => break None,
                }
            }
        };
        Some(cur)
    }
}

/// Walk from a node's parent to the root.
pub struct Ancestors<'a> {
    tree: &'a JsonTree,
    cursor: Option<NodeId>,
}

impl<'a> Ancestors<'a> {
    pub(crate) fn new(tree: &'a JsonTree, start: Option<NodeId>) -> Self {
        Ancestors {
            tree,
            cursor: start,
        }
    }
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let cur = self.cursor?;
        self.cursor = self.tree.parent(cur);
        Some(cur)
    }
}

/// Siblings preceding a node, in document order.
pub struct SiblingsBefore<'a> {
    tree: &'a JsonTree,
    target: NodeId,
    cursor: Option<NodeId>,
}

impl<'a> SiblingsBefore<'a> {
    pub(crate) fn new(tree: &'a JsonTree, target: NodeId, start: Option<NodeId>) -> Self {
        SiblingsBefore {
            tree,
            target,
            cursor: start,
        }
    }
}

impl Iterator for SiblingsBefore<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let cur = self.cursor?;
        if cur == self.target {
            self.cursor = None;
            return None;
        }
        self.cursor = self.tree.ring_next(cur);
        Some(cur)
    }
}

/// Siblings following a node, in document order.
pub struct SiblingsAfter<'a> {
    tree: &'a JsonTree,
    cursor: Option<NodeId>,
}

impl<'a> SiblingsAfter<'a> {
    pub(crate) fn new(tree: &'a JsonTree, start: Option<NodeId>) -> Self {
        SiblingsAfter {
            tree,
            cursor: start,
        }
    }
}

impl Iterator for SiblingsAfter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let cur = self.cursor?;
        self.cursor = self.tree.next_sibling(cur);
        Some(cur)
    }
}

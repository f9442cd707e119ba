//! The mutable document tree: an arena of nodes with ring-linked children.
//!
//! Nodes live in a single growable arena ([`JsonTree`]) addressed by integer
//! handle ([`NodeId`]); parent and sibling references are handle fields rather
//! than language-level references, which sidesteps mutable-aliasing conflicts
//! while reproducing the ring structure exactly.
//!
//! Each container stores one handle: `tail`, its last child. Children form a
//! singly-linked **ring** -- `tail.next` wraps to the first child -- so append
//! is O(1) without a doubly-linked list. The cost shows up in `prev_sibling`
//! and `remove`, which walk the ring to find the predecessor.
//!
//! # Key invariants
//!
//! - A node has at most one parent; its `next` pointer is meaningful only
//!   while parented.
//! - `tail.next == first_child` always holds for a non-empty container.
//! - Inserting an already-parented node, the container itself, or one of the
//!   container's ancestors substitutes a deep clone (aliasing and cycles are
//!   impossible by construction).
//! - Object children are properties with pairwise-unique names; a
//!   duplicate-name insert replaces the existing property in place.
//! - Mutating a container from inside one of its own change notifications
//!   fails fast with `InvalidState` instead of corrupting the ring.
//!
//! Detached nodes stay in the arena until the tree is dropped; detachment is
//! logical, not a deallocation.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::error::{ArborError, Result};
use crate::iter::{Ancestors, Children, Descendants, SiblingsAfter, SiblingsBefore};
use crate::scalar::{NodeKind, Scalar};
use crate::stream::{LineInfo, TokenSink};

/// Handle to a node in a [`JsonTree`] arena.
///
/// Handles are only meaningful within the tree that issued them; using a
/// handle from another tree is a logic error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Ring anchor shared by every container kind.
#[derive(Default)]
struct Ring {
    /// Last child; `None` when empty. `next` of this node is the first child.
    tail: Option<NodeId>,
    /// Set while change notifications for this container are being dispatched.
    busy: bool,
}

enum Payload {
    Object {
        ring: Ring,
        /// Name -> property handle; the ring supplies order, the map supplies
        /// O(1) lookup.
        index: HashMap<String, NodeId>,
    },
    Array {
        ring: Ring,
    },
    Constructor {
        name: String,
        ring: Ring,
    },
    Property {
        name: String,
        ring: Ring,
    },
    Value {
        scalar: Scalar,
        /// Usually `scalar.kind()`, but `Comment` is sticky across
        /// reassignment.
        kind: NodeKind,
    },
}

struct Slot {
    parent: Option<NodeId>,
    /// Ring successor; `Some` iff attached.
    next: Option<NodeId>,
    line: Option<LineInfo>,
    payload: Payload,
}

/// What happened to a container's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Removed,
    Replaced,
    Reset,
}

/// A structural-change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub container: NodeId,
    pub kind: ChangeKind,
    /// The child added, removed, or swapped in; `None` for `Reset`.
    pub child: Option<NodeId>,
}

/// Observer of structural changes, the seam for data-binding layers.
///
/// Handlers receive the tree mutably and may mutate *other* containers;
/// mutating the container that triggered the notification returns
/// `InvalidState`.
pub trait TreeObserver {
    fn on_change(&self, tree: &mut JsonTree, event: &ChangeEvent);
}

/// Arena of tree nodes.
pub struct JsonTree {
    slots: Vec<Slot>,
    observers: Vec<Rc<dyn TreeObserver>>,
}

impl Default for JsonTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JsonTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonTree")
            .field("nodes", &self.slots.len())
            .finish()
    }
}

impl JsonTree {
    pub fn new() -> Self {
        JsonTree {
            slots: Vec::new(),
            observers: Vec::new(),
        }
    }

    fn alloc(&mut self, payload: Payload) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Slot {
            parent: None,
            next: None,
            line: None,
            payload,
        });
        id
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a detached, empty object node.
    pub fn new_object(&mut self) -> NodeId {
        self.alloc(Payload::Object {
            ring: Ring::default(),
            index: HashMap::new(),
        })
    }

    /// Create a detached, empty array node.
    pub fn new_array(&mut self) -> NodeId {
        self.alloc(Payload::Array {
            ring: Ring::default(),
        })
    }

    /// Create a detached, empty constructor node with the given call name.
    pub fn new_constructor(&mut self, name: impl Into<String>) -> NodeId {
        self.alloc(Payload::Constructor {
            name: name.into(),
            ring: Ring::default(),
        })
    }

    /// Create a detached value node; the node's tag follows the scalar.
    pub fn new_value(&mut self, value: impl Into<Scalar>) -> NodeId {
        let scalar = value.into();
        let kind = scalar.kind();
        self.alloc(Payload::Value { scalar, kind })
    }

    /// Create a detached comment node. The comment tag survives later
    /// reassignment of the node's value.
    pub fn new_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(Payload::Value {
            scalar: Scalar::Str(text.into()),
            kind: NodeKind::Comment,
        })
    }

    /// Create a detached raw-text node, emitted verbatim by text sinks.
    pub fn new_raw(&mut self, text: impl Into<String>) -> NodeId {
        self.new_value(Scalar::Raw(text.into()))
    }

    /// Create a detached property holding `value`. The name is immutable for
    /// the life of the node; the value can later be replaced but not removed.
    pub fn new_property(&mut self, name: impl Into<String>, value: NodeId) -> Result<NodeId> {
        let prop = self.new_property_scope(name);
        self.add(prop, value)?;
        Ok(prop)
    }

    /// Empty property scope, used by the stream writer while a property's
    /// value is still in flight.
    pub(crate) fn new_property_scope(&mut self, name: impl Into<String>) -> NodeId {
        self.alloc(Payload::Property {
            name: name.into(),
            ring: Ring::default(),
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The node's type tag.
    pub fn kind(&self, id: NodeId) -> NodeKind {
        match &self.slots[id.index()].payload {
            Payload::Object { .. } => NodeKind::Object,
            Payload::Array { .. } => NodeKind::Array,
            Payload::Constructor { .. } => NodeKind::Constructor,
            Payload::Property { .. } => NodeKind::Property,
            Payload::Value { kind, .. } => *kind,
        }
    }

    /// Enclosing container, or `None` for a detached node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.index()].parent
    }

    /// Property or constructor name.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.slots[id.index()].payload {
            Payload::Property { name, .. } | Payload::Constructor { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The scalar payload of a value node.
    pub fn scalar(&self, id: NodeId) -> Option<&Scalar> {
        match &self.slots[id.index()].payload {
            Payload::Value { scalar, .. } => Some(scalar),
            _ => None,
        }
    }

    /// Source position captured while the node was built from a token stream;
    /// `None` for programmatically built nodes.
    pub fn line_info(&self, id: NodeId) -> Option<LineInfo> {
        self.slots[id.index()].line
    }

    pub(crate) fn set_line(&mut self, id: NodeId, line: Option<LineInfo>) {
        self.slots[id.index()].line = line;
    }

    pub fn as_str(&self, id: NodeId) -> Option<&str> {
        match self.scalar(id)? {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self, id: NodeId) -> Option<i64> {
        match self.scalar(id)? {
            Scalar::Int(i) => Some(*i),
            Scalar::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self, id: NodeId) -> Option<u64> {
        match self.scalar(id)? {
            Scalar::Int(i) => u64::try_from(*i).ok(),
            Scalar::UInt(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_f64(&self, id: NodeId) -> Option<f64> {
        match self.scalar(id)? {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::UInt(u) => Some(*u as f64),
            Scalar::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self, id: NodeId) -> Option<bool> {
        match self.scalar(id)? {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Ring navigation
    // ------------------------------------------------------------------

    fn ring(&self, id: NodeId) -> Option<&Ring> {
        match &self.slots[id.index()].payload {
            Payload::Object { ring, .. } => Some(ring),
            Payload::Array { ring } => Some(ring),
            Payload::Constructor { ring, .. } => Some(ring),
            Payload::Property { ring, .. } => Some(ring),
            Payload::Value { .. } => None,
        }
    }

    fn ring_mut(&mut self, id: NodeId) -> Option<&mut Ring> {
        match &mut self.slots[id.index()].payload {
            Payload::Object { ring, .. } => Some(ring),
            Payload::Array { ring } => Some(ring),
            Payload::Constructor { ring, .. } => Some(ring),
            Payload::Property { ring, .. } => Some(ring),
            Payload::Value { .. } => None,
        }
    }

    /// Raw ring successor, wrapping at the tail.
    pub(crate) fn ring_next(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.index()].next
    }

    /// First child of a container, `None` when empty or not a container.
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        let tail = self.ring(id)?.tail?;
        self.slots[tail.index()].next
    }

    /// Last child of a container.
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.ring(id)?.tail
    }

    /// Following sibling, `None` for the last child or a detached node.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.slots[id.index()].parent?;
        let tail = self.ring(parent)?.tail?;
        if id == tail {
            None
        } else {
            self.slots[id.index()].next
        }
    }

    /// Preceding sibling. Walks the ring from the first child, so this is
    /// O(n) in the sibling count -- the documented cost of the singly-linked
    /// ring, not a defect.
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.slots[id.index()].parent?;
        if self.first_child(parent) == Some(id) {
            return None;
        }
        self.prev_in_ring(parent, id)
    }

    /// Predecessor of `node` within `container`'s ring (the tail when `node`
    /// is the first child). `None` if `node` is not in the ring.
    fn prev_in_ring(&self, container: NodeId, node: NodeId) -> Option<NodeId> {
        let tail = self.ring(container)?.tail?;
        let mut cur = self.slots[tail.index()].next?;
        loop {
            if self.slots[cur.index()].next == Some(node) {
                return Some(cur);
            }
            if cur == tail {
                return None;
            }
            cur = self.slots[cur.index()].next?;
        }
    }

    /// Number of children. O(n): the ring stores no count.
    pub fn len(&self, container: NodeId) -> usize {
        self.children(container).count()
    }

    pub fn is_empty(&self, container: NodeId) -> bool {
        self.first_child(container).is_none()
    }

    /// Forward iteration over a container's children, stopping when the ring
    /// wraps back to the first child. Restartable: each call walks afresh.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children::new(self, self.first_child(id))
    }

    /// Pre-order walk of everything below `id` (excluding `id` itself).
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants::new(self, id)
    }

    /// Walk from the node's parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors::new(self, self.parent(id))
    }

    /// Siblings preceding this node, in document order.
    pub fn siblings_before(&self, id: NodeId) -> SiblingsBefore<'_> {
        let start = self.parent(id).and_then(|p| self.first_child(p));
        SiblingsBefore::new(self, id, start)
    }

    /// Siblings following this node, in document order.
    pub fn siblings_after(&self, id: NodeId) -> SiblingsAfter<'_> {
        SiblingsAfter::new(self, self.next_sibling(id))
    }

    /// Topmost ancestor, or the node itself when detached.
    pub fn root(&self, id: NodeId) -> NodeId {
        let mut cur = id;
        while let Some(p) = self.slots[cur.index()].parent {
            cur = p;
        }
        cur
    }

    // ------------------------------------------------------------------
    // Object and positional lookup
    // ------------------------------------------------------------------

    /// The property of an object by name, or `None`.
    pub fn property(&self, obj: NodeId, name: &str) -> Option<NodeId> {
        match &self.slots[obj.index()].payload {
            Payload::Object { index, .. } => index.get(name).copied(),
            _ => None,
        }
    }

    /// The value of an object's named property, or `None` -- the
    /// missing-sentinel, not an error.
    pub fn get(&self, obj: NodeId, name: &str) -> Option<NodeId> {
        self.first_child(self.property(obj, name)?)
    }

    /// Child at a position, or `None` when out of range.
    pub fn get_item(&self, container: NodeId, index: usize) -> Option<NodeId> {
        self.children(container).nth(index)
    }

    /// Child at a position; strict contexts get `IndexOutOfRange`.
    pub fn item_at(&self, container: NodeId, index: usize) -> Result<NodeId> {
        self.get_item(container, index)
            .ok_or_else(|| ArborError::IndexOutOfRange {
                index,
                len: self.len(container),
            })
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Append `item` to `container`'s children. Returns the node actually
    /// inserted, which is a deep clone of `item` whenever inserting the
    /// original would alias it (already parented) or create a cycle (the
    /// container itself or one of its ancestors).
    pub fn add(&mut self, container: NodeId, item: NodeId) -> Result<NodeId> {
        self.add_after(container, item, None)
    }

    /// Splice `item` in immediately after `after`, or at the tail when
    /// `after` is `None`. Fully validates before any mutation.
    pub fn add_after(
        &mut self,
        container: NodeId,
        item: NodeId,
        after: Option<NodeId>,
    ) -> Result<NodeId> {
        self.check_not_busy(container)?;
        self.validate_child(container, item, after)?;

        // Object duplicate names replace the existing property in place:
        // position preserved, count unchanged.
        if self.kind(container) == NodeKind::Object {
            let name = self.name(item).map(str::to_string);
            if let Some(name) = name {
                if let Some(existing) = self.property(container, &name) {
                    return self.replace_child(container, existing, item);
                }
            }
        }

        let item = self.adopt(container, item);
        self.splice_after(container, item, after);
        if self.kind(container) == NodeKind::Object {
            if let Some(name) = self.name(item).map(str::to_string) {
                if let Payload::Object { index, .. } = &mut self.slots[container.index()].payload {
                    index.insert(name, item);
                }
            }
        }
        self.notify(container, ChangeKind::Added, Some(item));
        Ok(item)
    }

    /// Set `name` to `value` on an object, wrapping the value in a property.
    /// An existing property of that name is replaced in place.
    pub fn insert_property(
        &mut self,
        obj: NodeId,
        name: impl Into<String>,
        value: NodeId,
    ) -> Result<NodeId> {
        if self.kind(obj) != NodeKind::Object {
            return Err(ArborError::WrongType(format!(
                "cannot set a property on {}",
                self.kind(obj)
            )));
        }
        let prop = self.new_property(name, value)?;
        self.add(obj, prop)
    }

    /// Replace a property's sole child. The property keeps its identity.
    pub fn set_property_value(&mut self, prop: NodeId, value: NodeId) -> Result<NodeId> {
        if self.kind(prop) != NodeKind::Property {
            return Err(ArborError::WrongType(format!(
                "cannot set a value on {}",
                self.kind(prop)
            )));
        }
        match self.first_child(prop) {
            Some(current) => self.replace_child(prop, current, value),
            None => self.add(prop, value),
        }
    }

    /// Reassign a value node's scalar. The node re-tags to match the new
    /// scalar, except that comment nodes keep the comment tag.
    pub fn set_scalar(&mut self, node: NodeId, value: impl Into<Scalar>) -> Result<()> {
        let value = value.into();
        match &mut self.slots[node.index()].payload {
            Payload::Value { scalar, kind } => {
                if *kind != NodeKind::Comment {
                    *kind = value.kind();
                }
                *scalar = value;
                Ok(())
            }
            _ => Err(ArborError::WrongType(
                "cannot assign a scalar to a container node".into(),
            )),
        }
    }

    /// Detach `node` from its parent. Fails with `InvalidState` on a node
    /// that has no parent, and on property values (which can only be
    /// replaced).
    pub fn remove(&mut self, node: NodeId) -> Result<()> {
        let parent = self.slots[node.index()].parent.ok_or_else(|| {
            ArborError::InvalidState("cannot remove a node that has no parent".into())
        })?;
        self.check_not_busy(parent)?;
        if self.kind(parent) == NodeKind::Property {
            return Err(ArborError::InvalidState(
                "a property's value cannot be removed, only replaced".into(),
            ));
        }
        if let Some(name) = self.name(node).map(str::to_string) {
            if let Payload::Object { index, .. } = &mut self.slots[parent.index()].payload {
                index.remove(&name);
            }
        }
        self.unsplice(parent, node);
        self.notify(parent, ChangeKind::Removed, Some(node));
        Ok(())
    }

    /// Detach the child at `index`; returns the detached node.
    pub fn remove_at(&mut self, container: NodeId, index: usize) -> Result<NodeId> {
        let node = self
            .get_item(container, index)
            .ok_or_else(|| ArborError::IndexOutOfRange {
                index,
                len: self.len(container),
            })?;
        self.remove(node)?;
        Ok(node)
    }

    /// Detach every child. Fires a single `Reset` notification. Not atomic
    /// under a reentrancy failure part-way through -- a known edge of bulk
    /// operations.
    pub fn clear(&mut self, container: NodeId) -> Result<()> {
        self.check_not_busy(container)?;
        if self.kind(container) == NodeKind::Property {
            return Err(ArborError::InvalidState(
                "a property's value cannot be removed, only replaced".into(),
            ));
        }
        if self.ring(container).is_none() {
            return Err(ArborError::WrongType(format!(
                "{} nodes hold no children",
                self.kind(container)
            )));
        }
        let children: Vec<NodeId> = self.children(container).collect();
        for child in &children {
            self.slots[child.index()].parent = None;
            self.slots[child.index()].next = None;
        }
        if let Some(ring) = self.ring_mut(container) {
            ring.tail = None;
        }
        if let Payload::Object { index, .. } = &mut self.slots[container.index()].payload {
            index.clear();
        }
        self.notify(container, ChangeKind::Reset, None);
        Ok(())
    }

    /// Swap `existing` for `replacement` in `existing`'s parent. Fails with
    /// `InvalidState` if `existing` has no parent.
    pub fn replace(&mut self, existing: NodeId, replacement: NodeId) -> Result<NodeId> {
        let parent = self.slots[existing.index()].parent.ok_or_else(|| {
            ArborError::InvalidState("cannot replace a node that has no parent".into())
        })?;
        self.replace_child(parent, existing, replacement)
    }

    /// Same-position swap of one child for another. Replacing a value node
    /// with an equal-valued one is a no-op that fires no notification. The
    /// clone-on-reparent check applies to `replacement` exactly as it does
    /// for `add`.
    pub fn replace_child(
        &mut self,
        container: NodeId,
        existing: NodeId,
        replacement: NodeId,
    ) -> Result<NodeId> {
        self.check_not_busy(container)?;
        if self.slots[existing.index()].parent != Some(container) {
            return Err(ArborError::InvalidState(
                "node to replace is not a child of the target container".into(),
            ));
        }
        if existing != replacement
            && !self.kind(existing).is_container()
            && !self.kind(replacement).is_container()
            && self.value_eq(existing, replacement)
        {
            return Ok(existing);
        }
        self.validate_replacement(container, existing, replacement)?;
        let replacement = self.adopt(container, replacement);

        let tail = self.ring(container).and_then(|r| r.tail);
        let first = self.first_child(container);
        if first == Some(existing) && tail == Some(existing) {
            // sole child
            self.slots[replacement.index()].next = Some(replacement);
            if let Some(ring) = self.ring_mut(container) {
                ring.tail = Some(replacement);
            }
        } else {
            let prev = self
                .prev_in_ring(container, existing)
                .ok_or_else(|| ArborError::InvalidState("node not found in parent ring".into()))?;
            let existing_next = self.slots[existing.index()].next;
            self.slots[replacement.index()].next = existing_next;
            self.slots[prev.index()].next = Some(replacement);
            if tail == Some(existing) {
                if let Some(ring) = self.ring_mut(container) {
                    ring.tail = Some(replacement);
                }
            }
        }
        self.slots[replacement.index()].parent = Some(container);
        self.slots[existing.index()].parent = None;
        self.slots[existing.index()].next = None;

        let old_name = self.name(existing).map(str::to_string);
        let new_name = self.name(replacement).map(str::to_string);
        if let Payload::Object { index, .. } = &mut self.slots[container.index()].payload {
            if let Some(name) = old_name {
                index.remove(&name);
            }
            if let Some(name) = new_name {
                index.insert(name, replacement);
            }
        }
        self.notify(container, ChangeKind::Replaced, Some(replacement));
        Ok(replacement)
    }

    // ------------------------------------------------------------------
    // Mutation plumbing
    // ------------------------------------------------------------------

    fn validate_child(&self, container: NodeId, item: NodeId, after: Option<NodeId>) -> Result<()> {
        let ckind = self.kind(container);
        let ikind = self.kind(item);
        match ckind {
            NodeKind::Object => {
                if ikind != NodeKind::Property {
                    return Err(ArborError::WrongType(format!(
                        "cannot add {ikind} to an object; objects hold properties only"
                    )));
                }
            }
            NodeKind::Array | NodeKind::Constructor => {
                if ikind == NodeKind::Property {
                    return Err(ArborError::WrongType(format!(
                        "a {ckind} cannot hold properties"
                    )));
                }
            }
            NodeKind::Property => {
                if ikind == NodeKind::Property {
                    return Err(ArborError::WrongType(
                        "a property cannot hold another property".into(),
                    ));
                }
                if self.first_child(container).is_some() {
                    return Err(ArborError::WrongType(
                        "a property holds exactly one value".into(),
                    ));
                }
            }
            _ => {
                return Err(ArborError::WrongType(format!(
                    "{ckind} nodes hold no children"
                )))
            }
        }
        if let Some(anchor) = after {
            if self.slots[anchor.index()].parent != Some(container) {
                return Err(ArborError::InvalidState(
                    "anchor node is not a child of the target container".into(),
                ));
            }
        }
        Ok(())
    }

    fn validate_replacement(
        &self,
        container: NodeId,
        existing: NodeId,
        replacement: NodeId,
    ) -> Result<()> {
        let ckind = self.kind(container);
        let rkind = self.kind(replacement);
        match ckind {
            NodeKind::Object => {
                if rkind != NodeKind::Property {
                    return Err(ArborError::WrongType(format!(
                        "cannot add {rkind} to an object; objects hold properties only"
                    )));
                }
                let new_name = self.name(replacement);
                if let Some(name) = new_name {
                    if let Some(holder) = self.property(container, name) {
                        if holder != existing {
                            return Err(ArborError::WrongType(format!(
                                "object already has a property named '{name}'"
                            )));
                        }
                    }
                }
            }
            NodeKind::Array | NodeKind::Constructor | NodeKind::Property => {
                if rkind == NodeKind::Property {
                    return Err(ArborError::WrongType(format!(
                        "a {ckind} cannot hold properties"
                    )));
                }
            }
            _ => {
                return Err(ArborError::WrongType(format!(
                    "{ckind} nodes hold no children"
                )))
            }
        }
        Ok(())
    }

    /// Clone-on-reparent: inserting an already-parented node, the target
    /// container itself, or one of its ancestors would alias or create a
    /// cycle, so a deep clone is substituted and the original stays put.
    fn adopt(&mut self, container: NodeId, item: NodeId) -> NodeId {
        let aliased = self.slots[item.index()].parent.is_some()
            || item == container
            || self.ancestors(container).any(|a| a == item);
        if aliased {
            self.deep_clone(item)
        } else {
            item
        }
    }

    fn splice_after(&mut self, container: NodeId, item: NodeId, after: Option<NodeId>) {
        let tail = self.ring(container).and_then(|r| r.tail);
        match tail {
            None => {
                self.slots[item.index()].next = Some(item);
                if let Some(ring) = self.ring_mut(container) {
                    ring.tail = Some(item);
                }
            }
            Some(tail_id) => {
                let anchor = after.unwrap_or(tail_id);
                let anchor_next = self.slots[anchor.index()].next;
                self.slots[item.index()].next = anchor_next;
                self.slots[anchor.index()].next = Some(item);
                if anchor == tail_id {
                    if let Some(ring) = self.ring_mut(container) {
                        ring.tail = Some(item);
                    }
                }
            }
        }
        self.slots[item.index()].parent = Some(container);
    }

    fn unsplice(&mut self, container: NodeId, node: NodeId) {
        let tail = match self.ring(container).and_then(|r| r.tail) {
            Some(t) => t,
            None => return,
        };
        let first = self.slots[tail.index()].next;
        if first == Some(node) && tail == node {
            if let Some(ring) = self.ring_mut(container) {
                ring.tail = None;
            }
        } else if let Some(prev) = self.prev_in_ring(container, node) {
            let node_next = self.slots[node.index()].next;
            self.slots[prev.index()].next = node_next;
            if tail == node {
                if let Some(ring) = self.ring_mut(container) {
                    ring.tail = Some(prev);
                }
            }
        }
        self.slots[node.index()].parent = None;
        self.slots[node.index()].next = None;
    }

    fn value_eq(&self, a: NodeId, b: NodeId) -> bool {
        match (&self.slots[a.index()].payload, &self.slots[b.index()].payload) {
            (
                Payload::Value {
                    scalar: sa,
                    kind: ka,
                },
                Payload::Value {
                    scalar: sb,
                    kind: kb,
                },
            ) => ka == kb && sa == sb,
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Observers and the reentrancy guard
    // ------------------------------------------------------------------

    /// Register a structural-change observer.
    pub fn subscribe(&mut self, observer: Rc<dyn TreeObserver>) {
        self.observers.push(observer);
    }

    /// Remove a previously registered observer (by identity).
    pub fn unsubscribe(&mut self, observer: &Rc<dyn TreeObserver>) {
        self.observers.retain(|o| !Rc::ptr_eq(o, observer));
    }

    fn notify(&mut self, container: NodeId, kind: ChangeKind, child: Option<NodeId>) {
        if self.observers.is_empty() {
            return;
        }
        let event = ChangeEvent {
            container,
            kind,
            child,
        };
        self.set_busy(container, true);
        let observers = self.observers.clone();
        for observer in observers {
            observer.on_change(self, &event);
        }
        self.set_busy(container, false);
    }

    fn set_busy(&mut self, container: NodeId, busy: bool) {
        if let Some(ring) = self.ring_mut(container) {
            ring.busy = busy;
        }
    }

    fn check_not_busy(&self, container: NodeId) -> Result<()> {
        if self.ring(container).is_some_and(|r| r.busy) {
            return Err(ArborError::InvalidState(
                "container is dispatching change notifications; \
                 mutation from its own handler is not allowed"
                    .into(),
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Clone, equality, hashing
    // ------------------------------------------------------------------

    /// Deep, disconnected copy of a subtree. The copy's root has no parent.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let shell = match &self.slots[id.index()].payload {
            Payload::Object { .. } => Payload::Object {
                ring: Ring::default(),
                index: HashMap::new(),
            },
            Payload::Array { .. } => Payload::Array {
                ring: Ring::default(),
            },
            Payload::Constructor { name, .. } => Payload::Constructor {
                name: name.clone(),
                ring: Ring::default(),
            },
            Payload::Property { name, .. } => Payload::Property {
                name: name.clone(),
                ring: Ring::default(),
            },
            Payload::Value { scalar, kind } => Payload::Value {
                scalar: scalar.clone(),
                kind: *kind,
            },
        };
        let line = self.slots[id.index()].line;
        let copy = self.alloc(shell);
        self.slots[copy.index()].line = line;
        let children: Vec<NodeId> = self.children(id).collect();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.splice_after(copy, child_copy, None);
            if let Some(name) = self.name(child_copy).map(str::to_string) {
                if let Payload::Object { index, .. } = &mut self.slots[copy.index()].payload {
                    index.insert(name, child_copy);
                }
            }
        }
        copy
    }

    /// Type-aware structural equality of two subtrees in this tree.
    pub fn deep_eq(&self, a: NodeId, b: NodeId) -> bool {
        deep_eq_across(self, a, self, b)
    }

    /// Lock-step equality of two containers' children.
    pub fn contents_eq(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return true;
        }
        contents_eq_across(self, a, self, b)
    }

    /// Structural hash matching [`deep_eq`](Self::deep_eq): container hashes
    /// are the XOR of their children's hashes (order-independent), properties
    /// and constructors fold their name in, values hash tag and payload.
    pub fn deep_hash(&self, id: NodeId) -> u64 {
        match &self.slots[id.index()].payload {
            Payload::Value { scalar, kind } => {
                let mut h = DefaultHasher::new();
                kind.hash(&mut h);
                scalar.hash(&mut h);
                h.finish()
            }
            Payload::Object { .. } | Payload::Array { .. } => self.children_hash(id),
            Payload::Constructor { name, .. } | Payload::Property { name, .. } => {
                let mut h = DefaultHasher::new();
                name.hash(&mut h);
                h.finish() ^ self.children_hash(id)
            }
        }
    }

    fn children_hash(&self, id: NodeId) -> u64 {
        self.children(id)
            .fold(0u64, |acc, child| acc ^ self.deep_hash(child))
    }

    // ------------------------------------------------------------------
    // Stream replay
    // ------------------------------------------------------------------

    /// Replay a subtree into a push sink, depth-first.
    pub fn write_to(&self, id: NodeId, sink: &mut dyn TokenSink) -> Result<()> {
        match &self.slots[id.index()].payload {
            Payload::Object { .. } => {
                sink.start_object()?;
                for child in self.children(id) {
                    self.write_to(child, sink)?;
                }
                sink.end_object()
            }
            Payload::Array { .. } => {
                sink.start_array()?;
                for child in self.children(id) {
                    self.write_to(child, sink)?;
                }
                sink.end_array()
            }
            Payload::Constructor { name, .. } => {
                sink.start_constructor(name)?;
                for child in self.children(id) {
                    self.write_to(child, sink)?;
                }
                sink.end_constructor()
            }
            Payload::Property { name, .. } => {
                sink.property_name(name)?;
                match self.first_child(id) {
                    Some(value) => self.write_to(value, sink),
                    None => sink.value(Scalar::Null),
                }
            }
            Payload::Value { scalar, kind } => match (kind, scalar) {
                (NodeKind::Comment, s) => sink.comment(&s.to_string()),
                (_, Scalar::Raw(text)) => sink.raw(text),
                (_, s) => sink.value(s.clone()),
            },
        }
    }
}

/// Structural equality across trees (or within one: pass the same tree
/// twice). Reference identity short-circuits only within a single tree.
pub fn deep_eq_across(ta: &JsonTree, a: NodeId, tb: &JsonTree, b: NodeId) -> bool {
    if std::ptr::eq(ta, tb) && a == b {
        return true;
    }
    let (ka, kb) = (ta.kind(a), tb.kind(b));
    if ka != kb {
        return false;
    }
    if ka.is_container() {
        if ta.name(a) != tb.name(b) {
            return false;
        }
        contents_eq_across(ta, a, tb, b)
    } else {
        match (ta.scalar(a), tb.scalar(b)) {
            (Some(sa), Some(sb)) => sa == sb,
            _ => false,
        }
    }
}

fn contents_eq_across(ta: &JsonTree, a: NodeId, tb: &JsonTree, b: NodeId) -> bool {
    let mut ia = ta.children(a);
    let mut ib = tb.children(b);
    loop {
        match (ia.next(), ib.next()) {
            (None, None) => return true,
            (Some(ca), Some(cb)) => {
                if !deep_eq_across(ta, ca, tb, cb) {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// Borrow wrapper giving a node `Hash + Eq` by structure, for use as a
/// dictionary or set key.
pub struct NodeKey<'a> {
    tree: &'a JsonTree,
    id: NodeId,
}

impl<'a> NodeKey<'a> {
    pub fn new(tree: &'a JsonTree, id: NodeId) -> Self {
        NodeKey { tree, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl fmt::Debug for NodeKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeKey").field(&self.id).finish()
    }
}

impl PartialEq for NodeKey<'_> {
    fn eq(&self, other: &Self) -> bool {
        deep_eq_across(self.tree, self.id, other.tree, other.id)
    }
}

impl Eq for NodeKey<'_> {}

impl Hash for NodeKey<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.tree.deep_hash(self.id));
    }
}

//! TreeReader -- replays a subtree as a forward-only token stream.
//!
//! The reader is the pull-based inverse of the stream writer: feeding its
//! token sequence back through [`TreeBuilder`](crate::writer::TreeBuilder)
//! reproduces a deep-equal tree.
//!
//! # Cursor model
//!
//! The reader moves through three states (start, in progress, done) with an
//! enter/exit cursor over the ring:
//!
//! - entering a container emits its start token and descends to the first
//!   child; a childless container exits immediately;
//! - exhausting a ring (the successor wraps to the first child) exits the
//!   enclosing scope, emitting its end token;
//! - property scopes emit a name token, then their single value, then
//!   auto-pop without an end token;
//! - popping past the subtree root ends the stream.
//!
//! Line info captured by the builder travels with the tokens; nodes built
//! programmatically report none.

use crate::error::Result;
use crate::scalar::{NodeKind, Scalar};
use crate::stream::{ReadEvent, StreamToken, TokenRead};
use crate::tree::{JsonTree, NodeId};

enum Cursor {
    Start,
    Enter(NodeId),
    Exit(NodeId),
    Done,
}

/// Pull token source over a subtree.
pub struct TreeReader<'a> {
    tree: &'a JsonTree,
    root: NodeId,
    cursor: Cursor,
    current: Option<ReadEvent>,
    depth: usize,
}

impl<'a> TreeReader<'a> {
    /// A reader positioned before the first token of `root`'s subtree.
    pub fn new(tree: &'a JsonTree, root: NodeId) -> Self {
        TreeReader {
            tree,
            root,
            cursor: Cursor::Start,
            current: None,
            depth: 0,
        }
    }

    /// Collect the remaining tokens. Convenience for tests and sinks that
    /// want the whole stream at once.
    pub fn drain(mut self) -> Result<Vec<ReadEvent>> {
        let mut events = Vec::new();
        while self.advance()? {
            if let Some(ev) = self.current() {
                events.push(ev.clone());
            }
        }
        Ok(events)
    }

    /// The cursor move after `node`'s subtree is fully emitted: continue with
    /// the next sibling, or exit the enclosing scope once the ring wraps.
    fn advance_from(&self, node: NodeId) -> Cursor {
        match self.tree.parent(node) {
            None => Cursor::Done,
            Some(_) if node == self.root => Cursor::Done,
            Some(parent) => {
                if self.tree.last_child(parent) == Some(node) {
                    Cursor::Exit(parent)
                } else {
                    match self.tree.ring_next(node) {
                        Some(sibling) => Cursor::Enter(sibling),
                        None => Cursor::Done,
                    }
                }
            }
        }
    }

    fn emit(&mut self, node: NodeId, token: StreamToken, depth: usize) {
        self.current = Some(ReadEvent {
            token,
            depth,
            line: self.tree.line_info(node),
        });
    }
}

impl TokenRead for TreeReader<'_> {
    fn current(&self) -> Option<&ReadEvent> {
        self.current.as_ref()
    }

    fn advance(&mut self) -> Result<bool> {
        loop {
            match std::mem::replace(&mut self.cursor, Cursor::Done) {
                Cursor::Start => {
                    self.cursor = Cursor::Enter(self.root);
                    continue;
                }
                Cursor::Enter(node) => {
                    let kind = self.tree.kind(node);
                    match kind {
                        NodeKind::Object | NodeKind::Array | NodeKind::Constructor => {
                            let token = match kind {
                                NodeKind::Object => StreamToken::StartObject,
                                NodeKind::Array => StreamToken::StartArray,
                                _ => StreamToken::StartConstructor(
                                    self.tree.name(node).unwrap_or_default().to_string(),
                                ),
                            };
                            self.emit(node, token, self.depth);
                            self.depth += 1;
                            self.cursor = match self.tree.first_child(node) {
                                Some(child) => Cursor::Enter(child),
                                None => Cursor::Exit(node),
                            };
                        }
                        NodeKind::Property => {
                            let name = self.tree.name(node).unwrap_or_default().to_string();
                            self.emit(node, StreamToken::PropertyName(name), self.depth);
                            self.cursor = match self.tree.first_child(node) {
                                Some(value) => Cursor::Enter(value),
                                // a property always holds a value; an empty
                                // scope reads as null
                                None => Cursor::Exit(node),
                            };
                        }
                        NodeKind::Comment => {
                            let text = self
                                .tree
                                .scalar(node)
                                .map(|s| s.to_string())
                                .unwrap_or_default();
                            self.emit(node, StreamToken::Comment(text), self.depth);
                            self.cursor = self.advance_from(node);
                        }
                        _ => {
                            let scalar = self
                                .tree
                                .scalar(node)
                                .cloned()
                                .unwrap_or(Scalar::Null);
                            self.emit(node, StreamToken::Value(scalar), self.depth);
                            self.cursor = self.advance_from(node);
                        }
                    }
                    return Ok(true);
                }
                Cursor::Exit(node) => match self.tree.kind(node) {
                    NodeKind::Object | NodeKind::Array | NodeKind::Constructor => {
                        self.depth -= 1;
                        let token = match self.tree.kind(node) {
                            NodeKind::Object => StreamToken::EndObject,
                            NodeKind::Array => StreamToken::EndArray,
                            _ => StreamToken::EndConstructor,
                        };
                        self.emit(node, token, self.depth);
                        self.cursor = if node == self.root {
                            Cursor::Done
                        } else {
                            self.advance_from(node)
                        };
                        return Ok(true);
                    }
                    // property scopes pop silently once their value is done
                    _ => {
                        self.cursor = self.advance_from(node);
                        continue;
                    }
                },
                Cursor::Done => {
                    self.current = None;
                    return Ok(false);
                }
            }
        }
    }
}

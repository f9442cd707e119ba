//! TreeWriter and TreeBuilder -- construct a tree from a token stream.
//!
//! [`TreeWriter`] is the push half: it implements [`TokenSink`] and maintains
//! an insertion cursor, the innermost open container. [`TreeBuilder`] is the
//! pull-based twin: it drives a [`TokenRead`] source and feeds the writer,
//! consuming exactly one complete value so that loading a subtree from the
//! middle of a document never over-consumes trailing siblings.
//!
//! # Cursor rules
//!
//! - start tokens create a container, attach it at the cursor (or make it the
//!   root), and push the cursor into it;
//! - end tokens pop the cursor to its parent, auto-skipping an open property
//!   scope;
//! - a property name on an object that already holds that name removes the
//!   stale property first, then opens a fresh scope (the new property lands
//!   at the end -- distinct from the in-place replacement `add` performs);
//! - scalars attach at the cursor and auto-pop a property scope, since a
//!   property holds exactly one value;
//! - a stream that never opens a container yields a single detached value
//!   node.

use crate::error::{ArborError, Result};
use crate::scalar::{NodeKind, Scalar};
use crate::stream::{LineInfo, ReadEvent, StreamToken, TokenRead, TokenSink};
use crate::tree::{JsonTree, NodeId};

/// Push token sink that builds a [`JsonTree`].
pub struct TreeWriter {
    tree: JsonTree,
    root: Option<NodeId>,
    /// Innermost open container, or `None` outside any container.
    cursor: Option<NodeId>,
    /// Stamped onto the next node created; set by the pull loop.
    line: Option<LineInfo>,
}

impl Default for TreeWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeWriter {
    pub fn new() -> Self {
        TreeWriter {
            tree: JsonTree::new(),
            root: None,
            cursor: None,
            line: None,
        }
    }

    /// Source position to record on subsequently created nodes.
    pub fn set_line_info(&mut self, line: Option<LineInfo>) {
        self.line = line;
    }

    /// Whether a complete root value has been written and every container
    /// closed.
    pub fn is_complete(&self) -> bool {
        self.cursor.is_none() && self.root.is_some()
    }

    /// The finished tree and its root. Fails if nothing was written or a
    /// container is still open.
    pub fn finish(self) -> Result<(JsonTree, NodeId)> {
        if self.cursor.is_some() {
            return Err(ArborError::InvalidState(
                "token stream ended with an unclosed container".into(),
            ));
        }
        match self.root {
            Some(root) => Ok((self.tree, root)),
            None => Err(ArborError::InvalidState(
                "token stream produced no value".into(),
            )),
        }
    }

    /// Borrow the partially built tree.
    pub fn tree(&self) -> &JsonTree {
        &self.tree
    }

    fn attach(&mut self, node: NodeId) -> Result<()> {
        match self.cursor {
            Some(container) => {
                self.tree.add(container, node)?;
            }
            None => {
                if self.root.is_some() {
                    return Err(ArborError::InvalidState(
                        "value written after the root value closed".into(),
                    ));
                }
                self.root = Some(node);
            }
        }
        Ok(())
    }

    fn open(&mut self, node: NodeId) -> Result<()> {
        self.tree.set_line(node, self.line);
        self.attach(node)?;
        self.cursor = Some(node);
        Ok(())
    }

    /// A property holds exactly one value: once written, the scope pops.
    fn pop_property_scope(&mut self) {
        if let Some(cursor) = self.cursor {
            if self.tree.kind(cursor) == NodeKind::Property {
                self.cursor = self.tree.parent(cursor);
            }
        }
    }

    fn close(&mut self, expected: NodeKind) -> Result<()> {
        let cursor = self.cursor.ok_or_else(|| {
            ArborError::InvalidState(format!("no open {expected} to close"))
        })?;
        let kind = self.tree.kind(cursor);
        if kind != expected {
            return Err(ArborError::InvalidState(format!(
                "end of {expected} does not match open {kind}"
            )));
        }
        self.cursor = self.tree.parent(cursor);
        self.pop_property_scope();
        Ok(())
    }
}

impl TokenSink for TreeWriter {
    fn start_object(&mut self) -> Result<()> {
        let node = self.tree.new_object();
        self.open(node)
    }

    fn start_array(&mut self) -> Result<()> {
        let node = self.tree.new_array();
        self.open(node)
    }

    fn start_constructor(&mut self, name: &str) -> Result<()> {
        let node = self.tree.new_constructor(name);
        self.open(node)
    }

    fn property_name(&mut self, name: &str) -> Result<()> {
        let cursor = self.cursor.ok_or_else(|| {
            ArborError::InvalidState("property name written outside an object".into())
        })?;
        if self.tree.kind(cursor) != NodeKind::Object {
            return Err(ArborError::InvalidState(format!(
                "property name written inside {}",
                self.tree.kind(cursor)
            )));
        }
        if let Some(stale) = self.tree.property(cursor, name) {
            self.tree.remove(stale)?;
        }
        let prop = self.tree.new_property_scope(name);
        self.tree.set_line(prop, self.line);
        self.tree.add(cursor, prop)?;
        self.cursor = Some(prop);
        Ok(())
    }

    fn value(&mut self, value: Scalar) -> Result<()> {
        let node = self.tree.new_value(value);
        self.tree.set_line(node, self.line);
        self.attach(node)?;
        self.pop_property_scope();
        Ok(())
    }

    fn comment(&mut self, text: &str) -> Result<()> {
        // objects hold properties only; comments arriving there are dropped,
        // matching what the default text collaborator can represent
        if let Some(cursor) = self.cursor {
            match self.tree.kind(cursor) {
                NodeKind::Object | NodeKind::Property => return Ok(()),
                _ => {}
            }
        }
        let node = self.tree.new_comment(text);
        self.tree.set_line(node, self.line);
        self.attach(node)
    }

    fn end_object(&mut self) -> Result<()> {
        self.close(NodeKind::Object)
    }

    fn end_array(&mut self) -> Result<()> {
        self.close(NodeKind::Array)
    }

    fn end_constructor(&mut self) -> Result<()> {
        self.close(NodeKind::Constructor)
    }
}

/// Feed one event into a sink. Shared by the sync and async pull loops.
pub(crate) fn dispatch(sink: &mut TreeWriter, event: &ReadEvent) -> Result<()> {
    sink.set_line_info(event.line);
    match &event.token {
        StreamToken::StartObject => sink.start_object(),
        StreamToken::StartArray => sink.start_array(),
        StreamToken::StartConstructor(name) => sink.start_constructor(name),
        StreamToken::PropertyName(name) => sink.property_name(name),
        StreamToken::EndObject => sink.end_object(),
        StreamToken::EndArray => sink.end_array(),
        StreamToken::EndConstructor => sink.end_constructor(),
        StreamToken::Value(scalar) => sink.value(scalar.clone()),
        StreamToken::Comment(text) => sink.comment(text),
    }
}

/// Pull-based builder: drives a [`TokenRead`] source into a tree.
pub struct TreeBuilder;

impl TreeBuilder {
    /// Consume exactly one complete value from `source`.
    ///
    /// A source with no current token is advanced once first. The build stops
    /// on the token that completes the value, leaving the source positioned
    /// there -- trailing sibling tokens are not consumed.
    pub fn build(source: &mut dyn TokenRead) -> Result<(JsonTree, NodeId)> {
        if source.current().is_none() && !source.advance()? {
            return Err(ArborError::InvalidState(
                "token source produced no tokens".into(),
            ));
        }
        let mut writer = TreeWriter::new();
        loop {
            let event = match source.current() {
                Some(event) => event.clone(),
                None => break,
            };
            dispatch(&mut writer, &event)?;
            if writer.is_complete() {
                return writer.finish();
            }
            if !source.advance()? {
                break;
            }
        }
        Err(ArborError::Parse {
            line: 0,
            column: 0,
            message: "unexpected end of token stream".into(),
        })
    }
}

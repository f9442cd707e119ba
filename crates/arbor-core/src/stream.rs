//! Streaming interfaces at the crate boundary.
//!
//! A tree converts to and from a forward-only token stream through two traits:
//!
//! - [`TokenSink`] -- push interface produced by tree replay and consumed by
//!   external writers/serializers
//! - [`TokenRead`] -- pull interface consumed by the tree builder, exposing a
//!   current `{token, depth, line}` position and an `advance` operation
//!
//! Character-level tokenizers live outside this crate; anything that can
//! produce [`StreamToken`]s can feed a tree, and anything that can consume
//! them can serialize one.

use crate::error::Result;
use crate::scalar::Scalar;

/// Source line/column captured by a tokenizer, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInfo {
    pub line: usize,
    pub column: usize,
}

/// One token of the stream form of a tree.
///
/// Raw text travels as [`Scalar::Raw`] inside `Value`; comments have their own
/// variant because a comment is a node tag, not a scalar type.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamToken {
    StartObject,
    StartArray,
    StartConstructor(String),
    PropertyName(String),
    EndObject,
    EndArray,
    EndConstructor,
    Value(Scalar),
    Comment(String),
}

/// Push token sink: the receiving end of a tree replay.
pub trait TokenSink {
    fn start_object(&mut self) -> Result<()>;
    fn start_array(&mut self) -> Result<()>;
    fn start_constructor(&mut self, name: &str) -> Result<()>;
    fn property_name(&mut self, name: &str) -> Result<()>;
    fn value(&mut self, value: Scalar) -> Result<()>;
    fn comment(&mut self, text: &str) -> Result<()>;
    fn end_object(&mut self) -> Result<()>;
    fn end_array(&mut self) -> Result<()>;
    fn end_constructor(&mut self) -> Result<()>;

    /// Raw text defaults to a [`Scalar::Raw`] value; sinks that emit text
    /// directly override this to splice the fragment verbatim.
    fn raw(&mut self, text: &str) -> Result<()> {
        self.value(Scalar::Raw(text.to_string()))
    }
}

/// Current position of a pull token source.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadEvent {
    pub token: StreamToken,
    /// Container nesting depth of the token. Start tokens carry the depth of
    /// the container they open; end tokens carry the same depth.
    pub depth: usize,
    /// Source position, when the tokenizer tracks one.
    pub line: Option<LineInfo>,
}

/// Pull token source: the driving end of a tree build.
pub trait TokenRead {
    /// The current event, or `None` before the first `advance` and after
    /// exhaustion.
    fn current(&self) -> Option<&ReadEvent>;

    /// Move to the next token. Returns `Ok(false)` once the stream is
    /// exhausted.
    fn advance(&mut self) -> Result<bool>;
}

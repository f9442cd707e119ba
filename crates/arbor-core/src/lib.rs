//! # arbor-core
//!
//! A mutable, in-memory JSON document tree (a DOM of object, array,
//! constructor, property, and scalar nodes) with streaming adapters that
//! convert between the tree and a forward-only token stream, plus a small
//! dot/bracket path language for navigating it.
//!
//! Nodes live in an arena ([`JsonTree`]) addressed by [`NodeId`] handles.
//! Each container stores its children as a singly-linked ring anchored at the
//! last child, giving O(1) append without a doubly-linked list. Insertion
//! enforces aliasing and cycle prevention by cloning on reparent, objects
//! keep property names unique, and structural equality/hashing work across
//! whole subtrees.
//!
//! ## Quick start
//!
//! ```rust
//! use arbor_core::{parse, to_json_string};
//!
//! let (mut tree, root) = parse(r#"{"name":"Alice","scores":[95,87]}"#).unwrap();
//!
//! let scores = tree.get(root, "scores").unwrap();
//! assert_eq!(tree.len(scores), 2);
//! assert_eq!(tree.as_i64(tree.item_at(scores, 0).unwrap()), Some(95));
//!
//! let active = tree.new_value(true);
//! tree.insert_property(root, "active", active).unwrap();
//! assert_eq!(
//!     to_json_string(&tree, root).unwrap(),
//!     r#"{"name":"Alice","scores":[95,87],"active":true}"#
//! );
//! ```
//!
//! ## Modules
//!
//! - [`tree`] -- the arena, ring containers, mutation, equality/hashing
//! - [`iter`] -- lazy traversal (children, descendants, ancestors, siblings)
//! - [`reader`] -- tree to token stream (pull state machine)
//! - [`writer`] -- token stream to tree (push sink and pull builder)
//! - [`stream`] -- the token, sink, and source types at the crate boundary
//! - [`text`] -- text entry points via `serde_json`, compact text sink
//! - [`path`] -- the dot/bracket path language
//! - [`scalar`] -- node kinds and scalar payloads
//! - [`error`] -- the error taxonomy

pub mod error;
pub mod iter;
pub mod path;
pub mod reader;
pub mod scalar;
pub mod stream;
pub mod text;
pub mod tree;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_stream;

pub use error::{ArborError, Result};
pub use path::{select, Path, Segment};
pub use reader::TreeReader;
pub use scalar::{NodeKind, Scalar};
pub use stream::{LineInfo, ReadEvent, StreamToken, TokenRead, TokenSink};
pub use text::{from_value, load, parse, to_json_string, to_value, JsonTextSink};
pub use tree::{
    deep_eq_across, ChangeEvent, ChangeKind, JsonTree, NodeId, NodeKey, TreeObserver,
};
pub use writer::{TreeBuilder, TreeWriter};

#[cfg(feature = "async")]
pub use async_stream::{build_async, AsyncTokenRead};

//! Asynchronous pull source (feature = "async").
//!
//! The async mode exists solely for driving a tree build from an external
//! byte source: suspension happens only while awaiting the next token, never
//! mid-mutation. Cancelling (dropping) the build future leaves whatever tree
//! existed at the last fully-completed node boundary -- there is no rollback.

use async_trait::async_trait;

use crate::error::{ArborError, Result};
use crate::stream::ReadEvent;
use crate::tree::{JsonTree, NodeId};
use crate::writer::{dispatch, TreeWriter};

/// Pull token source whose `advance` may await an external byte source.
#[async_trait]
pub trait AsyncTokenRead {
    fn current(&self) -> Option<&ReadEvent>;
    async fn advance(&mut self) -> Result<bool>;
}

/// Async twin of [`TreeBuilder::build`](crate::writer::TreeBuilder::build):
/// consumes exactly one complete value and leaves the source positioned on
/// the token that completed it.
pub async fn build_async(source: &mut (dyn AsyncTokenRead + Send)) -> Result<(JsonTree, NodeId)> {
    if source.current().is_none() && !source.advance().await? {
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
        if !source.advance().await? {
            break;
        }
    }
    Err(ArborError::Parse {
        line: 0,
        column: 0,
        message: "unexpected end of token stream".into(),
    })
}

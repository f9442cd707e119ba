#![cfg(feature = "async")]

use arbor_core::{build_async, AsyncTokenRead, ReadEvent, Scalar, StreamToken};
use async_trait::async_trait;

/// Async source over a prerecorded token list; `advance` resolves
/// immediately, standing in for an external byte source.
struct AsyncVecSource {
    events: Vec<ReadEvent>,
    pos: Option<usize>,
}

impl AsyncVecSource {
    fn new(tokens: Vec<StreamToken>) -> Self {
        let mut depth = 0usize;
        let events = tokens
            .into_iter()
            .map(|token| {
                let event_depth = match &token {
                    StreamToken::StartObject
                    | StreamToken::StartArray
                    | StreamToken::StartConstructor(_) => {
                        let d = depth;
                        depth += 1;
                        d
                    }
                    StreamToken::EndObject
                    | StreamToken::EndArray
                    | StreamToken::EndConstructor => {
                        depth -= 1;
                        depth
                    }
                    _ => depth,
                };
                ReadEvent {
                    token,
                    depth: event_depth,
                    line: None,
                }
            })
            .collect();
        AsyncVecSource { events, pos: None }
    }
}

#[async_trait]
impl AsyncTokenRead for AsyncVecSource {
    fn current(&self) -> Option<&ReadEvent> {
        self.pos.and_then(|p| self.events.get(p))
    }

    async fn advance(&mut self) -> arbor_core::Result<bool> {
        let next = match self.pos {
            None => 0,
            Some(p) => p + 1,
        };
        self.pos = Some(next);
        Ok(next < self.events.len())
    }
}

#[tokio::test]
async fn build_async_consumes_one_value() {
    let mut source = AsyncVecSource::new(vec![
        StreamToken::StartObject,
        StreamToken::PropertyName("n".into()),
        StreamToken::Value(Scalar::Int(5)),
        StreamToken::EndObject,
        StreamToken::Value(Scalar::Int(9)),
    ]);

    let (tree, root) = build_async(&mut source).await.unwrap();
    assert_eq!(tree.as_i64(tree.get(root, "n").unwrap()), Some(5));

    // the trailing sibling token was not consumed
    assert_eq!(
        source.current().map(|e| e.token.clone()),
        Some(StreamToken::EndObject)
    );
}

#[tokio::test]
async fn build_async_empty_source_fails() {
    let mut source = AsyncVecSource::new(vec![]);
    assert!(build_async(&mut source).await.is_err());
}

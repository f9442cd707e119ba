//! Text entry points -- `serde_json` as the character-level collaborator.
//!
//! The character-level tokenizer is outside this crate's scope, so text comes
//! in through `serde_json` (whose errors carry line/column) and goes out
//! through [`JsonTextSink`], a compact-JSON push sink. Formatting is the
//! sink's concern, not the tree's.
//!
//! # Text forms of extended scalars
//!
//! - `Date` -- RFC 3339 string
//! - `Bytes` -- base64 string
//! - `Guid` -- hyphenated string
//! - `Uri` -- the URL string
//! - `TimeSpan` -- `[-][D.]HH:MM:SS[.fffffffff]`
//! - `Undefined` -- `null`
//! - `Raw` -- spliced verbatim
//! - constructors -- `new Name(arg,...)`
//! - comments -- omitted (the default reader cannot re-read them)

use serde_json::Value;

use crate::error::{ArborError, Result};
use crate::scalar::{NodeKind, Scalar};
use crate::stream::TokenSink;
use crate::tree::{JsonTree, NodeId};
use crate::writer::TreeWriter;

/// Parse JSON text into a tree. Malformed input yields
/// [`ArborError::Parse`](crate::error::ArborError::Parse) with the source
/// position.
pub fn parse(text: &str) -> Result<(JsonTree, NodeId)> {
    let value: Value = serde_json::from_str(text)?;
    from_value(&value)
}

/// Parse JSON from a byte reader into a tree.
pub fn load(reader: impl std::io::Read) -> Result<(JsonTree, NodeId)> {
    let value: Value = serde_json::from_reader(reader)?;
    from_value(&value)
}

/// Build a tree from an already-parsed `serde_json::Value`.
pub fn from_value(value: &Value) -> Result<(JsonTree, NodeId)> {
    let mut writer = TreeWriter::new();
    push_value(value, &mut writer)?;
    writer.finish()
}

fn push_value(value: &Value, sink: &mut dyn TokenSink) -> Result<()> {
    match value {
        Value::Null => sink.value(Scalar::Null),
        Value::Bool(b) => sink.value(Scalar::Bool(*b)),
        Value::Number(n) => sink.value(number_to_scalar(n)),
        Value::String(s) => sink.value(Scalar::Str(s.clone())),
        Value::Array(items) => {
            sink.start_array()?;
            for item in items {
                push_value(item, sink)?;
            }
            sink.end_array()
        }
        Value::Object(map) => {
            sink.start_object()?;
            for (name, item) in map {
                sink.property_name(name)?;
                push_value(item, sink)?;
            }
            sink.end_object()
        }
    }
}

fn number_to_scalar(n: &serde_json::Number) -> Scalar {
    if let Some(i) = n.as_i64() {
        Scalar::Int(i)
    } else if let Some(u) = n.as_u64() {
        Scalar::UInt(u)
    } else {
        Scalar::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

/// Convert a subtree to a `serde_json::Value`.
///
/// Extended scalars take their canonical string forms; raw text is parsed.
/// Constructors, properties, and comments have no standalone JSON value form
/// and yield `WrongType`.
pub fn to_value(tree: &JsonTree, id: NodeId) -> Result<Value> {
    match tree.kind(id) {
        NodeKind::Object => {
            let mut map = serde_json::Map::new();
            for prop in tree.children(id) {
                let name = tree.name(prop).unwrap_or_default().to_string();
                let value = match tree.first_child(prop) {
                    Some(child) => to_value(tree, child)?,
                    None => Value::Null,
                };
                map.insert(name, value);
            }
            Ok(Value::Object(map))
        }
        NodeKind::Array => {
            let mut items = Vec::new();
            for child in tree.children(id) {
                if tree.kind(child) == NodeKind::Comment {
                    continue;
                }
                items.push(to_value(tree, child)?);
            }
            Ok(Value::Array(items))
        }
        NodeKind::Constructor => Err(ArborError::WrongType(
            "a constructor call has no JSON value form".into(),
        )),
        NodeKind::Property => Err(ArborError::WrongType(
            "a property has no standalone JSON value form".into(),
        )),
        NodeKind::Comment => Err(ArborError::WrongType(
            "a comment has no JSON value form".into(),
        )),
        _ => match tree.scalar(id) {
            Some(Scalar::Null) | Some(Scalar::Undefined) | None => Ok(Value::Null),
            Some(Scalar::Bool(b)) => Ok(Value::Bool(*b)),
            Some(Scalar::Int(i)) => Ok(Value::Number((*i).into())),
            Some(Scalar::UInt(u)) => Ok(Value::Number((*u).into())),
            Some(Scalar::Float(f)) => Ok(serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null)),
            Some(Scalar::Str(s)) => Ok(Value::String(s.clone())),
            Some(Scalar::Raw(raw)) => Ok(serde_json::from_str(raw)?),
            Some(other) => Ok(Value::String(other.to_string())),
        },
    }
}

/// Serialize a subtree to compact JSON text.
pub fn to_json_string(tree: &JsonTree, id: NodeId) -> Result<String> {
    let mut sink = JsonTextSink::new();
    tree.write_to(id, &mut sink)?;
    Ok(sink.finish())
}

enum Frame {
    Object { first: bool },
    Array { first: bool },
    Constructor { first: bool },
}

/// Push sink emitting compact JSON text.
///
/// Separator bookkeeping follows the container stack: object frames write
/// commas before property names, array and constructor frames before values.
pub struct JsonTextSink {
    out: String,
    stack: Vec<Frame>,
    /// Set after a property name; the following value needs no separator.
    pending_value: bool,
}

impl Default for JsonTextSink {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonTextSink {
    pub fn new() -> Self {
        JsonTextSink {
            out: String::new(),
            stack: Vec::new(),
            pending_value: false,
        }
    }

    /// The accumulated text.
    pub fn finish(self) -> String {
        self.out
    }

    fn begin_value(&mut self) {
        if self.pending_value {
            self.pending_value = false;
            return;
        }
        if let Some(frame) = self.stack.last_mut() {
            match frame {
                Frame::Array { first } | Frame::Constructor { first } => {
                    if !*first {
                        self.out.push(',');
                    }
                    *first = false;
                }
                Frame::Object { .. } => {}
            }
        }
    }
}

impl TokenSink for JsonTextSink {
    fn start_object(&mut self) -> Result<()> {
        self.begin_value();
        self.out.push('{');
        self.stack.push(Frame::Object { first: true });
        Ok(())
    }

    fn start_array(&mut self) -> Result<()> {
        self.begin_value();
        self.out.push('[');
        self.stack.push(Frame::Array { first: true });
        Ok(())
    }

    fn start_constructor(&mut self, name: &str) -> Result<()> {
        self.begin_value();
        self.out.push_str("new ");
        self.out.push_str(name);
        self.out.push('(');
        self.stack.push(Frame::Constructor { first: true });
        Ok(())
    }

    fn property_name(&mut self, name: &str) -> Result<()> {
        if let Some(Frame::Object { first }) = self.stack.last_mut() {
            if !*first {
                self.out.push(',');
            }
            *first = false;
        }
        write_escaped(&mut self.out, name);
        self.out.push(':');
        self.pending_value = true;
        Ok(())
    }

    fn value(&mut self, value: Scalar) -> Result<()> {
        self.begin_value();
        match &value {
            Scalar::Null | Scalar::Undefined => self.out.push_str("null"),
            Scalar::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Scalar::Int(i) => self.out.push_str(&i.to_string()),
            Scalar::UInt(u) => self.out.push_str(&u.to_string()),
            Scalar::Float(f) => match serde_json::Number::from_f64(*f) {
                Some(n) => self.out.push_str(&n.to_string()),
                None => self.out.push_str("null"),
            },
            Scalar::Str(s) => write_escaped(&mut self.out, s),
            Scalar::Raw(raw) => self.out.push_str(raw),
            other => write_escaped(&mut self.out, &other.to_string()),
        }
        Ok(())
    }

    fn comment(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn raw(&mut self, text: &str) -> Result<()> {
        self.begin_value();
        self.out.push_str(text);
        Ok(())
    }

    fn end_object(&mut self) -> Result<()> {
        self.stack.pop();
        self.out.push('}');
        Ok(())
    }

    fn end_array(&mut self) -> Result<()> {
        self.stack.pop();
        self.out.push(']');
        Ok(())
    }

    fn end_constructor(&mut self) -> Result<()> {
        self.stack.pop();
        self.out.push(')');
        Ok(())
    }
}

/// Write a JSON string literal with the escapes serde_json understands.
fn write_escaped(out: &mut String, text: &str) {
    out.push('"');
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

//! Node kind tags and scalar payloads.
//!
//! Every node in a tree carries a [`NodeKind`] tag. Container nodes (object,
//! array, constructor, property) own children; every other kind is a leaf
//! holding one [`Scalar`]. Signed and unsigned integers share the `Integer`
//! tag and compare by widening to a common representation, so `Int(5)` and
//! `UInt(5)` are equal while `Int(5)` and `Float(5.0)` are not (the tag
//! differs).

use std::fmt;
use std::hash::{Hash, Hasher};

use base64::Engine;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use url::Url;
use uuid::Uuid;

/// Type tag of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Object,
    Array,
    Constructor,
    Property,
    Comment,
    Integer,
    Float,
    String,
    Boolean,
    Null,
    Undefined,
    Date,
    Raw,
    Bytes,
    Guid,
    Uri,
    TimeSpan,
}

impl NodeKind {
    /// Whether nodes of this kind own children.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            NodeKind::Object | NodeKind::Array | NodeKind::Constructor | NodeKind::Property
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Object => "object",
            NodeKind::Array => "array",
            NodeKind::Constructor => "constructor",
            NodeKind::Property => "property",
            NodeKind::Comment => "comment",
            NodeKind::Integer => "integer",
            NodeKind::Float => "float",
            NodeKind::String => "string",
            NodeKind::Boolean => "boolean",
            NodeKind::Null => "null",
            NodeKind::Undefined => "undefined",
            NodeKind::Date => "date",
            NodeKind::Raw => "raw",
            NodeKind::Bytes => "bytes",
            NodeKind::Guid => "guid",
            NodeKind::Uri => "uri",
            NodeKind::TimeSpan => "timespan",
        };
        f.write_str(name)
    }
}

/// One tagged scalar payload.
///
/// `Int` and `UInt` both map to [`NodeKind::Integer`]; the split exists so the
/// full `u64` range survives without loss. Dates, byte buffers, guids, uris,
/// and timespans are in-memory annotations that serialize to their canonical
/// string forms.
#[derive(Debug, Clone)]
pub enum Scalar {
    Null,
    Undefined,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Date(DateTime<Utc>),
    Raw(String),
    Bytes(Vec<u8>),
    Guid(Uuid),
    Uri(Url),
    TimeSpan(Duration),
}

impl Scalar {
    /// The node kind a value of this scalar is tagged with.
    pub fn kind(&self) -> NodeKind {
        match self {
            Scalar::Null => NodeKind::Null,
            Scalar::Undefined => NodeKind::Undefined,
            Scalar::Bool(_) => NodeKind::Boolean,
            Scalar::Int(_) | Scalar::UInt(_) => NodeKind::Integer,
            Scalar::Float(_) => NodeKind::Float,
            Scalar::Str(_) => NodeKind::String,
            Scalar::Date(_) => NodeKind::Date,
            Scalar::Raw(_) => NodeKind::Raw,
            Scalar::Bytes(_) => NodeKind::Bytes,
            Scalar::Guid(_) => NodeKind::Guid,
            Scalar::Uri(_) => NodeKind::Uri,
            Scalar::TimeSpan(_) => NodeKind::TimeSpan,
        }
    }
}

/// Canonical bit pattern for float comparison and hashing: all NaNs collapse
/// to one representation, -0.0 collapses to 0.0 (matching the equality below).
fn float_bits(f: f64) -> u64 {
    if f.is_nan() {
        f64::NAN.to_bits()
    } else if f == 0.0 {
        0.0f64.to_bits()
    } else {
        f.to_bits()
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Undefined, Scalar::Undefined) => true,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            // Integers widen to i128 so Int(5) == UInt(5).
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::UInt(a), Scalar::UInt(b)) => a == b,
            (Scalar::Int(a), Scalar::UInt(b)) | (Scalar::UInt(b), Scalar::Int(a)) => {
                i128::from(*a) == i128::from(*b)
            }
            // Total float equality: NaN == NaN, -0.0 == 0.0.
            (Scalar::Float(a), Scalar::Float(b)) => float_bits(*a) == float_bits(*b),
            (Scalar::Str(a), Scalar::Str(b)) => a == b,
            (Scalar::Date(a), Scalar::Date(b)) => a == b,
            (Scalar::Raw(a), Scalar::Raw(b)) => a == b,
            (Scalar::Bytes(a), Scalar::Bytes(b)) => a == b,
            (Scalar::Guid(a), Scalar::Guid(b)) => a == b,
            (Scalar::Uri(a), Scalar::Uri(b)) => a == b,
            (Scalar::TimeSpan(a), Scalar::TimeSpan(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Scalar::Null => 0u8.hash(state),
            Scalar::Undefined => 1u8.hash(state),
            Scalar::Bool(b) => {
                2u8.hash(state);
                b.hash(state);
            }
            // Int and UInt share a discriminant so widened-equal values hash equal.
            Scalar::Int(i) => {
                3u8.hash(state);
                i128::from(*i).hash(state);
            }
            Scalar::UInt(u) => {
                3u8.hash(state);
                i128::from(*u).hash(state);
            }
            Scalar::Float(f) => {
                4u8.hash(state);
                float_bits(*f).hash(state);
            }
            Scalar::Str(s) => {
                5u8.hash(state);
                s.hash(state);
            }
            Scalar::Date(d) => {
                6u8.hash(state);
                d.timestamp().hash(state);
                d.timestamp_subsec_nanos().hash(state);
            }
            Scalar::Raw(s) => {
                7u8.hash(state);
                s.hash(state);
            }
            Scalar::Bytes(b) => {
                8u8.hash(state);
                b.hash(state);
            }
            Scalar::Guid(g) => {
                9u8.hash(state);
                g.hash(state);
            }
            Scalar::Uri(u) => {
                10u8.hash(state);
                u.as_str().hash(state);
            }
            Scalar::TimeSpan(t) => {
                11u8.hash(state);
                t.num_seconds().hash(state);
                t.subsec_nanos().hash(state);
            }
        }
    }
}

impl fmt::Display for Scalar {
    /// Bare text form of the value, without JSON quoting. Strings and raw text
    /// print verbatim; extended scalars use their canonical representations.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Undefined => f.write_str("undefined"),
            Scalar::Bool(b) => f.write_str(if *b { "true" } else { "false" }),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::UInt(u) => write!(f, "{u}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Str(s) => f.write_str(s),
            Scalar::Date(d) => f.write_str(&d.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Scalar::Raw(s) => f.write_str(s),
            Scalar::Bytes(b) => {
                f.write_str(&base64::engine::general_purpose::STANDARD.encode(b))
            }
            Scalar::Guid(g) => write!(f, "{g}"),
            Scalar::Uri(u) => f.write_str(u.as_str()),
            Scalar::TimeSpan(t) => f.write_str(&format_timespan(*t)),
        }
    }
}

/// Format a timespan as `[-][D.]HH:MM:SS[.fffffffff]`, fractional part trimmed.
fn format_timespan(t: Duration) -> String {
    let negative = t < Duration::zero();
    let t = if negative { -t } else { t };
    let total_secs = t.num_seconds();
    let nanos = t.subsec_nanos();
    let days = total_secs / 86_400;
    let rem = total_secs % 86_400;
    let (hours, minutes, seconds) = (rem / 3_600, (rem % 3_600) / 60, rem % 60);

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if days > 0 {
        out.push_str(&format!("{days}."));
    }
    out.push_str(&format!("{hours:02}:{minutes:02}:{seconds:02}"));
    if nanos > 0 {
        let frac = format!("{nanos:09}");
        out.push('.');
        out.push_str(frac.trim_end_matches('0'));
    }
    out
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(i64::from(v))
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<u32> for Scalar {
    fn from(v: u32) -> Self {
        Scalar::Int(i64::from(v))
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        Scalar::UInt(v)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::Float(f64::from(v))
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(v: DateTime<Utc>) -> Self {
        Scalar::Date(v)
    }
}

impl From<Vec<u8>> for Scalar {
    fn from(v: Vec<u8>) -> Self {
        Scalar::Bytes(v)
    }
}

impl From<Uuid> for Scalar {
    fn from(v: Uuid) -> Self {
        Scalar::Guid(v)
    }
}

impl From<Url> for Scalar {
    fn from(v: Url) -> Self {
        Scalar::Uri(v)
    }
}

impl From<Duration> for Scalar {
    fn from(v: Duration) -> Self {
        Scalar::TimeSpan(v)
    }
}

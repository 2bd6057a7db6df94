//! Message envelope - the unit of transport between stages
//!
//! A `Message` pairs a producer-assigned id with a `Payload`. Messages are
//! never mutated in place: a stage that changes the payload builds a new
//! message and keeps the original id unless it deliberately re-tags it.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Producer-assigned identifier
    pub id: String,

    /// Payload
    pub data: Payload,
}

impl Message {
    /// Create a message with a freshly generated id
    pub fn new(data: impl Into<Payload>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            data: data.into(),
        }
    }

    /// Create a message with an explicit id
    pub fn with_id(id: impl Into<String>, data: impl Into<Payload>) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
        }
    }

    /// Build a new message carrying `data` under this message's id
    pub fn map(self, data: impl Into<Payload>) -> Self {
        Self {
            id: self.id,
            data: data.into(),
        }
    }

    /// Try to read the payload as `T`
    pub fn payload<T: PayloadType>(&self) -> Option<T> {
        T::from_payload(&self.data)
    }
}

/// Message payload
///
/// Closed set of variants that stages exchange.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    /// No data
    #[default]
    Null,

    /// Boolean
    Bool(bool),

    /// Signed integer
    Int(i64),

    /// Floating point number
    Float(f64),

    /// UTF-8 text (lines, blobs read as text)
    Text(String),

    /// Raw bytes
    Bytes(Bytes),

    /// Structured JSON document
    Json(serde_json::Value),
}

impl Payload {
    /// Variant name (used for logging and type errors)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Json(_) => "json",
        }
    }

    /// Render the payload as a JSON value
    ///
    /// Bytes are decoded as lossy UTF-8.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::Text(s) => Value::String(s.clone()),
            Self::Bytes(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
            Self::Json(v) => v.clone(),
        }
    }

    /// Map a decoded JSON value onto the closest native variant
    ///
    /// Strings, numbers, booleans and null become scalars; arrays and objects
    /// stay `Json`.
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::String(s) => Self::Text(s),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map_or(Self::Json(Value::Number(n)), Self::Float),
            },
            other => Self::Json(other),
        }
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for Payload {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Payload {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Payload {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// Types that a typed stage can extract from, and put back into, a payload
///
/// Extraction is strict: `Int(1)` is not a `String`. Typed stages treat a
/// `None` from `from_payload` as "not mine" and forward the message unchanged.
pub trait PayloadType: Sized + Send + 'static {
    /// Variant name expected by this type
    const KIND: &'static str;

    /// Extract a value of this type
    fn from_payload(payload: &Payload) -> Option<Self>;

    /// Wrap the value back into a payload
    fn into_payload(self) -> Payload;
}

impl PayloadType for String {
    const KIND: &'static str = "text";

    fn from_payload(payload: &Payload) -> Option<Self> {
        match payload {
            Payload::Text(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn into_payload(self) -> Payload {
        Payload::Text(self)
    }
}

impl PayloadType for i64 {
    const KIND: &'static str = "int";

    fn from_payload(payload: &Payload) -> Option<Self> {
        match payload {
            Payload::Int(i) => Some(*i),
            _ => None,
        }
    }

    fn into_payload(self) -> Payload {
        Payload::Int(self)
    }
}

impl PayloadType for f64 {
    const KIND: &'static str = "float";

    fn from_payload(payload: &Payload) -> Option<Self> {
        match payload {
            Payload::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn into_payload(self) -> Payload {
        Payload::Float(self)
    }
}

impl PayloadType for bool {
    const KIND: &'static str = "bool";

    fn from_payload(payload: &Payload) -> Option<Self> {
        match payload {
            Payload::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn into_payload(self) -> Payload {
        Payload::Bool(self)
    }
}

impl PayloadType for Bytes {
    const KIND: &'static str = "bytes";

    fn from_payload(payload: &Payload) -> Option<Self> {
        match payload {
            Payload::Bytes(b) => Some(b.clone()),
            _ => None,
        }
    }

    fn into_payload(self) -> Payload {
        Payload::Bytes(self)
    }
}

impl PayloadType for serde_json::Value {
    const KIND: &'static str = "json";

    // Any payload has a JSON rendering.
    fn from_payload(payload: &Payload) -> Option<Self> {
        Some(payload.to_json())
    }

    fn into_payload(self) -> Payload {
        Payload::Json(self)
    }
}

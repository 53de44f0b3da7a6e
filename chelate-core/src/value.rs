use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use crate::node::Node;

/// Ordered field map of a record or class instance.
pub type Fields = IndexMap<String, Value>;

/// A numeric primitive.
///
/// Integers and floats are kept apart so that integral values are emitted
/// as integers by text encoders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{n}"),
            Number::Float(n) => write!(f, "{n}"),
        }
    }
}

/// An opaque primitive with an optional description.
///
/// Symbols carry no identity of their own in the output; they pass through
/// the mapper like any other primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol(Option<Arc<str>>);

impl Symbol {
    pub fn new(description: impl Into<Arc<str>>) -> Self {
        Symbol(Some(description.into()))
    }

    pub fn anonymous() -> Self {
        Symbol(None)
    }

    pub fn description(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// A value in the input graph.
///
/// Everything except [`Value::Node`] is a primitive: primitives are copied
/// into the output unchanged and never occupy an instance slot.
#[derive(Debug, Clone, Default)]
pub enum Value {
    Undefined,
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Symbol(Symbol),
    Node(Node),
}

impl Value {
    /// Returns true for every variant except [`Value::Node`].
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Value::Node(_))
    }

    /// Returns the node handle if this value is an object.
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Converts a Rust value into a graph [`Value`].
///
/// Containers (`Vec`, `IndexMap`) become fresh nodes on every call, so two
/// conversions of the same vector are two distinct identities. Share a
/// [`Node`] handle to express sharing.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl ToValue for Node {
    fn to_value(&self) -> Value {
        Value::Node(self.clone())
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::String(self.to_owned())
    }
}

impl ToValue for Symbol {
    fn to_value(&self) -> Value {
        Value::Symbol(self.clone())
    }
}

impl ToValue for () {
    fn to_value(&self) -> Value {
        Value::Null
    }
}

macro_rules! impl_to_value_int {
    ($($t:ty),*) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    Value::Number(Number::Int(i64::from(*self)))
                }
            }

            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    v.to_value()
                }
            }
        )*
    };
}

impl_to_value_int!(u8, u16, u32, i8, i16, i32, i64);

macro_rules! impl_to_value_float {
    ($($t:ty),*) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    Value::Number(Number::Float(f64::from(*self)))
                }
            }

            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    v.to_value()
                }
            }
        )*
    };
}

impl_to_value_float!(f32, f64);

// u64 and usize do not fit i64 losslessly; large values fall back to floats.
macro_rules! impl_to_value_wide {
    ($($t:ty),*) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    match i64::try_from(*self) {
                        Ok(n) => Value::Number(Number::Int(n)),
                        Err(_) => Value::Number(Number::Float(*self as f64)),
                    }
                }
            }

            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    v.to_value()
                }
            }
        )*
    };
}

impl_to_value_wide!(u64, usize);

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::Node(Node::sequence(self.iter().map(ToValue::to_value).collect()))
    }
}

impl<T: ToValue> ToValue for IndexMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Node(Node::record(
            self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect(),
        ))
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<Symbol> for Value {
    fn from(v: Symbol) -> Self {
        Value::Symbol(v)
    }
}

impl From<Node> for Value {
    fn from(v: Node) -> Self {
        Value::Node(v)
    }
}

impl From<&Node> for Value {
    fn from(v: &Node) -> Self {
        Value::Node(v.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

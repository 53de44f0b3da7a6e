//! The flattened output and its wire form.
//!
//! ```text
//! {
//!   "instances": [ { "__type__": <tag>, "__value__": <value> }, ... ],
//!   "root": <value>
//! }
//! ```
//!
//! References are written as `{ "__index__": n }`. Values with no text
//! representation (undefined, symbols) are emitted as `null` inside
//! sequences and at the root, and omitted from maps.

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::error::Diagnostic;
use crate::value::{Number, Symbol};

/// Type tag reserved for plain records.
pub const OBJECT_TAG: &str = "__object__";
/// Type tag reserved for native sequences.
pub const ARRAY_TAG: &str = "__array__";

/// An index into [`Serialized::instances`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reference {
    pub index: usize,
}

impl Reference {
    pub fn new(index: usize) -> Self {
        Reference { index }
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("__index__", &self.index)?;
        map.end()
    }
}

/// A value after mapping: primitives are unchanged, objects became references.
#[derive(Debug, Clone, PartialEq)]
pub enum MappedValue {
    Undefined,
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Symbol(Symbol),
    Reference(Reference),
    Sequence(Vec<MappedValue>),
    Map(IndexMap<String, MappedValue>),
}

impl MappedValue {
    pub fn as_reference(&self) -> Option<Reference> {
        match self {
            MappedValue::Reference(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, MappedValue>> {
        match self {
            MappedValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[MappedValue]> {
        match self {
            MappedValue::Sequence(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Looks up a field of a mapped map value.
    pub fn get(&self, field: &str) -> Option<&MappedValue> {
        self.as_map().and_then(|map| map.get(field))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MappedValue::Null)
    }

    fn is_unrepresentable(&self) -> bool {
        matches!(self, MappedValue::Undefined | MappedValue::Symbol(_))
    }
}

impl Serialize for MappedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MappedValue::Undefined | MappedValue::Null | MappedValue::Symbol(_) => {
                serializer.serialize_unit()
            }
            MappedValue::Bool(b) => serializer.serialize_bool(*b),
            MappedValue::Number(Number::Int(n)) => serializer.serialize_i64(*n),
            MappedValue::Number(Number::Float(n)) => serializer.serialize_f64(*n),
            MappedValue::String(s) => serializer.serialize_str(s),
            MappedValue::Reference(r) => r.serialize(serializer),
            MappedValue::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            MappedValue::Map(entries) => {
                let present = entries.values().filter(|v| !v.is_unrepresentable()).count();
                let mut map = serializer.serialize_map(Some(present))?;
                for (key, value) in entries {
                    if !value.is_unrepresentable() {
                        map.serialize_entry(key, value)?;
                    }
                }
                map.end()
            }
        }
    }
}

/// One entry of the instance list.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedInstance {
    pub type_tag: String,
    pub value: MappedValue,
}

impl Serialize for SerializedInstance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("SerializedInstance", 2)?;
        s.serialize_field("__type__", &self.type_tag)?;
        s.serialize_field("__value__", &self.value)?;
        s.end()
    }
}

/// Result of a serialization call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Serialized {
    pub instances: Vec<SerializedInstance>,
    pub root: MappedValue,
    /// Values that could not be serialized and were replaced by `null`.
    #[serde(skip)]
    pub diagnostics: Vec<Diagnostic>,
}

impl Serialized {
    /// Resolves a reference against the instance list.
    pub fn resolve(&self, reference: Reference) -> Option<&SerializedInstance> {
        self.instances.get(reference.index)
    }

    /// Returns the instance the root refers to, if the root is an object.
    pub fn root_instance(&self) -> Option<&SerializedInstance> {
        self.root.as_reference().and_then(|r| self.resolve(r))
    }
}

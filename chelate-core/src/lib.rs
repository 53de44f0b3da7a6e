//! Chelate flattens object graphs with shared and cyclic references.
//!
//! Core concepts:
//! - **Value**: a primitive, or a handle to a **Node**
//! - **Node**: a shared object with identity (record, sequence, class instance or function)
//! - **TypeRegistry**: tells which classes may be serialized and how their fields are filtered
//! - **InstanceTable**: one slot per distinct node identity
//! - **Serializer**: walks the graph depth-first and produces a **Serialized** result
//!
//! Every object reachable from the root is emitted once into an instance
//! list; wherever it appears, a reference `{"__index__": n}` is written
//! instead. A slot is reserved before an object's children are visited, so
//! cycles resolve to the pending slot.
//!
//! # Example
//!
//! ```
//! use chelate_core::{Fields, MemoryRegistry, Node, Serializer, Value};
//!
//! let a = Node::record(Fields::new());
//! let b = Node::record(Fields::new());
//! a.set("peer", &b);
//! b.set("peer", &a);
//!
//! let out = Serializer::new(MemoryRegistry::new())
//!     .serialize(&Value::from(&a))
//!     .unwrap();
//!
//! assert_eq!(out.instances.len(), 2);
//! assert_eq!(out.instances[1].value.get("peer").unwrap().as_reference().unwrap().index, 0);
//! ```

mod config;
mod error;
mod mapped;
mod node;
mod registry;
mod serializer;
mod table;
mod value;

pub use config::{SerializerConfig, UnserializablePolicy};
pub use error::{ConfigError, Diagnostic, Error};
pub use mapped::{ARRAY_TAG, MappedValue, OBJECT_TAG, Reference, Serialized, SerializedInstance};
pub use node::{Class, Entity, Node, NodeId, NodeKind, SerializeHook};
pub use registry::{FieldOptions, MemoryRegistry, RegistryError, TypeRegistry};
pub use serializer::{Serializer, serialize};
pub use table::InstanceTable;
pub use value::{Fields, Number, Symbol, ToValue, Value};

#[cfg(feature = "derive")]
pub use chelate_derive::Entity;

/// `#[derive(Entity)]` rejects shapes it cannot describe.
///
/// ```compile_fail
/// #[derive(chelate_core::Entity)]
/// enum Shape {
///     Circle,
/// }
/// ```
///
/// ```compile_fail
/// #[derive(chelate_core::Entity)]
/// union Bits {
///     int: u32,
///     float: f32,
/// }
/// ```
///
/// ```compile_fail
/// #[derive(chelate_core::Entity)]
/// struct Point(i32, i32);
/// ```
///
/// ```compile_fail
/// #[derive(chelate_core::Entity)]
/// #[entity(tag = "")]
/// struct User {
///     id: u32,
/// }
/// ```
///
/// ```compile_fail
/// #[derive(chelate_core::Entity)]
/// #[entity(name = "User")]
/// struct User {
///     id: u32,
/// }
/// ```
#[cfg(all(doctest, feature = "derive"))]
pub struct DeriveRejections;

use indexmap::IndexMap;

use crate::config::{SerializerConfig, UnserializablePolicy};
use crate::error::{Diagnostic, Error};
use crate::mapped::{ARRAY_TAG, MappedValue, OBJECT_TAG, Reference, Serialized};
use crate::node::{Node, NodeKind};
use crate::registry::TypeRegistry;
use crate::table::InstanceTable;
use crate::value::{Fields, Value};

/// Flattens object graphs into an instance list plus a root value.
///
/// The serializer holds only the registry and its config. Every call to
/// [`serialize`](Serializer::serialize) builds its own instance table, so
/// identities never leak from one call into the next.
///
/// # Example
///
/// ```
/// use chelate_core::{MemoryRegistry, Node, Serializer, Value};
///
/// let shared = Node::sequence(vec![Value::from(1), Value::from(2)]);
/// let root = Node::sequence(vec![Value::from(&shared), Value::from(&shared)]);
///
/// let serializer = Serializer::new(MemoryRegistry::new());
/// let out = serializer.serialize(&Value::from(root)).unwrap();
///
/// // The root and the shared sequence, once each.
/// assert_eq!(out.instances.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Serializer<R> {
    registry: R,
    config: SerializerConfig,
}

impl<R: TypeRegistry> Serializer<R> {
    pub fn new(registry: R) -> Self {
        Self::with_config(registry, SerializerConfig::default())
    }

    pub fn with_config(registry: R, config: SerializerConfig) -> Self {
        Serializer { registry, config }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn config(&self) -> &SerializerConfig {
        &self.config
    }

    /// Serializes `value` and everything reachable from it.
    ///
    /// Unserializable values become `null` and are reported in
    /// [`Serialized::diagnostics`] unless the config asks for strict handling.
    /// Registry failures abort the call.
    pub fn serialize(&self, value: &Value) -> Result<Serialized, Error> {
        let mut session = Session::new(&self.registry, &self.config);
        let root = session.map_value(value)?;

        let Session {
            table, diagnostics, ..
        } = session;
        log::debug!(
            "serialized {} instance(s), {} diagnostic(s)",
            table.len(),
            diagnostics.len()
        );

        Ok(Serialized {
            instances: table.into_instances(),
            root,
            diagnostics,
        })
    }
}

/// Serializes `value` with the default config.
pub fn serialize<R: TypeRegistry>(registry: R, value: &Value) -> Result<Serialized, Error> {
    Serializer::new(registry).serialize(value)
}

/// How an object is treated.
enum Category {
    Registered(String),
    PlainRecord,
    NativeSequence,
    Unsupported,
}

/// Owned data selected for mapping.
enum Data {
    Fields(Fields),
    Elements(Vec<Value>),
    Primitive(MappedValue),
    Unsupported(Node),
}

enum Segment {
    Field(String),
    Index(usize),
}

/// Outcome of entering an object.
enum Entered {
    /// The object maps to a finished value (a reference or `null`).
    Done(MappedValue),
    /// The object's slot is reserved and its children still need mapping.
    Open(Frame),
}

/// An object whose slot is reserved and whose children are being mapped.
struct Frame {
    reference: Reference,
    work: Work,
}

enum Work {
    Fields {
        pending: indexmap::map::IntoIter<String, Value>,
        current: Option<String>,
        mapped: IndexMap<String, MappedValue>,
    },
    Elements {
        pending: std::vec::IntoIter<Value>,
        mapped: Vec<MappedValue>,
    },
}

impl Frame {
    fn fields(reference: Reference, fields: Fields) -> Self {
        let mapped = IndexMap::with_capacity(fields.len());
        Frame {
            reference,
            work: Work::Fields {
                pending: fields.into_iter(),
                current: None,
                mapped,
            },
        }
    }

    fn elements(reference: Reference, items: Vec<Value>) -> Self {
        let mapped = Vec::with_capacity(items.len());
        Frame {
            reference,
            work: Work::Elements {
                pending: items.into_iter(),
                mapped,
            },
        }
    }

    /// Takes the next child to map, with its path segment.
    fn next_child(&mut self) -> Option<(Segment, Value)> {
        match &mut self.work {
            Work::Fields {
                pending, current, ..
            } => {
                let (name, value) = pending.next()?;
                *current = Some(name.clone());
                Some((Segment::Field(name), value))
            }
            Work::Elements { pending, mapped } => {
                let value = pending.next()?;
                Some((Segment::Index(mapped.len()), value))
            }
        }
    }

    /// Records the mapped value of the child last returned by `next_child`.
    fn accept(&mut self, value: MappedValue) {
        match &mut self.work {
            Work::Fields {
                current, mapped, ..
            } => {
                if let Some(name) = current.take() {
                    mapped.insert(name, value);
                }
            }
            Work::Elements { mapped, .. } => mapped.push(value),
        }
    }

    fn finish(self) -> MappedValue {
        match self.work {
            Work::Fields { mapped, .. } => MappedValue::Map(mapped),
            Work::Elements { mapped, .. } => MappedValue::Sequence(mapped),
        }
    }
}

/// State of one serialization call.
///
/// The traversal runs on an explicit stack of open frames, so graph depth
/// is bounded by heap memory rather than by the thread's stack.
struct Session<'a, R: ?Sized> {
    registry: &'a R,
    config: &'a SerializerConfig,
    table: InstanceTable,
    diagnostics: Vec<Diagnostic>,
    stack: Vec<Frame>,
    path: Vec<Segment>,
}

impl<'a, R: TypeRegistry + ?Sized> Session<'a, R> {
    fn new(registry: &'a R, config: &'a SerializerConfig) -> Self {
        Session {
            registry,
            config,
            table: InstanceTable::new(),
            diagnostics: Vec::new(),
            stack: Vec::new(),
            path: Vec::new(),
        }
    }

    /// Maps `root` and everything reachable from it, depth-first in pre-order.
    fn map_value(&mut self, root: &Value) -> Result<MappedValue, Error> {
        let node = match map_primitive(root) {
            Ok(primitive) => return Ok(primitive),
            Err(node) => node,
        };
        let root_reference = match self.enter(node)? {
            Entered::Done(value) => return Ok(value),
            Entered::Open(frame) => {
                let reference = frame.reference;
                self.stack.push(frame);
                reference
            }
        };

        while let Some(frame) = self.stack.last_mut() {
            match frame.next_child() {
                Some((segment, child)) => {
                    self.path.push(segment);
                    let mapped = match map_primitive(&child) {
                        Ok(primitive) => primitive,
                        Err(node) => match self.enter(node)? {
                            Entered::Done(value) => value,
                            Entered::Open(frame) => {
                                // Its segment stays on the path until the frame closes.
                                self.stack.push(frame);
                                continue;
                            }
                        },
                    };
                    self.path.pop();
                    self.accept(mapped);
                }
                None => {
                    let Some(frame) = self.stack.pop() else {
                        break;
                    };
                    let reference = frame.reference;
                    self.table.fill(reference, frame.finish());
                    if !self.stack.is_empty() {
                        self.path.pop();
                        self.accept(MappedValue::Reference(reference));
                    }
                }
            }
        }

        Ok(MappedValue::Reference(root_reference))
    }

    fn accept(&mut self, value: MappedValue) {
        if let Some(parent) = self.stack.last_mut() {
            parent.accept(value);
        }
    }

    /// Classifies `node` and, unless it is already known or unserializable,
    /// reserves its slot before any of its children are looked at.
    fn enter(&mut self, node: &Node) -> Result<Entered, Error> {
        let (type_tag, registered) = match self.classify(node)? {
            Category::Registered(tag) => (tag, true),
            Category::PlainRecord => (OBJECT_TAG.to_string(), false),
            Category::NativeSequence => (ARRAY_TAG.to_string(), false),
            Category::Unsupported => return self.unserializable(node).map(Entered::Done),
        };

        if let Some(reference) = self.table.try_get_existing(node) {
            return Ok(Entered::Done(MappedValue::Reference(reference)));
        }

        if let Some(limit) = self.config.max_depth {
            if self.stack.len() >= limit {
                return Err(Error::DepthLimit {
                    limit,
                    path: self.path_string(),
                });
            }
        }

        let reference = self.table.reserve_placeholder(node, &type_tag);

        // Hooks apply to field-bearing nodes only.
        let data = match own_data(node) {
            Data::Fields(fields) => match node.hook() {
                Some(hook) => substitute(hook.serialize_hook(node)),
                None => Data::Fields(fields),
            },
            data => data,
        };

        let value = match data {
            Data::Elements(items) => {
                return Ok(Entered::Open(Frame::elements(reference, items)));
            }
            Data::Fields(fields) => {
                let options = if registered {
                    self.registry.get_options(&type_tag)?
                } else {
                    None
                };
                let fields = match options {
                    Some(options) => options.apply(fields),
                    None => fields,
                };
                return Ok(Entered::Open(Frame::fields(reference, fields)));
            }
            Data::Primitive(value) => value,
            Data::Unsupported(other) => self.unserializable(&other)?,
        };

        self.table.fill(reference, value);
        Ok(Entered::Done(MappedValue::Reference(reference)))
    }

    fn classify(&self, node: &Node) -> Result<Category, Error> {
        let class = match &*node.kind() {
            NodeKind::Record(_) => return Ok(Category::PlainRecord),
            NodeKind::Sequence(_) => return Ok(Category::NativeSequence),
            NodeKind::Function { .. } => return Ok(Category::Unsupported),
            NodeKind::Instance { class, .. } => class.clone(),
        };

        if !self.registry.has_type(&class)? {
            return Ok(Category::Unsupported);
        }
        Ok(match class.tag() {
            Some(tag) => Category::Registered(tag.to_string()),
            None => Category::Unsupported,
        })
    }

    fn unserializable(&mut self, node: &Node) -> Result<MappedValue, Error> {
        let diagnostic = Diagnostic {
            path: self.path_string(),
            description: node.describe(),
        };
        log::warn!("{diagnostic}");

        match self.config.on_unserializable {
            UnserializablePolicy::Null => {
                self.diagnostics.push(diagnostic);
                Ok(MappedValue::Null)
            }
            UnserializablePolicy::Error => Err(Error::Unserializable(diagnostic)),
        }
    }

    fn path_string(&self) -> String {
        let mut path = String::from("$");
        for segment in &self.path {
            match segment {
                Segment::Field(name) => {
                    path.push('.');
                    path.push_str(name);
                }
                Segment::Index(index) => path.push_str(&format!("[{index}]")),
            }
        }
        path
    }
}

/// Copies out a node's own fields or elements.
fn own_data(node: &Node) -> Data {
    match &*node.kind() {
        NodeKind::Record(fields) | NodeKind::Instance { fields, .. } => Data::Fields(fields.clone()),
        NodeKind::Sequence(items) => Data::Elements(items.clone()),
        NodeKind::Function { .. } => Data::Unsupported(node.clone()),
    }
}

/// Interprets the value returned by a serialize hook.
fn substitute(value: Value) -> Data {
    match map_primitive(&value) {
        Ok(primitive) => Data::Primitive(primitive),
        Err(node) => own_data(node),
    }
}

/// Maps a primitive unchanged, or hands back the node to be entered.
fn map_primitive(value: &Value) -> Result<MappedValue, &Node> {
    Ok(match value {
        Value::Undefined => MappedValue::Undefined,
        Value::Null => MappedValue::Null,
        Value::Bool(b) => MappedValue::Bool(*b),
        Value::Number(n) => MappedValue::Number(*n),
        Value::String(s) => MappedValue::String(s.clone()),
        Value::Symbol(s) => MappedValue::Symbol(s.clone()),
        Value::Node(node) => return Err(node),
    })
}

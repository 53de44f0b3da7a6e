use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::value::{Fields, Value};

/// The type identity of a class instance.
///
/// `name` is what the registry is asked about; `tag` is the type tag the
/// class declares for its instances. A class without a declared tag cannot
/// be serialized even when registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Class {
    name: Arc<str>,
    tag: Option<Arc<str>>,
}

impl Class {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Class {
            name: name.into(),
            tag: None,
        }
    }

    /// Sets the declared type tag.
    pub fn with_tag(mut self, tag: impl Into<Arc<str>>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A custom pre-serialization capability.
///
/// When a node carries a hook, the value it returns is mapped in place of
/// the node's own fields. The node keeps its identity and type tag; only
/// the data changes.
pub trait SerializeHook {
    fn serialize_hook(&self, node: &Node) -> Value;
}

impl<F> SerializeHook for F
where
    F: Fn(&Node) -> Value,
{
    fn serialize_hook(&self, node: &Node) -> Value {
        self(node)
    }
}

/// A Rust type that maps onto a class instance.
///
/// Usually derived with `#[derive(Entity)]`.
pub trait Entity {
    /// The declared type tag.
    const TAG: &'static str;

    /// Returns the instance fields in declaration order.
    fn fields(&self) -> Fields;

    /// Returns the class describing this type.
    fn class() -> Class
    where
        Self: Sized,
    {
        Class::new(std::any::type_name::<Self>()).with_tag(Self::TAG)
    }
}

/// The shape of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// A plain untyped record.
    Record(Fields),
    /// A native sequence.
    Sequence(Vec<Value>),
    /// An instance of a class.
    Instance { class: Class, fields: Fields },
    /// A function-like value. Never serializable.
    Function { name: String },
}

impl NodeKind {
    fn describe(&self) -> String {
        match self {
            NodeKind::Record(fields) => format!("record with {} field(s)", fields.len()),
            NodeKind::Sequence(items) => format!("sequence of {} element(s)", items.len()),
            NodeKind::Instance { class, fields } => {
                format!("instance of {class} with {} field(s)", fields.len())
            }
            NodeKind::Function { name } if name.is_empty() => "anonymous function".to_string(),
            NodeKind::Function { name } => format!("function {name}"),
        }
    }
}

struct NodeData {
    kind: NodeKind,
    hook: Option<Rc<dyn SerializeHook>>,
}

/// A shared, identity-bearing object in the input graph.
///
/// Cloning a `Node` clones the handle, not the object: both handles refer
/// to the same identity. Nodes can be mutated after construction, which is
/// how cyclic graphs are built.
#[derive(Clone)]
pub struct Node(Rc<RefCell<NodeData>>);

/// Opaque identity of a node, valid while the node is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Node(Rc::new(RefCell::new(NodeData { kind, hook: None })))
    }

    pub fn record(fields: Fields) -> Self {
        Node::new(NodeKind::Record(fields))
    }

    pub fn sequence(items: Vec<Value>) -> Self {
        Node::new(NodeKind::Sequence(items))
    }

    pub fn instance(class: Class, fields: Fields) -> Self {
        Node::new(NodeKind::Instance { class, fields })
    }

    pub fn function(name: impl Into<String>) -> Self {
        Node::new(NodeKind::Function { name: name.into() })
    }

    /// Builds a class instance from an [`Entity`].
    pub fn entity<T: Entity>(value: &T) -> Self {
        Node::instance(T::class(), value.fields())
    }

    /// Attaches a pre-serialization hook.
    pub fn with_hook(self, hook: impl SerializeHook + 'static) -> Self {
        self.0.borrow_mut().hook = Some(Rc::new(hook));
        self
    }

    pub fn id(&self) -> NodeId {
        NodeId(Rc::as_ptr(&self.0) as *const () as usize)
    }

    /// Returns true if both handles refer to the same object.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Borrows the node's kind.
    ///
    /// # Panics
    ///
    /// Panics if the node is currently mutably borrowed.
    pub fn kind(&self) -> Ref<'_, NodeKind> {
        Ref::map(self.0.borrow(), |data| &data.kind)
    }

    pub(crate) fn hook(&self) -> Option<Rc<dyn SerializeHook>> {
        self.0.borrow().hook.clone()
    }

    /// Sets a field on a record or instance. Returns false for other kinds.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) -> bool {
        match &mut self.0.borrow_mut().kind {
            NodeKind::Record(fields) | NodeKind::Instance { fields, .. } => {
                fields.insert(name.into(), value.into());
                true
            }
            _ => false,
        }
    }

    /// Appends an element to a sequence. Returns false for other kinds.
    pub fn push(&self, value: impl Into<Value>) -> bool {
        match &mut self.0.borrow_mut().kind {
            NodeKind::Sequence(items) => {
                items.push(value.into());
                true
            }
            _ => false,
        }
    }

    /// Returns a clone of a field's value.
    pub fn get(&self, name: &str) -> Option<Value> {
        match &*self.kind() {
            NodeKind::Record(fields) | NodeKind::Instance { fields, .. } => fields.get(name).cloned(),
            _ => None,
        }
    }

    /// Number of fields or elements.
    pub fn len(&self) -> usize {
        match &*self.kind() {
            NodeKind::Record(fields) | NodeKind::Instance { fields, .. } => fields.len(),
            NodeKind::Sequence(items) => items.len(),
            NodeKind::Function { .. } => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short human-readable description, used in diagnostics.
    pub fn describe(&self) -> String {
        self.kind().describe()
    }
}

// Contents are not printed: the graph may be cyclic.
impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id())
            .field("kind", &self.describe())
            .finish()
    }
}

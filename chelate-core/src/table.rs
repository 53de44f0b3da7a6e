use std::collections::HashMap;

use crate::mapped::{MappedValue, Reference, SerializedInstance};
use crate::node::{Node, NodeId};

enum Slot {
    Reserved { type_tag: String },
    Filled(SerializedInstance),
}

/// Identity-keyed instance slots for a single serialization call.
///
/// Slots are handed out in reservation order and move from reserved to
/// filled exactly once.
pub struct InstanceTable {
    slots: Vec<Slot>,
    // The handle is held so the address behind a NodeId stays allocated
    // until the table is dropped.
    references: HashMap<NodeId, (Node, Reference)>,
}

impl InstanceTable {
    pub fn new() -> Self {
        InstanceTable {
            slots: Vec::new(),
            references: HashMap::new(),
        }
    }

    /// Returns the reference previously reserved for this node, by identity.
    pub fn try_get_existing(&self, node: &Node) -> Option<Reference> {
        self.references.get(&node.id()).map(|(_, reference)| *reference)
    }

    /// Appends an unfilled slot for `node` and returns a reference to it.
    ///
    /// Must be called before the node's children are mapped, so that a
    /// back-edge to `node` resolves to this slot.
    pub fn reserve_placeholder(&mut self, node: &Node, type_tag: &str) -> Reference {
        debug_assert!(
            self.try_get_existing(node).is_none(),
            "node reserved twice"
        );
        let reference = Reference::new(self.slots.len());
        self.slots.push(Slot::Reserved {
            type_tag: type_tag.to_string(),
        });
        self.references.insert(node.id(), (node.clone(), reference));
        log::trace!("reserved slot {} ({type_tag})", reference.index);
        reference
    }

    /// Writes the finished value into a reserved slot.
    pub fn fill(&mut self, reference: Reference, value: MappedValue) {
        let Some(slot) = self.slots.get_mut(reference.index) else {
            debug_assert!(false, "fill of unknown slot {}", reference.index);
            return;
        };
        match slot {
            Slot::Reserved { type_tag } => {
                let type_tag = std::mem::take(type_tag);
                *slot = Slot::Filled(SerializedInstance { type_tag, value });
            }
            Slot::Filled(_) => debug_assert!(false, "slot {} filled twice", reference.index),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Consumes the table, returning the instances in reservation order.
    ///
    /// A slot still reserved at this point becomes a `null` value.
    pub fn into_instances(self) -> Vec<SerializedInstance> {
        self.slots
            .into_iter()
            .map(|slot| match slot {
                Slot::Filled(instance) => instance,
                Slot::Reserved { type_tag } => {
                    debug_assert!(false, "slot for {type_tag} never filled");
                    SerializedInstance {
                        type_tag,
                        value: MappedValue::Null,
                    }
                }
            })
            .collect()
    }
}

impl Default for InstanceTable {
    fn default() -> Self {
        Self::new()
    }
}
